pub mod db;
pub mod handlers;
pub mod models;
pub mod server;
pub mod telemetry;
pub mod utils;
pub mod workers;
