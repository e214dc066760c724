pub mod dummy;
pub mod service;
