use thiserror::Error;

pub mod config;
pub mod runner;
pub mod stats;
pub mod tasks;
pub mod user;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid value for {name}: {reason}")]
    Config { name: &'static str, reason: String },
    #[error("invalid task weights: {0}")]
    Weights(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
