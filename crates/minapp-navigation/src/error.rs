//! Navigation error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Invalid policy configuration: {0}")]
    InvalidConfig(String),
}
