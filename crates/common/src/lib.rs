pub mod config;
pub mod error;
pub mod types;
pub mod validation;
