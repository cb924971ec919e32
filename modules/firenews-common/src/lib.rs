pub mod config;
pub mod error;
pub mod score;
pub mod types;

pub use config::{Config, StorageBackend};
pub use error::{FireError, Result};
pub use score::*;
pub use types::*;
