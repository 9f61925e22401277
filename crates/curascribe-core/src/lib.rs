pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::CuraScribeConfig;
pub use error::{CuraScribeError, Result};
pub use types::*;
