// Public modules
pub mod banner;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod token_store;
pub mod types;

mod observability;
mod render;

// Re-exports
pub use banner::{BANNER_TTL, Banner, BannerBoard, BannerKind};
pub use client::{RagBackend, VeritlyClient};
pub use client_logger::{ClientLogger, Operation, StderrLogger};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use token_store::{FileTokenStore, MemoryTokenStore, TOKEN_KEY, TokenStore};
pub use types::*;
