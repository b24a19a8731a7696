//! Telegram File Uploader Library
//!
//! Sends local files to a Telegram chat as one album, authenticated as a bot:
//! - Load bot credentials from the environment and the request from the CLI
//! - Hold one MTProto session for the run and always disconnect it
//! - Resolve the recipient (chat id or username)
//! - Upload the files with progress output and report message links

pub mod config;
pub mod error;
pub mod output;
pub mod platform;
pub mod progress;
pub mod recipient;
pub mod session;
pub mod upload;
pub mod workflow;

// Re-export common types
pub use config::{Credentials, UploadRequest};
pub use error::{Error, Result};
pub use platform::{PlatformClient, TelegramClient};
pub use recipient::Recipient;
pub use session::{Session, SessionLock};
pub use upload::UploadResult;
pub use workflow::Invocation;
