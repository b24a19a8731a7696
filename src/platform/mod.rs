//! Messaging platform capability
//!
//! The workflow only talks to the platform through [`PlatformClient`], so the
//! real MTProto client can be swapped for a recording double in tests.

pub mod telegram;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Credentials;
use crate::error::Result;
use crate::progress::ProgressSink;
use crate::recipient::Recipient;

pub use telegram::TelegramClient;

/// Kind of chat a recipient resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    User,
    Group,
    Channel,
}

/// What the workflow needs to know about a resolved chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatInfo {
    pub kind: ChatKind,
    /// Platform id without the Bot API sign/prefix.
    pub bare_id: i64,
    /// Public username, if the chat has one.
    pub username: Option<String>,
}

impl ChatInfo {
    /// Decode a Bot API style dialog id.
    ///
    /// `-100<id>` is a channel or supergroup, other negatives are basic
    /// groups, positives are users.
    pub fn from_bot_api_id(id: i64) -> Self {
        const CHANNEL_OFFSET: i64 = -1_000_000_000_000;

        let (kind, bare_id) = if id <= CHANNEL_OFFSET {
            (ChatKind::Channel, CHANNEL_OFFSET - id)
        } else if id < 0 {
            (ChatKind::Group, -id)
        } else {
            (ChatKind::User, id)
        };

        Self {
            kind,
            bare_id,
            username: None,
        }
    }
}

/// Opaque platform handle plus the chat details extracted at resolution time.
#[derive(Debug, Clone)]
pub struct ResolvedRecipient<H> {
    pub handle: H,
    pub chat: ChatInfo,
}

/// One file of a grouped send, already validated on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumItem {
    pub path: PathBuf,
    /// File name presented to the recipient.
    pub name: String,
    pub size: u64,
    pub caption: Option<String>,
}

/// A message the platform reports as delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub id: i32,
}

#[async_trait]
pub trait PlatformClient: Send {
    type Handle: Send + Sync;

    /// Open the connection and authenticate as a bot.
    async fn connect(&mut self, credentials: &Credentials) -> Result<()>;

    async fn resolve(&mut self, recipient: &Recipient) -> Result<ResolvedRecipient<Self::Handle>>;

    /// Upload `items` and deliver them as one album.
    async fn send_grouped(
        &mut self,
        to: &ResolvedRecipient<Self::Handle>,
        items: &[AlbumItem],
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<SentMessage>>;

    async fn disconnect(&mut self) -> Result<()>;

    /// Best-effort synchronous teardown, used when a session is dropped
    /// without being closed.
    fn abort(&mut self) {}
}
