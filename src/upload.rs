//! File upload orchestration
//!
//! Validates every file before touching the network, then hands the list to
//! the platform as album batches and collects the delivered message ids.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::platform::{AlbumItem, ChatInfo, PlatformClient, ResolvedRecipient};
use crate::progress::ProgressSink;

/// Telegram renders at most this many items in one album.
pub const MAX_ALBUM_SIZE: usize = 10;

/// Messages produced by one run, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub message_urls: Vec<String>,
    pub message_ids: Vec<i32>,
}

impl UploadResult {
    pub fn len(&self) -> usize {
        self.message_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.message_ids.is_empty()
    }
}

/// Public link to a message in `chat`.
///
/// Chats with a username get `t.me/<username>/<id>`; everything else gets the
/// private `t.me/c/<id>/<id>` form.
pub fn build_message_url(chat: &ChatInfo, message_id: i32) -> String {
    match chat.username.as_deref().filter(|u| !u.is_empty()) {
        Some(username) => format!("https://t.me/{}/{}", username, message_id),
        None => format!("https://t.me/c/{}/{}", chat.bare_id, message_id),
    }
}

fn upload_err(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::Upload(format!("{}: {}", path.display(), reason))
}

/// Check that each path is a readable, non-empty regular file.
///
/// The caption goes on the last item, which is where Telegram takes the
/// album caption from.
pub async fn prepare_items(paths: &[PathBuf], caption: &str) -> Result<Vec<AlbumItem>> {
    let mut items = Vec::with_capacity(paths.len());

    for path in paths {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| upload_err(path, e))?;
        if !meta.is_file() {
            return Err(upload_err(path, "not a regular file"));
        }
        if meta.len() == 0 {
            return Err(upload_err(path, "file is empty"));
        }
        tokio::fs::File::open(path)
            .await
            .map_err(|e| upload_err(path, e))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        items.push(AlbumItem {
            path: path.clone(),
            name,
            size: meta.len(),
            caption: None,
        });
    }

    if let Some(last) = items.last_mut() {
        if !caption.is_empty() {
            last.caption = Some(caption.to_string());
        }
    }

    Ok(items)
}

/// Send `paths` to `to` as grouped messages.
pub async fn send_files<C: PlatformClient>(
    client: &mut C,
    to: &ResolvedRecipient<C::Handle>,
    paths: &[PathBuf],
    caption: &str,
    progress: &mut dyn ProgressSink,
) -> Result<UploadResult> {
    if paths.is_empty() {
        return Err(Error::Upload("no files to send".to_string()));
    }

    let items = prepare_items(paths, caption).await?;
    let mut result = UploadResult::default();

    for (index, batch) in items.chunks(MAX_ALBUM_SIZE).enumerate() {
        debug!(batch = index, files = batch.len(), "sending album");
        println!("Sending message");

        let sent = client
            .send_grouped(to, batch, progress)
            .await
            .map_err(|err| match err {
                Error::Upload(_) => err,
                other => Error::Upload(other.to_string()),
            })?;

        // The server may echo fewer messages than it delivered.
        if sent.is_empty() {
            return Err(Error::Upload(format!(
                "platform confirmed none of {} files",
                batch.len()
            )));
        }
        if sent.len() < batch.len() {
            warn!(
                batch = index,
                files = batch.len(),
                confirmed = sent.len(),
                "some album messages were not confirmed"
            );
        }
        println!("Sent message");

        for message in sent {
            result.message_ids.push(message.id);
            result
                .message_urls
                .push(build_message_url(&to.chat, message.id));
        }
    }

    info!(files = result.len(), "upload complete");
    Ok(result)
}
