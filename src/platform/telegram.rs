//! MTProto client for bots, built on grammers
//!
//! Owns the sender pool for the duration of a run. The network runner is
//! stopped on `disconnect`, and again from `Drop` if a run is torn down early.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::client::updates::UpdatesLike;
use grammers_client::types::peer::Peer;
use grammers_client::types::InputMedia;
use grammers_client::Client;
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use grammers_session::defs::{PeerAuth, PeerId, PeerRef};
use grammers_tl_types as tl;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AlbumItem, ChatInfo, ChatKind, PlatformClient, ResolvedRecipient, SentMessage};
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::progress::{ProgressReader, ProgressSink};
use crate::recipient::Recipient;

/// Where a send goes: a peer returned by the server, or a bare id.
#[derive(Clone)]
pub enum TelegramPeer {
    Resolved(Peer),
    ById(PeerRef),
}

/// Live sender pool plus the client bound to it.
struct Connection {
    client: Client,
    handle: SenderPoolHandle,
    // Bots never read updates, but the channel must stay open for the runner.
    _updates: mpsc::UnboundedReceiver<UpdatesLike>,
    runner: JoinHandle<()>,
}

impl Connection {
    async fn shutdown(self) -> Result<()> {
        self.handle.quit();
        self.runner
            .await
            .map_err(|e| Error::Telegram(format!("network runner failed: {}", e)))
    }

    fn abort(self) {
        self.handle.quit();
        self.runner.abort();
    }
}

/// Telegram bot client persisted in a SQLite session file.
pub struct TelegramClient {
    session_path: PathBuf,
    conn: Option<Connection>,
}

impl TelegramClient {
    pub fn new(session_path: impl Into<PathBuf>) -> Self {
        Self {
            session_path: session_path.into(),
            conn: None,
        }
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn client(&self) -> Result<&Client> {
        self.conn
            .as_ref()
            .map(|c| &c.client)
            .ok_or_else(|| Error::Telegram("client is not connected".to_string()))
    }
}

impl Drop for TelegramClient {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.abort();
        }
    }
}

async fn sign_in(client: &Client, credentials: &Credentials) -> Result<()> {
    let authorized = client
        .is_authorized()
        .await
        .map_err(|e| Error::Authentication(format!("Failed to check authorization: {}", e)))?;

    if authorized {
        let me = client
            .get_me()
            .await
            .map_err(|e| Error::Authentication(format!("Failed to fetch session owner: {}", e)))?;
        return check_session_owner(me.raw.id(), &credentials.bot_token);
    }

    let bot = client
        .bot_sign_in(&credentials.bot_token, &credentials.api_hash)
        .await
        .map_err(|e| Error::Authentication(e.to_string()))?;
    info!(bot = bot.username().unwrap_or("<no username>"), "signed in");
    Ok(())
}

/// Bot id encoded before the `:` of a bot token.
fn bot_id_from_token(token: &str) -> Option<i64> {
    let (id, secret) = token.split_once(':')?;
    if secret.is_empty() || id.starts_with(['+', '-']) {
        return None;
    }
    id.parse().ok()
}

/// An authorized session must belong to the bot named by the token.
fn check_session_owner(owner_id: i64, bot_token: &str) -> Result<()> {
    let expected = bot_id_from_token(bot_token)
        .ok_or_else(|| Error::Authentication("BOT_TOKEN is not of the form <id>:<secret>".into()))?;

    if owner_id != expected {
        return Err(Error::Authentication(format!(
            "session belongs to account {}, not bot {}; remove the session file or pass another --session",
            owner_id, expected
        )));
    }

    debug!(bot_id = owner_id, "session already authorized");
    Ok(())
}

/// Chat details for a peer returned by the server.
fn chat_info(peer: &Peer) -> ChatInfo {
    let (kind, bare_id, username) = match peer {
        Peer::User(user) => (
            ChatKind::User,
            user.raw.id(),
            user.username().map(str::to_string),
        ),
        // Megagroups come back as groups backed by a channel.
        Peer::Group(group) => match &group.raw {
            tl::enums::Chat::Channel(c) => (ChatKind::Channel, c.id, c.username.clone()),
            tl::enums::Chat::ChannelForbidden(c) => (ChatKind::Channel, c.id, None),
            tl::enums::Chat::Chat(c) => (ChatKind::Group, c.id, None),
            tl::enums::Chat::Forbidden(c) => (ChatKind::Group, c.id, None),
            tl::enums::Chat::Empty(c) => (ChatKind::Group, c.id, None),
        },
        Peer::Channel(channel) => (
            ChatKind::Channel,
            channel.raw.id,
            channel.raw.username.clone(),
        ),
    };

    ChatInfo {
        kind,
        bare_id,
        username,
    }
}

/// Bots may address chats by id alone; the server accepts a zero access hash.
fn peer_ref(chat: &ChatInfo) -> PeerRef {
    let id = match chat.kind {
        ChatKind::User => PeerId::user(chat.bare_id),
        ChatKind::Group => PeerId::chat(chat.bare_id),
        ChatKind::Channel => PeerId::channel(chat.bare_id),
    };
    PeerRef {
        id,
        auth: PeerAuth::default(),
    }
}

fn chats_of(chats: tl::enums::messages::Chats) -> Vec<tl::enums::Chat> {
    match chats {
        tl::enums::messages::Chats::Chats(c) => c.chats,
        tl::enums::messages::Chats::Slice(c) => c.chats,
    }
}

/// Confirm a bare id is reachable and pick up its public username.
async fn lookup_by_id(client: &Client, chat: &mut ChatInfo) -> Result<()> {
    let bare_id = chat.bare_id;
    let not_found = move || Error::Resolution(format!("chat {} is unknown or inaccessible", bare_id));

    match chat.kind {
        ChatKind::User => {
            let users = client
                .invoke(&tl::functions::users::GetUsers {
                    id: vec![tl::types::InputUser {
                        user_id: chat.bare_id,
                        access_hash: 0,
                    }
                    .into()],
                })
                .await
                .map_err(|e| Error::Resolution(format!("user {}: {}", chat.bare_id, e)))?;

            match users.into_iter().next() {
                Some(tl::enums::User::User(user)) => chat.username = user.username,
                _ => return Err(not_found()),
            }
        }
        ChatKind::Group => {
            let chats = client
                .invoke(&tl::functions::messages::GetChats {
                    id: vec![chat.bare_id],
                })
                .await
                .map_err(|e| Error::Resolution(format!("chat {}: {}", chat.bare_id, e)))?;

            match chats_of(chats).into_iter().next() {
                Some(tl::enums::Chat::Chat(_)) => {}
                _ => return Err(not_found()),
            }
        }
        ChatKind::Channel => {
            let chats = client
                .invoke(&tl::functions::channels::GetChannels {
                    id: vec![tl::types::InputChannel {
                        channel_id: chat.bare_id,
                        access_hash: 0,
                    }
                    .into()],
                })
                .await
                .map_err(|e| Error::Resolution(format!("channel {}: {}", chat.bare_id, e)))?;

            match chats_of(chats).into_iter().next() {
                Some(tl::enums::Chat::Channel(channel)) => chat.username = channel.username,
                _ => return Err(not_found()),
            }
        }
    }

    Ok(())
}

#[async_trait]
impl PlatformClient for TelegramClient {
    type Handle = TelegramPeer;

    async fn connect(&mut self, credentials: &Credentials) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let session = SqliteSession::open(self.session_path()).map_err(|e| {
            Error::Authentication(format!(
                "Failed to open session {}: {}",
                self.session_path().display(),
                e
            ))
        })?;
        let session = Arc::new(session);
        let pool = SenderPool::new(Arc::clone(&session), credentials.api_id);

        // Create client from pool (need reference to whole pool)
        let client = Client::new(&pool);

        let SenderPool {
            runner,
            updates,
            handle,
        } = pool;

        let runner = tokio::spawn(async move {
            runner.run().await;
        });

        let conn = Connection {
            client,
            handle,
            _updates: updates,
            runner,
        };

        match sign_in(&conn.client, credentials).await {
            Ok(()) => {
                self.conn = Some(conn);
                Ok(())
            }
            Err(err) => {
                let _ = conn.shutdown().await;
                Err(err)
            }
        }
    }

    async fn resolve(&mut self, recipient: &Recipient) -> Result<ResolvedRecipient<TelegramPeer>> {
        let client = self.client()?;

        match recipient {
            Recipient::Username(name) => {
                let peer = client
                    .resolve_username(name)
                    .await
                    .map_err(|e| Error::Resolution(format!("@{}: {}", name, e)))?
                    .ok_or_else(|| Error::Resolution(format!("Username @{} not found", name)))?;

                let chat = chat_info(&peer);
                Ok(ResolvedRecipient {
                    handle: TelegramPeer::Resolved(peer),
                    chat,
                })
            }
            Recipient::ChatId(id) => {
                let mut chat = ChatInfo::from_bot_api_id(*id);
                lookup_by_id(client, &mut chat).await?;

                Ok(ResolvedRecipient {
                    handle: TelegramPeer::ById(peer_ref(&chat)),
                    chat,
                })
            }
        }
    }

    async fn send_grouped(
        &mut self,
        to: &ResolvedRecipient<TelegramPeer>,
        items: &[AlbumItem],
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<SentMessage>> {
        let client = self.client()?;
        let mut media = Vec::with_capacity(items.len());

        for item in items {
            progress.file_started(&item.path, item.size);

            let file = tokio::fs::File::open(&item.path)
                .await
                .map_err(|e| Error::Upload(format!("{}: {}", item.path.display(), e)))?;
            let size = usize::try_from(item.size)
                .map_err(|_| Error::Upload(format!("{}: file too large", item.path.display())))?;

            let uploaded = {
                let mut reader = ProgressReader::new(file, &item.path, item.size, &mut *progress);
                let uploaded = client
                    .upload_stream(&mut reader, size, item.name.clone())
                    .await
                    .map_err(|e| Error::Upload(format!("{}: {}", item.path.display(), e)))?;
                debug!(file = %item.path.display(), bytes = reader.bytes_read(), "uploaded");
                uploaded
            };
            progress.file_finished(&item.path);

            let caption = item.caption.as_deref().unwrap_or("");
            media.push(InputMedia::new().caption(caption).document(uploaded));
        }

        let sent = match &to.handle {
            TelegramPeer::Resolved(peer) => client.send_album(peer, media).await,
            TelegramPeer::ById(peer) => client.send_album(peer.clone(), media).await,
        }
        .map_err(|e| Error::Upload(e.to_string()))?;

        let mut messages = Vec::with_capacity(sent.len());
        for (index, message) in sent.into_iter().enumerate() {
            match message {
                Some(message) => messages.push(SentMessage { id: message.id() }),
                None => warn!(position = index, "server did not echo an album message"),
            }
        }
        Ok(messages)
    }

    async fn disconnect(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.shutdown().await,
            None => Ok(()),
        }
    }

    fn abort(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.abort();
        }
    }
}
