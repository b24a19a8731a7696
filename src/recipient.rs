//! Recipient parsing and resolution
//!
//! Lookup itself is left to the platform client; this module only decides
//! whether the user gave a numeric chat id or a name, and strips the `@` or
//! `t.me/` decoration from names.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::platform::{PlatformClient, ResolvedRecipient};

static CHAT_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:https?://)?(?:t|telegram)\.me/([^/?#]+)/?$").unwrap());

/// A recipient as written by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Username, phone or invite hash, without the leading `@` or link prefix.
    Username(String),
    /// Bot API style dialog id.
    ChatId(i64),
}

impl Recipient {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Configuration("recipient is empty".to_string()));
        }

        if CHAT_ID_RE.is_match(raw) {
            return raw.parse::<i64>().map(Recipient::ChatId).map_err(|_| {
                Error::Configuration(format!("chat id {} is out of range", raw))
            });
        }

        let name = if let Some(stripped) = raw.strip_prefix('@') {
            stripped
        } else if let Some(caps) = LINK_RE.captures(raw) {
            caps.get(1).map_or(raw, |m| m.as_str())
        } else {
            raw
        };

        if name.is_empty() {
            return Err(Error::Configuration(format!("'{}' names no chat", raw)));
        }

        // Bots have no Saved Messages chat of their own.
        if name.eq_ignore_ascii_case("me") || name.eq_ignore_ascii_case("self") {
            return Err(Error::Configuration(format!(
                "'{}' refers to the bot itself; give a chat id or username",
                raw
            )));
        }

        Ok(Recipient::Username(name.to_string()))
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Username(name) => write!(f, "@{}", name),
            Recipient::ChatId(id) => write!(f, "{}", id),
        }
    }
}

/// Ask the active session to resolve `raw` to a platform handle.
pub async fn resolve<C: PlatformClient>(
    client: &mut C,
    raw: &str,
) -> Result<ResolvedRecipient<C::Handle>> {
    let recipient = Recipient::parse(raw)?;
    tracing::info!(%recipient, "resolving recipient");

    let resolved = client.resolve(&recipient).await.map_err(|err| match err {
        Error::Resolution(_) => err,
        other => Error::Resolution(format!("{}: {}", recipient, other)),
    })?;

    tracing::debug!(kind = ?resolved.chat.kind, id = resolved.chat.bare_id, "recipient resolved");
    Ok(resolved)
}
