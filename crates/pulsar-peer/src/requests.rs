//! Typed wrappers around the server's request vocabulary.
//!
//! Every helper sends one request text to `!server.req` and interprets
//! the answer. Commands and their responses:
//!
//! | request                          | response                         |
//! |----------------------------------|----------------------------------|
//! | `!ping`                          | free text                        |
//! | `!login <user> <credential>`     | `success` or a reason            |
//! | `!register <user> <credential>`  | `success` or a reason            |
//! | `!contact list`                  | `@a,@b,...` or `-`               |
//! | `!contact add\|remove <name>`    | `success`/`ok` or a reason       |
//! | `!profile get`                   | `\x1D`-joined fields or `-`      |
//! | `!profile set <fields>`          | `success`/`ok` or a reason       |
//! | `!chat <chat> <lines>`           | `\x1F`-joined wire lines or `-`  |

use pulsar_wire::{Message, USER_PREFIX};
use tracing::warn;

use crate::client::Client;
use crate::error::{PeerError, Result};

/// Separates profile fields.
pub const PROFILE_SEPARATOR: char = '\u{1d}';

/// Separates wire lines in a chat history answer.
pub const HISTORY_SEPARATOR: char = '\u{1f}';

/// Response meaning "nothing there".
const EMPTY_RESPONSE: &str = "-";

/// User profile as stored by the server. Empty strings are unset fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub description: String,
    pub email: String,
    pub real_name: String,
    /// Seconds since the Unix epoch.
    pub birthday: Option<i64>,
}

impl Profile {
    /// Parse a `!profile get` response.
    ///
    /// `birthday` must be a whole integer; a value with trailing junk such
    /// as `1000abc` leaves it unset rather than keeping the leading digits.
    pub fn from_wire(rsp: &str) -> Self {
        if rsp.is_empty() || rsp == EMPTY_RESPONSE {
            return Self::default();
        }
        let mut fields = rsp.split(PROFILE_SEPARATOR);
        let mut next = || fields.next().unwrap_or_default().to_string();
        let description = next();
        let email = next();
        let real_name = next();
        let birthday = next().trim().parse().ok();
        Self {
            description,
            email,
            real_name,
            birthday,
        }
    }

    /// Argument of `!profile set`.
    pub fn to_wire(&self) -> String {
        let birthday = self.birthday.map(|b| b.to_string()).unwrap_or_default();
        let separator = PROFILE_SEPARATOR.to_string();
        [
            self.description.as_str(),
            self.email.as_str(),
            self.real_name.as_str(),
            birthday.as_str(),
        ]
        .join(separator.as_str())
    }
}

fn is_success(rsp: &str) -> bool {
    rsp == "success"
}

fn is_ok(rsp: &str) -> bool {
    rsp == "success" || rsp == "ok"
}

impl Client {
    /// Round-trip a `!ping`; returns the server's reply text.
    pub async fn ping(&self) -> Result<String> {
        self.request("!ping").await
    }

    /// Log in. The credential is sent as is.
    pub async fn login(&self, user: &str, credential: &str) -> Result<bool> {
        let rsp = self.request(&format!("!login {user} {credential}")).await?;
        if !is_success(&rsp) {
            warn!(%user, reason = %rsp, "login rejected");
        }
        Ok(is_success(&rsp))
    }

    /// Register a new account. The credential is sent as is.
    pub async fn register(&self, user: &str, credential: &str) -> Result<bool> {
        let rsp = self
            .request(&format!("!register {user} {credential}"))
            .await?;
        if !is_success(&rsp) {
            warn!(%user, reason = %rsp, "registration rejected");
        }
        Ok(is_success(&rsp))
    }

    /// User addresses in the contact list.
    pub async fn contact_list(&self) -> Result<Vec<String>> {
        let rsp = self.request("!contact list").await?;
        if rsp == EMPTY_RESPONSE {
            return Ok(Vec::new());
        }
        Ok(rsp
            .split(',')
            .map(str::trim)
            .filter(|name| name.starts_with(USER_PREFIX))
            .map(str::to_string)
            .collect())
    }

    pub async fn contact_add(&self, name: &str) -> Result<bool> {
        let rsp = self.request(&format!("!contact add {name}")).await?;
        Ok(is_ok(&rsp))
    }

    pub async fn contact_remove(&self, name: &str) -> Result<bool> {
        let rsp = self.request(&format!("!contact remove {name}")).await?;
        Ok(is_ok(&rsp))
    }

    pub async fn profile_get(&self) -> Result<Profile> {
        let rsp = self.request("!profile get").await?;
        Ok(Profile::from_wire(&rsp))
    }

    pub async fn profile_set(&self, profile: &Profile) -> Result<bool> {
        let rsp = self
            .request(&format!("!profile set {}", profile.to_wire()))
            .await?;
        Ok(is_ok(&rsp))
    }

    /// Last `lines` messages of `chat`, oldest first as the server sends
    /// them. Parts that fail to decode are skipped; an answer in which no
    /// part decodes (usually a plain-text refusal) is
    /// [`PeerError::UnexpectedResponse`].
    pub async fn chat_history(&self, chat: &str, lines: usize) -> Result<Vec<Message>> {
        let request = format!("!chat {chat} {lines}");
        let rsp = self.request(&request).await?;
        if rsp == EMPTY_RESPONSE {
            return Ok(Vec::new());
        }
        let layout = self.layout();
        let mut messages = Vec::new();
        let mut skipped = 0usize;
        for part in rsp.split(HISTORY_SEPARATOR).map(str::trim) {
            if part.is_empty() {
                continue;
            }
            match layout.decode(part) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    warn!(error = %e, %chat, "skipping undecodable history entry");
                    skipped += 1;
                }
            }
        }
        if messages.is_empty() && skipped > 0 {
            return Err(PeerError::UnexpectedResponse {
                request,
                response: rsp,
            });
        }
        Ok(messages)
    }
}
