//! Address conventions.
//!
//! Addresses are plain strings whose first character selects the namespace:
//! `@name` for users, `:name` for channels/groups and `!name` for reserved
//! system pseudo-addresses understood by the server.

/// Prefix of user addresses.
pub const USER_PREFIX: char = '@';

/// Prefix of channel/group addresses.
pub const CHANNEL_PREFIX: char = ':';

/// Prefix of reserved system pseudo-addresses.
pub const SYSTEM_PREFIX: char = '!';

/// Client-to-server request channel. Content is the literal request text.
pub const SERVER_REQ: &str = "!server.req";

/// Server-to-client answer channel. Content is `REQ:<text>\x1eRSP:<text>`.
pub const SERVER_MSG: &str = "!server.msg";

/// Server-to-client error channel. Content is a free-text error message.
pub const SERVER_ERROR: &str = "!server.error";

/// Namespace of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    User,
    Channel,
    System,
    Other,
}

impl AddressKind {
    /// Human-readable name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            AddressKind::User => "USER",
            AddressKind::Channel => "CHANNEL",
            AddressKind::System => "SYSTEM",
            AddressKind::Other => "OTHER",
        }
    }
}

/// Classify an address by its prefix.
pub fn classify(address: &str) -> AddressKind {
    match address.chars().next() {
        Some(USER_PREFIX) => AddressKind::User,
        Some(CHANNEL_PREFIX) => AddressKind::Channel,
        Some(SYSTEM_PREFIX) => AddressKind::System,
        _ => AddressKind::Other,
    }
}

/// Returns true if the address is one of the server pseudo-addresses.
pub fn is_reserved(address: &str) -> bool {
    matches!(address, SERVER_REQ | SERVER_MSG | SERVER_ERROR)
}
