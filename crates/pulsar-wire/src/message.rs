/// Practical content cap enforced by collaborators (not by the codec).
pub const MAX_CONTENT_CHARS: usize = 1023;

/// A single protocol message.
///
/// Immutable once built: constructed by the client for outbound sends
/// (`id == 0`) or by the codec when decoding an inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: u64,
    content: String,
    receiver: String,
    sender: String,
    timestamp: i64,
}

impl Message {
    /// Create a message from all of its fields.
    pub fn new(
        id: u64,
        content: impl Into<String>,
        receiver: impl Into<String>,
        sender: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            receiver: receiver.into(),
            sender: sender.into(),
            timestamp,
        }
    }

    /// Create a client-originated message (unassigned id).
    pub fn outbound(
        content: impl Into<String>,
        receiver: impl Into<String>,
        sender: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self::new(0, content, receiver, sender, timestamp)
    }

    /// Server-assigned id, 0 if unassigned.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Content length in characters.
    pub fn content_chars(&self) -> usize {
        self.content.chars().count()
    }
}
