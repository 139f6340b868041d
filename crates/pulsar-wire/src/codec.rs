use crate::error::{Result, WireError};
use crate::message::Message;

/// Width of the id field in characters.
pub const ID_WIDTH: usize = 20;

/// Width of the timestamp field in characters.
pub const TIME_WIDTH: usize = 10;

/// Width of the sender field in characters.
pub const SENDER_WIDTH: usize = 32;

/// Width of the receiver field in characters.
pub const RECEIVER_WIDTH: usize = 32;

/// Field widths of the wire line header.
///
/// Widths are agreed with the server; the defaults are the protocol
/// constants above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLayout {
    pub id_width: usize,
    pub time_width: usize,
    pub sender_width: usize,
    pub receiver_width: usize,
}

impl Default for WireLayout {
    fn default() -> Self {
        Self {
            id_width: ID_WIDTH,
            time_width: TIME_WIDTH,
            sender_width: SENDER_WIDTH,
            receiver_width: RECEIVER_WIDTH,
        }
    }
}

impl WireLayout {
    /// Total header width (everything before the content).
    pub fn header_width(&self) -> usize {
        self.id_width + self.time_width + self.sender_width + self.receiver_width
    }

    /// Encode a message into a wire line.
    ///
    /// Wire format:
    /// ```text
    /// ┌────────────┬────────────┬──────────────┬──────────────┬───────────┐
    /// │ ID         │ TIME       │ SENDER       │ RECEIVER     │ CONTENT   │
    /// │ '0'-padded │ '0'-padded │ ' '-padded   │ ' '-padded   │ verbatim  │
    /// └────────────┴────────────┴──────────────┴──────────────┴───────────┘
    /// ```
    ///
    /// Fields wider than their slot are written whole, which shifts every
    /// following field boundary. Use [`WireLayout::check`] or
    /// [`WireLayout::encode_checked`] to reject such messages instead.
    ///
    /// Timestamps must be non-negative: the sign lands after the zero
    /// padding and the line no longer decodes.
    pub fn encode(&self, message: &Message) -> String {
        let mut line = String::with_capacity(self.header_width() + message.content().len());
        push_aligned(&mut line, &message.id().to_string(), self.id_width, '0');
        push_aligned(
            &mut line,
            &message.timestamp().to_string(),
            self.time_width,
            '0',
        );
        push_aligned(&mut line, message.sender(), self.sender_width, ' ');
        push_aligned(&mut line, message.receiver(), self.receiver_width, ' ');
        line.push_str(message.content());
        line
    }

    /// Report the first header field that does not fit its slot, or a
    /// negative timestamp.
    pub fn check(&self, message: &Message) -> Result<()> {
        if message.timestamp() < 0 {
            return Err(WireError::NegativeTimestamp(message.timestamp()));
        }
        let fields = [
            ("id", message.id().to_string().chars().count(), self.id_width),
            (
                "timestamp",
                message.timestamp().to_string().chars().count(),
                self.time_width,
            ),
            ("sender", message.sender().chars().count(), self.sender_width),
            (
                "receiver",
                message.receiver().chars().count(),
                self.receiver_width,
            ),
        ];
        for (field, len, width) in fields {
            if len > width {
                return Err(WireError::FieldOverflow { field, len, width });
            }
        }
        Ok(())
    }

    /// Encode, failing instead of emitting a shifted line.
    pub fn encode_checked(&self, message: &Message) -> Result<String> {
        self.check(message)?;
        Ok(self.encode(message))
    }

    /// Decode a wire line into a message.
    ///
    /// Header fields are sliced by character count and trimmed. Only a
    /// failed integer parse is an error; a short line yields empty trailing
    /// fields.
    pub fn decode(&self, line: &str) -> Result<Message> {
        let (id, rest) = split_chars(line, self.id_width);
        let (time, rest) = split_chars(rest, self.time_width);
        let (sender, rest) = split_chars(rest, self.sender_width);
        let (receiver, content) = split_chars(rest, self.receiver_width);

        let id = parse_field::<u64>("id", id)?;
        let timestamp = parse_field::<i64>("timestamp", time)?;

        Ok(Message::new(
            id,
            content,
            receiver.trim(),
            sender.trim(),
            timestamp,
        ))
    }
}

/// Encode with the default layout.
pub fn encode(message: &Message) -> String {
    WireLayout::default().encode(message)
}

/// Decode with the default layout.
pub fn decode(line: &str) -> Result<Message> {
    WireLayout::default().decode(line)
}

fn push_aligned(dst: &mut String, value: &str, width: usize, fill: char) {
    let len = value.chars().count();
    for _ in len..width {
        dst.push(fill);
    }
    dst.push_str(value);
}

fn split_chars(s: &str, count: usize) -> (&str, &str) {
    match s.char_indices().nth(count) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T> {
    let trimmed = raw.trim();
    trimmed.parse().map_err(|_| WireError::Format {
        field,
        value: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(layout: &WireLayout, line: &str) -> Vec<String> {
        let widths = [
            layout.id_width,
            layout.time_width,
            layout.sender_width,
            layout.receiver_width,
        ];
        let chars: Vec<char> = line.chars().collect();
        let mut start = 0;
        widths
            .iter()
            .map(|w| {
                let field: String = chars[start..start + w].iter().collect();
                start += w;
                field
            })
            .collect()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let msg = Message::new(42, "hello", "bob", "alice", 1_620_000_000);
        let line = encode(&msg);
        let parsed = decode(&line).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_pads_fields() {
        let layout = WireLayout::default();
        let line = layout.encode(&Message::new(1, "", "r", "s", 2));

        let fields = header(&layout, &line);
        assert_eq!(fields[0], "00000000000000000001");
        assert_eq!(fields[1], "0000000002");
        assert_eq!(fields[2], format!("{}s", " ".repeat(SENDER_WIDTH - 1)));
        assert_eq!(fields[3].trim(), "r");
        assert!(fields[3].ends_with('r'));
    }

    #[test]
    fn test_encoded_length_is_header_plus_content() {
        let layout = WireLayout::default();
        for content in ["", "x", "multi word content", "ünïcödé ✓"] {
            let msg = Message::outbound(content, ":general", "@alice", 1_700_000_000);
            let line = layout.encode(&msg);
            assert_eq!(
                line.chars().count(),
                layout.header_width() + content.chars().count()
            );
        }
    }

    #[test]
    fn test_content_kept_verbatim() {
        let content = "  padded\tand\u{1e}separated  ";
        let msg = Message::outbound(content, "@bob", "@alice", 5);
        let parsed = decode(&encode(&msg)).unwrap();
        assert_eq!(parsed.content(), content);
    }

    #[test]
    fn test_custom_layout() {
        let layout = WireLayout {
            id_width: 4,
            time_width: 3,
            sender_width: 2,
            receiver_width: 2,
        };
        let line = layout.encode(&Message::new(7, "hi", "@b", "@a", 9));
        assert_eq!(line, "0007009@a@bhi");
        let parsed = layout.decode(&line).unwrap();
        assert_eq!(parsed.receiver(), "@b");
        assert_eq!(parsed.content(), "hi");
    }

    #[test]
    fn test_overflow_is_not_truncated() {
        let layout = WireLayout {
            id_width: 2,
            time_width: 2,
            sender_width: 2,
            receiver_width: 2,
        };
        let msg = Message::new(1, "c", "@b", "@alice", 3);
        let line = layout.encode(&msg);
        assert_eq!(line, "0103@alice@bc");
        assert_eq!(line.chars().count(), layout.header_width() + 1 + 4);

        let shifted = layout.decode(&line).unwrap();
        assert_eq!(shifted.sender(), "@a");
        assert_ne!(shifted, msg);
    }

    #[test]
    fn test_check_reports_overflow() {
        let layout = WireLayout::default();
        let long = format!("@{}", "x".repeat(SENDER_WIDTH));
        let msg = Message::outbound("", "@bob", long, 0);
        let err = layout.check(&msg).unwrap_err();
        assert!(matches!(
            err,
            WireError::FieldOverflow {
                field: "sender",
                width: SENDER_WIDTH,
                ..
            }
        ));
        assert!(layout.encode_checked(&msg).is_err());
        assert!(layout
            .encode_checked(&Message::outbound("", "@bob", "@alice", 0))
            .is_ok());
    }

    #[test]
    fn test_check_rejects_negative_timestamp() {
        let layout = WireLayout::default();
        let msg = Message::new(1, "x", "@b", "@a", -5);
        assert!(matches!(
            layout.check(&msg),
            Err(WireError::NegativeTimestamp(-5))
        ));
        assert!(layout.encode_checked(&msg).is_err());
        // Unchecked encoding still writes the line, which no longer parses.
        assert!(layout.decode(&layout.encode(&msg)).is_err());
    }

    #[test]
    fn test_decode_rejects_non_numeric_id() {
        let mut line = encode(&Message::new(1, "x", "@b", "@a", 2));
        line.replace_range(0..1, "z");
        let err = decode(&line).unwrap_err();
        assert!(matches!(err, WireError::Format { field: "id", .. }));
    }

    #[test]
    fn test_decode_rejects_non_numeric_timestamp() {
        let mut line = encode(&Message::new(1, "x", "@b", "@a", 2));
        line.replace_range(ID_WIDTH..ID_WIDTH + 1, "?");
        let err = decode(&line).unwrap_err();
        assert!(matches!(err, WireError::Format { field: "timestamp", .. }));
    }

    #[test]
    fn test_decode_short_line() {
        let layout = WireLayout {
            id_width: 2,
            time_width: 2,
            sender_width: 4,
            receiver_width: 4,
        };
        let parsed = layout.decode("0102 @al").unwrap();
        assert_eq!(parsed.sender(), "@al");
        assert_eq!(parsed.receiver(), "");
        assert_eq!(parsed.content(), "");

        assert!(matches!(
            layout.decode("01"),
            Err(WireError::Format {
                field: "timestamp",
                ..
            })
        ));
    }
}
