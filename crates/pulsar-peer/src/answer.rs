/// Separates the request echo from the response in a server answer.
pub const FIELD_SEPARATOR: char = '\u{1e}';
/// Optional prefix of the request echo.
pub const REQUEST_MARKER: &str = "REQ:";
/// Optional prefix of the response.
pub const RESPONSE_MARKER: &str = "RSP:";

/// A server answer: the echoed request text and its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub req: String,
    pub rsp: String,
}

impl Answer {
    pub fn new(req: impl Into<String>, rsp: impl Into<String>) -> Self {
        Self {
            req: req.into(),
            rsp: rsp.into(),
        }
    }

    /// Parse the content of a `!server.msg` message.
    pub fn parse(content: &str) -> Self {
        parse_answer(content)
    }

    /// Content the server sends for this answer.
    pub fn to_content(&self) -> String {
        format!(
            "{REQUEST_MARKER}{}{FIELD_SEPARATOR}{RESPONSE_MARKER}{}",
            self.req, self.rsp
        )
    }
}

/// Split answer content into its request echo and response.
///
/// Split at the first [`FIELD_SEPARATOR`]; without one, split at the first
/// [`RESPONSE_MARKER`]; without either, the whole content is the request
/// echo and the response is empty. Markers are optional and every field is
/// trimmed.
pub fn parse_answer(content: &str) -> Answer {
    let (left, right) = match content.split_once(FIELD_SEPARATOR) {
        Some(parts) => parts,
        None => match content.find(RESPONSE_MARKER) {
            Some(idx) => (&content[..idx], &content[idx..]),
            None => (content, ""),
        },
    };
    Answer {
        req: strip_marker(left, REQUEST_MARKER),
        rsp: strip_marker(right, RESPONSE_MARKER),
    }
}

fn strip_marker(field: &str, marker: &str) -> String {
    let field = field.trim();
    field.strip_prefix(marker).unwrap_or(field).trim().to_string()
}
