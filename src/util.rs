//! Helpers for keeping outbound text within line limits.

/// Maximum length for a line including CRLF.
pub const MAX_MESSAGE_BODY: usize = 512;

/// Maximum inbound line length accepted by the codec.
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Room reserved for the `:nick!user@host ` source the server prepends
/// when relaying our messages.
pub const SOURCE_ALLOWANCE: usize = 100;

/// Truncates a string to at most `max_bytes` bytes without breaking
/// a multi-byte UTF-8 codepoint at the end.
///
/// ```
/// use bones_irc::util::truncate_utf8_safe;
///
/// assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
/// assert_eq!(truncate_utf8_safe("Hello 👋 World", 8), "Hello ");
/// ```
#[inline]
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Bytes available for the text of `<command> <target> :<text>`.
pub fn text_budget(command: &str, target: &str) -> usize {
    let overhead = command.len() + 1 + target.len() + 2 + 2 + SOURCE_ALLOWANCE;
    MAX_MESSAGE_BODY.saturating_sub(overhead).max(1)
}

/// Split text into sendable chunks: one per line, each line further cut
/// at `max_bytes` on a char boundary. Empty lines are dropped.
pub fn wrap_text(text: &str, max_bytes: usize) -> Vec<&str> {
    let max_bytes = max_bytes.max(4);
    let mut out = Vec::new();
    for line in text.lines().filter(|l| !l.is_empty()) {
        let mut rest = line;
        while !rest.is_empty() {
            let chunk = truncate_utf8_safe(rest, max_bytes);
            out.push(chunk);
            rest = &rest[chunk.len()..];
        }
    }
    out
}
