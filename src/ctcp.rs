//! CTCP (Client-to-Client Protocol) framing.
//!
//! CTCP queries ride inside PRIVMSG bodies and replies inside NOTICE
//! bodies, each delimited by `\x01`.
//!
//! ```
//! use bones_irc::ctcp::{Ctcp, CtcpKind};
//!
//! let ctcp = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
//! assert_eq!(ctcp.kind, CtcpKind::Action);
//! assert_eq!(ctcp.params, Some("waves hello"));
//! ```

use std::fmt;

/// The CTCP delimiter character.
pub const CTCP_DELIM: char = '\x01';

/// CTCP commands the bot understands; anything else is kept by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CtcpKind {
    Action,
    Version,
    Ping,
    Source,
    Time,
    Unknown(String),
}

impl CtcpKind {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "ACTION" => Self::Action,
            "VERSION" => Self::Version,
            "PING" => Self::Ping,
            "SOURCE" => Self::Source,
            "TIME" => Self::Time,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "ACTION",
            Self::Version => "VERSION",
            Self::Ping => "PING",
            Self::Source => "SOURCE",
            Self::Time => "TIME",
            Self::Unknown(s) => s,
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CTCP section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    pub kind: CtcpKind,
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse a body that is entirely one CTCP section. The closing
    /// delimiter is optional, as many clients omit it.
    pub fn parse(text: &'a str) -> Option<Self> {
        let inner = text.strip_prefix(CTCP_DELIM)?;
        let inner = inner.strip_suffix(CTCP_DELIM).unwrap_or(inner);
        Self::from_inner(inner)
    }

    fn from_inner(inner: &'a str) -> Option<Self> {
        if inner.is_empty() {
            return None;
        }
        let (command, params) = match inner.split_once(' ') {
            Some((c, p)) => (c, Some(p).filter(|p| !p.is_empty())),
            None => (inner, None),
        };
        if command.is_empty() {
            return None;
        }
        Some(Ctcp {
            kind: CtcpKind::parse(command),
            params,
        })
    }
}

/// True if the body carries any CTCP section.
pub fn is_ctcp(text: &str) -> bool {
    text.contains(CTCP_DELIM)
}

/// Pull every delimited CTCP section out of a body, in order.
///
/// Text outside the delimiters is discarded; an unterminated final section
/// still counts.
pub fn extract(text: &str) -> Vec<Ctcp<'_>> {
    text.split(CTCP_DELIM)
        .skip(1)
        .step_by(2)
        .filter_map(Ctcp::from_inner)
        .collect()
}

/// Frame a CTCP section.
pub fn quote(command: &str, params: Option<&str>) -> String {
    match params {
        Some(p) => format!("{d}{} {}{d}", command, p, d = CTCP_DELIM),
        None => format!("{d}{}{d}", command, d = CTCP_DELIM),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_query() {
        let ctcp = Ctcp::parse("\x01VERSION\x01").unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Version);
        assert_eq!(ctcp.params, None);
    }

    #[test]
    fn test_parse_unterminated() {
        let ctcp = Ctcp::parse("\x01PING 12345").unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Ping);
        assert_eq!(ctcp.params, Some("12345"));
    }

    #[test]
    fn test_not_ctcp() {
        assert!(Ctcp::parse("hello").is_none());
        assert!(Ctcp::parse("\x01\x01").is_none());
        assert!(!is_ctcp("plain text"));
    }

    #[test]
    fn test_extract_multiple_sections() {
        let found = extract("hi \x01ACTION waves\x01 and \x01VERSION\x01");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, CtcpKind::Action);
        assert_eq!(found[0].params, Some("waves"));
        assert_eq!(found[1].kind, CtcpKind::Version);
    }

    #[test]
    fn test_unknown_kind_keeps_name() {
        let ctcp = Ctcp::parse("\x01CLIENTINFO\x01").unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Unknown("CLIENTINFO".to_string()));
        assert_eq!(ctcp.kind.to_string(), "CLIENTINFO");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("VERSION", None), "\x01VERSION\x01");
        assert_eq!(quote("PING", Some("42")), "\x01PING 42\x01");
    }
}
