//! IRC case-mapping functions.
//!
//! IRC uses a special case-insensitive comparison where some characters
//! are considered equivalent (e.g., `[` and `{`). The mapping in effect is
//! advertised by the server through `CASEMAPPING` in ISUPPORT; `rfc1459`
//! is assumed until the server says otherwise.

use std::fmt;

/// Case mapping advertised by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CaseMapping {
    /// Only `A-Z` fold to `a-z`.
    Ascii,
    /// ASCII plus `[]\~` fold to `{}|^`.
    #[default]
    Rfc1459,
    /// ASCII plus `[]\` fold to `{}|`, `~` is left alone.
    StrictRfc1459,
}

impl CaseMapping {
    /// Parse an ISUPPORT `CASEMAPPING` value. Unknown values yield `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "ascii" => Some(Self::Ascii),
            "rfc1459" => Some(Self::Rfc1459),
            "strict-rfc1459" => Some(Self::StrictRfc1459),
            _ => None,
        }
    }

    /// Fold a single character.
    #[inline]
    pub fn fold_char(self, c: char) -> char {
        match (self, c) {
            (_, 'A'..='Z') => c.to_ascii_lowercase(),
            (Self::Ascii, _) => c,
            (_, '[') => '{',
            (_, ']') => '}',
            (_, '\\') => '|',
            (Self::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Fold a whole string into its canonical lookup key.
    pub fn fold(self, s: &str) -> String {
        s.chars().map(|c| self.fold_char(c)).collect()
    }

    /// Compare two names under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a
                .chars()
                .zip(b.chars())
                .all(|(ca, cb)| self.fold_char(ca) == self.fold_char(cb))
    }
}

impl fmt::Display for CaseMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ascii => "ascii",
            Self::Rfc1459 => "rfc1459",
            Self::StrictRfc1459 => "strict-rfc1459",
        })
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
///
/// In addition to ASCII lowercase conversion, this maps:
/// - `[` → `{`
/// - `]` → `}`
/// - `\` → `|`
/// - `~` → `^`
pub fn irc_to_lower(s: &str) -> String {
    CaseMapping::Rfc1459.fold(s)
}

/// Compare two strings using RFC 1459 case-insensitive comparison.
pub fn irc_eq(a: &str, b: &str) -> bool {
    CaseMapping::Rfc1459.eq(a, b)
}
