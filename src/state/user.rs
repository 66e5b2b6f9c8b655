use std::fmt;

/// Stable handle to a tracked user. Survives nickname changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub(crate) u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// A known nickname and what we have learned about it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub nickname: String,
    pub username: Option<String>,
    pub hostname: Option<String>,
    /// Channels shared with the bot, in join order, display case.
    pub channels: Vec<String>,
}

impl User {
    pub(crate) fn new(id: UserId, nickname: &str) -> Self {
        User {
            id,
            nickname: nickname.to_owned(),
            username: None,
            hostname: None,
            channels: Vec::new(),
        }
    }

    /// `nick!user@host`, with `*` for unknown parts.
    pub fn hostmask(&self) -> String {
        format!(
            "{}!{}@{}",
            self.nickname,
            self.username.as_deref().unwrap_or("*"),
            self.hostname.as_deref().unwrap_or("*")
        )
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nickname)
    }
}
