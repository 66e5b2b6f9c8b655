//! Message source (`:prefix`) parsing.
//!
//! A prefix is either a server name or a user hostmask `nick!user@host`,
//! where the user and host parts may each be missing.

use std::fmt;

/// Borrowed view of a message prefix.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PrefixRef<'a> {
    /// Server name (e.g., "irc.example.com").
    Server(&'a str),
    /// User hostmask.
    User {
        /// Nickname.
        nick: &'a str,
        /// Username (ident), if present.
        user: Option<&'a str>,
        /// Hostname, if present.
        host: Option<&'a str>,
    },
}

impl<'a> PrefixRef<'a> {
    /// Parse a prefix string. Lenient: never fails.
    ///
    /// A bare name containing a dot and no `!`/`@` is taken as a server.
    pub fn parse(s: &'a str) -> Self {
        let (before_host, host) = match s.split_once('@') {
            Some((b, h)) => (b, Some(h)),
            None => (s, None),
        };
        let (nick, user) = match before_host.split_once('!') {
            Some((n, u)) => (n, Some(u)),
            None => (before_host, None),
        };

        if user.is_none() && host.is_none() && nick.contains('.') {
            return PrefixRef::Server(nick);
        }

        PrefixRef::User {
            nick,
            user: user.filter(|u| !u.is_empty()),
            host: host.filter(|h| !h.is_empty()),
        }
    }

    /// Nickname for user prefixes, server name otherwise.
    pub fn name(&self) -> &'a str {
        match *self {
            PrefixRef::Server(name) => name,
            PrefixRef::User { nick, .. } => nick,
        }
    }

    /// Nickname, if this is a user prefix.
    pub fn nick(&self) -> Option<&'a str> {
        match *self {
            PrefixRef::User { nick, .. } if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Username, if present.
    pub fn user(&self) -> Option<&'a str> {
        match *self {
            PrefixRef::User { user, .. } => user,
            PrefixRef::Server(_) => None,
        }
    }

    /// Hostname; the server name for server prefixes.
    pub fn host(&self) -> Option<&'a str> {
        match *self {
            PrefixRef::Server(name) => Some(name),
            PrefixRef::User { host, .. } => host,
        }
    }

    /// True for server prefixes.
    pub fn is_server(&self) -> bool {
        matches!(self, PrefixRef::Server(_))
    }
}

impl fmt::Display for PrefixRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixRef::Server(name) => f.write_str(name),
            PrefixRef::User { nick, user, host } => {
                f.write_str(nick)?;
                if let Some(user) = user {
                    write!(f, "!{}", user)?;
                }
                if let Some(host) = host {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}
