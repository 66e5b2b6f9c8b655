use std::fmt;

use chrono::{DateTime, Utc};

use crate::mode::ChannelModes;

use super::UserId;

/// Channel topic. Replaced wholesale, never edited in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topic {
    pub text: String,
    /// Nickname (or server) that set it, when known.
    pub set_by: Option<String>,
    pub set_at: Option<DateTime<Utc>>,
}

impl Topic {
    pub fn new(text: impl Into<String>, set_by: Option<&str>) -> Self {
        Topic {
            text: text.into(),
            set_by: set_by.map(str::to_owned),
            set_at: None,
        }
    }

    /// Copy with setter and time replaced, as reported by 333.
    #[must_use]
    pub fn with_setter(&self, set_by: &str, set_at: Option<DateTime<Utc>>) -> Self {
        Topic {
            text: self.text.clone(),
            set_by: Some(set_by.to_owned()),
            set_at,
        }
    }
}

/// A joined or observed channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub topic: Option<Topic>,
    pub(crate) members: Vec<UserId>,
    pub modes: ChannelModes,
}

impl Channel {
    pub(crate) fn new(name: &str) -> Self {
        Channel {
            name: name.to_owned(),
            topic: None,
            members: Vec::new(),
            modes: ChannelModes::new(),
        }
    }

    /// Members in join order.
    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    pub fn has_member(&self, id: UserId) -> bool {
        self.members.contains(&id)
    }

    pub(crate) fn add_member(&mut self, id: UserId) -> bool {
        if self.has_member(id) {
            return false;
        }
        self.members.push(id);
        true
    }

    pub(crate) fn remove_member(&mut self, id: UserId) -> bool {
        let before = self.members.len();
        self.members.retain(|&m| m != id);
        self.members.len() != before
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
