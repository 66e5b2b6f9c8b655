//! Channel mode state.
//!
//! A mode string such as `+ov-b alice bob *!*@spam` is split into
//! [`ModeChange`]s by [`parse_mode_changes`] according to the server's
//! `CHANMODES` and `PREFIX` partitions, then applied to a [`ChannelModes`].

mod parse;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::casemap::CaseMapping;

pub use self::parse::{parse_mode_changes, parse_user_modes};

/// The ISUPPORT partition a mode character belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModeClass {
    /// Multi-valued list (bans, exceptions); always takes an argument.
    List,
    /// Parameter on both set and unset (channel key).
    Always,
    /// Parameter only when set (user limit).
    Set,
    /// Plain flag.
    Never,
    /// Membership status keyed by nickname (op, voice).
    Prefix,
}

impl ModeClass {
    /// Whether a change of this class consumes an argument.
    pub fn takes_arg(self, adding: bool) -> bool {
        match self {
            ModeClass::List | ModeClass::Always | ModeClass::Prefix => true,
            ModeClass::Set => adding,
            ModeClass::Never => false,
        }
    }
}

/// One `(add|remove, mode, argument)` tuple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    pub adding: bool,
    pub mode: char,
    pub class: ModeClass,
    pub arg: Option<String>,
}

impl ModeChange {
    pub fn new(adding: bool, mode: char, class: ModeClass, arg: Option<String>) -> Self {
        ModeChange {
            adding,
            mode,
            class,
            arg,
        }
    }

    /// Same mode and argument, opposite direction.
    #[must_use]
    pub fn inverse(&self) -> Self {
        ModeChange {
            adding: !self.adding,
            ..self.clone()
        }
    }
}

impl fmt::Display for ModeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.adding { '+' } else { '-' };
        match &self.arg {
            Some(arg) => write!(f, "{}{} {}", sign, self.mode, arg),
            None => write!(f, "{}{}", sign, self.mode),
        }
    }
}

/// Mode state of one channel, partitioned by class.
///
/// Prefix modes are stored alongside list modes, keyed by nickname.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelModes {
    lists: BTreeMap<char, BTreeSet<String>>,
    params: BTreeMap<char, String>,
    flags: BTreeSet<char>,
}

impl ChannelModes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one change. Returns the change that exactly undoes it, or
    /// `None` if nothing changed (including list queries without argument).
    pub fn apply(&mut self, change: &ModeChange, mapping: CaseMapping) -> Option<ModeChange> {
        let ModeChange {
            adding, mode, class, ..
        } = *change;
        match class {
            ModeClass::List | ModeClass::Prefix => {
                let arg = change.arg.as_deref()?;
                let entries = self.lists.entry(mode).or_default();
                let existing = entries.iter().find(|e| mapping.eq(e, arg)).cloned();
                let undo = match (adding, existing) {
                    (true, None) => {
                        entries.insert(arg.to_owned());
                        Some(ModeChange::new(false, mode, class, Some(arg.to_owned())))
                    }
                    (false, Some(stored)) => {
                        entries.remove(&stored);
                        Some(ModeChange::new(true, mode, class, Some(stored)))
                    }
                    _ => None,
                };
                if entries.is_empty() {
                    self.lists.remove(&mode);
                }
                undo
            }
            ModeClass::Always | ModeClass::Set if adding => {
                let value = change.arg.clone()?;
                match self.params.insert(mode, value.clone()) {
                    Some(prev) if prev == value => None,
                    Some(prev) => Some(ModeChange::new(true, mode, class, Some(prev))),
                    None => Some(ModeChange::new(false, mode, class, Some(value))),
                }
            }
            ModeClass::Always | ModeClass::Set => self
                .params
                .remove(&mode)
                .map(|prev| ModeChange::new(true, mode, class, Some(prev))),
            ModeClass::Never if adding => self
                .flags
                .insert(mode)
                .then(|| ModeChange::new(false, mode, class, None)),
            ModeClass::Never => self
                .flags
                .remove(&mode)
                .then(|| ModeChange::new(true, mode, class, None)),
        }
    }

    /// Apply a batch in order, returning the undos in application order.
    pub fn apply_all(&mut self, changes: &[ModeChange], mapping: CaseMapping) -> Vec<ModeChange> {
        changes
            .iter()
            .filter_map(|c| self.apply(c, mapping))
            .collect()
    }

    /// Drop flags and parameters, keeping list and prefix entries.
    pub fn clear_settings(&mut self) {
        self.params.clear();
        self.flags.clear();
    }

    /// Entries of a list or prefix mode.
    pub fn list(&self, mode: char) -> impl Iterator<Item = &str> {
        self.lists
            .get(&mode)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Whether `nick` holds the prefix mode `mode`.
    pub fn has_member_mode(&self, mode: char, nick: &str, mapping: CaseMapping) -> bool {
        self.list(mode).any(|n| mapping.eq(n, nick))
    }

    /// Parameter of an always- or set-class mode.
    pub fn param(&self, mode: char) -> Option<&str> {
        self.params.get(&mode).map(String::as_str)
    }

    pub fn has_flag(&self, mode: char) -> bool {
        self.flags.contains(&mode)
    }

    /// Drop every entry of the given modes matching `nick`.
    pub fn forget_nick(&mut self, modes: &[char], nick: &str, mapping: CaseMapping) {
        for mode in modes {
            if let Some(entries) = self.lists.get_mut(mode) {
                entries.retain(|e| !mapping.eq(e, nick));
                if entries.is_empty() {
                    self.lists.remove(mode);
                }
            }
        }
    }

    /// Re-key entries of the given modes from `old` to `new`.
    pub fn rename_nick(&mut self, modes: &[char], old: &str, new: &str, mapping: CaseMapping) {
        for mode in modes {
            if let Some(entries) = self.lists.get_mut(mode) {
                let before = entries.len();
                entries.retain(|e| !mapping.eq(e, old));
                if entries.len() != before {
                    entries.insert(new.to_owned());
                }
            }
        }
    }

    /// Current state as a `+flags params` string, e.g. `+klnt key 10`.
    pub fn summary(&self) -> String {
        let mut modes = String::from("+");
        let mut args = Vec::new();
        for (&mode, value) in &self.params {
            modes.push(mode);
            args.push(value.as_str());
        }
        modes.extend(self.flags.iter());
        std::iter::once(modes.as_str())
            .chain(args)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: CaseMapping = CaseMapping::Rfc1459;

    fn change(adding: bool, mode: char, class: ModeClass, arg: Option<&str>) -> ModeChange {
        ModeChange::new(adding, mode, class, arg.map(str::to_owned))
    }

    #[test]
    fn test_list_mode_add_remove() {
        let mut modes = ChannelModes::new();
        let undo = modes
            .apply(&change(true, 'b', ModeClass::List, Some("*!*@spam")), MAP)
            .unwrap();
        assert_eq!(modes.list('b').collect::<Vec<_>>(), vec!["*!*@spam"]);
        assert!(!undo.adding);

        modes.apply(&undo, MAP);
        assert_eq!(modes, ChannelModes::new());
    }

    #[test]
    fn test_list_query_is_noop() {
        let mut modes = ChannelModes::new();
        assert!(modes.apply(&change(true, 'b', ModeClass::List, None), MAP).is_none());
        assert_eq!(modes, ChannelModes::new());
    }

    #[test]
    fn test_set_mode_remove_restores_previous() {
        let mut modes = ChannelModes::new();
        modes.apply(&change(true, 'l', ModeClass::Set, Some("10")), MAP);
        let undo = modes.apply(&change(false, 'l', ModeClass::Set, None), MAP).unwrap();
        assert_eq!(undo, change(true, 'l', ModeClass::Set, Some("10")));
        assert_eq!(modes.param('l'), None);
        modes.apply(&undo, MAP);
        assert_eq!(modes.param('l'), Some("10"));
    }

    #[test]
    fn test_always_mode_replace() {
        let mut modes = ChannelModes::new();
        modes.apply(&change(true, 'k', ModeClass::Always, Some("old")), MAP);
        let undo = modes
            .apply(&change(true, 'k', ModeClass::Always, Some("new")), MAP)
            .unwrap();
        assert_eq!(undo.arg.as_deref(), Some("old"));
        assert!(undo.adding);
    }

    #[test]
    fn test_prefix_mode_casefolded() {
        let mut modes = ChannelModes::new();
        modes.apply(&change(true, 'o', ModeClass::Prefix, Some("Alice")), MAP);
        assert!(modes.has_member_mode('o', "alice", MAP));
        assert!(modes
            .apply(&change(true, 'o', ModeClass::Prefix, Some("ALICE")), MAP)
            .is_none());
        modes.apply(&change(false, 'o', ModeClass::Prefix, Some("alice")), MAP);
        assert!(!modes.has_member_mode('o', "Alice", MAP));
    }

    #[test]
    fn test_rename_and_forget_nick() {
        let mut modes = ChannelModes::new();
        modes.apply(&change(true, 'o', ModeClass::Prefix, Some("alice")), MAP);
        modes.apply(&change(true, 'v', ModeClass::Prefix, Some("alice")), MAP);
        modes.rename_nick(&['o', 'v'], "ALICE", "alicia", MAP);
        assert!(modes.has_member_mode('o', "alicia", MAP));
        assert!(modes.has_member_mode('v', "alicia", MAP));
        assert!(!modes.has_member_mode('o', "alice", MAP));

        modes.forget_nick(&['o', 'v'], "alicia", MAP);
        assert_eq!(modes, ChannelModes::new());
    }

    #[test]
    fn test_summary() {
        let mut modes = ChannelModes::new();
        modes.apply(&change(true, 'n', ModeClass::Never, None), MAP);
        modes.apply(&change(true, 't', ModeClass::Never, None), MAP);
        modes.apply(&change(true, 'k', ModeClass::Always, Some("key")), MAP);
        modes.apply(&change(true, 'l', ModeClass::Set, Some("10")), MAP);
        assert_eq!(modes.summary(), "+klnt key 10");
    }

    #[test]
    fn test_inverse_flips_direction() {
        let c = change(true, 'b', ModeClass::List, Some("m"));
        assert_eq!(c.inverse(), change(false, 'b', ModeClass::List, Some("m")));
        assert_eq!(c.to_string(), "+b m");
        assert_eq!(c.inverse().inverse(), c);
    }
}
