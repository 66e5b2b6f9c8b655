//! Channel and user tracking for one connection.
//!
//! Users live in an arena keyed by [`UserId`] with a separate index from
//! case-folded nickname to id. A rename only touches the index, so an id
//! captured before a nick change still resolves to the same user.
//!
//! Channels are keyed by case-folded name and hold member ids; each user
//! holds the display names of the channels it shares with the bot. Every
//! mutation here keeps both sides of that relation in step.

mod channel;
mod user;

use std::collections::HashMap;

use tracing::debug;

use crate::casemap::CaseMapping;
use crate::isupport::{Isupport, ServerSupport};
use crate::mode::{parse_mode_changes, ModeChange, ModeClass};
use crate::prefix::PrefixRef;

pub use self::channel::{Channel, Topic};
pub use self::user::{User, UserId};

/// All server-side state observed by one connection.
#[derive(Clone, Debug, Default)]
pub struct State {
    support: ServerSupport,
    channels: HashMap<String, Channel>,
    users: HashMap<UserId, User>,
    nicks: HashMap<String, UserId>,
    me: Option<UserId>,
    next_id: u64,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn support(&self) -> &ServerSupport {
        &self.support
    }

    pub fn casemapping(&self) -> CaseMapping {
        self.support.casemapping
    }

    pub fn is_channel(&self, target: &str) -> bool {
        self.support.is_channel(target)
    }

    fn key(&self, name: &str) -> String {
        self.support.casemapping.fold(name)
    }

    fn prefix_modes(&self) -> Vec<char> {
        self.support.prefixes.iter().map(|&(m, _)| m).collect()
    }

    /// Fold a 005 line into the capability set. A casemapping change
    /// re-keys both indexes.
    pub fn apply_isupport(&mut self, isupport: &Isupport<'_>) {
        let before = self.support.casemapping;
        self.support.apply(isupport);
        if self.support.casemapping != before {
            debug!(casemapping = %self.support.casemapping, "re-keying state");
            let map = self.support.casemapping;
            self.channels = self
                .channels
                .drain()
                .map(|(_, c)| (map.fold(&c.name), c))
                .collect();
            self.nicks = self
                .users
                .values()
                .map(|u| (map.fold(&u.nickname), u.id))
                .collect();
        }
    }

    // Users

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_id(&self, nick: &str) -> Option<UserId> {
        self.nicks.get(&self.key(nick)).copied()
    }

    pub fn user_by_nick(&self, nick: &str) -> Option<&User> {
        self.user_id(nick).and_then(|id| self.users.get(&id))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Look up or lazily create a user knowing only its nickname.
    pub fn ensure_user(&mut self, nick: &str) -> UserId {
        if let Some(id) = self.user_id(nick) {
            return id;
        }
        let id = UserId(self.next_id);
        self.next_id += 1;
        let key = self.key(nick);
        self.users.insert(id, User::new(id, nick));
        self.nicks.insert(key, id);
        debug!(user = %id, nick, "tracking user");
        id
    }

    /// Look up or create the user behind a message source, filling in
    /// username and hostname when the hostmask carries them.
    pub fn observe(&mut self, prefix: &PrefixRef<'_>) -> UserId {
        let id = self.ensure_user(prefix.name());
        if let Some(user) = self.users.get_mut(&id) {
            if let Some(username) = prefix.user() {
                user.username = Some(username.to_owned());
            }
            if let PrefixRef::User {
                host: Some(host), ..
            } = prefix
            {
                user.hostname = Some((*host).to_owned());
            }
        }
        id
    }

    /// Record which user is the bot itself.
    pub fn set_me(&mut self, nick: &str) -> UserId {
        let id = self.ensure_user(nick);
        self.me = Some(id);
        id
    }

    pub fn me(&self) -> Option<UserId> {
        self.me
    }

    pub fn is_me(&self, id: UserId) -> bool {
        self.me == Some(id)
    }

    /// Rename a user in place: the id and memberships are kept, the nick
    /// index is re-keyed and prefix-mode entries follow the new name.
    pub fn rename(&mut self, id: UserId, new_nick: &str) -> Option<String> {
        if !self.users.contains_key(&id) {
            return None;
        }
        // A stale entry already holding the new nick is gone from the server.
        if let Some(stale) = self.user_id(new_nick).filter(|&other| other != id) {
            self.quit(stale);
        }
        let map = self.support.casemapping;
        let prefix_modes = self.prefix_modes();
        let user = self.users.get_mut(&id)?;
        let old = std::mem::replace(&mut user.nickname, new_nick.to_owned());

        self.nicks.remove(&map.fold(&old));
        self.nicks.insert(map.fold(new_nick), id);
        for channel in self.channels.values_mut() {
            channel
                .modes
                .rename_nick(&prefix_modes, &old, new_nick, map);
        }
        Some(old)
    }

    /// Remove a user from every channel and forget it.
    pub fn quit(&mut self, id: UserId) -> Option<User> {
        let user = self.users.get(&id)?;
        let nick = user.nickname.clone();
        let map = self.support.casemapping;
        let prefix_modes = self.prefix_modes();
        for channel in self.channels.values_mut() {
            if channel.remove_member(id) {
                channel.modes.forget_nick(&prefix_modes, &nick, map);
            }
        }
        self.nicks.remove(&map.fold(&nick));
        if self.me == Some(id) {
            self.me = None;
        }
        debug!(user = %id, nick = %nick, "forgetting user");
        self.users.remove(&id)
    }

    fn prune(&mut self, id: UserId) {
        let orphaned = self
            .users
            .get(&id)
            .map_or(false, |u| u.channels.is_empty());
        if orphaned && !self.is_me(id) {
            self.quit(id);
        }
    }

    // Channels

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&self.key(name))
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        let key = self.key(name);
        self.channels.get_mut(&key)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Look up or create a channel on first reference.
    pub fn ensure_channel(&mut self, name: &str) -> &mut Channel {
        let key = self.key(name);
        self.channels.entry(key).or_insert_with(|| {
            debug!(channel = name, "tracking channel");
            Channel::new(name)
        })
    }

    /// Members of a channel, resolved.
    pub fn members(&self, name: &str) -> Vec<&User> {
        self.channel(name)
            .map(|c| c.members.iter().filter_map(|id| self.users.get(id)).collect())
            .unwrap_or_default()
    }

    /// Add a membership on both sides. Idempotent.
    pub fn join(&mut self, name: &str, id: UserId) {
        let map = self.support.casemapping;
        let display = {
            let channel = self.ensure_channel(name);
            channel.add_member(id);
            channel.name.clone()
        };
        if let Some(user) = self.users.get_mut(&id) {
            if !user.channels.iter().any(|c| map.eq(c, &display)) {
                user.channels.push(display);
            }
        }
    }

    /// Remove a membership on both sides, dropping the user's prefix-mode
    /// entries in that channel. A user left sharing no channel is forgotten.
    pub fn detach(&mut self, name: &str, id: UserId) {
        let map = self.support.casemapping;
        let prefix_modes = self.prefix_modes();
        let nick = match self.users.get_mut(&id) {
            Some(user) => {
                user.channels.retain(|c| !map.eq(c, name));
                user.nickname.clone()
            }
            None => return,
        };
        if let Some(channel) = self.channel_mut(name) {
            channel.remove_member(id);
            channel.modes.forget_nick(&prefix_modes, &nick, map);
        }
        self.prune(id);
    }

    /// Drop a channel the bot left or was kicked from, detaching it from
    /// every member and forgetting members left with no shared channel.
    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        let key = self.key(name);
        let map = self.support.casemapping;
        let channel = self.channels.remove(&key)?;
        for id in &channel.members {
            if let Some(user) = self.users.get_mut(id) {
                user.channels.retain(|c| !map.eq(c, &channel.name));
            }
        }
        for &id in &channel.members {
            self.prune(id);
        }
        Some(channel)
    }

    /// Forget everything learned from the server. The capability set
    /// returns to defaults as the next connection may differ.
    pub fn clear(&mut self) {
        self.channels.clear();
        self.users.clear();
        self.nicks.clear();
        self.me = None;
        self.support = ServerSupport::default();
    }

    // Modes and topics

    /// Parse and apply a channel mode string. Returns the applied changes.
    pub fn apply_modes(&mut self, name: &str, modes: &str, args: &[&str]) -> Vec<ModeChange> {
        let changes = parse_mode_changes(modes, args, &self.support);
        let map = self.support.casemapping;
        let channel = self.ensure_channel(name);
        for change in &changes {
            channel.modes.apply(change, map);
        }
        changes
    }

    /// Replace a channel's flags and parameters with a full mode listing
    /// (324). List and prefix entries are kept.
    pub fn reset_modes(&mut self, name: &str, modes: &str, args: &[&str]) -> Vec<ModeChange> {
        self.ensure_channel(name).modes.clear_settings();
        self.apply_modes(name, modes, args)
    }

    /// Apply one NAMES reply (353) payload such as `@alice +bob carol`.
    pub fn apply_names(&mut self, name: &str, names: &str) {
        let map = self.support.casemapping;
        for entry in names.split_whitespace() {
            let (modes, nick) = self.support.strip_prefixes(entry);
            if nick.is_empty() {
                continue;
            }
            let id = self.ensure_user(nick);
            self.join(name, id);
            let channel = self.ensure_channel(name);
            for mode in modes {
                let change = ModeChange::new(true, mode, ModeClass::Prefix, Some(nick.to_owned()));
                channel.modes.apply(&change, map);
            }
        }
    }

    pub fn set_topic(&mut self, name: &str, topic: Option<Topic>) {
        self.ensure_channel(name).topic = topic;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_support(tokens: &[&str]) -> State {
        let mut state = State::new();
        state.apply_isupport(&Isupport::parse_params(tokens));
        state
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut state = State::new();
        let alice = state.ensure_user("alice");
        state.join("#rust", alice);
        state.join("#RUST", alice);
        assert_eq!(state.channel("#rust").unwrap().members(), &[alice]);
        assert_eq!(state.user(alice).unwrap().channels, vec!["#rust"]);
    }

    #[test]
    fn test_names_reply_with_prefixes() {
        let mut state = with_support(&["PREFIX=(ov)@+", "CHANMODES=b,k,l,imnpst"]);
        state.apply_names("#rust", "@alice +bob carol");

        let nicks: Vec<&str> = state
            .members("#rust")
            .iter()
            .map(|u| u.nickname.as_str())
            .collect();
        assert_eq!(nicks, vec!["alice", "bob", "carol"]);

        let modes = &state.channel("#rust").unwrap().modes;
        let map = state.casemapping();
        assert!(modes.has_member_mode('o', "alice", map));
        assert!(modes.has_member_mode('v', "bob", map));
        assert!(!modes.has_member_mode('o', "bob", map));
        assert!(!modes.has_member_mode('v', "carol", map));
    }

    #[test]
    fn test_rename_preserves_identity_and_modes() {
        let mut state = State::new();
        state.apply_names("#rust", "@alice");
        let id = state.user_id("alice").unwrap();

        assert_eq!(state.rename(id, "Alicia").as_deref(), Some("alice"));
        assert_eq!(state.user_id("alicia"), Some(id));
        assert_eq!(state.user_id("alice"), None);
        assert_eq!(state.user(id).unwrap().nickname, "Alicia");

        let modes = &state.channel("#rust").unwrap().modes;
        assert!(modes.has_member_mode('o', "Alicia", state.casemapping()));
        assert!(state.channel("#rust").unwrap().has_member(id));
    }

    #[test]
    fn test_rename_onto_stale_nick_forgets_it() {
        let mut state = State::new();
        state.apply_names("#rust", "alice bob");
        let alice = state.user_id("alice").unwrap();
        let bob = state.user_id("bob").unwrap();

        state.rename(alice, "BOB");
        assert_eq!(state.user_id("bob"), Some(alice));
        assert!(state.user(bob).is_none());
        assert_eq!(state.channel("#rust").unwrap().members(), &[alice]);
    }

    #[test]
    fn test_quit_removes_everywhere() {
        let mut state = State::new();
        state.apply_names("#a", "@bob");
        state.apply_names("#b", "bob");
        let bob = state.user_id("bob").unwrap();

        state.quit(bob);
        assert!(state.user(bob).is_none());
        assert!(state.user_id("bob").is_none());
        assert!(state.channel("#a").unwrap().members().is_empty());
        assert!(state.channel("#b").unwrap().members().is_empty());
        assert_eq!(state.channel("#a").unwrap().modes.list('o').count(), 0);
    }

    #[test]
    fn test_detach_prunes_orphans_but_not_me() {
        let mut state = State::new();
        let me = state.set_me("bones");
        let carol = state.ensure_user("carol");
        state.join("#a", me);
        state.join("#a", carol);

        state.detach("#a", carol);
        assert!(state.user(carol).is_none());

        state.detach("#a", me);
        assert!(state.user(me).is_some());
    }

    #[test]
    fn test_remove_channel_detaches_members() {
        let mut state = State::new();
        let me = state.set_me("bones");
        state.join("#a", me);
        state.join("#b", me);
        state.apply_names("#a", "dave eve");
        state.apply_names("#b", "eve");

        state.remove_channel("#a");
        assert!(state.channel("#a").is_none());
        assert!(state.user_id("dave").is_none());
        let eve = state.user_by_nick("eve").unwrap();
        assert_eq!(eve.channels, vec!["#b"]);
        assert_eq!(state.user(me).unwrap().channels, vec!["#b"]);
    }

    #[test]
    fn test_observe_enriches_hostmask() {
        let mut state = State::new();
        let id = state.ensure_user("alice");
        state.observe(&PrefixRef::parse("alice!al@example.net"));
        let user = state.user(id).unwrap();
        assert_eq!(user.hostmask(), "alice!al@example.net");
    }

    #[test]
    fn test_casemapping_change_rekeys() {
        let mut state = State::new();
        state.ensure_user("a[b]");
        assert!(state.user_id("A{B}").is_some());
        state.apply_isupport(&Isupport::parse_params(&["CASEMAPPING=ascii"]));
        assert!(state.user_id("A{B}").is_none());
        assert!(state.user_id("A[B]").is_some());
    }

    #[test]
    fn test_apply_modes_on_channel() {
        let mut state = with_support(&["PREFIX=(ov)@+", "CHANMODES=b,k,l,imnpst"]);
        let applied = state.apply_modes("#rust", "+ntl", &["25"]);
        assert_eq!(applied.len(), 3);
        let modes = &state.channel("#rust").unwrap().modes;
        assert!(modes.has_flag('n'));
        assert_eq!(modes.param('l'), Some("25"));
    }

    #[test]
    fn test_reset_modes_replaces_settings() {
        let mut state = with_support(&["PREFIX=(ov)@+", "CHANMODES=b,k,l,imnpst"]);
        state.apply_names("#rust", "@alice");
        state.apply_modes("#rust", "+mkb", &["secret", "*!*@spam"]);
        state.reset_modes("#rust", "+nl", &["25"]);

        let modes = &state.channel("#rust").unwrap().modes;
        assert!(!modes.has_flag('m'));
        assert_eq!(modes.param('k'), None);
        assert!(modes.has_flag('n'));
        assert_eq!(modes.param('l'), Some("25"));
        assert_eq!(modes.list('b').collect::<Vec<_>>(), vec!["*!*@spam"]);
        assert!(modes.has_member_mode('o', "alice", state.casemapping()));
    }
}
