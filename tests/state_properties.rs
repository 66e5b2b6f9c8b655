//! Property-based tests for the state model and mode bookkeeping.
//!
//! Uses proptest to drive random sequences of membership changes, renames
//! and mode changes, and checks that:
//! 1. Channel members match a reference model, and user channel lists
//!    always mirror them
//! 2. A user keeps its id and memberships across any chain of renames
//! 3. Replaying the undos of applied mode changes restores the modes

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use bones_irc::{CaseMapping, ChannelModes, ModeChange, ServerSupport, State};

// =============================================================================
// STRATEGIES
// =============================================================================

#[derive(Clone, Debug)]
enum Op {
    Join(usize, usize),
    Part(usize, usize),
    Quit(usize),
    RemoveChannel(usize),
}

const USERS: usize = 5;
const CHANNELS: usize = 3;

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..USERS, 0..CHANNELS).prop_map(|(u, c)| Op::Join(u, c)),
        2 => (0..USERS, 0..CHANNELS).prop_map(|(u, c)| Op::Part(u, c)),
        1 => (0..USERS).prop_map(Op::Quit),
        1 => (0..CHANNELS).prop_map(Op::RemoveChannel),
    ]
}

fn nick(u: usize) -> String {
    // Mixed case so lookups go through case folding.
    if u % 2 == 0 {
        format!("User{}", u)
    } else {
        format!("user{}", u)
    }
}

fn channel(c: usize) -> String {
    format!("#Chan{}", c)
}

fn mode_change_strategy() -> impl Strategy<Value = ModeChange> {
    let support = ServerSupport::default();
    (
        any::<bool>(),
        prop::sample::select(vec!['b', 'k', 'l', 'i', 'm', 'n', 't', 'o', 'v']),
        prop::sample::select(vec!["alice", "Alice", "bob", "*!*@spam", "10", "key"]),
    )
        .prop_map(move |(adding, mode, arg)| {
            let class = support
                .mode_class(mode)
                .unwrap_or(bones_irc::ModeClass::Never);
            let arg = class.takes_arg(adding).then(|| arg.to_string());
            ModeChange::new(adding, mode, class, arg)
        })
}

fn assert_consistent(state: &State) {
    let map = state.casemapping();
    for chan in state.channels() {
        for &id in chan.members() {
            let user = state.user(id).expect("member is tracked");
            assert!(
                user.channels.iter().any(|c| map.eq(c, &chan.name)),
                "{} is in {} but does not list it",
                user.nickname,
                chan.name
            );
        }
    }
    for user in state.users() {
        for name in &user.channels {
            let chan = state.channel(name).expect("listed channel is tracked");
            assert!(chan.has_member(user.id));
        }
        assert_eq!(state.user_id(&user.nickname), Some(user.id));
        if !state.is_me(user.id) {
            assert!(
                !user.channels.is_empty(),
                "{} shares no channel but is still tracked",
                user.nickname
            );
        }
    }
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn membership_stays_symmetric(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut state = State::new();
        state.set_me("bones");
        let mut model: HashMap<usize, BTreeSet<String>> = HashMap::new();

        for op in ops {
            match op {
                Op::Join(u, c) => {
                    let id = state.ensure_user(&nick(u));
                    state.join(&channel(c), id);
                    model.entry(c).or_default().insert(nick(u));
                }
                Op::Part(u, c) => {
                    if let Some(id) = state.user_id(&nick(u).to_lowercase()) {
                        state.detach(&channel(c).to_uppercase(), id);
                    }
                    if let Some(members) = model.get_mut(&c) {
                        members.remove(&nick(u));
                    }
                }
                Op::Quit(u) => {
                    if let Some(id) = state.user_id(&nick(u)) {
                        state.quit(id);
                    }
                    for members in model.values_mut() {
                        members.remove(&nick(u));
                    }
                }
                Op::RemoveChannel(c) => {
                    state.remove_channel(&channel(c));
                    model.remove(&c);
                }
            }
            assert_consistent(&state);

            for c in 0..CHANNELS {
                let actual: BTreeSet<String> = state
                    .members(&channel(c))
                    .into_iter()
                    .map(|user| user.nickname.clone())
                    .collect();
                let expected = model.get(&c).cloned().unwrap_or_default();
                prop_assert_eq!(actual, expected, "members of {}", channel(c));
            }
        }
        prop_assert!(state.me().is_some());
    }

    #[test]
    fn renames_preserve_identity(
        joins in prop::collection::btree_set(0..CHANNELS, 1..=CHANNELS),
        renames in 1..8usize,
    ) {
        let mut state = State::new();
        let id = state.ensure_user("alice");
        for &c in &joins {
            state.join(&channel(c), id);
            state.apply_modes(&channel(c), "+o", &["alice"]);
        }

        let mut current = "alice".to_string();
        for i in 0..renames {
            let next = format!("alice{}", i);
            prop_assert_eq!(state.rename(id, &next), Some(current.clone()));
            prop_assert_eq!(state.user_id(&current), None);
            current = next;
        }

        prop_assert_eq!(state.user_id(&current), Some(id));
        let user = state.user(id).unwrap();
        prop_assert_eq!(user.channels.len(), joins.len());
        for &c in &joins {
            let chan = state.channel(&channel(c)).unwrap();
            prop_assert!(chan.has_member(id));
            prop_assert!(chan.modes.has_member_mode('o', &current, state.casemapping()));
            prop_assert!(!chan.modes.has_member_mode('o', "alice", state.casemapping()));
        }
        assert_consistent(&state);
    }

    #[test]
    fn mode_undos_restore_state(
        setup in prop::collection::vec(mode_change_strategy(), 0..12),
        changes in prop::collection::vec(mode_change_strategy(), 1..24),
    ) {
        let map = CaseMapping::Rfc1459;
        let mut modes = ChannelModes::new();
        modes.apply_all(&setup, map);
        let before = modes.clone();

        let undos = modes.apply_all(&changes, map);
        for undo in undos.iter().rev() {
            modes.apply(undo, map);
        }
        prop_assert_eq!(modes, before);
    }

    #[test]
    fn inverse_is_an_involution(change in mode_change_strategy()) {
        prop_assert_eq!(change.inverse().inverse(), change.clone());
        prop_assert_ne!(change.inverse().adding, change.adding);
    }
}
