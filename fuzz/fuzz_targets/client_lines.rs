//! Fuzz target for the client state machine
//!
//! Splits the input into lines and feeds them to a registered client. Any
//! sequence of server lines must leave the state model consistent.

#![no_main]

use libfuzzer_sys::fuzz_target;

use bones_irc::{Client, Config, EventBus};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let Ok(mut client) = Client::new(Config::new("irc.example.net", &["bones"]), EventBus::new())
    else {
        return;
    };
    client.connection_started();
    client.connection_made();
    client.handle_line(":irc.example.net 001 bones :Welcome");

    for line in input.lines().take(64) {
        client.handle_line(line);
    }

    let state = client.state();
    for channel in state.channels() {
        for &id in channel.members() {
            assert!(state.user(id).is_some());
        }
    }
    for user in state.users() {
        assert_eq!(state.user_id(&user.nickname), Some(user.id));
    }
});
