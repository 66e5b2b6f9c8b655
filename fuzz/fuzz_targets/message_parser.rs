//! Fuzz target for line parsing
//!
//! Feeds arbitrary lines to the parser and the mode and CTCP helpers that
//! consume its output. None of them may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

use bones_irc::{ctcp, mode, MessageRef, PrefixRef, ServerSupport};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if input.is_empty() || input.len() > 512 {
            return;
        }

        if let Ok(msg) = MessageRef::parse(input) {
            if let Some(source) = msg.source_name() {
                let _ = PrefixRef::parse(source);
            }
            if let Some((modes, args)) = msg.args.split_first() {
                let _ = mode::parse_mode_changes(modes, args, &ServerSupport::default());
                let _ = mode::parse_user_modes(modes);
            }
        }

        let _ = ctcp::extract(input);
    }
});
