use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use tracing::trace;

use crate::ctcp;
use crate::message::Message;
use crate::state::State;
use crate::util::{text_budget, wrap_text};

/// A scheduled step of a multi-step response.
///
/// Handlers keep their progress in `step` and reschedule the same `key`
/// with the next step when the `Timer` event for it arrives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Timer {
    pub key: String,
    pub step: u32,
    /// Channel or nickname the timed response is addressed to.
    pub target: String,
}

impl Timer {
    pub fn new(key: impl Into<String>, step: u32, target: impl Into<String>) -> Self {
        Timer {
            key: key.into(),
            step,
            target: target.into(),
        }
    }

    /// The same timer at the following step.
    #[must_use]
    pub fn next(&self) -> Self {
        Timer {
            key: self.key.clone(),
            step: self.step + 1,
            target: self.target.clone(),
        }
    }
}

/// What the client asks its driver to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Write a line to the server.
    Send(Message),
    /// Deliver a `Timer` event after `delay`.
    Schedule { delay: Duration, timer: Timer },
    /// Close the connection without waiting for the server.
    Disconnect { reason: String },
}

/// Operations that need their own events fired, queued by handlers and
/// run by the client once the current fire has finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Join {
        channel: String,
        key: Option<String>,
    },
    Quit {
        message: Option<String>,
    },
}

/// Output accumulated while handling one input.
#[derive(Debug, Default)]
pub struct Outbox {
    actions: Vec<Action>,
    requests: VecDeque<Request>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn send(&mut self, message: Message) {
        trace!(line = %message, "queued");
        self.actions.push(Action::Send(message));
    }

    pub(crate) fn request(&mut self, request: Request) {
        self.requests.push_back(request);
    }

    pub(crate) fn next_request(&mut self) -> Option<Request> {
        self.requests.pop_front()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }
}

/// What a handler can see and do while an event is being dispatched.
///
/// State is read-only to handlers; everything they want done goes through
/// the outbox and is performed after dispatch.
pub struct Context<'a> {
    tag: &'a str,
    state: &'a mut State,
    outbox: &'a mut Outbox,
}

impl<'a> Context<'a> {
    pub fn new(tag: &'a str, state: &'a mut State, outbox: &'a mut Outbox) -> Self {
        Context { tag, state, outbox }
    }

    pub fn tag(&self) -> &str {
        self.tag
    }

    pub fn state(&self) -> &State {
        self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut State {
        self.state
    }

    /// Current nickname of the bot, once known.
    pub fn nickname(&self) -> Option<&str> {
        let me = self.state.me()?;
        self.state.user(me).map(|u| u.nickname.as_str())
    }

    pub fn send(&mut self, message: Message) {
        self.outbox.send(message);
    }

    /// Send a raw pre-formatted line.
    pub fn raw(&mut self, line: &str) {
        self.send(Message::raw(line));
    }

    fn wrapped(&mut self, command: &str, target: &str, text: &str) {
        for chunk in wrap_text(text, text_budget(command, target)) {
            self.send(Message::new(command, [target, chunk]));
        }
    }

    /// PRIVMSG, one line per newline, long lines split to fit.
    pub fn privmsg(&mut self, target: &str, text: &str) {
        self.wrapped("PRIVMSG", target, text);
    }

    pub fn notice(&mut self, target: &str, text: &str) {
        self.wrapped("NOTICE", target, text);
    }

    /// CTCP ACTION, one per line.
    pub fn action(&mut self, target: &str, text: &str) {
        for line in text.lines().filter(|l| !l.is_empty()) {
            self.send(Message::action(target, line));
        }
    }

    pub fn ctcp_reply(&mut self, target: &str, command: &str, data: Option<&str>) {
        self.send(Message::ctcp_reply(target, command, data));
    }

    /// CTCP PING stamped with the current time; the reply arrives as a
    /// `CtcpPong` event carrying the round trip.
    pub fn ctcp_ping(&mut self, target: &str) {
        let stamp = Utc::now().timestamp_millis().to_string();
        self.send(Message::privmsg(target, &ctcp::quote("PING", Some(&stamp))));
    }

    pub fn part(&mut self, channel: &str, reason: Option<&str>) {
        self.send(Message::part(channel, reason));
    }

    pub fn kick(&mut self, channel: &str, nick: &str, reason: Option<&str>) {
        self.send(Message::kick(channel, nick, reason));
    }

    pub fn topic(&mut self, channel: &str, text: &str) {
        self.send(Message::topic(channel, text));
    }

    pub fn mode<I, P>(&mut self, target: &str, changes: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.send(Message::mode(target, changes));
    }

    /// Join a channel. `BotPreJoin` fires first and may veto it.
    pub fn join(&mut self, channel: &str, key: Option<&str>) {
        self.outbox.request(Request::Join {
            channel: channel.to_owned(),
            key: key.map(str::to_owned),
        });
    }

    /// Quit the server. `BotPreQuit` fires first.
    pub fn quit(&mut self, message: Option<&str>) {
        self.outbox.request(Request::Quit {
            message: message.map(str::to_owned),
        });
    }

    /// Ask for a `Timer` event after `delay`.
    pub fn schedule(&mut self, delay: Duration, timer: Timer) {
        self.outbox.push(Action::Schedule { delay, timer });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privmsg_splits_newlines() {
        let mut state = State::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new("net", &mut state, &mut outbox);
        ctx.privmsg("#rust", "one\n\ntwo");
        let lines: Vec<String> = outbox
            .actions()
            .iter()
            .map(|a| match a {
                Action::Send(m) => m.to_line(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(lines, vec!["PRIVMSG #rust one", "PRIVMSG #rust two"]);
    }

    #[test]
    fn test_long_text_is_wrapped() {
        let mut state = State::new();
        let mut outbox = Outbox::new();
        let text = "x".repeat(1000);
        Context::new("net", &mut state, &mut outbox).privmsg("#rust", &text);
        assert!(outbox.actions().len() >= 3);
        for action in outbox.actions() {
            if let Action::Send(m) = action {
                assert!(m.wire_len() + crate::util::SOURCE_ALLOWANCE <= 512);
            }
        }
    }

    #[test]
    fn test_join_and_quit_are_requests() {
        let mut state = State::new();
        let mut outbox = Outbox::new();
        {
            let mut ctx = Context::new("net", &mut state, &mut outbox);
            ctx.join("#rust", None);
            ctx.quit(Some("bye"));
        }
        assert!(outbox.actions().is_empty());
        assert_eq!(
            outbox.next_request(),
            Some(Request::Join {
                channel: "#rust".into(),
                key: None
            })
        );
        assert_eq!(
            outbox.next_request(),
            Some(Request::Quit {
                message: Some("bye".into())
            })
        );
        assert_eq!(outbox.next_request(), None);
    }

    #[test]
    fn test_timer_next_step() {
        let timer = Timer::new("dance", 0, "#rust");
        let next = timer.next();
        assert_eq!(next.step, 1);
        assert_eq!(next.key, "dance");
    }
}
