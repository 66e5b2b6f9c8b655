//! Sans-IO protocol state machine for one server connection.
//!
//! A [`Client`] consumes lifecycle notifications and inbound lines, keeps
//! the [`State`] up to date, fires events on the [`EventBus`], and returns
//! the [`Action`]s its driver should perform. It never touches a socket or
//! a clock-driven timer itself, so it is driven the same way by the tokio
//! [`session`](crate::session) and by tests.
//!
//! # Example
//!
//! ```
//! use bones_irc::client::Client;
//! use bones_irc::config::Config;
//! use bones_irc::event::{Action, EventBus};
//!
//! let mut config = Config::new("irc.example.net", &["bones"]);
//! config.server.channels = vec!["#bones".to_string()];
//! let mut client = Client::new(config, EventBus::new()).unwrap();
//!
//! client.connection_started();
//! let hello = client.connection_made();
//! assert_eq!(hello.len(), 2); // NICK and USER
//!
//! let actions = client.handle_line(":irc.example.net 001 bones :Welcome");
//! assert!(actions
//!     .iter()
//!     .any(|a| matches!(a, Action::Send(m) if m.to_line() == "JOIN #bones")));
//! ```

mod commands;
mod messages;
mod numerics;

use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::error::ConfigError;
use crate::event::{
    Action, Context, Event, EventBus, EventData, ModuleRegistry, Outbox, Request, Timer, UserInfo,
};
use crate::message::{Message, MessageRef};
use crate::prefix::PrefixRef;
use crate::response::Response;
use crate::state::State;
use crate::supervisor::Supervisor;

/// Where the connection is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Connecting or registering.
    Connecting,
    /// 001 received.
    Registered,
}

/// Outcome of a dropped connection.
#[derive(Debug, Default)]
pub struct Closed {
    /// Timers scheduled by handlers of the close events.
    pub actions: Vec<Action>,
    /// Delay before reconnecting, or `None` to stay down.
    pub retry_in: Option<Duration>,
}

pub struct Client {
    config: Config,
    tag: String,
    bus: EventBus,
    state: State,
    conn: ConnectionState,
    /// Nickname in use, or being attempted during registration.
    nickname: String,
    alternates: VecDeque<String>,
    /// True once the stream is open; decides lost versus failed.
    connected: bool,
    motd: Vec<String>,
    user_modes: BTreeSet<char>,
    supervisor: Supervisor,
}

impl Client {
    pub fn new(config: Config, bus: EventBus) -> Result<Self, ConfigError> {
        config.validate()?;
        let tag = config.tag().to_owned();
        let supervisor = Supervisor::new(&config.reconnect);
        let nickname = config.nickname().unwrap_or_default().to_owned();
        Ok(Client {
            tag,
            bus,
            state: State::new(),
            conn: ConnectionState::Disconnected,
            nickname,
            alternates: config.alternates().iter().cloned().collect(),
            connected: false,
            motd: Vec::new(),
            user_modes: BTreeSet::new(),
            supervisor,
            config,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.conn
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Our user modes, as last reported by the server.
    pub fn user_modes(&self) -> &BTreeSet<char> {
        &self.user_modes
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Load the configured modules onto this connection's tag, announcing
    /// each, then fire `BotInitialized`.
    pub fn initialize(&mut self, registry: &ModuleRegistry) -> Vec<Action> {
        let mut out = Outbox::new();
        for name in registry.load_all(&self.bus, &self.config, &self.tag) {
            self.fire(EventData::ModuleLoaded { name }, &mut out);
        }
        self.fire(EventData::BotInitialized, &mut out);
        self.finish(out)
    }

    /// A connection attempt is about to be made.
    pub fn connection_started(&mut self) -> Vec<Action> {
        let mut out = Outbox::new();
        self.conn = ConnectionState::Connecting;
        info!(tag = %self.tag, host = %self.config.display_host(), port = self.config.server.port, "connecting");
        let data = EventData::ConnectionStarted {
            host: self.config.connect_host().to_owned(),
            port: self.config.server.port,
        };
        self.fire(data, &mut out);
        self.finish(out)
    }

    /// The stream is open: register.
    pub fn connection_made(&mut self) -> Vec<Action> {
        let mut out = Outbox::new();
        self.connected = true;
        self.conn = ConnectionState::Connecting;
        self.nickname = self.config.nickname().unwrap_or_default().to_owned();
        self.alternates = self.config.alternates().iter().cloned().collect();

        if let Some(password) = &self.config.server.password {
            out.send(Message::new("PASS", [password.as_str()]));
        }
        out.send(Message::nick(&self.nickname));
        out.send(Message::user(&self.config.username(), self.config.realname()));
        self.fire(EventData::ConnectionEstablished, &mut out);
        self.finish(out)
    }

    /// The connection ended, or never came up. Fires `ConnectionClosed`
    /// and, unless reconnecting is disabled, `ConnectionLost` or
    /// `ConnectionFailed`. Server state is forgotten.
    pub fn connection_closed(&mut self, reason: &str) -> Closed {
        let mut out = Outbox::new();
        let was_connected = std::mem::replace(&mut self.connected, false);
        self.conn = ConnectionState::Disconnected;

        self.fire(
            EventData::ConnectionClosed {
                reason: reason.to_owned(),
            },
            &mut out,
        );

        let retry_in = if !self.supervisor.is_enabled() {
            info!(tag = %self.tag, reason, "connection closed");
            None
        } else if was_connected {
            let retry_in = self.supervisor.lost(&self.tag);
            let data = EventData::ConnectionLost {
                reason: reason.to_owned(),
                retry_in,
            };
            self.fire(data, &mut out);
            retry_in
        } else {
            let retry_in = self.supervisor.failed(&self.tag);
            let data = EventData::ConnectionFailed {
                reason: reason.to_owned(),
                retry_in,
            };
            self.fire(data, &mut out);
            retry_in
        };

        self.state.clear();
        self.motd.clear();
        self.user_modes.clear();

        let actions = out
            .take_actions()
            .into_iter()
            .filter(|a| matches!(a, Action::Schedule { .. }))
            .collect();
        Closed { actions, retry_in }
    }

    /// Handle one raw inbound line. Malformed lines are logged and dropped.
    pub fn handle_line(&mut self, line: &str) -> Vec<Action> {
        trace!(tag = %self.tag, line, "<<");
        match MessageRef::parse(line) {
            Ok(msg) => self.handle_message(&msg),
            Err(err) => {
                warn!(tag = %self.tag, line, error = %err, "dropping malformed line");
                Vec::new()
            }
        }
    }

    pub fn handle_message(&mut self, msg: &MessageRef<'_>) -> Vec<Action> {
        let mut out = Outbox::new();
        self.dispatch(msg, &mut out);
        self.finish(out)
    }

    /// A timer scheduled through `Context::schedule` is due.
    pub fn timer_elapsed(&mut self, timer: Timer) -> Vec<Action> {
        let mut out = Outbox::new();
        self.fire(EventData::Timer(timer), &mut out);
        self.finish(out)
    }

    /// Join a channel, letting `BotPreJoin` handlers veto it.
    pub fn join(&mut self, channel: &str, key: Option<&str>) -> Vec<Action> {
        let mut out = Outbox::new();
        self.join_channel(channel, key, &mut out);
        self.finish(out)
    }

    /// Quit with `message`, or the configured quit message.
    pub fn quit(&mut self, message: Option<&str>) -> Vec<Action> {
        let mut out = Outbox::new();
        self.send_quit(message, &mut out);
        self.finish(out)
    }

    /// Stop reconnecting and quit if connected. The driver finishes once
    /// the connection has closed; when nothing is connected the returned
    /// list is empty and it may finish immediately.
    pub fn shutdown(&mut self) -> Vec<Action> {
        self.supervisor.disable();
        if !self.connected {
            return Vec::new();
        }
        self.quit(None)
    }

    // Dispatch plumbing

    fn fire(&mut self, data: EventData, out: &mut Outbox) -> Event {
        self.fire_with(data, out, |_, _| {})
    }

    fn fire_with<F>(&mut self, data: EventData, out: &mut Outbox, on_complete: F) -> Event
    where
        F: FnOnce(&Event, &mut Context<'_>),
    {
        let mut event = Event::new(self.tag.as_str(), data);
        let mut ctx = Context::new(&self.tag, &mut self.state, out);
        self.bus.fire_with(&mut event, &mut ctx, on_complete);
        event
    }

    /// Run queued joins and quits, then hand back the actions.
    fn finish(&mut self, mut out: Outbox) -> Vec<Action> {
        while let Some(request) = out.next_request() {
            match request {
                Request::Join { channel, key } => {
                    self.join_channel(&channel, key.as_deref(), &mut out)
                }
                Request::Quit { message } => self.send_quit(message.as_deref(), &mut out),
            }
        }
        out.take_actions()
    }

    fn join_channel(&mut self, channel: &str, key: Option<&str>, out: &mut Outbox) {
        let data = EventData::BotPreJoin {
            channel: channel.to_owned(),
            key: key.map(str::to_owned),
        };
        self.fire_with(data, out, |event, ctx| {
            if event.is_cancelled() {
                debug!(channel, "join vetoed");
                return;
            }
            match key {
                Some(key) => ctx.send(Message::join_with_key(channel, key)),
                None => ctx.send(Message::join(channel)),
            }
        });
    }

    fn send_quit(&mut self, message: Option<&str>, out: &mut Outbox) {
        let message = message
            .unwrap_or(self.config.bot.quit_message.as_str())
            .to_owned();
        let data = EventData::BotPreQuit {
            message: message.clone(),
        };
        self.fire_with(data, out, |event, ctx| {
            if event.is_cancelled() {
                ctx.send(Message::quit(None));
            } else {
                ctx.send(Message::quit(Some(&message)));
            }
        });
    }

    fn dispatch(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        if let Ok(response) = msg.command.parse::<Response>() {
            self.on_numeric(response, msg, out);
            return;
        }
        let command = msg.command.to_ascii_uppercase();
        if let Err(err) = msg.expect_args(min_args(&command)) {
            warn!(tag = %self.tag, line = msg.raw, error = %err, "dropping short line");
            return;
        }
        match command.as_str() {
            "PING" => {
                let token = msg.arg(0).unwrap_or_default();
                out.send(Message::pong(token));
            }
            "PONG" => {}
            "ERROR" => {
                let message = msg.trailing().unwrap_or_default().to_owned();
                warn!(tag = %self.tag, %message, "server error");
                self.fire(EventData::ServerError { message }, out);
            }
            "JOIN" => self.on_join(msg, out),
            "PART" => self.on_part(msg, out),
            "KICK" => self.on_kick(msg, out),
            "QUIT" => self.on_quit(msg, out),
            "NICK" => self.on_nick(msg, out),
            "MODE" => self.on_mode(msg, out),
            "TOPIC" => self.on_topic(msg, out),
            "INVITE" => self.on_invite(msg, out),
            "PRIVMSG" => self.on_privmsg(msg, out),
            "NOTICE" => self.on_notice(msg, out),
            _ => self.on_unknown(msg, out),
        }
    }

    fn on_unknown(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        debug!(tag = %self.tag, command = msg.command, "unhandled command");
        let data = EventData::UnknownCommand {
            source: msg.source_name().map(str::to_owned),
            command: msg.command.to_owned(),
            args: msg.args.iter().map(|a| (*a).to_owned()).collect(),
        };
        self.fire(data, out);
    }

    // Helpers shared by the handlers

    fn is_self(&self, nick: &str) -> bool {
        self.state.casemapping().eq(nick, &self.nickname)
    }

    /// Snapshot of a message source. Users already tracked are enriched
    /// from the hostmask; others are described without being tracked.
    fn source_info(&mut self, prefix: Option<&PrefixRef<'_>>) -> UserInfo {
        let Some(prefix) = prefix else {
            return UserInfo::named("");
        };
        if !prefix.is_server() && self.state.user_id(prefix.name()).is_some() {
            let id = self.state.observe(prefix);
            if let Some(user) = self.state.user(id) {
                return UserInfo::from(user);
            }
        }
        untracked(prefix)
    }

    /// Track the source of a message and describe it.
    fn observe(&mut self, prefix: Option<&PrefixRef<'_>>) -> Option<UserInfo> {
        let prefix = prefix.filter(|p| !p.is_server())?;
        let id = self.state.observe(prefix);
        self.state.user(id).map(UserInfo::from)
    }

    fn user_info(&self, nick: &str) -> UserInfo {
        self.state
            .user_by_nick(nick)
            .map_or_else(|| UserInfo::named(nick), UserInfo::from)
    }
}

/// Arguments a command needs before its handler can make sense of it.
fn min_args(command: &str) -> usize {
    match command {
        "JOIN" | "PART" | "NICK" | "TOPIC" => 1,
        "KICK" | "MODE" | "INVITE" | "PRIVMSG" | "NOTICE" => 2,
        _ => 0,
    }
}

fn untracked(prefix: &PrefixRef<'_>) -> UserInfo {
    match prefix {
        PrefixRef::User { nick, user, host } => UserInfo {
            id: None,
            nick: (*nick).to_owned(),
            username: user.map(str::to_owned),
            hostname: host.map(str::to_owned),
        },
        PrefixRef::Server(name) => UserInfo::named(name),
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag", &self.tag)
            .field("conn", &self.conn)
            .field("nickname", &self.nickname)
            .finish_non_exhaustive()
    }
}
