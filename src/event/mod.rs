//! Events, the event bus, and the module contract.
//!
//! Every protocol occurrence the bot cares about becomes an [`Event`] fired
//! on the [`EventBus`] under the connection's tag. Handlers declared by
//! [`Module`]s run in registration order, each seeing the same event. Any
//! of them may [`cancel`](Event::cancel) it; cancellation only matters to
//! the post-fire callback, which runs regardless and decides whether the
//! default reaction (joining on invite, replying to VERSION, ...) happens.
//!
//! # Example
//!
//! ```
//! use bones_irc::event::{Context, Event, EventBus, EventKind, Handler, Module};
//!
//! #[derive(Default)]
//! struct NoAutoJoin;
//!
//! impl NoAutoJoin {
//!     fn veto(&mut self, event: &mut Event, _ctx: &mut Context<'_>) -> anyhow::Result<()> {
//!         event.cancel();
//!         Ok(())
//!     }
//! }
//!
//! impl Module for NoAutoJoin {
//!     fn handlers(&self) -> Vec<Handler<Self>> {
//!         vec![Handler::on(EventKind::BotInvite, Self::veto)]
//!     }
//! }
//!
//! let bus = EventBus::new();
//! bus.register("irc.example.net", NoAutoJoin).unwrap();
//! assert_eq!(bus.module_count("irc.example.net"), 1);
//! ```

mod bus;
mod context;
mod module;
mod trigger;

use std::fmt;
use std::time::Duration;

use crate::mode::ModeChange;
use crate::state::{Topic, User, UserId};

pub use self::bus::EventBus;
pub use self::context::{Action, Context, Outbox, Request, Timer};
pub use self::module::{Handler, HandlerFn, Module, ModuleRegistry, Subscription};
pub use self::trigger::{fold_keyword, TriggerMatch};

/// Snapshot of a user at the time an event was built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    /// Tracked identity; `None` for sources that are not tracked (servers).
    pub id: Option<UserId>,
    pub nick: String,
    pub username: Option<String>,
    pub hostname: Option<String>,
}

impl UserInfo {
    /// An untracked source known only by name.
    pub fn named(nick: &str) -> Self {
        UserInfo {
            id: None,
            nick: nick.to_owned(),
            username: None,
            hostname: None,
        }
    }
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: Some(user.id),
            nick: user.nickname.clone(),
            username: user.username.clone(),
            hostname: user.hostname.clone(),
        }
    }
}

impl fmt::Display for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nick)
    }
}

/// Where a message was sent, and where replies should go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Channel(String),
    /// A private message; replies go back to this user.
    User(UserInfo),
}

impl Target {
    /// Name to address a reply to.
    pub fn name(&self) -> &str {
        match self {
            Target::Channel(name) => name,
            Target::User(user) => &user.nick,
        }
    }

    pub fn channel(&self) -> Option<&str> {
        match self {
            Target::Channel(name) => Some(name),
            Target::User(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed set of event kinds. Subscriptions match on these exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    ConnectionStarted,
    ConnectionEstablished,
    ConnectionClosed,
    ConnectionLost,
    ConnectionFailed,
    BotInitialized,
    ModuleLoaded,
    ServerSupport,
    ServerHostInfo,
    ServerCreated,
    ServerInfo,
    ServerBounce,
    ServerLuserClient,
    ServerLuserOp,
    ServerLuserChannels,
    ServerLuserMe,
    ServerMotd,
    ServerError,
    BotSignedOn,
    BotPreJoin,
    BotJoin,
    BotPart,
    BotKicked,
    BotNickChanged,
    BotInvite,
    BotNoticeReceived,
    BotPreQuit,
    PreNicknameInUse,
    RegistrationFailed,
    UserJoin,
    UserPart,
    UserQuit,
    UserKicked,
    UserNickChanged,
    UserAction,
    ChannelTopicChanged,
    ModeChanged,
    Privmsg,
    ChannelMessage,
    UserMessage,
    Trigger,
    CtcpVersion,
    CtcpQuery,
    CtcpPong,
    UnknownCommand,
    Timer,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        use EventKind::*;
        match self {
            ConnectionStarted => "ConnectionStarted",
            ConnectionEstablished => "ConnectionEstablished",
            ConnectionClosed => "ConnectionClosed",
            ConnectionLost => "ConnectionLost",
            ConnectionFailed => "ConnectionFailed",
            BotInitialized => "BotInitialized",
            ModuleLoaded => "ModuleLoaded",
            ServerSupport => "ServerSupport",
            ServerHostInfo => "ServerHostInfo",
            ServerCreated => "ServerCreated",
            ServerInfo => "ServerInfo",
            ServerBounce => "ServerBounce",
            ServerLuserClient => "ServerLuserClient",
            ServerLuserOp => "ServerLuserOp",
            ServerLuserChannels => "ServerLuserChannels",
            ServerLuserMe => "ServerLuserMe",
            ServerMotd => "ServerMotd",
            ServerError => "ServerError",
            BotSignedOn => "BotSignedOn",
            BotPreJoin => "BotPreJoin",
            BotJoin => "BotJoin",
            BotPart => "BotPart",
            BotKicked => "BotKicked",
            BotNickChanged => "BotNickChanged",
            BotInvite => "BotInvite",
            BotNoticeReceived => "BotNoticeReceived",
            BotPreQuit => "BotPreQuit",
            PreNicknameInUse => "PreNicknameInUse",
            RegistrationFailed => "RegistrationFailed",
            UserJoin => "UserJoin",
            UserPart => "UserPart",
            UserQuit => "UserQuit",
            UserKicked => "UserKicked",
            UserNickChanged => "UserNickChanged",
            UserAction => "UserAction",
            ChannelTopicChanged => "ChannelTopicChanged",
            ModeChanged => "ModeChanged",
            Privmsg => "Privmsg",
            ChannelMessage => "ChannelMessage",
            UserMessage => "UserMessage",
            Trigger => "Trigger",
            CtcpVersion => "CtcpVersion",
            CtcpQuery => "CtcpQuery",
            CtcpPong => "CtcpPong",
            UnknownCommand => "UnknownCommand",
            Timer => "Timer",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of each event kind.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum EventData {
    ConnectionStarted { host: String, port: u16 },
    ConnectionEstablished,
    ConnectionClosed { reason: String },
    /// The established connection dropped.
    ConnectionLost { reason: String, retry_in: Option<Duration> },
    /// The connect attempt itself failed.
    ConnectionFailed { reason: String, retry_in: Option<Duration> },
    BotInitialized,
    ModuleLoaded { name: String },
    /// Tokens of one 005 line.
    ServerSupport { options: Vec<(String, Option<String>)> },
    ServerHostInfo { text: String },
    ServerCreated { text: String },
    ServerInfo {
        server: String,
        version: String,
        user_modes: String,
        channel_modes: String,
    },
    ServerBounce { text: String },
    ServerLuserClient { text: String },
    ServerLuserOp { count: u64 },
    ServerLuserChannels { count: u64 },
    ServerLuserMe { text: String },
    ServerMotd { lines: Vec<String> },
    ServerError { message: String },
    BotSignedOn { nick: String },
    /// Cancel to stop the join being sent.
    BotPreJoin { channel: String, key: Option<String> },
    BotJoin { channel: String },
    BotPart { channel: String },
    BotKicked {
        channel: String,
        kicker: UserInfo,
        reason: String,
    },
    BotNickChanged { old: String, new: String },
    /// Cancel to stop the auto-join.
    BotInvite { channel: String, inviter: UserInfo },
    BotNoticeReceived {
        user: UserInfo,
        target: Target,
        text: String,
    },
    /// Cancel to quit without a message.
    BotPreQuit { message: String },
    /// Cancel to stop the alternate nickname being tried.
    PreNicknameInUse {
        nick: String,
        next: Option<String>,
        registered: bool,
    },
    RegistrationFailed { nick: String, message: String },
    UserJoin { user: UserInfo, channel: String },
    UserPart {
        user: UserInfo,
        channel: String,
        reason: Option<String>,
    },
    UserQuit { user: UserInfo, reason: String },
    UserKicked {
        user: UserInfo,
        channel: String,
        kicker: UserInfo,
        reason: String,
    },
    UserNickChanged {
        user: UserInfo,
        old: String,
        new: String,
    },
    UserAction {
        user: UserInfo,
        target: Target,
        text: String,
    },
    ChannelTopicChanged {
        user: Option<UserInfo>,
        channel: String,
        topic: Option<Topic>,
    },
    ModeChanged {
        user: UserInfo,
        target: Target,
        changes: Vec<ModeChange>,
    },
    Privmsg {
        user: UserInfo,
        target: Target,
        text: String,
    },
    ChannelMessage {
        user: UserInfo,
        channel: String,
        text: String,
    },
    UserMessage { user: UserInfo, text: String },
    Trigger {
        user: UserInfo,
        target: Target,
        text: String,
        matched: TriggerMatch,
    },
    /// Cancel to suppress the automatic VERSION reply.
    CtcpVersion { user: UserInfo, target: Target },
    /// Any other CTCP query. Cancel to suppress PING/SOURCE replies.
    CtcpQuery {
        user: UserInfo,
        target: Target,
        command: String,
        params: Option<String>,
    },
    CtcpPong { user: UserInfo, seconds: f64 },
    UnknownCommand {
        source: Option<String>,
        command: String,
        args: Vec<String>,
    },
    Timer(Timer),
}

impl EventData {
    pub fn kind(&self) -> EventKind {
        use EventData as D;
        use EventKind as K;
        match self {
            D::ConnectionStarted { .. } => K::ConnectionStarted,
            D::ConnectionEstablished => K::ConnectionEstablished,
            D::ConnectionClosed { .. } => K::ConnectionClosed,
            D::ConnectionLost { .. } => K::ConnectionLost,
            D::ConnectionFailed { .. } => K::ConnectionFailed,
            D::BotInitialized => K::BotInitialized,
            D::ModuleLoaded { .. } => K::ModuleLoaded,
            D::ServerSupport { .. } => K::ServerSupport,
            D::ServerHostInfo { .. } => K::ServerHostInfo,
            D::ServerCreated { .. } => K::ServerCreated,
            D::ServerInfo { .. } => K::ServerInfo,
            D::ServerBounce { .. } => K::ServerBounce,
            D::ServerLuserClient { .. } => K::ServerLuserClient,
            D::ServerLuserOp { .. } => K::ServerLuserOp,
            D::ServerLuserChannels { .. } => K::ServerLuserChannels,
            D::ServerLuserMe { .. } => K::ServerLuserMe,
            D::ServerMotd { .. } => K::ServerMotd,
            D::ServerError { .. } => K::ServerError,
            D::BotSignedOn { .. } => K::BotSignedOn,
            D::BotPreJoin { .. } => K::BotPreJoin,
            D::BotJoin { .. } => K::BotJoin,
            D::BotPart { .. } => K::BotPart,
            D::BotKicked { .. } => K::BotKicked,
            D::BotNickChanged { .. } => K::BotNickChanged,
            D::BotInvite { .. } => K::BotInvite,
            D::BotNoticeReceived { .. } => K::BotNoticeReceived,
            D::BotPreQuit { .. } => K::BotPreQuit,
            D::PreNicknameInUse { .. } => K::PreNicknameInUse,
            D::RegistrationFailed { .. } => K::RegistrationFailed,
            D::UserJoin { .. } => K::UserJoin,
            D::UserPart { .. } => K::UserPart,
            D::UserQuit { .. } => K::UserQuit,
            D::UserKicked { .. } => K::UserKicked,
            D::UserNickChanged { .. } => K::UserNickChanged,
            D::UserAction { .. } => K::UserAction,
            D::ChannelTopicChanged { .. } => K::ChannelTopicChanged,
            D::ModeChanged { .. } => K::ModeChanged,
            D::Privmsg { .. } => K::Privmsg,
            D::ChannelMessage { .. } => K::ChannelMessage,
            D::UserMessage { .. } => K::UserMessage,
            D::Trigger { .. } => K::Trigger,
            D::CtcpVersion { .. } => K::CtcpVersion,
            D::CtcpQuery { .. } => K::CtcpQuery,
            D::CtcpPong { .. } => K::CtcpPong,
            D::UnknownCommand { .. } => K::UnknownCommand,
            D::Timer(_) => K::Timer,
        }
    }
}

/// One firing of one event: payload, originating tag, and the
/// cancellation flag shared by every handler of that fire.
#[derive(Clone, Debug)]
pub struct Event {
    tag: String,
    data: EventData,
    cancelled: bool,
}

impl Event {
    pub fn new(tag: impl Into<String>, data: EventData) -> Self {
        Event {
            tag: tag.into(),
            data,
            cancelled: false,
        }
    }

    /// Tag of the connection this event came from.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn into_data(self) -> EventData {
        self.data
    }

    /// Veto the default reaction. Cannot be undone within this fire.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// The trigger match, for trigger events.
    pub fn trigger(&self) -> Option<&TriggerMatch> {
        match &self.data {
            EventData::Trigger { matched, .. } => Some(matched),
            _ => None,
        }
    }

    /// Trigger arguments; empty for other events.
    pub fn args(&self) -> &[String] {
        self.trigger().map_or(&[], |m| m.args.as_slice())
    }

    /// The user an event is about or from, if any.
    pub fn user(&self) -> Option<&UserInfo> {
        use EventData as D;
        match &self.data {
            D::BotKicked { kicker: user, .. }
            | D::BotInvite { inviter: user, .. }
            | D::BotNoticeReceived { user, .. }
            | D::UserJoin { user, .. }
            | D::UserPart { user, .. }
            | D::UserQuit { user, .. }
            | D::UserKicked { user, .. }
            | D::UserNickChanged { user, .. }
            | D::UserAction { user, .. }
            | D::ModeChanged { user, .. }
            | D::Privmsg { user, .. }
            | D::ChannelMessage { user, .. }
            | D::UserMessage { user, .. }
            | D::Trigger { user, .. }
            | D::CtcpVersion { user, .. }
            | D::CtcpQuery { user, .. }
            | D::CtcpPong { user, .. } => Some(user),
            D::ChannelTopicChanged { user, .. } => user.as_ref(),
            _ => None,
        }
    }

    /// The channel an event concerns, if any.
    pub fn channel(&self) -> Option<&str> {
        use EventData as D;
        match &self.data {
            D::BotPreJoin { channel, .. }
            | D::BotJoin { channel }
            | D::BotPart { channel }
            | D::BotKicked { channel, .. }
            | D::BotInvite { channel, .. }
            | D::UserJoin { channel, .. }
            | D::UserPart { channel, .. }
            | D::UserKicked { channel, .. }
            | D::ChannelTopicChanged { channel, .. }
            | D::ChannelMessage { channel, .. } => Some(channel),
            D::BotNoticeReceived { target, .. }
            | D::UserAction { target, .. }
            | D::ModeChanged { target, .. }
            | D::Privmsg { target, .. }
            | D::Trigger { target, .. }
            | D::CtcpVersion { target, .. }
            | D::CtcpQuery { target, .. } => target.channel(),
            _ => None,
        }
    }

    /// Where a reply to this event should be sent.
    pub fn reply_target(&self) -> Option<&str> {
        use EventData as D;
        match &self.data {
            D::BotNoticeReceived { target, .. }
            | D::UserAction { target, .. }
            | D::Privmsg { target, .. }
            | D::Trigger { target, .. } => Some(target.name()),
            D::ChannelMessage { channel, .. } => Some(channel),
            D::UserMessage { user, .. } => Some(&user.nick),
            D::Timer(timer) => Some(&timer.target),
            _ => self.channel(),
        }
    }
}
