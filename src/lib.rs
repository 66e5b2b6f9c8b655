//! # bones-irc
//!
//! The core of an extensible IRC bot: a protocol state machine that keeps
//! track of channels, users, topics and modes, and a cancellable event bus
//! that carries everything it sees to bot modules.
//!
//! ## Features
//!
//! - Line parsing with hostmask prefixes, and outbound message builders
//! - ISUPPORT-driven mode parsing with exact undo of every applied change
//! - Channel and user tracking with stable user identity across renames
//! - Per-connection event bus with vetoable pre-events and triggers
//! - Reconnection with linear backoff
//! - Optional Tokio session driver, with TLS behind the `tls` feature
//!
#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Writing a module
//!
//! ```rust
//! use bones_irc::event::{Context, Event, EventBus, Handler, Module};
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! impl Greeter {
//!     fn hello(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
//!         if let (Some(target), Some(user)) = (event.reply_target(), event.user()) {
//!             let text = format!("hello, {}", user.nick);
//!             ctx.privmsg(target, &text);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! impl Module for Greeter {
//!     fn handlers(&self) -> Vec<Handler<Self>> {
//!         vec![Handler::trigger("hello", Self::hello)]
//!     }
//! }
//!
//! let bus = EventBus::new();
//! bus.register("irc.example.net", Greeter).unwrap();
//! ```
//!
//! ### Driving a client by hand
//!
//! ```rust
//! use bones_irc::{Action, Client, Config, EventBus};
//!
//! let config = Config::new("irc.example.net", &["bones"]);
//! let mut client = Client::new(config, EventBus::new()).unwrap();
//! client.connection_started();
//! client.connection_made();
//!
//! let actions = client.handle_line("PING :irc.example.net");
//! assert_eq!(actions, vec![Action::Send(bones_irc::Message::pong("irc.example.net"))]);
//! ```

pub mod casemap;
pub mod client;
pub mod config;
pub mod ctcp;
pub mod error;
pub mod event;
pub mod isupport;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod response;
pub mod state;
pub mod supervisor;
pub mod util;

#[cfg(feature = "tokio")]
pub mod session;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::casemap::{irc_eq, irc_to_lower, CaseMapping};
pub use self::client::{Client, Closed, ConnectionState};
pub use self::config::Config;
pub use self::ctcp::{Ctcp, CtcpKind};
pub use self::error::{
    ConfigError, ConnectionError, HandlerError, MessageParseError, ModuleError, ProtocolError,
};
pub use self::event::{
    Action, Context, Event, EventBus, EventData, EventKind, Handler, Module, ModuleRegistry,
    Target, Timer, TriggerMatch, UserInfo,
};
pub use self::isupport::{Isupport, IsupportEntry, ServerSupport};
pub use self::message::{Message, MessageRef};
pub use self::mode::{ChannelModes, ModeChange, ModeClass};
pub use self::prefix::PrefixRef;
pub use self::response::Response;
pub use self::state::{Channel, State, Topic, User, UserId};
pub use self::supervisor::Supervisor;

#[cfg(feature = "tokio")]
pub use self::session::{Session, SessionHandle};
#[cfg(feature = "tokio")]
pub use self::transport::{Connector, IrcCodec, TcpConnector, Transport};
#[cfg(feature = "tls")]
pub use self::transport::TlsConnector;
