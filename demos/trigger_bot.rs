//! A small bot showing triggers, timers and vetoes.
//!
//! ```text
//! cargo run --example trigger_bot -- demos/bones.toml
//! cargo run --example trigger_bot --features tls -- demos/bones.toml
//! ```

use std::time::Duration;

use anyhow::Context as _;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bones_irc::{
    Config, Context, Event, EventBus, EventData, EventKind, Handler, Module, ModuleRegistry,
    Session, Timer,
};

#[derive(Default)]
struct Dance;

impl Dance {
    const MOVES: [&'static str; 3] = ["dances to the left", "dances to the right", "takes a bow"];

    fn start(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let Some(target) = event.reply_target() else {
            return Ok(());
        };
        let target = target.to_owned();
        ctx.action(&target, Self::MOVES[0]);
        ctx.schedule(Duration::from_millis(1500), Timer::new("dance", 1, target));
        Ok(())
    }

    fn step(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let EventData::Timer(timer) = event.data() else {
            return Ok(());
        };
        if timer.key != "dance" {
            return Ok(());
        }
        if let Some(step) = Self::MOVES.get(timer.step as usize) {
            ctx.action(&timer.target, step);
            ctx.schedule(Duration::from_millis(1500), timer.next());
        }
        Ok(())
    }
}

impl Module for Dance {
    fn handlers(&self) -> Vec<Handler<Self>> {
        vec![
            Handler::trigger("dance", Self::start),
            Handler::on(EventKind::Timer, Self::step),
        ]
    }
}

/// `+countdown 5` counts down once a second.
#[derive(Default)]
struct Countdown;

impl Countdown {
    fn start(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let from: u32 = match event.args().first() {
            Some(n) => n.parse().context("countdown needs a number")?,
            None => 3,
        };
        let Some(target) = event.reply_target() else {
            return Ok(());
        };
        let target = target.to_owned();
        ctx.privmsg(&target, &from.to_string());
        if from > 0 {
            ctx.schedule(Duration::from_secs(1), Timer::new("countdown", from - 1, target));
        }
        Ok(())
    }

    fn tick(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let EventData::Timer(timer) = event.data() else {
            return Ok(());
        };
        if timer.key != "countdown" {
            return Ok(());
        }
        if timer.step == 0 {
            ctx.privmsg(&timer.target, "liftoff!");
        } else {
            ctx.privmsg(&timer.target, &timer.step.to_string());
            let next = Timer::new("countdown", timer.step - 1, timer.target.clone());
            ctx.schedule(Duration::from_secs(1), next);
        }
        Ok(())
    }
}

impl Module for Countdown {
    fn handlers(&self) -> Vec<Handler<Self>> {
        vec![
            Handler::trigger("countdown", Self::start),
            Handler::on(EventKind::Timer, Self::tick),
        ]
    }
}

/// Greets joining users and refuses invites to `#private` channels.
struct Greeter {
    greeting: String,
}

impl Greeter {
    fn greet(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        if let EventData::UserJoin { user, channel } = event.data() {
            let text = format!("{}, {}", self.greeting, user.nick);
            ctx.notice(channel, &text);
        }
        Ok(())
    }

    fn screen_invite(&mut self, event: &mut Event, _: &mut Context<'_>) -> anyhow::Result<()> {
        if event.channel().map_or(false, |c| c.starts_with("#private")) {
            info!(channel = ?event.channel(), "refusing invite");
            event.cancel();
        }
        Ok(())
    }
}

impl Module for Greeter {
    fn handlers(&self) -> Vec<Handler<Self>> {
        vec![
            Handler::on(EventKind::UserJoin, Self::greet),
            Handler::on(EventKind::BotInvite, Self::screen_invite),
        ]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/bones.toml".to_string());
    let config = Config::load(&path).with_context(|| format!("loading {}", path))?;

    let mut registry = ModuleRegistry::new();
    registry
        .add_default::<Dance>("dance")
        .add_default::<Countdown>("countdown")
        .add("greeter", |config: &Config, _tag: &str| {
            Ok(Greeter {
                greeting: format!("Welcome, this is {}", config.nickname().unwrap_or("bones")),
            })
        });

    #[cfg(feature = "tls")]
    let connector = bones_irc::TlsConnector::new();
    #[cfg(not(feature = "tls"))]
    let connector = bones_irc::TcpConnector;

    let (session, handle) = Session::new(config, EventBus::new(), registry, connector)?;
    let task = tokio::spawn(session.run());

    tokio::signal::ctrl_c().await?;
    info!(tag = handle.tag(), "interrupted, shutting down");
    handle.shutdown().await;
    task.await?;
    Ok(())
}
