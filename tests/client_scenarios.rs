//! End-to-end scenarios driving a `Client` with scripted server lines.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use bones_irc::{
    Action, Client, Config, Context, Event, EventBus, EventKind, Handler, Module, ModuleRegistry,
    Timer,
};

const TAG: &str = "irc.example.net";

fn lines(actions: &[Action]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Send(m) => Some(m.to_line()),
            _ => None,
        })
        .collect()
}

fn timers(actions: &[Action]) -> Vec<(Duration, Timer)> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Schedule { delay, timer } => Some((*delay, timer.clone())),
            _ => None,
        })
        .collect()
}

fn signed_on(config: Config, bus: EventBus, registry: &ModuleRegistry) -> Client {
    let mut client = Client::new(config, bus).unwrap();
    client.initialize(registry);
    client.connection_started();
    client.connection_made();
    client.handle_line(":irc.example.net 001 bones :Welcome to the network");
    client.handle_line(":bones!bones@bot.host JOIN #bones");
    client.handle_line(":irc.example.net 353 bones = #bones :bones @alice");
    client
}

/// Counts down over several timer steps.
#[derive(Default)]
struct Countdown;

impl Countdown {
    fn start(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let target = event.reply_target().unwrap_or_default().to_owned();
        ctx.privmsg(&target, "3");
        ctx.schedule(Duration::from_secs(1), Timer::new("countdown", 1, target));
        Ok(())
    }

    fn tick(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let bones_irc::EventData::Timer(timer) = event.data() else {
            return Ok(());
        };
        if timer.key != "countdown" {
            return Ok(());
        }
        let remaining = 3 - timer.step;
        if remaining == 0 {
            ctx.privmsg(&timer.target, "liftoff");
        } else {
            ctx.privmsg(&timer.target, &remaining.to_string());
            ctx.schedule(Duration::from_secs(1), timer.next());
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

#[test]
fn test_multi_step_timer_response() {
    let mut config = Config::new(TAG, &["bones"]);
    config.bot.modules = vec!["countdown".into(), "missing".into()];
    let mut registry = ModuleRegistry::new();
    registry.add_default::<Countdown>("countdown");

    let bus = EventBus::new();
    let mut client = signed_on(config, bus.clone(), &registry);
    assert_eq!(bus.module_count(TAG), 1);

    let actions = client.handle_line(":alice!a@host PRIVMSG #bones :+Countdown");
    assert_eq!(lines(&actions), vec!["PRIVMSG #bones 3"]);

    let mut said = Vec::new();
    let mut pending = timers(&actions);
    while let Some((delay, timer)) = pending.pop() {
        assert_eq!(delay, Duration::from_secs(1));
        let actions = client.timer_elapsed(timer);
        said.extend(lines(&actions));
        pending.extend(timers(&actions));
    }
    assert_eq!(said, vec!["PRIVMSG #bones 2", "PRIVMSG #bones 1", "PRIVMSG #bones liftoff"]);
}

#[derive(Default)]
struct Faulty;

impl Faulty {
    fn fail(&mut self, _: &mut Event, _: &mut Context<'_>) -> anyhow::Result<()> {
        anyhow::bail!("backend offline")
    }

    fn explode(&mut self, _: &mut Event, _: &mut Context<'_>) -> anyhow::Result<()> {
        panic!("boom")
    }
}

impl Module for Faulty {
    fn handlers(&self) -> Vec<Handler<Self>> {
        vec![
            Handler::on(EventKind::ChannelMessage, Self::fail),
            Handler::on(EventKind::ChannelMessage, Self::explode),
        ]
    }
}

#[derive(Clone, Default)]
struct Echo {
    heard: Arc<Mutex<Vec<String>>>,
}

impl Echo {
    fn hear(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        if let bones_irc::EventData::ChannelMessage { channel, text, .. } = event.data() {
            self.heard.lock().push(text.clone());
            ctx.privmsg(channel, text);
        }
        Ok(())
    }
}

impl Module for Echo {
    fn handlers(&self) -> Vec<Handler<Self>> {
        vec![Handler::on(EventKind::ChannelMessage, Self::hear)]
    }
}

#[test]
fn test_failing_handlers_do_not_stop_dispatch() {
    let bus = EventBus::new();
    let echo = Echo::default();
    bus.register(TAG, Faulty).unwrap();
    bus.register(TAG, echo.clone()).unwrap();

    let mut client = signed_on(Config::new(TAG, &["bones"]), bus, &ModuleRegistry::new());
    let actions = client.handle_line(":alice!a@host PRIVMSG #bones :still here");
    assert_eq!(lines(&actions), vec!["PRIVMSG #bones :still here"]);
    assert_eq!(*echo.heard.lock(), vec!["still here"]);

    // The panicking module keeps its registration.
    let actions = client.handle_line(":alice!a@host PRIVMSG #bones :again");
    assert_eq!(lines(&actions), vec!["PRIVMSG #bones again"]);
}

#[test]
fn test_modules_are_scoped_to_their_tag() {
    let bus = EventBus::new();
    let echo = Echo::default();
    bus.register("other.example.org", echo.clone()).unwrap();

    let mut client = signed_on(Config::new(TAG, &["bones"]), bus, &ModuleRegistry::new());
    let actions = client.handle_line(":alice!a@host PRIVMSG #bones :hello");
    assert!(actions.is_empty());
    assert!(echo.heard.lock().is_empty());
}

#[test]
fn test_isupport_changes_casemapping_and_prefixes() {
    let mut client = Client::new(Config::new(TAG, &["bones"]), EventBus::new()).unwrap();
    client.connection_started();
    client.connection_made();
    client.handle_line(":irc.example.net 001 bones :Welcome");
    client.handle_line(
        ":irc.example.net 005 bones CASEMAPPING=ascii PREFIX=(qov)~@+ CHANTYPES=#& :are supported by this server",
    );
    client.handle_line(":bones!b@h JOIN &local");
    client.handle_line(":irc.example.net 353 bones = &local :bones ~Owner +voiced");

    let state = client.state();
    let channel = state.channel("&LOCAL").unwrap();
    assert_eq!(channel.members().len(), 3);
    assert!(channel
        .modes
        .has_member_mode('q', "owner", state.casemapping()));
    // Under ascii casemapping brackets are distinct.
    assert!(!state.casemapping().eq("[bones]", "{bones}"));
}

#[test]
fn test_reconnect_delays_grow_until_registered() {
    let mut config = Config::new(TAG, &["bones"]);
    config.reconnect.lost_delay = 5;
    config.reconnect.failed_delay = 20;
    let mut client = Client::new(config, EventBus::new()).unwrap();

    let mut delays = Vec::new();
    for _ in 0..3 {
        client.connection_started();
        delays.push(client.connection_closed("connection refused").retry_in);
    }
    assert_eq!(
        delays,
        vec![
            Some(Duration::ZERO),
            Some(Duration::from_secs(20)),
            Some(Duration::from_secs(40)),
        ]
    );

    client.connection_started();
    client.connection_made();
    client.handle_line(":irc.example.net 001 bones :Welcome");
    let closed = client.connection_closed("ping timeout");
    assert_eq!(closed.retry_in, Some(Duration::ZERO));
    client.connection_started();
    client.connection_made();
    let closed = client.connection_closed("ping timeout");
    assert_eq!(closed.retry_in, Some(Duration::from_secs(5)));
}

#[test]
fn test_trigger_in_private_message_replies_to_sender() {
    #[derive(Default)]
    struct Pong;

    impl Pong {
        fn pong(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
            if let Some(target) = event.reply_target() {
                let target = target.to_owned();
                ctx.notice(&target, "pong");
            }
            Ok(())
        }
    }

    impl Module for Pong {
        fn handlers(&self) -> Vec<Handler<Self>> {
            vec![Handler::trigger("ping", Self::pong)]
        }
    }

    let bus = EventBus::new();
    bus.register(TAG, Pong).unwrap();
    let mut client = signed_on(Config::new(TAG, &["bones"]), bus, &ModuleRegistry::new());
    let actions = client.handle_line(":carol!c@elsewhere PRIVMSG bones :+ping");
    assert_eq!(lines(&actions), vec!["NOTICE carol pong"]);
}
