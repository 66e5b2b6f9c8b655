//! Benchmarks for line parsing and client dispatch.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use bones_irc::{
    Client, Config, Context, Event, EventBus, EventKind, Handler, MessageRef, Module,
};

/// Simple PING message
const SIMPLE_MESSAGE: &str = "PING :irc.example.com";

/// Channel message with a full hostmask
const CHANNEL_MESSAGE: &str = ":alice!alice@host.example.com PRIVMSG #bones :Hello, world!";

/// Trigger in a channel
const TRIGGER_MESSAGE: &str = ":alice!alice@host.example.com PRIVMSG #bones :+dance slowly now";

/// Mode change touching several partitions
const MODE_MESSAGE: &str = ":alice!alice@host.example.com MODE #bones +ovb-k bob carol *!*@spam secret";

/// Numeric response
const NAMES_REPLY: &str = ":irc.example.net 353 bones = #bones :bones @alice +bob carol dave erin";

#[derive(Default)]
struct Dance;

impl Dance {
    fn dance(&mut self, event: &mut Event, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        if let Some(target) = event.reply_target() {
            let target = target.to_owned();
            ctx.action(&target, "dances");
        }
        Ok(())
    }

    fn count(&mut self, _: &mut Event, _: &mut Context<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Module for Dance {
    fn handlers(&self) -> Vec<Handler<Self>> {
        vec![
            Handler::trigger("dance", Self::dance),
            Handler::on(EventKind::ChannelMessage, Self::count),
            Handler::on(EventKind::ModeChanged, Self::count),
        ]
    }
}

fn joined_client() -> Client {
    let bus = EventBus::new();
    bus.register("irc.example.net", Dance).unwrap();
    let mut client = Client::new(Config::new("irc.example.net", &["bones"]), bus).unwrap();
    client.connection_started();
    client.connection_made();
    client.handle_line(":irc.example.net 001 bones :Welcome");
    client.handle_line(":bones!b@bot.host JOIN #bones");
    client.handle_line(NAMES_REPLY);
    client
}

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Line Parsing");

    for (name, line) in [
        ("simple_ping", SIMPLE_MESSAGE),
        ("channel_message", CHANNEL_MESSAGE),
        ("mode", MODE_MESSAGE),
        ("names", NAMES_REPLY),
    ] {
        group.bench_with_input(BenchmarkId::new("parse", name), line, |b, s| {
            b.iter(|| {
                let msg = MessageRef::parse(black_box(s)).unwrap();
                black_box(msg.args.len())
            })
        });
    }

    group.finish();
}

fn benchmark_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Client Dispatch");

    for (name, line) in [
        ("ping", SIMPLE_MESSAGE),
        ("channel_message", CHANNEL_MESSAGE),
        ("trigger", TRIGGER_MESSAGE),
        ("mode", MODE_MESSAGE),
        ("names", NAMES_REPLY),
    ] {
        let mut client = joined_client();
        group.bench_with_input(BenchmarkId::new("handle_line", name), line, |b, s| {
            b.iter(|| {
                let actions = client.handle_line(black_box(s));
                black_box(actions)
            })
        });
    }

    group.finish();
}

fn benchmark_membership_churn(c: &mut Criterion) {
    let mut client = joined_client();
    c.bench_function("join_part_churn", |b| {
        b.iter(|| {
            client.handle_line(":frank!f@host JOIN #bones");
            client.handle_line(":frank!f@host NICK francis");
            black_box(client.handle_line(":francis!f@host PART #bones :bye"))
        })
    });
}

criterion_group!(
    benches,
    benchmark_parsing,
    benchmark_dispatch,
    benchmark_membership_churn,
);

criterion_main!(benches);
