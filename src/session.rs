//! Tokio driver for a [`Client`].
//!
//! A [`Session`] owns one server connection. It opens streams through a
//! [`Connector`], feeds inbound lines to the client, performs the actions
//! the client returns, delivers module timers from a `DelayQueue`, and
//! sleeps out the supervisor's backoff between attempts. Other tasks talk
//! to it through a cloneable [`SessionHandle`].

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_util::time::DelayQueue;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::Config;
use crate::error::ConfigError;
use crate::event::{Action, EventBus, ModuleRegistry, Timer};
use crate::message::Message;
use crate::transport::{Connector, Transport};

/// Requests from outside the session task.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Send(Message),
    Join { channel: String, key: Option<String> },
    Quit(Option<String>),
    Shutdown,
}

#[derive(Clone, Debug)]
pub struct SessionHandle {
    tag: String,
    tx: mpsc::UnboundedSender<Command>,
    finished: watch::Receiver<bool>,
}

impl SessionHandle {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Write a line, if connected.
    pub fn send(&self, message: Message) {
        self.command(Command::Send(message));
    }

    pub fn join(&self, channel: &str, key: Option<&str>) {
        self.command(Command::Join {
            channel: channel.to_owned(),
            key: key.map(str::to_owned),
        });
    }

    /// Quit the current connection. The supervisor still reconnects.
    pub fn quit(&self, message: Option<&str>) {
        self.command(Command::Quit(message.map(str::to_owned)));
    }

    /// Quit and stop reconnecting. The request is sent immediately; the
    /// returned future resolves once [`Session::run`] has returned, which
    /// is right away when nothing is connected.
    pub fn shutdown(&self) -> impl Future<Output = ()> + Send + 'static {
        self.command(Command::Shutdown);
        self.finished()
    }

    /// Resolves once the session has finished, or was dropped unrun.
    pub fn finished(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut finished = self.finished.clone();
        async move {
            loop {
                if *finished.borrow_and_update() {
                    return;
                }
                if finished.changed().await.is_err() {
                    return;
                }
            }
        }
    }

    fn command(&self, command: Command) {
        if self.tx.send(command).is_err() {
            debug!(tag = %self.tag, "session already finished");
        }
    }
}

/// How a connection ended, from the session's point of view.
enum Ended {
    Closed(String),
    Shutdown,
}

pub struct Session {
    client: Client,
    connector: Box<dyn Connector>,
    registry: ModuleRegistry,
    timers: DelayQueue<Timer>,
    commands: mpsc::UnboundedReceiver<Command>,
    handles_open: bool,
    shutting_down: bool,
    finished: watch::Sender<bool>,
}

impl Session {
    pub fn new<C>(
        config: Config,
        bus: EventBus,
        registry: ModuleRegistry,
        connector: C,
    ) -> Result<(Self, SessionHandle), ConfigError>
    where
        C: Connector + 'static,
    {
        let client = Client::new(config, bus)?;
        let (tx, commands) = mpsc::unbounded_channel();
        let (finished, finished_rx) = watch::channel(false);
        let handle = SessionHandle {
            tag: client.tag().to_owned(),
            tx,
            finished: finished_rx,
        };
        let session = Session {
            client,
            connector: Box::new(connector),
            registry,
            timers: DelayQueue::new(),
            commands,
            handles_open: true,
            shutting_down: false,
            finished,
        };
        Ok((session, handle))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Load modules, then connect and reconnect until shut down or the
    /// supervisor gives up.
    pub async fn run(mut self) {
        let actions = self.client.initialize(&self.registry);
        self.offline(actions);

        loop {
            let actions = self.client.connection_started();
            self.offline(actions);

            let ended = match self.connector.connect(self.client.config()).await {
                Ok(mut transport) => {
                    info!(tag = %self.client.tag(), tls = transport.is_tls(), "connected");
                    let actions = self.client.connection_made();
                    self.drive(&mut transport, actions).await
                }
                Err(e) => {
                    warn!(tag = %self.client.tag(), error = %e, "connect failed");
                    Ended::Closed(e.to_string())
                }
            };

            let reason = match ended {
                Ended::Closed(reason) => reason,
                Ended::Shutdown => "shutdown".to_string(),
            };
            let closed = self.client.connection_closed(&reason);
            self.offline(closed.actions);

            let Some(delay) = closed.retry_in else {
                break;
            };
            if self.shutting_down || !self.backoff(delay).await {
                break;
            }
        }
        info!(tag = %self.client.tag(), "session finished");
        self.finished.send_replace(true);
    }

    /// Pump one open connection until it closes.
    async fn drive(&mut self, transport: &mut Transport, actions: Vec<Action>) -> Ended {
        if let Some(ended) = self.perform(transport, actions).await {
            return ended;
        }
        loop {
            let actions = tokio::select! {
                line = transport.read_line() => match line {
                    Ok(Some(line)) => self.client.handle_line(&line),
                    Ok(None) => return Ended::Closed("connection closed by server".to_string()),
                    Err(e) => return Ended::Closed(e.to_string()),
                },
                Some(expired) = self.timers.next(), if !self.timers.is_empty() => {
                    self.client.timer_elapsed(expired.into_inner())
                }
                command = self.commands.recv(), if self.handles_open => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        self.handles_open = false;
                        Vec::new()
                    }
                },
            };
            if let Some(ended) = self.perform(transport, actions).await {
                return ended;
            }
        }
    }

    fn on_command(&mut self, command: Command) -> Vec<Action> {
        match command {
            Command::Send(message) => vec![Action::Send(message)],
            Command::Join { channel, key } => self.client.join(&channel, key.as_deref()),
            Command::Quit(message) => self.client.quit(message.as_deref()),
            Command::Shutdown => {
                info!(tag = %self.client.tag(), "shutting down");
                self.shutting_down = true;
                self.client.shutdown()
            }
        }
    }

    async fn perform(&mut self, transport: &mut Transport, actions: Vec<Action>) -> Option<Ended> {
        for action in actions {
            match action {
                Action::Send(message) => {
                    if let Err(e) = transport.write_message(message).await {
                        return Some(Ended::Closed(e.to_string()));
                    }
                }
                Action::Schedule { delay, timer } => self.schedule(delay, timer),
                Action::Disconnect { reason } => {
                    if self.shutting_down {
                        return Some(Ended::Shutdown);
                    }
                    return Some(Ended::Closed(reason));
                }
            }
        }
        None
    }

    /// Handle actions produced while no stream is open. Only timers survive.
    fn offline(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Schedule { delay, timer } => self.schedule(delay, timer),
                Action::Send(message) => {
                    debug!(tag = %self.client.tag(), line = %message, "not connected, dropping")
                }
                Action::Disconnect { .. } => {}
            }
        }
    }

    fn schedule(&mut self, delay: Duration, timer: Timer) {
        debug!(tag = %self.client.tag(), key = %timer.key, step = timer.step, ?delay, "timer scheduled");
        self.timers.insert(timer, delay);
    }

    /// Sleep before the next attempt, still delivering timers. Returns
    /// false if shut down meanwhile.
    async fn backoff(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                Some(expired) = self.timers.next(), if !self.timers.is_empty() => {
                    let actions = self.client.timer_elapsed(expired.into_inner());
                    self.offline(actions);
                }
                command = self.commands.recv(), if self.handles_open => match command {
                    Some(Command::Shutdown) => {
                        self.client.shutdown();
                        return false;
                    }
                    Some(other) => {
                        debug!(tag = %self.client.tag(), command = ?other, "not connected, ignoring");
                    }
                    None => self.handles_open = false,
                },
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client", &self.client)
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}
