use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::event::{Action, EventData, Outbox, Request};
use crate::isupport::Isupport;
use crate::message::{Message, MessageRef};
use crate::mode::parse_user_modes;
use crate::prefix::PrefixRef;
use crate::response::Response;
use crate::state::Topic;

use super::{Client, ConnectionState};

impl Client {
    pub(super) fn on_numeric(&mut self, response: Response, msg: &MessageRef<'_>, out: &mut Outbox) {
        let text = || msg.trailing().unwrap_or_default().to_owned();
        match response {
            Response::RPL_WELCOME => self.on_welcome(msg, out),
            Response::RPL_YOURHOST => {
                self.fire(EventData::ServerHostInfo { text: text() }, out);
            }
            Response::RPL_CREATED => {
                self.fire(EventData::ServerCreated { text: text() }, out);
            }
            Response::RPL_MYINFO => {
                let arg = |i| msg.arg(i).unwrap_or_default().to_owned();
                let data = EventData::ServerInfo {
                    server: arg(1),
                    version: arg(2),
                    user_modes: arg(3),
                    channel_modes: arg(4),
                };
                self.fire(data, out);
            }
            Response::RPL_ISUPPORT => self.on_isupport(msg, out),
            Response::RPL_BOUNCE => {
                let text = msg.args.get(1..).unwrap_or_default().join(" ");
                self.fire(EventData::ServerBounce { text }, out);
            }
            Response::RPL_UMODEIS => {
                self.user_modes.clear();
                self.apply_user_modes(msg.arg(1).unwrap_or_default());
            }
            Response::RPL_LUSERCLIENT => {
                self.fire(EventData::ServerLuserClient { text: text() }, out);
            }
            Response::RPL_LUSEROP => {
                let count = count_arg(msg);
                self.fire(EventData::ServerLuserOp { count }, out);
            }
            Response::RPL_LUSERCHANNELS => {
                let count = count_arg(msg);
                self.fire(EventData::ServerLuserChannels { count }, out);
            }
            Response::RPL_LUSERME => {
                self.fire(EventData::ServerLuserMe { text: text() }, out);
            }
            Response::RPL_CHANNELMODEIS => {
                if let (Some(channel), Some(modes)) = (msg.arg(1), msg.arg(2)) {
                    let args = msg.args.get(3..).unwrap_or_default();
                    let applied = self.state.reset_modes(channel, modes, args);
                    debug!(channel, modes = applied.len(), "channel modes");
                }
            }
            Response::RPL_NOTOPIC => {
                if let Some(channel) = msg.arg(1) {
                    self.state.set_topic(channel, None);
                }
            }
            Response::RPL_TOPIC => {
                if let Some(channel) = msg.arg(1) {
                    let topic = Topic::new(text(), None);
                    self.state.set_topic(channel, Some(topic.clone()));
                    let data = EventData::ChannelTopicChanged {
                        user: None,
                        channel: channel.to_owned(),
                        topic: Some(topic),
                    };
                    self.fire(data, out);
                }
            }
            Response::RPL_TOPICWHOTIME => self.on_topic_who_time(msg),
            Response::RPL_NAMREPLY => {
                if let (Some(channel), Some(names)) = (msg.arg(2), msg.arg(3)) {
                    self.state.apply_names(channel, names);
                }
            }
            Response::RPL_ENDOFNAMES => {}
            Response::RPL_MOTDSTART => self.motd.clear(),
            Response::RPL_MOTD => {
                let line = msg.trailing().unwrap_or_default();
                let line = line.strip_prefix("- ").unwrap_or(line);
                self.motd.push(line.to_owned());
            }
            Response::RPL_ENDOFMOTD | Response::ERR_NOMOTD => {
                let lines = std::mem::take(&mut self.motd);
                self.fire(EventData::ServerMotd { lines }, out);
            }
            Response::ERR_ERRONEUSNICKNAME
            | Response::ERR_NICKNAMEINUSE
            | Response::ERR_NICKCOLLISION => self.on_nick_rejected(msg, out),
            _ => self.on_unknown(msg, out),
        }
    }

    fn on_welcome(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        if let Some(nick) = msg.arg(0) {
            self.nickname = nick.to_owned();
        }
        self.state.set_me(&self.nickname);
        self.conn = ConnectionState::Registered;
        self.supervisor.registered();

        if self.config.server.set_bot {
            out.send(Message::mode(&self.nickname, ["+B"]));
        }
        info!(tag = %self.tag, nick = %self.nickname, "signed on");
        let data = EventData::BotSignedOn {
            nick: self.nickname.clone(),
        };
        self.fire(data, out);

        for channel in &self.config.server.channels {
            out.request(Request::Join {
                channel: channel.clone(),
                key: None,
            });
        }
    }

    fn on_isupport(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let Some(isupport) = Isupport::from_response_args(&msg.args) else {
            return;
        };
        self.state.apply_isupport(&isupport);
        let options = isupport
            .iter()
            .map(|e| (e.key.to_owned(), e.value.map(str::to_owned)))
            .collect();
        self.fire(EventData::ServerSupport { options }, out);
    }

    fn on_topic_who_time(&mut self, msg: &MessageRef<'_>) {
        let (Some(channel), Some(setter)) = (msg.arg(1), msg.arg(2)) else {
            return;
        };
        let setter = PrefixRef::parse(setter).name();
        let set_at = msg
            .arg(3)
            .and_then(|t| t.parse::<i64>().ok())
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0));
        if let Some(channel) = self.state.channel_mut(channel) {
            channel.topic = channel
                .topic
                .as_ref()
                .map(|topic| topic.with_setter(setter, set_at));
        }
    }

    /// 432, 433 or 436. During registration the next alternate is tried
    /// unless a handler vetoes it; with none left registration has failed.
    fn on_nick_rejected(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let nick = msg.arg(1).unwrap_or(self.nickname.as_str()).to_owned();
        let message = msg.trailing().unwrap_or_default().to_owned();
        let registered = self.conn == ConnectionState::Registered;
        let next = if registered {
            None
        } else {
            self.alternates.front().cloned()
        };

        let data = EventData::PreNicknameInUse {
            nick: nick.clone(),
            next: next.clone(),
            registered,
        };
        let event = self.fire(data, out);
        if registered || event.is_cancelled() {
            return;
        }

        match next {
            Some(next) => {
                info!(tag = %self.tag, rejected = %nick, trying = %next, "nickname unavailable");
                self.alternates.pop_front();
                out.send(Message::nick(&next));
                self.nickname = next;
            }
            None => {
                warn!(tag = %self.tag, %nick, %message, "no nicknames left");
                let data = EventData::RegistrationFailed {
                    nick,
                    message: message.clone(),
                };
                self.fire(data, out);
                out.push(Action::Disconnect { reason: message });
            }
        }
    }

    pub(super) fn apply_user_modes(&mut self, modes: &str) {
        for (adding, mode) in parse_user_modes(modes) {
            if adding {
                self.user_modes.insert(mode);
            } else {
                self.user_modes.remove(&mode);
            }
        }
    }
}

fn count_arg(msg: &MessageRef<'_>) -> u64 {
    msg.arg(1).and_then(|c| c.parse().ok()).unwrap_or_default()
}
