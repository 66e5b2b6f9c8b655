use chrono::Utc;
use tracing::debug;

use crate::ctcp::{self, Ctcp, CtcpKind};
use crate::event::{EventData, Outbox, Target, TriggerMatch, UserInfo};
use crate::message::{Message, MessageRef};

use super::Client;

impl Client {
    /// PRIVMSG fans out to `Privmsg`, then `ChannelMessage` or
    /// `UserMessage`, then `Trigger` when the text is a trigger.
    /// CTCP-framed bodies are handled as CTCP queries only.
    pub(super) fn on_privmsg(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let (Some(target), Some(text)) = (msg.arg(0), msg.arg(1)) else {
            return;
        };
        let user = self.source_info(msg.prefix.as_ref());
        let reply_to = self.reply_target(target, &user);

        if ctcp::is_ctcp(text) {
            for query in ctcp::extract(text) {
                self.on_ctcp_query(&user, &reply_to, query, out);
            }
            return;
        }

        let data = EventData::Privmsg {
            user: user.clone(),
            target: reply_to.clone(),
            text: text.to_owned(),
        };
        self.fire(data, out);

        let data = match &reply_to {
            Target::Channel(channel) => EventData::ChannelMessage {
                user: user.clone(),
                channel: channel.clone(),
                text: text.to_owned(),
            },
            Target::User(_) => EventData::UserMessage {
                user: user.clone(),
                text: text.to_owned(),
            },
        };
        self.fire(data, out);

        if let Some(matched) = TriggerMatch::parse(text, &self.config.bot.trigger_prefixes) {
            debug!(tag = %self.tag, trigger = %matched.keyword, user = %user, "trigger");
            let data = EventData::Trigger {
                user,
                target: reply_to,
                text: text.to_owned(),
                matched,
            };
            self.fire(data, out);
        }
    }

    pub(super) fn on_notice(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let (Some(target), Some(text)) = (msg.arg(0), msg.arg(1)) else {
            return;
        };
        let user = self.source_info(msg.prefix.as_ref());

        if ctcp::is_ctcp(text) {
            for reply in ctcp::extract(text) {
                self.on_ctcp_reply(&user, reply, out);
            }
            return;
        }

        let data = EventData::BotNoticeReceived {
            target: self.reply_target(target, &user),
            user,
            text: text.to_owned(),
        };
        self.fire(data, out);
    }

    fn reply_target(&self, target: &str, user: &UserInfo) -> Target {
        if self.state.is_channel(target) {
            Target::Channel(target.to_owned())
        } else {
            Target::User(user.clone())
        }
    }

    fn on_ctcp_query(&mut self, user: &UserInfo, target: &Target, query: Ctcp<'_>, out: &mut Outbox) {
        debug!(tag = %self.tag, user = %user, command = %query.kind, "CTCP query");
        match query.kind {
            CtcpKind::Action => {
                let data = EventData::UserAction {
                    user: user.clone(),
                    target: target.clone(),
                    text: query.params.unwrap_or_default().to_owned(),
                };
                self.fire(data, out);
            }
            CtcpKind::Version => {
                if query.params.is_some() || self.config.bot.version_name.is_empty() {
                    return;
                }
                let version = self.config.version_reply();
                let data = EventData::CtcpVersion {
                    user: user.clone(),
                    target: target.clone(),
                };
                let nick = user.nick.as_str();
                self.fire_with(data, out, |event, ctx| {
                    if event.is_cancelled() {
                        debug!(nick, "VERSION reply vetoed");
                    } else {
                        ctx.ctcp_reply(nick, "VERSION", Some(version.as_str()));
                    }
                });
            }
            kind => {
                let reply = match kind {
                    CtcpKind::Ping => Some(query.params.unwrap_or_default().to_owned()),
                    CtcpKind::Source => Some(self.config.bot.source_url.clone()),
                    CtcpKind::Time => Some(Utc::now().to_rfc2822()),
                    _ => None,
                };
                let data = EventData::CtcpQuery {
                    user: user.clone(),
                    target: target.clone(),
                    command: kind.as_str().to_owned(),
                    params: query.params.map(str::to_owned),
                };
                let nick = user.nick.as_str();
                self.fire_with(data, out, |event, ctx| {
                    if let (Some(reply), false) = (reply, event.is_cancelled()) {
                        let reply = Some(reply.as_str()).filter(|r| !r.is_empty());
                        ctx.send(Message::ctcp_reply(nick, kind.as_str(), reply));
                    }
                });
            }
        }
    }

    /// CTCP replies arrive in NOTICEs. A PING reply echoes the timestamp
    /// we sent, which gives the round trip.
    fn on_ctcp_reply(&mut self, user: &UserInfo, reply: Ctcp<'_>, out: &mut Outbox) {
        match reply.kind {
            CtcpKind::Ping => {
                let Some(sent) = reply.params.and_then(|p| p.trim().parse::<i64>().ok()) else {
                    debug!(user = %user, "unparseable PING reply");
                    return;
                };
                let elapsed = Utc::now().timestamp_millis() - sent;
                let data = EventData::CtcpPong {
                    user: user.clone(),
                    seconds: elapsed as f64 / 1000.0,
                };
                self.fire(data, out);
            }
            kind => debug!(user = %user, command = %kind, "ignoring CTCP reply"),
        }
    }
}
