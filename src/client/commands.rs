use chrono::Utc;
use tracing::{debug, info};

use crate::event::{EventData, Outbox, Target};
use crate::message::{Message, MessageRef};
use crate::mode::{parse_user_modes, ModeChange, ModeClass};
use crate::state::Topic;

use super::Client;

impl Client {
    pub(super) fn on_join(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let (Some(prefix), Some(channel)) = (msg.prefix, msg.arg(0)) else {
            return;
        };
        let id = self.state.observe(&prefix);
        self.state.join(channel, id);

        if self.is_self(prefix.name()) {
            info!(tag = %self.tag, channel, "joined");
            out.send(Message::mode(channel, None::<&str>));
            let data = EventData::BotJoin {
                channel: channel.to_owned(),
            };
            self.fire(data, out);
        } else {
            let user = self.user_info(prefix.name());
            let data = EventData::UserJoin {
                user,
                channel: channel.to_owned(),
            };
            self.fire(data, out);
        }
    }

    pub(super) fn on_part(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let (Some(prefix), Some(channel)) = (msg.prefix, msg.arg(0)) else {
            return;
        };
        let channel = channel.to_owned();

        if self.is_self(prefix.name()) {
            info!(tag = %self.tag, %channel, "left");
            let data = EventData::BotPart {
                channel: channel.clone(),
            };
            self.fire_with(data, out, |_, ctx| {
                ctx.state_mut().remove_channel(&channel);
            });
        } else {
            let id = self.state.observe(&prefix);
            let user = self.user_info(prefix.name());
            let data = EventData::UserPart {
                user,
                channel: channel.clone(),
                reason: msg.arg(1).map(str::to_owned),
            };
            self.fire_with(data, out, |_, ctx| ctx.state_mut().detach(&channel, id));
        }
    }

    pub(super) fn on_kick(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let (Some(channel), Some(victim)) = (msg.arg(0), msg.arg(1)) else {
            return;
        };
        let channel = channel.to_owned();
        let kicker = self.source_info(msg.prefix.as_ref());
        let reason = msg.arg(2).unwrap_or(kicker.nick.as_str()).to_owned();

        if self.is_self(victim) {
            info!(tag = %self.tag, %channel, kicker = %kicker, %reason, "kicked");
            let data = EventData::BotKicked {
                channel: channel.clone(),
                kicker,
                reason,
            };
            self.fire_with(data, out, |_, ctx| {
                ctx.state_mut().remove_channel(&channel);
            });
        } else {
            let id = self.state.ensure_user(victim);
            let user = self.user_info(victim);
            let data = EventData::UserKicked {
                user,
                channel: channel.clone(),
                kicker,
                reason,
            };
            self.fire_with(data, out, |_, ctx| ctx.state_mut().detach(&channel, id));
        }
    }

    pub(super) fn on_quit(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let Some(prefix) = msg.prefix else {
            return;
        };
        if self.is_self(prefix.name()) {
            return;
        }
        let id = self.state.observe(&prefix);
        let user = self.user_info(prefix.name());
        let data = EventData::UserQuit {
            user,
            reason: msg.arg(0).unwrap_or_default().to_owned(),
        };
        self.fire_with(data, out, |_, ctx| {
            ctx.state_mut().quit(id);
        });
    }

    pub(super) fn on_nick(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let (Some(prefix), Some(new)) = (msg.prefix, msg.arg(0)) else {
            return;
        };
        let old = prefix.name().to_owned();
        if let Some(id) = self.state.user_id(&old) {
            self.state.observe(&prefix);
            self.state.rename(id, new);
        }

        if self.is_self(&old) {
            info!(tag = %self.tag, %old, new, "nickname changed");
            self.nickname = new.to_owned();
            let data = EventData::BotNickChanged {
                old,
                new: new.to_owned(),
            };
            self.fire(data, out);
        } else {
            let user = self.user_info(new);
            let data = EventData::UserNickChanged {
                user,
                old,
                new: new.to_owned(),
            };
            self.fire(data, out);
        }
    }

    pub(super) fn on_mode(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let (Some(target), Some(modes)) = (msg.arg(0), msg.arg(1)) else {
            return;
        };
        let args = msg.args.get(2..).unwrap_or_default();
        let user = self.source_info(msg.prefix.as_ref());

        let (target, changes) = if self.state.is_channel(target) {
            let changes = self.state.apply_modes(target, modes, args);
            (Target::Channel(target.to_owned()), changes)
        } else {
            if self.is_self(target) {
                self.apply_user_modes(modes);
                debug!(tag = %self.tag, modes, "user modes changed");
            }
            let changes = parse_user_modes(modes)
                .into_iter()
                .map(|(adding, mode)| ModeChange::new(adding, mode, ModeClass::Never, None))
                .collect();
            (Target::User(self.user_info(target)), changes)
        };

        self.fire(
            EventData::ModeChanged {
                user,
                target,
                changes,
            },
            out,
        );
    }

    pub(super) fn on_topic(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let Some(channel) = msg.arg(0) else {
            return;
        };
        let text = msg.arg(1).unwrap_or_default();
        let user = self.source_info(msg.prefix.as_ref());
        let topic = (!text.is_empty()).then(|| Topic {
            text: text.to_owned(),
            set_by: Some(user.nick.clone()),
            set_at: Some(Utc::now()),
        });
        self.state.set_topic(channel, topic.clone());
        let data = EventData::ChannelTopicChanged {
            user: Some(user),
            channel: channel.to_owned(),
            topic,
        };
        self.fire(data, out);
    }

    /// Auto-join on invite, when configured and not vetoed.
    pub(super) fn on_invite(&mut self, msg: &MessageRef<'_>, out: &mut Outbox) {
        let Some(channel) = msg.arg(1) else {
            return;
        };
        let inviter = self.source_info(msg.prefix.as_ref());
        info!(tag = %self.tag, channel, inviter = %inviter, "invited");
        let data = EventData::BotInvite {
            channel: channel.to_owned(),
            inviter,
        };
        let join_on_invite = self.config.bot.join_on_invite;
        self.fire_with(data, out, |event, ctx| {
            if event.is_cancelled() {
                debug!(channel, "invite vetoed");
            } else if join_on_invite {
                ctx.join(channel, None);
            }
        });
    }
}
