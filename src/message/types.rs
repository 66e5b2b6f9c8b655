//! Outbound message construction.

use std::fmt;

use crate::ctcp;

/// An owned outbound line: command plus parameters.
///
/// The last parameter is written with a leading `:` whenever it is empty,
/// contains a space, or starts with `:`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Build a message from a command and parameters.
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Message {
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn nick(nickname: &str) -> Self {
        Self::new("NICK", [nickname])
    }

    /// `USER <username> 0 * :<realname>`
    pub fn user(username: &str, realname: &str) -> Self {
        Self::new("USER", [username, "0", "*", realname])
    }

    pub fn pong(token: &str) -> Self {
        Self::new("PONG", [token])
    }

    pub fn join(channel: &str) -> Self {
        Self::new("JOIN", [channel])
    }

    pub fn join_with_key(channel: &str, key: &str) -> Self {
        Self::new("JOIN", [channel, key])
    }

    pub fn part(channel: &str, reason: Option<&str>) -> Self {
        let mut msg = Self::new("PART", [channel]);
        msg.params.extend(reason.map(str::to_owned));
        msg
    }

    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", [target, text])
    }

    pub fn notice(target: &str, text: &str) -> Self {
        Self::new("NOTICE", [target, text])
    }

    /// CTCP ACTION (`/me`).
    pub fn action(target: &str, text: &str) -> Self {
        Self::privmsg(target, &ctcp::quote("ACTION", Some(text)))
    }

    /// CTCP reply, carried in a NOTICE.
    pub fn ctcp_reply(target: &str, command: &str, data: Option<&str>) -> Self {
        Self::notice(target, &ctcp::quote(command, data))
    }

    pub fn mode<I, P>(target: &str, changes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut msg = Self::new("MODE", [target]);
        msg.params.extend(changes.into_iter().map(Into::into));
        msg
    }

    pub fn kick(channel: &str, nick: &str, reason: Option<&str>) -> Self {
        let mut msg = Self::new("KICK", [channel, nick]);
        msg.params.extend(reason.map(str::to_owned));
        msg
    }

    pub fn topic(channel: &str, text: &str) -> Self {
        Self::new("TOPIC", [channel, text])
    }

    /// `QUIT`, with an optional message.
    pub fn quit(message: Option<&str>) -> Self {
        Self::new("QUIT", message)
    }

    /// An arbitrary pre-formatted line, sent as-is.
    pub fn raw(line: &str) -> Self {
        Message {
            command: line.trim_end_matches(['\r', '\n']).to_string(),
            params: Vec::new(),
        }
    }

    /// Split text on newlines into one message per non-empty line.
    pub fn lines(target: &str, text: &str, build: fn(&str, &str) -> Message) -> Vec<Message> {
        text.lines()
            .filter(|l| !l.is_empty())
            .map(|l| build(target, l))
            .collect()
    }

    /// Serialized form without the terminating CRLF.
    pub fn to_line(&self) -> String {
        self.to_string()
    }

    /// Length in bytes once serialized with CRLF.
    pub fn wire_len(&self) -> usize {
        self.to_string().len() + 2
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        if let Some((last, middle)) = self.params.split_last() {
            for p in middle {
                write!(f, " {}", p)?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_colon_only_when_needed() {
        assert_eq!(Message::join("#rust").to_string(), "JOIN #rust");
        assert_eq!(
            Message::privmsg("#rust", "hello there").to_string(),
            "PRIVMSG #rust :hello there"
        );
        assert_eq!(Message::privmsg("bob", "hi").to_string(), "PRIVMSG bob hi");
        assert_eq!(Message::privmsg("bob", ":)").to_string(), "PRIVMSG bob ::)");
        assert_eq!(Message::privmsg("bob", "").to_string(), "PRIVMSG bob :");
    }

    #[test]
    fn test_registration_lines() {
        assert_eq!(Message::nick("bones").to_string(), "NICK bones");
        assert_eq!(
            Message::user("bones", "Bones Bot").to_string(),
            "USER bones 0 * :Bones Bot"
        );
    }

    #[test]
    fn test_quit_with_and_without_message() {
        assert_eq!(Message::quit(None).to_string(), "QUIT");
        assert_eq!(
            Message::quit(Some("Reactor shutdown")).to_string(),
            "QUIT :Reactor shutdown"
        );
    }

    #[test]
    fn test_action_is_ctcp_framed() {
        assert_eq!(
            Message::action("#rust", "waves").to_string(),
            "PRIVMSG #rust :\x01ACTION waves\x01"
        );
    }

    #[test]
    fn test_lines_splits_on_newline() {
        let msgs = Message::lines("#c", "one\ntwo\n\nthree", Message::privmsg);
        let rendered: Vec<String> = msgs.iter().map(Message::to_string).collect();
        assert_eq!(
            rendered,
            vec!["PRIVMSG #c one", "PRIVMSG #c two", "PRIVMSG #c three"]
        );
    }

    #[test]
    fn test_mode_with_args() {
        assert_eq!(
            Message::mode("#c", ["+ov", "alice", "bob"]).to_string(),
            "MODE #c +ov alice bob"
        );
        assert_eq!(Message::mode("#c", Vec::<String>::new()).to_string(), "MODE #c");
    }
}
