//! Numeric replies the client reacts to.
//!
//! Anything not listed here is still delivered, as an
//! [`UnknownCommand`](crate::event::EventKind::UnknownCommand) event.

#![allow(non_camel_case_types)]

use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    /// 001 - Registration accepted
    RPL_WELCOME = 1,
    /// 002 - Your host is running version
    RPL_YOURHOST = 2,
    /// 003 - Server creation date
    RPL_CREATED = 3,
    /// 004 - Server name, version, user modes, channel modes
    RPL_MYINFO = 4,
    /// 005 - ISUPPORT tokens
    RPL_ISUPPORT = 5,
    /// 010 - Bounce to another server
    RPL_BOUNCE = 10,
    /// 221 - Our user modes
    RPL_UMODEIS = 221,
    /// 251 - Users, services and servers
    RPL_LUSERCLIENT = 251,
    /// 252 - Operators online
    RPL_LUSEROP = 252,
    /// 254 - Channels formed
    RPL_LUSERCHANNELS = 254,
    /// 255 - Local clients and servers
    RPL_LUSERME = 255,
    /// 324 - Channel modes
    RPL_CHANNELMODEIS = 324,
    /// 331 - No topic set
    RPL_NOTOPIC = 331,
    /// 332 - Channel topic
    RPL_TOPIC = 332,
    /// 333 - Who set the topic, and when
    RPL_TOPICWHOTIME = 333,
    /// 353 - NAMES entries
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES = 366,
    /// 372 - MOTD line
    RPL_MOTD = 372,
    /// 375 - MOTD start
    RPL_MOTDSTART = 375,
    /// 376 - MOTD end
    RPL_ENDOFMOTD = 376,
    /// 422 - No MOTD
    ERR_NOMOTD = 422,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname in use
    ERR_NICKNAMEINUSE = 433,
    /// 436 - Nickname collision
    ERR_NICKCOLLISION = 436,
}

impl Response {
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn from_code(code: u16) -> Option<Response> {
        Some(match code {
            1 => Response::RPL_WELCOME,
            2 => Response::RPL_YOURHOST,
            3 => Response::RPL_CREATED,
            4 => Response::RPL_MYINFO,
            5 => Response::RPL_ISUPPORT,
            10 => Response::RPL_BOUNCE,
            221 => Response::RPL_UMODEIS,
            251 => Response::RPL_LUSERCLIENT,
            252 => Response::RPL_LUSEROP,
            254 => Response::RPL_LUSERCHANNELS,
            255 => Response::RPL_LUSERME,
            324 => Response::RPL_CHANNELMODEIS,
            331 => Response::RPL_NOTOPIC,
            332 => Response::RPL_TOPIC,
            333 => Response::RPL_TOPICWHOTIME,
            353 => Response::RPL_NAMREPLY,
            366 => Response::RPL_ENDOFNAMES,
            372 => Response::RPL_MOTD,
            375 => Response::RPL_MOTDSTART,
            376 => Response::RPL_ENDOFMOTD,
            422 => Response::ERR_NOMOTD,
            432 => Response::ERR_ERRONEUSNICKNAME,
            433 => Response::ERR_NICKNAMEINUSE,
            436 => Response::ERR_NICKCOLLISION,
            _ => return None,
        })
    }

    /// Error replies (4xx, 5xx).
    #[inline]
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code())
    }

    /// Replies that mean the nickname we asked for cannot be used.
    pub fn is_nick_rejection(&self) -> bool {
        matches!(
            self,
            Response::ERR_ERRONEUSNICKNAME
                | Response::ERR_NICKNAMEINUSE
                | Response::ERR_NICKCOLLISION
        )
    }
}

impl FromStr for Response {
    type Err = ParseResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 3 {
            return Err(ParseResponseError::InvalidFormat);
        }
        let code: u16 = s.parse().map_err(|_| ParseResponseError::InvalidFormat)?;
        Response::from_code(code).ok_or(ParseResponseError::UnknownCode(code))
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseResponseError {
    /// Not a three-digit number.
    InvalidFormat,
    /// A numeric the client does not react to.
    UnknownCode(u16),
}

impl std::fmt::Display for ParseResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat => write!(f, "invalid response code format"),
            Self::UnknownCode(code) => write!(f, "unknown response code: {}", code),
        }
    }
}

impl std::error::Error for ParseResponseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("001".parse::<Response>(), Ok(Response::RPL_WELCOME));
        assert_eq!("433".parse::<Response>(), Ok(Response::ERR_NICKNAMEINUSE));
        assert_eq!("999".parse::<Response>(), Err(ParseResponseError::UnknownCode(999)));
        assert_eq!("PRIVMSG".parse::<Response>(), Err(ParseResponseError::InvalidFormat));
        assert_eq!("1".parse::<Response>(), Err(ParseResponseError::InvalidFormat));
    }

    #[test]
    fn test_display_pads() {
        assert_eq!(Response::RPL_ISUPPORT.to_string(), "005");
        assert_eq!(Response::RPL_NAMREPLY.to_string(), "353");
    }

    #[test]
    fn test_classification() {
        assert!(Response::ERR_NICKNAMEINUSE.is_error());
        assert!(Response::ERR_NICKNAMEINUSE.is_nick_rejection());
        assert!(!Response::ERR_NOMOTD.is_nick_rejection());
        assert!(!Response::RPL_TOPIC.is_error());
    }
}
