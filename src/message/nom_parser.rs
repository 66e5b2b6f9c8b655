//! Nom-based line parser.
//!
//! Splits one protocol line into borrowed tags, prefix, command and
//! parameters without allocating for the slices themselves.

use nom::{
    bytes::complete::{take_till, take_till1, take_until, take_while1},
    character::complete::{char, space0, space1},
    combinator::{opt, verify},
    error::{context, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::{pair, preceded},
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

fn is_line_end(c: char) -> bool {
    c == '\r' || c == '\n'
}

/// Message tags after `@`, up to the first space.
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context("parsing message tags", preceded(char('@'), take_until(" ")))(input)
}

/// Source after `:`, up to the first space.
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while1(|c| c != ' ')),
    )(input)
}

/// Command word or three-digit numeric.
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing command",
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    )(input)
}

/// One space-separated parameter that does not start with `:`.
fn parse_middle(input: &str) -> ParseResult<&str, &str> {
    preceded(
        space1,
        verify(
            take_till1(|c| c == ' ' || is_line_end(c)),
            |s: &str| !s.starts_with(':'),
        ),
    )(input)
}

/// Final parameter introduced by ` :`, may contain spaces or be empty.
fn parse_trailing(input: &str) -> ParseResult<&str, &str> {
    preceded(pair(space1, char(':')), take_till(is_line_end))(input)
}

/// Parse a complete line into its components.
///
/// ```text
/// [@tags] [:prefix] <command> [params...] [:trailing]
/// ```
pub fn parse_message(input: &str) -> ParseResult<&str, ParsedMessage<'_>> {
    let (input, tags) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(parse_prefix)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = parse_command(input)?;
    let (input, mut params) = context("parsing parameters", many0(parse_middle))(input)?;
    let (input, trailing) = opt(parse_trailing)(input)?;
    params.extend(trailing);

    Ok((
        input,
        ParsedMessage {
            tags,
            prefix,
            command,
            params,
        },
    ))
}

/// A parsed line with borrowed string slices.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage<'a> {
    /// Raw tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command name.
    pub command: &'a str,
    /// Command parameters, including trailing.
    pub params: Vec<&'a str>,
}

impl<'a> ParsedMessage<'a> {
    /// Parse a line, reporting the innermost parser context on failure.
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        match parse_message(input) {
            Ok((_rest, msg)) => Ok(msg),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let mut position = input.len();
                let mut what = "parsing line";
                for (remaining, kind) in &e.errors {
                    position = input.len() - remaining.len();
                    if let VerboseErrorKind::Context(ctx) = kind {
                        what = ctx;
                    }
                }
                Err(MessageParseError::ParseContext {
                    position,
                    context: what.to_string(),
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::ParseContext {
                position: input.len(),
                context: "incomplete input".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let msg = ParsedMessage::parse("PING").unwrap();
        assert_eq!(msg.command, "PING");
        assert!(msg.tags.is_none());
        assert!(msg.prefix.is_none());
        assert!(msg.params.is_empty());
    }

    #[test]
    fn test_parse_with_prefix_and_trailing() {
        let msg = ParsedMessage::parse(":nick!user@host PRIVMSG #channel :Hello, world!").unwrap();
        assert_eq!(msg.prefix, Some("nick!user@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#channel", "Hello, world!"]);
    }

    #[test]
    fn test_parse_with_tags() {
        let msg = ParsedMessage::parse("@time=2023-01-01T00:00:00Z :nick PRIVMSG #ch :Hi").unwrap();
        assert_eq!(msg.tags, Some("time=2023-01-01T00:00:00Z"));
        assert_eq!(msg.prefix, Some("nick"));
        assert_eq!(msg.params, vec!["#ch", "Hi"]);
    }

    #[test]
    fn test_parse_with_crlf() {
        let msg = ParsedMessage::parse("PING :server\r\n").unwrap();
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.params, vec!["server"]);
    }

    #[test]
    fn test_parse_isupport_line() {
        let msg = ParsedMessage::parse(
            ":irc.example.net 005 bot PREFIX=(ov)@+ CHANTYPES=# :are supported by this server",
        )
        .unwrap();
        assert_eq!(msg.command, "005");
        assert_eq!(
            msg.params,
            vec!["bot", "PREFIX=(ov)@+", "CHANTYPES=#", "are supported by this server"]
        );
    }

    #[test]
    fn test_parse_empty_trailing() {
        let msg = ParsedMessage::parse("PRIVMSG #channel :").unwrap();
        assert_eq!(msg.params, vec!["#channel", ""]);
    }

    #[test]
    fn test_parse_extra_spaces() {
        let msg = ParsedMessage::parse(":srv MODE  #chan +o  alice ").unwrap();
        assert_eq!(msg.params, vec!["#chan", "+o", "alice"]);
    }

    #[test]
    fn test_parse_missing_command() {
        let err = ParsedMessage::parse(":prefix.only").unwrap_err();
        assert!(matches!(err, MessageParseError::ParseContext { .. }));
    }
}
