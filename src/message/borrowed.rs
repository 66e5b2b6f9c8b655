use crate::error::MessageParseError;
use crate::prefix::PrefixRef;

use super::nom_parser::ParsedMessage;

/// An inbound line, borrowed from the read buffer.
#[derive(Clone, PartialEq, Debug)]
pub struct MessageRef<'a> {
    pub tags: Option<&'a str>,
    pub prefix: Option<PrefixRef<'a>>,
    pub command: &'a str,
    pub args: Vec<&'a str>,
    pub raw: &'a str,
}

impl<'a> MessageRef<'a> {
    pub fn parse(s: &'a str) -> Result<MessageRef<'a>, MessageParseError> {
        let trimmed = s.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let parsed = ParsedMessage::parse(trimmed)?;

        Ok(MessageRef {
            tags: parsed.tags,
            prefix: parsed.prefix.map(PrefixRef::parse),
            command: parsed.command,
            args: parsed.params,
            raw: trimmed,
        })
    }

    /// Positional argument, if present.
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied()
    }

    /// Last argument, usually the trailing text.
    pub fn trailing(&self) -> Option<&'a str> {
        self.args.last().copied()
    }

    /// Nickname (or server name) of the source.
    pub fn source_name(&self) -> Option<&'a str> {
        self.prefix.map(|p| p.name())
    }

    /// Require at least `n` arguments.
    pub fn expect_args(&self, n: usize) -> Result<(), MessageParseError> {
        if self.args.len() < n {
            return Err(MessageParseError::NotEnoughArguments {
                command: self.command.to_ascii_uppercase(),
                expected: n,
                got: self.args.len(),
            });
        }
        Ok(())
    }
}
