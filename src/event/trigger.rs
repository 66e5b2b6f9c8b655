//! Trigger word detection in channel and private messages.

/// A message of the form `<prefix><keyword> [args...]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerMatch {
    /// The prefix character that introduced the trigger.
    pub prefix: char,
    /// Keyword as typed.
    pub keyword: String,
    /// Whitespace-split arguments after the keyword.
    pub args: Vec<String>,
    /// Everything after the keyword, trimmed, if anything.
    pub rest: Option<String>,
}

impl TriggerMatch {
    /// Match `text` against the configured prefix characters.
    ///
    /// The keyword must follow the prefix immediately and be non-empty.
    ///
    /// ```
    /// use bones_irc::event::TriggerMatch;
    ///
    /// let m = TriggerMatch::parse("+Dance slowly now", "+!").unwrap();
    /// assert_eq!(m.key(), "dance");
    /// assert_eq!(m.args, vec!["slowly", "now"]);
    /// assert!(TriggerMatch::parse("+ dance", "+").is_none());
    /// ```
    pub fn parse(text: &str, prefixes: &str) -> Option<Self> {
        let prefix = text.chars().next().filter(|c| prefixes.contains(*c))?;
        let body = &text[prefix.len_utf8()..];
        let (keyword, rest) = match body.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (body, ""),
        };
        if keyword.is_empty() {
            return None;
        }
        Some(TriggerMatch {
            prefix,
            keyword: keyword.to_owned(),
            args: rest.split_whitespace().map(str::to_owned).collect(),
            rest: Some(rest).filter(|r| !r.is_empty()).map(str::to_owned),
        })
    }

    /// Case-folded keyword, as matched against subscriptions.
    pub fn key(&self) -> String {
        fold_keyword(&self.keyword)
    }
}

/// Fold a trigger keyword for comparison.
pub fn fold_keyword(keyword: &str) -> String {
    keyword.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_without_args() {
        let m = TriggerMatch::parse("!ping", "!").unwrap();
        assert_eq!(m.prefix, '!');
        assert_eq!(m.keyword, "ping");
        assert!(m.args.is_empty());
        assert_eq!(m.rest, None);
    }

    #[test]
    fn test_trigger_rest_keeps_spacing() {
        let m = TriggerMatch::parse("+say  hello   world ", "+").unwrap();
        assert_eq!(m.args, vec!["hello", "world"]);
        assert_eq!(m.rest.as_deref(), Some("hello   world"));
    }

    #[test]
    fn test_no_prefix_no_match() {
        assert!(TriggerMatch::parse("ping", "+").is_none());
        assert!(TriggerMatch::parse("", "+").is_none());
        assert!(TriggerMatch::parse("+", "+").is_none());
    }

    #[test]
    fn test_keyword_is_case_folded() {
        let m = TriggerMatch::parse("+HeLLo", "+").unwrap();
        assert_eq!(m.keyword, "HeLLo");
        assert_eq!(m.key(), "hello");
    }
}
