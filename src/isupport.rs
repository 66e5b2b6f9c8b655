//! `RPL_ISUPPORT` (005) parsing.
//!
//! [`Isupport`] is a borrowed view over one 005 line. [`ServerSupport`] is
//! the owned capability set a connection accumulates across all of them.

use crate::casemap::CaseMapping;
use crate::mode::ModeClass;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IsupportEntry<'a> {
    pub key: &'a str,
    pub value: Option<&'a str>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Isupport<'a> {
    entries: Vec<IsupportEntry<'a>>,
}

impl<'a> Isupport<'a> {
    pub fn parse_params(params: &[&'a str]) -> Self {
        let entries = params
            .iter()
            .copied()
            .take_while(|p| !p.starts_with(':'))
            .filter(|p| !p.is_empty())
            .map(|p| match p.split_once('=') {
                Some((key, value)) => IsupportEntry {
                    key,
                    value: Some(value),
                },
                None => IsupportEntry {
                    key: p,
                    value: None,
                },
            })
            .collect();
        Isupport { entries }
    }

    /// Parse the arguments of a 005 reply: our nickname first, then tokens,
    /// then the human-readable trailer which is dropped.
    pub fn from_response_args(args: &[&'a str]) -> Option<Self> {
        let (_nick, mut tokens) = args.split_first()?;
        if let Some(last) = tokens.last() {
            if last.contains(' ') {
                tokens = &tokens[..tokens.len() - 1];
            }
        }
        Some(Self::parse_params(tokens))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IsupportEntry<'a>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last value for `key`. `Some(None)` means the token had no value.
    pub fn get(&self, key: &str) -> Option<Option<&'a str>> {
        self.entries
            .iter()
            .rfind(|e| e.key.eq_ignore_ascii_case(key))
            .map(|e| e.value)
    }

    pub fn casemapping(&self) -> Option<&'a str> {
        self.get("CASEMAPPING").flatten()
    }

    pub fn chantypes(&self) -> Option<&'a str> {
        self.get("CHANTYPES").flatten()
    }

    pub fn network(&self) -> Option<&'a str> {
        self.get("NETWORK").flatten()
    }

    pub fn prefix(&self) -> Option<PrefixSpec<'a>> {
        self.get("PREFIX").flatten().and_then(PrefixSpec::parse)
    }

    pub fn chanmodes(&self) -> Option<ChanModes<'a>> {
        self.get("CHANMODES").flatten().and_then(ChanModes::parse)
    }
}

/// `PREFIX=(modes)symbols`, e.g. `(ov)@+`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixSpec<'a> {
    pub modes: &'a str,
    pub prefixes: &'a str,
}

impl<'a> PrefixSpec<'a> {
    pub fn parse(s: &'a str) -> Option<Self> {
        let inner = s.strip_prefix('(')?;
        let (modes, prefixes) = inner.split_once(')')?;
        if modes.chars().count() != prefixes.chars().count() {
            return None;
        }
        Some(PrefixSpec { modes, prefixes })
    }

    /// Mode/symbol pairs, highest privilege first.
    pub fn pairs(&self) -> impl Iterator<Item = (char, char)> + 'a {
        self.modes.chars().zip(self.prefixes.chars())
    }
}

/// `CHANMODES=A,B,C,D`: list, always-parameter, set-parameter, never-parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChanModes<'a> {
    pub list: &'a str,
    pub always: &'a str,
    pub set: &'a str,
    pub never: &'a str,
}

impl<'a> ChanModes<'a> {
    pub fn parse(s: &'a str) -> Option<Self> {
        let mut parts = s.splitn(4, ',');
        let (list, always, set, never) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        // Later groups beyond the fourth are reserved; ignore them.
        let never = never.split(',').next().unwrap_or_default();
        Some(ChanModes {
            list,
            always,
            set,
            never,
        })
    }
}

/// Capability set advertised by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSupport {
    pub channel_types: String,
    pub list_modes: String,
    pub always_modes: String,
    pub set_modes: String,
    pub never_modes: String,
    /// `(mode, symbol)` pairs, highest privilege first.
    pub prefixes: Vec<(char, char)>,
    pub casemapping: CaseMapping,
    pub network: Option<String>,
    /// Every token seen so far, later values replacing earlier ones.
    pub options: Vec<(String, Option<String>)>,
}

impl Default for ServerSupport {
    fn default() -> Self {
        ServerSupport {
            channel_types: "#".to_string(),
            list_modes: "b".to_string(),
            always_modes: "k".to_string(),
            set_modes: "l".to_string(),
            never_modes: "imnpst".to_string(),
            prefixes: vec![('o', '@'), ('v', '+')],
            casemapping: CaseMapping::Rfc1459,
            network: None,
            options: Vec::new(),
        }
    }
}

impl ServerSupport {
    /// Fold one 005 line into the capability set.
    pub fn apply(&mut self, isupport: &Isupport<'_>) {
        for entry in isupport.iter() {
            let value = entry.value.map(str::to_owned);
            match self
                .options
                .iter_mut()
                .find(|(k, _)| k.eq_ignore_ascii_case(entry.key))
            {
                Some(slot) => slot.1 = value,
                None => self.options.push((entry.key.to_owned(), value)),
            }
        }

        if let Some(prefix) = isupport.prefix() {
            self.prefixes = prefix.pairs().collect();
        }
        if let Some(modes) = isupport.chanmodes() {
            self.list_modes = modes.list.to_owned();
            self.always_modes = modes.always.to_owned();
            self.set_modes = modes.set.to_owned();
            self.never_modes = modes.never.to_owned();
        }
        if let Some(types) = isupport.chantypes() {
            self.channel_types = types.to_owned();
        }
        if let Some(mapping) = isupport.casemapping().and_then(CaseMapping::from_token) {
            self.casemapping = mapping;
        }
        if let Some(network) = isupport.network() {
            self.network = Some(network.to_owned());
        }
    }

    /// Which partition a channel mode character falls into.
    pub fn mode_class(&self, mode: char) -> Option<ModeClass> {
        if self.prefixes.iter().any(|&(m, _)| m == mode) {
            Some(ModeClass::Prefix)
        } else if self.list_modes.contains(mode) {
            Some(ModeClass::List)
        } else if self.always_modes.contains(mode) {
            Some(ModeClass::Always)
        } else if self.set_modes.contains(mode) {
            Some(ModeClass::Set)
        } else if self.never_modes.contains(mode) {
            Some(ModeClass::Never)
        } else {
            None
        }
    }

    /// Whether `target` names a channel.
    pub fn is_channel(&self, target: &str) -> bool {
        target
            .chars()
            .next()
            .map_or(false, |c| self.channel_types.contains(c))
    }

    /// Membership mode for a NAMES symbol.
    pub fn mode_for_symbol(&self, symbol: char) -> Option<char> {
        self.prefixes
            .iter()
            .find(|&&(_, s)| s == symbol)
            .map(|&(m, _)| m)
    }

    /// Split a NAMES entry like `@+alice` into its membership modes and nick.
    pub fn strip_prefixes<'n>(&self, entry: &'n str) -> (Vec<char>, &'n str) {
        let mut modes = Vec::new();
        let mut rest = entry;
        while let Some(c) = rest.chars().next() {
            match self.mode_for_symbol(c) {
                Some(mode) => {
                    modes.push(mode);
                    rest = &rest[c.len_utf8()..];
                }
                None => break,
            }
        }
        (modes, rest)
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.options
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_deref())
    }
}
