//! Mode string parsing.

use tracing::debug;

use crate::isupport::ServerSupport;

use super::{ModeChange, ModeClass};

#[derive(Clone, Copy)]
enum PlusMinus {
    Plus,
    Minus,
}

/// Split a channel mode string and its positional arguments into changes.
///
/// Argument consumption follows the mode's partition. Unknown mode
/// characters are skipped without consuming an argument. A string without
/// a leading sign is treated as adding.
pub fn parse_mode_changes(
    modes: &str,
    args: &[&str],
    support: &ServerSupport,
) -> Vec<ModeChange> {
    use self::PlusMinus::*;

    let mut res = Vec::new();
    let mut args = args.iter().copied();
    let mut cur = Plus;

    for c in modes.chars() {
        match c {
            '+' => cur = Plus,
            '-' => cur = Minus,
            _ => {
                let adding = matches!(cur, Plus);
                let Some(class) = support.mode_class(c) else {
                    debug!(mode = %c, "ignoring unknown channel mode");
                    continue;
                };
                let arg = if class.takes_arg(adding) {
                    args.next().map(str::to_owned)
                } else {
                    None
                };
                res.push(ModeChange::new(adding, c, class, arg));
            }
        }
    }

    res
}

/// Split a user mode string like `+iw-x` into `(adding, mode)` pairs.
pub fn parse_user_modes(modes: &str) -> Vec<(bool, char)> {
    let mut adding = true;
    modes
        .chars()
        .filter_map(|c| match c {
            '+' => {
                adding = true;
                None
            }
            '-' => {
                adding = false;
                None
            }
            _ => Some((adding, c)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isupport::Isupport;

    fn support() -> ServerSupport {
        let mut s = ServerSupport::default();
        s.apply(&Isupport::parse_params(&[
            "PREFIX=(ov)@+",
            "CHANMODES=beI,k,l,imnpst",
        ]));
        s
    }

    fn args(changes: &[ModeChange]) -> Vec<Option<&str>> {
        changes.iter().map(|c| c.arg.as_deref()).collect()
    }

    #[test]
    fn test_prefix_modes_consume_args() {
        let changes = parse_mode_changes("+ov", &["alice", "bob"], &support());
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].class, ModeClass::Prefix);
        assert_eq!(args(&changes), vec![Some("alice"), Some("bob")]);
    }

    #[test]
    fn test_set_mode_only_consumes_when_adding() {
        let changes = parse_mode_changes("-l+k", &["secret"], &support());
        assert_eq!(changes[0].mode, 'l');
        assert!(!changes[0].adding);
        assert_eq!(changes[0].arg, None);
        assert_eq!(changes[1].arg.as_deref(), Some("secret"));
    }

    #[test]
    fn test_always_mode_consumes_on_remove() {
        let changes = parse_mode_changes("-kt", &["secret"], &support());
        assert_eq!(args(&changes), vec![Some("secret"), None]);
    }

    #[test]
    fn test_unknown_mode_ignored() {
        let changes = parse_mode_changes("+Zo", &["alice"], &support());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].mode, 'o');
        assert_eq!(changes[0].arg.as_deref(), Some("alice"));
    }

    #[test]
    fn test_ban_list_query_no_arg() {
        let changes = parse_mode_changes("+b", &[], &support());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].arg, None);
    }

    #[test]
    fn test_mixed_signs() {
        let changes = parse_mode_changes("+nt-s+b-v", &["*!*@x", "carol"], &support());
        let rendered: Vec<String> = changes.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["+n", "+t", "-s", "+b *!*@x", "-v carol"]);
    }

    #[test]
    fn test_no_sign_defaults_to_adding() {
        let changes = parse_mode_changes("nt", &[], &support());
        assert!(changes.iter().all(|c| c.adding));
    }

    #[test]
    fn test_user_modes() {
        assert_eq!(
            parse_user_modes("+iw-x"),
            vec![(true, 'i'), (true, 'w'), (false, 'x')]
        );
    }
}
