//! Quoting for the two remote interpreters.
//!
//! Commands pass through `/bin/sh -c` on the remote end and, for the vendor
//! CLIs, through the CLI's own tokenizer as well. The two use incompatible
//! escaping rules, so each gets its own quoter.

/// Characters wrapped in double quotes by [`shell_quote`].
const SHELL_DOUBLE: &str = "' ;{}()[]<>*#&|";

/// Characters wrapped in single quotes by [`shell_quote`].
const SHELL_SINGLE: &str = "\"$\\`!";

/// Quote a string so that it passes transparently through a POSIX shell.
///
/// Only metacharacters are quoted, one at a time, so ordinary text stays
/// readable in logs:
///
/// ```
/// assert_eq!(fabricsh::quote::shell_quote("a b;$x"), r#"a" "b";"'$'x"#);
/// ```
pub fn shell_quote(s: &str) -> String {
    let mut q = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        if SHELL_DOUBLE.contains(c) {
            q.push('"');
            q.push(c);
            q.push('"');
        } else if SHELL_SINGLE.contains(c) {
            q.push('\'');
            q.push(c);
            q.push('\'');
        } else {
            q.push(c);
        }
    }
    q
}

/// Quote region the CLI lexer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteState {
    /// Outside any quotes.
    #[default]
    Bare,
    /// Inside `'...'`.
    Single,
    /// Inside `"..."`.
    Double,
}

impl QuoteState {
    fn delimiter(self) -> Option<char> {
        match self {
            QuoteState::Bare => None,
            QuoteState::Single => Some('\''),
            QuoteState::Double => Some('"'),
        }
    }
}

/// Quote a token for the vendor CLI tokenizer, starting unquoted.
pub fn cli_quote(s: &str) -> String {
    cli_quote_from(s, QuoteState::Bare)
}

/// Quote a token for the vendor CLI tokenizer.
///
/// Emulates the CLI lexer: an apostrophe or a space seen while bare opens a
/// double-quoted region, a double quote seen while bare opens a single-quoted
/// region, and the active delimiter is backslash-escaped inside its own
/// region. The whole token is wrapped in whichever region is open at the end.
pub fn cli_quote_from(s: &str, initial: QuoteState) -> String {
    let mut state = initial;
    let mut body = String::with_capacity(s.len() + 2);

    for c in s.chars() {
        match (c, state) {
            ('\'', QuoteState::Bare) | (' ', QuoteState::Bare) => {
                state = QuoteState::Double;
                body.push(c);
            }
            ('"', QuoteState::Bare) => {
                state = QuoteState::Single;
                body.push(c);
            }
            ('\'', QuoteState::Single) | ('"', QuoteState::Double) => {
                body.push('\\');
                body.push(c);
            }
            _ => body.push(c),
        }
    }

    match state.delimiter() {
        Some(d) => format!("{d}{body}{d}"),
        None => body,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Undo one pass of POSIX shell word parsing for a single word.
    pub(crate) fn shell_unquote(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\'' => {
                    for c in chars.by_ref() {
                        if c == '\'' {
                            break;
                        }
                        out.push(c);
                    }
                }
                '"' => {
                    while let Some(c) = chars.next() {
                        match c {
                            '"' => break,
                            '\\' if matches!(chars.peek(), Some('"' | '\\' | '$' | '`')) => {
                                out.push(chars.next().unwrap());
                            }
                            _ => out.push(c),
                        }
                    }
                }
                '\\' => {
                    if let Some(n) = chars.next() {
                        out.push(n);
                    }
                }
                _ => out.push(c),
            }
        }
        out
    }

    /// Undo the CLI lexer's quoting for a single token.
    fn cli_unquote(s: &str) -> String {
        let mut out = String::new();
        let mut open: Option<char> = None;
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            match open {
                Some(q) if c == '\\' && chars.peek() == Some(&q) => {
                    out.push(q);
                    chars.next();
                }
                Some(q) if c == q => open = None,
                Some(_) => out.push(c),
                None if c == '\'' || c == '"' => open = Some(c),
                None => out.push(c),
            }
        }
        out
    }

    #[test]
    fn test_shell_quote_plain_text_untouched() {
        assert_eq!(shell_quote("ls-la/tmp.x_y"), "ls-la/tmp.x_y");
    }

    #[test]
    fn test_shell_quote_metacharacters() {
        assert_eq!(shell_quote("a;b"), r#"a";"b"#);
        assert_eq!(shell_quote("it's"), r#"it"'"s"#);
        assert_eq!(shell_quote("$HOME"), "'$'HOME");
        assert_eq!(shell_quote("say \"hi\""), r#"say" "'"'hi'"'"#);
        assert_eq!(shell_quote("IFS=;ls"), r#"IFS=";"ls"#);
    }

    #[test]
    fn test_shell_quote_roundtrip() {
        let cases = [
            "",
            "plain",
            "' ;{}()[]<>*#&|",
            "\"$\\`!",
            "echo \"$*\" >>/root/.ssh/authorized_keys",
            "ssh-rsa AAAAB3Nza+/= lab key",
            "a'b\"c$d`e!f\\g",
            "x || :",
        ];
        for s in cases {
            assert_eq!(shell_unquote(&shell_quote(s)), s, "input {s:?}");
        }
    }

    #[test]
    fn test_cli_quote_bare_token_unchanged() {
        assert_eq!(cli_quote("running-config"), "running-config");
        assert_eq!(cli_quote(""), "");
    }

    #[test]
    fn test_cli_quote_single_special() {
        assert_eq!(cli_quote("it's"), r#""it's""#);
        assert_eq!(cli_quote("a\"b"), r#"'a"b'"#);
        assert_eq!(cli_quote("a b"), r#""a b""#);
    }

    #[test]
    fn test_cli_quote_escapes_active_delimiter() {
        assert_eq!(cli_quote("it's \"x\""), r#""it's \"x\"""#);
        assert_eq!(cli_quote("\"it's\""), r#"'"it\'s"'"#);
    }

    #[test]
    fn test_cli_quote_initial_state() {
        assert_eq!(cli_quote_from("abc", QuoteState::Single), "'abc'");
        assert_eq!(cli_quote_from("a'b", QuoteState::Single), r"'a\'b'");
        assert_eq!(cli_quote_from("a b", QuoteState::Double), r#""a b""#);
    }

    #[test]
    fn test_cli_quote_roundtrip() {
        for s in ["it's", "a\"b", "a b", "name", "it's \"x\"", "\"it's\""] {
            assert_eq!(cli_unquote(&cli_quote(s)), s, "input {s:?}");
        }
    }

    proptest! {
        #[test]
        fn test_shell_quote_roundtrip_any(s in "[^\\x00]{0,64}") {
            prop_assert_eq!(shell_unquote(&shell_quote(&s)), s);
        }

        #[test]
        fn test_cli_quote_plain_identity(s in "[a-zA-Z0-9._/:@=-]{0,24}") {
            prop_assert_eq!(cli_quote(&s), s);
        }

        #[test]
        fn test_cli_quote_apostrophe_roundtrip(s in "[a-z0-9._/-]{0,8}('[a-z0-9._/-]{0,8}){1,3}") {
            prop_assert_eq!(cli_unquote(&cli_quote(&s)), s);
        }

        #[test]
        fn test_cli_quote_double_quote_roundtrip(s in "[a-z0-9._/-]{0,8}(\"[a-z0-9._/-]{0,8}){1,3}") {
            prop_assert_eq!(cli_unquote(&cli_quote(&s)), s);
        }

        #[test]
        fn test_cli_quote_space_roundtrip(s in "[a-z0-9._/-]{0,8}( [a-z0-9._/-]{0,8}){1,3}") {
            prop_assert_eq!(cli_unquote(&cli_quote(&s)), s);
        }
    }
}
