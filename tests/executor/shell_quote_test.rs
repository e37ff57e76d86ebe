//! Shell quoting tests.

use tower_installer::executor::shell_quote;

#[cfg(unix)]
#[test]
fn simple_string_is_quoted() {
    assert_eq!(shell_quote("my images.tar"), "'my images.tar'");
}

#[cfg(unix)]
#[test]
fn single_quotes_are_escaped() {
    assert_eq!(shell_quote("tower's"), r"'tower'\''s'");
}

#[cfg(unix)]
#[test]
fn empty_string_produces_empty_quotes() {
    assert_eq!(shell_quote(""), "''");
}

#[cfg(unix)]
#[test]
fn special_characters_are_preserved() {
    assert_eq!(shell_quote("$HOME && ls"), "'$HOME && ls'");
}

#[cfg(windows)]
#[test]
fn windows_uses_double_quotes() {
    assert_eq!(shell_quote(r"C:\tower dir"), r#""C:\tower dir""#);
    assert_eq!(shell_quote(r#"a"b"#), r#""a""b""#);
}
