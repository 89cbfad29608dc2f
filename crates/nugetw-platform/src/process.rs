#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Keeps spawned console tools from flashing a window on Windows.
pub trait HideWindow {
    fn hide_window(&mut self) -> &mut Self;
}

impl HideWindow for tokio::process::Command {
    #[cfg(windows)]
    fn hide_window(&mut self) -> &mut Self {
        self.creation_flags(CREATE_NO_WINDOW)
    }

    #[cfg(not(windows))]
    fn hide_window(&mut self) -> &mut Self {
        self
    }
}

/// Wrap a value in double quotes, the way nuget expects paths and sources.
#[must_use]
pub fn quote_arg(value: &str) -> String {
    format!("\"{value}\"")
}

/// Split a Windows-style command line into argv tokens.
///
/// Whitespace separates tokens unless it sits inside double quotes; the
/// quotes themselves are dropped. Backslashes are literal so Windows paths
/// survive unchanged.
#[must_use]
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::{HideWindow, quote_arg, split_command_line};

    #[test]
    fn tokio_command_hide_window_is_chainable() {
        let mut cmd = tokio::process::Command::new("nuget");
        let before = &raw mut cmd;
        let after = cmd.hide_window() as *mut tokio::process::Command;
        assert_eq!(before, after);
    }

    #[test]
    fn quote_arg_wraps_value() {
        assert_eq!(quote_arg(r"C:\Program Files\pkgs"), r#""C:\Program Files\pkgs""#);
    }

    #[test]
    fn split_keeps_quoted_whitespace_together() {
        let tokens = split_command_line(
            r#"install Foo -Source "https://a/index.json" "C:\local feed" -NonInteractive"#,
        );

        assert_eq!(
            tokens,
            vec![
                "install",
                "Foo",
                "-Source",
                "https://a/index.json",
                r"C:\local feed",
                "-NonInteractive",
            ]
        );
    }

    #[test]
    fn split_preserves_empty_quoted_token() {
        assert_eq!(split_command_line(r#"a "" b"#), vec!["a", "", "b"]);
    }

    #[test]
    fn split_ignores_repeated_whitespace() {
        assert_eq!(split_command_line("  update   -Safe  "), vec!["update", "-Safe"]);
        assert!(split_command_line("   ").is_empty());
    }
}
