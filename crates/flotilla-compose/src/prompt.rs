//! Confirmation gate.

use std::io::{BufRead, Write};
use std::sync::Mutex;

use flotilla_common::error::{FlotillaError, Result};

/// Asks the user whether a pending mutation should proceed.
pub trait Confirm: Send + Sync {
    /// Shows `message` and returns the answer; `default` applies to an
    /// empty answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;
}

/// Fixed answer, for non-interactive use.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        tracing::debug!(message, answer = self.0, "auto-answered confirmation");
        Ok(self.0)
    }
}

/// Line-oriented yes/no prompt over a reader and a writer.
pub struct LinePrompt<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Creates a prompt reading answers from `input` and writing to `output`.
    pub const fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }
}

impl LinePrompt<std::io::BufReader<std::io::Stdin>, std::io::Stdout> {
    /// Creates a prompt on the process's standard streams.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

fn parse_answer(line: &str, default: bool) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

impl<R: BufRead + Send, W: Write + Send> Confirm for LinePrompt<R, W> {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let mut io = self.io.lock().map_err(|_| FlotillaError::Prompt {
            source: std::io::Error::other("prompt lock poisoned"),
        })?;
        let (input, output) = &mut *io;
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            write!(output, "? {message} {hint} ")
                .and_then(|()| output.flush())
                .map_err(|source| FlotillaError::Prompt { source })?;

            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .map_err(|source| FlotillaError::Prompt { source })?;
            if read == 0 {
                return Ok(default);
            }
            if let Some(answer) = parse_answer(&line, default) {
                return Ok(answer);
            }
            writeln!(output, "Please answer y or n.")
                .map_err(|source| FlotillaError::Prompt { source })?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn ask(input: &str, default: bool) -> (bool, String) {
        let prompt = LinePrompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let answer = prompt.confirm("Going to remove shop-web-1", default).expect("confirm");
        let (_, output) = prompt.io.into_inner().expect("lock");
        (answer, String::from_utf8(output).expect("utf8"))
    }

    #[test]
    fn yes_proceeds() {
        let (answer, output) = ask("y\n", false);
        assert!(answer);
        assert!(output.contains("Going to remove shop-web-1 [y/N]"));
    }

    #[test]
    fn empty_line_takes_default() {
        assert!(!ask("\n", false).0);
        assert!(ask("\n", true).0);
    }

    #[test]
    fn eof_takes_default() {
        assert!(!ask("", false).0);
    }

    #[test]
    fn invalid_answer_reprompts() {
        let (answer, output) = ask("maybe\nNO\n", true);
        assert!(!answer);
        assert!(output.contains("Please answer y or n."));
        assert_eq!(output.matches("[Y/n]").count(), 2);
    }

    #[test]
    fn auto_confirm_ignores_default() {
        assert!(AutoConfirm(true).confirm("x", false).expect("confirm"));
        assert!(!AutoConfirm(false).confirm("x", true).expect("confirm"));
    }
}
