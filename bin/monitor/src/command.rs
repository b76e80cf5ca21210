//! Operator input parsing for the interactive monitor.

use thiserror::Error;
use withdrawal::{Command, PageSize};

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command `{0}` (type `help`)")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("`{0}` is not a number")]
    InvalidNumber(String),

    #[error("page size must be one of 20, 30, 50, 100")]
    InvalidPageSize,
}

pub const HELP: &str = "\
commands:
  r, refresh        fetch the latest withdrawals now
  n, next           next page
  p, prev           previous page
  page <n>          go to page n
  size <n>          rows per page (20, 30, 50, 100)
  qr <key>          show the PromptPay QR for a withdrawal
  ok                mark the open QR as paid
  close             close the open QR
  done <key>        mark a withdrawal as scanned
  q, quit           exit";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_input(line: &str) -> Result<Option<Input>, ParseError> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    let input = match word.to_ascii_lowercase().as_str() {
        "r" | "refresh" => Input::Command(Command::Refresh),
        "n" | "next" => Input::Command(Command::NextPage),
        "p" | "prev" | "previous" => Input::Command(Command::PreviousPage),
        "page" | "g" => Input::Command(Command::GoToPage(number(arg, "page")?)),
        "size" => {
            let size = number(arg, "size")?;
            let size = PageSize::try_from(size).map_err(|_| ParseError::InvalidPageSize)?;
            Input::Command(Command::SetPageSize(size))
        }
        "qr" => Input::Command(Command::ShowQr(required(arg, "qr")?)),
        "ok" | "confirm" => Input::Command(Command::ConfirmQr),
        "close" | "x" => Input::Command(Command::CloseQr),
        "done" => Input::Command(Command::MarkDone(required(arg, "done")?)),
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        _ => return Err(ParseError::Unknown(word.to_string())),
    };

    Ok(Some(input))
}

fn required(arg: Option<&str>, command: &'static str) -> Result<String, ParseError> {
    arg.map(str::to_string)
        .ok_or(ParseError::MissingArgument(command))
}

fn number(arg: Option<&str>, command: &'static str) -> Result<usize, ParseError> {
    let raw = arg.ok_or(ParseError::MissingArgument(command))?;
    raw.parse()
        .map_err(|_| ParseError::InvalidNumber(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation() {
        assert_eq!(parse_input("n").unwrap(), Some(Input::Command(Command::NextPage)));
        assert_eq!(parse_input(" PREV ").unwrap(), Some(Input::Command(Command::PreviousPage)));
        assert_eq!(parse_input("page 3").unwrap(), Some(Input::Command(Command::GoToPage(3))));
        assert_eq!(
            parse_input("size 50").unwrap(),
            Some(Input::Command(Command::SetPageSize(PageSize::Fifty)))
        );
    }

    #[test]
    fn test_keyed_commands() {
        assert_eq!(
            parse_input("qr TX-100").unwrap(),
            Some(Input::Command(Command::ShowQr("TX-100".to_string())))
        );
        assert_eq!(
            parse_input("done row-3").unwrap(),
            Some(Input::Command(Command::MarkDone("row-3".to_string())))
        );
    }

    #[test]
    fn test_blank_and_control() {
        assert_eq!(parse_input("   ").unwrap(), None);
        assert_eq!(parse_input("q").unwrap(), Some(Input::Quit));
        assert_eq!(parse_input("help").unwrap(), Some(Input::Help));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_input("size 25"), Err(ParseError::InvalidPageSize));
        assert_eq!(parse_input("page x"), Err(ParseError::InvalidNumber("x".to_string())));
        assert_eq!(parse_input("qr"), Err(ParseError::MissingArgument("qr")));
        assert_eq!(parse_input("launch"), Err(ParseError::Unknown("launch".to_string())));
    }
}
