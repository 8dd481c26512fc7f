//! Interactive instrument picker.
//!
//! clap handles structured flags/subcommands; the picker provides the
//! "run `stockcast` and choose an instrument" UX.

use std::io::{self, BufRead, Write};

use crate::domain::Instrument;
use crate::error::AppError;

/// Outcome of one line of picker input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Selected(Instrument),
    Invalid(String),
    Quit,
}

/// Prompt on stdin/stdout until an instrument is chosen.
///
/// Accepts a number from the list or any identifier typed verbatim; `q` cancels.
pub fn prompt_for_instrument() -> Result<Instrument, AppError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    prompt_with(&Instrument::reference_list(), stdin.lock(), stdout.lock())
}

pub fn prompt_with<R: BufRead, W: Write>(choices: &[Instrument], mut input: R, mut out: W) -> Result<Instrument, AppError> {
    let io_err = |e: io::Error| AppError::new(2, format!("Failed to use terminal: {e}"));

    writeln!(out, "Select an instrument:").map_err(io_err)?;
    for (idx, inst) in choices.iter().enumerate() {
        writeln!(out, "{:>3}) {inst}", idx + 1).map_err(io_err)?;
    }

    loop {
        write!(out, "Number (1-{}) or identifier (q to quit): ", choices.len()).map_err(io_err)?;
        out.flush().map_err(io_err)?;

        let mut line = String::new();
        let bytes = input.read_line(&mut line).map_err(io_err)?;
        if bytes == 0 {
            return Err(AppError::new(
                2,
                "No input received. Provide an instrument with `stockcast run --symbol <ID>`.",
            ));
        }

        match parse_choice(&line, choices) {
            Choice::Selected(inst) => return Ok(inst),
            Choice::Quit => return Err(AppError::new(2, "Canceled.")),
            Choice::Invalid(msg) => writeln!(out, "{msg}").map_err(io_err)?,
        }
    }
}

pub fn parse_choice(line: &str, choices: &[Instrument]) -> Choice {
    let input = line.trim();
    if input.eq_ignore_ascii_case("q") {
        return Choice::Quit;
    }
    if let Ok(n) = input.parse::<usize>() {
        return match choices.get(n.wrapping_sub(1)) {
            Some(inst) if n >= 1 => Choice::Selected(inst.clone()),
            _ => Choice::Invalid(format!("Invalid choice: {n}. Enter a number between 1 and {}.", choices.len())),
        };
    }
    match Instrument::new(input) {
        Some(inst) => Choice::Selected(inst),
        None => Choice::Invalid("Enter a number or an instrument identifier.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> Vec<Instrument> {
        Instrument::reference_list()
    }

    #[test]
    fn numbers_pick_from_list() {
        assert_eq!(
            parse_choice("2\n", &list()),
            Choice::Selected(Instrument::new("TCS.NS").unwrap())
        );
        assert!(matches!(parse_choice("0", &list()), Choice::Invalid(_)));
        assert!(matches!(parse_choice("9", &list()), Choice::Invalid(_)));
    }

    #[test]
    fn free_text_is_any_identifier() {
        assert_eq!(
            parse_choice(" AAPL ", &list()),
            Choice::Selected(Instrument::new("AAPL").unwrap())
        );
        assert_eq!(parse_choice("Q", &list()), Choice::Quit);
        assert!(matches!(parse_choice("   ", &list()), Choice::Invalid(_)));
    }

    #[test]
    fn prompt_retries_until_valid() {
        let mut out = Vec::new();
        let inst = prompt_with(&list(), "7\n\n4\n".as_bytes(), &mut out).unwrap();
        assert_eq!(inst.as_str(), "INFY.NS");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Invalid choice: 7"));
        assert!(text.contains("  1) RELIANCE.NS"));
    }

    #[test]
    fn prompt_end_of_input_is_an_error() {
        let err = prompt_with(&list(), "".as_bytes(), Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
