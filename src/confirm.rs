//! Interactive y/n confirmation used by `--ask`.

use crate::error::{RekegError, Result};
use std::io::{BufRead, Write};

const PROMPT: &str = "Do you want to proceed with the installation? [y/n]: ";
const INVALID: &str = "Invalid input. Please enter 'y' or 'n'.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Proceed,
    Abort,
}

/// Interpret one answer. `None` means the input was not an answer.
pub fn parse_answer(line: &str) -> Option<Confirmation> {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Confirmation::Proceed),
        "n" | "no" => Some(Confirmation::Abort),
        _ => None,
    }
}

/// Prompt until a valid answer is read.
///
/// Invalid answers reprompt indefinitely. End of input is an error rather
/// than a decline.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Confirmation> {
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Err(RekegError::InputClosed);
        }

        match parse_answer(&line) {
            Some(answer) => return Ok(answer),
            None => writeln!(output, "{}", INVALID)?,
        }
    }
}
