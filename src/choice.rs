//! Single-choice selection from a lettered table.
//!
//! Rows are labelled `a`, `b`, ... `z`, `aa`, `ab`, ... and the user answers
//! with a letter. Reads and writes go through `BufRead`/`Write` handles so the
//! loop can run against stdin/stdout or an in-memory buffer.

use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChoiceError {
    #[error("nothing to choose from: no {0} available")]
    Empty(String),

    #[error("input closed before a choice was made")]
    Eof,

    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}

/// Letter label for a 1-based row number.
pub fn letter(index: usize) -> String {
    let mut n = index;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'a' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// 1-based row number for a letter label (case-insensitive).
pub fn index_of(label: &str) -> Option<usize> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    label.chars().try_fold(0usize, |acc, c| {
        let c = c.to_ascii_lowercase();
        if !c.is_ascii_lowercase() {
            return None;
        }
        acc.checked_mul(26)?
            .checked_add((c as u8 - b'a') as usize + 1)
    })
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String, ChoiceError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(ChoiceError::Eof);
    }
    Ok(line.trim().to_string())
}

/// Prompt until the user picks one of `count` rows; returns the 0-based index.
///
/// An empty answer selects the first row.
pub fn choose<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    what: &str,
    count: usize,
) -> Result<usize, ChoiceError> {
    if count == 0 {
        return Err(ChoiceError::Empty(what.to_string()));
    }
    let first = letter(1);
    let last = letter(count);
    loop {
        write!(output, "\n    Enter a letter to select a {what} [{first}]: ")?;
        output.flush()?;
        let answer = read_answer(input)?;
        let picked = if answer.is_empty() {
            Some(1)
        } else {
            index_of(&answer)
        };
        match picked {
            Some(n) if (1..=count).contains(&n) => {
                writeln!(output, "    You selected choice {}", letter(n))?;
                return Ok(n - 1);
            }
            _ => writeln!(output, "    You must enter a letter between {first} and {last}")?,
        }
    }
}

/// Yes/no question; an empty answer takes `default`.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: bool,
) -> Result<bool, ChoiceError> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        write!(output, "\n    {question} {hint}: ")?;
        output.flush()?;
        let answer = read_answer(input)?.to_ascii_lowercase();
        match answer.as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "    Please answer yes or no")?,
        }
    }
}
