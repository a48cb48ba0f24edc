//! Interactive mode.
//!
//! One [`App`] lives for the whole session, so listings are answered from
//! the page caches until a mutation invalidates them. Each line is parsed
//! with the same subcommands as the one-shot CLI.

use clap::Parser;
use rustyline::{DefaultEditor, error::ReadlineError};
use thiserror::Error;

use crate::{
  Command,
  app::{App, Backend},
  execute,
};

const PROMPT: &str = "outreach> ";

/// A shell line is a subcommand without the binary name.
#[derive(Parser, Debug)]
#[command(name = "outreach", no_binary_name = true, disable_version_flag = true)]
struct Line {
  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unterminated {0} quote")]
pub struct UnclosedQuote(char);

/// Split a line into words. Single and double quotes group words; a
/// backslash outside single quotes escapes the next character.
pub fn split_words(line: &str) -> Result<Vec<String>, UnclosedQuote> {
  let mut words = Vec::new();
  let mut word = String::new();
  let mut in_word = false;
  let mut quote = None;
  let mut chars = line.chars();

  while let Some(c) = chars.next() {
    match (quote, c) {
      (Some(q), c) if c == q => quote = None,
      (Some('\''), c) => word.push(c),
      (_, '\\') => {
        if let Some(next) = chars.next() {
          word.push(next);
        }
        in_word = true;
      }
      (Some(_), c) => word.push(c),
      (None, '"' | '\'') => {
        quote = Some(c);
        in_word = true;
      }
      (None, c) if c.is_whitespace() => {
        if in_word {
          words.push(std::mem::take(&mut word));
          in_word = false;
        }
      }
      (None, c) => {
        word.push(c);
        in_word = true;
      }
    }
  }

  if let Some(q) = quote {
    return Err(UnclosedQuote(q));
  }
  if in_word {
    words.push(word);
  }
  Ok(words)
}

pub async fn run<B: Backend>(app: &App<B>) -> anyhow::Result<()> {
  let mut rl = DefaultEditor::new()?;
  println!("outreach shell; type `help` for commands, `quit` to leave.");

  loop {
    let line = match rl.readline(PROMPT) {
      Ok(line) => line,
      Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
      Err(e) => return Err(e.into()),
    };
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }
    if matches!(trimmed, "quit" | "exit") {
      break;
    }
    let _ = rl.add_history_entry(trimmed);

    let words = match split_words(trimmed) {
      Ok(words) => words,
      Err(e) => {
        eprintln!("error: {e}");
        continue;
      }
    };
    let command = match Line::try_parse_from(words) {
      Ok(Line { command: Command::Shell }) => {
        eprintln!("error: already in the shell");
        continue;
      }
      Ok(Line { command }) => command,
      Err(e) => {
        // Also covers `help`, which clap reports as an "error".
        let _ = e.print();
        continue;
      }
    };

    if let Err(e) = execute(app, command).await {
      eprintln!("error: {e:#}");
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn words_split_on_whitespace_and_respect_quotes() {
    assert_eq!(split_words("  leads --search startup ").unwrap(), ["leads", "--search", "startup"]);
    assert_eq!(
      split_words(r#"campaign-create "Spring push" --status active"#).unwrap(),
      ["campaign-create", "Spring push", "--status", "active"]
    );
    assert!(split_words(r"lead-update 3 --company 'O\'Neil'").is_err());
    assert_eq!(split_words(r#"lead-update 3 --company "O'Neil & Co""#).unwrap()[3], "O'Neil & Co");
    assert_eq!(split_words(r"a\ b").unwrap(), ["a b"]);
    assert_eq!(split_words(r#"--company """#).unwrap(), ["--company", ""]);
    assert!(split_words("").unwrap().is_empty());
  }

  #[test]
  fn unterminated_quote_is_reported() {
    assert_eq!(split_words(r#"campaign-create "Spring"#), Err(UnclosedQuote('"')));
  }

  #[test]
  fn lines_parse_as_subcommands() {
    let words = split_words("lead-status 42 responded").unwrap();
    let line = Line::try_parse_from(words).unwrap();
    assert!(matches!(line.command, Command::LeadStatus { id: 42, .. }));

    let words = split_words(r#"campaign-update 7 --name "Q2 push""#).unwrap();
    let Line { command: Command::CampaignUpdate { id, name, status } } =
      Line::try_parse_from(words).unwrap()
    else {
      panic!("wrong subcommand");
    };
    assert_eq!((id, name.as_deref(), status), (7, Some("Q2 push"), None));

    assert!(Line::try_parse_from(["bogus"]).is_err());
  }
}
