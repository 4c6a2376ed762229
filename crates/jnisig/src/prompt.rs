//! Terminal file prompt.

use jnisig_analysis::FilePrompt;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::path::PathBuf;

/// Asks for file paths on the terminal. An empty answer, Ctrl-C or Ctrl-D
/// cancels the prompt.
pub struct ReadlinePrompt {
    editor: Editor<(), DefaultHistory>,
}

impl ReadlinePrompt {
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .build();
        let editor = Editor::with_config(config)?;
        Ok(Self { editor })
    }
}

impl FilePrompt for ReadlinePrompt {
    fn choose_file(&mut self, description: &str, title: &str) -> Option<PathBuf> {
        eprintln!("{}", description);
        match self.editor.readline(&format!("{}> ", title)) {
            Ok(line) => parse_answer(&line),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
            Err(e) => {
                log::warn!("prompt failed: {}", e);
                None
            }
        }
    }
}

/// Interpret a typed answer: trims whitespace and surrounding quotes and
/// expands a leading `~/`.
fn parse_answer(line: &str) -> Option<PathBuf> {
    let answer = line.trim().trim_matches(|c| c == '"' || c == '\'');
    if answer.is_empty() {
        return None;
    }
    if let Some(rest) = answer.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return Some(PathBuf::from(home).join(rest));
        }
    }
    Some(PathBuf::from(answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("   "), None);
        assert_eq!(parse_answer(""), None);
        assert_eq!(
            parse_answer(" /tmp/jni.h \n"),
            Some(PathBuf::from("/tmp/jni.h"))
        );
        assert_eq!(
            parse_answer("'/tmp/sig nature.json'"),
            Some(PathBuf::from("/tmp/sig nature.json"))
        );
    }
}
