//! Operator file prompts.

use std::collections::VecDeque;
use std::path::PathBuf;

/// Lets the operator choose a file. `None` means the operator cancelled.
pub trait FilePrompt {
    fn choose_file(&mut self, description: &str, title: &str) -> Option<PathBuf>;
}

/// Answers every prompt with "absent". Used for batch runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl FilePrompt for NoPrompt {
    fn choose_file(&mut self, description: &str, _title: &str) -> Option<PathBuf> {
        log::debug!("prompt skipped: {}", description);
        None
    }
}

/// Answers prompts from a queue, recording what was asked.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<Option<PathBuf>>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<PathBuf>>,
    {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Descriptions of the prompts shown so far.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl FilePrompt for ScriptedPrompt {
    fn choose_file(&mut self, description: &str, _title: &str) -> Option<PathBuf> {
        self.asked.push(description.to_string());
        self.answers.pop_front().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_prompt() {
        let mut prompt = ScriptedPrompt::new([Some(PathBuf::from("a.json")), None]);
        assert_eq!(prompt.choose_file("first", "File"), Some(PathBuf::from("a.json")));
        assert_eq!(prompt.choose_file("second", "File"), None);
        assert_eq!(prompt.choose_file("third", "File"), None);
        assert_eq!(prompt.asked(), ["first", "second", "third"]);
    }

    #[test]
    fn test_no_prompt() {
        assert_eq!(NoPrompt.choose_file("x", "File"), None);
    }
}
