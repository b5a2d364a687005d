//! Answer source that replays predefined answers instead of asking a terminal.
//!
//! Answers are keyed by variable name and consumed in order, so a key can be
//! given several answers to exercise re-prompting after a failed validation.
//! A prompt without a queued answer takes its default.

use super::interface::*;
use crate::error::{Error, Result};
use crate::validation::parse_bool;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ScriptedAnswers {
    answers: RefCell<IndexMap<String, VecDeque<String>>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an answer for `key`. Choices are matched ignoring case and list
    /// answers are comma separated.
    pub fn with_answer(self, key: &str, answer: &str) -> Self {
        self.answers
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push_back(answer.to_string());
        self
    }

    /// Keys that were asked, in asking order. Re-asked keys repeat.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    fn next(&self, key: &str) -> Option<String> {
        self.asked.borrow_mut().push(key.to_string());
        self.answers.borrow_mut().get_mut(key).and_then(VecDeque::pop_front)
    }
}

fn choice_index(key: &str, choices: &[String], answer: &str) -> Result<usize> {
    choices
        .iter()
        .position(|choice| choice.eq_ignore_ascii_case(answer.trim()))
        .ok_or_else(|| {
            Error::Other(anyhow::anyhow!(
                "Scripted answer '{answer}' for '{key}' is not one of [{}]",
                choices.join(", ")
            ))
        })
}

impl TextPrompter for ScriptedAnswers {
    fn prompt_text(&self, config: &TextPromptConfig) -> Result<String> {
        Ok(self.next(&config.key).or_else(|| config.default.clone()).unwrap_or_default())
    }
}

impl SingleChoicePrompter for ScriptedAnswers {
    fn prompt_single_choice(&self, config: &SingleChoiceConfig) -> Result<usize> {
        match self.next(&config.key) {
            Some(answer) => choice_index(&config.key, &config.choices, &answer),
            None => Ok(config.default_index.unwrap_or(0)),
        }
    }
}

impl MultipleChoicePrompter for ScriptedAnswers {
    fn prompt_multiple_choice(&self, config: &MultipleChoiceConfig) -> Result<Vec<usize>> {
        match self.next(&config.key) {
            Some(answer) => answer
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| choice_index(&config.key, &config.choices, item))
                .collect(),
            None => Ok(config
                .defaults
                .iter()
                .enumerate()
                .filter_map(|(index, selected)| selected.then_some(index))
                .collect()),
        }
    }
}

impl ConfirmationPrompter for ScriptedAnswers {
    fn prompt_confirmation(&self, config: &ConfirmationConfig) -> Result<bool> {
        match self.next(&config.key) {
            Some(answer) => parse_bool(&answer).ok_or_else(|| {
                Error::Other(anyhow::anyhow!(
                    "Scripted answer '{answer}' for '{}' is not a yes/no answer",
                    config.key
                ))
            }),
            None => Ok(config.default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(key: &str) -> SingleChoiceConfig {
        SingleChoiceConfig {
            key: key.to_string(),
            prompt: "Database".to_string(),
            choices: vec!["none".into(), "postgres".into(), "mysql".into()],
            default_index: Some(0),
        }
    }

    #[test]
    fn answers_are_consumed_in_order() {
        let answers = ScriptedAnswers::new().with_answer("name", "first").with_answer("name", "second");
        let config =
            TextPromptConfig { key: "name".into(), prompt: "Name".into(), default: Some("dflt".into()) };
        assert_eq!(answers.prompt_text(&config).unwrap(), "first");
        assert_eq!(answers.prompt_text(&config).unwrap(), "second");
        assert_eq!(answers.prompt_text(&config).unwrap(), "dflt");
        assert_eq!(answers.asked(), vec!["name", "name", "name"]);
    }

    #[test]
    fn choices_match_ignoring_case() {
        let answers = ScriptedAnswers::new().with_answer("database", "Postgres");
        assert_eq!(answers.prompt_single_choice(&select("database")).unwrap(), 1);
        assert_eq!(answers.prompt_single_choice(&select("database")).unwrap(), 0);
    }

    #[test]
    fn unknown_choice_is_an_error() {
        let answers = ScriptedAnswers::new().with_answer("database", "oracle");
        assert!(answers.prompt_single_choice(&select("database")).is_err());
    }

    #[test]
    fn multiple_choices_and_confirmations() {
        let answers =
            ScriptedAnswers::new().with_answer("drivers", "mysql, none").with_answer("docker", "yes");
        let multi = MultipleChoiceConfig {
            key: "drivers".into(),
            prompt: "Drivers".into(),
            choices: vec!["none".into(), "postgres".into(), "mysql".into()],
            defaults: vec![false, true, false],
        };
        assert_eq!(answers.prompt_multiple_choice(&multi).unwrap(), vec![2, 0]);
        assert_eq!(answers.prompt_multiple_choice(&multi).unwrap(), vec![1]);

        let confirm = ConfirmationConfig { key: "docker".into(), prompt: "Docker?".into(), default: false };
        assert!(answers.prompt_confirmation(&confirm).unwrap());
        assert!(!answers.prompt_confirmation(&confirm).unwrap());
    }
}
