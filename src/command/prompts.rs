// src/command/prompts.rs

//! Prompt answers and their translation into CLI fragments.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::PromptSpec;
use crate::context::value_to_string;
use crate::errors::{EngineError, Result};
use crate::types::PromptKind;

/// Answers keyed by prompt name, shared by `&mut` through an operation chain
/// so later prompts can read earlier answers via `condition`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptAnswers {
    values: Map<String, Value>,
}

impl PromptAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Only an explicit boolean `true` counts.
    pub fn is_true(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(Value::Bool(true)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Pass one: give every unanswered prompt its declared default so that
/// `condition` checks further down have something to read.
pub fn seed_defaults(prompts: &[PromptSpec], answers: &mut PromptAnswers) {
    for prompt in prompts {
        if answers.contains(&prompt.name) {
            continue;
        }
        if let Some(default) = &prompt.default {
            answers.set(prompt.name.clone(), default.clone());
        }
    }
}

/// Pass two: CLI fragments for every prompt, in declaration order.
///
/// A prompt whose condition is false contributes nothing and has its answer
/// reset to the empty value for its kind. A condition naming neither an
/// earlier prompt nor an existing answer is rejected before anything is
/// emitted or written.
pub fn prompt_arguments(prompts: &[PromptSpec], answers: &mut PromptAnswers) -> Result<Vec<String>> {
    check_condition_references(prompts, answers)?;

    let mut argv = Vec::new();
    for prompt in prompts {
        if let Some(condition) = &prompt.condition {
            if !answers.is_true(condition) {
                debug!(prompt = %prompt.name, %condition, "condition false; prompt skipped");
                answers.set(prompt.name.clone(), prompt.empty_value());
                continue;
            }
        }

        match prompt.kind {
            PromptKind::Confirm => {
                if answers.is_true(&prompt.name) {
                    if let Some(flag) = &prompt.cli_flag {
                        argv.push(flag.clone());
                    }
                }
            }
            PromptKind::Checkbox => {
                let selected = selected_items(answers.get(&prompt.name));
                if !selected.is_empty() {
                    if let Some(prefix) = prompt.cli_prefix.as_ref().or(prompt.cli_flag.as_ref()) {
                        argv.push(prefix.clone());
                    }
                    argv.extend(selected);
                }
            }
            PromptKind::Text => {
                let text = answers
                    .get(&prompt.name)
                    .map(value_to_string)
                    .unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() {
                    if let Some(flag) = prompt.cli_flag.as_ref().or(prompt.cli_prefix.as_ref()) {
                        argv.push(flag.clone());
                    }
                    argv.push(text.to_string());
                }
            }
        }
    }
    Ok(argv)
}

fn check_condition_references(prompts: &[PromptSpec], answers: &PromptAnswers) -> Result<()> {
    let mut declared: HashSet<&str> = HashSet::new();
    for prompt in prompts {
        if let Some(condition) = prompt.condition.as_deref() {
            if !declared.contains(condition) && !answers.contains(condition) {
                return Err(EngineError::InvalidInput(format!(
                    "prompt '{}' is conditional on '{}', which is not an earlier prompt or a known answer",
                    prompt.name, condition
                )));
            }
        }
        declared.insert(prompt.name.as_str());
    }
    Ok(())
}

fn selected_items(answer: Option<&Value>) -> Vec<String> {
    match answer {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(value_to_string)
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Interpret a raw `name=value` answer from the command line according to
/// the prompt kind it targets.
pub fn coerce_answer(kind: PromptKind, raw: &str) -> Value {
    let raw = raw.trim();
    match kind {
        PromptKind::Confirm => Value::Bool(matches!(
            raw.to_lowercase().as_str(),
            "1" | "y" | "yes" | "true" | "on"
        )),
        PromptKind::Checkbox => Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        PromptKind::Text => Value::String(raw.to_string()),
    }
}
