// src/exec/responder.rs

//! Answering `prompt` events from a child.

use std::collections::VecDeque;

use tracing::warn;

use crate::types::BoxFuture;

/// Produces the single line written back to a child's stdin when it asks
/// for input. The host races this against cancellation.
pub trait PromptResponder: Send {
    fn respond<'a>(&'a mut self, message: &'a str) -> BoxFuture<'a, String>;
}

/// Wraps a synchronous closure.
pub struct FnResponder<F>(pub F);

impl<F> PromptResponder for FnResponder<F>
where
    F: FnMut(&str) -> String + Send,
{
    fn respond<'a>(&'a mut self, message: &'a str) -> BoxFuture<'a, String> {
        let answer = (self.0)(message);
        Box::pin(async move { answer })
    }
}

/// Replays a fixed list of answers, then falls back to an empty line.
///
/// Used for non-interactive runs.
#[derive(Debug, Clone, Default)]
pub struct QueuedResponder {
    answers: VecDeque<String>,
}

impl QueuedResponder {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl PromptResponder for QueuedResponder {
    fn respond<'a>(&'a mut self, message: &'a str) -> BoxFuture<'a, String> {
        let answer = self.answers.pop_front().unwrap_or_else(|| {
            warn!(prompt = %message, "no queued answer left; replying with an empty line");
            String::new()
        });
        Box::pin(async move { answer })
    }
}
