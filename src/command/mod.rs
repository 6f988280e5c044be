// src/command/mod.rs

//! Command construction: resolves an operation template into an argv.
//!
//! - [`builder`] resolves `script`/`args` and assembles the final argv.
//! - [`prompts`] owns `PromptAnswers` and the two-pass prompt
//!   materialization (seed defaults, then emit CLI fragments).

pub mod builder;
pub mod prompts;

pub use builder::{ResolvedOperation, build, build_with_context, resolve_operation};
pub use prompts::{PromptAnswers, coerce_answer, prompt_arguments, seed_defaults};
