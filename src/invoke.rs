//! Command invocation: argument tokenizing and handler execution.
//!
//! The raw argument text after the command name is split on whitespace, with
//! one quoting convention: text between matching `"` characters forms a single
//! token with the quotes stripped. No escapes, no nesting; an unterminated
//! quote runs to the end of the line.

use crate::error::DispatchError;
use crate::events::CommandOutcome;
use crate::registry::CommandDescriptor;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;

/// Executes resolved commands against their argument text.
pub struct CommandInvoker;

impl CommandInvoker {
    /// Invoke a resolved command with its raw argument text.
    ///
    /// Token count must match the descriptor's declared arity exactly. Handler
    /// failures (errors and panics alike) are captured as a failure outcome;
    /// they never propagate to the calling session.
    pub async fn invoke(descriptor: &CommandDescriptor, raw_args: &str) -> CommandOutcome {
        let tokens = tokenize(raw_args);
        if tokens.len() != descriptor.arity() {
            return CommandOutcome::Failure(DispatchError::ArgumentCount {
                name: descriptor.name().to_string(),
                expected: descriptor.arity(),
                actual: tokens.len(),
            });
        }

        let call = descriptor.handler().call(&tokens);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(value)) => CommandOutcome::Success(value),
            Ok(Err(err)) => CommandOutcome::Failure(DispatchError::HandlerExecution {
                name: descriptor.name().to_string(),
                message: err.to_string(),
            }),
            Err(panic) => CommandOutcome::Failure(DispatchError::HandlerExecution {
                name: descriptor.name().to_string(),
                message: panic_message(panic),
            }),
        }
    }
}

/// Split argument text into positional tokens.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                // A quote always delimits token content, even mid-token.
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
