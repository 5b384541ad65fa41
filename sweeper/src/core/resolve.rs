//! Fixed-point `@name` reference substitution.
//!
//! Substitution is purely textual: a string value containing `@other` gets the
//! current string form of `other` spliced in, repeatedly, until nothing
//! changes. The loop is bounded by an iteration budget; exhausting it is the
//! only cycle detection, so a legitimate chain longer than the budget fails
//! the same way a real cycle does.

use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::core::directive::parse_key;
use crate::core::value::{Config, Value};

/// Default number of queue pops allowed per configuration.
pub const DEFAULT_REFERENCE_BUDGET: usize = 100;

/// Resolution ran out of budget with keys still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unconverged {
    /// Keys still queued when the budget ran out, deduplicated in queue order.
    pub keys: Vec<String>,
    pub budget: usize,
}

/// `(token, key)` pairs ordered longest token first.
///
/// When two keys share a token the first key in configuration order wins.
pub fn reference_tokens(config: &Config) -> Vec<(String, String)> {
    let mut index: IndexMap<String, String> = IndexMap::new();
    for key in config.keys() {
        if let Some(token) = parse_key(key).reference_token() {
            index.entry(token).or_insert_with(|| key.clone());
        }
    }
    let mut tokens: Vec<(String, String)> = index.into_iter().collect();
    tokens.sort_by(|left, right| right.0.len().cmp(&left.0.len()));
    tokens
}

/// Substitute every known token in `text` with its referenced value.
fn substitute(text: &str, tokens: &[(String, String)], config: &Config) -> String {
    let mut out = text.to_string();
    for (token, key) in tokens {
        if !out.contains(token.as_str()) {
            continue;
        }
        if let Some(value) = config.get(key) {
            out = out.replace(token.as_str(), &value.reference_string());
        }
    }
    out
}

/// Resolve references in `config` within `budget` queue pops.
pub fn resolve_references(config: &Config, budget: usize) -> Result<Config, Unconverged> {
    let tokens = reference_tokens(config);
    let mut resolved = config.clone();
    let mut queue: VecDeque<String> = resolved.keys().cloned().collect();
    let mut remaining = budget;

    while remaining > 0 {
        let Some(key) = queue.pop_front() else {
            break;
        };
        remaining -= 1;
        let changed = match resolved.get(&key) {
            Some(Value::String(current)) => {
                let next = substitute(current, &tokens, &resolved);
                (next != *current).then_some(next)
            }
            _ => None,
        };
        if let Some(next) = changed {
            resolved.insert(key.clone(), Value::String(next));
            queue.push_back(key);
        }
    }

    if queue.is_empty() {
        return Ok(resolved);
    }
    let mut keys: Vec<String> = Vec::new();
    for key in queue {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    Err(Unconverged { keys, budget })
}
