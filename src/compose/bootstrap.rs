//! Bootstrap Variable Injector
//!
//! Assembles the per-instance startup payload: an ordered list of key=value
//! variables followed by opaque script fragments, rendered as a single
//! Base64 user-data expression. Fragment text is copied verbatim and never
//! parsed. Duplicate variable keys are a caller error.

use std::collections::HashSet;

use crate::errors::{ComposeError, ComposeResult};
use crate::template::Value;

/// Ordered builder for one tier's bootstrap payload.
///
/// Consumed exactly once by the tier builder via
/// [`BootstrapBuilder::into_user_data`].
#[derive(Debug, Default)]
pub struct BootstrapBuilder {
    tier: String,
    lines: Vec<Value>,
    seen_keys: HashSet<String>,
}

impl BootstrapBuilder {
    /// Payload builder for the named tier (used in error reporting).
    pub fn for_tier(tier: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            lines: vec![Value::from("#!/bin/bash")],
            seen_keys: HashSet::new(),
        }
    }

    /// Append a `KEY=value` variable line. Ordering is significant and
    /// duplicate keys are rejected.
    pub fn var(mut self, key: impl Into<String>, value: impl Into<Value>) -> ComposeResult<Self> {
        let key = key.into();
        if !self.seen_keys.insert(key.clone()) {
            return Err(ComposeError::configuration(
                &self.tier,
                &key,
                "duplicate bootstrap variable key",
            ));
        }
        self.lines
            .push(Value::join("=", vec![Value::String(key), value.into()]));
        Ok(self)
    }

    /// Append an opaque script fragment, copied verbatim.
    pub fn fragment(mut self, fragment: impl Into<Value>) -> Self {
        self.lines.push(fragment.into());
        self
    }

    /// Append every line of an opaque script body as fragments.
    pub fn script(mut self, body: &str) -> Self {
        for line in body.lines() {
            self.lines.push(Value::from(line));
        }
        self
    }

    /// Render the payload, consuming the builder.
    pub fn into_user_data(self) -> Value {
        Value::base64(Value::join("\n", self.lines))
    }
}
