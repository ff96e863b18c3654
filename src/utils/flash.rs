use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};

use crate::core::FlashMessages;

/// Request-scoped flash-message store.
///
/// Messages are bucketed by kind (`info`, `error`, ...) and drained by
/// [`FlashMessages::get_messages`], so each message is shown once.
#[derive(Debug, Default)]
pub struct FlashStore {
    messages: BTreeMap<String, Vec<String>>,
}

impl FlashStore {
    pub fn push(&mut self, kind: impl Into<String>, message: impl Into<String>) {
        self.messages
            .entry(kind.into())
            .or_default()
            .push(message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push("info", message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push("error", message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl FlashMessages for FlashStore {
    fn get_messages(&mut self) -> JsonValue {
        json!(std::mem::take(&mut self.messages))
    }
}
