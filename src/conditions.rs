//! # Conditions-Database Expression Record
//!
//! Run-boundary refresh of expression lists. The conditions database exposes
//! a record mapping string keys to composite string values; each composite
//! decomposes on `;` into the individual expression strings. A composite
//! whose sole element is the [`CONFIG_ERROR`] sentinel means "no mapping for
//! this key" and must never replace a statically configured expression list.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::event::EventSetup;

/// Sentinel composite element signalling a missing mapping.
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";

const EXPRESSION_DELIMITER: char = ';';

/// The string-keyed expression record as stored in the conditions database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerBitsRecord {
    record: HashMap<String, String>,
}

impl TriggerBitsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the composite value for `key`, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, composite: impl Into<String>) {
        self.record.insert(key.into(), composite.into());
    }

    pub fn with_entry(mut self, key: impl Into<String>, composite: impl Into<String>) -> Self {
        self.insert(key, composite);
        self
    }

    /// Splits the composite value for `key` into its expression strings.
    /// Empty segments are dropped; `None` if the key has no entry.
    pub fn decompose(&self, key: &str) -> Option<Vec<String>> {
        let composite = self.record.get(key)?;
        Some(
            composite
                .split(EXPRESSION_DELIMITER)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

/// Fetches the candidate expression list for `key` from the conditions
/// record in `setup`. Returns `None` on any miss (no record, no key, empty
/// decomposition, or the [`CONFIG_ERROR`] sentinel), in which case the
/// caller keeps its current expression list.
pub fn expressions_from_db(key: &str, setup: &EventSetup) -> Option<Vec<String>> {
    let Some(record) = setup.trigger_bits() else {
        error!(key, "no trigger-bits record available in the event setup");
        return None;
    };
    let Some(expressions) = record.decompose(key) else {
        error!(key, "no entry in the trigger-bits record");
        return None;
    };
    if expressions.is_empty() {
        error!(key, "trigger-bits entry decomposed to an empty list");
        return None;
    }
    if expressions[0] == CONFIG_ERROR {
        error!(key, "trigger-bits entry carries the config-error sentinel");
        return None;
    }
    Some(expressions)
}
