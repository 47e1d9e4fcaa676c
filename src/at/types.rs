use std::collections::HashMap;

use crate::error::{Error, Result};

/// How strictly a command's response is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Collect the response and require a terminal `OK` line.
    Normal,
    /// Fire and forget: the response is not read at all. Used when the
    /// module cannot be trusted to answer, e.g. right before a reset.
    NoParse,
    /// Collect the response but tolerate a missing `OK`. Used for commands
    /// that kick off a long asynchronous operation polled separately.
    Continuous,
}

/// Collected response of a single AT command.
#[derive(Debug, Default)]
pub struct AtResponse {
    /// Whether a terminal `OK` line was observed.
    pub ok_seen: bool,
    /// Parsed fields, keyed by normalized field name (see [`normalize_field`]).
    pub fields: HashMap<String, String>,
    /// Every line collected, kept for diagnostics.
    pub lines: Vec<String>,
}

impl AtResponse {
    pub fn is_success(&self) -> bool {
        self.ok_seen
    }

    /// Look up a parsed field by its on-wire name.
    ///
    /// A missing field after a successful command is a protocol violation,
    /// so absence is an error rather than an `Option`.
    pub fn field(&self, name: &str) -> Result<&str> {
        self.fields
            .get(&normalize_field(name))
            .map(String::as_str)
            .ok_or_else(|| Error::MissingField {
                field: name.to_string(),
            })
    }
}

/// Field keys are lowercased with non-alphanumerics removed, so `+CGMR`
/// becomes `cgmr` and `Model` becomes `model`.
pub fn normalize_field(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}
