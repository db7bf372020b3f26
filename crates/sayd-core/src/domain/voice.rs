//! Voices advertised by output modules.

use serde::{Deserialize, Serialize};

/// One synthesis voice as reported by a module's `LIST_VOICES` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub language: String,
    /// Dialect or variant, `none` when the module does not report one.
    pub variant: String,
}

impl Voice {
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            variant: variant.into(),
        }
    }
}
