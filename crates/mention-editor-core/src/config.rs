//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::error::{MentionError, Result};
pub use crate::geometry::PopupBudget;
use crate::trigger::DEFAULT_TRIGGER;

/// Settings shared by every surface of one editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MentionConfig {
    /// Character that opens a mention query.
    pub trigger: char,
    /// Most candidates shown for one query.
    pub max_suggestions: usize,
    pub popup: PopupBudget,
    /// Minimum caret height in CSS pixels.
    pub caret_min_height: f64,
    /// Prefix for the id of the mirror element used to measure textareas.
    pub mirror_id_prefix: String,
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            trigger: DEFAULT_TRIGGER,
            max_suggestions: 5,
            popup: PopupBudget::default(),
            caret_min_height: 16.0,
            mirror_id_prefix: "mention-mirror".to_string(),
        }
    }
}

impl MentionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trigger.is_whitespace() {
            return Err(MentionError::Config("trigger must not be whitespace".into()));
        }
        if self.max_suggestions == 0 {
            return Err(MentionError::Config("max_suggestions must be at least 1".into()));
        }
        if !(self.caret_min_height.is_finite() && self.caret_min_height >= 0.0) {
            return Err(MentionError::Config(
                "caret_min_height must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}
