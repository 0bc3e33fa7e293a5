//! Editor settings

use crate::errors::EditorResult;
use serde::{Deserialize, Serialize};

/// Settings read by the document model.
///
/// ```json
/// { "attributeWhitelist": ["xmlns:xsi"], "saveIndent": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Attributes allowed on any element without a schema declaration.
    /// They are never bound, validated or offered for removal.
    pub attribute_whitelist: Vec<String>,
    /// Spaces per nesting level when saving; zero writes a single line
    pub save_indent: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            attribute_whitelist: vec![
                "xmlns:xsi".to_string(),
                "xsi:noNamespaceSchemaLocation".to_string(),
            ],
            save_indent: 4,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(source: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn is_whitelisted(&self, attribute: &str) -> bool {
        self.attribute_whitelist.iter().any(|a| a == attribute)
    }
}
