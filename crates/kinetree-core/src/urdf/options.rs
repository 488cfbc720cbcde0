//! Serialization options

use serde::{Deserialize, Serialize};

use crate::element::NumberFormat;

/// Options for writing URDF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializeOptions {
    /// How numbers are rendered
    pub number_format: NumberFormat,
    /// Spaces per nesting level
    pub indent: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            number_format: NumberFormat::default(),
            indent: 2,
        }
    }
}

impl SerializeOptions {
    pub fn with_significant_digits(mut self, digits: usize) -> Self {
        self.number_format = NumberFormat::new(digits);
        self
    }
}
