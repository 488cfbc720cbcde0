//! Global constants for kinetree-core

/// Significant digits used when rendering numbers to text
pub const DEFAULT_SIGNIFICANT_DIGITS: usize = 5;

/// Default material color (white, RGBA)
pub const DEFAULT_COLOR: [f64; 4] = [1.0, 1.0, 1.0, 1.0];

/// Schema version written by this crate
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Version assumed for documents that do not declare one
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// Suffix appended to a link name for its auto-created joint
pub const DEFAULT_JOINT_SUFFIX: &str = "_joint";
