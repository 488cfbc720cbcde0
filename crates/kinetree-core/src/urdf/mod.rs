//! URDF (XML) serialization
//!
//! Writing walks the tree depth first: each link, then for every child its
//! joint followed by the child's subtree. Reading parses the whole document,
//! assembles a new tree and migrates it to the current schema before
//! returning it.

mod options;
mod reader;
mod writer;

pub use options::SerializeOptions;
pub use reader::{from_urdf_str, read_urdf_file};
pub use writer::{to_urdf_string, write_urdf_file};

use crate::element::{MissingRequiredField, ParseError};
use crate::error::ErrorKind;
use crate::migration::SchemaVersionMismatch;
use crate::robot::TreeError;

/// URDF serialization errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SerializeError {
    #[error("Missing required fields: {}", join_paths(.0))]
    MissingRequiredFields(Vec<MissingRequiredField>),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("XML error: {0}")]
    Xml(String),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    SchemaVersion(#[from] SchemaVersionMismatch),
    #[error("IO error: {0}")]
    Io(String),
    #[error("{}", display_all(.0))]
    Invalid(Vec<SerializeError>),
}

/// `<link>` attribute carrying the STL export quality
pub(crate) const STL_QUALITY_ATTRIBUTE: &str = "stl_quality";
/// `<joint>` attributes naming host reference geometry
pub(crate) const COORDINATE_SYSTEM_ATTRIBUTE: &str = "coordinate_system";
pub(crate) const REFERENCE_AXIS_ATTRIBUTE: &str = "reference_axis";

fn display_all(errors: &[SerializeError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_paths(missing: &[MissingRequiredField]) -> String {
    missing
        .iter()
        .map(|m| m.path.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl SerializeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SerializeError::MissingRequiredFields(_) => ErrorKind::MissingRequiredField,
            SerializeError::Parse(_) | SerializeError::Xml(_) => ErrorKind::Parse,
            SerializeError::Tree(e) => e.kind(),
            SerializeError::SchemaVersion(e) => e.kind(),
            SerializeError::Io(_) => ErrorKind::Io,
            SerializeError::Invalid(errors) => errors
                .first()
                .map(|e| e.kind())
                .unwrap_or(ErrorKind::MissingRequiredField),
        }
    }

    /// Names (or field paths) the error is about
    pub fn offending_names(&self) -> Vec<String> {
        match self {
            SerializeError::MissingRequiredFields(missing) => {
                missing.iter().map(|m| m.path.clone()).collect()
            }
            SerializeError::Parse(e) => vec![e.attribute.clone()],
            SerializeError::Tree(e) => e.offending_names(),
            SerializeError::Invalid(errors) => {
                errors.iter().flat_map(|e| e.offending_names()).collect()
            }
            SerializeError::Xml(_) | SerializeError::SchemaVersion(_) | SerializeError::Io(_) => {
                Vec::new()
            }
        }
    }
}
