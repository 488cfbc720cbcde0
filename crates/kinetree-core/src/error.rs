//! Error classification shared by every module
//!
//! Each module has its own error enum. Hosts that only need to branch on the
//! category of a failure use [`ErrorKind`] instead of matching every variant.

use std::fmt;

/// Category of a failure, independent of which module produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed numeric or text value
    Parse,
    /// One or more required fields have no value
    MissingRequiredField,
    /// A link or joint name is used more than once
    DuplicateName,
    /// The operation would make (or found) a cycle
    CycleDetected,
    /// A named link or joint does not exist
    NotFound,
    /// No link without a parent
    NoRootFound,
    /// More than one link without a parent
    MultipleRootsFound,
    /// A parent reference points at a link that does not exist
    OrphanReference,
    /// The document declares a schema this crate cannot read
    SchemaVersionMismatch,
    /// The base link cannot be removed or moved
    BaseLink,
    /// A joint carries a sub-element its type forbids
    JointElementNotAllowed,
    /// Reading or writing the underlying file failed
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Parse => "parse error",
            ErrorKind::MissingRequiredField => "missing required field",
            ErrorKind::DuplicateName => "duplicate name",
            ErrorKind::CycleDetected => "cycle detected",
            ErrorKind::NotFound => "not found",
            ErrorKind::NoRootFound => "no root found",
            ErrorKind::MultipleRootsFound => "multiple roots found",
            ErrorKind::OrphanReference => "orphan reference",
            ErrorKind::SchemaVersionMismatch => "schema version mismatch",
            ErrorKind::BaseLink => "base link",
            ErrorKind::JointElementNotAllowed => "joint element not allowed",
            ErrorKind::Io => "io error",
        };
        f.write_str(s)
    }
}
