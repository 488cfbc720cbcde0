//! Kinematic Tree Core
//!
//! This crate contains the data model and interchange formats for robot
//! kinematic trees:
//! - Element/Attribute: generic required/optional field model
//! - Robot/Link/Joint: the owned tree and its invariants
//! - URDF: structured XML serialization with schema migration
//! - Table: flat CSV rows that rebuild the same tree
//! - Project: versioned RON snapshot of the whole model
//!
//! Nothing in this crate is safe for concurrent mutation. A `Robot` is meant
//! to be edited by one session at a time; readers always build a fresh tree
//! and hand it back instead of mutating a live one.

pub mod constants;
pub mod element;
pub mod error;
pub mod interop;
pub mod migration;
pub mod project;
pub mod robot;
pub mod table;
pub mod urdf;

pub use constants::*;
pub use element::*;
pub use error::ErrorKind;
pub use migration::{SchemaVersionMismatch, migrate};
pub use project::*;
pub use robot::*;
pub use table::{TableError, TableRow};
pub use urdf::{SerializeError, SerializeOptions};
