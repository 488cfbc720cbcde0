//! Schema migrations
//!
//! Documents declare the schema version they were written with. Readers
//! build the tree first and then run every step newer than the declared
//! version, in order. Steps only fill in or re-flag fields; they never drop
//! data, so running one twice changes nothing.

use tracing::info;

use crate::constants::CURRENT_SCHEMA_VERSION;
use crate::element::UrdfElement;
use crate::error::ErrorKind;
use crate::robot::{Link, Robot};

/// The document was written by a newer schema than this crate supports
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Schema version {found} is newer than the supported version {supported}")]
pub struct SchemaVersionMismatch {
    pub found: u32,
    pub supported: u32,
}

impl SchemaVersionMismatch {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::SchemaVersionMismatch
    }
}

type Step = fn(&mut Link);

/// (version the step upgrades to, step)
const STEPS: &[(u32, Step)] = &[(2, material_name_required as Step)];

/// Upgrade `robot` from `declared` to the current schema version
///
/// Returns the version the robot now conforms to.
pub fn migrate(robot: &mut Robot, declared: u32) -> Result<u32, SchemaVersionMismatch> {
    if declared > CURRENT_SCHEMA_VERSION {
        return Err(SchemaVersionMismatch {
            found: declared,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    for (target, step) in STEPS.iter().filter(|(target, _)| *target > declared) {
        info!("Migrating '{}' to schema version {}", robot.name(), target);
        robot.base_link_mut().visit_mut(&mut |link| step(link));
    }
    Ok(CURRENT_SCHEMA_VERSION)
}

/// Version 2: a material is optional, but once present it must be named.
/// Materials written without a name get an empty one.
fn material_name_required(link: &mut Link) {
    let Some(visual) = &mut link.visual else {
        return;
    };
    let material = &mut visual.material;
    material.set_required(false);
    if let Some(name) = material.attribute_mut("name") {
        name.set_required(true);
        if !name.is_set() {
            name.set_text("");
        }
    }
}
