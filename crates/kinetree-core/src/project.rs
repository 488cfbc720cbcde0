//! Project file serialization
//!
//! A project is a RON snapshot of the whole model, `required` flags and host
//! metadata included, so it restores exactly what the editor had in memory.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{CURRENT_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION};
use crate::error::ErrorKind;
use crate::migration::{SchemaVersionMismatch, migrate};
use crate::robot::{Link, Robot, TreeError};

fn legacy_version() -> u32 {
    LEGACY_SCHEMA_VERSION
}

/// Project file containing the robot being edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Schema version the robot conforms to
    #[serde(default = "legacy_version")]
    pub version: u32,
    /// Project name
    pub name: String,
    pub robot: Robot,
}

impl Default for Project {
    fn default() -> Self {
        Self::new("New Project")
    }
}

impl Project {
    /// Create a project holding a robot with a bare base link
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            version: CURRENT_SCHEMA_VERSION,
            robot: Robot::new(name.clone(), Link::new("base_link")),
            name,
        }
    }

    pub fn with_robot(name: impl Into<String>, robot: Robot) -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            name: name.into(),
            robot,
        }
    }

    /// Save project to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        let content = self.to_bytes()?;
        std::fs::write(path, content).map_err(|e| ProjectError::Io(e.to_string()))?;
        info!("Saved project '{}' to {}", self.name, path.display());
        Ok(())
    }

    /// Serialize project to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProjectError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ProjectError::Serialize(e.to_string()))?;
        Ok(content.into_bytes())
    }

    /// Load project from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|e| ProjectError::Io(e.to_string()))?;
        let project = Self::load_from_bytes(&content)?;
        info!("Loaded project '{}' from {}", project.name, path.display());
        Ok(project)
    }

    /// Load project from bytes
    ///
    /// The robot is migrated to the current schema and its structure checked
    /// before the project is returned.
    pub fn load_from_bytes(data: &[u8]) -> Result<Self, ProjectError> {
        let content =
            std::str::from_utf8(data).map_err(|e| ProjectError::Deserialize(e.to_string()))?;
        let mut project: Project =
            ron::from_str(content).map_err(|e| ProjectError::Deserialize(e.to_string()))?;

        project.version = migrate(&mut project.robot, project.version)?;
        project
            .robot
            .validate_structure()
            .map_err(|errors| ProjectError::Tree(TreeError::from_errors(errors)))?;
        Ok(project)
    }
}

/// Project-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error(transparent)]
    SchemaVersion(#[from] SchemaVersionMismatch),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl ProjectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectError::Io(_) => ErrorKind::Io,
            ProjectError::Serialize(_) | ProjectError::Deserialize(_) => ErrorKind::Parse,
            ProjectError::SchemaVersion(e) => e.kind(),
            ProjectError::Tree(e) => e.kind(),
        }
    }

    pub fn offending_names(&self) -> Vec<String> {
        match self {
            ProjectError::Tree(e) => e.offending_names(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::UrdfElement;
    use crate::robot::{Joint, JointType, Limit, StlQuality};

    fn project() -> Project {
        let mut base = Link::new("base_link");
        base.set_stl_quality(StlQuality::Coarse);
        let mut robot = Robot::new("bot", base);
        let mut joint = Joint::new("hinge", JointType::Revolute);
        joint.set_limit(Limit::new(-1.0, 1.0, 5.0, 0.5)).unwrap();
        joint.set_coordinate_system(Some("Coordinate System1".to_string()));
        robot
            .add_child("base_link", Link::fixed_frame("arm").with_joint(joint))
            .unwrap();
        Project::with_robot("demo", robot)
    }

    #[test]
    fn test_bytes_round_trip() {
        let project = project();
        let bytes = project.to_bytes().unwrap();
        let loaded = Project::load_from_bytes(&bytes).unwrap();
        assert_eq!(loaded, project);
        assert_eq!(loaded.robot.parent_chain("arm"), vec!["base_link"]);
    }

    #[test]
    fn test_required_flags_survive() {
        let mut project = project();
        if let Some(visual) = &mut project.robot.base_link_mut().visual {
            visual.origin.set_required(true);
        }
        let loaded = Project::load_from_bytes(&project.to_bytes().unwrap()).unwrap();
        let visual = loaded.robot.base_link().visual.as_ref().unwrap();
        assert!(visual.origin.is_required());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.ron");
        let project = project();
        project.save(&path).unwrap();
        assert_eq!(Project::load(&path).unwrap(), project);

        let err = Project::load(dir.path().join("missing.ron")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_legacy_project_is_migrated() {
        let mut project = project();
        if let Some(visual) = &mut project.robot.base_link_mut().visual {
            visual.material.set_required(true);
            let name = visual.material.attribute_mut("name").unwrap();
            name.set_required(false);
            name.clear();
        }
        project.version = LEGACY_SCHEMA_VERSION;

        let loaded = Project::load_from_bytes(&project.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded.version, CURRENT_SCHEMA_VERSION);
        let material = &loaded.robot.base_link().visual.as_ref().unwrap().material;
        assert!(!material.is_required());
        assert_eq!(material.name(), Some(""));
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut project = project();
        project.version = CURRENT_SCHEMA_VERSION + 1;
        let err = Project::load_from_bytes(&project.to_bytes().unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaVersionMismatch);
    }

    #[test]
    fn test_broken_tree_rejected() {
        let mut project = project();
        project
            .robot
            .find_joint_mut("hinge")
            .unwrap()
            .set_parent_link("nowhere");
        let err = Project::load_from_bytes(&project.to_bytes().unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OrphanReference);
        assert_eq!(err.offending_names(), vec!["arm"]);
    }

    #[test]
    fn test_garbage_is_deserialize_error() {
        let err = Project::load_from_bytes(b"not ron at all (").unwrap_err();
        assert!(matches!(err, ProjectError::Deserialize(_)));
    }
}
