//! Kinematic tree: a robot owns its base link, links own their children

mod assemble;
mod joint;
mod link;
mod queries;
mod tree_cache;
mod types;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use joint::{Joint, JointType};
pub use link::{Link, StlQuality};
pub use types::{
    Axis, Calibration, Collision, Color, Dynamics, Geometry, Inertia, Inertial, Limit, LinkRef,
    Mass, Material, Mesh, Origin, SafetyController, Texture, Visual,
};

pub(crate) use assemble::assemble;

use crate::element::{Attribute, MissingRequiredField, UrdfElement, collect_missing, join_path};
use crate::error::ErrorKind;
use tree_cache::{LinkPath, TreeCache};

/// Robot description: a name and the tree rooted at the base link
///
/// Not safe for concurrent use: lookups rebuild the name index through a
/// `RefCell`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Robot {
    name: Attribute,
    base_link: Link,
    /// Name index, rebuilt lazily after any mutation
    #[serde(skip)]
    cache: RefCell<TreeCache>,
}

impl PartialEq for Robot {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.base_link == other.base_link
    }
}

impl Robot {
    /// Create a robot. The base link is the root, so any joint it carries is
    /// dropped; joints below it are bound to their actual parents.
    pub fn new(name: impl Into<String>, mut base_link: Link) -> Self {
        let mut robot_name = Attribute::text("name", true);
        robot_name.set_text(name);
        base_link.take_joint();
        base_link.bind_subtree();
        Self {
            name: robot_name,
            base_link,
            cache: RefCell::new(TreeCache::default()),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_text().unwrap_or("")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name.set_text(name);
    }

    pub fn base_link(&self) -> &Link {
        &self.base_link
    }

    /// Mutable access to the whole tree. Structural edits made through it
    /// bypass the checks of [`Robot::add_child`] and friends; run
    /// [`Robot::validate_structure`] afterwards.
    pub fn base_link_mut(&mut self) -> &mut Link {
        self.invalidate_cache();
        &mut self.base_link
    }

    /// Attach `child` (with its subtree) under `parent`
    ///
    /// The child's joint is created as a fixed `<child>_joint` when missing
    /// and bound to `parent`. Fails with `DuplicateName` if any link or joint
    /// name in the subtree is already used; the tree is unchanged on failure.
    pub fn add_child(&mut self, parent: &str, mut child: Link) -> Result<(), TreeError> {
        let parent_path = self
            .link_path(parent)
            .ok_or_else(|| TreeError::NotFound(parent.to_string()))?;
        child.bind_to(parent);
        child.bind_subtree();
        self.check_insertable(&child)?;

        let parent_link = self
            .link_at_mut(&parent_path)
            .ok_or_else(|| TreeError::NotFound(parent.to_string()))?;
        debug!("Attaching '{}' under '{}'", child.name(), parent);
        parent_link.children_vec_mut().push(child);
        self.invalidate_cache();
        Ok(())
    }

    /// Detach and return the subtree rooted at `name`, joints included
    pub fn remove_subtree(&mut self, name: &str) -> Result<Link, TreeError> {
        if name == self.base_link.name() {
            return Err(TreeError::BaseLink(name.to_string()));
        }
        let path = self
            .link_path(name)
            .ok_or_else(|| TreeError::NotFound(name.to_string()))?;
        let Some((&index, parent_path)) = path.split_last() else {
            return Err(TreeError::BaseLink(name.to_string()));
        };
        let parent = self
            .link_at_mut(parent_path)
            .ok_or_else(|| TreeError::NotFound(name.to_string()))?;
        let removed = parent.children_vec_mut().remove(index);
        self.invalidate_cache();
        debug!("Removed subtree '{}'", name);
        Ok(removed)
    }

    /// Move `node` (with its subtree) under `new_parent`
    ///
    /// Fails with `CycleDetected` if `new_parent` is `node` or one of its
    /// descendants. Either the whole move happens or nothing changes.
    pub fn reparent(&mut self, node: &str, new_parent: &str) -> Result<(), TreeError> {
        if node == self.base_link.name() {
            return Err(TreeError::BaseLink(node.to_string()));
        }
        let node_path = self
            .link_path(node)
            .ok_or_else(|| TreeError::NotFound(node.to_string()))?;
        let target_path = self
            .link_path(new_parent)
            .ok_or_else(|| TreeError::NotFound(new_parent.to_string()))?;
        if target_path.starts_with(&node_path) {
            return Err(TreeError::CycleDetected {
                node: node.to_string(),
                new_parent: new_parent.to_string(),
            });
        }
        let Some((&index, old_parent_path)) = node_path.split_last() else {
            return Err(TreeError::BaseLink(node.to_string()));
        };

        // Removing the node shifts its later siblings one slot left
        let mut target_path = target_path;
        let level = old_parent_path.len();
        if target_path.len() > level
            && target_path.starts_with(old_parent_path)
            && target_path[level] > index
        {
            target_path[level] -= 1;
        }

        let old_parent = self
            .link_at_mut(old_parent_path)
            .ok_or_else(|| TreeError::NotFound(node.to_string()))?;
        let old_parent_name = old_parent.name().to_string();
        let mut moved = old_parent.children_vec_mut().remove(index);
        self.invalidate_cache();

        moved.bind_to(new_parent);
        match self.link_at_mut(&target_path) {
            Some(parent) => {
                parent.children_vec_mut().push(moved);
                debug!("Moved '{}' under '{}'", node, new_parent);
                Ok(())
            }
            None => {
                moved.bind_to(&old_parent_name);
                if let Some(parent) = self.link_at_mut(old_parent_path) {
                    parent.children_vec_mut().insert(index, moved);
                }
                Err(TreeError::NotFound(new_parent.to_string()))
            }
        }
    }

    /// Rename a link, keeping joint references in sync
    pub fn rename_link(&mut self, old: &str, new: &str) -> Result<(), TreeError> {
        let path = self
            .link_path(old)
            .ok_or_else(|| TreeError::NotFound(old.to_string()))?;
        if old != new && self.link_path(new).is_some() {
            return Err(TreeError::DuplicateName(new.to_string()));
        }
        let link = self
            .link_at_mut(&path)
            .ok_or_else(|| TreeError::NotFound(old.to_string()))?;
        link.set_name(new);
        self.invalidate_cache();
        Ok(())
    }

    pub fn rename_joint(&mut self, old: &str, new: &str) -> Result<(), TreeError> {
        let path = self
            .joint_path(old)
            .ok_or_else(|| TreeError::NotFound(old.to_string()))?;
        if old != new && self.joint_path(new).is_some() {
            return Err(TreeError::DuplicateName(new.to_string()));
        }
        let joint = self
            .link_at_mut(&path)
            .and_then(|link| link.joint_mut())
            .ok_or_else(|| TreeError::NotFound(old.to_string()))?;
        joint.set_name(new);
        self.invalidate_cache();
        Ok(())
    }

    /// Mutable lookup. Renames done through the returned link bypass the
    /// uniqueness check; prefer [`Robot::rename_link`].
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Link> {
        let path = self.link_path(name)?;
        self.invalidate_cache();
        self.link_at_mut(&path)
    }

    pub fn find_joint_mut(&mut self, name: &str) -> Option<&mut Joint> {
        let path = self.joint_path(name)?;
        self.invalidate_cache();
        self.link_at_mut(&path).and_then(|link| link.joint_mut())
    }

    /// Every link or joint name used more than once
    pub fn check_names_unique(&self) -> Vec<TreeError> {
        let links = self.links_depth_first();
        let mut errors: Vec<TreeError> = duplicates(links.iter().map(|l| l.name()))
            .into_iter()
            .map(TreeError::DuplicateName)
            .collect();
        errors.extend(
            duplicates(links.iter().filter_map(|l| l.joint()).map(|j| j.name()))
                .into_iter()
                .map(TreeError::DuplicateName),
        );
        errors
    }

    /// Every link whose joint does not point from its actual parent to
    /// itself, and a base link that still carries a joint
    pub fn check_connectivity(&self) -> Vec<TreeError> {
        let mut errors = Vec::new();
        if self.base_link.joint().is_some() {
            errors.push(TreeError::OrphanReference(vec![
                self.base_link.name().to_string(),
            ]));
        }
        collect_connectivity(&self.base_link, &mut errors);
        errors
    }

    /// Joints carrying sub-elements their type forbids
    pub fn check_joint_elements(&self) -> Vec<TreeError> {
        self.joints_depth_first()
            .into_iter()
            .flat_map(|joint| {
                joint
                    .forbidden_elements()
                    .into_iter()
                    .map(move |element| TreeError::JointElementNotAllowed {
                        joint: joint.name().to_string(),
                        joint_type: joint.joint_type(),
                        element: element.to_string(),
                    })
            })
            .collect()
    }

    /// Run every structural check, reporting all violations
    pub fn validate_structure(&self) -> Result<(), Vec<TreeError>> {
        let mut errors = self.check_names_unique();
        errors.extend(self.check_connectivity());
        errors.extend(self.check_joint_elements());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Every required-but-unset field of every emitted element
    pub fn validate(&self) -> Vec<MissingRequiredField> {
        let prefix = format!("robot[{}]", self.name());
        let mut missing = Vec::new();
        if !self.name.is_set() {
            missing.push(MissingRequiredField {
                path: join_path(&prefix, "name"),
            });
        }
        for link in self.links_depth_first() {
            collect_missing(link, &prefix, &mut missing);
            if let Some(joint) = link.joint() {
                collect_missing(joint.as_dyn(), &prefix, &mut missing);
            }
        }
        missing
    }

    // ============== Name index ==============

    /// Invalidate the tree cache (call after any structural change)
    pub(crate) fn invalidate_cache(&self) {
        self.cache.borrow_mut().invalidate();
    }

    /// Ensure the cache is valid, rebuilding if necessary
    pub(crate) fn ensure_cache_valid(&self) {
        let mut cache = self.cache.borrow_mut();
        if !cache.valid {
            cache.rebuild(&self.base_link);
        }
    }

    pub(crate) fn link_path(&self, name: &str) -> Option<LinkPath> {
        self.ensure_cache_valid();
        self.cache.borrow().links.get(name).cloned()
    }

    pub(crate) fn joint_path(&self, name: &str) -> Option<LinkPath> {
        self.ensure_cache_valid();
        self.cache.borrow().joints.get(name).cloned()
    }

    pub(crate) fn link_at(&self, path: &[usize]) -> Option<&Link> {
        let mut link = &self.base_link;
        for &index in path {
            link = link.children().get(index)?;
        }
        Some(link)
    }

    fn link_at_mut(&mut self, path: &[usize]) -> Option<&mut Link> {
        let mut link = &mut self.base_link;
        for &index in path {
            link = link.children_vec_mut().get_mut(index)?;
        }
        Some(link)
    }

    fn check_insertable(&self, subtree: &Link) -> Result<(), TreeError> {
        self.ensure_cache_valid();
        let cache = self.cache.borrow();
        let mut links = HashSet::new();
        let mut joints = HashSet::new();
        for link in subtree.subtree() {
            let name = link.name();
            if cache.links.contains_key(name) || !links.insert(name) {
                return Err(TreeError::DuplicateName(name.to_string()));
            }
            if let Some(joint) = link.joint() {
                let name = joint.name();
                if cache.joints.contains_key(name) || !joints.insert(name) {
                    return Err(TreeError::DuplicateName(name.to_string()));
                }
            }
        }
        Ok(())
    }
}

fn collect_connectivity(link: &Link, errors: &mut Vec<TreeError>) {
    for child in link.children() {
        let bound = child.joint().is_some_and(|joint| {
            joint.parent_link() == Some(link.name()) && joint.child_link() == Some(child.name())
        });
        if !bound {
            errors.push(TreeError::OrphanReference(vec![child.name().to_string()]));
        }
        collect_connectivity(child, errors);
    }
}

/// Names occurring more than once, each listed once in first-seen order
fn duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for name in names {
        let count = counts.entry(name).or_insert(0);
        if *count == 0 {
            order.push(name);
        }
        *count += 1;
    }
    order
        .into_iter()
        .filter(|name| counts.get(name).is_some_and(|c| *c > 1))
        .map(str::to_string)
        .collect()
}

/// Tree-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
    #[error("Moving '{node}' under '{new_parent}' would create a cycle")]
    CycleDetected { node: String, new_parent: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("The base link '{0}' cannot be removed or moved")]
    BaseLink(String),
    #[error("Joint '{joint}' of type {joint_type} cannot have a <{element}> element")]
    JointElementNotAllowed {
        joint: String,
        joint_type: JointType,
        element: String,
    },
    #[error("No root link found")]
    NoRootFound,
    #[error("Multiple root links found: {}", .0.join(", "))]
    MultipleRootsFound(Vec<String>),
    #[error("Parent references do not resolve for: {}", .0.join(", "))]
    OrphanReference(Vec<String>),
    #[error("Links not reachable from the root: {}", .0.join(", "))]
    Unreachable(Vec<String>),
    #[error("{}", display_all(.0))]
    Invalid(Vec<TreeError>),
}

fn display_all(errors: &[TreeError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl TreeError {
    /// Collapse a list of problems into one error
    pub fn from_errors(mut errors: Vec<TreeError>) -> TreeError {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            TreeError::Invalid(errors)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeError::DuplicateName(_) => ErrorKind::DuplicateName,
            TreeError::CycleDetected { .. } | TreeError::Unreachable(_) => {
                ErrorKind::CycleDetected
            }
            TreeError::NotFound(_) => ErrorKind::NotFound,
            TreeError::BaseLink(_) => ErrorKind::BaseLink,
            TreeError::JointElementNotAllowed { .. } => ErrorKind::JointElementNotAllowed,
            TreeError::NoRootFound => ErrorKind::NoRootFound,
            TreeError::MultipleRootsFound(_) => ErrorKind::MultipleRootsFound,
            TreeError::OrphanReference(_) => ErrorKind::OrphanReference,
            TreeError::Invalid(errors) => errors
                .first()
                .map(|e| e.kind())
                .unwrap_or(ErrorKind::NotFound),
        }
    }

    /// Link or joint names the error is about
    pub fn offending_names(&self) -> Vec<String> {
        match self {
            TreeError::DuplicateName(name)
            | TreeError::NotFound(name)
            | TreeError::BaseLink(name) => vec![name.clone()],
            TreeError::CycleDetected { node, new_parent } => {
                vec![node.clone(), new_parent.clone()]
            }
            TreeError::JointElementNotAllowed { joint, .. } => vec![joint.clone()],
            TreeError::NoRootFound => Vec::new(),
            TreeError::MultipleRootsFound(names)
            | TreeError::OrphanReference(names)
            | TreeError::Unreachable(names) => names.clone(),
            TreeError::Invalid(errors) => errors.iter().flat_map(|e| e.offending_names()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// base_link -> link1 -> link2, base_link -> link3
    fn sample_robot() -> Robot {
        let mut robot = Robot::new("arm", Link::new("base_link"));
        robot.add_child("base_link", Link::new("link1")).unwrap();
        robot.add_child("link1", Link::new("link2")).unwrap();
        robot.add_child("base_link", Link::new("link3")).unwrap();
        robot
    }

    #[test]
    fn test_add_child_binds_default_joint() {
        let robot = sample_robot();
        let joint = robot.find_joint("link2_joint").unwrap();
        assert_eq!(joint.parent_link(), Some("link1"));
        assert_eq!(joint.child_link(), Some("link2"));
        assert_eq!(joint.joint_type(), JointType::Fixed);
        assert_eq!(robot.link_count(), 4);
        assert!(robot.validate_structure().is_ok());
    }

    #[test]
    fn test_add_child_rejects_duplicate_link_name() {
        let mut robot = sample_robot();
        let before = robot.clone();

        let err = robot.add_child("link3", Link::new("link1")).unwrap_err();
        assert_eq!(err, TreeError::DuplicateName("link1".to_string()));
        assert_eq!(robot, before);
    }

    #[test]
    fn test_add_child_rejects_duplicate_in_nested_subtree() {
        let mut robot = sample_robot();
        let subtree = Link::new("gripper").with_child(Link::new("link2"));
        let err = robot.add_child("link3", subtree).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert!(robot.find_by_name("gripper").is_none());
    }

    #[test]
    fn test_add_child_rejects_duplicate_joint_name() {
        let mut robot = sample_robot();
        let child = Link::new("link4").with_joint(Joint::fixed("link1_joint"));
        let err = robot.add_child("link3", child).unwrap_err();
        assert_eq!(err, TreeError::DuplicateName("link1_joint".to_string()));
    }

    #[test]
    fn test_add_child_unknown_parent() {
        let mut robot = sample_robot();
        let err = robot.add_child("nowhere", Link::new("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_remove_subtree_takes_descendants() {
        let mut robot = sample_robot();
        let removed = robot.remove_subtree("link1").unwrap();
        assert_eq!(removed.name(), "link1");
        assert_eq!(removed.children()[0].name(), "link2");
        assert!(robot.find_by_name("link2").is_none());
        assert!(robot.find_joint("link2_joint").is_none());
        assert_eq!(robot.link_count(), 2);
    }

    #[test]
    fn test_remove_base_link_fails() {
        let mut robot = sample_robot();
        let err = robot.remove_subtree("base_link").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BaseLink);
        assert_eq!(
            robot.remove_subtree("ghost").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_reparent_under_descendant_is_cycle() {
        let mut robot = sample_robot();
        let before = robot.clone();

        let err = robot.reparent("link1", "link2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CycleDetected);
        assert_eq!(err.offending_names(), vec!["link1", "link2"]);
        assert_eq!(robot, before);

        let err = robot.reparent("link1", "link1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CycleDetected);
    }

    #[test]
    fn test_reparent_moves_subtree_and_rebinds_joint() {
        let mut robot = sample_robot();
        robot.reparent("link1", "link3").unwrap();

        assert_eq!(robot.parent_of("link1").unwrap().name(), "link3");
        assert_eq!(
            robot.parent_chain("link2"),
            vec!["link1", "link3", "base_link"]
        );
        let joint = robot.find_joint("link1_joint").unwrap();
        assert_eq!(joint.parent_link(), Some("link3"));
        assert!(robot.validate_structure().is_ok());
    }

    #[test]
    fn test_reparent_to_later_sibling_subtree() {
        let mut robot = Robot::new("r", Link::new("base"));
        robot.add_child("base", Link::new("a")).unwrap();
        robot.add_child("base", Link::new("b")).unwrap();
        robot.add_child("b", Link::new("c")).unwrap();

        robot.reparent("a", "c").unwrap();
        assert_eq!(robot.parent_chain("a"), vec!["c", "b", "base"]);
        assert_eq!(robot.base_link().children().len(), 1);
    }

    #[test]
    fn test_rename_link_updates_joints() {
        let mut robot = sample_robot();
        robot.rename_link("link1", "upper_arm").unwrap();

        assert!(robot.find_by_name("link1").is_none());
        assert_eq!(
            robot.find_joint("link2_joint").unwrap().parent_link(),
            Some("upper_arm")
        );
        assert_eq!(
            robot.find_joint("link1_joint").unwrap().child_link(),
            Some("upper_arm")
        );
        assert!(robot.validate_structure().is_ok());

        let err = robot.rename_link("upper_arm", "link3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
    }

    #[test]
    fn test_rename_joint() {
        let mut robot = sample_robot();
        robot.rename_joint("link1_joint", "shoulder").unwrap();
        assert!(robot.find_joint("shoulder").is_some());
        assert!(robot.find_joint("link1_joint").is_none());
        assert_eq!(
            robot.rename_joint("shoulder", "link2_joint").unwrap_err(),
            TreeError::DuplicateName("link2_joint".to_string())
        );
    }

    #[test]
    fn test_check_names_unique_reports_every_duplicate() {
        let mut robot = sample_robot();
        robot.find_by_name_mut("link2").unwrap().set_name("link1");
        robot.find_by_name_mut("link3").unwrap().set_name("base_link");

        let errors = robot.check_names_unique();
        assert_eq!(
            errors,
            vec![
                TreeError::DuplicateName("base_link".to_string()),
                TreeError::DuplicateName("link1".to_string()),
            ]
        );
    }

    #[test]
    fn test_check_connectivity_reports_broken_joint() {
        let mut robot = sample_robot();
        robot
            .find_joint_mut("link2_joint")
            .unwrap()
            .set_parent_link("ghost");

        let errors = robot.check_connectivity();
        assert_eq!(
            errors,
            vec![TreeError::OrphanReference(vec!["link2".to_string()])]
        );
    }

    #[test]
    fn test_validate_reports_paths_under_robot() {
        let mut robot = Robot::new("arm", Link::fixed_frame("base_link"));
        let child = Link::fixed_frame("link1").with_joint(Joint::new("j1", JointType::Revolute));
        robot.add_child("base_link", child).unwrap();

        let missing: Vec<String> = robot.validate().into_iter().map(|m| m.path).collect();
        assert_eq!(
            missing,
            vec![
                "robot[arm].joint[j1].limit.lower",
                "robot[arm].joint[j1].limit.upper",
                "robot[arm].joint[j1].limit.effort",
                "robot[arm].joint[j1].limit.velocity",
            ]
        );
    }

    #[test]
    fn test_new_drops_base_joint() {
        let robot = Robot::new("r", Link::new("base").with_joint(Joint::fixed("stray")));
        assert!(robot.base_link().joint().is_none());
        assert!(robot.check_connectivity().is_empty());
    }

    #[test]
    fn test_invalid_error_collects_names() {
        let err = TreeError::from_errors(vec![
            TreeError::DuplicateName("a".into()),
            TreeError::OrphanReference(vec!["b".into()]),
        ]);
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert_eq!(err.offending_names(), vec!["a", "b"]);
        assert_eq!(
            err.to_string(),
            "Duplicate name: a; Parent references do not resolve for: b"
        );
    }
}
