//! Rebuild a tree from unordered link records
//!
//! Shared by every reader: URDF, flat table and urdf-rs interop all produce
//! one record per link, each carrying the joint to its parent (or no parent
//! for the root), and hand them here.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::{Link, Robot, TreeError};

/// Assemble `records` into a robot
///
/// Checks run before anything is attached: duplicate names (all of them), root
/// cardinality, then unresolved parent references. Records left over after
/// attachment only reference each other (a parent cycle) and are reported as
/// unreachable. The finished tree is checked once more as a whole.
pub(crate) fn assemble(robot_name: &str, records: Vec<Link>) -> Result<Robot, TreeError> {
    let mut seen = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for record in &records {
        let name = record.name();
        if !seen.insert(name) && !duplicates.contains(&name) {
            duplicates.push(name);
        }
    }
    if !duplicates.is_empty() {
        return Err(TreeError::from_errors(
            duplicates
                .into_iter()
                .map(|name| TreeError::DuplicateName(name.to_string()))
                .collect(),
        ));
    }

    let (mut roots, children): (Vec<Link>, Vec<Link>) =
        records.into_iter().partition(|record| parent_of(record).is_none());

    if roots.len() > 1 {
        return Err(TreeError::MultipleRootsFound(
            roots.iter().map(|r| r.name().to_string()).collect(),
        ));
    }
    let Some(mut root) = roots.pop() else {
        return Err(TreeError::NoRootFound);
    };

    let known: HashSet<&str> = children
        .iter()
        .map(|c| c.name())
        .chain(std::iter::once(root.name()))
        .collect();
    let orphans: Vec<String> = children
        .iter()
        .filter(|record| parent_of(record).is_some_and(|parent| !known.contains(parent)))
        .map(|record| record.name().to_string())
        .collect();
    if !orphans.is_empty() {
        return Err(TreeError::OrphanReference(orphans));
    }

    if let Some(joint) = root.take_joint() {
        debug!("Dropping joint '{}' of root link '{}'", joint.name(), root.name());
    }

    // Children grouped by parent name, kept in input order
    let mut by_parent: HashMap<String, Vec<Link>> = HashMap::new();
    let mut pending = children.len();
    for record in children {
        let parent = parent_of(&record).unwrap_or_default().to_string();
        by_parent.entry(parent).or_default().push(record);
    }

    attach(&mut root, &mut by_parent, &mut pending);

    if pending > 0 {
        let mut unreachable: Vec<String> = by_parent
            .into_values()
            .flatten()
            .map(|record| record.name().to_string())
            .collect();
        unreachable.sort();
        warn!("{} link(s) not reachable from '{}'", unreachable.len(), root.name());
        return Err(TreeError::Unreachable(unreachable));
    }

    let robot = Robot::new(robot_name, root);
    robot.validate_structure().map_err(TreeError::from_errors)?;
    debug!(
        "Assembled robot '{}' with {} links",
        robot.name(),
        robot.link_count()
    );
    Ok(robot)
}

fn parent_of(record: &Link) -> Option<&str> {
    record
        .joint()
        .and_then(|joint| joint.parent_link())
        .filter(|parent| !parent.is_empty())
}

fn attach(link: &mut Link, by_parent: &mut HashMap<String, Vec<Link>>, pending: &mut usize) {
    let Some(children) = by_parent.remove(link.name()) else {
        return;
    };
    for mut child in children {
        *pending -= 1;
        attach(&mut child, by_parent, pending);
        link.push_child(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::robot::{Joint, JointType};

    fn record(name: &str, parent: Option<&str>) -> Link {
        let mut link = Link::fixed_frame(name);
        if let Some(parent) = parent {
            let mut joint = Joint::fixed(format!("{}_joint", name));
            joint.bind(parent, name);
            link.set_joint(joint);
        }
        link
    }

    #[test]
    fn test_assemble_chain_in_any_order() {
        let robot = assemble(
            "chain",
            vec![
                record("link2", Some("link1")),
                record("base_link", None),
                record("link1", Some("base_link")),
            ],
        )
        .unwrap();

        assert_eq!(robot.base_link().name(), "base_link");
        assert_eq!(robot.parent_chain("link2"), vec!["link1", "base_link"]);
    }

    #[test]
    fn test_children_keep_input_order() {
        let robot = assemble(
            "r",
            vec![
                record("base", None),
                record("b", Some("base")),
                record("a", Some("base")),
                record("c", Some("base")),
            ],
        )
        .unwrap();
        let names: Vec<&str> = robot
            .base_link()
            .children()
            .iter()
            .map(|l| l.name())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_no_root() {
        let err = assemble(
            "r",
            vec![record("a", Some("b")), record("b", Some("a"))],
        )
        .unwrap_err();
        assert_eq!(err, TreeError::NoRootFound);
    }

    #[test]
    fn test_multiple_roots_lists_all() {
        let err = assemble(
            "r",
            vec![record("a", None), record("b", None), record("c", Some("a"))],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MultipleRootsFound);
        assert_eq!(err.offending_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_orphan_reference() {
        let err = assemble(
            "r",
            vec![
                record("base_link", None),
                record("link1", Some("base_link")),
                record("link2", Some("linkX")),
            ],
        )
        .unwrap_err();
        assert_eq!(err, TreeError::OrphanReference(vec!["link2".to_string()]));
    }

    #[test]
    fn test_parent_cycle_is_unreachable() {
        let err = assemble(
            "r",
            vec![
                record("base", None),
                record("a", Some("b")),
                record("b", Some("a")),
            ],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CycleDetected);
        assert_eq!(err.offending_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_record_names() {
        let err = assemble(
            "r",
            vec![record("base", None), record("a", Some("base")), record("a", Some("base"))],
        )
        .unwrap_err();
        assert_eq!(err, TreeError::DuplicateName("a".to_string()));
    }

    #[test]
    fn test_every_duplicate_name_reported() {
        let err = assemble(
            "r",
            vec![
                record("base", None),
                record("a", Some("base")),
                record("b", Some("base")),
                record("a", Some("base")),
                record("b", Some("a")),
                record("a", Some("b")),
            ],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert_eq!(err.offending_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_joint_names_fail_final_check() {
        let mut a = record("a", Some("base"));
        let mut b = record("b", Some("base"));
        a.joint_mut().unwrap().set_name("j");
        b.joint_mut().unwrap().set_name("j");
        let err = assemble("r", vec![record("base", None), a, b]).unwrap_err();
        assert_eq!(err, TreeError::DuplicateName("j".to_string()));
    }

    #[test]
    fn test_unnamed_joint_gets_default_name() {
        let mut child = Link::fixed_frame("tool");
        let mut joint = Joint::default();
        joint.set_type(JointType::Fixed);
        joint.bind("base", "tool");
        child.set_joint(joint);

        let robot = assemble("r", vec![record("base", None), child]).unwrap();
        assert!(robot.find_joint("tool_joint").is_some());
    }
}
