//! Flat-table (CSV) interchange
//!
//! Export writes one row per link, depth first. Every row is a sparse map
//! from canonical keys (see [`columns`]) to text; the header always lists
//! every canonical column and missing fields become empty cells.
//!
//! Import reads the rows back and rebuilds the tree with the same assembler
//! the URDF reader uses: a row without a parent link is the root, every other
//! row must name a parent that exists somewhere in the input.

pub mod columns;

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use self::columns::{
    COLUMNS, Column, KEY_COORDINATE_SYSTEM, KEY_JOINT_TYPE, KEY_NAME, KEY_REFERENCE_AXIS,
    KEY_STL_QUALITY, by_header, by_key, component_label,
};
use crate::element::{
    Attribute, AttributeKind, NumberFormat, ParseError, UrdfElement, join_path,
};
use crate::error::ErrorKind;
use crate::robot::{Joint, Link, Robot, StlQuality, TreeError, assemble};

/// One link, flattened: canonical key -> cell text
pub type TableRow = BTreeMap<String, String>;

const LINK_PREFIX: &str = "link";
const JOINT_PREFIX: &str = "link.joint";

/// Flat-table errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("Row {row} has no link name")]
    MissingLinkName { row: usize },
}

impl TableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::Csv(_) | TableError::Parse(_) => ErrorKind::Parse,
            TableError::Io(_) => ErrorKind::Io,
            TableError::Tree(e) => e.kind(),
            TableError::MissingLinkName { .. } => ErrorKind::MissingRequiredField,
        }
    }

    pub fn offending_names(&self) -> Vec<String> {
        match self {
            TableError::Parse(e) => vec![e.attribute.clone()],
            TableError::Tree(e) => e.offending_names(),
            TableError::MissingLinkName { row } => vec![format!("row[{}].{}", row, KEY_NAME)],
            TableError::Csv(_) | TableError::Io(_) => Vec::new(),
        }
    }
}

// ============== Export ==============

/// Flatten a robot into rows, one per link in depth-first order
pub fn export_rows(robot: &Robot, format: &NumberFormat) -> Vec<TableRow> {
    robot
        .links_depth_first()
        .into_iter()
        .map(|link| link_to_row(link, format))
        .collect()
}

/// Flatten a single link (its payload and the joint to its parent)
pub fn link_to_row(link: &Link, format: &NumberFormat) -> TableRow {
    let mut row = TableRow::new();
    flatten_element(link, LINK_PREFIX, format, &mut row);

    if let Some(joint) = link.joint() {
        flatten_element(joint, JOINT_PREFIX, format, &mut row);
        if let Some(name) = joint.coordinate_system() {
            row.insert(KEY_COORDINATE_SYSTEM.to_string(), name.to_string());
        }
        if let Some(name) = joint.reference_axis() {
            row.insert(KEY_REFERENCE_AXIS.to_string(), name.to_string());
        }
    }
    row.insert(
        KEY_STL_QUALITY.to_string(),
        link.stl_quality().as_str().to_string(),
    );
    row
}

fn flatten_element(
    element: &dyn UrdfElement,
    prefix: &str,
    format: &NumberFormat,
    row: &mut TableRow,
) {
    for attribute in element.attributes() {
        let key = join_path(prefix, attribute.name());
        match attribute.kind() {
            AttributeKind::NumberArray(arity) => {
                for index in 0..arity {
                    if let Some(text) = attribute.component_text(index, format) {
                        let label = component_label(attribute.name(), index);
                        row.insert(join_path(&key, &label), text);
                    }
                }
            }
            AttributeKind::Text | AttributeKind::Number => {
                if let Some(text) = attribute.to_text(format) {
                    row.insert(key, text);
                }
            }
        }
    }
    for child in element.children() {
        // The child reference is the row's own link name
        if child.element_name() == "child" {
            continue;
        }
        flatten_element(child, &join_path(prefix, child.element_name()), format, row);
    }
}

/// Write rows as CSV with the canonical header
///
/// Keys outside the canonical columns are dropped; every dropped key is
/// named in a single warning.
pub fn write_rows<W: Write>(rows: &[TableRow], writer: W) -> Result<(), TableError> {
    let dropped: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys())
        .filter(|key| by_key(key).is_none())
        .map(|key| key.as_str())
        .collect();
    if !dropped.is_empty() {
        warn!(
            "Dropping {} column(s) not in the table format: {}",
            dropped.len(),
            dropped.into_iter().collect::<Vec<_>>().join(", ")
        );
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(COLUMNS.iter().map(|c| c.header))
        .map_err(csv_error)?;
    for row in rows {
        csv_writer
            .write_record(
                COLUMNS
                    .iter()
                    .map(|c| row.get(c.key).map(String::as_str).unwrap_or("")),
            )
            .map_err(csv_error)?;
    }
    csv_writer
        .flush()
        .map_err(|e| TableError::Io(e.to_string()))?;
    Ok(())
}

/// Render a robot as CSV text
pub fn to_csv_string(robot: &Robot, format: &NumberFormat) -> Result<String, TableError> {
    let mut buffer = Vec::new();
    write_rows(&export_rows(robot, format), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| TableError::Csv(e.to_string()))
}

pub fn write_csv_file(
    robot: &Robot,
    path: impl AsRef<Path>,
    format: &NumberFormat,
) -> Result<(), TableError> {
    let path = path.as_ref();
    let csv = to_csv_string(robot, format)?;
    std::fs::write(path, csv).map_err(|e| TableError::Io(e.to_string()))?;
    info!(
        "Wrote {} rows for '{}' to {}",
        robot.link_count(),
        robot.name(),
        path.display()
    );
    Ok(())
}

// ============== Import ==============

/// Read CSV into sparse rows keyed by canonical key
///
/// Headers may be the column titles or the canonical keys. Unknown headers
/// are ignored with a warning; blank cells do not become entries.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<TableRow>, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(csv_error)?.clone();
    let columns: Vec<Option<&Column>> = headers.iter().map(by_header).collect();
    let unknown: Vec<&str> = headers
        .iter()
        .zip(&columns)
        .filter(|(header, column)| column.is_none() && !header.is_empty())
        .map(|(header, _)| header)
        .collect();
    if !unknown.is_empty() {
        warn!("Ignoring unknown column(s): {}", unknown.join(", "));
    }

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(csv_error)?;
        let row: TableRow = record
            .iter()
            .zip(&columns)
            .filter_map(|(cell, column)| column.map(|c| (c.key, cell.trim())))
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(key, cell)| (key.to_string(), cell.to_string()))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }
    debug!("Read {} rows", rows.len());
    Ok(rows)
}

/// Rebuild a robot from rows
pub fn import_rows(robot_name: &str, rows: &[TableRow]) -> Result<Robot, TableError> {
    let records = rows
        .iter()
        .enumerate()
        .map(|(index, row)| link_from_row(row, index + 1))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(assemble(robot_name, records)?)
}

pub fn from_csv_str(robot_name: &str, text: &str) -> Result<Robot, TableError> {
    import_rows(robot_name, &read_rows(text.as_bytes())?)
}

pub fn read_csv_file(robot_name: &str, path: impl AsRef<Path>) -> Result<Robot, TableError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| TableError::Io(e.to_string()))?;
    let robot = import_rows(robot_name, &read_rows(file)?)?;
    info!(
        "Read {} links for '{}' from {}",
        robot.link_count(),
        robot.name(),
        path.display()
    );
    Ok(robot)
}

/// Build an unattached link record from one row; `row` is 1-based
pub fn link_from_row(row: &TableRow, index: usize) -> Result<Link, TableError> {
    let Some(name) = row.get(KEY_NAME) else {
        return Err(TableError::MissingLinkName { row: index });
    };
    let mut link = Link::fixed_frame(name.as_str());

    let joint_prefix = format!("{}.", JOINT_PREFIX);
    if row.keys().any(|key| key.starts_with(&joint_prefix)) {
        let mut joint = Joint::default();
        // Type first, it decides which sub-elements are accepted
        if let Some(text) = row.get(KEY_JOINT_TYPE) {
            joint.set_type_from_text(text)?;
        }
        joint.set_coordinate_system(row.get(KEY_COORDINATE_SYSTEM).cloned());
        joint.set_reference_axis(row.get(KEY_REFERENCE_AXIS).cloned());
        link.set_joint(joint);
    }
    if let Some(text) = row.get(KEY_STL_QUALITY) {
        let quality = StlQuality::parse(text)
            .ok_or_else(|| ParseError::new("stl_quality", text.as_str(), "expected fine or coarse"))?;
        link.set_stl_quality(quality);
    }

    // Components of one array are applied together
    let mut components: BTreeMap<&str, Vec<(usize, &str)>> = BTreeMap::new();
    for (key, text) in row {
        let Some(column) = by_key(key) else {
            warn!("Row {}: ignoring unknown key '{}'", index, key);
            continue;
        };
        match column.key {
            KEY_NAME | KEY_JOINT_TYPE | KEY_STL_QUALITY | KEY_COORDINATE_SYSTEM
            | KEY_REFERENCE_AXIS => continue,
            _ => {}
        }
        match column.component {
            Some(component) => components
                .entry(column.attribute_key())
                .or_default()
                .push((component, text.as_str())),
            None => {
                if let Some(attribute) = attribute_slot(&mut link, column.key, index) {
                    attribute.set_from_text(text)?;
                }
            }
        }
    }
    for (attribute_key, parts) in components {
        if let Some(attribute) = attribute_slot(&mut link, attribute_key, index) {
            attribute.set_components_from_text(&parts)?;
        }
    }
    Ok(link)
}

/// Walk `link.<tag>...<attribute>` down from the link, creating optional
/// elements on the way. `None` when the joint type forbids an element.
fn attribute_slot<'a>(
    link: &'a mut Link,
    key: &str,
    row: usize,
) -> Option<&'a mut Attribute> {
    let path = key.strip_prefix("link.")?;
    let (tags, attribute) = match path.rsplit_once('.') {
        Some((tags, attribute)) => (tags.split('.').collect::<Vec<_>>(), attribute),
        None => (Vec::new(), path),
    };

    let mut element: &mut dyn UrdfElement = link;
    for tag in &tags {
        match element.child_slot_mut(tag) {
            Some(child) => element = child,
            None => {
                warn!("Row {}: dropping '{}', element '{}' not allowed here", row, key, tag);
                return None;
            }
        }
    }
    element.attribute_mut(attribute)
}

fn csv_error(e: csv::Error) -> TableError {
    TableError::Csv(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::{Calibration, Dynamics, JointType, Limit, Origin, SafetyController};

    fn arm() -> Robot {
        let mut base = Link::new("base_link");
        base.set_mesh_filename("meshes/base_link.STL");
        if let Some(inertial) = &mut base.inertial {
            inertial.mass.set_value(2.5);
            inertial.inertia.set_values([0.01, 0.0, 0.0, 0.02, 0.0, 0.03]);
        }
        let mut robot = Robot::new("arm", base);

        let mut joint = Joint::new("shoulder", JointType::Revolute)
            .with_origin(Origin::new([0.0, 0.0, 0.1], [0.0, 0.0, 1.5708]));
        joint.set_axis([0.0, 0.0, 1.0]).unwrap();
        joint.set_limit(Limit::new(-3.1416, 3.1416, 10.0, 2.0)).unwrap();
        joint.set_calibration(Calibration::new(0.5, -0.5)).unwrap();
        joint.set_dynamics(Dynamics::new(0.1, 0.01)).unwrap();
        joint
            .set_safety_controller(SafetyController::new(-3.0, 3.0, 15.0, 10.0))
            .unwrap();
        joint.set_coordinate_system(Some("Coordinate System1".to_string()));
        joint.set_reference_axis(Some("Axis1".to_string()));
        let mut upper = Link::new("upper_arm").with_joint(joint);
        upper.set_mesh_filename("meshes/upper_arm.STL");
        upper.set_stl_quality(StlQuality::Coarse);
        if let Some(visual) = &mut upper.visual {
            visual.material.set_name("blue");
            visual.material.color.set_rgba([0.0, 0.0, 1.0, 1.0]);
            visual.material.texture.set_filename("textures/steel.png");
        }
        robot.add_child("base_link", upper).unwrap();
        robot.add_child("upper_arm", Link::fixed_frame("tool0")).unwrap();
        robot
    }

    fn chain_csv(rows: &[(&str, &str)]) -> String {
        let mut text = String::from("Link Name,Parent Link\n");
        for (name, parent) in rows {
            text.push_str(&format!("{},{}\n", name, parent));
        }
        text
    }

    #[test]
    fn test_round_trip_reproduces_tree() {
        let robot = arm();
        let csv = to_csv_string(&robot, &NumberFormat::default()).unwrap();
        let parsed = from_csv_str("arm", &csv).unwrap();
        assert_eq!(parsed, robot);
    }

    #[test]
    fn test_export_rows_depth_first() {
        let rows = export_rows(&arm(), &NumberFormat::default());
        let names: Vec<&str> = rows.iter().map(|r| r[KEY_NAME].as_str()).collect();
        assert_eq!(names, vec!["base_link", "upper_arm", "tool0"]);

        assert!(!rows[0].contains_key(columns::KEY_PARENT_LINK));
        assert_eq!(rows[1][columns::KEY_PARENT_LINK], "base_link");
        assert_eq!(rows[1]["link.joint.origin.rpy.yaw"], "1.5708");
        assert_eq!(rows[1]["link.joint.limit.lower"], "-3.1416");
        // Fixed joint has no limit fields at all
        assert!(!rows[2].contains_key("link.joint.limit.lower"));
        assert!(!rows[2].contains_key("link.visual.origin.xyz.x"));
    }

    #[test]
    fn test_header_lists_every_column() {
        let csv = to_csv_string(&arm(), &NumberFormat::default()).unwrap();
        let mut lines = csv.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        let expected: Vec<&str> = COLUMNS.iter().map(|c| c.header).collect();
        assert_eq!(header, expected);

        // Every data line is padded to the full width
        for line in lines {
            let record = csv::ReaderBuilder::new()
                .has_headers(false)
                .from_reader(line.as_bytes())
                .records()
                .next()
                .unwrap()
                .unwrap();
            assert_eq!(record.len(), COLUMNS.len());
        }
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let mut rows = export_rows(&arm(), &NumberFormat::default());
        rows[0].insert("link.favourite_color".to_string(), "teal".to_string());

        let mut buffer = Vec::new();
        write_rows(&rows, &mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();
        assert!(!csv.contains("teal"));
        assert_eq!(from_csv_str("arm", &csv).unwrap(), arm());
    }

    #[test]
    fn test_three_row_chain() {
        let csv = chain_csv(&[("base_link", ""), ("link1", "base_link"), ("link2", "link1")]);
        let robot = from_csv_str("chain", &csv).unwrap();

        assert_eq!(robot.link_count(), 3);
        assert_eq!(robot.parent_chain("link2"), vec!["link1", "base_link"]);
        let joint = robot.find_by_name("link2").unwrap().joint().unwrap();
        assert_eq!(joint.name(), "link2_joint");
        assert_eq!(joint.joint_type(), JointType::Fixed);
    }

    #[test]
    fn test_rows_in_any_order() {
        let csv = chain_csv(&[("link2", "link1"), ("link1", "base_link"), ("base_link", "")]);
        let robot = from_csv_str("chain", &csv).unwrap();
        assert_eq!(robot.base_link().name(), "base_link");
        assert_eq!(robot.parent_chain("link2"), vec!["link1", "base_link"]);
    }

    #[test]
    fn test_no_root() {
        let csv = chain_csv(&[("link1", "link2"), ("link2", "link1")]);
        let err = from_csv_str("bot", &csv).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoRootFound);
    }

    #[test]
    fn test_multiple_roots_named() {
        let csv = chain_csv(&[("base_link", ""), ("other", ""), ("link1", "base_link")]);
        let err = from_csv_str("bot", &csv).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MultipleRootsFound);
        assert_eq!(err.offending_names(), vec!["base_link", "other"]);
    }

    #[test]
    fn test_orphan_reference_named() {
        let csv = chain_csv(&[("base_link", ""), ("link1", "base_link"), ("link2", "ghost")]);
        let err = from_csv_str("bot", &csv).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OrphanReference);
        assert_eq!(err.offending_names(), vec!["link2"]);
    }

    #[test]
    fn test_parent_cycle_is_unreachable() {
        let csv = chain_csv(&[("base_link", ""), ("a", "b"), ("b", "a")]);
        let err = from_csv_str("bot", &csv).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CycleDetected);
        assert_eq!(err.offending_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_row_names() {
        let csv = chain_csv(&[("base_link", ""), ("a", "base_link"), ("a", "base_link")]);
        let err = from_csv_str("bot", &csv).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
    }

    #[test]
    fn test_missing_link_name() {
        let csv = "Link Name,Parent Link,Joint Type\nbase_link,,\n,base_link,fixed\n";
        let err = from_csv_str("bot", csv).unwrap_err();
        assert_eq!(err, TableError::MissingLinkName { row: 2 });
    }

    #[test]
    fn test_bad_number_is_parse_error() {
        let csv = "Link Name,Parent Link,Joint Origin X\nbase_link,,\nlink1,base_link,abc\n";
        let err = from_csv_str("bot", csv).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.offending_names(), vec!["xyz"]);
    }

    #[test]
    fn test_forbidden_elements_are_dropped() {
        let csv = "Link Name,Parent Link,Joint Type,Limit Lower,Joint Axis Z\n\
                   base_link,,,,\n\
                   link1,base_link,fixed,-1,1\n";
        let robot = from_csv_str("bot", csv).unwrap();
        let joint = robot.find_joint("link1_joint").unwrap();
        assert!(joint.limit().is_none());
        assert!(joint.axis().xyz().is_none());
    }

    #[test]
    fn test_keys_accepted_as_headers_and_unknown_headers_ignored() {
        let csv = "link.name,link.joint.parent.link,Notes\nbase_link,,root\nlink1,base_link,\n";
        let robot = from_csv_str("bot", csv).unwrap();
        assert!(robot.contains_link("link1"));
    }

    #[test]
    fn test_partial_array_components() {
        let csv = "Link Name,Parent Link,Joint Origin Z\nbase_link,,\nlink1,base_link,0.25\n";
        let robot = from_csv_str("bot", csv).unwrap();
        let joint = robot.find_joint("link1_joint").unwrap();
        assert_eq!(joint.origin.xyz(), [0.0, 0.0, 0.25]);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arm.csv");
        write_csv_file(&arm(), &path, &NumberFormat::default()).unwrap();
        assert_eq!(read_csv_file("arm", &path).unwrap(), arm());

        let err = read_csv_file("arm", dir.path().join("missing.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
