//! URDF parsing
//!
//! The document is parsed into a small element tree first, so a malformed
//! file fails before any robot data is built.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info, warn};

use super::{
    COORDINATE_SYSTEM_ATTRIBUTE, REFERENCE_AXIS_ATTRIBUTE, STL_QUALITY_ATTRIBUTE, SerializeError,
};
use crate::constants::{CURRENT_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION};
use crate::element::{MissingRequiredField, ParseError, UrdfElement};
use crate::migration::{SchemaVersionMismatch, migrate};
use crate::robot::{Joint, Link, Robot, StlQuality, TreeError, assemble};

/// Parsed XML element
#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Parse URDF text into a new robot
pub fn from_urdf_str(xml: &str) -> Result<Robot, SerializeError> {
    let root = parse_document(xml)?;
    if root.name != "robot" {
        return Err(SerializeError::Xml(format!(
            "expected <robot> as the root element, found <{}>",
            root.name
        )));
    }

    let version = match root.attr("schema_version") {
        Some(text) => text
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseError::new("schema_version", text, "expected an integer"))?,
        None => LEGACY_SCHEMA_VERSION,
    };
    if version > CURRENT_SCHEMA_VERSION {
        return Err(SerializeError::SchemaVersion(SchemaVersionMismatch {
            found: version,
            supported: CURRENT_SCHEMA_VERSION,
        }));
    }

    let robot_name = root.attr("name").ok_or_else(|| missing("robot.name"))?;

    let mut links = Vec::new();
    let mut joints = Vec::new();
    for node in &root.children {
        match node.name.as_str() {
            "link" => links.push(read_link(node)?),
            "joint" => joints.push(read_joint(node)?),
            other => warn!("Ignoring <{}> under <robot>", other),
        }
    }
    attach_joints(&mut links, joints)?;

    let mut robot = assemble(robot_name, links)?;
    migrate(&mut robot, version)?;
    debug!(
        "Parsed robot '{}' (schema version {}) with {} links",
        robot.name(),
        version,
        robot.link_count()
    );
    Ok(robot)
}

/// Read and parse a URDF file
pub fn read_urdf_file(path: impl AsRef<Path>) -> Result<Robot, SerializeError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|e| SerializeError::Io(e.to_string()))?;
    let robot = from_urdf_str(&xml)?;
    info!("Loaded URDF '{}' from {}", robot.name(), path.display());
    Ok(robot)
}

fn missing(path: &str) -> SerializeError {
    SerializeError::MissingRequiredFields(vec![MissingRequiredField {
        path: path.to_string(),
    }])
}

fn read_link(node: &XmlNode) -> Result<Link, SerializeError> {
    let name = node.attr("name").ok_or_else(|| missing("link.name"))?;
    let mut link = Link::fixed_frame(name);
    if let Some(text) = node.attr(STL_QUALITY_ATTRIBUTE) {
        let quality = StlQuality::parse(text).ok_or_else(|| {
            ParseError::new(STL_QUALITY_ATTRIBUTE, text, "expected fine or coarse")
        })?;
        link.set_stl_quality(quality);
    }
    for child in &node.children {
        // Joints are siblings of links in URDF, never nested
        let slot = match child.name.as_str() {
            "joint" => None,
            tag => link.child_slot_mut(tag),
        };
        match slot {
            Some(slot) => fill_element(slot, child)?,
            None => warn!("Ignoring <{}> in link '{}'", child.name, name),
        }
    }
    Ok(link)
}

fn read_joint(node: &XmlNode) -> Result<Joint, SerializeError> {
    let name = node.attr("name").ok_or_else(|| missing("joint.name"))?;
    let joint_type = node
        .attr("type")
        .ok_or_else(|| missing(&format!("joint[{}].type", name)))?;

    let mut joint = Joint::default();
    joint.set_name(name);
    joint.set_type_from_text(joint_type)?;
    joint.set_coordinate_system(node.attr(COORDINATE_SYSTEM_ATTRIBUTE).map(str::to_string));
    joint.set_reference_axis(node.attr(REFERENCE_AXIS_ATTRIBUTE).map(str::to_string));

    for child in &node.children {
        match joint.child_slot_mut(&child.name) {
            Some(slot) => fill_element(slot, child)?,
            None => warn!(
                "Dropping <{}> from {} joint '{}'",
                child.name, joint_type, name
            ),
        }
    }
    Ok(joint)
}

/// Copy attributes and children of `node` into `element`
fn fill_element(element: &mut dyn UrdfElement, node: &XmlNode) -> Result<(), SerializeError> {
    for (key, value) in &node.attributes {
        match element.attribute_mut(key) {
            Some(attribute) => attribute.set_from_text(value)?,
            None => warn!("Ignoring attribute '{}' on <{}>", key, node.name),
        }
    }
    for child in &node.children {
        match element.child_slot_mut(&child.name) {
            Some(slot) => fill_element(slot, child)?,
            None => warn!("Ignoring <{}> inside <{}>", child.name, node.name),
        }
    }
    Ok(())
}

/// Hand each joint to the link it names as child
///
/// Every joint is tried; unknown children and links claimed twice are
/// reported together.
fn attach_joints(links: &mut [Link], joints: Vec<Joint>) -> Result<(), SerializeError> {
    let index: HashMap<String, usize> = links
        .iter()
        .enumerate()
        .map(|(i, link)| (link.name().to_string(), i))
        .collect();

    let mut claimed_twice = Vec::new();
    let mut unknown_children = Vec::new();
    for joint in joints {
        let child = joint.child_link().unwrap_or_default().to_string();
        match index.get(&child) {
            None => unknown_children.push(joint.name().to_string()),
            Some(&i) if links[i].joint().is_some() => {
                if !claimed_twice.contains(&child) {
                    claimed_twice.push(child);
                }
            }
            Some(&i) => links[i].set_joint(joint),
        }
    }

    let mut errors: Vec<TreeError> = claimed_twice
        .into_iter()
        .map(TreeError::DuplicateName)
        .collect();
    if !unknown_children.is_empty() {
        errors.push(TreeError::OrphanReference(unknown_children));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TreeError::from_errors(errors).into())
    }
}

fn parse_document(xml: &str) -> Result<XmlNode, SerializeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(node_from(e)?),
            Ok(Event::Empty(ref e)) => {
                let node = node_from(e)?;
                close_node(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| SerializeError::Xml("unexpected closing tag".into()))?;
                close_node(&mut stack, &mut root, node)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(SerializeError::Xml(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(SerializeError::Xml("unexpected end of document".into()));
    }
    root.ok_or_else(|| SerializeError::Xml("document has no root element".into()))
}

fn close_node(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> Result<(), SerializeError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(SerializeError::Xml("more than one root element".into())),
    }
    Ok(())
}

fn node_from(e: &BytesStart) -> Result<XmlNode, SerializeError> {
    let mut node = XmlNode {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        ..XmlNode::default()
    };
    for attr in e.attributes() {
        let attr = attr.map_err(|e| SerializeError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| SerializeError::Xml(e.to_string()))?
            .into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}
