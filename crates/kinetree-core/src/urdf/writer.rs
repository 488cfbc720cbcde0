//! URDF generation

use std::io::{Cursor, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use tracing::info;

use super::{
    COORDINATE_SYSTEM_ATTRIBUTE, REFERENCE_AXIS_ATTRIBUTE, STL_QUALITY_ATTRIBUTE, SerializeError,
    SerializeOptions,
};
use crate::constants::CURRENT_SCHEMA_VERSION;
use crate::element::{NumberFormat, UrdfElement};
use crate::robot::{Joint, Link, Robot, StlQuality, TreeError};

/// Render a robot as URDF
///
/// The tree is checked first (names, connectivity, joint sub-elements,
/// required fields); on any problem nothing is rendered and every problem
/// is reported.
pub fn to_urdf_string(robot: &Robot, options: &SerializeOptions) -> Result<String, SerializeError> {
    check(robot)?;

    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(Cursor::new(&mut buffer), b' ', options.indent);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;

    let mut start = BytesStart::new("robot");
    start.push_attribute(("name", robot.name()));
    start.push_attribute(("schema_version", CURRENT_SCHEMA_VERSION.to_string().as_str()));
    writer.write_event(Event::Start(start)).map_err(xml_error)?;

    write_link_recursive(&mut writer, robot.base_link(), &options.number_format)?;

    writer
        .write_event(Event::End(BytesEnd::new("robot")))
        .map_err(xml_error)?;

    String::from_utf8(buffer).map_err(|e| SerializeError::Xml(e.to_string()))
}

/// Structural problems and missing required fields, all in one error
fn check(robot: &Robot) -> Result<(), SerializeError> {
    let mut problems = Vec::new();
    if let Err(errors) = robot.validate_structure() {
        problems.push(SerializeError::Tree(TreeError::from_errors(errors)));
    }
    let missing = robot.validate();
    if !missing.is_empty() {
        problems.push(SerializeError::MissingRequiredFields(missing));
    }
    match problems.len() {
        0 => Ok(()),
        1 => Err(problems.remove(0)),
        _ => Err(SerializeError::Invalid(problems)),
    }
}

/// Render a robot and write it to `path`; the file is not touched when
/// rendering fails
pub fn write_urdf_file(
    robot: &Robot,
    path: impl AsRef<Path>,
    options: &SerializeOptions,
) -> Result<(), SerializeError> {
    let path = path.as_ref();
    let urdf = to_urdf_string(robot, options)?;
    std::fs::write(path, urdf).map_err(|e| SerializeError::Io(e.to_string()))?;
    info!("Wrote URDF for '{}' to {}", robot.name(), path.display());
    Ok(())
}

/// Link, then each child's joint followed by the child's subtree
fn write_link_recursive<W: Write>(
    writer: &mut Writer<W>,
    link: &Link,
    format: &NumberFormat,
) -> Result<(), SerializeError> {
    write_element_with(writer, link, format, &link_metadata(link))?;
    for child in link.children() {
        if let Some(joint) = child.joint() {
            write_element_with(writer, joint, format, &joint_metadata(joint))?;
        }
        write_link_recursive(writer, child, format)?;
    }
    Ok(())
}

/// Host metadata carried as extra `<link>` attributes; the default quality
/// is left implicit
fn link_metadata(link: &Link) -> Vec<(&'static str, String)> {
    match link.stl_quality() {
        StlQuality::Fine => Vec::new(),
        quality => vec![(STL_QUALITY_ATTRIBUTE, quality.as_str().to_string())],
    }
}

fn joint_metadata(joint: &Joint) -> Vec<(&'static str, String)> {
    let mut metadata = Vec::new();
    if let Some(name) = joint.coordinate_system() {
        metadata.push((COORDINATE_SYSTEM_ATTRIBUTE, name.to_string()));
    }
    if let Some(name) = joint.reference_axis() {
        metadata.push((REFERENCE_AXIS_ATTRIBUTE, name.to_string()));
    }
    metadata
}

/// Write an element if it is set; unset children are skipped
fn write_element<W: Write>(
    writer: &mut Writer<W>,
    element: &dyn UrdfElement,
    format: &NumberFormat,
) -> Result<(), SerializeError> {
    write_element_with(writer, element, format, &[])
}

fn write_element_with<W: Write>(
    writer: &mut Writer<W>,
    element: &dyn UrdfElement,
    format: &NumberFormat,
    extra: &[(&str, String)],
) -> Result<(), SerializeError> {
    if !element.is_set() {
        return Ok(());
    }

    let mut start = BytesStart::new(element.element_name());
    for attribute in element.attributes() {
        if let Some(text) = attribute.to_text(format) {
            start.push_attribute((attribute.name(), text.as_str()));
        }
    }
    for (key, value) in extra {
        start.push_attribute((*key, value.as_str()));
    }

    let children: Vec<&dyn UrdfElement> = element
        .children()
        .into_iter()
        .filter(|child| child.is_set())
        .collect();
    if children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(xml_error)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    for child in children {
        write_element(writer, child, format)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.element_name())))
        .map_err(xml_error)?;
    Ok(())
}

fn xml_error(e: impl std::fmt::Display) -> SerializeError {
    SerializeError::Xml(e.to_string())
}
