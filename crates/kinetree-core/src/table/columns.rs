//! Canonical flat-table columns
//!
//! Keys are dot paths from the link: element tags, then the attribute name,
//! then a component label for number arrays (`link.joint.origin.xyz.x`).
//! Headers are what the CSV shows.

/// One column of the flat table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub header: &'static str,
    /// Index into the number array named by the key minus its last segment
    pub component: Option<usize>,
}

const fn col(key: &'static str, header: &'static str) -> Column {
    Column {
        key,
        header,
        component: None,
    }
}

const fn comp(key: &'static str, header: &'static str, index: usize) -> Column {
    Column {
        key,
        header,
        component: Some(index),
    }
}

pub const KEY_NAME: &str = "link.name";
pub const KEY_PARENT_LINK: &str = "link.joint.parent.link";
pub const KEY_JOINT_NAME: &str = "link.joint.name";
pub const KEY_JOINT_TYPE: &str = "link.joint.type";
pub const KEY_STL_QUALITY: &str = "link.stl_quality";
pub const KEY_COORDINATE_SYSTEM: &str = "link.joint.coordinate_system";
pub const KEY_REFERENCE_AXIS: &str = "link.joint.reference_axis";

/// Every column, in the order written to the header
pub const COLUMNS: &[Column] = &[
    col(KEY_NAME, "Link Name"),
    col(KEY_PARENT_LINK, "Parent Link"),
    col(KEY_JOINT_NAME, "Joint Name"),
    col(KEY_JOINT_TYPE, "Joint Type"),
    comp("link.joint.origin.xyz.x", "Joint Origin X", 0),
    comp("link.joint.origin.xyz.y", "Joint Origin Y", 1),
    comp("link.joint.origin.xyz.z", "Joint Origin Z", 2),
    comp("link.joint.origin.rpy.roll", "Joint Origin Roll", 0),
    comp("link.joint.origin.rpy.pitch", "Joint Origin Pitch", 1),
    comp("link.joint.origin.rpy.yaw", "Joint Origin Yaw", 2),
    comp("link.joint.axis.xyz.x", "Joint Axis X", 0),
    comp("link.joint.axis.xyz.y", "Joint Axis Y", 1),
    comp("link.joint.axis.xyz.z", "Joint Axis Z", 2),
    col("link.joint.limit.lower", "Limit Lower"),
    col("link.joint.limit.upper", "Limit Upper"),
    col("link.joint.limit.effort", "Limit Effort"),
    col("link.joint.limit.velocity", "Limit Velocity"),
    col("link.joint.calibration.rising", "Calibration Rising"),
    col("link.joint.calibration.falling", "Calibration Falling"),
    col("link.joint.dynamics.damping", "Dynamics Damping"),
    col("link.joint.dynamics.friction", "Dynamics Friction"),
    col(
        "link.joint.safety_controller.soft_lower_limit",
        "Safety Soft Lower Limit",
    ),
    col(
        "link.joint.safety_controller.soft_upper_limit",
        "Safety Soft Upper Limit",
    ),
    col("link.joint.safety_controller.k_position", "Safety K Position"),
    col("link.joint.safety_controller.k_velocity", "Safety K Velocity"),
    comp("link.visual.origin.xyz.x", "Visual Origin X", 0),
    comp("link.visual.origin.xyz.y", "Visual Origin Y", 1),
    comp("link.visual.origin.xyz.z", "Visual Origin Z", 2),
    comp("link.visual.origin.rpy.roll", "Visual Origin Roll", 0),
    comp("link.visual.origin.rpy.pitch", "Visual Origin Pitch", 1),
    comp("link.visual.origin.rpy.yaw", "Visual Origin Yaw", 2),
    col("link.visual.geometry.mesh.filename", "Visual Mesh Filename"),
    comp("link.inertial.origin.xyz.x", "Inertial Origin X", 0),
    comp("link.inertial.origin.xyz.y", "Inertial Origin Y", 1),
    comp("link.inertial.origin.xyz.z", "Inertial Origin Z", 2),
    comp("link.inertial.origin.rpy.roll", "Inertial Origin Roll", 0),
    comp("link.inertial.origin.rpy.pitch", "Inertial Origin Pitch", 1),
    comp("link.inertial.origin.rpy.yaw", "Inertial Origin Yaw", 2),
    col("link.inertial.mass.value", "Mass"),
    col("link.inertial.inertia.ixx", "Inertia Ixx"),
    col("link.inertial.inertia.ixy", "Inertia Ixy"),
    col("link.inertial.inertia.ixz", "Inertia Ixz"),
    col("link.inertial.inertia.iyy", "Inertia Iyy"),
    col("link.inertial.inertia.iyz", "Inertia Iyz"),
    col("link.inertial.inertia.izz", "Inertia Izz"),
    col("link.visual.material.name", "Material Name"),
    comp("link.visual.material.color.rgba.r", "Color Red", 0),
    comp("link.visual.material.color.rgba.g", "Color Green", 1),
    comp("link.visual.material.color.rgba.b", "Color Blue", 2),
    comp("link.visual.material.color.rgba.a", "Color Alpha", 3),
    col("link.visual.material.texture.filename", "Texture Filename"),
    comp("link.collision.origin.xyz.x", "Collision Origin X", 0),
    comp("link.collision.origin.xyz.y", "Collision Origin Y", 1),
    comp("link.collision.origin.xyz.z", "Collision Origin Z", 2),
    comp("link.collision.origin.rpy.roll", "Collision Origin Roll", 0),
    comp("link.collision.origin.rpy.pitch", "Collision Origin Pitch", 1),
    comp("link.collision.origin.rpy.yaw", "Collision Origin Yaw", 2),
    col("link.collision.geometry.mesh.filename", "Collision Mesh Filename"),
    col(KEY_STL_QUALITY, "STL Quality"),
    col(KEY_COORDINATE_SYSTEM, "Coordinate System"),
    col(KEY_REFERENCE_AXIS, "Reference Axis"),
];

pub fn by_key(key: &str) -> Option<&'static Column> {
    COLUMNS.iter().find(|c| c.key == key)
}

/// Resolve a CSV header; the canonical key is accepted as well
pub fn by_header(header: &str) -> Option<&'static Column> {
    let header = header.trim();
    COLUMNS
        .iter()
        .find(|c| c.header.eq_ignore_ascii_case(header) || c.key == header)
}

/// Label of a number-array component in flat keys
pub fn component_label(attribute: &str, index: usize) -> String {
    let labels: &[&str] = match attribute {
        "xyz" => &["x", "y", "z"],
        "rpy" => &["roll", "pitch", "yaw"],
        "rgba" => &["r", "g", "b", "a"],
        _ => &[],
    };
    labels
        .get(index)
        .map(|l| l.to_string())
        .unwrap_or_else(|| index.to_string())
}

impl Column {
    /// Key of the attribute this column writes to
    pub fn attribute_key(&self) -> &'static str {
        match self.component {
            Some(_) => self
                .key
                .rsplit_once('.')
                .map(|(attribute, _)| attribute)
                .unwrap_or(self.key),
            None => self.key,
        }
    }
}
