//! Value elements shared by links and joints

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_COLOR;
use crate::element::{Attribute, AttributeValue, impl_element};

fn array<const N: usize>(attribute: &Attribute) -> Option<[f64; N]> {
    attribute.as_array().and_then(|values| values.try_into().ok())
}

fn zeros(name: &str, arity: usize) -> Attribute {
    Attribute::number_array(name, arity, true)
        .with_value(AttributeValue::NumberArray(vec![0.0; arity]))
}

/// Pose (position and orientation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    required: bool,
    xyz: Attribute,
    /// roll, pitch, yaw in radians
    rpy: Attribute,
}

impl_element!(Origin, "origin", [xyz, rpy], []);

impl Default for Origin {
    fn default() -> Self {
        Self {
            required: false,
            xyz: zeros("xyz", 3),
            rpy: zeros("rpy", 3),
        }
    }
}

impl Origin {
    pub fn new(xyz: [f64; 3], rpy: [f64; 3]) -> Self {
        let mut origin = Self::default();
        origin.set_xyz(xyz);
        origin.set_rpy(rpy);
        origin
    }

    pub fn xyz(&self) -> [f64; 3] {
        array(&self.xyz).unwrap_or([0.0; 3])
    }

    pub fn rpy(&self) -> [f64; 3] {
        array(&self.rpy).unwrap_or([0.0; 3])
    }

    pub fn set_xyz(&mut self, xyz: [f64; 3]) {
        self.xyz.set_array(&xyz);
    }

    pub fn set_rpy(&mut self, rpy: [f64; 3]) {
        self.rpy.set_array(&rpy);
    }
}

/// Joint axis; unset means the host should estimate it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    required: bool,
    xyz: Attribute,
}

impl_element!(Axis, "axis", [xyz], []);

impl Default for Axis {
    fn default() -> Self {
        Self {
            required: false,
            xyz: Attribute::number_array("xyz", 3, false),
        }
    }
}

impl Axis {
    pub fn new(xyz: [f64; 3]) -> Self {
        let mut axis = Self::default();
        axis.set_xyz(xyz);
        axis
    }

    pub fn xyz(&self) -> Option<[f64; 3]> {
        array(&self.xyz)
    }

    pub fn set_xyz(&mut self, xyz: [f64; 3]) {
        self.xyz.set_array(&xyz);
    }

    pub fn clear(&mut self) {
        self.xyz.clear();
    }
}

/// Joint limits; all four values must be given together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    required: bool,
    /// rad or m
    lower: Attribute,
    upper: Attribute,
    /// N-m or N
    effort: Attribute,
    /// rad/s or m/s
    velocity: Attribute,
}

impl_element!(Limit, "limit", [lower, upper, effort, velocity], []);

impl Default for Limit {
    fn default() -> Self {
        Self {
            required: true,
            lower: Attribute::number("lower", true),
            upper: Attribute::number("upper", true),
            effort: Attribute::number("effort", true),
            velocity: Attribute::number("velocity", true),
        }
    }
}

impl Limit {
    pub fn new(lower: f64, upper: f64, effort: f64, velocity: f64) -> Self {
        let mut limit = Self::default();
        limit.lower.set_number(lower);
        limit.upper.set_number(upper);
        limit.effort.set_number(effort);
        limit.velocity.set_number(velocity);
        limit
    }

    pub fn lower(&self) -> Option<f64> {
        self.lower.as_number()
    }

    pub fn upper(&self) -> Option<f64> {
        self.upper.as_number()
    }

    pub fn effort(&self) -> Option<f64> {
        self.effort.as_number()
    }

    pub fn velocity(&self) -> Option<f64> {
        self.velocity.as_number()
    }

    pub fn set_range(&mut self, lower: f64, upper: f64) {
        self.lower.set_number(lower);
        self.upper.set_number(upper);
    }

    pub fn set_effort(&mut self, effort: f64) {
        self.effort.set_number(effort);
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.velocity.set_number(velocity);
    }
}

/// Reference positions used to calibrate the absolute joint position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    required: bool,
    rising: Attribute,
    falling: Attribute,
}

impl_element!(Calibration, "calibration", [rising, falling], []);

impl Default for Calibration {
    fn default() -> Self {
        Self {
            required: false,
            rising: Attribute::number("rising", false),
            falling: Attribute::number("falling", false),
        }
    }
}

impl Calibration {
    pub fn new(rising: f64, falling: f64) -> Self {
        let mut calibration = Self::default();
        calibration.rising.set_number(rising);
        calibration.falling.set_number(falling);
        calibration
    }

    pub fn rising(&self) -> Option<f64> {
        self.rising.as_number()
    }

    pub fn falling(&self) -> Option<f64> {
        self.falling.as_number()
    }

    pub fn set_rising(&mut self, rising: f64) {
        self.rising.set_number(rising);
    }

    pub fn set_falling(&mut self, falling: f64) {
        self.falling.set_number(falling);
    }
}

/// Joint damping and friction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dynamics {
    required: bool,
    damping: Attribute,
    friction: Attribute,
}

impl_element!(Dynamics, "dynamics", [damping, friction], []);

impl Default for Dynamics {
    fn default() -> Self {
        Self {
            required: false,
            damping: Attribute::number("damping", false),
            friction: Attribute::number("friction", false),
        }
    }
}

impl Dynamics {
    pub fn new(damping: f64, friction: f64) -> Self {
        let mut dynamics = Self::default();
        dynamics.damping.set_number(damping);
        dynamics.friction.set_number(friction);
        dynamics
    }

    pub fn damping(&self) -> Option<f64> {
        self.damping.as_number()
    }

    pub fn friction(&self) -> Option<f64> {
        self.friction.as_number()
    }
}

/// Soft limits enforced by the joint safety controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyController {
    required: bool,
    soft_lower_limit: Attribute,
    soft_upper_limit: Attribute,
    k_position: Attribute,
    k_velocity: Attribute,
}

impl_element!(
    SafetyController,
    "safety_controller",
    [soft_lower_limit, soft_upper_limit, k_position, k_velocity],
    []
);

impl Default for SafetyController {
    fn default() -> Self {
        Self {
            required: false,
            soft_lower_limit: Attribute::number("soft_lower_limit", false),
            soft_upper_limit: Attribute::number("soft_upper_limit", false),
            k_position: Attribute::number("k_position", false),
            k_velocity: Attribute::number("k_velocity", true),
        }
    }
}

impl SafetyController {
    pub fn new(soft_lower: f64, soft_upper: f64, k_position: f64, k_velocity: f64) -> Self {
        let mut safety = Self::default();
        safety.soft_lower_limit.set_number(soft_lower);
        safety.soft_upper_limit.set_number(soft_upper);
        safety.k_position.set_number(k_position);
        safety.k_velocity.set_number(k_velocity);
        safety
    }

    pub fn soft_lower_limit(&self) -> Option<f64> {
        self.soft_lower_limit.as_number()
    }

    pub fn soft_upper_limit(&self) -> Option<f64> {
        self.soft_upper_limit.as_number()
    }

    pub fn k_position(&self) -> Option<f64> {
        self.k_position.as_number()
    }

    pub fn k_velocity(&self) -> Option<f64> {
        self.k_velocity.as_number()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mass {
    required: bool,
    value: Attribute,
}

impl_element!(Mass, "mass", [value], []);

impl Default for Mass {
    fn default() -> Self {
        Self {
            required: true,
            value: Attribute::number("value", true).with_value(AttributeValue::Number(0.0)),
        }
    }
}

impl Mass {
    pub fn value(&self) -> Option<f64> {
        self.value.as_number()
    }

    pub fn set_value(&mut self, kg: f64) {
        self.value.set_number(kg);
    }
}

/// Inertia tensor (symmetric, upper triangle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inertia {
    required: bool,
    ixx: Attribute,
    ixy: Attribute,
    ixz: Attribute,
    iyy: Attribute,
    iyz: Attribute,
    izz: Attribute,
}

impl_element!(Inertia, "inertia", [ixx, ixy, ixz, iyy, iyz, izz], []);

impl Default for Inertia {
    fn default() -> Self {
        let zero = |name| Attribute::number(name, true).with_value(AttributeValue::Number(0.0));
        Self {
            required: true,
            ixx: zero("ixx"),
            ixy: zero("ixy"),
            ixz: zero("ixz"),
            iyy: zero("iyy"),
            iyz: zero("iyz"),
            izz: zero("izz"),
        }
    }
}

impl Inertia {
    /// Components in `[ixx, ixy, ixz, iyy, iyz, izz]` order
    pub fn values(&self) -> [f64; 6] {
        [
            &self.ixx, &self.ixy, &self.ixz, &self.iyy, &self.iyz, &self.izz,
        ]
        .map(|a| a.as_number().unwrap_or(0.0))
    }

    pub fn set_values(&mut self, values: [f64; 6]) {
        let [ixx, ixy, ixz, iyy, iyz, izz] = values;
        self.ixx.set_number(ixx);
        self.ixy.set_number(ixy);
        self.ixz.set_number(ixz);
        self.iyy.set_number(iyy);
        self.iyz.set_number(iyz);
        self.izz.set_number(izz);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    required: bool,
    rgba: Attribute,
}

impl_element!(Color, "color", [rgba], []);

impl Default for Color {
    fn default() -> Self {
        Self {
            required: false,
            rgba: Attribute::number_array("rgba", 4, true)
                .with_value(AttributeValue::NumberArray(DEFAULT_COLOR.to_vec())),
        }
    }
}

impl Color {
    pub fn rgba(&self) -> Option<[f64; 4]> {
        array(&self.rgba)
    }

    pub fn set_rgba(&mut self, rgba: [f64; 4]) {
        self.rgba.set_array(&rgba);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    required: bool,
    filename: Attribute,
}

impl_element!(Texture, "texture", [filename], []);

impl Default for Texture {
    fn default() -> Self {
        Self {
            required: false,
            filename: Attribute::text("filename", false),
        }
    }
}

impl Texture {
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_text()
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename.set_text(filename);
    }
}

/// Material of a visual. Optional, but once present its name is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    required: bool,
    name: Attribute,
    pub color: Color,
    pub texture: Texture,
}

impl_element!(Material, "material", [name], [color, texture]);

impl Default for Material {
    fn default() -> Self {
        Self {
            required: false,
            name: Attribute::text("name", true).with_value(AttributeValue::Text(String::new())),
            color: Color::default(),
            texture: Texture::default(),
        }
    }
}

impl Material {
    pub fn name(&self) -> Option<&str> {
        self.name.as_text()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name.set_text(name);
    }
}

/// Mesh file produced by the host's exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    required: bool,
    filename: Attribute,
}

impl_element!(Mesh, "mesh", [filename], []);

impl Default for Mesh {
    fn default() -> Self {
        Self {
            required: true,
            filename: Attribute::text("filename", true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    required: bool,
    pub mesh: Mesh,
}

impl_element!(Geometry, "geometry", [], [mesh]);

impl Default for Geometry {
    fn default() -> Self {
        Self {
            required: true,
            mesh: Mesh::default(),
        }
    }
}

impl Geometry {
    pub fn mesh_filename(&self) -> Option<&str> {
        self.mesh.filename.as_text()
    }

    pub fn set_mesh_filename(&mut self, filename: impl Into<String>) {
        self.mesh.filename.set_text(filename);
    }
}

/// `<parent link=".."/>` or `<child link=".."/>` of a joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    tag: LinkRefTag,
    required: bool,
    link: Attribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum LinkRefTag {
    Parent,
    Child,
}

impl LinkRef {
    pub(crate) fn new(tag: LinkRefTag) -> Self {
        Self {
            tag,
            required: true,
            link: Attribute::text("link", true),
        }
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_text()
    }

    pub(crate) fn set_link(&mut self, name: impl Into<String>) {
        self.link.set_text(name);
    }
}

impl crate::element::UrdfElement for LinkRef {
    fn element_name(&self) -> &str {
        match self.tag {
            LinkRefTag::Parent => "parent",
            LinkRefTag::Child => "child",
        }
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    fn attributes(&self) -> Vec<&Attribute> {
        vec![&self.link]
    }

    fn attributes_mut(&mut self) -> Vec<&mut Attribute> {
        vec![&mut self.link]
    }

    fn as_dyn(&self) -> &dyn crate::element::UrdfElement {
        self
    }
}

/// Visual properties of a link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    required: bool,
    pub origin: Origin,
    pub geometry: Geometry,
    pub material: Material,
}

impl_element!(Visual, "visual", [], [origin, geometry, material]);

impl Default for Visual {
    fn default() -> Self {
        Self {
            required: false,
            origin: Origin::default(),
            geometry: Geometry::default(),
            material: Material::default(),
        }
    }
}

/// Inertial properties of a link, computed by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inertial {
    required: bool,
    pub origin: Origin,
    pub mass: Mass,
    pub inertia: Inertia,
}

impl_element!(Inertial, "inertial", [], [origin, mass, inertia]);

impl Default for Inertial {
    fn default() -> Self {
        Self {
            required: false,
            origin: Origin::default(),
            mass: Mass::default(),
            inertia: Inertia::default(),
        }
    }
}

/// Collision properties of a link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    required: bool,
    pub origin: Origin,
    pub geometry: Geometry,
}

impl_element!(Collision, "collision", [], [origin, geometry]);

impl Default for Collision {
    fn default() -> Self {
        Self {
            required: false,
            origin: Origin::default(),
            geometry: Geometry::default(),
        }
    }
}
