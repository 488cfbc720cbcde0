//! Joint connecting a link to its parent

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TreeError;
use super::types::{
    Axis, Calibration, Dynamics, Limit, LinkRef, LinkRefTag, Origin, SafetyController,
};
use crate::element::{Attribute, AttributeValue, ParseError, UrdfElement};

/// Joint type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    #[default]
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
    Floating,
    Planar,
}

impl JointType {
    /// All joint types
    pub fn all() -> &'static [JointType] {
        &[
            JointType::Fixed,
            JointType::Revolute,
            JointType::Continuous,
            JointType::Prismatic,
            JointType::Floating,
            JointType::Planar,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JointType::Fixed => "fixed",
            JointType::Revolute => "revolute",
            JointType::Continuous => "continuous",
            JointType::Prismatic => "prismatic",
            JointType::Floating => "floating",
            JointType::Planar => "planar",
        }
    }

    /// Whether the joint moves about or along an axis
    pub fn has_axis(&self) -> bool {
        !matches!(self, JointType::Fixed)
    }

    /// Revolute and prismatic joints must carry limits
    pub fn requires_limit(&self) -> bool {
        matches!(self, JointType::Revolute | JointType::Prismatic)
    }

    pub fn allows_limit(&self) -> bool {
        self.requires_limit()
    }

    /// Calibration, dynamics and the safety controller only apply to
    /// joints that move
    pub fn allows_motion_elements(&self) -> bool {
        !matches!(self, JointType::Fixed)
    }

    /// Check whether a sub-element tag may appear on this joint type
    pub fn allows_element(&self, tag: &str) -> bool {
        match tag {
            "axis" => self.has_axis(),
            "limit" => self.allows_limit(),
            "calibration" | "dynamics" | "safety_controller" => self.allows_motion_elements(),
            _ => true,
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        JointType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == trimmed)
            .ok_or_else(|| ParseError::new("type", s, "unknown joint type"))
    }
}

/// A joint connecting a link to its parent
///
/// The joint is owned by its child link. `parent` and `child` hold link
/// names; the tree keeps them in sync with the actual structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    required: bool,
    name: Attribute,
    joint_type: Attribute,
    pub origin: Origin,
    parent: LinkRef,
    child: LinkRef,
    axis: Axis,
    limit: Option<Limit>,
    calibration: Option<Calibration>,
    dynamics: Option<Dynamics>,
    safety_controller: Option<SafetyController>,
    /// Name of the host coordinate system the origin was taken from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coordinate_system: Option<String>,
    /// Name of the host reference axis the joint axis was taken from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference_axis: Option<String>,
}

impl Default for Joint {
    fn default() -> Self {
        Self {
            required: true,
            name: Attribute::text("name", true),
            joint_type: Attribute::text("type", true)
                .with_value(AttributeValue::Text(JointType::Fixed.as_str().to_string())),
            origin: Origin::default(),
            parent: LinkRef::new(LinkRefTag::Parent),
            child: LinkRef::new(LinkRefTag::Child),
            axis: Axis::default(),
            limit: None,
            calibration: None,
            dynamics: None,
            safety_controller: None,
            coordinate_system: None,
            reference_axis: None,
        }
    }
}

impl Joint {
    /// Create a joint; revolute and prismatic joints start with an empty
    /// (required) limit that must be filled before serialization.
    pub fn new(name: impl Into<String>, joint_type: JointType) -> Self {
        let mut joint = Self::default();
        joint.name.set_text(name);
        joint.set_type(joint_type);
        joint
    }

    /// Create a fixed joint
    pub fn fixed(name: impl Into<String>) -> Self {
        Self::new(name, JointType::Fixed)
    }

    /// Set the origin (builder style)
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_text().unwrap_or("")
    }

    pub fn has_name(&self) -> bool {
        self.name.as_text().is_some_and(|n| !n.is_empty())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name.set_text(name);
    }

    pub fn joint_type(&self) -> JointType {
        self.joint_type
            .as_text()
            .and_then(|t| t.parse().ok())
            .unwrap_or_default()
    }

    /// Change the type, dropping or creating sub-elements so the joint stays
    /// consistent: fixed joints lose their axis, only revolute and prismatic
    /// joints keep a limit.
    pub fn set_type(&mut self, joint_type: JointType) {
        self.joint_type.set_text(joint_type.as_str());
        if !joint_type.has_axis() {
            self.axis.clear();
        }
        if joint_type.requires_limit() {
            if self.limit.is_none() {
                self.limit = Some(Limit::default());
            }
        } else {
            self.limit = None;
        }
        if !joint_type.allows_motion_elements() {
            self.calibration = None;
            self.dynamics = None;
            self.safety_controller = None;
        }
    }

    /// Parse and apply a type name
    pub fn set_type_from_text(&mut self, text: &str) -> Result<(), ParseError> {
        let joint_type: JointType = text.parse()?;
        self.set_type(joint_type);
        Ok(())
    }

    /// Name of the parent link
    pub fn parent_link(&self) -> Option<&str> {
        self.parent.link()
    }

    /// Name of the child link
    pub fn child_link(&self) -> Option<&str> {
        self.child.link()
    }

    pub(crate) fn bind(&mut self, parent: &str, child: &str) {
        self.parent.set_link(parent);
        self.child.set_link(child);
    }

    pub(crate) fn set_parent_link(&mut self, parent: &str) {
        self.parent.set_link(parent);
    }

    pub(crate) fn set_child_link(&mut self, child: &str) {
        self.child.set_link(child);
    }

    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    pub fn set_axis(&mut self, xyz: [f64; 3]) -> Result<(), TreeError> {
        self.check_allowed("axis")?;
        self.axis.set_xyz(xyz);
        Ok(())
    }

    /// Leave the axis for the host to estimate
    pub fn clear_axis(&mut self) {
        self.axis.clear();
    }

    pub fn limit(&self) -> Option<&Limit> {
        self.limit.as_ref()
    }

    pub fn limit_mut(&mut self) -> Option<&mut Limit> {
        self.limit.as_mut()
    }

    pub fn set_limit(&mut self, limit: Limit) -> Result<(), TreeError> {
        self.check_allowed("limit")?;
        self.limit = Some(limit);
        Ok(())
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn set_calibration(&mut self, calibration: Calibration) -> Result<(), TreeError> {
        self.check_allowed("calibration")?;
        self.calibration = Some(calibration);
        Ok(())
    }

    pub fn clear_calibration(&mut self) {
        self.calibration = None;
    }

    pub fn dynamics(&self) -> Option<&Dynamics> {
        self.dynamics.as_ref()
    }

    pub fn set_dynamics(&mut self, dynamics: Dynamics) -> Result<(), TreeError> {
        self.check_allowed("dynamics")?;
        self.dynamics = Some(dynamics);
        Ok(())
    }

    pub fn clear_dynamics(&mut self) {
        self.dynamics = None;
    }

    pub fn safety_controller(&self) -> Option<&SafetyController> {
        self.safety_controller.as_ref()
    }

    pub fn set_safety_controller(&mut self, safety: SafetyController) -> Result<(), TreeError> {
        self.check_allowed("safety_controller")?;
        self.safety_controller = Some(safety);
        Ok(())
    }

    pub fn clear_safety_controller(&mut self) {
        self.safety_controller = None;
    }

    pub fn coordinate_system(&self) -> Option<&str> {
        self.coordinate_system.as_deref()
    }

    pub fn set_coordinate_system(&mut self, name: Option<String>) {
        self.coordinate_system = name;
    }

    pub fn reference_axis(&self) -> Option<&str> {
        self.reference_axis.as_deref()
    }

    pub fn set_reference_axis(&mut self, name: Option<String>) {
        self.reference_axis = name;
    }

    /// Sub-elements present on this joint that its type forbids
    pub fn forbidden_elements(&self) -> Vec<&'static str> {
        let joint_type = self.joint_type();
        let mut forbidden = Vec::new();
        if !joint_type.has_axis() && self.axis.is_set() {
            forbidden.push("axis");
        }
        if !joint_type.allows_limit() && self.limit.is_some() {
            forbidden.push("limit");
        }
        if !joint_type.allows_motion_elements() {
            if self.calibration.is_some() {
                forbidden.push("calibration");
            }
            if self.dynamics.is_some() {
                forbidden.push("dynamics");
            }
            if self.safety_controller.is_some() {
                forbidden.push("safety_controller");
            }
        }
        forbidden
    }

    fn check_allowed(&self, element: &str) -> Result<(), TreeError> {
        let joint_type = self.joint_type();
        if joint_type.allows_element(element) {
            Ok(())
        } else {
            Err(TreeError::JointElementNotAllowed {
                joint: self.name().to_string(),
                joint_type,
                element: element.to_string(),
            })
        }
    }
}

impl UrdfElement for Joint {
    fn element_name(&self) -> &str {
        "joint"
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    fn attributes(&self) -> Vec<&Attribute> {
        vec![&self.name, &self.joint_type]
    }

    fn attributes_mut(&mut self) -> Vec<&mut Attribute> {
        vec![&mut self.name, &mut self.joint_type]
    }

    fn children(&self) -> Vec<&dyn UrdfElement> {
        let mut children: Vec<&dyn UrdfElement> =
            vec![&self.origin, &self.parent, &self.child, &self.axis];
        if let Some(limit) = &self.limit {
            children.push(limit);
        }
        if let Some(calibration) = &self.calibration {
            children.push(calibration);
        }
        if let Some(dynamics) = &self.dynamics {
            children.push(dynamics);
        }
        if let Some(safety) = &self.safety_controller {
            children.push(safety);
        }
        children
    }

    fn children_mut(&mut self) -> Vec<&mut dyn UrdfElement> {
        let mut children: Vec<&mut dyn UrdfElement> = vec![
            &mut self.origin,
            &mut self.parent,
            &mut self.child,
            &mut self.axis,
        ];
        if let Some(limit) = &mut self.limit {
            children.push(limit);
        }
        if let Some(calibration) = &mut self.calibration {
            children.push(calibration);
        }
        if let Some(dynamics) = &mut self.dynamics {
            children.push(dynamics);
        }
        if let Some(safety) = &mut self.safety_controller {
            children.push(safety);
        }
        children
    }

    fn path_segment(&self) -> String {
        format!("joint[{}]", self.name())
    }

    fn child_slot_mut(&mut self, tag: &str) -> Option<&mut dyn UrdfElement> {
        if !self.joint_type().allows_element(tag) {
            return None;
        }
        match tag {
            "origin" => Some(&mut self.origin),
            "parent" => Some(&mut self.parent),
            "child" => Some(&mut self.child),
            "axis" => Some(&mut self.axis),
            "limit" => Some(self.limit.get_or_insert_with(Limit::default)),
            "calibration" => Some(self.calibration.get_or_insert_with(Calibration::default)),
            "dynamics" => Some(self.dynamics.get_or_insert_with(Dynamics::default)),
            "safety_controller" => Some(
                self.safety_controller
                    .get_or_insert_with(SafetyController::default),
            ),
            _ => None,
        }
    }

    fn as_dyn(&self) -> &dyn UrdfElement {
        self
    }
}
