//! Link: a rigid body of the tree, owning its joint and its children

use serde::{Deserialize, Serialize};

use super::joint::Joint;
use super::types::{Collision, Inertial, Visual};
use crate::constants::DEFAULT_JOINT_SUFFIX;
use crate::element::{Attribute, UrdfElement};

/// STL export quality requested from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StlQuality {
    #[default]
    Fine,
    Coarse,
}

impl StlQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            StlQuality::Fine => "fine",
            StlQuality::Coarse => "coarse",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "fine" => Some(StlQuality::Fine),
            "coarse" => Some(StlQuality::Coarse),
            _ => None,
        }
    }
}

/// A link in the kinematic tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    required: bool,
    name: Attribute,
    /// Joint to the parent link; `None` on the base link
    joint: Option<Joint>,
    pub visual: Option<Visual>,
    pub inertial: Option<Inertial>,
    pub collision: Option<Collision>,
    children: Vec<Link>,
    #[serde(default)]
    stl_quality: StlQuality,
}

impl Link {
    /// Create a link with empty visual, inertial and collision payloads
    pub fn new(name: impl Into<String>) -> Self {
        let mut link = Self::fixed_frame(name);
        link.set_fixed_frame(false);
        link
    }

    /// Create a link with no payload, used as a reference frame
    pub fn fixed_frame(name: impl Into<String>) -> Self {
        let mut link = Self {
            required: true,
            name: Attribute::text("name", true),
            joint: None,
            visual: None,
            inertial: None,
            collision: None,
            children: Vec::new(),
            stl_quality: StlQuality::default(),
        };
        link.name.set_text(name);
        link
    }

    /// Set the joint (builder style)
    pub fn with_joint(mut self, joint: Joint) -> Self {
        self.joint = Some(joint);
        self
    }

    /// Append a child (builder style), see [`Link::push_child`]
    pub fn with_child(mut self, child: Link) -> Self {
        self.push_child(child);
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_text().unwrap_or("")
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name.set_text(name);
        if let Some(joint) = &mut self.joint {
            joint.set_child_link(name);
        }
        for child in &mut self.children {
            if let Some(joint) = &mut child.joint {
                joint.set_parent_link(name);
            }
        }
    }

    pub fn joint(&self) -> Option<&Joint> {
        self.joint.as_ref()
    }

    pub fn joint_mut(&mut self) -> Option<&mut Joint> {
        self.joint.as_mut()
    }

    pub fn set_joint(&mut self, joint: Joint) {
        self.joint = Some(joint);
    }

    pub fn take_joint(&mut self) -> Option<Joint> {
        self.joint.take()
    }

    pub fn children(&self) -> &[Link] {
        &self.children
    }

    pub(crate) fn children_vec_mut(&mut self) -> &mut Vec<Link> {
        &mut self.children
    }

    /// Append a child, giving it a fixed `<child>_joint` if it has no joint
    /// and binding the joint to this link. Names are not checked here; the
    /// tree checks them when the subtree is attached.
    pub fn push_child(&mut self, mut child: Link) {
        child.bind_to(self.name());
        self.children.push(child);
    }

    /// Ensure this link has a named joint pointing from `parent` to itself
    pub(crate) fn bind_to(&mut self, parent: &str) {
        let name = self.name().to_string();
        let joint = self
            .joint
            .get_or_insert_with(|| Joint::fixed(format!("{}{}", name, DEFAULT_JOINT_SUFFIX)));
        if !joint.has_name() {
            joint.set_name(format!("{}{}", name, DEFAULT_JOINT_SUFFIX));
        }
        joint.bind(parent, &name);
    }

    /// Bind every joint below this link to its actual parent
    pub(crate) fn bind_subtree(&mut self) {
        let name = self.name().to_string();
        for child in &mut self.children {
            child.bind_to(&name);
            child.bind_subtree();
        }
    }

    pub fn stl_quality(&self) -> StlQuality {
        self.stl_quality
    }

    pub fn set_stl_quality(&mut self, quality: StlQuality) {
        self.stl_quality = quality;
    }

    /// A fixed frame carries no visual, inertial or collision payload
    pub fn is_fixed_frame(&self) -> bool {
        self.visual.is_none() && self.inertial.is_none() && self.collision.is_none()
    }

    /// Drop the payload, or create empty payloads where missing
    pub fn set_fixed_frame(&mut self, fixed_frame: bool) {
        if fixed_frame {
            self.visual = None;
            self.inertial = None;
            self.collision = None;
        } else {
            self.visual.get_or_insert_with(Visual::default);
            self.inertial.get_or_insert_with(Inertial::default);
            self.collision.get_or_insert_with(Collision::default);
        }
    }

    /// Set the mesh file on both the visual and the collision geometry
    pub fn set_mesh_filename(&mut self, filename: &str) {
        if let Some(visual) = &mut self.visual {
            visual.geometry.set_mesh_filename(filename);
        }
        if let Some(collision) = &mut self.collision {
            collision.geometry.set_mesh_filename(filename);
        }
    }

    /// Links in this subtree, depth first, this link included
    pub fn subtree(&self) -> Vec<&Link> {
        let mut result = Vec::new();
        self.collect_depth_first(&mut result);
        result
    }

    /// Visit every link in this subtree, depth first
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Link)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    fn collect_depth_first<'a>(&'a self, result: &mut Vec<&'a Link>) {
        result.push(self);
        for child in &self.children {
            child.collect_depth_first(result);
        }
    }
}

impl UrdfElement for Link {
    fn element_name(&self) -> &str {
        "link"
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    fn attributes(&self) -> Vec<&Attribute> {
        vec![&self.name]
    }

    fn attributes_mut(&mut self) -> Vec<&mut Attribute> {
        vec![&mut self.name]
    }

    /// Payload elements only; the joint is written as a sibling of the link
    fn children(&self) -> Vec<&dyn UrdfElement> {
        let mut children: Vec<&dyn UrdfElement> = Vec::new();
        if let Some(visual) = &self.visual {
            children.push(visual);
        }
        if let Some(inertial) = &self.inertial {
            children.push(inertial);
        }
        if let Some(collision) = &self.collision {
            children.push(collision);
        }
        children
    }

    fn children_mut(&mut self) -> Vec<&mut dyn UrdfElement> {
        let mut children: Vec<&mut dyn UrdfElement> = Vec::new();
        if let Some(visual) = &mut self.visual {
            children.push(visual);
        }
        if let Some(inertial) = &mut self.inertial {
            children.push(inertial);
        }
        if let Some(collision) = &mut self.collision {
            children.push(collision);
        }
        children
    }

    fn path_segment(&self) -> String {
        format!("link[{}]", self.name())
    }

    fn child_slot_mut(&mut self, tag: &str) -> Option<&mut dyn UrdfElement> {
        match tag {
            "visual" => Some(self.visual.get_or_insert_with(Visual::default)),
            "inertial" => Some(self.inertial.get_or_insert_with(Inertial::default)),
            "collision" => Some(self.collision.get_or_insert_with(Collision::default)),
            "joint" => Some(self.joint.get_or_insert_with(Joint::default)),
            _ => None,
        }
    }

    fn as_dyn(&self) -> &dyn UrdfElement {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::JointType;

    #[test]
    fn test_new_link_has_payload() {
        let link = Link::new("base_link");
        assert!(!link.is_fixed_frame());
        assert_eq!(link.children().len(), 0);
        assert_eq!(link.path_segment(), "link[base_link]");
    }

    #[test]
    fn test_fixed_frame_has_no_payload() {
        let mut link = Link::fixed_frame("tool0");
        assert!(link.is_fixed_frame());
        assert!(link.validate().is_empty());

        link.set_fixed_frame(false);
        assert!(link.visual.is_some());
        assert!(link.collision.is_some());
    }

    #[test]
    fn test_push_child_creates_default_joint() {
        let parent = Link::new("base_link").with_child(Link::fixed_frame("link1"));
        let joint = parent.children()[0].joint().unwrap();
        assert_eq!(joint.name(), "link1_joint");
        assert_eq!(joint.joint_type(), JointType::Fixed);
        assert_eq!(joint.parent_link(), Some("base_link"));
        assert_eq!(joint.child_link(), Some("link1"));
    }

    #[test]
    fn test_push_child_keeps_existing_joint() {
        let child = Link::new("arm").with_joint(Joint::new("shoulder", JointType::Revolute));
        let parent = Link::new("base_link").with_child(child);
        let joint = parent.children()[0].joint().unwrap();
        assert_eq!(joint.name(), "shoulder");
        assert_eq!(joint.joint_type(), JointType::Revolute);
        assert_eq!(joint.parent_link(), Some("base_link"));
    }

    #[test]
    fn test_set_name_updates_joint_references() {
        let mut link = Link::new("a").with_child(Link::new("b"));
        link.set_name("renamed");
        assert_eq!(link.children()[0].joint().unwrap().parent_link(), Some("renamed"));
    }

    #[test]
    fn test_mesh_filename_missing_is_reported() {
        let mut link = Link::new("base_link");
        let missing: Vec<String> = link.validate().into_iter().map(|m| m.path).collect();
        assert_eq!(
            missing,
            vec![
                "link[base_link].visual.geometry.mesh.filename",
                "link[base_link].collision.geometry.mesh.filename",
            ]
        );

        link.set_mesh_filename("meshes/base_link.STL");
        assert!(link.validate().is_empty());
    }

    #[test]
    fn test_stl_quality_parse() {
        assert_eq!(StlQuality::parse("Coarse"), Some(StlQuality::Coarse));
        assert_eq!(StlQuality::parse("fine"), Some(StlQuality::Fine));
        assert_eq!(StlQuality::parse("medium"), None);
    }
}
