//! Conversion from `urdf_rs` types
//!
//! Lets a host that already parsed a file with `urdf-rs` hand the result to
//! this crate. Only the first visual and collision of a link are kept, and
//! only mesh geometry carries over (primitive shapes are skipped).

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::robot::{
    Calibration, Dynamics, Joint, JointType, Limit, Link, Material, Origin, Robot,
    SafetyController, TreeError, assemble,
};

impl TryFrom<&urdf_rs::Robot> for Robot {
    type Error = TreeError;

    /// Build a tree from a parsed URDF; every root and reference check of
    /// the other readers applies
    fn try_from(urdf: &urdf_rs::Robot) -> Result<Self, Self::Error> {
        let material_colors: HashMap<&str, [f64; 4]> = urdf
            .materials
            .iter()
            .filter_map(|m| m.color.as_ref().map(|c| (m.name.as_str(), c.rgba.0)))
            .collect();

        let mut records: Vec<Link> = urdf
            .links
            .iter()
            .map(|link| convert_link(link, &material_colors))
            .collect();

        let index: HashMap<String, usize> = records
            .iter()
            .enumerate()
            .map(|(i, link)| (link.name().to_string(), i))
            .collect();
        let mut unknown_children = Vec::new();
        for urdf_joint in &urdf.joints {
            match index.get(&urdf_joint.child.link) {
                Some(&i) if records[i].joint().is_some() => {
                    return Err(TreeError::DuplicateName(urdf_joint.child.link.clone()));
                }
                Some(&i) => records[i].set_joint(convert_joint(urdf_joint)),
                None => unknown_children.push(urdf_joint.name.clone()),
            }
        }
        if !unknown_children.is_empty() {
            return Err(TreeError::OrphanReference(unknown_children));
        }

        assemble(&urdf.name, records)
    }
}

fn convert_link(urdf_link: &urdf_rs::Link, material_colors: &HashMap<&str, [f64; 4]>) -> Link {
    let mut link = Link::fixed_frame(urdf_link.name.as_str());
    let inertial = &urdf_link.inertial;
    let has_inertial = inertial.mass.value != 0.0 || inertia_values(&inertial.inertia) != [0.0; 6];
    if urdf_link.visual.is_empty() && urdf_link.collision.is_empty() && !has_inertial {
        debug!("Link '{}' has no payload, keeping it as a frame", urdf_link.name);
        return link;
    }
    link.set_fixed_frame(false);

    if let Some(inertial_out) = &mut link.inertial {
        inertial_out.origin = convert_pose(&inertial.origin);
        inertial_out.mass.set_value(inertial.mass.value);
        inertial_out.inertia.set_values(inertia_values(&inertial.inertia));
    }

    if urdf_link.visual.len() > 1 {
        warn!(
            "Link '{}' has {} visuals, keeping the first",
            urdf_link.name,
            urdf_link.visual.len()
        );
    }
    if urdf_link.visual.is_empty() {
        link.visual = None;
    }
    if let (Some(urdf_visual), Some(visual)) = (urdf_link.visual.first(), link.visual.as_mut()) {
        visual.origin = convert_pose(&urdf_visual.origin);
        if let Some(filename) = mesh_filename(&urdf_visual.geometry) {
            visual.geometry.set_mesh_filename(filename);
        }
        if let Some(material) = &urdf_visual.material {
            convert_material(material, &mut visual.material, material_colors);
        }
    }

    if urdf_link.collision.is_empty() {
        link.collision = None;
    }
    if let (Some(urdf_collision), Some(collision)) =
        (urdf_link.collision.first(), link.collision.as_mut())
    {
        collision.origin = convert_pose(&urdf_collision.origin);
        if let Some(filename) = mesh_filename(&urdf_collision.geometry) {
            collision.geometry.set_mesh_filename(filename);
        }
    }

    link
}

fn convert_material(
    urdf_material: &urdf_rs::Material,
    material: &mut Material,
    material_colors: &HashMap<&str, [f64; 4]>,
) {
    material.set_name(urdf_material.name.as_str());
    // A reference by name takes its color from the robot-level material
    let rgba = urdf_material
        .color
        .as_ref()
        .map(|c| c.rgba.0)
        .or_else(|| material_colors.get(urdf_material.name.as_str()).copied());
    if let Some(rgba) = rgba {
        material.color.set_rgba(rgba);
    }
    if let Some(texture) = &urdf_material.texture {
        material.texture.set_filename(texture.filename.as_str());
    }
}

fn convert_joint(urdf_joint: &urdf_rs::Joint) -> Joint {
    let joint_type = convert_joint_type(&urdf_joint.joint_type);
    let mut joint = Joint::new(urdf_joint.name.as_str(), joint_type)
        .with_origin(convert_pose(&urdf_joint.origin));
    joint.bind(&urdf_joint.parent.link, &urdf_joint.child.link);

    // urdf-rs fills every element with defaults; only those the type
    // accepts are taken
    if joint_type.has_axis() {
        keep_allowed(joint.set_axis(urdf_joint.axis.xyz.0));
    }
    if joint_type.allows_limit() {
        let limit = &urdf_joint.limit;
        keep_allowed(joint.set_limit(Limit::new(
            limit.lower,
            limit.upper,
            limit.effort,
            limit.velocity,
        )));
    }
    if joint_type.allows_motion_elements() {
        if let Some(calibration) = &urdf_joint.calibration {
            let mut converted = Calibration::default();
            if let Some(rising) = calibration.rising {
                converted.set_rising(rising);
            }
            if let Some(falling) = calibration.falling {
                converted.set_falling(falling);
            }
            keep_allowed(joint.set_calibration(converted));
        }
        if let Some(dynamics) = &urdf_joint.dynamics {
            keep_allowed(joint.set_dynamics(Dynamics::new(
                dynamics.damping,
                dynamics.friction,
            )));
        }
        if let Some(safety) = &urdf_joint.safety_controller {
            keep_allowed(joint.set_safety_controller(SafetyController::new(
                safety.soft_lower_limit,
                safety.soft_upper_limit,
                safety.k_position,
                safety.k_velocity,
            )));
        }
    }
    joint
}

fn keep_allowed(result: Result<(), TreeError>) {
    if let Err(e) = result {
        warn!("Skipping joint element: {}", e);
    }
}

fn convert_joint_type(urdf_type: &urdf_rs::JointType) -> JointType {
    match urdf_type {
        urdf_rs::JointType::Fixed => JointType::Fixed,
        urdf_rs::JointType::Revolute => JointType::Revolute,
        urdf_rs::JointType::Continuous => JointType::Continuous,
        urdf_rs::JointType::Prismatic => JointType::Prismatic,
        urdf_rs::JointType::Floating => JointType::Floating,
        urdf_rs::JointType::Planar => JointType::Planar,
        // No spherical joint in this model
        urdf_rs::JointType::Spherical => JointType::Floating,
    }
}

fn convert_pose(urdf_pose: &urdf_rs::Pose) -> Origin {
    Origin::new(urdf_pose.xyz.0, urdf_pose.rpy.0)
}

fn inertia_values(inertia: &urdf_rs::Inertia) -> [f64; 6] {
    [
        inertia.ixx,
        inertia.ixy,
        inertia.ixz,
        inertia.iyy,
        inertia.iyz,
        inertia.izz,
    ]
}

fn mesh_filename(geometry: &urdf_rs::Geometry) -> Option<&str> {
    match geometry {
        urdf_rs::Geometry::Mesh { filename, .. } => Some(filename.as_str()),
        _ => {
            debug!("Skipping non-mesh geometry {:?}", geometry);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const ARM: &str = r#"
        <robot name="arm">
          <material name="blue"><color rgba="0 0 1 1"/></material>
          <link name="base_link">
            <inertial>
              <mass value="2.5"/>
              <inertia ixx="0.01" ixy="0" ixz="0" iyy="0.02" iyz="0" izz="0.03"/>
            </inertial>
            <visual>
              <geometry><mesh filename="meshes/base.stl"/></geometry>
              <material name="blue"/>
            </visual>
            <collision>
              <geometry><box size="1 1 1"/></geometry>
            </collision>
          </link>
          <link name="upper_arm"/>
          <link name="tool0"/>
          <joint name="shoulder" type="revolute">
            <origin xyz="0 0 0.1" rpy="0 0 1.5708"/>
            <parent link="base_link"/>
            <child link="upper_arm"/>
            <axis xyz="0 0 1"/>
            <limit lower="-3.14" upper="3.14" effort="10" velocity="2"/>
            <dynamics damping="0.1" friction="0.01"/>
          </joint>
          <joint name="tool_joint" type="fixed">
            <parent link="upper_arm"/>
            <child link="tool0"/>
          </joint>
        </robot>
    "#;

    #[test]
    fn test_convert_arm() {
        let urdf = urdf_rs::read_from_string(ARM).unwrap();
        let robot = Robot::try_from(&urdf).unwrap();

        assert_eq!(robot.name(), "arm");
        assert_eq!(robot.base_link().name(), "base_link");
        assert_eq!(robot.parent_chain("tool0"), vec!["upper_arm", "base_link"]);

        let shoulder = robot.find_joint("shoulder").unwrap();
        assert_eq!(shoulder.joint_type(), JointType::Revolute);
        assert_eq!(shoulder.axis().xyz(), Some([0.0, 0.0, 1.0]));
        assert_eq!(shoulder.limit().unwrap().upper(), Some(3.14));
        assert_eq!(shoulder.dynamics().unwrap().damping(), Some(0.1));
        assert_eq!(shoulder.origin.rpy(), [0.0, 0.0, 1.5708]);

        let tool_joint = robot.find_joint("tool_joint").unwrap();
        assert!(tool_joint.axis().xyz().is_none());
        assert!(tool_joint.limit().is_none());
    }

    #[test]
    fn test_payload_conversion() {
        let urdf = urdf_rs::read_from_string(ARM).unwrap();
        let robot = Robot::try_from(&urdf).unwrap();

        let base = robot.base_link();
        let inertial = base.inertial.as_ref().unwrap();
        assert_eq!(inertial.mass.value(), Some(2.5));
        assert_eq!(inertial.inertia.values(), [0.01, 0.0, 0.0, 0.02, 0.0, 0.03]);

        let visual = base.visual.as_ref().unwrap();
        assert_eq!(visual.geometry.mesh_filename(), Some("meshes/base.stl"));
        assert_eq!(visual.material.name(), Some("blue"));
        // Color resolved from the robot-level material
        assert_eq!(visual.material.color.rgba(), Some([0.0, 0.0, 1.0, 1.0]));

        // Box geometry is not carried over
        let collision = base.collision.as_ref().unwrap();
        assert_eq!(collision.geometry.mesh_filename(), None);

        assert!(robot.find_by_name("tool0").unwrap().is_fixed_frame());
    }

    #[test]
    fn test_two_roots_rejected() {
        let urdf = urdf_rs::read_from_string(
            r#"<robot name="bot"><link name="a"/><link name="b"/></robot>"#,
        )
        .unwrap();
        let err = Robot::try_from(&urdf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MultipleRootsFound);
        assert_eq!(err.offending_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_parent_is_orphan() {
        let urdf = urdf_rs::read_from_string(
            r#"<robot name="bot">
                 <link name="base_link"/><link name="arm"/>
                 <joint name="j" type="fixed"><parent link="ghost"/><child link="arm"/></joint>
               </robot>"#,
        )
        .unwrap();
        let err = Robot::try_from(&urdf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OrphanReference);
        assert_eq!(err.offending_names(), vec!["arm"]);
    }
}
