//! Lazily rebuilt name index for the tree

use std::collections::HashMap;

use super::link::Link;

/// Position of a link as child indices from the base link
pub(crate) type LinkPath = Vec<usize>;

/// Name lookups for links and joints
///
/// Invalidated on every mutation and rebuilt on the next query. When a name
/// occurs more than once the first occurrence in depth-first order wins;
/// duplicates are reported by the validators, not here.
#[derive(Debug, Clone, Default)]
pub(crate) struct TreeCache {
    pub valid: bool,
    /// Link name -> path
    pub links: HashMap<String, LinkPath>,
    /// Joint name -> path of the link that owns the joint
    pub joints: HashMap<String, LinkPath>,
}

impl TreeCache {
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn rebuild(&mut self, base_link: &Link) {
        self.links.clear();
        self.joints.clear();
        let mut path = Vec::new();
        self.index(base_link, &mut path);
        self.valid = true;
    }

    fn index(&mut self, link: &Link, path: &mut LinkPath) {
        self.links
            .entry(link.name().to_string())
            .or_insert_with(|| path.clone());
        if let Some(joint) = link.joint() {
            self.joints
                .entry(joint.name().to_string())
                .or_insert_with(|| path.clone());
        }
        for (i, child) in link.children().iter().enumerate() {
            path.push(i);
            self.index(child, path);
            path.pop();
        }
    }
}
