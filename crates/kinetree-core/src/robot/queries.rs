//! Read-only lookups over the tree

use super::{Joint, Link, Robot};

impl Robot {
    /// Find a link by name (index lookup)
    pub fn find_by_name(&self, name: &str) -> Option<&Link> {
        let path = self.link_path(name)?;
        self.link_at(&path)
    }

    /// Find a joint by name
    pub fn find_joint(&self, name: &str) -> Option<&Joint> {
        let path = self.joint_path(name)?;
        self.link_at(&path).and_then(|link| link.joint())
    }

    pub fn contains_link(&self, name: &str) -> bool {
        self.link_path(name).is_some()
    }

    /// Parent of a link; `None` for the base link or an unknown name
    pub fn parent_of(&self, name: &str) -> Option<&Link> {
        let path = self.link_path(name)?;
        let (_, parent_path) = path.split_last()?;
        self.link_at(parent_path)
    }

    /// Names of all ancestors, nearest first, ending at the base link.
    /// Empty for the base link or an unknown name.
    pub fn parent_chain(&self, name: &str) -> Vec<String> {
        let Some(path) = self.link_path(name) else {
            return Vec::new();
        };
        (0..path.len())
            .rev()
            .filter_map(|len| self.link_at(&path[..len]))
            .map(|link| link.name().to_string())
            .collect()
    }

    /// Whether `ancestor` is a strict ancestor of `descendant`
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        match (self.link_path(ancestor), self.link_path(descendant)) {
            (Some(a), Some(d)) => a.len() < d.len() && d.starts_with(&a),
            _ => false,
        }
    }

    /// Number of joints between a link and the base link
    pub fn depth(&self, name: &str) -> Option<usize> {
        self.link_path(name).map(|path| path.len())
    }

    /// All links in depth-first order from the base link
    pub fn links_depth_first(&self) -> Vec<&Link> {
        self.base_link().subtree()
    }

    /// All joints in depth-first order of their child links
    pub fn joints_depth_first(&self) -> Vec<&Joint> {
        self.links_depth_first()
            .into_iter()
            .filter_map(|link| link.joint())
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.links_depth_first().len()
    }
}
