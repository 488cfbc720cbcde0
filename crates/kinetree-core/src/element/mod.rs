//! Generic element/attribute model
//!
//! Every piece of the robot description is an element: a named node with
//! ordered attributes and ordered child elements. The serializers only talk
//! to this trait, so the rule for "what gets written" lives in one place:
//! an element is emitted iff [`UrdfElement::is_set`].

mod attribute;
mod format;

pub use attribute::{Attribute, AttributeKind, AttributeValue, ParseError};
pub use format::NumberFormat;

use std::fmt;

/// A required attribute with no value, found by [`UrdfElement::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRequiredField {
    /// Dot-separated path, e.g. `robot[arm].link[base].inertial.mass.value`
    pub path: String,
}

impl fmt::Display for MissingRequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// A node of the robot description
pub trait UrdfElement {
    /// Tag used in the structured format and in flat-table keys
    fn element_name(&self) -> &str;

    fn is_required(&self) -> bool;

    /// Does not cascade to attributes or children
    fn set_required(&mut self, required: bool);

    fn attributes(&self) -> Vec<&Attribute>;

    fn attributes_mut(&mut self) -> Vec<&mut Attribute>;

    fn children(&self) -> Vec<&dyn UrdfElement> {
        Vec::new()
    }

    fn children_mut(&mut self) -> Vec<&mut dyn UrdfElement> {
        Vec::new()
    }

    /// Segment used in validation paths
    fn path_segment(&self) -> String {
        self.element_name().to_string()
    }

    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes().into_iter().find(|a| a.name() == name)
    }

    fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes_mut().into_iter().find(|a| a.name() == name)
    }

    /// Child element with the given tag, created first when it is optional
    /// and absent. `None` if this element has no such child or forbids it.
    fn child_slot_mut(&mut self, tag: &str) -> Option<&mut dyn UrdfElement> {
        self.children_mut()
            .into_iter()
            .find(|c| c.element_name() == tag)
    }

    /// Required, or holding at least one set attribute or set child
    fn is_set(&self) -> bool {
        self.is_required()
            || self.attributes().iter().any(|a| a.is_set())
            || self.children().iter().any(|c| c.is_set())
    }

    /// Every required-but-unset attribute below this element
    fn validate(&self) -> Vec<MissingRequiredField> {
        let mut missing = Vec::new();
        collect_missing(self.as_dyn(), "", &mut missing);
        missing
    }

    fn as_dyn(&self) -> &dyn UrdfElement;
}

/// Append missing required fields of `element` (and its set descendants),
/// prefixing paths with `prefix`. Unset elements are not emitted, so nothing
/// inside them can be missing.
pub fn collect_missing(
    element: &dyn UrdfElement,
    prefix: &str,
    missing: &mut Vec<MissingRequiredField>,
) {
    if !element.is_set() {
        return;
    }
    let path = join_path(prefix, &element.path_segment());
    for attribute in element.attributes() {
        if attribute.is_required() && !attribute.is_set() {
            missing.push(MissingRequiredField {
                path: join_path(&path, attribute.name()),
            });
        }
    }
    for child in element.children() {
        collect_missing(child, &path, missing);
    }
}

pub(crate) fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

/// Implement [`UrdfElement`] for a struct whose fields are a `required` flag,
/// attributes, and always-present child elements.
macro_rules! impl_element {
    ($ty:ty, $tag:literal, [$($attr:ident),*], [$($child:ident),*]) => {
        impl $crate::element::UrdfElement for $ty {
            fn element_name(&self) -> &str {
                $tag
            }

            fn is_required(&self) -> bool {
                self.required
            }

            fn set_required(&mut self, required: bool) {
                self.required = required;
            }

            fn attributes(&self) -> Vec<&$crate::element::Attribute> {
                vec![$(&self.$attr),*]
            }

            fn attributes_mut(&mut self) -> Vec<&mut $crate::element::Attribute> {
                vec![$(&mut self.$attr),*]
            }

            fn children(&self) -> Vec<&dyn $crate::element::UrdfElement> {
                vec![$(&self.$child as &dyn $crate::element::UrdfElement),*]
            }

            fn children_mut(&mut self) -> Vec<&mut dyn $crate::element::UrdfElement> {
                vec![$(&mut self.$child as &mut dyn $crate::element::UrdfElement),*]
            }

            fn as_dyn(&self) -> &dyn $crate::element::UrdfElement {
                self
            }
        }
    };
}

pub(crate) use impl_element;
