//! Named, typed fields of an element

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::format::NumberFormat;

/// Shape of the value an attribute accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    Text,
    Number,
    /// Fixed number of numeric components
    NumberArray(usize),
}

/// Value held by an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    NumberArray(Vec<f64>),
}

impl AttributeValue {
    fn matches(&self, kind: AttributeKind) -> bool {
        match (self, kind) {
            (AttributeValue::Text(_), AttributeKind::Text) => true,
            (AttributeValue::Number(_), AttributeKind::Number) => true,
            (AttributeValue::NumberArray(values), AttributeKind::NumberArray(arity)) => {
                values.len() == arity
            }
            _ => false,
        }
    }
}

/// Failure to convert text (or a mistyped value) into an attribute value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid value '{text}' for attribute '{attribute}': {reason}")]
pub struct ParseError {
    pub attribute: String,
    pub text: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(
        attribute: impl Into<String>,
        text: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            text: text.into(),
            reason: reason.into(),
        }
    }
}

/// A named field that may be required and may hold a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
    required: bool,
    value: Option<AttributeValue>,
}

impl Attribute {
    pub fn text(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, AttributeKind::Text, required)
    }

    pub fn number(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, AttributeKind::Number, required)
    }

    pub fn number_array(name: impl Into<String>, arity: usize, required: bool) -> Self {
        Self::new(name, AttributeKind::NumberArray(arity), required)
    }

    fn new(name: impl Into<String>, kind: AttributeKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            value: None,
        }
    }

    /// Builder-style default value (ignored if it does not match the kind)
    pub fn with_value(mut self, value: AttributeValue) -> Self {
        if value.matches(self.kind) {
            self.value = Some(value);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&AttributeValue> {
        self.value.as_ref()
    }

    /// Replace the value; a value of the wrong shape is rejected and the
    /// current value is kept.
    pub fn set_value(&mut self, value: AttributeValue) -> Result<(), ParseError> {
        if !value.matches(self.kind) {
            return Err(ParseError::new(
                &self.name,
                format!("{:?}", value),
                format!("expected {}", describe_kind(self.kind)),
            ));
        }
        self.value = Some(value);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            Some(AttributeValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.value {
            Some(AttributeValue::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match &self.value {
            Some(AttributeValue::NumberArray(values)) => Some(values),
            _ => None,
        }
    }

    /// Typed setters for values built in code. A value of the wrong shape
    /// is logged and ignored; use [`Attribute::set_value`] to handle it.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.set_or_warn(AttributeValue::Text(text.into()));
    }

    pub fn set_number(&mut self, value: f64) {
        self.set_or_warn(AttributeValue::Number(value));
    }

    pub fn set_array(&mut self, values: &[f64]) {
        self.set_or_warn(AttributeValue::NumberArray(values.to_vec()));
    }

    fn set_or_warn(&mut self, value: AttributeValue) {
        if let Err(e) = self.set_value(value) {
            warn!("{}", e);
        }
    }

    /// Render the value as text, `None` when unset
    pub fn to_text(&self, format: &NumberFormat) -> Option<String> {
        self.value.as_ref().map(|value| match value {
            AttributeValue::Text(s) => s.clone(),
            AttributeValue::Number(n) => format.format(*n),
            AttributeValue::NumberArray(values) => format.format_array(values),
        })
    }

    /// Parse text into the attribute's kind. On failure the current value is
    /// left untouched.
    pub fn set_from_text(&mut self, text: &str) -> Result<(), ParseError> {
        let value = match self.kind {
            AttributeKind::Text => AttributeValue::Text(text.to_string()),
            AttributeKind::Number => {
                AttributeValue::Number(parse_number(&self.name, text.trim(), text)?)
            }
            AttributeKind::NumberArray(arity) => {
                let values = text
                    .split_whitespace()
                    .map(|part| parse_number(&self.name, part, text))
                    .collect::<Result<Vec<_>, _>>()?;
                if values.len() != arity {
                    return Err(ParseError::new(
                        &self.name,
                        text,
                        format!("expected {} numbers, got {}", arity, values.len()),
                    ));
                }
                AttributeValue::NumberArray(values)
            }
        };
        self.value = Some(value);
        Ok(())
    }

    /// Render one component of a number array
    pub fn component_text(&self, index: usize, format: &NumberFormat) -> Option<String> {
        self.as_array()
            .and_then(|values| values.get(index))
            .map(|v| format.format(*v))
    }

    /// Set the listed components of a number array from text, starting from
    /// the current value (or zeros). All components are parsed before the
    /// value changes.
    pub fn set_components_from_text(&mut self, parts: &[(usize, &str)]) -> Result<(), ParseError> {
        let AttributeKind::NumberArray(arity) = self.kind else {
            return Err(ParseError::new(&self.name, "", "not a number array"));
        };
        let mut values = self
            .as_array()
            .map(|v| v.to_vec())
            .unwrap_or_else(|| vec![0.0; arity]);
        for (index, text) in parts {
            if *index >= arity {
                return Err(ParseError::new(
                    &self.name,
                    *text,
                    format!("component {} out of range for {} numbers", index, arity),
                ));
            }
            values[*index] = parse_number(&self.name, text.trim(), text)?;
        }
        self.value = Some(AttributeValue::NumberArray(values));
        Ok(())
    }
}

fn parse_number(attribute: &str, part: &str, whole: &str) -> Result<f64, ParseError> {
    part.parse::<f64>()
        .map_err(|_| ParseError::new(attribute, whole, format!("'{}' is not a number", part)))
}

fn describe_kind(kind: AttributeKind) -> String {
    match kind {
        AttributeKind::Text => "text".to_string(),
        AttributeKind::Number => "a number".to_string(),
        AttributeKind::NumberArray(n) => format!("{} numbers", n),
    }
}
