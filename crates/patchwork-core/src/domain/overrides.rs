//! Property override model
//!
//! An override replaces one property value of one live component instance.
//! Overrides are addressed by instance id plus a JSON-Pointer-style property
//! path, and are mutated through batches of [`OverrideOp`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::ids::{ComponentTypeId, InstanceId, SessionId};
use crate::CoreError;

/// JSON-Pointer-style property path, e.g. `/style/color`
///
/// The empty path addresses the whole property bag; every other path starts
/// with `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyPath(String);

impl PropertyPath {
    /// Parse and validate a property path
    pub fn parse(path: impl Into<String>) -> Result<Self, CoreError> {
        let path = path.into();
        if !path.is_empty() && !path.starts_with('/') {
            return Err(CoreError::ValidationError(format!(
                "property path must be empty or start with '/': {:?}",
                path
            )));
        }

        // '~' may only introduce the escapes '~0' and '~1'
        let mut chars = path.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '~' && !matches!(chars.peek(), Some('0') | Some('1')) {
                return Err(CoreError::ValidationError(format!(
                    "invalid '~' escape in property path: {:?}",
                    path
                )));
            }
        }

        Ok(Self(path))
    }

    /// Get the string representation of the path
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = CoreError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::parse(path)
    }
}

impl From<PropertyPath> for String {
    fn from(path: PropertyPath) -> Self {
        path.0
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of thing a session is editing
///
/// Persisted overrides are grouped by target kind rather than by session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideTarget {
    /// The whole application
    App,
    /// A single component rendered in isolation
    Component,
}

impl fmt::Display for OverrideTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideTarget::App => write!(f, "app"),
            OverrideTarget::Component => write!(f, "component"),
        }
    }
}

/// Opaque, promoter-defined hint for re-finding an instance in source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceLocator(pub Value);

/// A single property override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    /// Instance the override applies to
    pub instance_id: InstanceId,
    /// Property path within the instance
    pub path: PropertyPath,
    /// Replacement value
    pub value: Value,
    /// Component type of the instance, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type_id: Option<ComponentTypeId>,
    /// Locator used to re-find the instance in source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_locator: Option<InstanceLocator>,
}

impl Override {
    /// The equivalent `set` operation
    pub fn to_set_op(&self) -> OverrideOp {
        OverrideOp::Set {
            instance_id: self.instance_id.clone(),
            path: self.path.clone(),
            value: self.value.clone(),
            component_type_id: self.component_type_id.clone(),
            instance_locator: self.instance_locator.clone(),
        }
    }
}

/// An override tagged with the session and target it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOverride {
    /// Owning session
    pub session_id: SessionId,
    /// Target kind of the session
    pub target: OverrideTarget,
    /// The override itself
    #[serde(flatten)]
    pub entry: Override,
}

/// Override mutation, applied in batch order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OverrideOp {
    /// Set (or replace) the override at `instance_id` + `path`
    Set {
        /// Target instance
        instance_id: InstanceId,
        /// Property path
        path: PropertyPath,
        /// New value
        value: Value,
        /// Component type of the instance
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component_type_id: Option<ComponentTypeId>,
        /// Locator for promotion
        #[serde(default, skip_serializing_if = "Option::is_none")]
        instance_locator: Option<InstanceLocator>,
    },
    /// Remove the override at `instance_id` + `path`
    Clear {
        /// Target instance
        instance_id: InstanceId,
        /// Property path
        path: PropertyPath,
    },
    /// Remove every override of an instance
    ClearInstance {
        /// Target instance
        instance_id: InstanceId,
    },
    /// Remove every override in the session
    ClearAll,
}

impl OverrideOp {
    /// Shorthand for a plain `set` without type or locator
    pub fn set(instance_id: impl Into<InstanceId>, path: PropertyPath, value: Value) -> Self {
        OverrideOp::Set {
            instance_id: instance_id.into(),
            path,
            value,
            component_type_id: None,
            instance_locator: None,
        }
    }

    /// Shorthand for a `clear`
    pub fn clear(instance_id: impl Into<InstanceId>, path: PropertyPath) -> Self {
        OverrideOp::Clear {
            instance_id: instance_id.into(),
            path,
        }
    }

    /// The instance the operation addresses, if any
    pub fn instance_id(&self) -> Option<&InstanceId> {
        match self {
            OverrideOp::Set { instance_id, .. }
            | OverrideOp::Clear { instance_id, .. }
            | OverrideOp::ClearInstance { instance_id } => Some(instance_id),
            OverrideOp::ClearAll => None,
        }
    }

    /// Structural validation, independent of store state
    pub fn validate(&self) -> Result<(), CoreError> {
        match self.instance_id() {
            Some(instance_id) if instance_id.is_empty() => Err(CoreError::ValidationError(
                "override operation has an empty instance id".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_property_path_validation() {
        assert!(PropertyPath::parse("").is_ok());
        assert!(PropertyPath::parse("/style/color").is_ok());
        assert!(PropertyPath::parse("/a~1b/c~0d").is_ok());
        assert!(PropertyPath::parse("style").is_err());
        assert!(PropertyPath::parse("/bad~2escape").is_err());
        assert!(PropertyPath::parse("/trailing~").is_err());
    }

    #[test]
    fn test_op_wire_shape() {
        let op: OverrideOp = serde_json::from_value(json!({
            "op": "set",
            "instanceId": "inst-1",
            "path": "/label",
            "value": "Save",
            "componentTypeId": "ui.button"
        }))
        .unwrap();

        assert_eq!(
            op,
            OverrideOp::Set {
                instance_id: InstanceId::new("inst-1"),
                path: PropertyPath::parse("/label").unwrap(),
                value: json!("Save"),
                component_type_id: Some(ComponentTypeId::new("ui.button")),
                instance_locator: None,
            }
        );

        let clear_all: OverrideOp = serde_json::from_value(json!({ "op": "clearAll" })).unwrap();
        assert_eq!(clear_all, OverrideOp::ClearAll);
    }

    #[test]
    fn test_invalid_path_fails_deserialization() {
        let result: Result<OverrideOp, _> = serde_json::from_value(json!({
            "op": "clear",
            "instanceId": "inst-1",
            "path": "label"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_instance() {
        let op = OverrideOp::clear("", PropertyPath::parse("/x").unwrap());
        assert!(matches!(op.validate(), Err(CoreError::ValidationError(_))));
        assert!(OverrideOp::ClearAll.validate().is_ok());
    }

    #[test]
    fn test_session_override_flattens_entry() {
        let tagged = SessionOverride {
            session_id: SessionId::new("s1"),
            target: OverrideTarget::Component,
            entry: Override {
                instance_id: InstanceId::new("i1"),
                path: PropertyPath::parse("/size").unwrap(),
                value: json!(3),
                component_type_id: None,
                instance_locator: None,
            },
        };

        assert_eq!(
            serde_json::to_value(&tagged).unwrap(),
            json!({
                "sessionId": "s1",
                "target": "component",
                "instanceId": "i1",
                "path": "/size",
                "value": 3
            })
        );
    }
}
