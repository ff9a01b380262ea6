//! Identifier types for the Patchwork domain
//!
//! Each identifier wraps a plain string so that, for example, a session id can
//! never be passed where an instance id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from anything string-like
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the string representation of the identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a route, derived from its path or supplied by the router
    RouteId
);

string_id!(
    /// Namespaced component type identifier, e.g. `ui.button`
    ComponentTypeId
);

string_id!(
    /// Identifier of a live component instance within a session
    InstanceId
);

string_id!(
    /// Identifier of a live editing session
    SessionId
);

string_id!(
    /// Stable identifier of a graph producer
    ProducerId
);

impl RouteId {
    /// Derive a route id from a route path when the router supplies none
    pub fn from_path(path: &str) -> Self {
        Self(format!("route:{}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_as_str() {
        let id = ComponentTypeId::new("ui.button");
        assert_eq!(id.to_string(), "ui.button");
        assert_eq!(id.as_str(), "ui.button");
        assert!(!id.is_empty());
        assert!(SessionId::new("").is_empty());
    }

    #[test]
    fn test_route_id_from_path() {
        assert_eq!(RouteId::from_path("/about").as_str(), "route:/about");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = InstanceId::from("inst-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"inst-1\"");

        let parsed: InstanceId = serde_json::from_str("\"inst-2\"").unwrap();
        assert_eq!(parsed, InstanceId::new("inst-2"));
    }
}
