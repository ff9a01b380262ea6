//! Persisted overrides document
//!
//! One document per workspace. Overrides are grouped by target kind rather
//! than by session, and each group is sorted by (instance id, path) so that
//! the same logical set always renders to the same bytes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use patchwork_core::{InstanceId, Override, OverrideTarget, PropertyPath, SchemaVersion};

/// Overrides of one target kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideGroup {
    /// Overrides sorted by (instance id, path)
    pub overrides: Vec<Override>,
}

/// The on-disk overrides document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridesDocument {
    /// Document schema version
    pub schema_version: SchemaVersion,
    /// Time of the write
    pub updated_at: DateTime<Utc>,
    /// Whole-app overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<OverrideGroup>,
    /// Single-component overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<OverrideGroup>,
}

impl OverridesDocument {
    /// Build a document from target-tagged overrides
    ///
    /// When two entries share a target, instance and path, the later one wins.
    pub fn build<I>(entries: I, updated_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (OverrideTarget, Override)>,
    {
        let mut app: BTreeMap<(InstanceId, PropertyPath), Override> = BTreeMap::new();
        let mut component: BTreeMap<(InstanceId, PropertyPath), Override> = BTreeMap::new();

        for (target, entry) in entries {
            let key = (entry.instance_id.clone(), entry.path.clone());
            match target {
                OverrideTarget::App => app.insert(key, entry),
                OverrideTarget::Component => component.insert(key, entry),
            };
        }

        let group = |map: BTreeMap<_, Override>| {
            (!map.is_empty()).then(|| OverrideGroup {
                overrides: map.into_values().collect(),
            })
        };

        Self {
            schema_version: SchemaVersion::V0,
            updated_at,
            app: group(app),
            component: group(component),
        }
    }

    /// All overrides with their target kind, app group first
    pub fn entries(&self) -> impl Iterator<Item = (OverrideTarget, &Override)> {
        let app = self
            .app
            .iter()
            .flat_map(|group| group.overrides.iter().map(|o| (OverrideTarget::App, o)));
        let component = self.component.iter().flat_map(|group| {
            group
                .overrides
                .iter()
                .map(|o| (OverrideTarget::Component, o))
        });
        app.chain(component)
    }
}

/// Serialize a document to its canonical byte form
pub fn render_overrides_file(document: &OverridesDocument) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(document)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a persisted document
pub fn parse_overrides_file(bytes: &[u8]) -> Result<OverridesDocument, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn entry(instance: &str, path: &str, value: Value) -> Override {
        Override {
            instance_id: InstanceId::new(instance),
            path: PropertyPath::parse(path).unwrap(),
            value,
            component_type_id: None,
            instance_locator: None,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_render_is_independent_of_insertion_order() {
        let entries = vec![
            (OverrideTarget::App, entry("b", "/color", json!("red"))),
            (OverrideTarget::App, entry("a", "/size", json!(2))),
            (OverrideTarget::Component, entry("c", "/label", json!("Hi"))),
            (OverrideTarget::App, entry("a", "/color", json!({ "z": 1, "a": 2 }))),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();

        let first =
            render_overrides_file(&OverridesDocument::build(entries, fixed_time())).unwrap();
        let second =
            render_overrides_file(&OverridesDocument::build(reversed, fixed_time())).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_groups_are_sorted_and_empty_groups_omitted() {
        let document = OverridesDocument::build(
            vec![
                (OverrideTarget::App, entry("b", "/x", json!(1))),
                (OverrideTarget::App, entry("a", "/y", json!(2))),
                (OverrideTarget::App, entry("a", "/x", json!(3))),
            ],
            fixed_time(),
        );

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(
            value,
            json!({
                "schemaVersion": "v0",
                "updatedAt": "2026-01-02T03:04:05Z",
                "app": {
                    "overrides": [
                        { "instanceId": "a", "path": "/x", "value": 3 },
                        { "instanceId": "a", "path": "/y", "value": 2 },
                        { "instanceId": "b", "path": "/x", "value": 1 }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_later_duplicate_wins() {
        let document = OverridesDocument::build(
            vec![
                (OverrideTarget::Component, entry("a", "/x", json!("old"))),
                (OverrideTarget::Component, entry("a", "/x", json!("new"))),
            ],
            fixed_time(),
        );

        let entries: Vec<_> = document.entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.value, json!("new"));
    }

    #[test]
    fn test_parse_round_trip_preserves_targets() {
        let document = OverridesDocument::build(
            vec![
                (OverrideTarget::Component, entry("c", "/label", json!("Hi"))),
                (OverrideTarget::App, entry("a", "/size", json!(2))),
            ],
            fixed_time(),
        );

        let parsed = parse_overrides_file(&render_overrides_file(&document).unwrap()).unwrap();
        let targets: Vec<_> = parsed.entries().map(|(target, _)| target).collect();
        assert_eq!(targets, vec![OverrideTarget::App, OverrideTarget::Component]);
        assert_eq!(parsed, document);
    }
}
