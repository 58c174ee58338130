//! Contentful Management API JSON shapes and their mapping to domain types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cmsrelease_core::{AliasRef, Entry, EnvironmentRef, ScheduledAction, ScheduledActionKind};

use crate::gateway::{Alias, Environment, EnvironmentStatus, Space};

#[derive(Debug, Deserialize)]
pub(crate) struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Link {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LinkSys {
    #[serde(rename = "type", default = "link_type_name")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    pub id: String,
}

fn link_type_name() -> String {
    "Link".to_string()
}

impl Link {
    pub fn to(link_type: &str, id: &str) -> Self {
        Link {
            sys: LinkSys {
                kind: link_type_name(),
                link_type: Some(link_type.to_string()),
                id: id.to_string(),
            },
        }
    }

    pub fn environment(id: &EnvironmentRef) -> Self {
        Link::to("Environment", id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Spaces, environments, aliases
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct SpaceWire {
    pub sys: IdSys,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdSys {
    pub id: String,
    #[serde(default)]
    pub version: u64,
}

impl From<SpaceWire> for Space {
    fn from(wire: SpaceWire) -> Self {
        Space {
            id: wire.sys.id,
            name: wire.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvironmentWire {
    pub sys: EnvironmentSys,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnvironmentSys {
    pub id: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub status: Option<Link>,
    #[serde(default)]
    pub aliased_environment: Option<Link>,
}

impl EnvironmentWire {
    pub fn into_environment(self, space_id: &str) -> Environment {
        let status = self
            .sys
            .status
            .map(|link| EnvironmentStatus::from_backend(&link.sys.id))
            .unwrap_or(EnvironmentStatus::Ready);
        Environment {
            space_id: space_id.to_string(),
            id: EnvironmentRef::from(self.sys.id),
            version: self.sys.version,
            status,
            aliased_environment: self
                .sys
                .aliased_environment
                .map(|link| EnvironmentRef::from(link.sys.id)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AliasWire {
    pub sys: IdSys,
    pub environment: Link,
}

impl AliasWire {
    pub fn into_alias(self, space_id: &str) -> Alias {
        Alias {
            space_id: space_id.to_string(),
            id: AliasRef::from(self.sys.id),
            version: self.sys.version,
            environment: EnvironmentRef::from(self.environment.sys.id),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AliasUpdate {
    pub environment: Link,
}

// ---------------------------------------------------------------------------
// API keys
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ApiKeyWire {
    #[serde(skip_serializing)]
    pub sys: Option<IdSys>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub environments: Vec<Link>,
}

impl ApiKeyWire {
    /// Adds `environment`; `false` if it was already linked.
    pub fn link_environment(&mut self, environment: &EnvironmentRef) -> bool {
        if self
            .environments
            .iter()
            .any(|link| link.sys.id == environment.as_str())
        {
            return false;
        }
        self.environments.push(Link::environment(environment));
        true
    }
}

// ---------------------------------------------------------------------------
// Scheduled actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScheduledActionWire {
    #[serde(default, skip_serializing)]
    pub sys: Option<IdSys>,
    pub entity: Link,
    pub environment: Link,
    pub scheduled_for: ScheduledForWire,
    pub action: ScheduledActionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ScheduledForWire {
    pub datetime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl ScheduledActionWire {
    pub fn into_action(self) -> ScheduledAction {
        ScheduledAction {
            id: self.sys.map(|sys| sys.id),
            entity_id: self.entity.sys.id,
            entity_link_type: self.entity.sys.link_type.unwrap_or_default(),
            action: self.action,
            scheduled_for: self.scheduled_for.datetime,
            timezone: self.scheduled_for.timezone,
            environment: EnvironmentRef::from(self.environment.sys.id),
        }
    }
}

impl From<&ScheduledAction> for ScheduledActionWire {
    fn from(action: &ScheduledAction) -> Self {
        ScheduledActionWire {
            sys: None,
            entity: Link::to(&action.entity_link_type, &action.entity_id),
            environment: Link::environment(&action.environment),
            scheduled_for: ScheduledForWire {
                datetime: action.scheduled_for.clone(),
                timezone: action.timezone.clone(),
            },
            action: action.action,
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct EntryWire {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EntrySys {
    pub id: String,
    pub content_type: Link,
}

impl From<EntryWire> for Entry {
    fn from(wire: EntryWire) -> Self {
        Entry {
            id: wire.sys.id,
            content_type: wire.sys.content_type.sys.id,
            fields: wire.fields,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EntryFields<'a> {
    pub fields: &'a Value,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scheduled_action_from_backend_json() {
        let raw = json!({
            "sys": { "id": "sa-9", "type": "ScheduledAction", "status": "scheduled" },
            "entity": { "sys": { "type": "Link", "linkType": "Entry", "id": "entry-a" } },
            "environment": { "sys": { "type": "Link", "linkType": "Environment", "id": "release-1" } },
            "scheduledFor": { "datetime": "2024-01-01T10:00:00.000Z", "timezone": "UTC" },
            "action": "publish"
        });
        let wire: ScheduledActionWire = serde_json::from_value(raw).expect("decode");
        let action = wire.into_action();
        assert_eq!(action.id.as_deref(), Some("sa-9"));
        assert_eq!(action.entity_link_type, "Entry");
        assert_eq!(action.action, ScheduledActionKind::Publish);
        assert_eq!(action.timezone.as_deref(), Some("UTC"));
        assert_eq!(action.environment.as_str(), "release-1");
    }

    #[test]
    fn create_payload_links_destination_environment() {
        let action = ScheduledAction {
            id: Some("sa-9".to_string()),
            entity_id: "entry-a".to_string(),
            entity_link_type: "Entry".to_string(),
            action: ScheduledActionKind::Unpublish,
            scheduled_for: "2024-02-01T00:00:00.000Z".to_string(),
            timezone: None,
            environment: EnvironmentRef::from("master"),
        };
        let payload = serde_json::to_value(ScheduledActionWire::from(&action)).expect("encode");
        assert_eq!(
            payload,
            json!({
                "entity": { "sys": { "type": "Link", "linkType": "Entry", "id": "entry-a" } },
                "environment": { "sys": { "type": "Link", "linkType": "Environment", "id": "master" } },
                "scheduledFor": { "datetime": "2024-02-01T00:00:00.000Z" },
                "action": "unpublish"
            })
        );
    }

    #[test]
    fn environment_listing_marks_aliases() {
        let raw = json!({
            "items": [
                { "sys": { "id": "release-2", "version": 3,
                    "status": { "sys": { "type": "Link", "linkType": "Status", "id": "ready" } } } },
                { "sys": { "id": "master", "version": 1,
                    "aliasedEnvironment": { "sys": { "type": "Link", "linkType": "Environment", "id": "release-2" } } } }
            ]
        });
        let listing: Collection<EnvironmentWire> = serde_json::from_value(raw).expect("decode");
        let environments: Vec<Environment> = listing
            .items
            .into_iter()
            .map(|wire| wire.into_environment("space"))
            .collect();
        assert!(!environments[0].is_alias());
        assert_eq!(environments[0].status, EnvironmentStatus::Ready);
        assert_eq!(
            environments[1].aliased_environment,
            Some(EnvironmentRef::from("release-2"))
        );
    }

    #[test]
    fn api_key_link_is_added_once() {
        let mut key: ApiKeyWire = serde_json::from_value(json!({
            "sys": { "id": "key-1", "version": 4 },
            "name": "master",
            "environments": [ { "sys": { "type": "Link", "linkType": "Environment", "id": "master" } } ]
        }))
        .expect("decode");
        assert!(key.link_environment(&EnvironmentRef::from("release-3")));
        assert!(!key.link_environment(&EnvironmentRef::from("release-3")));
        let body = serde_json::to_value(&key).expect("encode");
        assert!(body.get("sys").is_none());
        assert_eq!(body["environments"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn entry_from_backend_json() {
        let wire: EntryWire = serde_json::from_value(json!({
            "sys": { "id": "e1", "contentType": { "sys": { "type": "Link", "linkType": "ContentType", "id": "page" } } },
            "fields": { "title": { "en-US": "Hello" } }
        }))
        .expect("decode");
        let entry = Entry::from(wire);
        assert_eq!(entry.content_type, "page");
        assert_eq!(entry.fields["title"]["en-US"], "Hello");
    }
}
