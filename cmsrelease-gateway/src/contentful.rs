//! Contentful Management API client.
//!
//! Blocking HTTP over `ureq`. Every request carries the management token as a
//! bearer header and the vendor JSON content type. 429 responses are retried a
//! few times, honouring `X-Contentful-RateLimit-Reset`.

use std::thread::sleep;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use cmsrelease_core::config::ManagementToken;
use cmsrelease_core::{AliasRef, Entry, EnvironmentRef, ScheduledAction};

use crate::error::GatewayError;
use crate::gateway::{
    Alias, BackendGateway, ClonedEnvironment, Environment, ScheduledActionQuery, Space,
};
use crate::wire::{
    AliasUpdate, AliasWire, ApiKeyWire, Collection, EntryFields, EntryWire, EnvironmentWire,
    ScheduledActionWire, SpaceWire,
};

pub const DEFAULT_BASE_URL: &str = "https://api.contentful.com";
const CONTENT_TYPE: &str = "application/vnd.contentful.management.v1+json";
const RATE_LIMIT_RETRIES: u32 = 3;
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(10);
const ENVIRONMENT_PAGE_LIMIT: &str = "100";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// One API call, assembled before sending so it can be replayed on 429.
struct Call<'a> {
    method: Method,
    path: String,
    query: Vec<(&'a str, String)>,
    headers: Vec<(&'a str, String)>,
    body: Option<String>,
}

impl<'a> Call<'a> {
    fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn query(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    fn header(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.headers.push((key, value.into()));
        self
    }

    fn json<T: Serialize>(mut self, body: &T) -> Result<Self, GatewayError> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }
}

pub struct ContentfulClient {
    agent: ureq::Agent,
    base_url: String,
    token: ManagementToken,
}

impl ContentfulClient {
    pub fn new(token: ManagementToken) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: ManagementToken, base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("cms-release/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn send(&self, call: &Call<'_>) -> Result<ureq::Response, GatewayError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let url = format!("{}{}", self.base_url, call.path);
            let mut request = self
                .agent
                .request(call.method.as_str(), &url)
                .set("Authorization", &format!("Bearer {}", self.token.expose()))
                .set("Content-Type", CONTENT_TYPE);
            for (key, value) in &call.query {
                request = request.query(key, value);
            }
            for (key, value) in &call.headers {
                request = request.set(key, value);
            }

            tracing::trace!(method = call.method.as_str(), path = %call.path, attempt, "contentful request");
            let result = match &call.body {
                Some(body) => request.send_string(body),
                None => request.call(),
            };

            let (err, wait) = match result {
                Ok(response) => return Ok(response),
                Err(ureq::Error::Status(status, response)) => {
                    let wait = rate_limit_wait(&response);
                    let err = GatewayError::Status {
                        method: call.method.as_str(),
                        path: call.path.clone(),
                        status,
                        message: error_message(response),
                    };
                    (err, Some(wait))
                }
                Err(ureq::Error::Transport(transport)) => {
                    let err = GatewayError::Transport {
                        method: call.method.as_str(),
                        path: call.path.clone(),
                        message: transport.to_string(),
                    };
                    (err, None)
                }
            };

            match wait {
                Some(wait) if err.is_rate_limited() && attempt <= RATE_LIMIT_RETRIES => {
                    tracing::warn!(
                        path = %call.path,
                        wait_ms = wait.as_millis() as u64,
                        "rate limited by contentful, retrying",
                    );
                    sleep(wait);
                }
                _ => return Err(err),
            }
        }
    }

    fn fetch<T: DeserializeOwned>(&self, call: Call<'_>) -> Result<T, GatewayError> {
        let path = call.path.clone();
        let response = self.send(&call)?;
        let body = response.into_string().map_err(|e| GatewayError::Decode {
            path: path.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode {
            path,
            message: e.to_string(),
        })
    }

    /// Like [`Self::fetch`], with 404 mapped to `Ok(None)`.
    fn fetch_optional<T: DeserializeOwned>(&self, call: Call<'_>) -> Result<Option<T>, GatewayError> {
        match self.fetch(call) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn environment_path(space_id: &str, environment: &EnvironmentRef) -> String {
        format!("/spaces/{space_id}/environments/{environment}")
    }
}

fn rate_limit_wait(response: &ureq::Response) -> Duration {
    response
        .header("X-Contentful-RateLimit-Reset")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(1))
        .min(MAX_RATE_LIMIT_WAIT)
}

fn error_message(response: ureq::Response) -> String {
    let body = response.into_string().unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body)
}

impl BackendGateway for ContentfulClient {
    fn get_space(&self, space_id: &str) -> Result<Option<Space>, GatewayError> {
        let call = Call::new(Method::Get, format!("/spaces/{space_id}"));
        Ok(self.fetch_optional::<SpaceWire>(call)?.map(Space::from))
    }

    fn get_environment(
        &self,
        space: &Space,
        environment: &EnvironmentRef,
    ) -> Result<Option<Environment>, GatewayError> {
        let call = Call::new(Method::Get, Self::environment_path(&space.id, environment));
        Ok(self
            .fetch_optional::<EnvironmentWire>(call)?
            .map(|wire| wire.into_environment(&space.id)))
    }

    fn list_environments(&self, space: &Space) -> Result<Vec<Environment>, GatewayError> {
        let call = Call::new(Method::Get, format!("/spaces/{}/environments", space.id))
            .query("limit", ENVIRONMENT_PAGE_LIMIT);
        let listing: Collection<EnvironmentWire> = self.fetch(call)?;
        Ok(listing
            .items
            .into_iter()
            .map(|wire| wire.into_environment(&space.id))
            .collect())
    }

    fn duplicate_environment(
        &self,
        space: &Space,
        source: &EnvironmentRef,
        destination: &EnvironmentRef,
    ) -> Result<ClonedEnvironment, GatewayError> {
        let call = Call::new(Method::Put, Self::environment_path(&space.id, destination))
            .header("X-Contentful-Source-Environment", source.as_str())
            .json(&serde_json::json!({ "name": destination.as_str() }))?;
        let wire: EnvironmentWire = self.fetch(call)?;
        Ok(ClonedEnvironment::new(wire.into_environment(&space.id)))
    }

    fn probe_environment(&self, environment: &ClonedEnvironment) -> Result<(), GatewayError> {
        let env = environment.environment();
        let call = Call::new(
            Method::Get,
            format!("{}/entries", Self::environment_path(&env.space_id, &env.id)),
        )
        .query("limit", "1");
        self.send(&call).map(|_| ())
    }

    fn enable_access_key(
        &self,
        space: &Space,
        source: &EnvironmentRef,
        destination: &EnvironmentRef,
    ) -> Result<bool, GatewayError> {
        let call = Call::new(Method::Get, format!("/spaces/{}/api_keys", space.id));
        let keys: Collection<ApiKeyWire> = self.fetch(call)?;
        let Some(mut key) = keys.items.into_iter().find(|k| k.name == source.as_str()) else {
            return Ok(false);
        };
        let Some(sys) = key.sys.clone() else {
            return Err(GatewayError::Decode {
                path: format!("/spaces/{}/api_keys", space.id),
                message: format!("api key '{}' has no sys block", key.name),
            });
        };
        if !key.link_environment(destination) {
            return Ok(true);
        }
        let call = Call::new(Method::Put, format!("/spaces/{}/api_keys/{}", space.id, sys.id))
            .header("X-Contentful-Version", sys.version.to_string())
            .json(&key)?;
        self.send(&call).map(|_| true)
    }

    fn delete_environment(&self, environment: &Environment) -> Result<(), GatewayError> {
        let call = Call::new(
            Method::Delete,
            Self::environment_path(&environment.space_id, &environment.id),
        );
        self.send(&call).map(|_| ())
    }

    fn get_alias(&self, space: &Space, alias: &AliasRef) -> Result<Option<Alias>, GatewayError> {
        let call = Call::new(
            Method::Get,
            format!("/spaces/{}/environment_aliases/{alias}", space.id),
        );
        Ok(self
            .fetch_optional::<AliasWire>(call)?
            .map(|wire| wire.into_alias(&space.id)))
    }

    fn point_alias(
        &self,
        alias: &Alias,
        environment: &EnvironmentRef,
    ) -> Result<Alias, GatewayError> {
        let call = Call::new(
            Method::Put,
            format!("/spaces/{}/environment_aliases/{}", alias.space_id, alias.id),
        )
        .header("X-Contentful-Version", alias.version.to_string())
        .json(&AliasUpdate {
            environment: crate::wire::Link::environment(environment),
        })?;
        let wire: AliasWire = self.fetch(call)?;
        Ok(wire.into_alias(&alias.space_id))
    }

    fn list_scheduled_actions(
        &self,
        space: &Space,
        query: &ScheduledActionQuery,
    ) -> Result<Vec<ScheduledAction>, GatewayError> {
        let call = Call::new(Method::Get, format!("/spaces/{}/scheduled_actions", space.id))
            .query("environment.sys.id", query.environment.as_str())
            .query("sys.status", "scheduled")
            .query("limit", query.limit.to_string());
        let listing: Collection<ScheduledActionWire> = self.fetch(call)?;
        Ok(listing
            .items
            .into_iter()
            .map(ScheduledActionWire::into_action)
            .collect())
    }

    fn create_scheduled_action(
        &self,
        space: &Space,
        action: &ScheduledAction,
    ) -> Result<ScheduledAction, GatewayError> {
        let call = Call::new(Method::Post, format!("/spaces/{}/scheduled_actions", space.id))
            .json(&ScheduledActionWire::from(action))?;
        let created: ScheduledActionWire = self.fetch(call)?;
        Ok(created.into_action())
    }

    fn list_entries(
        &self,
        environment: &Environment,
        limit: u32,
    ) -> Result<Vec<Entry>, GatewayError> {
        let call = Call::new(
            Method::Get,
            format!(
                "{}/entries",
                Self::environment_path(&environment.space_id, &environment.id)
            ),
        )
        .query("limit", limit.to_string());
        let listing: Collection<EntryWire> = self.fetch(call)?;
        Ok(listing.items.into_iter().map(Entry::from).collect())
    }

    fn create_entry(&self, environment: &Environment, entry: &Entry) -> Result<Entry, GatewayError> {
        let call = Call::new(
            Method::Put,
            format!(
                "{}/entries/{}",
                Self::environment_path(&environment.space_id, &environment.id),
                entry.id
            ),
        )
        .header("X-Contentful-Content-Type", entry.content_type.as_str())
        .json(&EntryFields {
            fields: &entry.fields,
        })?;
        let created: EntryWire = self.fetch(call)?;
        Ok(Entry::from(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ContentfulClient::with_base_url(
            ManagementToken::new("t"),
            "https://example.test/",
        );
        assert_eq!(client.base_url, "https://example.test");
    }

    #[test]
    fn environment_path_layout() {
        assert_eq!(
            ContentfulClient::environment_path("sp", &EnvironmentRef::from("release-1")),
            "/spaces/sp/environments/release-1"
        );
    }

    #[test]
    fn call_builder_collects_parts() {
        let call = Call::new(Method::Post, "/x".to_string())
            .query("limit", "1")
            .header("X-Contentful-Version", "3")
            .json(&serde_json::json!({ "a": 1 }))
            .expect("json");
        assert_eq!(call.method.as_str(), "POST");
        assert_eq!(call.query, vec![("limit", "1".to_string())]);
        assert_eq!(call.headers[0].1, "3");
        assert_eq!(call.body.as_deref(), Some(r#"{"a":1}"#));
    }
}
