//! In-process [`BackendGateway`] with scriptable failures and a call log.
//!
//! Clones start `queued`; each probe pops the next scripted outcome
//! (`true` = queryable) and falls back to "ready" once the script runs out.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use cmsrelease_core::{AliasRef, Entry, EnvironmentRef, ScheduledAction};

use crate::error::GatewayError;
use crate::gateway::{
    Alias, BackendGateway, ClonedEnvironment, Environment, EnvironmentStatus,
    ScheduledActionQuery, Space,
};

#[derive(Debug, Default)]
struct State {
    environments: BTreeMap<String, EnvironmentRecord>,
    aliases: BTreeMap<String, AliasRecord>,
    api_keys: BTreeMap<String, Vec<EnvironmentRef>>,
    scheduled_actions: Vec<ScheduledAction>,
    next_action_id: u64,
    probe_script: VecDeque<bool>,
    fail_duplicate: bool,
    fail_listing: HashSet<String>,
    fail_create_for_entity: HashSet<String>,
    fail_delete: HashSet<String>,
    calls: Vec<String>,
}

#[derive(Debug, Clone)]
struct EnvironmentRecord {
    version: u64,
    status: EnvironmentStatus,
    entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
struct AliasRecord {
    version: u64,
    environment: EnvironmentRef,
}

#[derive(Debug)]
pub struct MemoryGateway {
    space: Space,
    state: Mutex<State>,
}

impl MemoryGateway {
    pub fn new(space_id: &str) -> Self {
        Self {
            space: Space {
                id: space_id.to_string(),
                name: format!("{space_id} (memory)"),
            },
            state: Mutex::new(State {
                next_action_id: 1,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: impl Into<String>) {
        self.state().calls.push(call.into());
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    pub fn with_environment(self, id: &str) -> Self {
        self.state().environments.insert(
            id.to_string(),
            EnvironmentRecord {
                version: 1,
                status: EnvironmentStatus::Ready,
                entries: Vec::new(),
            },
        );
        self
    }

    pub fn with_alias(self, alias: &str, environment: &str) -> Self {
        self.state().aliases.insert(
            alias.to_string(),
            AliasRecord {
                version: 1,
                environment: EnvironmentRef::from(environment),
            },
        );
        self
    }

    pub fn with_api_key(self, name: &str, environments: &[&str]) -> Self {
        self.state().api_keys.insert(
            name.to_string(),
            environments.iter().map(|e| EnvironmentRef::from(*e)).collect(),
        );
        self
    }

    pub fn with_scheduled_action(self, action: ScheduledAction) -> Self {
        {
            let mut state = self.state();
            let mut action = action;
            if action.id.is_none() {
                action.id = Some(format!("sa-{}", state.next_action_id));
                state.next_action_id += 1;
            }
            state.scheduled_actions.push(action);
        }
        self
    }

    pub fn with_entry(self, environment: &str, entry: Entry) -> Self {
        if let Some(record) = self.state().environments.get_mut(environment) {
            record.entries.push(entry);
        }
        self
    }

    /// Outcomes for successive probes; `false` means "still provisioning".
    pub fn script_probes(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.state().probe_script.extend(outcomes);
        self
    }

    pub fn fail_duplicate(self) -> Self {
        self.state().fail_duplicate = true;
        self
    }

    /// Make scheduled-action and entry listings for `environment` fail.
    pub fn fail_listing(self, environment: &str) -> Self {
        self.state().fail_listing.insert(environment.to_string());
        self
    }

    pub fn fail_create_for_entity(self, entity_id: &str) -> Self {
        self.state()
            .fail_create_for_entity
            .insert(entity_id.to_string());
        self
    }

    pub fn fail_delete(self, environment: &str) -> Self {
        self.state().fail_delete.insert(environment.to_string());
        self
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Every gateway call so far, as `name` or `name:argument`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn probe_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with("probe_environment"))
            .count()
    }

    pub fn environment_ids(&self) -> Vec<String> {
        self.state().environments.keys().cloned().collect()
    }

    pub fn alias_target(&self, alias: &str) -> Option<EnvironmentRef> {
        self.state()
            .aliases
            .get(alias)
            .map(|record| record.environment.clone())
    }

    pub fn api_key_environments(&self, name: &str) -> Vec<EnvironmentRef> {
        self.state().api_keys.get(name).cloned().unwrap_or_default()
    }

    pub fn scheduled_actions_in(&self, environment: &str) -> Vec<ScheduledAction> {
        self.state()
            .scheduled_actions
            .iter()
            .filter(|a| a.environment.as_str() == environment)
            .cloned()
            .collect()
    }

    pub fn entries_in(&self, environment: &str) -> Vec<Entry> {
        self.state()
            .environments
            .get(environment)
            .map(|record| record.entries.clone())
            .unwrap_or_default()
    }

    fn to_environment(&self, id: &str, record: &EnvironmentRecord) -> Environment {
        Environment {
            space_id: self.space.id.clone(),
            id: EnvironmentRef::from(id),
            version: record.version,
            status: record.status.clone(),
            aliased_environment: None,
        }
    }

    fn check_space(&self, space: &Space) -> Result<(), GatewayError> {
        if space.id == self.space.id {
            Ok(())
        } else {
            Err(GatewayError::Unavailable(format!("unknown space '{}'", space.id)))
        }
    }
}

impl BackendGateway for MemoryGateway {
    fn get_space(&self, space_id: &str) -> Result<Option<Space>, GatewayError> {
        self.record(format!("get_space:{space_id}"));
        Ok((space_id == self.space.id).then(|| self.space.clone()))
    }

    fn get_environment(
        &self,
        space: &Space,
        environment: &EnvironmentRef,
    ) -> Result<Option<Environment>, GatewayError> {
        self.record(format!("get_environment:{environment}"));
        self.check_space(space)?;
        let state = self.state();
        Ok(state
            .environments
            .get(environment.as_str())
            .map(|record| self.to_environment(environment.as_str(), record)))
    }

    fn list_environments(&self, space: &Space) -> Result<Vec<Environment>, GatewayError> {
        self.record("list_environments");
        self.check_space(space)?;
        let state = self.state();
        let mut listing: Vec<Environment> = state
            .environments
            .iter()
            .map(|(id, record)| self.to_environment(id, record))
            .collect();
        listing.extend(state.aliases.iter().map(|(id, alias)| Environment {
            space_id: self.space.id.clone(),
            id: EnvironmentRef::from(id.as_str()),
            version: alias.version,
            status: EnvironmentStatus::Ready,
            aliased_environment: Some(alias.environment.clone()),
        }));
        Ok(listing)
    }

    fn duplicate_environment(
        &self,
        space: &Space,
        source: &EnvironmentRef,
        destination: &EnvironmentRef,
    ) -> Result<ClonedEnvironment, GatewayError> {
        self.record(format!("duplicate_environment:{source}->{destination}"));
        self.check_space(space)?;
        let mut state = self.state();
        if state.fail_duplicate {
            return Err(GatewayError::Unavailable(format!(
                "clone of '{source}' rejected"
            )));
        }
        if state.environments.contains_key(destination.as_str()) {
            return Err(GatewayError::Status {
                method: "PUT",
                path: format!("/environments/{destination}"),
                status: 409,
                message: "environment already exists".to_string(),
            });
        }
        let entries = state
            .environments
            .get(source.as_str())
            .map(|record| record.entries.clone())
            .ok_or_else(|| GatewayError::Unavailable(format!("unknown source '{source}'")))?;
        let record = EnvironmentRecord {
            version: 1,
            status: EnvironmentStatus::Queued,
            entries,
        };
        let environment = self.to_environment(destination.as_str(), &record);
        state
            .environments
            .insert(destination.as_str().to_string(), record);
        Ok(ClonedEnvironment::new(environment))
    }

    fn probe_environment(&self, environment: &ClonedEnvironment) -> Result<(), GatewayError> {
        self.record(format!("probe_environment:{}", environment.id()));
        let mut state = self.state();
        let ready = state.probe_script.pop_front().unwrap_or(true);
        if !ready {
            return Err(GatewayError::Unavailable(format!(
                "environment '{}' is still provisioning",
                environment.id()
            )));
        }
        if let Some(record) = state.environments.get_mut(environment.id().as_str()) {
            record.status = EnvironmentStatus::Ready;
        }
        Ok(())
    }

    fn enable_access_key(
        &self,
        space: &Space,
        source: &EnvironmentRef,
        destination: &EnvironmentRef,
    ) -> Result<bool, GatewayError> {
        self.record(format!("enable_access_key:{source}->{destination}"));
        self.check_space(space)?;
        let mut state = self.state();
        let Some(environments) = state.api_keys.get_mut(source.as_str()) else {
            return Ok(false);
        };
        if !environments.contains(destination) {
            environments.push(destination.clone());
        }
        Ok(true)
    }

    fn delete_environment(&self, environment: &Environment) -> Result<(), GatewayError> {
        self.record(format!("delete_environment:{}", environment.id));
        let mut state = self.state();
        if state.fail_delete.contains(environment.id.as_str()) {
            return Err(GatewayError::Unavailable(format!(
                "delete of '{}' rejected",
                environment.id
            )));
        }
        state
            .environments
            .remove(environment.id.as_str())
            .map(|_| ())
            .ok_or_else(|| GatewayError::Status {
                method: "DELETE",
                path: format!("/environments/{}", environment.id),
                status: 404,
                message: "not found".to_string(),
            })
    }

    fn get_alias(&self, space: &Space, alias: &AliasRef) -> Result<Option<Alias>, GatewayError> {
        self.record(format!("get_alias:{alias}"));
        self.check_space(space)?;
        Ok(self.state().aliases.get(&alias.0).map(|record| Alias {
            space_id: self.space.id.clone(),
            id: alias.clone(),
            version: record.version,
            environment: record.environment.clone(),
        }))
    }

    fn point_alias(
        &self,
        alias: &Alias,
        environment: &EnvironmentRef,
    ) -> Result<Alias, GatewayError> {
        self.record(format!("point_alias:{}->{environment}", alias.id));
        let mut state = self.state();
        if !state.environments.contains_key(environment.as_str()) {
            return Err(GatewayError::Unavailable(format!(
                "unknown environment '{environment}'"
            )));
        }
        let record = state
            .aliases
            .get_mut(&alias.id.0)
            .ok_or_else(|| GatewayError::Unavailable(format!("unknown alias '{}'", alias.id)))?;
        if record.version != alias.version {
            return Err(GatewayError::Status {
                method: "PUT",
                path: format!("/environment_aliases/{}", alias.id),
                status: 409,
                message: "version mismatch".to_string(),
            });
        }
        record.version += 1;
        record.environment = environment.clone();
        Ok(Alias {
            space_id: alias.space_id.clone(),
            id: alias.id.clone(),
            version: record.version,
            environment: environment.clone(),
        })
    }

    fn list_scheduled_actions(
        &self,
        space: &Space,
        query: &ScheduledActionQuery,
    ) -> Result<Vec<ScheduledAction>, GatewayError> {
        self.record(format!("list_scheduled_actions:{}", query.environment));
        self.check_space(space)?;
        let state = self.state();
        if state.fail_listing.contains(query.environment.as_str()) {
            return Err(GatewayError::Unavailable(format!(
                "listing scheduled actions of '{}' failed",
                query.environment
            )));
        }
        if !state.environments.contains_key(query.environment.as_str()) {
            return Err(GatewayError::Status {
                method: "GET",
                path: "/scheduled_actions".to_string(),
                status: 404,
                message: format!("environment '{}' not found", query.environment),
            });
        }
        Ok(state
            .scheduled_actions
            .iter()
            .filter(|a| a.environment == query.environment)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    fn create_scheduled_action(
        &self,
        space: &Space,
        action: &ScheduledAction,
    ) -> Result<ScheduledAction, GatewayError> {
        self.record(format!("create_scheduled_action:{}", action.entity_id));
        self.check_space(space)?;
        let mut state = self.state();
        if state.fail_create_for_entity.contains(&action.entity_id) {
            return Err(GatewayError::Status {
                method: "POST",
                path: "/scheduled_actions".to_string(),
                status: 422,
                message: format!("entity '{}' cannot be scheduled", action.entity_id),
            });
        }
        let mut created = action.clone();
        created.id = Some(format!("sa-{}", state.next_action_id));
        state.next_action_id += 1;
        state.scheduled_actions.push(created.clone());
        Ok(created)
    }

    fn list_entries(
        &self,
        environment: &Environment,
        limit: u32,
    ) -> Result<Vec<Entry>, GatewayError> {
        self.record(format!("list_entries:{}", environment.id));
        let state = self.state();
        if state.fail_listing.contains(environment.id.as_str()) {
            return Err(GatewayError::Unavailable(format!(
                "listing entries of '{}' failed",
                environment.id
            )));
        }
        state
            .environments
            .get(environment.id.as_str())
            .map(|record| record.entries.iter().take(limit as usize).cloned().collect())
            .ok_or_else(|| GatewayError::Unavailable(format!("unknown '{}'", environment.id)))
    }

    fn create_entry(&self, environment: &Environment, entry: &Entry) -> Result<Entry, GatewayError> {
        self.record(format!("create_entry:{}", entry.id));
        let mut state = self.state();
        if state.fail_create_for_entity.contains(&entry.id) {
            return Err(GatewayError::Status {
                method: "PUT",
                path: format!("/entries/{}", entry.id),
                status: 422,
                message: "validation failed".to_string(),
            });
        }
        let record = state
            .environments
            .get_mut(environment.id.as_str())
            .ok_or_else(|| GatewayError::Unavailable(format!("unknown '{}'", environment.id)))?;
        record.entries.push(entry.clone());
        Ok(entry.clone())
    }
}
