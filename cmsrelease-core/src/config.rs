//! Invocation configuration.
//!
//! # Sources, highest precedence first
//!
//! ```text
//! CLI flags / CMS_* environment variables   (collected by the CLI)
//! settings file (YAML)                       (Settings::load_at / discover_at)
//! built-in defaults                          (this module)
//! ```
//!
//! Everything funnels into [`SyncConfigBuilder::build`], which returns an
//! immutable [`SyncConfig`] or a [`ConfigurationError`]. Addressing mistakes
//! surface here, before any backend call is made.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigurationError, GuardViolation};
use crate::policy::{
    PollPolicy, ProtectedEnvironmentSet, ReleaseNamingPolicy, DEFAULT_PROTECTED_ENVIRONMENTS,
    DEFAULT_RELEASE_REGEX,
};
use crate::types::{AliasRef, EnvironmentRef, OperationKind};

pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_MAIN_ENVIRONMENT: &str = "master";
pub const DEFAULT_MAX_SCHEDULED_ACTIONS: u32 = 500;
pub const DEFAULT_MAX_ENTRIES: u32 = 1000;
pub const SETTINGS_FILE_NAME: &str = "cms-release.yaml";

const ADDRESSING_HINT: &str =
    "Only one of the two options '--environment-id' or '--from/--to' should be specified";

// ---------------------------------------------------------------------------
// 1. Addressing
// ---------------------------------------------------------------------------

/// Raw environment addressing flags as the user typed them.
///
/// Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Addressing {
    pub from: Option<String>,
    pub to: Option<String>,
    pub environment_id: Option<String>,
}

/// Environments an operation acts on, after addressing resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Clone or sync: read `source`, write `destination`.
    Pair {
        source: EnvironmentRef,
        destination: EnvironmentRef,
    },
    /// Link or delete: a single environment.
    Single(EnvironmentRef),
}

impl Target {
    /// The environment written to (or linked, or deleted).
    pub fn destination(&self) -> &EnvironmentRef {
        match self {
            Target::Pair { destination, .. } => destination,
            Target::Single(environment) => environment,
        }
    }

    pub fn source(&self) -> Option<&EnvironmentRef> {
        match self {
            Target::Pair { source, .. } => Some(source),
            Target::Single(_) => None,
        }
    }
}

impl Addressing {
    /// Resolve the flags into a [`Target`] for `operation`.
    ///
    /// Exactly one scheme (`--from`/`--to` or `--environment-id`) must be used.
    pub fn resolve(
        &self,
        operation: OperationKind,
        main_environment: &EnvironmentRef,
    ) -> Result<Target, GuardViolation> {
        let from = non_empty(self.from.as_deref());
        let to = non_empty(self.to.as_deref());
        let id = non_empty(self.environment_id.as_deref());

        let uses_pair = from.is_some() || to.is_some();
        if uses_pair == id.is_some() {
            return Err(GuardViolation::ambiguous(ADDRESSING_HINT));
        }

        if from.is_some() && to.is_some() && !operation.is_pair() {
            return Err(GuardViolation::ambiguous(format!(
                "{operation} acts on one environment: pass '--from' or '--to', not both"
            )));
        }

        let target = match operation {
            OperationKind::Duplicate => {
                let destination = to.or(id).ok_or_else(|| {
                    GuardViolation::ambiguous(
                        "duplicate needs a destination: pass '--to' or '--environment-id'",
                    )
                })?;
                Target::Pair {
                    source: from.map_or_else(|| main_environment.clone(), EnvironmentRef::from),
                    destination: EnvironmentRef::from(destination),
                }
            }
            OperationKind::SyncEntries | OperationKind::SyncSchedule => {
                let source = from.or(id).ok_or_else(|| {
                    GuardViolation::ambiguous(format!(
                        "{operation} needs a source: pass '--from' or '--environment-id'"
                    ))
                })?;
                Target::Pair {
                    source: EnvironmentRef::from(source),
                    destination: to.map_or_else(|| main_environment.clone(), EnvironmentRef::from),
                }
            }
            OperationKind::Link => {
                let environment = from.or(to).or(id).ok_or_else(|| {
                    GuardViolation::ambiguous("link needs an environment to point the alias at")
                })?;
                Target::Single(EnvironmentRef::from(environment))
            }
            OperationKind::Delete => {
                let environment = id.or(to).ok_or_else(|| {
                    GuardViolation::ambiguous(
                        "delete needs a target: pass '--environment-id' or '--to'",
                    )
                })?;
                Target::Single(EnvironmentRef::from(environment))
            }
        };

        if let Target::Pair {
            source,
            destination,
        } = &target
        {
            if source == destination {
                return Err(GuardViolation::ambiguous(format!(
                    "source and destination are both '{source}'"
                )));
            }
        }

        Ok(target)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// 2. Settings file
// ---------------------------------------------------------------------------

/// Optional YAML settings file; every key may be omitted.
///
/// ```yaml
/// main_environment: master
/// protected_environments: [dev, staging, master]
/// release_regex: "release-[0-9]+"
/// enforce_naming_policy: true
/// max_scheduled_actions: 500
/// poll:
///   max_attempts: 60
///   initial_delay_ms: 1000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub main_environment: Option<String>,
    pub protected_environments: Option<Vec<String>>,
    pub release_regex: Option<String>,
    pub enforce_naming_policy: Option<bool>,
    pub max_scheduled_actions: Option<u32>,
    pub max_entries: Option<u32>,
    pub poll: PollSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_factor: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl PollSettings {
    fn apply(&self, mut policy: PollPolicy) -> PollPolicy {
        if let Some(max_attempts) = self.max_attempts {
            policy.max_attempts = max_attempts;
        }
        if let Some(ms) = self.initial_delay_ms {
            policy.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.max_delay_ms {
            policy.max_delay = Duration::from_millis(ms);
        }
        if let Some(factor) = self.backoff_factor {
            policy.backoff_factor = factor;
        }
        if let Some(secs) = self.timeout_secs {
            policy.timeout = Some(Duration::from_secs(secs));
        }
        policy
    }
}

impl Settings {
    /// Load settings from an explicit path. A missing file is an error.
    pub fn load_at(path: &Path) -> Result<Settings, ConfigurationError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigurationError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Look for `cms-release.yaml` in `cwd`, then `<config_dir>/cms-release/config.yaml`.
    ///
    /// Returns `Ok(None)` when neither exists.
    pub fn discover_at(
        cwd: &Path,
        config_dir: Option<&Path>,
    ) -> Result<Option<(PathBuf, Settings)>, ConfigurationError> {
        let mut candidates = vec![cwd.join(SETTINGS_FILE_NAME)];
        if let Some(dir) = config_dir {
            candidates.push(dir.join("cms-release").join("config.yaml"));
        }
        for path in candidates {
            if path.is_file() {
                let settings = Settings::load_at(&path)?;
                return Ok(Some((path, settings)));
            }
        }
        Ok(None)
    }

    /// `discover_at` using the platform config directory from `dirs::config_dir()`.
    pub fn discover(cwd: &Path) -> Result<Option<(PathBuf, Settings)>, ConfigurationError> {
        Settings::discover_at(cwd, dirs::config_dir().as_deref())
    }
}

// ---------------------------------------------------------------------------
// 3. SyncConfig
// ---------------------------------------------------------------------------

/// Management API token; never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ManagementToken(String);

impl ManagementToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ManagementToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ManagementToken(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub force_yes: bool,
    pub update_api_key: bool,
    pub prune_old_releases: bool,
    pub dry_run: bool,
    pub max_scheduled_actions: u32,
    pub max_entries: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            force_yes: false,
            update_api_key: false,
            prune_old_releases: false,
            dry_run: false,
            max_scheduled_actions: DEFAULT_MAX_SCHEDULED_ACTIONS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Immutable configuration for one invocation.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub version: u32,
    pub operation: OperationKind,
    pub space_id: String,
    pub management_token: ManagementToken,
    pub target: Target,
    pub main_environment: EnvironmentRef,
    pub alias: AliasRef,
    pub options: SyncOptions,
    pub protected: ProtectedEnvironmentSet,
    /// `None` when the naming policy is switched off.
    pub naming_policy: Option<ReleaseNamingPolicy>,
    pub poll: PollPolicy,
}

impl SyncConfig {
    pub fn builder(operation: OperationKind) -> SyncConfigBuilder {
        SyncConfigBuilder::new(operation)
    }

    pub fn destination(&self) -> &EnvironmentRef {
        self.target.destination()
    }

    pub fn source(&self) -> Option<&EnvironmentRef> {
        self.target.source()
    }
}

/// Collects raw values from every configuration source.
///
/// Explicit setter values beat [`Settings`], which beat built-in defaults.
#[derive(Debug, Clone)]
pub struct SyncConfigBuilder {
    operation: OperationKind,
    management_token: Option<String>,
    space_id: Option<String>,
    addressing: Addressing,
    main_environment: Option<String>,
    alias: Option<String>,
    protected_environments: Option<String>,
    release_regex: Option<String>,
    enforce_naming_policy: Option<bool>,
    options: SyncOptions,
    max_scheduled_actions: Option<u32>,
    max_entries: Option<u32>,
    poll_max_attempts: Option<u32>,
    poll_timeout: Option<Duration>,
    settings: Settings,
}

impl SyncConfigBuilder {
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            management_token: None,
            space_id: None,
            addressing: Addressing::default(),
            main_environment: None,
            alias: None,
            protected_environments: None,
            release_regex: None,
            enforce_naming_policy: None,
            options: SyncOptions::default(),
            max_scheduled_actions: None,
            max_entries: None,
            poll_max_attempts: None,
            poll_timeout: None,
            settings: Settings::default(),
        }
    }

    pub fn management_token(mut self, token: Option<String>) -> Self {
        self.management_token = token;
        self
    }

    pub fn space_id(mut self, space_id: Option<String>) -> Self {
        self.space_id = space_id;
        self
    }

    pub fn addressing(mut self, addressing: Addressing) -> Self {
        self.addressing = addressing;
        self
    }

    pub fn main_environment(mut self, main_environment: Option<String>) -> Self {
        self.main_environment = main_environment;
        self
    }

    pub fn alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    /// Comma-separated protected environment list.
    pub fn protected_environments(mut self, csv: Option<String>) -> Self {
        self.protected_environments = csv;
        self
    }

    pub fn release_regex(mut self, pattern: Option<String>) -> Self {
        self.release_regex = pattern;
        self
    }

    pub fn enforce_naming_policy(mut self, enforce: Option<bool>) -> Self {
        self.enforce_naming_policy = enforce;
        self
    }

    pub fn force_yes(mut self, force_yes: bool) -> Self {
        self.options.force_yes = force_yes;
        self
    }

    pub fn update_api_key(mut self, update_api_key: bool) -> Self {
        self.options.update_api_key = update_api_key;
        self
    }

    pub fn prune_old_releases(mut self, prune: bool) -> Self {
        self.options.prune_old_releases = prune;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }

    pub fn max_scheduled_actions(mut self, limit: Option<u32>) -> Self {
        self.max_scheduled_actions = limit;
        self
    }

    pub fn max_entries(mut self, limit: Option<u32>) -> Self {
        self.max_entries = limit;
        self
    }

    pub fn poll_max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.poll_max_attempts = attempts;
        self
    }

    pub fn poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<SyncConfig, ConfigurationError> {
        let Self {
            operation,
            management_token,
            space_id,
            addressing,
            main_environment,
            alias,
            protected_environments,
            release_regex,
            enforce_naming_policy,
            mut options,
            max_scheduled_actions,
            max_entries,
            poll_max_attempts,
            poll_timeout,
            settings,
        } = self;

        // Addressing first: a contradictory target is reported over missing credentials.
        let main_environment = EnvironmentRef::from(
            main_environment
                .or(settings.main_environment)
                .unwrap_or_else(|| DEFAULT_MAIN_ENVIRONMENT.to_string()),
        );
        let target = addressing.resolve(operation, &main_environment)?;

        let management_token = management_token
            .filter(|t| !t.is_empty())
            .map(ManagementToken::new)
            .ok_or(ConfigurationError::MissingManagementToken)?;
        let space_id = space_id
            .filter(|s| !s.is_empty())
            .ok_or(ConfigurationError::MissingSpaceId)?;
        let alias = alias.map_or_else(|| AliasRef::from(main_environment.as_str()), AliasRef::from);

        let protected = match (protected_environments, settings.protected_environments) {
            (Some(csv), _) => ProtectedEnvironmentSet::parse(&csv),
            (None, Some(names)) => ProtectedEnvironmentSet::from_names(names),
            (None, None) => ProtectedEnvironmentSet::parse(DEFAULT_PROTECTED_ENVIRONMENTS),
        };

        let naming_policy = if enforce_naming_policy
            .or(settings.enforce_naming_policy)
            .unwrap_or(true)
        {
            let pattern = release_regex
                .or(settings.release_regex)
                .unwrap_or_else(|| DEFAULT_RELEASE_REGEX.to_string());
            Some(ReleaseNamingPolicy::new(&pattern)?)
        } else {
            None
        };

        options.max_scheduled_actions = max_scheduled_actions
            .or(settings.max_scheduled_actions)
            .unwrap_or(DEFAULT_MAX_SCHEDULED_ACTIONS);
        options.max_entries = max_entries
            .or(settings.max_entries)
            .unwrap_or(DEFAULT_MAX_ENTRIES);

        let mut poll = settings.poll.apply(PollPolicy::default());
        if let Some(attempts) = poll_max_attempts {
            poll.max_attempts = attempts;
        }
        if poll_timeout.is_some() {
            poll.timeout = poll_timeout;
        }
        poll.validate()?;

        Ok(SyncConfig {
            version: CONFIG_VERSION,
            operation,
            space_id,
            management_token,
            target,
            main_environment,
            alias,
            options,
            protected,
            naming_policy,
            poll,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
