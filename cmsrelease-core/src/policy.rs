//! Protection, naming and polling policies carried by [`crate::SyncConfig`].

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use regex::Regex;

use crate::error::ConfigurationError;
use crate::types::EnvironmentRef;

pub const DEFAULT_PROTECTED_ENVIRONMENTS: &str = "dev,staging,master";
pub const DEFAULT_RELEASE_REGEX: &str = r"release-[0-9]+[\.]*[0-9]*[\.]*[0-9]*";

// ---------------------------------------------------------------------------
// Protected environments
// ---------------------------------------------------------------------------

/// Environment names that must not be overwritten or deleted without `--force-yes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedEnvironmentSet(BTreeSet<String>);

impl ProtectedEnvironmentSet {
    /// Parse a comma-separated list. Items are trimmed; empty items are dropped.
    pub fn parse(csv: &str) -> Self {
        Self::from_names(csv.split(','))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|name| name.as_ref().trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, environment: &EnvironmentRef) -> bool {
        self.0.contains(environment.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProtectedEnvironmentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{}", names.join(","))
    }
}

// ---------------------------------------------------------------------------
// Release naming policy
// ---------------------------------------------------------------------------

/// Pattern a destination name must contain a match for.
///
/// The match is unanchored: `my-release-2.0` satisfies the default pattern.
#[derive(Debug, Clone)]
pub struct ReleaseNamingPolicy(Regex);

impl ReleaseNamingPolicy {
    pub fn new(pattern: &str) -> Result<Self, ConfigurationError> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|source| ConfigurationError::InvalidReleaseRegex {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn matches(&self, environment: &EnvironmentRef) -> bool {
        self.0.is_match(environment.as_str())
    }

    pub fn pattern(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for ReleaseNamingPolicy {
    fn default() -> Self {
        Self(Regex::new(DEFAULT_RELEASE_REGEX).expect("default release regex is valid"))
    }
}

// ---------------------------------------------------------------------------
// Availability polling
// ---------------------------------------------------------------------------

/// Bounds for the availability-confirmation loop after a clone request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: u32,
    /// Overall deadline across all attempts, if any.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2,
            timeout: None,
        }
    }
}

impl PollPolicy {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_attempts == 0 {
            return Err(ConfigurationError::InvalidPollPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.backoff_factor == 0 {
            return Err(ConfigurationError::InvalidPollPolicy(
                "backoff_factor must be at least 1".to_string(),
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(ConfigurationError::InvalidPollPolicy(
                "max_delay must not be shorter than initial_delay".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self
            .backoff_factor
            .checked_pow(exponent)
            .unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_set_trims_and_matches_exactly() {
        let set = ProtectedEnvironmentSet::parse("dev, staging,,master");
        assert!(set.contains(&EnvironmentRef::from("staging")));
        assert!(set.contains(&EnvironmentRef::from("master")));
        assert!(!set.contains(&EnvironmentRef::from("Master")));
        assert!(!set.contains(&EnvironmentRef::from("")));
        assert_eq!(set.to_string(), "dev,master,staging");
    }

    #[test]
    fn default_release_policy_accepts_release_names() {
        let policy = ReleaseNamingPolicy::default();
        assert!(policy.matches(&EnvironmentRef::from("release-1")));
        assert!(policy.matches(&EnvironmentRef::from("release-1.4.2")));
        assert!(!policy.matches(&EnvironmentRef::from("feature-x")));
    }

    #[test]
    fn invalid_regex_is_a_configuration_error() {
        let err = ReleaseNamingPolicy::new("release-(").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidReleaseRegex { .. }));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = PollPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff_factor: 2,
            timeout: None,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
        assert_eq!(policy.delay_after(40), Duration::from_millis(500));
    }

    #[test]
    fn fixed_backoff_with_factor_one() {
        let policy = PollPolicy {
            backoff_factor: 1,
            ..PollPolicy::default()
        };
        assert_eq!(policy.delay_after(7), policy.initial_delay);
    }

    #[test]
    fn zero_attempts_rejected() {
        let policy = PollPolicy {
            max_attempts: 0,
            ..PollPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
