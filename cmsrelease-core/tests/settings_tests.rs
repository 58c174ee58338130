//! Settings file loading, discovery and precedence.

use std::fs;
use std::time::Duration;

use cmsrelease_core::{
    config::SETTINGS_FILE_NAME, Addressing, ConfigurationError, EnvironmentRef, OperationKind,
    Settings, SyncConfig,
};
use tempfile::TempDir;

const FULL_SETTINGS: &str = r#"
main_environment: production
protected_environments: [production, qa]
release_regex: "^rel-[0-9]+$"
max_scheduled_actions: 25
poll:
  max_attempts: 5
  initial_delay_ms: 50
  max_delay_ms: 200
  backoff_factor: 3
  timeout_secs: 30
"#;

#[test]
fn load_full_settings_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    fs::write(&path, FULL_SETTINGS).expect("write");

    let settings = Settings::load_at(&path).expect("load");
    assert_eq!(settings.main_environment.as_deref(), Some("production"));
    assert_eq!(settings.poll.max_attempts, Some(5));
    assert_eq!(settings.poll.timeout_secs, Some(30));
}

#[test]
fn empty_settings_file_is_all_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    fs::write(&path, "\n").expect("write");
    assert_eq!(Settings::load_at(&path).expect("load"), Settings::default());
}

#[test]
fn unknown_key_returns_parse_error_with_path() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    fs::write(&path, "protected: [master]\n").expect("write");

    let err = Settings::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigurationError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains(SETTINGS_FILE_NAME));
}

#[test]
fn missing_explicit_file_is_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = Settings::load_at(&dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, ConfigurationError::Io { .. }));
}

#[test]
fn discover_prefers_working_directory() {
    let cwd = TempDir::new().expect("cwd");
    let config_dir = TempDir::new().expect("config dir");
    fs::write(cwd.path().join(SETTINGS_FILE_NAME), "main_environment: local\n").expect("write");
    let global = config_dir.path().join("cms-release");
    fs::create_dir_all(&global).expect("mkdir");
    fs::write(global.join("config.yaml"), "main_environment: global\n").expect("write");

    let (path, settings) = Settings::discover_at(cwd.path(), Some(config_dir.path()))
        .expect("discover")
        .expect("found");
    assert!(path.starts_with(cwd.path()));
    assert_eq!(settings.main_environment.as_deref(), Some("local"));
}

#[test]
fn discover_falls_back_to_config_dir_then_none() {
    let cwd = TempDir::new().expect("cwd");
    let config_dir = TempDir::new().expect("config dir");
    assert!(Settings::discover_at(cwd.path(), Some(config_dir.path()))
        .expect("discover")
        .is_none());

    let global = config_dir.path().join("cms-release");
    fs::create_dir_all(&global).expect("mkdir");
    fs::write(global.join("config.yaml"), "max_entries: 7\n").expect("write");
    let (_, settings) = Settings::discover_at(cwd.path(), Some(config_dir.path()))
        .expect("discover")
        .expect("found");
    assert_eq!(settings.max_entries, Some(7));
}

#[test]
fn settings_feed_the_built_config() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    fs::write(&path, FULL_SETTINGS).expect("write");
    let settings = Settings::load_at(&path).expect("load");

    let config = SyncConfig::builder(OperationKind::Duplicate)
        .management_token(Some("token".to_string()))
        .space_id(Some("space".to_string()))
        .addressing(Addressing {
            environment_id: Some("rel-4".to_string()),
            ..Addressing::default()
        })
        .poll_max_attempts(Some(9))
        .settings(settings)
        .build()
        .expect("build");

    assert_eq!(config.source(), Some(&EnvironmentRef::from("production")));
    assert!(config.protected.contains(&EnvironmentRef::from("qa")));
    assert_eq!(config.options.max_scheduled_actions, 25);
    assert_eq!(config.poll.max_attempts, 9);
    assert_eq!(config.poll.initial_delay, Duration::from_millis(50));
    assert_eq!(config.poll.timeout, Some(Duration::from_secs(30)));
    let policy = config.naming_policy.expect("policy enabled");
    assert!(policy.matches(&EnvironmentRef::from("rel-4")));
    assert!(!policy.matches(&EnvironmentRef::from("rel-4b")));
}

#[test]
fn invalid_regex_from_settings_fails_build() {
    let settings = Settings {
        release_regex: Some("rel-(".to_string()),
        ..Settings::default()
    };
    let err = SyncConfig::builder(OperationKind::Link)
        .management_token(Some("token".to_string()))
        .space_id(Some("space".to_string()))
        .addressing(Addressing {
            from: Some("rel-1".to_string()),
            ..Addressing::default()
        })
        .settings(settings)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidReleaseRegex { .. }));
}
