// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use appmenu::config::Config;
use appmenu::supervisor::DEFAULT_GRACE_PERIOD;
use appmenu::ErrorKind;

fn write_config(path: &Path, payload: &str) -> PathBuf {
    fs::write(path, payload).expect("write config");
    path.to_path_buf()
}

#[test]
fn load_config_success() {
    let tmp = tempfile::tempdir().unwrap();
    let config_dir = tmp.path().join("config");
    let target_dir = config_dir.join("apps").join("dashboard");
    fs::create_dir_all(&target_dir).unwrap();

    let config_file = write_config(
        &config_dir.join("apps.yaml"),
        r#"
apps:
  - name: dashboard
    command: npm run start:linux
    cwd: apps/dashboard
    description: Demo dashboard
    env:
      NODE_ENV: development
"#,
    );

    let config = Config::load(&config_file).unwrap();

    assert_eq!(config.apps().len(), 1);
    let app = &config.apps()[0];
    assert_eq!(app.name(), "dashboard");
    assert_eq!(app.command(), "npm run start:linux");
    assert_eq!(app.description(), Some("Demo dashboard"));
    assert_eq!(
        app.env().get("NODE_ENV").map(String::as_str),
        Some("development")
    );
    assert_eq!(app.working_dir(), target_dir.canonicalize().unwrap());
    assert_eq!(config.supervisor().grace_period, DEFAULT_GRACE_PERIOD);
}

#[test]
fn load_config_requires_apps_key() {
    let tmp = tempfile::tempdir().unwrap();
    let config_file = write_config(&tmp.path().join("apps.yaml"), "{}");

    let err = Config::load(&config_file).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Config(_)));
    assert!(err.to_string().contains("at least one app"));
}

#[test]
fn load_config_validates_working_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let config_file = write_config(
        &tmp.path().join("apps.yaml"),
        r#"
apps:
  - name: missing
    command: echo missing
    cwd: apps/missing
"#,
    );

    let err = Config::load(&config_file).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Config(_)));
    assert!(err.to_string().contains("'missing' does not exist"));
}

#[test]
fn missing_file_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let err = Config::load(&tmp.path().join("nope.yaml")).unwrap_err();
    assert!(err.to_string().contains("configuration file not found"));
}

#[test]
fn default_working_directory_is_the_config_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let config_file = write_config(
        &tmp.path().join("apps.yaml"),
        "apps:\n  - name: here\n    command: ls\n",
    );

    let config = Config::load(&config_file).unwrap();
    assert_eq!(
        config.apps()[0].working_dir(),
        tmp.path().canonicalize().unwrap()
    );
}

#[test]
fn supervisor_settings_are_read() {
    let tmp = tempfile::tempdir().unwrap();
    let config_file = write_config(
        &tmp.path().join("apps.yaml"),
        r#"
supervisor:
  grace_period_secs: 2
  drain_timeout_secs: 0.5
  graceful_stop: false
apps:
  - name: here
    command: ls
"#,
    );

    let config = Config::load(&config_file).unwrap();
    let settings = config.supervisor();
    assert_eq!(settings.grace_period, Duration::from_secs(2));
    assert_eq!(settings.drain_timeout, Duration::from_millis(500));
    assert!(!settings.graceful_stop);
}

#[test]
fn unknown_supervisor_setting_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let config_file = write_config(
        &tmp.path().join("apps.yaml"),
        "supervisor:\n  grace: 2\napps:\n  - {name: a, command: b}\n",
    );

    assert!(Config::load(&config_file).is_err());
}
