// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Loading of the `apps.yaml` configuration.
//!
//! ```yaml
//! supervisor:
//!   grace_period_secs: 5
//! apps:
//!   - name: dashboard
//!     command: npm run start
//!     cwd: apps/dashboard
//!     description: Demo dashboard
//!     env:
//!       NODE_ENV: development
//! ```
//!
//! Working directories are resolved against the directory holding the config file and
//!   must exist at load time.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::app::AppRecord;
use crate::supervisor::SupervisorConfig;
use crate::Error;

/// Optional `supervisor:` section, anything left out keeps its default
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SupervisorSection {
    grace_period_secs: Option<f64>,
    drain_timeout_secs: Option<f64>,
    shell: Option<PathBuf>,
    graceful_stop: Option<bool>,
}

impl SupervisorSection {
    fn apply(self, config: &mut SupervisorConfig) -> Result<(), Error> {
        if let Some(secs) = self.grace_period_secs {
            config.grace_period = seconds("grace_period_secs", secs)?;
        }
        if let Some(secs) = self.drain_timeout_secs {
            config.drain_timeout = seconds("drain_timeout_secs", secs)?;
        }
        if let Some(shell) = self.shell {
            config.shell = shell;
        }
        if let Some(graceful_stop) = self.graceful_stop {
            config.graceful_stop = graceful_stop;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    supervisor: Option<SupervisorSection>,
    #[serde(default)]
    apps: Option<Value>,
}

/// A loaded and validated configuration
#[derive(Clone, Debug)]
pub struct Config {
    apps: Vec<AppRecord>,
    supervisor: SupervisorConfig,
}

impl Config {
    /// Reads and validates the file at `path`
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let text = fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::parse(&text, base_dir)?;

        debug!(path = %path.display(), apps = config.apps.len(), "configuration loaded");
        Ok(config)
    }

    /// Parses `text`, resolving relative working directories against `base_dir`
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, Error> {
        // an empty document is treated like an empty mapping
        let raw: RawConfig = if text.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str::<Option<RawConfig>>(text)?.unwrap_or_default()
        };

        let mut supervisor = SupervisorConfig::default();
        if let Some(section) = raw.supervisor {
            section.apply(&mut supervisor)?;
        }

        let entries = match raw.apps {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(entries)) => entries,
            Some(single) => vec![single],
        };
        if entries.is_empty() {
            return Err(Error::config(
                "configuration file must define at least one app under 'apps'",
            ));
        }

        let mut names = HashSet::new();
        let mut apps = Vec::with_capacity(entries.len());
        for entry in &entries {
            let app = parse_app(entry, base_dir)?;
            if !names.insert(app.name().to_string()) {
                return Err(Error::config(format!(
                    "app '{}' is defined more than once",
                    app.name()
                )));
            }
            apps.push(app);
        }

        Ok(Self { apps, supervisor })
    }

    pub fn apps(&self) -> &[AppRecord] {
        &self.apps
    }

    pub fn supervisor(&self) -> &SupervisorConfig {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut SupervisorConfig {
        &mut self.supervisor
    }
}

fn parse_app(entry: &Value, base_dir: &Path) -> Result<AppRecord, Error> {
    let map = entry
        .as_mapping()
        .ok_or_else(|| Error::config("app definition must be a mapping"))?;

    let name = scalar(map, "name");
    let command = scalar(map, "command");
    let (name, command) = match (name, command) {
        (Some(name), Some(command)) if !name.is_empty() && !command.is_empty() => (name, command),
        _ => {
            return Err(Error::config(
                "each app must include both 'name' and 'command'",
            ))
        }
    };

    let working_dir = scalar(map, "cwd")
        .or_else(|| scalar(map, "path"))
        .unwrap_or_else(|| ".".to_string());
    let working_dir = resolve_working_dir(&name, base_dir, &working_dir)?;

    let mut app = AppRecord::new(name, command, working_dir)
        .with_envs(environment(map)?);
    if let Some(description) = scalar(map, "description").filter(|d| !d.is_empty()) {
        app = app.with_description(description);
    }

    Ok(app)
}

/// Absolute, existing directory for `working_dir`
fn resolve_working_dir(app: &str, base_dir: &Path, working_dir: &str) -> Result<PathBuf, Error> {
    let candidate = base_dir.join(working_dir);
    match candidate.canonicalize() {
        Ok(dir) if dir.is_dir() => Ok(dir),
        Ok(dir) => Err(Error::config(format!(
            "working directory '{}' for app '{}' is not a directory",
            dir.display(),
            app
        ))),
        Err(_) => Err(Error::config(format!(
            "working directory '{}' for app '{}' does not exist",
            candidate.display(),
            app
        ))),
    }
}

fn environment(map: &Mapping) -> Result<BTreeMap<String, String>, Error> {
    let env = match map.get("env") {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Mapping(env)) => env,
        Some(_) => return Err(Error::config("'env' must be a mapping")),
    };

    env.iter()
        .map(|(key, value)| -> Result<(String, String), Error> {
            let key = to_string(key).ok_or_else(|| Error::config("env keys must be scalars"))?;
            let value = to_string(value).ok_or_else(|| {
                Error::config(format!("env value for '{}' must be a scalar", key))
            })?;
            Ok((key, value))
        })
        .collect()
}

fn scalar(map: &Mapping, key: &str) -> Option<String> {
    map.get(key).and_then(to_string)
}

fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn seconds(field: &str, secs: f64) -> Result<Duration, Error> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| Error::config(format!("'{}' must be a non-negative number", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervisor_section_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::parse(
            "supervisor:\n  grace_period_secs: 1.5\n  shell: /bin/bash\napps:\n  name: one\n  command: 'true'\n",
            dir.path(),
        )
        .unwrap();

        assert_eq!(config.supervisor().grace_period, Duration::from_millis(1500));
        assert_eq!(config.supervisor().shell, PathBuf::from("/bin/bash"));
        assert!(config.supervisor().graceful_stop);
        assert_eq!(config.apps().len(), 1);
    }

    #[test]
    fn negative_grace_period_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::parse(
            "supervisor:\n  grace_period_secs: -1\napps:\n  - {name: a, command: b}\n",
            dir.path(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("grace_period_secs"));
    }

    #[test]
    fn scalar_env_values_are_stringified() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::parse(
            "apps:\n  - name: api\n    command: run\n    env:\n      PORT: 8000\n      DEBUG: true\n",
            dir.path(),
        )
        .unwrap();

        let env = config.apps()[0].env();
        assert_eq!(env.get("PORT").map(String::as_str), Some("8000"));
        assert_eq!(env.get("DEBUG").map(String::as_str), Some("true"));
    }

    #[test]
    fn non_mapping_app_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::parse("apps:\n  - just a string\n", dir.path()).unwrap_err();
        assert!(err.to_string().contains("must be a mapping"));
    }

    #[test]
    fn name_and_command_are_required() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::parse("apps:\n  - name: lonely\n", dir.path()).unwrap_err();
        assert!(err.to_string().contains("'name' and 'command'"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::parse(
            "apps:\n  - {name: a, command: x}\n  - {name: a, command: y}\n",
            dir.path(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn path_is_an_alias_for_cwd() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("svc")).unwrap();
        let config = Config::parse(
            "apps:\n  - {name: a, command: x, path: svc}\n",
            dir.path(),
        )
        .unwrap();

        assert_eq!(
            config.apps()[0].working_dir(),
            dir.path().join("svc").canonicalize().unwrap()
        );
    }
}
