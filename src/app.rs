// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A managed application, as loaded from the configuration.
///
/// Records are immutable once built; the supervisor only ever reads them, so one
/// record may be run any number of times.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppRecord {
    name: String,
    command: String,
    working_dir: PathBuf,
    env: BTreeMap<String, String>,
    description: Option<String>,
}

impl AppRecord {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
            description: None,
        }
    }

    /// Adds an environment override, replacing any previous value for `key`
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Overrides applied on top of the inherited environment
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
