// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;

use nix::unistd::Pid;
use tokio::net::unix::pipe::Receiver;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::app::AppRecord;
use crate::pipe::MergedPipe;
use crate::Error;

/// The complete environment a child is started with.
///
/// Built fresh for every run from a snapshot of the caller's environment, so overrides
/// from one run can never leak into the next.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Snapshot of this process' environment with `overrides` applied
    pub fn inherit_with(overrides: &BTreeMap<String, String>) -> Self {
        Self::from_base(std::env::vars_os(), overrides)
    }

    /// Overrides win over `base` on key collision, nothing is removed.
    pub fn from_base<I>(base: I, overrides: &BTreeMap<String, String>) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut vars: BTreeMap<OsString, OsString> = base.into_iter().collect();
        vars.extend(
            overrides
                .iter()
                .map(|(k, v)| (OsString::from(k), OsString::from(v))),
        );

        Self { vars }
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// A started child and the read end of its merged output
#[derive(Debug)]
pub struct Launched {
    pub child: Child,
    /// Also the id of the child's process group
    pub pid: Pid,
    pub output: Receiver,
}

/// Checks the record can be launched, without starting anything
pub fn check_preconditions(record: &AppRecord) -> Result<(), Error> {
    if record.command().trim().is_empty() {
        return Err(Error::launch(record.name(), "command is empty"));
    }

    let dir = record.working_dir();
    if !dir.is_dir() {
        return Err(Error::launch(
            record.name(),
            format!("working directory '{}' does not exist", dir.display()),
        ));
    }

    Ok(())
}

/// Starts `record.command` through `shell -c` in a new process group.
///
/// stdout and stderr share one pipe, stdin is null. Nothing is left behind on error.
pub fn new_process(record: &AppRecord, shell: &Path) -> Result<Launched, Error> {
    check_preconditions(record)?;

    let env = Environment::inherit_with(record.env());
    let (output, child_output) = MergedPipe::new()
        .and_then(MergedPipe::split)
        .map_err(|e| Error::launch(record.name(), e))?;

    // the Command owns the parent's copies of the write end, it must be dropped before reading
    let child = {
        let mut command = Command::new(shell);
        command
            .arg("-c")
            .arg(record.command())
            .current_dir(record.working_dir())
            .env_clear()
            .envs(env.iter())
            .stdin(Stdio::null())
            .stdout(child_output.stdout)
            .stderr(child_output.stderr)
            .process_group(0)
            .kill_on_drop(true);

        command
            .spawn()
            .map_err(|e| Error::launch(record.name(), e))?
    };

    let pid = child
        .id()
        .map(|id| Pid::from_raw(id as i32))
        .ok_or_else(|| Error::launch(record.name(), "child exited before it was observed"))?;

    debug!(app = record.name(), %pid, shell = %shell.display(), "started child process");
    Ok(Launched { child, pid, output })
}
