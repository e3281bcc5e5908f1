// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

/// How the child ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// Normal exit with a status code
    Code(i32),
    /// Terminated by a signal, no exit code exists
    Signal(i32),
    /// The wait itself failed, the status could not be observed
    Unknown,
}

impl Exit {
    /// Flattened to one integer: the code, `-signal`, or `-1` when unknown
    pub fn code(self) -> i32 {
        match self {
            Exit::Code(code) => code,
            Exit::Signal(signal) => -signal,
            Exit::Unknown => -1,
        }
    }

    pub fn success(self) -> bool {
        self == Exit::Code(0)
    }
}

impl From<ExitStatus> for Exit {
    fn from(status: ExitStatus) -> Self {
        status
            .code()
            .map(Exit::Code)
            .or_else(|| status.signal().map(Exit::Signal))
            .unwrap_or(Exit::Unknown)
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exit::Code(code) => write!(f, "code {}", code),
            Exit::Signal(signal) => write!(f, "signal {}", signal),
            Exit::Unknown => f.write_str("an unknown status"),
        }
    }
}

/// Outcome of one supervised run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunResult {
    pub exit: Exit,
    /// The operator interrupted the run, whether or not the child then exited on its own
    pub was_interrupted: bool,
    /// An interrupt, not Enter, ended the acknowledgment wait
    pub quit_requested: bool,
}

impl RunResult {
    pub fn exit_code(&self) -> i32 {
        self.exit.code()
    }

    pub fn success(&self) -> bool {
        self.exit.success()
    }

    /// The line shown to the operator before the acknowledgment prompt
    pub fn summary(&self, app: &str) -> String {
        let stopped = if self.was_interrupted {
            format!("→ '{}' was stopped. ", app)
        } else {
            String::new()
        };

        if self.success() {
            format!(
                "{}→ '{}' exited cleanly. Press Enter to return to the menu.",
                stopped, app
            )
        } else {
            format!(
                "{}→ '{}' exited with {}. Review the output above and press Enter to return to the menu.",
                stopped, app, self.exit
            )
        }
    }
}

/// Lifecycle of the child within one run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    InterruptRequested,
    Terminated,
}
