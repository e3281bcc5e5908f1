// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fmt::Debug;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::process::Child;
use tracing::debug;

use crate::Error;

/// How a running child is asked, and then made, to stop.
///
/// `pid` is the child's pid, which is also its process group id.
pub trait StopStrategy: Debug + Send + Sync {
    /// Requests a voluntary exit.
    ///
    /// Returns `Ok(false)` when this strategy has no graceful path, the caller should kill right away.
    fn interrupt(&self, child: &mut Child, pid: Pid) -> Result<bool, Error>;

    /// Unconditionally terminates the child. A child that is already gone is not an error.
    fn kill(&self, child: &mut Child, pid: Pid) -> Result<(), Error>;
}

/// Delivers `signal` to every process in the group led by `pid`, an empty group is not an error
fn signal_group(pid: Pid, signal: Signal) -> Result<(), Error> {
    debug!(%pid, ?signal, "signalling process group");
    match killpg(pid, signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Interrupt then kill, delivered to the child's whole process group
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalStop;

impl StopStrategy for SignalStop {
    fn interrupt(&self, _child: &mut Child, pid: Pid) -> Result<bool, Error> {
        signal_group(pid, Signal::SIGINT)?;
        Ok(true)
    }

    fn kill(&self, _child: &mut Child, pid: Pid) -> Result<(), Error> {
        signal_group(pid, Signal::SIGKILL)
    }
}

/// No graceful path, an interrupt kills right away.
///
/// The kill still reaches the whole process group where groups exist, so nothing the
///   command started outlives it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForceStop;

impl StopStrategy for ForceStop {
    fn interrupt(&self, _child: &mut Child, _pid: Pid) -> Result<bool, Error> {
        Ok(false)
    }

    fn kill(&self, child: &mut Child, pid: Pid) -> Result<(), Error> {
        if cfg!(unix) {
            signal_group(pid, Signal::SIGKILL)
        } else {
            debug!(%pid, "killing child");
            child.start_kill().map_err(Error::from)
        }
    }
}

/// `SignalStop` where the platform supports it, `ForceStop` otherwise
pub fn platform_default() -> Box<dyn StopStrategy> {
    if cfg!(unix) {
        Box::new(SignalStop)
    } else {
        Box::new(ForceStop)
    }
}
