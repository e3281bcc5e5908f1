// Copyright 2019 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::os::unix::io::{AsRawFd, OwnedFd};
use std::process::Stdio;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use tokio::net::unix::pipe::Receiver;
use tracing::trace;

use crate::Error;

/// The child's side of a [`MergedPipe`], one handle each for stdout and stderr.
///
/// Both handles refer to the same pipe, so bytes written to either land in the
/// reader in the order the kernel receives them.
#[derive(Debug)]
pub struct ChildOutput {
    pub stdout: Stdio,
    pub stderr: Stdio,
}

/// A single pipe standing in for the child's stdout and stderr.
#[derive(Debug)]
pub struct MergedPipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl MergedPipe {
    /// Creates a new pipe, if possible.
    ///
    /// Both ends are close-on-exec; the child only ever sees the write end through the
    ///   copies that become its fd 1 and 2.
    pub fn new() -> Result<Self, Error> {
        let (read, write) = cloexec_pipe()?;

        trace!(
            read = read.as_raw_fd(),
            write = write.as_raw_fd(),
            "created merged output pipe"
        );
        Ok(Self { read, write })
    }

    /// Splits into the async reader kept by the supervisor and the handles given to the child.
    ///
    /// The returned `ChildOutput` must be dropped in the parent once the child is spawned,
    ///   otherwise the reader never observes end of file.
    pub fn split(self) -> Result<(Receiver, ChildOutput), Error> {
        let MergedPipe { read, write } = self;

        let stderr = write.try_clone()?;
        let output = ChildOutput {
            stdout: Stdio::from(write),
            stderr: Stdio::from(stderr),
        };

        // sets O_NONBLOCK on the read end
        let reader = Receiver::from_owned_fd(read)?;
        Ok((reader, output))
    }
}

/// Both ends close-on-exec from the start, a concurrent fork never sees the write end
#[cfg(any(target_os = "linux", target_os = "android"))]
fn cloexec_pipe() -> Result<(OwnedFd, OwnedFd), Error> {
    Ok(nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)?)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn cloexec_pipe() -> Result<(OwnedFd, OwnedFd), Error> {
    let (read, write) = nix::unistd::pipe()?;
    for fd in [&read, &write] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read, write))
}
