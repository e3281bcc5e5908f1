// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Runs one app in the foreground and reports how it ended.

mod interrupt;
mod result;
mod stop;

pub use interrupt::{CtrlC, InterruptSource};
pub use result::{Exit, RunResult, RunState};
pub use stop::{platform_default, ForceStop, SignalStop, StopStrategy};

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite};
use tokio::net::unix::pipe::Receiver;
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::app::AppRecord;
use crate::console::Console;
use crate::launch::{self, Launched};
use crate::Error;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_SHELL: &str = "/bin/sh";

const READ_CHUNK: usize = 4096;
const CHUNK_QUEUE: usize = 32;

/// Knobs for a `ProcessSupervisor`
#[derive(Clone, Debug, PartialEq)]
pub struct SupervisorConfig {
    /// How long the child has to exit on its own after being interrupted
    pub grace_period: Duration,
    /// How long to keep reading output after the child has exited
    pub drain_timeout: Duration,
    /// Shell used as `<shell> -c <command>`
    pub shell: PathBuf,
    /// When false, an interrupt kills the child without asking first
    pub graceful_stop: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            shell: PathBuf::from(DEFAULT_SHELL),
            graceful_stop: true,
        }
    }
}

/// Launch and monitor one process at a time
///
/// Rules:
///   - stdout and stderr of the child are merged and forwarded as they arrive
///   - stdin is never connected to the child
///   - the first interrupt asks the child to stop, after the grace period it is killed
///   - a run is over only once the child is reaped and its output is drained
#[derive(Debug)]
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    stop: Box<dyn StopStrategy>,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let stop: Box<dyn StopStrategy> = if config.graceful_stop {
            platform_default()
        } else {
            Box::new(ForceStop)
        };

        Self { config, stop }
    }

    pub fn with_stop_strategy(mut self, stop: Box<dyn StopStrategy>) -> Self {
        self.stop = stop;
        self
    }

    /// Runs `record` with Ctrl+C as the interrupt source
    pub async fn run<W, R>(
        &self,
        record: &AppRecord,
        console: &mut Console<W, R>,
    ) -> Result<RunResult, Error>
    where
        W: AsyncWrite + Unpin,
        R: AsyncBufRead + Unpin,
    {
        launch::check_preconditions(record)?;
        let mut interrupts = CtrlC::new()?;
        self.run_with(record, console, &mut interrupts).await
    }

    /// Runs `record` to completion, then waits for the operator to acknowledge the summary.
    ///
    /// Only a failure to launch is returned as an error; once the child exists a `RunResult`
    ///   is always produced.
    pub async fn run_with<W, R, I>(
        &self,
        record: &AppRecord,
        console: &mut Console<W, R>,
        interrupts: &mut I,
    ) -> Result<RunResult, Error>
    where
        W: AsyncWrite + Unpin,
        R: AsyncBufRead + Unpin,
        I: InterruptSource + ?Sized,
    {
        let Launched { child, pid, output } = launch::new_process(record, &self.config.shell)?;
        info!(app = record.name(), %pid, dir = %record.working_dir().display(), "running");

        let mut run = Run {
            app: record.name(),
            child,
            pid,
            stop: self.stop.as_ref(),
            console,
            sink_failed: false,
        };

        run.say(&format!(
            "→ Starting '{}' in {}...",
            record.name(),
            record.working_dir().display()
        ))
        .await;
        run.say("→ Press Ctrl+C to stop the command and return to the menu.\n")
            .await;

        let mut result = run.supervise(output, interrupts, &self.config).await;
        info!(app = record.name(), exit = %result.exit, interrupted = result.was_interrupted, "finished");

        run.say(&format!("\n{}", result.summary(record.name())))
            .await;
        // a closed interrupt source disables its branch, leaving only the line read
        tokio::select! {
            line = run.console.read_line() => if let Err(e) = line {
                debug!("acknowledgment not read: {}", e);
            },
            Some(()) = interrupts.recv() => {
                debug!(app = record.name(), "interrupted at the acknowledgment prompt");
                result.quit_requested = true;
            }
        }

        Ok(result)
    }
}

/// State owned by a single `run_with` call
struct Run<'a, W, R> {
    app: &'a str,
    child: Child,
    pid: nix::unistd::Pid,
    stop: &'a dyn StopStrategy,
    console: &'a mut Console<W, R>,
    sink_failed: bool,
}

impl<'a, W, R> Run<'a, W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    async fn supervise<I>(
        &mut self,
        output: Receiver,
        interrupts: &mut I,
        config: &SupervisorConfig,
    ) -> RunResult
    where
        I: InterruptSource + ?Sized,
    {
        let (tx, mut chunks) = mpsc::channel(CHUNK_QUEUE);
        let drain = tokio::spawn(drain_output(output, tx, self.app.to_string()));

        let mut state = RunState::Running;
        let mut was_interrupted = false;
        let mut listening = true;
        let mut forced = false;
        let mut drained = false;
        let mut exit: Option<Exit> = None;

        // armed by `reset` once their deadline is known
        let grace_timer = sleep(Duration::ZERO);
        let drain_timer = sleep(Duration::ZERO);
        tokio::pin!(grace_timer, drain_timer);
        let mut grace_armed = false;
        let mut drain_armed = false;

        while exit.is_none() || !drained {
            tokio::select! {
                chunk = chunks.recv(), if !drained => match chunk {
                    Some(bytes) => self.forward(&bytes).await,
                    None => drained = true,
                },
                status = self.child.wait(), if exit.is_none() => {
                    let status = status.map(Exit::from).unwrap_or_else(|e| {
                        warn!(app = self.app, "waiting for child failed: {}", e);
                        Exit::Unknown
                    });
                    debug!(app = self.app, ?state, %status, "child exited");

                    state = RunState::Terminated;
                    exit = Some(status);
                    drain_timer.as_mut().reset(Instant::now() + config.drain_timeout);
                    drain_armed = true;
                },
                interrupt = interrupts.recv(), if listening && exit.is_none() => match (interrupt, state) {
                    (None, _) => listening = false,
                    (Some(()), RunState::Running) => {
                        state = RunState::InterruptRequested;
                        was_interrupted = true;
                        self.say("\n→ Stopping command...").await;

                        match self.stop.interrupt(&mut self.child, self.pid) {
                            Ok(true) => {
                                grace_timer.as_mut().reset(Instant::now() + config.grace_period);
                                grace_armed = true;
                            }
                            Ok(false) => {
                                debug!(app = self.app, "no graceful stop available");
                                self.force();
                                forced = true;
                            }
                            Err(e) => {
                                warn!(app = self.app, "graceful stop failed: {}", e);
                                self.force();
                                forced = true;
                            }
                        }
                    }
                    (Some(()), state) => debug!(app = self.app, ?state, forced, "interrupt already in progress"),
                },
                _ = &mut grace_timer, if grace_armed && !forced && exit.is_none() => {
                    info!(app = self.app, "grace period expired");
                    self.force();
                    forced = true;
                    grace_armed = false;
                },
                _ = &mut drain_timer, if drain_armed && !drained => {
                    warn!(app = self.app, "output still open after exit, no longer reading it");
                    drained = true;
                },
            }
        }

        // releases the read end if it is still held
        drain.abort();

        RunResult {
            exit: exit.unwrap_or(Exit::Unknown),
            was_interrupted,
            quit_requested: false,
        }
    }

    /// Forced termination, failures are logged and the final wait still happens
    fn force(&mut self) {
        if let Err(e) = self.stop.kill(&mut self.child, self.pid) {
            warn!(app = self.app, pid = %self.pid, "forced termination failed: {}", e);
        }
    }

    async fn forward(&mut self, bytes: &[u8]) {
        if let Err(e) = self.console.write_all(bytes).await {
            self.sink_error(e);
        }
    }

    async fn say(&mut self, text: &str) {
        if let Err(e) = self.console.line(text).await {
            self.sink_error(e);
        }
    }

    fn sink_error(&mut self, e: std::io::Error) {
        if !self.sink_failed {
            warn!(app = self.app, "writing to the console failed: {}", e);
            self.sink_failed = true;
        }
    }
}

/// Reads the merged output until end of file, a read error ends the stream like EOF would
async fn drain_output(mut output: Receiver, chunks: mpsc::Sender<Vec<u8>>, app: String) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match output.read(&mut buf).await {
            Ok(0) => break,
            Ok(len) => {
                if chunks.send(buf[..len].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(app = %app, "reading child output failed: {}", e);
                break;
            }
        }
    }
    debug!(app = %app, "output closed");
}
