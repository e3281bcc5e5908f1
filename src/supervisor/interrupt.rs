// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use async_trait::async_trait;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;

use crate::Error;

/// Operator interrupts, as seen by a running supervisor.
///
/// `recv` must be cancel safe, the supervisor drops pending calls whenever another event wins.
#[async_trait]
pub trait InterruptSource: Send {
    /// Waits for the next interrupt, `None` once no more can arrive
    async fn recv(&mut self) -> Option<()>;
}

/// SIGINT from the terminal, subscribed for as long as this value lives
#[derive(Debug)]
pub struct CtrlC {
    signal: Signal,
}

impl CtrlC {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            signal: signal(SignalKind::interrupt())?,
        })
    }
}

#[async_trait]
impl InterruptSource for CtrlC {
    async fn recv(&mut self) -> Option<()> {
        self.signal.recv().await
    }
}

#[async_trait]
impl InterruptSource for mpsc::Receiver<()> {
    async fn recv(&mut self) -> Option<()> {
        mpsc::Receiver::recv(self).await
    }
}
