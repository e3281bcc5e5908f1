// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErrorKind {
    /// The child could not be started, no process exists
    #[error("failed to launch '{app}': {reason}")]
    Launch { app: String, reason: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("nix error: {0}")]
    NixError(#[from] nix::Error),
    #[error("yaml error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("an error occured: {0}")]
    ErrorMsg(String),
    #[error("an error occured: {0}")]
    ErrorStr(&'static str),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self(kind)
    }

    pub fn launch(app: impl Into<String>, reason: impl ToString) -> Self {
        Self::from_kind(ErrorKind::Launch {
            app: app.into(),
            reason: reason.to_string(),
        })
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Config(msg.into()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    pub fn is_launch(&self) -> bool {
        matches!(self.0, ErrorKind::Launch { .. })
    }
}

impl<E> From<E> for Error
where
    E: Into<ErrorKind>,
{
    fn from(err: E) -> Self {
        Self::from_kind(err.into())
    }
}

impl From<&'static str> for Error {
    fn from(err: &'static str) -> Self {
        Self::from_kind(ErrorKind::ErrorStr(err))
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Self::from_kind(ErrorKind::ErrorMsg(err))
    }
}
