// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io;

use tokio::io::{
    stdin, stdout, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin,
    Stdout,
};

/// The operator's terminal: a line oriented output sink and an input to read answers from.
///
/// Menu and supervisor share one `Console` so input buffered by one is never lost to the other.
#[derive(Debug)]
pub struct Console<W, R> {
    out: W,
    input: R,
}

impl Console<Stdout, BufReader<Stdin>> {
    pub fn stdio() -> Self {
        Self::new(stdout(), BufReader::new(stdin()))
    }
}

impl<W, R> Console<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    pub fn new(out: W, input: R) -> Self {
        Self { out, input }
    }

    /// Writes and flushes, output is never held back
    pub async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes).await?;
        self.out.flush().await
    }

    pub async fn line(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    /// Next line without its terminator, `None` at end of input
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(&['\r', '\n'][..]).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_parts(self) -> (W, R) {
        (self.out, self.input)
    }
}
