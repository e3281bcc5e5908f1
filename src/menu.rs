// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, warn};

use crate::app::AppRecord;
use crate::config::Config;
use crate::console::Console;
use crate::supervisor::ProcessSupervisor;
use crate::Error;

pub const MENU_TITLE: &str = "appmenu";
const SEPARATOR_WIDTH: usize = 60;
const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[H";

/// What the operator picked
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Index into the app list
    App(usize),
    Reload,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceError {
    NotANumber,
    OutOfRange,
}

impl fmt::Display for ChoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceError::NotANumber => f.write_str("Please enter a valid number."),
            ChoiceError::OutOfRange => f.write_str("Choice out of range. Try again."),
        }
    }
}

/// The numbered menu; apps first, then reload and exit
pub fn render(apps: &[AppRecord]) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let mut menu = format!("{sep}\n{title}\n{sep}\n", sep = separator, title = MENU_TITLE);

    for (index, app) in apps.iter().enumerate() {
        match app.description() {
            Some(description) => {
                menu.push_str(&format!("{}. {} - {}\n", index + 1, app.name(), description))
            }
            None => menu.push_str(&format!("{}. {}\n", index + 1, app.name())),
        }
    }

    let aux = apps.len() + 1;
    menu.push_str(&format!("{}. Reload configuration\n", aux));
    menu.push_str(&format!("{}. Exit\n", aux + 1));
    menu.push_str(&separator);
    menu
}

/// Maps the operator's answer onto a `Selection` for a menu of `app_count` apps
pub fn parse_choice(input: &str, app_count: usize) -> Result<Selection, ChoiceError> {
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| ChoiceError::NotANumber)?;

    match choice {
        n if n >= 1 && n <= app_count => Ok(Selection::App(n - 1)),
        n if n == app_count + 1 => Ok(Selection::Reload),
        n if n == app_count + 2 => Ok(Selection::Exit),
        _ => Err(ChoiceError::OutOfRange),
    }
}

enum Prompt {
    Chose(Selection),
    EndOfInput,
    Interrupted,
}

/// Where the loop goes once a launch has been acknowledged
#[derive(Debug, PartialEq, Eq)]
enum AfterRun {
    Menu,
    Quit,
}

/// The menu loop: choose an app, run it, come back
pub struct MenuController<W, R> {
    config_path: PathBuf,
    grace_period: Option<Duration>,
    config: Config,
    supervisor: ProcessSupervisor,
    console: Console<W, R>,
    clear_screen: bool,
}

impl<W, R> MenuController<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    /// Loads the configuration at `config_path`, failing if it is not usable
    ///
    /// `grace_period` takes precedence over the configured value, also across reloads.
    pub fn new(
        config_path: PathBuf,
        grace_period: Option<Duration>,
        console: Console<W, R>,
    ) -> Result<Self, Error> {
        let config = load(&config_path, grace_period)?;
        let supervisor = ProcessSupervisor::new(config.supervisor().clone());

        Ok(Self {
            config_path,
            grace_period,
            config,
            supervisor,
            console,
            clear_screen: false,
        })
    }

    /// Clear the terminal before each run
    pub fn clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_console(self) -> Console<W, R> {
        self.console
    }

    /// Runs until the operator exits, input ends, or Ctrl+C is pressed at a prompt
    pub async fn run(&mut self) -> Result<(), Error> {
        loop {
            match self.prompt().await? {
                Prompt::Chose(Selection::App(index)) => {
                    let record = self.config.apps()[index].clone();
                    if self.launch(&record).await? == AfterRun::Quit {
                        self.console.line("\nExiting...").await?;
                        return Ok(());
                    }
                }
                Prompt::Chose(Selection::Reload) => self.reload().await?,
                Prompt::Chose(Selection::Exit) | Prompt::EndOfInput => {
                    self.console.line("Goodbye!").await?;
                    return Ok(());
                }
                Prompt::Interrupted => {
                    self.console.line("\nExiting...").await?;
                    return Ok(());
                }
            }
        }
    }

    async fn prompt(&mut self) -> Result<Prompt, Error> {
        let menu = render(self.config.apps());
        self.console.line(&menu).await?;

        loop {
            self.console.write_all(b"Select an option: ").await?;

            let line = tokio::select! {
                line = self.console.read_line() => line?,
                _ = tokio::signal::ctrl_c() => return Ok(Prompt::Interrupted),
            };
            let line = match line {
                Some(line) => line,
                None => return Ok(Prompt::EndOfInput),
            };

            match parse_choice(&line, self.config.apps().len()) {
                Ok(selection) => return Ok(Prompt::Chose(selection)),
                Err(e) => self.console.line(&e.to_string()).await?,
            }
        }
    }

    async fn launch(&mut self, record: &AppRecord) -> Result<AfterRun, Error> {
        if self.clear_screen {
            self.console.write_all(CLEAR_SCREEN).await?;
        }

        match self.supervisor.run(record, &mut self.console).await {
            Ok(result) if result.quit_requested => Ok(AfterRun::Quit),
            Ok(result) => {
                info!(app = record.name(), code = result.exit_code(), "returned to menu");
                Ok(AfterRun::Menu)
            }
            Err(e) if e.is_launch() => {
                warn!("{}", e);
                self.console
                    .line(&format!("→ {}. Press Enter to return to the menu.", e))
                    .await?;
                tokio::select! {
                    line = self.console.read_line() => {
                        line?;
                        Ok(AfterRun::Menu)
                    }
                    _ = tokio::signal::ctrl_c() => Ok(AfterRun::Quit),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn reload(&mut self) -> Result<(), Error> {
        self.console.line("Reloading configuration...").await?;

        match load(&self.config_path, self.grace_period) {
            Ok(config) => {
                self.supervisor = ProcessSupervisor::new(config.supervisor().clone());
                self.config = config;
            }
            Err(e) => {
                warn!("reload failed: {}", e);
                self.console
                    .line(&format!("Failed to load configuration: {}", e))
                    .await?;
                self.console
                    .line("Keeping previous configuration.")
                    .await?;
            }
        }

        Ok(())
    }
}

fn load(path: &std::path::Path, grace_period: Option<Duration>) -> Result<Config, Error> {
    let mut config = Config::load(path)?;
    if let Some(grace_period) = grace_period {
        config.supervisor_mut().grace_period = grace_period;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apps() -> Vec<AppRecord> {
        vec![
            AppRecord::new("api", "make run", "/").with_description("HTTP API"),
            AppRecord::new("worker", "make work", "/"),
        ]
    }

    #[test]
    fn renders_apps_and_auxiliary_entries() {
        let menu = render(&apps());
        let lines: Vec<&str> = menu.lines().collect();

        assert_eq!(lines[0], "=".repeat(60));
        assert_eq!(lines[1], MENU_TITLE);
        assert_eq!(lines[3], "1. api - HTTP API");
        assert_eq!(lines[4], "2. worker");
        assert_eq!(lines[5], "3. Reload configuration");
        assert_eq!(lines[6], "4. Exit");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn parses_choices() {
        assert_eq!(parse_choice(" 1 ", 2), Ok(Selection::App(0)));
        assert_eq!(parse_choice("2", 2), Ok(Selection::App(1)));
        assert_eq!(parse_choice("3", 2), Ok(Selection::Reload));
        assert_eq!(parse_choice("4", 2), Ok(Selection::Exit));
        assert_eq!(parse_choice("0", 2), Err(ChoiceError::OutOfRange));
        assert_eq!(parse_choice("5", 2), Err(ChoiceError::OutOfRange));
        assert_eq!(parse_choice("two", 2), Err(ChoiceError::NotANumber));
        assert_eq!(parse_choice("-1", 2), Err(ChoiceError::NotANumber));
    }
}
