// Copyright 2019 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tokio::runtime;
use tracing_subscriber::EnvFilter;

use appmenu::config::Config;
use appmenu::console::Console;
use appmenu::menu::MenuController;
use appmenu::Error;

const CONFIG: &str = "config";
const GRACE_PERIOD: &str = "grace-period";
const CHECK: &str = "check";

const DEFAULT_CONFIG: &str = "config/apps.yaml";
const LOG_ENV: &str = "APPMENU_LOG";

fn cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new(CONFIG)
                .short('c')
                .long(CONFIG)
                .value_name("PATH")
                .default_value(DEFAULT_CONFIG)
                .value_parser(value_parser!(PathBuf))
                .help("path to the apps configuration file (YAML)"),
        )
        .arg(
            Arg::new(GRACE_PERIOD)
                .short('g')
                .long(GRACE_PERIOD)
                .value_name("SECS")
                .value_parser(parse_seconds)
                .help("seconds an interrupted app has to exit before it is killed"),
        )
        .arg(
            Arg::new(CHECK)
                .long(CHECK)
                .action(ArgAction::SetTrue)
                .help("validate the configuration, list the apps and exit"),
        )
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    value
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| format!("'{}' is not a non-negative number of seconds", value))
}

/// Logs go to stderr and stay quiet by default, stdout belongs to the operator
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = cli().get_matches();
    init_logging();

    let runtime = match runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to initialize Tokio Runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(&args));
    // a pending stdin read must not keep the process alive
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", env!("CARGO_PKG_NAME"), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &ArgMatches) -> Result<(), Error> {
    let config_path = args
        .get_one::<PathBuf>(CONFIG)
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let grace_period = args.get_one::<Duration>(GRACE_PERIOD).copied();

    if args.get_flag(CHECK) {
        return check(&config_path, grace_period);
    }

    let mut controller = MenuController::new(config_path, grace_period, Console::stdio())?
        .clear_screen(std::io::stdout().is_terminal());

    controller.run().await
}

fn check(config_path: &std::path::Path, grace_period: Option<Duration>) -> Result<(), Error> {
    let mut config = Config::load(config_path)?;
    if let Some(grace_period) = grace_period {
        config.supervisor_mut().grace_period = grace_period;
    }

    let settings = config.supervisor();
    println!("Configuration: {}", config_path.display());
    println!(
        "Shell: {}, grace period: {:?}, graceful stop: {}",
        settings.shell.display(),
        settings.grace_period,
        settings.graceful_stop
    );
    for app in config.apps() {
        println!(
            "  {}: {} (in {})",
            app.name(),
            app.command(),
            app.working_dir().display()
        );
    }

    Ok(())
}
