// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fs;
use std::path::PathBuf;

use appmenu::console::Console;
use appmenu::menu::MenuController;

struct Fixture {
    _tmp: tempfile::TempDir,
    config_file: PathBuf,
    app_dir: PathBuf,
}

fn fixture(command: &str) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let app_dir = tmp.path().join("app");
    fs::create_dir(&app_dir).unwrap();

    let config_file = tmp.path().join("apps.yaml");
    fs::write(
        &config_file,
        format!(
            "apps:\n  - name: echoer\n    command: \"{}\"\n    cwd: app\n    description: says hi\n",
            command
        ),
    )
    .unwrap();

    Fixture {
        _tmp: tmp,
        config_file,
        app_dir,
    }
}

async fn drive(fixture: &Fixture, input: &'static [u8]) -> String {
    let mut controller =
        MenuController::new(fixture.config_file.clone(), None, Console::new(Vec::new(), input))
            .expect("controller");
    controller.run().await.expect("menu loop");

    String::from_utf8_lossy(controller.into_console().output()).into_owned()
}

#[tokio::test]
async fn runs_the_chosen_app_and_returns() {
    let fixture = fixture("echo from-menu");
    let out = drive(&fixture, b"x\n9\n1\n\n3\n").await;

    assert!(out.contains("1. echoer - says hi"));
    assert!(out.contains("2. Reload configuration"));
    assert!(out.contains("Please enter a valid number."));
    assert!(out.contains("Choice out of range. Try again."));
    assert!(out.contains("from-menu\n"));
    assert!(out.contains("exited cleanly"));
    assert!(out.trim_end().ends_with("Goodbye!"));
}

#[tokio::test]
async fn end_of_input_exits() {
    let fixture = fixture("true");
    let out = drive(&fixture, b"").await;

    assert!(out.contains("Goodbye!"));
}

#[tokio::test]
async fn reload_picks_up_changes() {
    let fixture = fixture("true");
    let mut controller = MenuController::new(
        fixture.config_file.clone(),
        None,
        Console::new(Vec::new(), &b"2\n4\n"[..]),
    )
    .unwrap();

    fs::write(
        &fixture.config_file,
        "apps:\n  - {name: first, command: 'true', cwd: app}\n  - {name: second, command: 'true', cwd: app}\n",
    )
    .unwrap();
    controller.run().await.unwrap();

    assert_eq!(controller.config().apps().len(), 2);
    let out = String::from_utf8_lossy(controller.into_console().output()).into_owned();
    assert!(out.contains("Reloading configuration..."));
    assert!(out.contains("2. second"));
}

#[tokio::test]
async fn failed_reload_keeps_previous_configuration() {
    let fixture = fixture("true");
    let mut controller = MenuController::new(
        fixture.config_file.clone(),
        None,
        Console::new(Vec::new(), &b"2\n3\n"[..]),
    )
    .unwrap();

    fs::write(&fixture.config_file, "apps: []\n").unwrap();
    controller.run().await.unwrap();

    assert_eq!(controller.config().apps()[0].name(), "echoer");
    let out = String::from_utf8_lossy(controller.into_console().output()).into_owned();
    assert!(out.contains("Failed to load configuration:"));
    assert!(out.contains("Keeping previous configuration."));
}

#[tokio::test]
async fn launch_error_returns_to_the_menu() {
    let fixture = fixture("true");
    let mut controller = MenuController::new(
        fixture.config_file.clone(),
        None,
        Console::new(Vec::new(), &b"1\n\n3\n"[..]),
    )
    .unwrap();

    fs::remove_dir(&fixture.app_dir).unwrap();
    controller.run().await.unwrap();

    let out = String::from_utf8_lossy(controller.into_console().output()).into_owned();
    assert!(out.contains("failed to launch 'echoer'"));
    assert!(out.contains("Goodbye!"));
}

#[test]
fn unusable_configuration_fails_up_front() {
    let tmp = tempfile::tempdir().unwrap();
    let result = MenuController::new(
        tmp.path().join("missing.yaml"),
        None,
        Console::new(Vec::new(), &b""[..]),
    );

    assert!(result.is_err());
}
