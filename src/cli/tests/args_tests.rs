use clap::Parser;
use std::path::{Path, PathBuf};

use super::args::{CacheAction, CliArgs, Command};

#[test]
fn parses_transform_defaults() {
    let args = CliArgs::try_parse_from(["yieldify", "transform", "src"])
        .expect("transform args should parse");

    assert!(args.config.is_none());
    assert!(!args.no_color);
    let Command::Transform(transform) = args.command else {
        panic!("expected transform command");
    };
    assert_eq!(transform.paths, vec![PathBuf::from("src")]);
    assert!(transform.out_dir.is_none());
    assert!(!transform.module);
    assert!(!transform.no_cache);
    assert!(!transform.json);
    assert_eq!(transform.runtime_name, None);
}

#[test]
fn parses_transform_flags() {
    let args = CliArgs::try_parse_from([
        "yieldify",
        "transform",
        "a.js",
        "lib",
        "--out-dir",
        "dist",
        "--module",
        "--no-cache",
        "--runtime-name",
        "lib.rt",
        "--json",
        "--config",
        "configs/yieldify.json",
    ])
    .expect("flagged args should parse");

    assert_eq!(
        args.config.as_deref(),
        Some(Path::new("configs/yieldify.json"))
    );
    let Command::Transform(transform) = args.command else {
        panic!("expected transform command");
    };
    assert_eq!(
        transform.paths,
        vec![PathBuf::from("a.js"), PathBuf::from("lib")]
    );
    assert_eq!(transform.out_dir.as_deref(), Some(Path::new("dist")));
    assert!(transform.module);
    assert!(transform.no_cache);
    assert!(transform.json);
    assert_eq!(transform.runtime_name.as_deref(), Some("lib.rt"));
}

#[test]
fn transform_requires_paths() {
    assert!(CliArgs::try_parse_from(["yieldify", "transform"]).is_err());
}

#[test]
fn parses_cache_actions() {
    let args = CliArgs::try_parse_from(["yieldify", "cache", "clear"]).unwrap();
    assert!(matches!(
        args.command,
        Command::Cache {
            action: CacheAction::Clear
        }
    ));

    let args = CliArgs::try_parse_from(["yieldify", "--no-color", "cache", "path"]).unwrap();
    assert!(args.no_color);
    assert!(matches!(
        args.command,
        Command::Cache {
            action: CacheAction::Path
        }
    ));
}

#[test]
fn parses_watch() {
    let args =
        CliArgs::try_parse_from(["yieldify", "watch", "src", "lib", "--debounce-ms", "50"]).unwrap();
    let Command::Watch(watch) = args.command else {
        panic!("expected watch command");
    };
    assert_eq!(watch.dirs, vec![PathBuf::from("src"), PathBuf::from("lib")]);
    assert_eq!(watch.debounce_ms, 50);
}
