//! Command line parsing.

use crate::{parse_args, Args};

fn args(list: &[&str]) -> impl Iterator<Item = String> {
    list.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .into_iter()
}

#[test]
fn no_arguments_use_config() {
    assert_eq!(parse_args(args(&[])).unwrap(), Args::default());
}

#[test]
fn overrides_are_parsed() {
    let parsed = parse_args(args(&[
        "--offline", "--lat", "-33.86", "--lon", "151.21", "--width", "120", "--height", "40",
        "--config", "local.toml",
    ]))
    .unwrap();

    assert_eq!(
        parsed,
        Args {
            config: Some("local.toml".to_string()),
            offline: true,
            lat: Some(-33.86),
            lon: Some(151.21),
            width: Some(120),
            height: Some(40),
        }
    );
}

#[test]
fn bad_arguments_are_rejected() {
    assert!(parse_args(args(&["--stdout"])).is_err());
    assert!(parse_args(args(&["--lat"])).is_err());
    assert!(parse_args(args(&["--width", "wide"])).is_err());
}
