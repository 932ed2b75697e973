//! Tests for configuration loading

use std::path::PathBuf;

use sloggo_protocol::LogFormat;

use crate::{Config, FormatSelector, ListenerKind};

#[test]
fn test_defaults() {
    let config = Config::default();

    assert_eq!(
        config.listeners,
        vec![ListenerKind::Tcp, ListenerKind::Udp]
    );
    assert_eq!(config.udp_port, 5514);
    assert_eq!(config.tcp_port, 6514);
    assert_eq!(config.api_port, 8080);
    assert_eq!(config.retention_minutes, 43200);
    assert_eq!(config.log_format, LogFormat::Auto);
    assert!(!config.debug);
    assert!(config.data_dir.is_none());
}

#[test]
fn test_listener_enabled() {
    let config = Config {
        listeners: vec![ListenerKind::Udp],
        ..Default::default()
    };

    assert!(config.listener_enabled(ListenerKind::Udp));
    assert!(!config.listener_enabled(ListenerKind::Tcp));
}

#[test]
fn test_database_path_with_data_dir() {
    let config = Config {
        data_dir: Some(PathBuf::from("/tmp/sloggo-test")),
        ..Default::default()
    };

    assert_eq!(
        config.database_path().unwrap(),
        PathBuf::from("/tmp/sloggo-test/logs.db")
    );
}

#[test]
fn test_database_path_defaults_next_to_executable() {
    let config = Config::default();
    let path = config.database_path().unwrap();

    assert!(path.ends_with(".sloggo/logs.db"));
}

#[test]
fn test_format_selector() {
    let selector = FormatSelector::default();
    assert_eq!(selector.get(), LogFormat::Auto);

    selector.set(LogFormat::Rfc3164);
    assert_eq!(selector.get(), LogFormat::Rfc3164);

    // Clones observe the same cell
    let clone = selector.clone();
    clone.set(LogFormat::Rfc5424);
    assert_eq!(selector.get(), LogFormat::Rfc5424);
}
