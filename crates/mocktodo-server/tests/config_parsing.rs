use std::{env, fs, time::Duration};

use mocktodo_auth::config::AuthMode;
use mocktodo_server::ConfigOverrides;
use mocktodo_server::config::loader::{load_config, load_config_with_overrides};

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("mocktodo.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
shutdown_grace = "2s"

[storage]
json_file_path = "data.json"

[auth]
mode = "both"
session_ttl = "30m"

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.server.shutdown_grace, Duration::from_secs(2));
    assert_eq!(cfg.auth.mode, AuthMode::Both);
    assert_eq!(cfg.auth.session_ttl, Duration::from_secs(1800));
    assert_eq!(cfg.logging.level, "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("MOCKTODO__SERVER__PORT", "9091");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.server.port, 9091);

    // 3) CLI overrides win over env
    let overrides = ConfigOverrides {
        port: Some(7070),
        auth_required: Some(false),
        ..ConfigOverrides::default()
    };
    let cfg_cli = load_config_with_overrides(path.to_str(), &overrides).expect("overrides");
    assert_eq!(cfg_cli.server.port, 7070);
    assert!(!cfg_cli.auth.required);
    unsafe {
        env::remove_var("MOCKTODO__SERVER__PORT");
    }

    // 4) oidc mode without a client config is rejected
    let invalid_path = dir.path().join("invalid.toml");
    fs::write(&invalid_path, "[auth]\nmode = \"oidc\"\n").expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("oidc_config"));

    // 5) Unknown modes do not deserialize
    let unknown_path = dir.path().join("unknown.toml");
    fs::write(&unknown_path, "[auth]\nmode = \"cookie\"\n").expect("write unknown toml");
    assert!(load_config(unknown_path.to_str()).is_err());

    // 6) A named file that does not exist is an error
    assert!(load_config(Some("/nonexistent/mocktodo.toml")).is_err());
}
