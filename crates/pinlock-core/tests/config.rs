use pinlock_core::config::GlobalConfig;
use tempfile::TempDir;

#[test]
fn defaults_when_empty() {
    let config = GlobalConfig::parse_toml("").unwrap();
    assert_eq!(config.resolver.max_backtracks, 10_000);
    assert_eq!(config.index.timeout_secs, 30);
    assert!(config.index.jobs >= 1);
    assert_eq!(config.output.tool_name, "pinlock");
}

#[test]
fn reads_kebab_case_keys() {
    let config = GlobalConfig::parse_toml(
        r#"
[resolver]
max-backtracks = 50

[index]
timeout-secs = 5
jobs = 2

[output]
tool-name = "pinlock-ci"
"#,
    )
    .unwrap();
    assert_eq!(config.resolver.max_backtracks, 50);
    assert_eq!(config.index.timeout_secs, 5);
    assert_eq!(config.index.jobs, 2);
    assert_eq!(config.output.tool_name, "pinlock-ci");
}

#[test]
fn invalid_toml_is_config_error() {
    let err = GlobalConfig::parse_toml("[resolver\n").unwrap_err();
    assert!(err.to_string().contains("Config error"), "got: {err}");
}

#[test]
fn missing_file_yields_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = GlobalConfig::load_from(&tmp.path().join("config.toml")).unwrap();
    assert_eq!(config.resolver.max_backtracks, 10_000);
}

#[test]
fn load_from_existing_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[index]\ntimeout-secs = 7\n").unwrap();
    let config = GlobalConfig::load_from(&path).unwrap();
    assert_eq!(config.index.timeout_secs, 7);
}
