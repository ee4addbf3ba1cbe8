use std::fs;

use air::config::*;
use tempfile::TempDir;

#[test]
fn test_default_config_covers_supported_languages() {
    let config = AirConfig::default();
    for pattern in ["**/*.py", "**/*.c", "**/*.rs", "**/*.java", "**/*.S", "**/*.ld"] {
        assert!(config.include.iter().any(|p| p == pattern), "{pattern}");
    }
    assert!(config.exclude.iter().any(|p| p == "target/**"));
    assert_eq!(config.profile, "auto");
}

#[test]
fn test_missing_config_yields_defaults_with_root() {
    let dir = TempDir::new().unwrap();
    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.root_dir, dir.path().to_string_lossy());
    assert_eq!(config.include, AirConfig::default().include);
}

#[test]
fn test_save_and_load_config() {
    let dir = TempDir::new().unwrap();
    let config = AirConfig {
        name: "firmware".to_string(),
        profile: "embedded".to_string(),
        ..AirConfig::default()
    };
    save_config(dir.path(), &config).unwrap();

    assert!(get_config_path(dir.path()).exists());
    assert!(!get_air_dir(dir.path()).join("config.tmp").exists());
    assert_eq!(load_config(dir.path()).unwrap(), config);
}

#[test]
fn test_partial_config_fills_defaults() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(get_air_dir(dir.path())).unwrap();
    fs::write(get_config_path(dir.path()), r#"{"name": "fw"}"#).unwrap();

    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.name, "fw");
    assert_eq!(config.max_file_size, AirConfig::default().max_file_size);
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(get_air_dir(dir.path())).unwrap();
    fs::write(get_config_path(dir.path()), "{ not json").unwrap();
    assert!(load_config(dir.path()).is_err());
}

#[test]
fn test_should_include_file() {
    let config = AirConfig::default();
    assert!(should_include_file("main.py", &config));
    assert!(should_include_file("drivers/uart/uart.c", &config));
    assert!(!should_include_file("README.md", &config));
    assert!(!should_include_file("target/debug/build.rs", &config));
    // Exclusion wins over inclusion.
    assert!(!should_include_file("build/gen.c", &config));
    assert!(!should_include_file("pkg/__pycache__/mod.py", &config));
}
