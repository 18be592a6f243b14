use super::types::*;
use super::AppConfig;
use std::path::Path;

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = AppConfig::load(Path::new("no-such-config.toml")).unwrap();
    assert!(cfg.sections.is_empty());
    assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
}

#[test]
fn test_load_rejects_unknown_extension() {
    let tmp = std::env::temp_dir().join("unimock-test-config.yaml");
    std::fs::write(&tmp, "sections: {}").unwrap();
    let err = AppConfig::load(&tmp).unwrap_err();
    assert!(err.to_string().contains("unsupported config format"));
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_validate_rejects_trailing_double_star_mid_pattern() {
    let mut cfg = AppConfig::default();
    cfg.sections.insert(
        "bad".to_string(),
        SectionConfig {
            path_pattern: "/a/**/b".to_string(),
            case_sensitive: true,
            strict_path: false,
            return_body: false,
            header_id_names: vec![],
            body_id_paths: vec![],
            transformations: TransformConfig::default(),
        },
    );
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_accepts_well_formed_section() {
    let mut cfg = AppConfig::default();
    cfg.sections.insert(
        "users".to_string(),
        SectionConfig {
            path_pattern: "/users/*".to_string(),
            case_sensitive: true,
            strict_path: false,
            return_body: false,
            header_id_names: vec![],
            body_id_paths: vec!["/id".to_string()],
            transformations: TransformConfig::default(),
        },
    );
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_env_override_listen() {
    std::env::set_var("UNIMOCK_LISTEN", "127.0.0.1:9999");
    let mut cfg = AppConfig::default();
    cfg.apply_env_overrides();
    assert_eq!(cfg.listen_addr(), "127.0.0.1:9999");
    std::env::remove_var("UNIMOCK_LISTEN");
}
