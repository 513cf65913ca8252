use std::path::PathBuf;
use std::time::Duration;

use marksync::config::{ConfigFlags, load_config_flags, parse_flag_tokens};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".marksyncrc");
    let content = r#"
# comment
--watch

--idle-ms 250

--debug-log=sync.log
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.watch);
    assert_eq!(flags.idle_ms, Some(250));
    assert_eq!(flags.debug_log, Some(PathBuf::from("sync.log")));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".marksyncrc");
    let content = "--watch\n--idle-ms 250\n--debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "marksync".to_string(),
        "--idle-ms".to_string(),
        "80".to_string(),
        "--show-preamble".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.watch, "file flags should remain enabled");
    assert!(effective.show_preamble, "cli flags should be applied");
    assert_eq!(effective.idle_ms, Some(80), "cli should override idle threshold");
    assert_eq!(
        effective.debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
    assert_eq!(effective.timings().idle_threshold, Duration::from_millis(80));
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "marksync".to_string(),
        "--outbound-ms=5".to_string(),
        "--inbound-ms=45".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.outbound_ms, Some(5));
    assert_eq!(flags.inbound_ms, Some(45));
}

#[test]
fn test_config_union_merges_booleans() {
    let file = ConfigFlags {
        watch: true,
        ..ConfigFlags::default()
    };
    let cli = ConfigFlags {
        perf: true,
        show_preamble: true,
        ..ConfigFlags::default()
    };
    let merged = file.union(&cli);
    assert!(merged.watch);
    assert!(merged.perf);
    assert!(merged.show_preamble);
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_config_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, ConfigFlags::default());
}
