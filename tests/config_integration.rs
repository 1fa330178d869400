use std::path::PathBuf;

use pagemaid::config::{ConfigFlags, ThemeMode, load_config_flags, parse_flag_tokens};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".pagemaidrc");
    let content = r#"
# comment
--watch

--theme light
   
--endpoint 'cmd:mmdc --puppeteerConfigFile pptr.json'
--render-debug-log=render.log
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.watch);
    assert_eq!(flags.theme, Some(ThemeMode::Light));
    assert_eq!(
        flags.endpoints,
        vec!["cmd:mmdc --puppeteerConfigFile pptr.json"]
    );
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".pagemaidrc");
    let content =
        "--watch\n--theme light\n--endpoint https://kroki.example\n--render-debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "pagemaid".to_string(),
        "render".to_string(),
        "--theme".to_string(),
        "dark".to_string(),
        "--perf".to_string(),
        "--endpoint".to_string(),
        "cmd:mmdc".to_string(),
        "page.html".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.watch, "file flags should remain enabled");
    assert!(effective.perf, "cli flags should be applied");
    assert_eq!(effective.theme, Some(ThemeMode::Dark), "cli should override theme");
    assert_eq!(
        effective.endpoints,
        vec!["cmd:mmdc"],
        "cli endpoints should replace the file's list"
    );
    assert_eq!(
        effective.render_debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "pagemaid".to_string(),
        "--theme=dark".to_string(),
        "--endpoint=https://kroki.io".to_string(),
        "--render-debug-log=render.log".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.theme, Some(ThemeMode::Dark));
    assert_eq!(flags.endpoints, vec!["https://kroki.io"]);
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
}

#[test]
fn test_config_union_merges_booleans() {
    let file = ConfigFlags {
        watch: true,
        ..ConfigFlags::default()
    };
    let cli = ConfigFlags {
        perf: true,
        ..ConfigFlags::default()
    };
    let merged = file.union(&cli);
    assert!(merged.watch);
    assert!(merged.perf);
}
