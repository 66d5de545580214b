//! Module tables loaded from disk, and the command-line tool using them.

use easm_rewrite::{CallKind, ConfigError, ModuleTable};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const TABLE: &str = r#"{
    "app/store": { "kind": "store_method", "functions": ["get", "set"] },
    "app/ui": { "kind": "sub_store_factory", "functions": ["connect"] }
}"#;

fn binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_easm-rewrite"));
    cmd.env_remove("EASM_MODULES").env_remove("EASM_OUT_DIR");
    cmd
}

// ============================================================================
// ModuleTable::from_path
// ============================================================================

#[test]
fn test_load_table_from_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("modules.json");
    fs::write(&file, TABLE).unwrap();

    let table = ModuleTable::from_path(&file).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("app/ui").unwrap().kind, CallKind::SubStoreFactory);
    assert!(table.get("app/store").unwrap().exports("set"));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("absent.json");
    let err = ModuleTable::from_path(&file).unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert_eq!(path, file),
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn test_malformed_file_is_json_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("modules.json");
    fs::write(&file, "{ not json").unwrap();
    assert!(matches!(
        ModuleTable::from_path(&file),
        Err(ConfigError::Json(_))
    ));
}

// ============================================================================
// easm-rewrite binary
// ============================================================================

#[test]
fn test_cli_prints_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("view.js");
    fs::write(
        &input,
        "import { get } from '@easm/core'\nexport const title = get(store.state.header.title)\n",
    )
    .unwrap();

    let output = binary().arg(&input).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "import { get } from '@easm/core'\nexport const title = store.get([\"header\", \"title\"])\n"
    );
}

#[test]
fn test_cli_writes_out_dir_with_custom_table() {
    let dir = TempDir::new().unwrap();
    let modules = dir.path().join("modules.json");
    fs::write(&modules, TABLE).unwrap();
    let input = dir.path().join("app.js");
    fs::write(
        &input,
        "import { connect } from 'app/ui';\nconnect(root.state.list, render);\n",
    )
    .unwrap();
    let out_dir = dir.path().join("out");

    let status = binary()
        .arg("--modules")
        .arg(&modules)
        .arg("--out-dir")
        .arg(&out_dir)
        .arg(&input)
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(
        fs::read_to_string(out_dir.join("app.js")).unwrap(),
        "import { connect } from 'app/ui';\nconnect(root.getSubStore([\"list\"]), render);\n"
    );
}

#[test]
fn test_cli_check_fails_on_skipped_calls() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.js");
    fs::write(&input, "import { get } from '@easm/core';\nget(items[i]);\n").unwrap();

    let output = binary()
        .arg("--check")
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let output = binary().arg(&input).output().unwrap();
    assert!(output.status.success());
}

#[test]
fn test_cli_parse_error_exits_2() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.js");
    fs::write(&input, "const = 1;\n").unwrap();

    let output = binary().arg(&input).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("broken.js:1:7"), "{stderr}");
}

#[test]
fn test_cli_rejects_typescript_files() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("store.ts");
    fs::write(&input, "import { get } from '@easm/core';\nget(store.state.a);\n").unwrap();

    let output = binary().arg(&input).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("TypeScript sources are not supported"), "{stderr}");
}

#[test]
fn test_cli_keeps_comments() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("view.js");
    let source = "import { get } from '@easm/core';\n/** Current title. */\nexport const t = get(store.state.t); // eslint-disable-line\n";
    fs::write(&input, source).unwrap();

    let output = binary().arg(&input).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        source.replace("get(store.state.t)", "store.get([\"t\"])")
    );
}
