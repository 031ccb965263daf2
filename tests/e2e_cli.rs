
use assert_cmd::{cargo, prelude::*};
use cli_helpers::{import_json, run_cmd, run_cmd_json, MERCADOPAGO_SAMPLE};
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn setup_temp_home() -> TempDir {
    TempDir::new().expect("failed to create temp home")
}

#[test]
fn records_list_empty_db_no_color_when_piped() {
    let home = setup_temp_home();

    let mut cmd = Command::new(cargo::cargo_bin!("cleaner"));
    cmd.env("HOME", home.path());
    cmd.arg("records").arg("list").arg("--no-color");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No records found"))
        .stdout(predicate::str::contains("\u{001b}[").not());
}

#[test]
fn import_dry_run_does_not_create_db() {
    let home = setup_temp_home();
    let db_path = sqlite_helpers::db_path(&home);
    assert!(!db_path.exists(), "db should start absent");

    let mut cmd = Command::new(cargo::cargo_bin!("cleaner"));
    cmd.env("HOME", home.path())
        .arg("--no-color")
        .arg("import")
        .arg("mercadopago")
        .arg(MERCADOPAGO_SAMPLE)
        .arg("--dry-run");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Found 3 records"))
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("\u{001b}[").not());

    assert!(!db_path.exists(), "dry-run should not create db");
}

#[test]
fn reimport_reports_duplicates() {
    let home = setup_temp_home();

    let first = import_json(&home, "mercadopago", MERCADOPAGO_SAMPLE).unwrap();
    assert_eq!(first["totalRecords"], 3);
    assert_eq!(first["importedRecords"], 3);
    assert_eq!(first["duplicateRecords"], 0);

    let second = import_json(&home, "mercadopago", MERCADOPAGO_SAMPLE).unwrap();
    assert_eq!(second["importedRecords"], 0);
    assert_eq!(second["duplicateRecords"], 3);
    assert_eq!(second["failedRecords"], 0);

    let conn = sqlite_helpers::open_conn(&home).unwrap();
    assert_eq!(sqlite_helpers::count_records(&conn).unwrap(), 3);
}

#[test]
fn unknown_provider_fails_with_available_list() {
    let home = setup_temp_home();

    let mut cmd = cli_helpers::base_cmd(&home);
    cmd.arg("import").arg("bbva").arg(MERCADOPAGO_SAMPLE);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider 'bbva'"))
        .stderr(predicate::str::contains("santander, mercadopago"));
}

#[test]
fn records_add_list_and_delete() {
    let home = setup_temp_home();

    let added = run_cmd_json(
        &home,
        &[
            "records",
            "add",
            "2025-07-30",
            "Alquiler",
            "-350000",
            "--account",
            "mp",
            "--category",
            "Vivienda",
        ],
    )
    .unwrap();
    assert_eq!(added["description"], "Alquiler");
    assert_eq!(added["category"], "Vivienda");
    let id = added["id"].as_i64().unwrap();

    let mut duplicate = cli_helpers::base_cmd(&home);
    duplicate.args(["records", "add", "2025-07-30", "Alquiler", "-350000.00"]);
    duplicate
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate record"));

    let listed = run_cmd_json(&home, &["records", "list", "--account", "mp"]).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["accountId"], "mp");

    run_cmd(&home, &["records", "delete", &id.to_string()]).unwrap();
    let listed = run_cmd_json(&home, &["records", "list"]).unwrap();
    assert!(listed.as_array().unwrap().is_empty());

    let mut missing = cli_helpers::base_cmd(&home);
    missing.args(["records", "delete", &id.to_string()]);
    missing
        .assert()
        .failure()
        .stderr(predicate::str::contains("record not found"));
}

#[test]
fn account_falls_back_to_config_file() {
    let home = setup_temp_home();
    let config_dir = home.path().join(".cleaner");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "default_account = \"visa\"\n").unwrap();

    import_json(&home, "mercadopago", MERCADOPAGO_SAMPLE).unwrap();

    let listed = run_cmd_json(&home, &["records", "list", "--account", "visa"]).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 3);
}

#[test]
fn parse_writes_one_file_per_currency() {
    let home = setup_temp_home();
    let out_dir = home.path().join("out");

    let output = run_cmd(
        &home,
        &[
            "parse",
            "mercadopago",
            MERCADOPAGO_SAMPLE,
            "-o",
            out_dir.to_str().unwrap(),
        ],
    )
    .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("transactions_ars.csv"));

    let csv = std::fs::read_to_string(out_dir.join("transactions_ars.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "date,description,amount");
    assert_eq!(lines[1], "25/07/2025,Pago con QR Cafe - 119300000002,-2350");
    assert_eq!(lines.len(), 4);
    assert!(!out_dir.join("transactions_usd.csv").exists());
    assert!(!sqlite_helpers::db_path(&home).exists());
}

#[test]
fn records_export_to_stdout() {
    let home = setup_temp_home();
    import_json(&home, "mercadopago", MERCADOPAGO_SAMPLE).unwrap();

    let mut cmd = cli_helpers::base_cmd(&home);
    cmd.args(["records", "export"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with(
            "date,description,amount,currency,accountId,category",
        ))
        .stdout(predicate::str::contains("22/07/2025").not())
        .stdout(predicate::str::contains("23/07/2025"));
}
