use std::path::Path;
use std::process::Stdio;

use assert_cmd::Command;
use rust_xlsxwriter::Workbook;

fn write_orders(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Orders").unwrap();
    sheet.write_string(0, 0, "Item").unwrap();
    sheet.write_string(0, 1, "Qty").unwrap();
    for (r, (item, qty)) in [("Bolt", 10.0), ("Nut", 25.0), ("Washer", 5.0)]
        .into_iter()
        .enumerate()
    {
        sheet.write_string(r as u32 + 1, 0, item).unwrap();
        sheet.write_number(r as u32 + 1, 1, qty).unwrap();
    }
    workbook.save(path).unwrap();
}

fn sheetpilot() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("sheetpilot"))
}

fn show(path: &Path) -> serde_json::Value {
    let assert = sheetpilot().arg("show").arg(path).assert().success();
    serde_json::from_slice(&assert.get_output().stdout).unwrap()
}

#[test]
fn dispatch_report_lists_actions_and_denials() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.xlsx");
    write_orders(&path);

    let assert = sheetpilot()
        .arg("dispatch")
        .arg(&path)
        .args(["--policy", "read_write", "--report"])
        .args(["--text", "update row 2 'Qty' to '30' then delete row 1"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(
        stdout.starts_with("Table actions performed:\nUpdated row 2, column 'Qty' to '30'"),
        "stdout:\n{stdout}"
    );
    assert!(stdout.contains("Failed to delete row"), "stdout:\n{stdout}");

    let rows = show(&path);
    assert_eq!(rows["rows"][1]["Qty"], "30");
    assert_eq!(rows["rows"].as_array().unwrap().len(), 3);
}

#[test]
fn dispatch_reads_text_from_stdin_and_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.xlsx");
    write_orders(&path);

    let assert = sheetpilot()
        .arg("dispatch")
        .arg(&path)
        .args(["--policy", "read_write_delete"])
        .write_stdin("delete row 3")
        .assert()
        .success();
    let outcomes: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(outcomes[0]["kind"], "delete");
    assert_eq!(outcomes[0]["success"], true);
    assert_eq!(show(&path)["rows"].as_array().unwrap().len(), 2);
}

#[test]
fn direct_commands_edit_and_report_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.xlsx");
    write_orders(&path);

    sheetpilot()
        .arg("add-row")
        .arg(&path)
        .args(["--data", "Item=Rivet", "--data", "Qty=7"])
        .assert()
        .success();
    sheetpilot()
        .arg("update-cell")
        .arg(&path)
        .args(["--row", "1", "--column", "Item", "--value", "Hex bolt"])
        .assert()
        .success();

    let assert = sheetpilot()
        .arg("delete-row")
        .arg(&path)
        .args(["--sheet", "Orders", "--row", "9"])
        .assert()
        .failure();
    let result: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "row 9 does not exist (table has 4 rows)");

    let rows = show(&path);
    assert_eq!(rows["rows"][0]["Item"], "Hex bolt");
    assert_eq!(rows["rows"][3]["Item"], "Rivet");
}

#[test]
fn summary_lists_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.xlsx");
    write_orders(&path);

    let assert = sheetpilot().arg("summary").arg(&path).assert().success();
    let summary: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(summary["sheet_names"], serde_json::json!(["Orders"]));
    assert_eq!(summary["sheets"][0]["row_count"], 3);
}

#[test]
fn unknown_policy_is_a_usage_error() {
    sheetpilot()
        .args(["dispatch", "missing.xlsx", "--policy", "admin", "--text", "x"])
        .assert()
        .failure();
}

#[test]
fn concurrent_processes_keep_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.xlsx");
    write_orders(&path);

    let children: Vec<_> = (0..8)
        .map(|i| {
            std::process::Command::new(assert_cmd::cargo::cargo_bin!("sheetpilot"))
                .arg("add-row")
                .arg(&path)
                .args(["--data", &format!("Item=r{i}")])
                .args(["--lock-timeout-ms", "60000"])
                .stdout(Stdio::null())
                .spawn()
                .unwrap()
        })
        .collect();
    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let rows = show(&path);
    let mut items: Vec<String> = rows["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["Item"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(items.len(), 11);
    items.sort();
    let mut expected: Vec<String> = ["Bolt", "Nut", "Washer"]
        .into_iter()
        .map(String::from)
        .chain((0..8).map(|i| format!("r{i}")))
        .collect();
    expected.sort();
    assert_eq!(items, expected);
}
