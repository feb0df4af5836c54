mod common;

use std::fs;

use predicates::{prelude::PredicateBooleanExt, str::contains};

use common::{TestWorkspace, analyzer_cmd, fixture_path};

#[test]
fn stats_json_totals_daily_sales_fixture() -> anyhow::Result<()> {
    let input = fixture_path("daily_sales.csv");
    let assert = analyzer_cmd()
        .args(["stats", "-i", input.to_str().unwrap(), "--json"])
        .assert()
        .success();
    let stats: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(stats["total_rows"], 3);
    assert_eq!(stats["total_sales"], 1750.0);
    assert_eq!(stats["top_products"][0]["name"], "A");
    assert_eq!(stats["top_products"][0]["sales"], 1250.0);
    assert_eq!(stats["top_products"][1]["name"], "B");
    assert_eq!(stats["timeseries"][0]["date"], "2024-01-01");
    assert_eq!(stats["timeseries"][0]["sales"], 1500.0);
    assert_eq!(stats["timeseries"][1]["sales"], 250.0);
    Ok(())
}

#[test]
fn stats_table_lists_metrics_and_days() {
    let input = fixture_path("daily_sales.csv");
    analyzer_cmd()
        .args(["stats", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(
            contains("total_sales")
                .and(contains("1750"))
                .and(contains("583.3333"))
                .and(contains("top_product[1] A"))
                .and(contains("day 2024-01-02")),
        );
}

#[test]
fn stats_reads_stdin_with_semicolon_delimiter() -> anyhow::Result<()> {
    let assert = analyzer_cmd()
        .args(["stats", "-i", "-", "--delimiter", ";", "--json"])
        .write_stdin("date;item;amount\n2024-03-01;X;100\n2024-03-01;Y;oops\n")
        .assert()
        .success();
    let stats: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(stats["total_rows"], 2);
    assert_eq!(stats["total_sales"], 100.0);
    assert_eq!(stats["avg_row_sales"], 50.0);
    Ok(())
}

#[test]
fn stats_accepts_json_request_payloads() -> anyhow::Result<()> {
    let input = fixture_path("sales_request.json");
    let assert = analyzer_cmd()
        .args(["stats", "-i", input.to_str().unwrap(), "--json"])
        .assert()
        .success();
    let stats: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(stats["total_sales"], 1750.0);
    assert_eq!(stats["timeseries"][1]["date"], "2024-01-02");
    Ok(())
}

#[test]
fn stats_on_header_only_file_is_all_zero() -> anyhow::Result<()> {
    let workspace = TestWorkspace::new();
    let input = workspace.write("empty.csv", "日付,商品,金額\n");
    let assert = analyzer_cmd()
        .args(["stats", "-i", input.to_str().unwrap(), "--json"])
        .assert()
        .success();
    let stats: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(stats["total_rows"], 0);
    assert_eq!(stats["total_sales"], 0.0);
    assert_eq!(stats["top_products"], serde_json::json!([]));
    Ok(())
}

#[test]
fn stats_rejects_unknown_encoding() {
    let input = fixture_path("daily_sales.csv");
    analyzer_cmd()
        .args(["stats", "-i", input.to_str().unwrap(), "--input-encoding", "klingon"])
        .assert()
        .failure()
        .stderr(contains("Unknown encoding"));
}

#[test]
fn stats_reports_missing_input_file() {
    let workspace = TestWorkspace::new();
    let missing = workspace.path().join("absent.csv");
    assert!(fs::metadata(&missing).is_err());
    analyzer_cmd()
        .args(["stats", "-i", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("error:"));
}
