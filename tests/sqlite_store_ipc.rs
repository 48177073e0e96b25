mod common;

use common::{fixture_path, Sidecar};
use serde_json::json;

#[test]
fn sqlite_store_keeps_saved_edits_across_processes() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let ws = workspace.path().to_str().expect("utf8 path").to_string();
    let seed = fixture_path("seed/data.csv");
    let seed = seed.to_str().expect("utf8 path").to_string();

    {
        let mut sidecar =
            Sidecar::spawn(&["--store", "sqlite", "--workspace", &ws, "--seed", &seed]);
        let opened = sidecar.call("session.open", json!({}));
        assert_eq!(opened["store"], "sqlite");
        assert_eq!(opened["notices"][0]["level"], "info");
        sidecar.call(
            "grid.update",
            json!({ "edits": [{ "row": 2, "column": "Présence_S2", "value": true }] }),
        );
        sidecar.call("grid.save", json!({}));
    }
    assert!(workspace.path().join("gradebook.sqlite3").is_file());

    // The seed is not consulted once the store holds data.
    let missing_seed = workspace.path().join("gone.csv");
    let mut sidecar = Sidecar::spawn(&[
        "--store",
        "sqlite",
        "--workspace",
        &ws,
        "--seed",
        missing_seed.to_str().expect("utf8 path"),
    ]);
    let opened = sidecar.call("session.open", json!({}));
    assert_eq!(opened["rowCount"], 4);
    assert_eq!(opened["notices"][0]["level"], "success");
    let grid = sidecar.call("grid.get", json!({}));
    assert_eq!(grid["rows"][2][3], true);

    let absences = sidecar.call("reports.absences", json!({}));
    // Chloé's saved edit brings her level with Bob and David.
    assert_eq!(common::names_in(&absences["report"]), vec!["Bob", "Chloé", "David", "Alice"]);
    assert_eq!(absences["report"]["data"][1][2], 1.0);
}

#[test]
fn separate_slots_do_not_share_data() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let ws = workspace.path().to_str().expect("utf8 path").to_string();
    let seed = fixture_path("seed/data.csv");
    let seed = seed.to_str().expect("utf8 path").to_string();

    let mut first = Sidecar::spawn(&[
        "--store", "sqlite", "--workspace", &ws, "--slot", "class-a", "--seed", &seed,
    ]);
    first.call("session.open", json!({}));
    drop(first);

    let empty_seed = workspace.path().join("none.csv");
    let mut second = Sidecar::spawn(&[
        "--store",
        "sqlite",
        "--workspace",
        &ws,
        "--slot",
        "class-b",
        "--seed",
        empty_seed.to_str().expect("utf8 path"),
    ]);
    let opened = second.call("session.open", json!({}));
    assert_eq!(opened["rowCount"], 0);
    assert_eq!(opened["notices"][0]["level"], "error");
}
