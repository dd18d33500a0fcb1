use ontocurate_table::{reconcile, RowConflictKind, Table};
use serde_json::{json, Value};

fn header() -> Vec<String> {
    ["ID", "Label", "Definition", "Parent"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn records(table: &[Value]) -> Table {
    Table::from_records(&header(), table).unwrap()
}

#[test]
fn identical_server_and_local_report_no_difference() {
    let base = records(&[json!({"ID": "X:1", "Label": "Foo", "Definition": "A", "Parent": ""})]);
    let server = records(&[
        json!({"ID": "X:1", "Label": "Foo", "Definition": "A2", "Parent": ""}),
        json!({"ID": "X:2", "Label": "Bar", "Definition": "B", "Parent": "Foo"}),
    ]);
    // The editor adds its row-sequence column; it must not take part in diffing.
    let local = Table::from_records(
        &[],
        &[
            json!({"id": 7, "ID": "X:1", "Label": "Foo", "Definition": "A2", "Parent": null}),
            json!({"id": 3, "ID": "X:2", "Label": "Bar", "Definition": "B", "Parent": "Foo"}),
        ],
    )
    .unwrap();

    let outcome = reconcile(&base, &server, &local);
    assert!(!outcome.has_difference());
    assert!(!outcome.has_conflicts());
    assert_eq!(outcome.merged, server);
}

#[test]
fn concurrent_definition_edits_are_flagged() {
    let base = records(&[json!({"ID": "X:1", "Label": "Foo", "Definition": "A"})]);
    let server = records(&[json!({"ID": "X:1", "Label": "Foo", "Definition": "B"})]);
    let local = records(&[json!({"ID": "X:1", "Label": "Foo", "Definition": "C"})]);

    let outcome = reconcile(&base, &server, &local);
    assert!(outcome.has_conflicts());
    assert_eq!(outcome.cell_conflicts.len(), 1);
    let conflict = &outcome.cell_conflicts[0];
    assert_eq!(conflict.column, "Definition");
    assert_eq!(conflict.base, "A");
    assert_eq!(conflict.server, "B");
    assert_eq!(conflict.local, "C");

    // Neither side silently wins.
    let merged_definition = outcome.merged.cell(0, "Definition").unwrap();
    assert_ne!(merged_definition, "B");
    assert_ne!(merged_definition, "C");
    assert!(outcome.diff_html.contains("!!!"));
}

#[test]
fn non_conflicting_changes_are_both_applied() {
    let base = records(&[json!({"ID": "X:1", "Label": "Foo", "Definition": "A"})]);
    let server = records(&[
        json!({"ID": "X:1", "Label": "Foo", "Definition": "A"}),
        json!({"ID": "X:2", "Label": "Unrelated", "Definition": "U"}),
    ]);
    let local = records(&[json!({"ID": "X:1", "Label": "Foo", "Definition": "edited"})]);

    let outcome = reconcile(&base, &server, &local);
    assert!(!outcome.has_conflicts());

    let merged = outcome.merged_records();
    assert_eq!(merged.len(), 2);
    assert!(merged
        .iter()
        .any(|r| r["Label"] == json!("Foo") && r["Definition"] == json!("edited")));
    assert!(merged.iter().any(|r| r["Label"] == json!("Unrelated")));
    assert_eq!(merged[0]["id"], json!(1));
    assert_eq!(merged[1]["id"], json!(2));
}

#[test]
fn tables_without_id_align_on_label() {
    let header: Vec<String> = vec!["Label".into(), "Definition".into()];
    let base = Table::from_records(&header, &[json!({"Label": "Foo", "Definition": "A"})]).unwrap();
    let server = Table::from_records(
        &header,
        &[
            json!({"Label": "Bar", "Definition": "B"}),
            json!({"Label": "Foo", "Definition": "A"}),
        ],
    )
    .unwrap();
    let local = Table::from_records(&header, &[json!({"Label": "Foo", "Definition": "A local"})]).unwrap();

    let outcome = reconcile(&base, &server, &local);
    assert!(!outcome.has_conflicts());
    assert_eq!(outcome.merged.cell(0, "Label"), Some("Bar"));
    assert_eq!(outcome.merged.cell(1, "Definition"), Some("A local"));
}

#[test]
fn deleting_a_row_the_server_edited_keeps_it() {
    let base = records(&[
        json!({"ID": "X:1", "Label": "Foo", "Definition": "A"}),
        json!({"ID": "X:2", "Label": "Bar", "Definition": "B"}),
    ]);
    let server = records(&[
        json!({"ID": "X:1", "Label": "Foo", "Definition": "A"}),
        json!({"ID": "X:2", "Label": "Bar", "Definition": "B revised"}),
    ]);
    let local = records(&[json!({"ID": "X:1", "Label": "Foo", "Definition": "A"})]);

    let outcome = reconcile(&base, &server, &local);
    assert_eq!(outcome.merged.len(), 2);
    assert_eq!(outcome.row_conflicts.len(), 1);
    assert_eq!(
        outcome.row_conflicts[0].kind,
        RowConflictKind::DeletedLocallyModifiedOnServer
    );
    assert_eq!(outcome.row_conflicts[0].key.as_deref(), Some("X:2"));
}

#[test]
fn missing_columns_in_local_read_as_blank() {
    let base = records(&[json!({"ID": "X:1", "Label": "Foo", "Definition": "A", "Parent": ""})]);
    let server = base.clone();
    let narrow: Vec<String> = vec!["ID".into(), "Label".into(), "Definition".into()];
    let local = Table::from_records(&narrow, &[json!({"ID": "X:1", "Label": "Foo", "Definition": "A"})]).unwrap();

    let outcome = reconcile(&base, &server, &local);
    assert!(!outcome.has_difference());
    assert_eq!(outcome.merged.header(), server.header());
}
