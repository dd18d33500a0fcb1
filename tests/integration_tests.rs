//! End-to-end curation scenarios across crates:
//! - release file on disk -> graph -> sheet overlay -> DOT closure
//! - editor save -> identifier back-fill -> persisted index -> restart
//! - concurrent editor saves -> reconciliation
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::tempdir;

use ontocurate_graph::StatusFilter;
use ontocurate_service::{Config, CurationService, SaveDecision, SaveRequest, ServerSheet};
use ontocurate_storage::SearchQuery;
use ontocurate_table::Table;

const RELEASE_TTL: &str = r#"
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix obo: <http://purl.obolibrary.org/obo/> .

obo:ADDICTO_0000001 a owl:Class ; rdfs:label "behaviour" .
obo:ADDICTO_0000002 a owl:Class ;
    rdfs:label "smoking" ;
    obo:IAO_0000115 "Inhaling, tobacco smoke." ;
    rdfs:subClassOf obo:ADDICTO_0000001 .
obo:ADDICTO_0000003 a owl:Class ;
    rdfs:label "cigar smoking" ;
    rdfs:subClassOf obo:ADDICTO_0000002 .
"#;

fn config_for(dir: &Path) -> Config {
    let releases = dir.join("releases");
    fs::create_dir_all(&releases).unwrap();
    fs::write(releases.join("addicto.ttl"), RELEASE_TTL).unwrap();
    let toml = format!(
        r#"
release_dir = "{}"
index_path = "{}"

[[repos]]
key = "addicto"
github = "addicto-org/addiction-ontology"
release_file = "addicto.ttl"
"#,
        releases.display(),
        dir.join("index.json").display()
    );
    Config::from_toml_str(&toml).unwrap()
}

fn header() -> Vec<String> {
    ["id", "ID", "Label", "Definition", "Parent", "Curation status"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn existing_sheet() -> Table {
    Table::from_records(
        &header(),
        &[
            json!({"id": 1, "ID": "ADDICTO:0000001", "Label": "behaviour", "Definition": "Acting.", "Parent": "entity", "Curation status": "Published"}),
            json!({"id": 2, "ID": "ADDICTO:0000002", "Label": "smoking", "Definition": "Inhaling tobacco smoke.", "Parent": "behaviour", "Curation status": "Published"}),
            json!({"id": 3, "ID": "ADDICTO:0000003", "Label": "cigar smoking", "Definition": "Smoking cigars.", "Parent": "smoking", "Curation status": "Published"}),
        ],
    )
    .unwrap()
}

fn save(repo: &str, base: &Table, local: Table, token: &str) -> SaveRequest {
    SaveRequest {
        repo: repo.to_string(),
        folder: "ontology".into(),
        sheet_name: "Behaviours.xlsx".into(),
        base: base.clone(),
        local,
        initial_token: token.to_string(),
        overwrite: false,
    }
}

#[test]
fn release_and_sheet_render_a_closure() {
    let dir = tempdir().unwrap();
    let service = CurationService::from_config(config_for(dir.path())).unwrap();

    let report = service.ingest_release("addicto").unwrap();
    assert_eq!(report.nodes_added, 3);

    let mut sheet = existing_sheet();
    sheet
        .push_row(vec![
            "4".into(),
            "ADDICTO:0000004".into(),
            "vaping".into(),
            "Inhaling vapour.".into(),
            "smoking".into(),
            "Proposed".into(),
        ])
        .unwrap();

    let view = service
        .closure_for_table("addicto", &sheet, &StatusFilter::single("Proposed"))
        .unwrap();
    assert_eq!(view.ids, vec!["ADDICTO_0000004", "ADDICTO_0000002"]);
    assert!(view
        .dot
        .contains("\"ADDICTO_0000002\" -> \"ADDICTO_0000004\" [dir=back];"));

    // The overlay persists in the repository graph.
    let all = service
        .closure("addicto", &["ADDICTO:0000002".to_string()])
        .unwrap();
    assert!(all.ids.contains(&"ADDICTO_0000004".to_string()));
    assert!(all.ids.contains(&"ADDICTO_0000003".to_string()));

    let metadata = service
        .metadata("addicto", &["ADDICTO:0000002".to_string()])
        .unwrap();
    assert_eq!(metadata[0].definition, "Inhaling tobacco smoke.");
}

#[test]
fn saved_identifiers_survive_restart() {
    let dir = tempdir().unwrap();
    let base = existing_sheet();

    // First session indexes the existing sheet.
    let service = CurationService::from_config(config_for(dir.path())).unwrap();
    let server = ServerSheet {
        table: base.clone(),
        token: "rev-1".into(),
    };
    let first = service
        .prepare_save(&save("addicto", &base, base.clone(), "rev-1"), &server)
        .unwrap();
    assert!(first.is_accepted());
    assert!(first.ids_assigned.is_empty());
    service.shutdown();
    assert!(dir.path().join("index.json").exists());

    // Second session continues numbering from the persisted index.
    let service = CurationService::from_config(config_for(dir.path())).unwrap();
    let mut local = base.clone();
    local
        .push_row(vec![
            "4".into(),
            "".into(),
            "vaping".into(),
            "Inhaling vapour.".into(),
            "smoking".into(),
            "Proposed".into(),
        ])
        .unwrap();
    let second = service
        .prepare_save(&save("addicto", &base, local, "rev-1"), &server)
        .unwrap();
    assert_eq!(second.ids_assigned, vec!["ADDICTO:0000004".to_string()]);
    let SaveDecision::Accept { table } = &second.decision else {
        panic!("expected accept");
    };
    assert_eq!(table.column("id"), None, "row sequence column is stripped");
    service.shutdown();

    let service = CurationService::from_config(config_for(dir.path())).unwrap();
    let hits = service
        .search(&SearchQuery::new("addicto").with_text("vapour"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].class_id.as_deref(), Some("ADDICTO:0000004"));
    assert_eq!(service.next_identifier("addicto").unwrap(), "ADDICTO:0000005");
    service.shutdown();
}

#[test]
fn concurrent_edits_are_reconciled() {
    let dir = tempdir().unwrap();
    let service = CurationService::from_config(config_for(dir.path())).unwrap();
    let header = header();

    let base = [
        json!({"id": 1, "ID": "ADDICTO:0000001", "Label": "behaviour", "Definition": "Acting.", "Parent": "entity", "Curation status": ""}),
        json!({"id": 2, "ID": "ADDICTO:0000002", "Label": "smoking", "Definition": "Inhaling smoke.", "Parent": "behaviour", "Curation status": ""}),
    ];
    // Server edited the definition of "behaviour".
    let server = [
        json!({"id": 1, "ID": "ADDICTO:0000001", "Label": "behaviour", "Definition": "Doing things.", "Parent": "entity", "Curation status": ""}),
        base[1].clone(),
    ];
    // Local edited the status of "smoking" and added a row.
    let local = [
        base[0].clone(),
        json!({"id": 2, "ID": "ADDICTO:0000002", "Label": "smoking", "Definition": "Inhaling smoke.", "Parent": "behaviour", "Curation status": "Proposed"}),
        json!({"id": 3, "ID": "ADDICTO:0000004", "Label": "vaping", "Definition": "Inhaling vapour.", "Parent": "smoking", "Curation status": "Proposed"}),
    ];

    let outcome = service
        .reconcile_records(&header, &base, &server, &local)
        .unwrap();
    assert!(!outcome.has_conflicts());
    assert!(outcome.has_difference());

    let merged = outcome.merged_records();
    assert_eq!(merged.len(), 3);
    assert_eq!(merged[0]["Definition"], "Doing things.");
    assert_eq!(merged[1]["Curation status"], "Proposed");
    assert_eq!(merged[2]["Label"], "vaping");
    assert_eq!(merged[2]["id"], 3);
    service.shutdown();
}
