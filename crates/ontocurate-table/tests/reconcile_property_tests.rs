use std::collections::BTreeSet;

use ontocurate_table::{reconcile, validate, Table};
use proptest::prelude::*;

fn header() -> Vec<String> {
    vec!["ID".into(), "Label".into(), "Definition".into()]
}

fn table_strategy() -> impl Strategy<Value = Table> {
    prop::collection::btree_set("[A-C]{1,2}:[0-9]{1,3}", 0..10).prop_flat_map(|ids: BTreeSet<String>| {
        let n = ids.len();
        (
            Just(ids.into_iter().collect::<Vec<_>>()),
            prop::collection::vec("[a-d ]{0,4}", n),
            prop::collection::vec("[a-d ]{0,4}", n),
        )
            .prop_map(|(ids, labels, defs)| {
                let rows = ids
                    .into_iter()
                    .zip(labels)
                    .zip(defs)
                    .map(|((id, label), def)| vec![id, label, def])
                    .collect();
                Table::from_rows(header(), rows).unwrap()
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn reconcile_of_identical_tables_is_identity(base in table_strategy(), table in table_strategy()) {
        let outcome = reconcile(&base, &table, &table);
        prop_assert!(!outcome.has_difference());
        prop_assert!(!outcome.has_conflicts());
        prop_assert_eq!(&outcome.merged, &table);
    }

    #[test]
    fn merged_rows_are_numbered_from_one(base in table_strategy(), server in table_strategy(), local in table_strategy()) {
        let outcome = reconcile(&base, &server, &local);
        let records = outcome.merged_records();
        prop_assert_eq!(records.len(), outcome.merged.len());
        for (i, record) in records.iter().enumerate() {
            prop_assert_eq!(record["id"].as_u64(), Some(i as u64 + 1));
        }
    }

    #[test]
    fn unique_ids_never_fail_the_uniqueness_check_on_id(table in table_strategy()) {
        let report = validate(&table);
        for row in &report.rows {
            prop_assert!(row.not_unique.iter().all(|c| c.column != "ID"));
        }
    }
}
