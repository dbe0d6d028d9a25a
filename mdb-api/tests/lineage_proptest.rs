//! Property-based tests for file lineage and property bag merging

use mdb_api::db::files::{find_file_ancestors, insert_file, load_file, NewFile};
use mdb_common::db::init_in_memory;
use mdb_common::properties::{merge, Properties};
use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

/// Parent choice per new file: `None` for a root, else an index into the
/// files created so far (taken modulo their count)
fn arb_lineage() -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(prop::option::weighted(0.8, any::<usize>()), 1..40)
}

fn arb_bag(keys: &'static [&'static str]) -> impl Strategy<Value = Properties> {
    prop::collection::btree_map(prop::sample::select(keys), any::<i32>(), 0..keys.len())
        .prop_map(|m: BTreeMap<&str, i32>| {
            m.into_iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect()
        })
}

const LOW_KEYS: &[&str] = &["a", "b", "c", "d"];
const HIGH_KEYS: &[&str] = &["w", "x", "y", "z"];
const ALL_KEYS: &[&str] = &["a", "b", "c", "x", "y"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn lineage_never_cycles(choices in arb_lineage()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let pool = init_in_memory().await.unwrap();
            let mut conn = pool.acquire().await.unwrap();

            let mut ids: Vec<i64> = Vec::new();
            for (i, choice) in choices.iter().enumerate() {
                let parent_id = match choice {
                    Some(idx) if !ids.is_empty() => Some(ids[idx % ids.len()]),
                    _ => None,
                };
                let file = insert_file(
                    &mut conn,
                    &NewFile {
                        uid: format!("f{:07}", i),
                        name: format!("file_{}", i),
                        parent_id,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
                ids.push(file.id);
            }

            for id in &ids {
                // Following parent_id terminates within the number of files
                let mut steps = 0;
                let mut current = load_file(&mut conn, *id).await.unwrap();
                while let Some(parent_id) = current.parent_id {
                    steps += 1;
                    assert!(steps <= ids.len(), "cycle above file {}", id);
                    current = load_file(&mut conn, parent_id).await.unwrap();
                }

                let ancestors = find_file_ancestors(&mut conn, *id).await.unwrap();
                assert_eq!(ancestors.len(), steps);
                assert!(ancestors.iter().all(|a| a.id != *id));
            }
        });
    }

    #[test]
    fn merge_is_associative_for_disjoint_updates(
        base in arb_bag(ALL_KEYS),
        u1 in arb_bag(LOW_KEYS),
        u2 in arb_bag(HIGH_KEYS),
    ) {
        let left = merge(Some(&merge(Some(&base), &u1)), &u2);
        let right = merge(Some(&base), &merge(Some(&u1), &u2));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn merge_is_right_biased(base in arb_bag(ALL_KEYS), updates in arb_bag(ALL_KEYS)) {
        let merged = merge(Some(&base), &updates);

        for (k, v) in &updates {
            prop_assert_eq!(merged.get(k), Some(v));
        }
        for (k, v) in &base {
            if !updates.contains_key(k) {
                prop_assert_eq!(merged.get(k), Some(v));
            }
        }
        prop_assert_eq!(merge(None, &updates), updates);
    }
}
