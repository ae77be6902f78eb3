//! Property tests over generated tables and predicates.
mod common;

use common::{PERSON, ids, with_session};
use proptest::prelude::*;
use tabula_core::expr::{Expr, field, null};
use tabula_memory::{MemoryStore, StoredValue};

type RowSpec = (i64, Option<&'static str>, bool);

fn arb_rows() -> impl Strategy<Value = Vec<RowSpec>> {
    prop::collection::vec(
        (
            0_i64..4,
            prop_oneof![Just(None), Just(Some("a")), Just(Some("b"))],
            any::<bool>(),
        ),
        0..12,
    )
}

fn arb_comparison() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0_i64..4).prop_map(|age| field("Age").eq(age)),
        (0_i64..4).prop_map(|age| field("Age").gt(age)),
        (0_i64..4).prop_map(|age| field("Age").lte(age)),
        prop_oneof![Just("a"), Just("b")].prop_map(|name| field("Name").eq(name)),
        prop_oneof![Just("a"), Just("b")].prop_map(|name| field("Name").ne(name)),
        any::<bool>().prop_map(|active| field("Active").eq(active)),
        Just(field("Name").eq(null())),
    ]
}

fn load(rows: &[RowSpec]) -> MemoryStore {
    let mut store = common::empty_store();

    for (id, (age, name, active)) in (0_i64..).zip(rows) {
        store
            .insert(
                PERSON,
                [
                    ("Id", StoredValue::from(id)),
                    ("Name", StoredValue::from(*name)),
                    ("Age", StoredValue::from(*age)),
                    ("Active", StoredValue::from(*active)),
                ],
            )
            .expect("generated row should insert");
    }

    store
}

fn matching(store: &MemoryStore, filter: Expr) -> Vec<i64> {
    let rows = with_session(store, |s| {
        s.query(PERSON)?.filter(filter).results()?.to_vec()
    })
    .expect("generated query should run");

    ids(store, &rows)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn conjunction_commutes(rows in arb_rows(), a in arb_comparison(), b in arb_comparison()) {
        let store = load(&rows);

        let ab = matching(&store, a.clone().and(b.clone()));
        let ba = matching(&store, b.and(a));

        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn disjunction_covers_conjunction(rows in arb_rows(), a in arb_comparison(), b in arb_comparison()) {
        let store = load(&rows);

        let and = matching(&store, a.clone().and(b.clone()));
        let left = matching(&store, a.clone());
        let or = matching(&store, a.or(b));

        prop_assert!(and.iter().all(|id| or.contains(id)));
        prop_assert!(left.iter().all(|id| or.contains(id)));
    }

    #[test]
    fn negation_partitions_rows(rows in arb_rows(), a in arb_comparison()) {
        let store = load(&rows);

        let yes = matching(&store, a.clone());
        let no = matching(&store, !a);

        prop_assert_eq!(yes.len() + no.len(), rows.len());
        prop_assert!(yes.iter().all(|id| !no.contains(id)));
    }

    #[test]
    fn translation_is_idempotent(rows in arb_rows(), a in arb_comparison(), descending in any::<bool>()) {
        let store = load(&rows);

        let (first, second, count) = with_session(&store, |s| {
            let q = s.query(PERSON).unwrap().filter(a);
            let q = if descending { q.order_by_descending("Age") } else { q.order_by("Age") };
            let q = q.then_by("Id");

            prop_assert_eq!(q.explain().unwrap(), q.explain().unwrap());
            let first = q.results().unwrap().to_vec().unwrap();
            let second = q.results().unwrap().to_vec().unwrap();

            Ok((first, second, q.count().unwrap()))
        })?;

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), count);
        prop_assert_eq!(store.live_handles(), 0);
    }
}
