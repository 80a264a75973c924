#![cfg(test)]

// Property tests for ChainMap kept inside the crate so the structural
// invariant sweep can reach internal state after every operation.

use crate::chain_map::ChainMap;
use crate::error::TableError;
use hashbrown::HashMap;
use proptest::prelude::*;

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length. The model is a
// newest-wins multimap: inserts push, lookups read the back, removals pop.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Get(usize),
    Remove(usize),
    Contains(usize),
    Mutate(usize, i32),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            idx.clone().prop_map(OpI::Get),
            idx.clone().prop_map(OpI::Remove),
            idx.clone().prop_map(OpI::Contains),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against a newest-wins multimap model.
// Invariants exercised across random operation sequences:
// - Duplicate inserts chain; `get`/`get_mut`/`remove` reach the newest entry.
// - `remove` pops exactly the value the model predicts and errors on absence.
// - `iter` yields every entry (shadowed duplicates included) exactly once.
// - After every op: structural sweep (reachability, digests, occupancy) and
//   `len`/`is_empty` parity; occupied buckets never exceed distinct keys.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: ChainMap<i32> = ChainMap::new();
        let mut model: HashMap<String, Vec<i32>> = HashMap::new();

        for op in ops {
            match op {
                OpI::Insert(i, v) => {
                    let k = &pool[i];
                    sut.insert(k, v);
                    model.entry(k.clone()).or_default().push(v);
                }
                OpI::Get(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.get(k), model.get(k).and_then(|vs| vs.last()));
                }
                OpI::Remove(i) => {
                    let k = &pool[i];
                    let expected = model.get_mut(k).and_then(|vs| vs.pop());
                    if model.get(k).is_some_and(|vs| vs.is_empty()) {
                        model.remove(k);
                    }
                    match (sut.remove(k), expected) {
                        (Ok(got), Some(want)) => prop_assert_eq!(got, want),
                        (Err(TableError::KeyNotFound), None) => {}
                        (got, want) => {
                            prop_assert!(false, "remove mismatch: {:?} vs {:?}", got, want)
                        }
                    }
                }
                OpI::Contains(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.contains_key(k), model.contains_key(k));
                }
                OpI::Mutate(i, d) => {
                    let k = &pool[i];
                    let got = sut.get_mut(k).map(|v| {
                        *v = v.saturating_add(d);
                        *v
                    });
                    let want = model.get_mut(k).and_then(|vs| vs.last_mut()).map(|v| {
                        *v = v.saturating_add(d);
                        *v
                    });
                    prop_assert_eq!(got, want);
                }
                OpI::Iterate => {
                    let mut seen: HashMap<String, Vec<i32>> = HashMap::new();
                    for (k, v) in sut.iter() {
                        seen.entry(k.to_string()).or_default().push(*v);
                    }
                    for vs in seen.values_mut() {
                        vs.sort_unstable();
                    }
                    let want: HashMap<String, Vec<i32>> = model
                        .iter()
                        .map(|(k, vs)| {
                            let mut vs = vs.clone();
                            vs.sort_unstable();
                            (k.clone(), vs)
                        })
                        .collect();
                    prop_assert_eq!(seen, want);
                }
            }

            // Post-conditions after each op
            sut.check_invariants();
            let model_len: usize = model.values().map(Vec::len).sum();
            prop_assert_eq!(sut.len(), model_len);
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            prop_assert!(sut.occupied_buckets() <= model.len());
        }
    }
}

// Property: bulk distinct inserts drive the table through several growth
// steps; every key must still resolve and the structure must stay sound.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_growth_keeps_all_keys_resolvable(
        keys in proptest::collection::hash_set("[a-z0-9]{1,12}", 1..300)
    ) {
        let mut sut: ChainMap<usize> = ChainMap::new();
        for (i, k) in keys.iter().enumerate() {
            sut.insert(k, i);
        }
        sut.check_invariants();
        for (i, k) in keys.iter().enumerate() {
            prop_assert_eq!(sut.get(k), Some(&i));
        }
    }
}
