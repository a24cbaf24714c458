#![cfg(test)]

// Property tests for HandleHashMap kept inside the crate so they can reach
// the internal table directly.

use crate::handle_hash_map::{HandleHashMap, Slot, Upsert};
use crate::referent::Referent;
use proptest::prelude::*;
use std::collections::hash_map::RandomState;
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations: indices shrink to earlier keys, op lists shrink
// in length.
#[derive(Clone, Debug)]
enum OpI {
    Upsert(usize, i32),
    Remove(usize),
    Find(usize),
    Mutate(usize, i32),
    Reclaim(usize),
    Renew(usize),
    Sweep,
    Iterate,
}

fn arb_ops(pool: usize) -> impl Strategy<Value = Vec<OpI>> {
    let op = prop_oneof![
        (0..pool, any::<i32>()).prop_map(|(i, v)| OpI::Upsert(i, v)),
        (0..pool).prop_map(OpI::Remove),
        (0..pool).prop_map(OpI::Find),
        (0..pool, any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
        (0..pool).prop_map(OpI::Reclaim),
        (0..pool).prop_map(OpI::Renew),
        Just(OpI::Sweep),
        Just(OpI::Iterate),
    ];
    proptest::collection::vec(op, 1..80)
}

// Model: per pool index, the current key object (if any owner is held) and
// the slot/value the table should hold for it. Slots of reclaimed keys are
// parked in `dead` until a sweep removes them.
struct Model {
    keys: Vec<Option<Referent<usize>>>,
    live: HashMap<usize, (Slot, i32)>,
    dead: Vec<Slot>,
    stale: Vec<Slot>,
}

fn run<S: BuildHasher>(mut sut: HandleHashMap<usize, i32, S>, pool: usize, ops: Vec<OpI>) -> Result<(), TestCaseError> {
    let mut model = Model {
        keys: (0..pool).map(|i| Some(Referent::new(i))).collect(),
        live: HashMap::new(),
        dead: Vec::new(),
        stale: Vec::new(),
    };

    for op in ops {
        match op {
            OpI::Upsert(i, v) => {
                if let Some(k) = model.keys[i].clone() {
                    match sut.upsert(sut.make_handle(&k), v) {
                        Upsert::Inserted(slot) => {
                            prop_assert!(!model.live.contains_key(&i), "insert only when absent");
                            model.live.insert(i, (slot, v));
                        }
                        Upsert::Replaced(prev) => {
                            let entry = model.live.get_mut(&i).expect("replace only when present");
                            prop_assert_eq!(prev, entry.1);
                            entry.1 = v;
                        }
                    }
                }
            }
            OpI::Remove(i) => {
                if let Some((slot, v)) = model.live.remove(&i) {
                    let (_h, vv) = sut.remove(slot).expect("slot valid for removal");
                    prop_assert_eq!(vv, v);
                    model.stale.push(slot);
                }
            }
            OpI::Find(i) => {
                if let Some(k) = &model.keys[i] {
                    let found = sut.find(&sut.make_handle(k));
                    prop_assert_eq!(found, model.live.get(&i).map(|&(s, _)| s));
                }
            }
            OpI::Mutate(i, d) => {
                if let Some(entry) = model.live.get_mut(&i) {
                    let vr = sut.value_mut(entry.0).expect("live slot resolves");
                    *vr = vr.wrapping_add(d);
                    entry.1 = entry.1.wrapping_add(d);
                }
            }
            OpI::Reclaim(i) => {
                // Drop the only owner: the entry turns dead but stays stored.
                if model.keys[i].take().is_some() {
                    if let Some((slot, _)) = model.live.remove(&i) {
                        model.dead.push(slot);
                    }
                }
            }
            OpI::Renew(i) => {
                // A fresh object, value-equal to the old one, never matches it.
                if model.keys[i].is_none() {
                    let k = Referent::new(i);
                    prop_assert!(sut.find(&sut.make_handle(&k)).is_none());
                    model.keys[i] = Some(k);
                }
            }
            OpI::Sweep => {
                for slot in model.dead.drain(..) {
                    prop_assert!(sut.remove_reclaimed(slot).is_some());
                    model.stale.push(slot);
                }
                for &(slot, _) in model.live.values() {
                    prop_assert!(sut.remove_reclaimed(slot).is_none());
                }
            }
            OpI::Iterate => {
                let s_live: BTreeSet<usize> = sut
                    .iter()
                    .filter_map(|(_, h, _)| h.get().map(|k| *k))
                    .collect();
                let m_live: BTreeSet<usize> = model.live.keys().copied().collect();
                prop_assert_eq!(s_live, m_live);
            }
        }

        // Post-conditions after each op
        for &slot in &model.stale {
            prop_assert!(sut.value(slot).is_none());
        }
        for &(slot, v) in model.live.values() {
            prop_assert_eq!(sut.value(slot), Some(&v));
        }
        prop_assert_eq!(sut.len(), model.live.len() + model.dead.len());
    }
    Ok(())
}

// Property: state-machine equivalence, including keys reclaimed while
// stored and later swept.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(pool in 1usize..=8, ops in arb_ops(8)) {
        let ops = ops.into_iter().map(|op| clamp(op, pool)).collect();
        run(HandleHashMap::with_capacity_and_hasher(0, RandomState::new()), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress identity probing.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions(pool in 1usize..=8, ops in arb_ops(8)) {
        let ops = ops.into_iter().map(|op| clamp(op, pool)).collect();
        run(HandleHashMap::with_capacity_and_hasher(0, ConstBuildHasher), pool, ops)?;
    }
}

fn clamp(op: OpI, pool: usize) -> OpI {
    match op {
        OpI::Upsert(i, v) => OpI::Upsert(i % pool, v),
        OpI::Remove(i) => OpI::Remove(i % pool),
        OpI::Find(i) => OpI::Find(i % pool),
        OpI::Mutate(i, d) => OpI::Mutate(i % pool, d),
        OpI::Reclaim(i) => OpI::Reclaim(i % pool),
        OpI::Renew(i) => OpI::Renew(i % pool),
        other => other,
    }
}
