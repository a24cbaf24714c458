// WeakIdentityMap property tests.
//
// Property 1: model equivalence under random put/remove/reclaim sequences.
//  - Model: per pool index, the current key object (or none once dropped)
//    and the value mapped to it.
//  - Invariant after every step: len(), contains_key(), get(), keys() and
//    values() agree with the model; reclaimed objects never reappear.
//  - Operations: put, remove, get, drop key (reclaim), renew key (a fresh,
//    value-equal object), clear.
//
// Property 2: cascade liveness with values holding owners of other keys.
//  - Model: edges i -> j (j > i) stored in values; external owners per i.
//  - Invariant: live entries == closure reachable from externally owned
//    keys.
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use weak_identity_map::{Referent, WeakIdentityMap};

#[derive(Clone, Debug)]
enum Op {
    Put(usize, i32),
    Remove(usize),
    Get(usize),
    Reclaim(usize),
    Renew(usize),
    Clear,
}

fn arb_op(pool: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..pool, any::<i32>()).prop_map(|(i, v)| Op::Put(i, v)),
        2 => (0..pool).prop_map(Op::Remove),
        2 => (0..pool).prop_map(Op::Get),
        2 => (0..pool).prop_map(Op::Reclaim),
        2 => (0..pool).prop_map(Op::Renew),
        1 => Just(Op::Clear),
    ]
}

// Property 1: the map behaves like an ordinary map keyed by object identity
// from which dropped objects disappear.
proptest! {
    #[test]
    fn prop_model_equivalence(ops in proptest::collection::vec(arb_op(6), 1..120)) {
        let pool = 6;
        let mut m: WeakIdentityMap<usize, i32> = WeakIdentityMap::new();
        let mut owners: Vec<Option<Referent<usize>>> = (0..pool).map(|i| Some(Referent::new(i))).collect();
        let mut model: BTreeMap<usize, i32> = BTreeMap::new();
        let mut last_len = 0usize;

        for op in ops {
            let mut grew = false;
            match op {
                Op::Put(i, v) => {
                    if let Some(k) = &owners[i] {
                        let prev = m.put(k, v);
                        prop_assert_eq!(prev, model.insert(i, v));
                        grew = prev.is_none();
                    }
                }
                Op::Remove(i) => {
                    if let Some(k) = &owners[i] {
                        prop_assert_eq!(m.remove(k), model.remove(&i));
                    }
                }
                Op::Get(i) => {
                    if let Some(k) = &owners[i] {
                        prop_assert_eq!(m.get(k).copied(), model.get(&i).copied());
                    }
                }
                Op::Reclaim(i) => {
                    if owners[i].take().is_some() {
                        model.remove(&i);
                    }
                }
                Op::Renew(i) => {
                    if owners[i].is_none() {
                        let fresh = Referent::new(i);
                        prop_assert!(!m.contains_key(&fresh));
                        owners[i] = Some(fresh);
                    }
                }
                Op::Clear => {
                    m.clear();
                    model.clear();
                }
            }

            let len = m.len();
            prop_assert_eq!(len, model.len());
            if !grew {
                prop_assert!(len <= last_len, "size grew without an insert");
            }
            last_len = len;
            prop_assert_eq!(m.is_empty(), model.is_empty());
            for (i, owner) in owners.iter().enumerate() {
                if let Some(k) = owner {
                    prop_assert_eq!(m.contains_key(k), model.contains_key(&i));
                }
            }
            let keys: BTreeSet<usize> = m.keys().iter().map(|k| **k).collect();
            prop_assert_eq!(keys, model.keys().copied().collect::<BTreeSet<_>>());
            let mut values = m.values();
            values.sort_unstable();
            let mut expected: Vec<i32> = model.values().copied().collect();
            expected.sort_unstable();
            prop_assert_eq!(values, expected);
        }
    }
}

// ---- Property 2: cascade liveness ----
// Values only hold their children's owners.
#[allow(dead_code)]
struct VNode {
    children: Vec<Referent<usize>>,
}

proptest! {
    #[test]
    fn prop_cascade_liveness(
        n in 2usize..=6,
        edges in proptest::collection::vec((0usize..64, 0usize..64), 0..12),
        drops in proptest::collection::vec(0usize..64, 0..8),
    ) {
        let mut m: WeakIdentityMap<usize, VNode> = WeakIdentityMap::new();
        let mut owners: Vec<Option<Referent<usize>>> = (0..n).map(|i| Some(Referent::new(i))).collect();
        let mut adj: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];

        for (a, b) in edges {
            let i = a % (n - 1);
            let j = i + 1 + b % (n - i - 1);
            adj[i].insert(j);
        }
        for i in 0..n {
            let children = adj[i]
                .iter()
                .map(|&j| owners[j].clone().expect("all owners held while building"))
                .collect();
            let k = owners[i].clone().expect("all owners held while building");
            m.put(&k, VNode { children });
        }
        prop_assert_eq!(m.len(), n);

        for d in drops {
            owners[d % n] = None;

            let mut alive: Vec<bool> = owners.iter().map(Option::is_some).collect();
            // Edges point forward, so one pass in index order closes the set.
            for i in 0..n {
                if alive[i] {
                    for &j in &adj[i] {
                        alive[j] = true;
                    }
                }
            }
            let expected = alive.iter().filter(|&&x| x).count();
            prop_assert_eq!(m.len(), expected);
            let live_keys: BTreeSet<usize> = m.keys().iter().map(|k| **k).collect();
            let expected_keys: BTreeSet<usize> = (0..n).filter(|&i| alive[i]).collect();
            prop_assert_eq!(live_keys, expected_keys);
        }

        owners.clear();
        prop_assert!(m.is_empty());
        prop_assert_eq!(m.len(), 0);
    }
}
