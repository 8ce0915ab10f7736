//! Container level invariants under arbitrary operation sequences.

use linesim_core::{Container, ContainerError};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Get(u64),
    Put(u64),
    Pick,
    Store,
    DispatchAll,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..20).prop_map(Op::Get),
        (0u64..20).prop_map(Op::Put),
        Just(Op::Pick),
        Just(Op::Store),
        Just(Op::DispatchAll),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn level_stays_within_bounds(
        capacity in 1u64..50,
        initial_fraction in 0.0f64..=1.0,
        ops in prop::collection::vec(op(), 0..100),
    ) {
        let initial = (capacity as f64 * initial_fraction) as u64;
        let mut container = Container::new("buffer", capacity, initial).unwrap();

        for op in ops {
            let before = container.clone();
            let result = match op {
                Op::Get(n) => container.get(n),
                Op::Put(n) => container.put(n),
                Op::Pick => container.pick(),
                Op::Store => container.store(),
                Op::DispatchAll => container.dispatch_all().map(|_| ()),
            };

            prop_assert!(container.level() <= container.capacity());

            match result {
                Ok(()) => {},
                Err(
                    ContainerError::Underflow { level, .. }
                    | ContainerError::Overflow { level, .. },
                ) => {
                    // failed operations leave the container untouched
                    prop_assert_eq!(level, before.level());
                    prop_assert_eq!(&container, &before);
                },
            }

            prop_assert!(container.picked() >= before.picked());
            prop_assert!(container.stored() >= before.stored());
            prop_assert!(container.delivered() >= before.delivered());
        }
    }

    #[test]
    fn counters_balance_the_level(
        initial in 0u64..100,
        ops in prop::collection::vec(op(), 0..100),
    ) {
        let mut container = Container::new("buffer", 100, initial).unwrap();
        let mut added = 0u64;
        let mut removed = 0u64;

        for op in ops {
            match op {
                Op::Get(n) => {
                    if container.get(n).is_ok() {
                        removed += n;
                    }
                },
                Op::Put(n) => {
                    if container.put(n).is_ok() {
                        added += n;
                    }
                },
                Op::Pick => {
                    let _ = container.pick();
                },
                Op::Store => {
                    let _ = container.store();
                },
                Op::DispatchAll => {
                    let _ = container.dispatch_all();
                },
            }
        }

        let inflow = initial + added + container.stored();
        let outflow = removed + container.picked() + container.delivered();
        prop_assert_eq!(container.level(), inflow - outflow);
    }
}
