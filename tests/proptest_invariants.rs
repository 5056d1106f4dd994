//! Property-based tests for the compatibility checker and aggregation order.

use proptest::prelude::*;

use stategraph::{
    compatible, compatible_with, to_fixed_shape_numeric, CompatOptions, Context, ParamMap,
    ProjectionSpec, Session, StateKind, StateParams, Value,
};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::hash_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Map(m.into_iter().collect())),
        ]
    })
}

fn numeric_list() -> impl Strategy<Value = Value> {
    prop::collection::vec(-1000i64..1000, 1..8)
        .prop_map(|items| Value::List(items.into_iter().map(Value::Int).collect()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn compatible_is_reflexive(x in value()) {
        prop_assert!(compatible(&x, &x));
    }

    #[test]
    fn numeric_lists_match_on_length(a in numeric_list(), b in numeric_list()) {
        let same_length = a.len() == b.len();
        prop_assert_eq!(compatible(&a, &b), same_length);
    }

    #[test]
    fn zero_length_disables_length_check(a in numeric_list(), b in numeric_list()) {
        prop_assert!(compatible_with(&a, Some(&b), &CompatOptions::any_length()));
    }

    #[test]
    fn numeric_scalars_are_interchangeable(i in any::<i64>(), f in -1.0e6f64..1.0e6) {
        prop_assert!(compatible(&Value::Int(i), &Value::Float(f)));
        prop_assert!(compatible(&Value::Float(f), &Value::Int(i)));
    }

    #[test]
    fn strings_never_match_numbers(s in "[a-z]{0,8}", i in any::<i64>()) {
        prop_assert!(!compatible(&Value::String(s), &Value::Int(i)));
    }

    #[test]
    fn coerced_vector_stays_compatible(a in numeric_list()) {
        let coerced = to_fixed_shape_numeric(&a, 1).unwrap().to_value();
        prop_assert!(compatible(&coerced, &a));
        prop_assert_eq!(coerced.len(), a.len());
    }
}

// ============================================================================
// Aggregation order
// ============================================================================

fn allocations_and_order() -> impl Strategy<Value = (Vec<i32>, Vec<usize>)> {
    prop::collection::vec(0i32..100, 1..6).prop_flat_map(|allocations| {
        let order: Vec<usize> = (0..allocations.len()).collect();
        (Just(allocations), Just(order).prop_shuffle())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sum_does_not_depend_on_projection_order((allocations, order) in allocations_and_order()) {
        let ctx = Context::construction("init");
        let mut session = Session::new();
        let owner = session.add_mechanism("m");
        let params = allocations.iter().fold(StateParams::default(), |p, a| {
            let mut signal = ParamMap::new();
            signal.insert("allocation".into(), Value::Int(i64::from(*a)));
            p.with_projection(ProjectionSpec::typed("ControlSignal", signal))
        });
        let id = session
            .create_state(owner, StateKind::Parameter, Value::Float(0.0), params, Some("gain"), &ctx)
            .unwrap();

        let run = Context::execution("trial");
        let first = session.update_state(id, None, &run).unwrap();

        let inbound = session.state(id).unwrap().receives_from.clone();
        session.state_mut(id).unwrap().receives_from = order.iter().map(|i| inbound[*i]).collect();
        let second = session.update_state(id, None, &run).unwrap();

        let expected = f64::from(allocations.iter().sum::<i32>());
        prop_assert_eq!(first.value(), Some(&Value::Float(expected)));
        prop_assert_eq!(first, second);
    }
}
