//! End-to-end coverage across `composite-core` + `composite-runtime` +
//! `composite-parser`: parse/serialize/patch/compare scenarios and the
//! round-trip and idempotent-patch laws that should hold for any of them.

use composite_core::value::CompositeValue;
use composite_core::{CompositeError, EngineConfig, TypeRef, TypeRegistry};
use composite_parser::{convert_path_to_literal, parse};
use composite_runtime::{compare, duplicate, serialize};

fn node_cluster_registry() -> TypeRegistry {
    let mut reg = TypeRegistry::new();
    reg.register("node", "string name; string ip; int port").unwrap();
    reg.register("cluster", "string name; int size; node[10] nodes")
        .unwrap();
    reg
}

#[test]
fn parse_then_pretty_serialize_starts_as_expected() {
    let reg = node_cluster_registry();
    let ty = TypeRef::Record("cluster".to_string());
    let v = parse(
        "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
        &ty,
        None,
        &reg,
    )
    .unwrap();
    let text = serialize(&v, &ty, false, &EngineConfig::new(), &reg).unwrap();
    assert!(text.starts_with("{name: c1, size: 1, nodes: [{name: n0, "));
}

#[test]
fn patch_retains_untouched_fields_as_null() {
    let reg = node_cluster_registry();
    let ty = TypeRef::Record("cluster".to_string());
    let v1 = parse(
        "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
        &ty,
        None,
        &reg,
    )
    .unwrap();
    let v2 = parse("{nodes: [1: {port: 6000}]}", &ty, Some(&v1), &reg).unwrap();

    if let CompositeValue::Record(fields) = &v2 {
        if let CompositeValue::FixedArray(nodes) = &fields[2] {
            if let CompositeValue::Record(node1) = &nodes[1] {
                assert_eq!(node1[2], CompositeValue::Int(6000));
                assert_eq!(node1[0], CompositeValue::null_string());
                assert_eq!(node1[1], CompositeValue::null_string());
                return;
            }
        }
    }
    panic!("unexpected value shape");
}

#[test]
fn patch_list_path_form_matches_explicit_literal() {
    let reg = node_cluster_registry();
    let ty = TypeRef::Record("cluster".to_string());
    let v1 = parse(
        "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
        &ty,
        None,
        &reg,
    )
    .unwrap();

    let via_patch_list = parse("cluster.nodes[0].port=6543;", &ty, Some(&v1), &reg).unwrap();
    let literal = convert_path_to_literal("cluster.nodes[0].port", "6543");
    let via_literal = parse(&literal, &ty, Some(&v1), &reg).unwrap();
    assert_eq!(
        compare(&via_patch_list, &via_literal, &ty, &reg).unwrap(),
        std::cmp::Ordering::Equal
    );
}

#[test]
fn duplicate_compares_equal() {
    let reg = node_cluster_registry();
    let ty = TypeRef::Record("cluster".to_string());
    let v1 = parse(
        "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
        &ty,
        None,
        &reg,
    )
    .unwrap();
    let dup = duplicate(&v1, &ty, &reg).unwrap();
    assert_eq!(compare(&v1, &dup, &ty, &reg).unwrap(), std::cmp::Ordering::Equal);
}

#[test]
fn out_of_bounds_index_fails_and_previous_is_unaffected() {
    let reg = node_cluster_registry();
    let ty = TypeRef::Record("cluster".to_string());
    let v1 = parse(
        "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
        &ty,
        None,
        &reg,
    )
    .unwrap();

    let err = parse("{nodes: [10: {port: 1}]}", &ty, Some(&v1), &reg).unwrap_err();
    assert!(matches!(err, CompositeError::IndexOutOfBounds { .. }));

    // v1 was only borrowed; it is untouched regardless of the failed parse.
    let text = serialize(&v1, &ty, false, &EngineConfig::new(), &reg).unwrap();
    assert!(text.starts_with("{name: c1, size: 1,"));
}

#[test]
fn extended_form_appears_past_the_expand_threshold() {
    let reg = TypeRegistry::new();
    let ty = TypeRef::VarArray(Box::new(TypeRef::Atomic(composite_core::AtomicKind::Int)));
    let config = EngineConfig::new().with_expand_threshold(3);

    let below = parse("[1, 2]", &ty, None, &reg).unwrap();
    assert!(!serialize(&below, &ty, false, &config, &reg).unwrap().starts_with('{'));

    let at_threshold = parse("[1, 2, 3]", &ty, None, &reg).unwrap();
    assert!(serialize(&at_threshold, &ty, false, &config, &reg).unwrap().starts_with('{'));
}

#[test]
fn round_trip_law_holds_through_wire_serialization() {
    let reg = node_cluster_registry();
    let ty = TypeRef::Record("cluster".to_string());
    let v = parse(
        "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
        &ty,
        None,
        &reg,
    )
    .unwrap();

    let wire = serialize(&v, &ty, true, &EngineConfig::new(), &reg).unwrap();
    let round_tripped = parse(&wire, &ty, None, &reg).unwrap();
    assert_eq!(compare(&v, &round_tripped, &ty, &reg).unwrap(), std::cmp::Ordering::Equal);
}

#[test]
fn idempotent_patch_law_holds_through_pretty_serialization() {
    let reg = node_cluster_registry();
    let ty = TypeRef::Record("cluster".to_string());
    let v = parse(
        "{name: 'c1', size: 1, nodes: [{name: 'n0', ip: '10.0.0.1', port: 5432}]}",
        &ty,
        None,
        &reg,
    )
    .unwrap();

    let pretty = serialize(&v, &ty, false, &EngineConfig::new(), &reg).unwrap();
    let patched = parse(&pretty, &ty, Some(&v), &reg).unwrap();
    assert_eq!(compare(&v, &patched, &ty, &reg).unwrap(), std::cmp::Ordering::Equal);
}

#[test]
fn doubled_quote_escape_round_trips_a_five_character_string() {
    let reg = TypeRegistry::new();
    let ty = TypeRef::Atomic(composite_core::AtomicKind::String);
    let v = parse("'can''t'", &ty, None, &reg).unwrap();
    if let CompositeValue::Str(s) = &v {
        assert_eq!(s.as_deref(), Some("can't"));
    } else {
        panic!("expected string");
    }
}
