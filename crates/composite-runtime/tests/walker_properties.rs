//! Integration coverage for walker-level laws that don't require the
//! parser: deep-copy independence and free safety.

use composite_core::memory::{live_buffers, live_strings};
use composite_core::value::{default_value, CompositeValue, OwnedString};
use composite_core::{TypeRef, TypeRegistry};
use composite_runtime::{compare, duplicate, free};
use serial_test::serial;

fn node_cluster_registry() -> TypeRegistry {
    let mut reg = TypeRegistry::new();
    reg.register("node", "string name; string ip; int port").unwrap();
    reg.register("cluster", "string name; int size; node[3] nodes")
        .unwrap();
    reg
}

#[test]
fn deep_copy_is_independent_of_source() {
    let reg = node_cluster_registry();
    let ty = TypeRef::Record("cluster".to_string());
    let mut v = default_value(&ty, &reg).unwrap();
    if let CompositeValue::Record(fields) = &mut v {
        fields[0] = CompositeValue::Str(OwnedString::new(Some("c1".to_string())));
    }

    let dup = duplicate(&v, &ty, &reg).unwrap();
    assert_eq!(compare(&v, &dup, &ty, &reg).unwrap(), std::cmp::Ordering::Equal);

    let mut dup = dup;
    if let CompositeValue::Record(fields) = &mut dup {
        fields[0] = CompositeValue::Str(OwnedString::new(Some("c2".to_string())));
    }
    assert_ne!(compare(&v, &dup, &ty, &reg).unwrap(), std::cmp::Ordering::Equal);
}

#[test]
#[serial(memory_counters)]
fn free_releases_every_transitively_owned_allocation() {
    let reg = node_cluster_registry();
    let ty = TypeRef::Record("cluster".to_string());
    let mut v = default_value(&ty, &reg).unwrap();
    if let CompositeValue::Record(fields) = &mut v {
        fields[0] = CompositeValue::Str(OwnedString::new(Some("c1".to_string())));
    }
    let dup = duplicate(&v, &ty, &reg).unwrap();

    let strings_before = live_strings();
    let buffers_before = live_buffers();

    free(v, &ty, &reg).unwrap();
    free(dup, &ty, &reg).unwrap();

    assert_eq!(live_strings(), strings_before - 2);
    assert_eq!(live_buffers(), buffers_before);
}
