//! Tests for resource arithmetic through the public API

use prometheus_offer_engine::core::{ResourceSet, ValueRange, CPUS, DISK, MEMORY, PORTS};

#[test]
fn test_value_range_normalizes_bounds() {
    let range = ValueRange::new(31010, 31000);
    assert_eq!(range, ValueRange::new(31000, 31010));
    assert_eq!(range.len(), 11);
    assert_eq!(range.to_string(), "[31000-31010]");
}

#[test]
fn test_display_lists_every_dimension() {
    let set = ResourceSet::cpus_mem(1.5, 128.0)
        .with_range(PORTS, 31000, 31001)
        .with_items("gpus", ["gpu0"]);
    assert_eq!(set.to_string(), "{cpus:1.5, mem:128, ports:[31000-31001], gpus:{gpu0}}");
}

#[test]
fn test_offer_pool_minus_tasks() {
    let pool = ResourceSet::combine_all([
        &ResourceSet::cpus_mem(2.0, 4096.0).with_range(PORTS, 31000, 31099),
        &ResourceSet::cpus_mem(2.0, 4096.0).with_scalar(DISK, 100.0),
    ]);
    let demand = ResourceSet::cpus_mem(3.0, 6144.0).with_range(PORTS, 31050, 31050);

    assert!(pool.contains(&demand));
    let left = pool.subtract(&demand).expect("fits");
    assert!((left.scalar(CPUS) - 1.0).abs() < 1e-9);
    assert!((left.scalar(MEMORY) - 2048.0).abs() < 1e-9);
    assert!((left.scalar(DISK) - 100.0).abs() < 1e-9);
    assert_eq!(
        left.ranges(PORTS),
        &[ValueRange::new(31000, 31049), ValueRange::new(31051, 31099)]
    );
}

#[test]
fn test_resource_set_from_json() {
    let json = r#"{
        "scalars": { "cpus": 4.0, "mem": 8192.0 },
        "ranges": { "ports": [ { "begin": 8000, "end": 8010 } ] }
    }"#;
    let set: ResourceSet = serde_json::from_str(json).expect("deserialize");
    assert!((set.scalar(CPUS) - 4.0).abs() < 1e-9);
    assert_eq!(set.ranges(PORTS), &[ValueRange::new(8000, 8010)]);
    assert!(set.items("gpus").is_none());
}
