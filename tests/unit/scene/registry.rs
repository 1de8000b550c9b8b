use super::*;

#[test]
fn removed_handles_resolve_to_missing() {
    let mut reg = Registry::default();
    let a = reg.insert("a");
    let b = reg.insert("b");
    assert_eq!(reg.remove(a), Some("a"));
    assert_eq!(reg.get(a), None);
    assert_eq!(reg.get(b), Some(&"b"));
    assert_eq!(reg.len(), 1);
}

#[test]
fn reused_slot_does_not_revive_stale_handle() {
    let mut reg = Registry::default();
    let a = reg.insert(1u32);
    reg.remove(a);
    let c = reg.insert(2u32);
    assert_eq!(a.index(), c.index());
    assert_ne!(a, c);
    assert_eq!(reg.get(a), None);
    assert_eq!(reg.get(c), Some(&2));
    assert_eq!(reg.remove(a), None);
}

#[test]
fn iteration_skips_empty_slots_in_index_order() {
    let mut reg = Registry::default();
    let ids: Vec<_> = (0..4u32).map(|i| reg.insert(i)).collect();
    reg.remove(ids[1]);
    let seen: Vec<u32> = reg.iter().map(|(_, v)| *v).collect();
    assert_eq!(seen, vec![0, 2, 3]);
}

#[test]
fn handles_survive_json_roundtrip() {
    let mut reg = Registry::default();
    let a = reg.insert(String::from("x"));
    let json = serde_json::to_string(&(reg, a)).unwrap();
    let (reg2, a2): (Registry<String>, Id<String>) = serde_json::from_str(&json).unwrap();
    assert_eq!(reg2.get(a2).map(String::as_str), Some("x"));
}
