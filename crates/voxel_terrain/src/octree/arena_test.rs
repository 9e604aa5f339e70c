use super::*;

#[test]
fn test_insert_and_get() {
  let mut arena = Arena::new();
  let a = arena.insert("a");
  let b = arena.insert("b");
  assert_eq!(arena.len(), 2);
  assert_eq!(arena[a], "a");
  assert_eq!(arena.get(b), Some(&"b"));
}

#[test]
fn test_removed_handle_is_stale() {
  let mut arena = Arena::new();
  let a = arena.insert(1);
  assert_eq!(arena.remove(a), Some(1));
  assert!(!arena.contains(a));
  assert_eq!(arena.remove(a), None);
  assert!(arena.is_empty());
}

#[test]
fn test_reused_slot_does_not_alias() {
  let mut arena = Arena::new();
  let old = arena.insert(1);
  arena.remove(old);
  let new = arena.insert(2);
  assert_eq!(old.index(), new.index(), "slot should be reused");
  assert_ne!(old, new);
  assert_eq!(arena.get(old), None);
  assert_eq!(arena[new], 2);
}

#[test]
#[should_panic(expected = "stale arena handle")]
fn test_index_with_stale_handle_panics() {
  let mut arena = Arena::new();
  let handle = arena.insert(0u8);
  arena.remove(handle);
  let _ = arena[handle];
}

#[test]
fn test_iter_skips_free_slots() {
  let mut arena = Arena::new();
  let handles: Vec<_> = (0..5).map(|i| arena.insert(i)).collect();
  arena.remove(handles[1]);
  arena.remove(handles[3]);
  let values: Vec<_> = arena.iter().map(|(_, v)| *v).collect();
  assert_eq!(values, vec![0, 2, 4]);
  for (handle, value) in arena.iter() {
    assert_eq!(arena[handle], *value);
  }
}
