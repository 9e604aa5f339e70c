use super::*;

use std::sync::Barrier;
use std::thread;

use crate::generator::FlatGenerator;

fn store() -> Arc<VoxelData> {
  Arc::new(VoxelData::new(
    2,
    Arc::new(FlatGenerator {
      height: 0.0,
      material: Material::solid(1),
    }),
    false,
  ))
}

#[test]
fn test_readers_overlap() {
  let data = store();
  let barrier = Arc::new(Barrier::new(4));
  let handles: Vec<_> = (0..4)
    .map(|i| {
      let data = Arc::clone(&data);
      let barrier = Arc::clone(&barrier);
      thread::spawn(move || {
        let guard = data.begin_get();
        // every reader reaches the barrier while holding its guard
        barrier.wait();
        guard.get_value(IVec3::new(0, 0, i))
      })
    })
    .collect();
  for (i, handle) in handles.into_iter().enumerate() {
    assert_eq!(handle.join().unwrap(), i as f32);
  }
}

#[test]
fn test_writes_are_exclusive() {
  let data = store();
  let pos = IVec3::new(1, 1, 1);
  data.set_value(pos, 0.0);

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let data = Arc::clone(&data);
      thread::spawn(move || {
        for _ in 0..100 {
          let mut guard = data.begin_set();
          let value = guard.get_value(pos);
          guard.set_value(pos, value + 1.0);
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }
  assert_eq!(data.get_value(pos), 800.0);
}

#[test]
fn test_guard_release_allows_next_lock() {
  let data = store();
  {
    let _read = data.begin_get();
  }
  {
    let mut write = data.begin_set();
    write.set_value(IVec3::ZERO, -2.0);
  }
  assert_eq!(data.get_value(IVec3::ZERO), -2.0);
}

#[test]
fn test_save_and_load_through_store() {
  let data = store();
  data.set_material(IVec3::new(4, 4, 4), Material::solid(6));
  let save = data.save();

  let other = store();
  other.load(&save, true);
  assert_eq!(other.get_material(IVec3::new(4, 4, 4)), Material::solid(6));
  assert_eq!(other.depth(), 2);
  assert_eq!(other.size(), 64);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "not reentrant")]
fn test_nested_read_panics() {
  let data = store();
  let _outer = data.begin_get();
  let _inner = data.begin_get();
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "not reentrant")]
fn test_read_inside_write_panics() {
  let data = store();
  let _write = data.begin_set();
  let _read = data.begin_get();
}
