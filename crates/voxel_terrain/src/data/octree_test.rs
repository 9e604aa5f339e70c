use super::*;

use crate::generator::{EmptyGenerator, FlatGenerator};

const SMALL_PACKET: usize = 4;

fn flat(depth: u8, multiplayer: bool) -> DataOctree {
  let generator = Arc::new(FlatGenerator {
    height: 0.0,
    material: Material::solid(1),
  });
  DataOctree::new(depth, generator, multiplayer)
}

#[test]
fn test_unedited_reads_come_from_generator() {
  let octree = flat(2, false);
  assert_eq!(octree.get_value(IVec3::new(3, -7, 5)), 5.0);
  assert_eq!(octree.get_material(IVec3::ZERO), Material::solid(1));
  assert_eq!(octree.node_count(), 1);
  assert_eq!(octree.dirty_leaf_count(), 0);
}

#[test]
fn test_reads_clamp_to_world() {
  let octree = flat(1, false);
  // world is [-16, 16)
  assert_eq!(octree.get_value(IVec3::new(0, 0, 1000)), 15.0);
  assert_eq!(octree.get_value(IVec3::new(0, 0, -1000)), -16.0);
}

#[test]
fn test_write_materializes_one_leaf() {
  let mut octree = flat(2, false);
  octree.set_value(IVec3::new(1, 2, 3), -4.0);

  assert_eq!(octree.get_value(IVec3::new(1, 2, 3)), -4.0);
  // neighbors in the same leaf keep the generator value
  assert_eq!(octree.get_value(IVec3::new(2, 2, 3)), 3.0);
  assert_eq!(octree.dirty_leaf_count(), 1);
  // root + 8 + 8
  assert_eq!(octree.node_count(), 17);
  assert!(octree.check_invariants());
}

#[test]
fn test_set_both_and_material() {
  let mut octree = flat(1, false);
  let pos = IVec3::new(-16, -16, -16);
  octree.set_both(pos, 0.25, Material::new(2, 5, 200));
  assert_eq!(octree.get(pos), (0.25, Material::new(2, 5, 200)));
  octree.set_material(pos, Material::solid(9));
  assert_eq!(octree.get(pos), (0.25, Material::solid(9)));
}

#[test]
#[should_panic(expected = "outside the world")]
fn test_write_outside_world_panics() {
  let mut octree = flat(1, false);
  octree.set_value(IVec3::new(16, 0, 0), 1.0);
}

#[test]
fn test_save_contains_only_edited_leaves() {
  let mut octree = flat(2, false);
  octree.set_value(IVec3::new(-30, 0, 0), 1.0);
  octree.set_value(IVec3::new(20, 20, 20), 1.0);
  octree.set_value(IVec3::new(21, 20, 20), 2.0);

  let save = octree.save();
  assert_eq!(save.depth, 2);
  assert_eq!(save.chunks.len(), 2);
  assert!(save.chunks[0].id < save.chunks[1].id);
  assert!(save.chunks.iter().all(|c| is_leaf_id(c.id, 2)));
}

#[test]
fn test_load_reproduces_saved_world() {
  let mut source = flat(2, false);
  source.set_both(IVec3::new(5, -9, 12), -3.0, Material::solid(7));
  source.set_value(IVec3::new(-32, -32, -32), 8.0);
  let save = source.save();

  let mut target = flat(2, false);
  let modified = target.load(&save, false);
  assert!(!modified.is_empty());
  assert_eq!(target.get(IVec3::new(5, -9, 12)), (-3.0, Material::solid(7)));
  assert_eq!(target.get_value(IVec3::new(-32, -32, -32)), 8.0);
  assert_eq!(target.save(), save);
  assert!(target.check_invariants());
}

#[test]
fn test_load_with_reset_discards_edits() {
  let mut octree = flat(1, false);
  octree.set_value(IVec3::new(10, 10, 10), 99.0);

  let modified = octree.load(&WorldSave { depth: 1, chunks: vec![] }, true);
  assert_eq!(octree.get_value(IVec3::new(10, 10, 10)), 10.0);
  assert_eq!(octree.dirty_leaf_count(), 0);
  assert!(modified.contains(&IVec3::new(8, 8, 8)));
}

#[test]
fn test_load_without_reset_keeps_other_edits() {
  let mut source = flat(1, false);
  source.set_value(IVec3::new(-10, -10, -10), 42.0);
  let save = source.save();

  let mut octree = flat(1, false);
  octree.set_value(IVec3::new(10, 10, 10), 99.0);
  octree.load(&save, false);
  assert_eq!(octree.get_value(IVec3::new(10, 10, 10)), 99.0);
  assert_eq!(octree.get_value(IVec3::new(-10, -10, -10)), 42.0);
}

#[test]
fn test_malformed_save_loads_nothing() {
  let mut source = flat(2, false);
  source.set_value(IVec3::ZERO, 5.0);
  let mut save = source.save();
  save.depth = 3;

  let mut octree = flat(2, false);
  assert!(octree.load(&save, false).is_empty());
  assert_eq!(octree.dirty_leaf_count(), 0);
}

#[test]
fn test_corner_leaf_anchors_stay_in_world() {
  let mut octree = flat(1, false);
  octree.set_value(IVec3::new(-10, -10, -10), 1.0);
  let anchors = octree.dirty_chunk_positions();
  assert_eq!(anchors.len(), 8);
  assert!(anchors.contains(&IVec3::splat(-8)));
  assert!(anchors.contains(&IVec3::splat(8)));
  assert!(anchors.iter().all(|a| octree.is_in_world(*a)));

  octree.reset();
  octree.set_value(IVec3::new(10, 10, 10), 1.0);
  let anchors = octree.dirty_chunk_positions();
  assert_eq!(anchors.len(), 8);
  assert!(anchors.iter().all(|a| octree.is_in_world(*a)));
}

#[test]
fn test_inner_leaf_anchors_cover_both_sides() {
  let mut octree = flat(2, false);
  octree.set_value(IVec3::new(1, 1, 1), 1.0);
  let anchors = octree.dirty_chunk_positions();

  // every neighbor of the leaf at (8, 8, 8) fits inside [-32, 32)
  assert_eq!(anchors.len(), 27);
  assert!(anchors.contains(&IVec3::new(-8, 8, 8)));
  assert!(anchors.contains(&IVec3::new(24, 8, 8)));
  assert!(anchors.contains(&IVec3::new(24, -8, 8)));
}

#[test]
fn test_diff_requires_multiplayer() {
  let mut octree = flat(1, false);
  octree.set_value(IVec3::ZERO, 1.0);
  assert!(octree.diff(SMALL_PACKET).is_empty());
}

#[test]
fn test_diff_collects_and_clears() {
  let mut octree = flat(1, true);
  for x in 0..6 {
    octree.set_value(IVec3::new(x, 0, 0), x as f32);
  }
  octree.set_material(IVec3::new(-1, -1, -1), Material::solid(4));

  let packets = octree.diff(SMALL_PACKET);
  assert_eq!(packets.value_count(), 6);
  assert_eq!(packets.values.len(), 2);
  assert_eq!(packets.values[0].len(), 4);
  assert_eq!(packets.material_count(), 1);

  assert!(octree.diff(SMALL_PACKET).is_empty());
}

#[test]
fn test_apply_diff_replicates_writes() {
  let mut sender = flat(2, true);
  sender.set_value(IVec3::new(3, 4, 5), -1.5);
  sender.set_value(IVec3::new(-40, 12, 0), 6.0);
  sender.set_material(IVec3::new(3, 4, 5), Material::solid(8));
  let packets = sender.diff(2048);

  let mut receiver = flat(2, true);
  let values: Vec<_> = packets.values.concat();
  let materials: Vec<_> = packets.materials.concat();
  let modified = receiver.apply_diff(&values, &materials);

  assert_eq!(modified.len(), 3);
  assert!(modified.contains(&IVec3::new(-40, 12, 0)));
  assert_eq!(receiver.get(IVec3::new(3, 4, 5)), (-1.5, Material::solid(8)));
  assert_eq!(receiver.get_value(IVec3::new(-40, 12, 0)), 6.0);
  // received writes are not echoed back
  assert!(receiver.diff(2048).is_empty());
}

#[test]
fn test_apply_diff_skips_invalid_entries() {
  let mut octree = DataOctree::new(1, Arc::new(EmptyGenerator), true);
  let values = [
    ValueDiff {
      id: 9,
      index: 0,
      value: -1.0,
    },
    ValueDiff {
      id: 10,
      index: 5000,
      value: -1.0,
    },
    ValueDiff {
      id: 10,
      index: 0,
      value: -1.0,
    },
  ];
  let modified = octree.apply_diff(&values, &[]);
  // id 10 is octant 0, whose first voxel is the world's min corner
  assert_eq!(modified, vec![IVec3::splat(-16)]);
  assert_eq!(octree.get_value(IVec3::splat(-16)), -1.0);
  assert_eq!(octree.dirty_leaf_count(), 1);
}
