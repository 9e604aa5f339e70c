use super::*;

use crate::config::GeneratorConfig;
use crate::error::VoxelError;
use crate::generator::SphereGenerator;
use crate::mesher::{build_chunk_mesh, ChunkRequest};

fn flat_config(depth: u8) -> WorldConfig {
  WorldConfig::default()
    .with_depth(depth)
    .with_mesh_threads(2)
    .with_generator(GeneratorConfig::Flat {
      height: 0.5,
      material: Material::solid(1),
    })
}

fn meshed_world(config: WorldConfig) -> VoxelWorld {
  let mut world = VoxelWorld::new(config).unwrap();
  world.update_lod();
  world.flush();
  world.drain_events();
  world
}

fn mesh_count(events: &[ChunkEvent]) -> usize {
  events
    .iter()
    .filter(|event| matches!(event, ChunkEvent::MeshReady { .. }))
    .count()
}

#[test]
fn test_configured_generator_is_used() {
  let world = VoxelWorld::new(flat_config(2)).unwrap();
  assert_eq!(world.size(), 64);
  assert_eq!(world.get_value(IVec3::new(3, 3, 4)), 3.5);
  assert_eq!(world.get_material(IVec3::ZERO), Material::solid(1));
}

#[test]
fn test_explicit_generator_wins() {
  let ball = Arc::new(SphereGenerator {
    center: Vec3::ZERO,
    radius: 4.0,
    material: Material::solid(3),
  });
  let world = VoxelWorld::with_generator(flat_config(2), ball).unwrap();
  assert_eq!(world.get_value(IVec3::ZERO), -4.0);
  assert_eq!(world.get_material(IVec3::ZERO), Material::solid(3));
}

#[test]
fn test_invalid_config_is_rejected() {
  let result = VoxelWorld::new(WorldConfig::default().with_depth(25));
  assert!(matches!(result, Err(VoxelError::InvalidDepth { depth: 25, .. })));
}

#[test]
fn test_brush_remeshes_chunks() {
  let mut world = meshed_world(flat_config(1));
  let root = world.scheduler().octree().root();
  let before = world.chunk_mesh(root.id).unwrap().triangle_count();

  let written = world.set_value_sphere(IVec3::new(0, 0, 0), 4.0, false, 1.0);
  assert!(written > 0);
  world.flush();

  assert_eq!(mesh_count(&world.drain_events()), 1);
  assert!(world.get_value(IVec3::ZERO) > 0.0);
  let after = world.chunk_mesh(root.id).unwrap().triangle_count();
  assert_ne!(before, after);
}

#[test]
fn test_single_voxel_edit_waits_for_apply() {
  let mut world = meshed_world(flat_config(1));

  world.set_value(IVec3::new(2, 2, 2), 1.0);
  world.set_material(IVec3::new(2, 2, 2), Material::solid(4));
  world.flush();
  assert_eq!(mesh_count(&world.drain_events()), 0);

  assert_eq!(world.apply_queued_updates(false), 1);
  assert_eq!(mesh_count(&world.drain_events()), 1);
  assert_eq!(world.get_material(IVec3::new(2, 2, 2)), Material::solid(4));
}

#[test]
fn test_save_file_round_trip() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("world.sav");

  let mut source = meshed_world(flat_config(2));
  source.set_value_box(IVec3::new(5, 5, 5), Vec3::splat(2.0), true, 1.0);
  source.set_material_sphere(IVec3::new(-9, 3, 0), 3.0, 6, false, 1.0);
  source.flush();
  source.save_to_file(&path).unwrap();

  let mut target = meshed_world(flat_config(2));
  assert!(target.load_from_file(&path, false) > 0);
  target.flush();
  assert!(mesh_count(&target.drain_events()) > 0);

  assert_eq!(target.get_save(), source.get_save());
  assert_eq!(target.get_value(IVec3::new(5, 5, 5)), -1.0);
  assert_eq!(target.get_material(IVec3::new(-9, 3, 0)).index2, 6);
}

/// Every loaded chunk shows what a fresh build over the current data gives.
fn assert_meshes_current(world: &VoxelWorld) {
  let octree = world.data().begin_get();
  for node in world.scheduler().octree().loaded_leaves() {
    let chunk = world.scheduler().chunk(node.id).unwrap();
    let shown = chunk.mesh().unwrap();
    let request = ChunkRequest::for_node(&node).with_transitions(chunk.transitions());
    let fresh = build_chunk_mesh(&*octree, &request);
    assert_eq!(shown.positions, fresh.positions, "stale mesh at {:?}", node.center);
    assert_eq!(shown.normals, fresh.normals, "stale normals at {:?}", node.center);
    assert_eq!(shown.indices, fresh.indices, "stale mesh at {:?}", node.center);
  }
}

#[test]
fn test_load_remeshes_chunks_above_loaded_leaf() {
  let mut source = VoxelWorld::new(flat_config(1)).unwrap();
  source.set_value(IVec3::new(-1, -8, 0), 3.0);
  let save = source.get_save();
  assert_eq!(save.chunks.len(), 1);

  let mut target = VoxelWorld::new(flat_config(1)).unwrap();
  let invoker = Arc::new(Invoker::new(Vec3::new(1.0, 0.0, 0.0)));
  target.add_invoker(&invoker);
  target.update_lod();
  target.flush();
  assert_eq!(target.scheduler().octree().loaded_leaves().len(), 8);
  let (upper, _) = target.scheduler().octree().leaf_at(IVec3::new(1, -8, 1)).unwrap();
  let before = target.chunk_mesh(upper.id).unwrap();

  target.load_from_save(&save, false);
  target.flush();

  assert!(!Arc::ptr_eq(&before, &target.chunk_mesh(upper.id).unwrap()));
  assert_meshes_current(&target);
}

#[test]
fn test_reset_load_reverts_edits() {
  let mut world = meshed_world(flat_config(2));
  let pristine = world.get_save();
  assert!(pristine.is_empty());

  world.set_value_sphere(IVec3::new(10, 10, 0), 3.0, true, 1.0);
  world.flush();
  assert!(!world.get_save().is_empty());

  assert!(world.load_from_save(&pristine, true) > 0);
  world.flush();
  assert!(world.get_save().is_empty());
  assert_eq!(world.get_value(IVec3::new(10, 10, 5)), 4.5);
  assert_meshes_current(&world);
}

#[test]
fn test_unreadable_save_loads_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let mut world = meshed_world(flat_config(1));

  assert_eq!(world.load_from_file(dir.path().join("missing.sav"), false), 0);

  let garbage = dir.path().join("garbage.sav");
  std::fs::write(&garbage, b"not a save").unwrap();
  assert_eq!(world.load_from_file(&garbage, false), 0);
  assert!(world.get_save().is_empty());
}

#[test]
fn test_diff_syncs_peers() {
  let config = flat_config(2).with_multiplayer(true);
  let mut host = meshed_world(config.clone());
  let mut peer = meshed_world(config);

  host.set_value_sphere(IVec3::new(-4, 6, 0), 2.5, true, 1.0);
  host.set_material_sphere(IVec3::new(-4, 6, 0), 2.0, 9, false, 1.0);
  host.flush();

  let packets = host.diff();
  assert!(!packets.is_empty());
  assert!(host.diff().is_empty());

  let values: Vec<_> = packets.values.into_iter().flatten().collect();
  let materials: Vec<_> = packets.materials.into_iter().flatten().collect();
  assert!(peer.apply_diff(&values, &materials) > 0);
  peer.flush();

  assert_eq!(peer.get_save(), host.get_save());
}

#[test]
fn test_lod_follows_invoker() {
  let mut world = meshed_world(flat_config(2));
  let invoker = Arc::new(Invoker::new(Vec3::new(1.0, 1.0, 1.0)));
  world.add_invoker(&invoker);

  let stats = world.update_lod();
  assert!(stats.splits > 0);
  world.flush();
  let leaves = world.scheduler().octree().loaded_leaves();
  assert!(mesh_count(&world.drain_events()) >= leaves.len());
  for node in leaves {
    assert!(world.chunk_mesh(node.id).is_some());
  }
  assert!(world.metrics().snapshot().total_meshes_built > 1);
}
