use super::*;

#[test]
fn test_material_index_set_ignores_order() {
  let a = Material::new(1, 4, 10);
  let b = Material::new(4, 1, 200);
  let c = Material::new(1, 5, 10);
  assert!(a.has_same_indexes_as(&b));
  assert!(b.has_same_indexes_as(&a));
  assert!(!a.has_same_indexes_as(&c));
}

#[test]
fn test_material_dominant_index() {
  assert_eq!(Material::new(2, 7, 0).dominant_index(), 2);
  assert_eq!(Material::new(2, 7, 127).dominant_index(), 2);
  assert_eq!(Material::new(2, 7, 128).dominant_index(), 7);
}

#[test]
fn test_material_serializes_as_three_bytes() {
  let material = Material::new(3, 9, 250);
  let bytes = bincode::serialize(&material).unwrap();
  assert_eq!(bytes, vec![3, 9, 250]);
  let back: Material = bincode::deserialize(&bytes).unwrap();
  assert_eq!(back, material);
}

#[test]
fn test_material_color_encoding() {
  let material = Material::new(5, 6, 77);
  assert_eq!(Material::from_color(material.to_color()), material);
}

#[test]
fn test_direction_invert_and_offset() {
  for direction in Direction::ALL {
    assert_eq!(direction.invert().invert(), direction);
    assert_eq!(direction.offset(), -direction.invert().offset());
    assert_eq!(direction.offset().abs().element_sum(), 1);
  }
  assert_eq!(Direction::XMax.offset(), IVec3::X);
  assert_eq!(Direction::ZMin.offset(), -IVec3::Z);
}

#[test]
fn test_transition_mask() {
  let mut mask = TransitionMask::NONE.with(Direction::YMax);
  assert!(mask.contains(Direction::YMax));
  assert!(!mask.contains(Direction::YMin));
  mask.set(Direction::XMin, true);
  assert_eq!(
    mask.iter().collect::<Vec<_>>(),
    vec![Direction::XMin, Direction::YMax]
  );
  mask.set(Direction::YMax, false);
  assert_eq!(mask.bits(), 1);
}

#[test]
fn test_aabb_encapsulate() {
  let mut aabb = MinMaxAABB::empty();
  assert!(!aabb.is_valid());
  aabb.encapsulate(Vec3::new(1.0, 2.0, 3.0));
  aabb.encapsulate(Vec3::new(-1.0, 5.0, 0.0));
  assert!(aabb.is_valid());
  assert_eq!(aabb.min, Vec3::new(-1.0, 2.0, 0.0));
  assert_eq!(aabb.max, Vec3::new(1.0, 5.0, 3.0));
}
