use super::*;

use std::collections::HashSet;

fn regular_point(k: u8) -> Vec3 {
  Vec3::new((k & 1) as f32, (k >> 1 & 1) as f32, (k >> 2 & 1) as f32)
}

fn transition_point(k: u8) -> Vec3 {
  if k < 9 {
    Vec3::new((k % 3) as f32, (k / 3) as f32, 0.0)
  } else {
    transition_point(TRANSITION_BACK_SOURCE[k as usize - 9]) + Vec3::Z
  }
}

fn triangle_normals(case: &CellCase, point: impl Fn(u8) -> Vec3) -> Vec<Vec3> {
  let midpoint = |slot: u8| {
    let (a, b) = case.vertices[slot as usize];
    (point(a) + point(b)) * 0.5
  };
  case
    .triangles
    .iter()
    .map(|t| {
      let [a, b, c] = t.map(midpoint);
      (b - a).cross(c - a)
    })
    .collect()
}

#[test]
fn test_table_sizes() {
  assert_eq!(REGULAR_CASES.len(), 256);
  assert_eq!(TRANSITION_CASES.len(), 512);
  assert!(REGULAR_CASES[0].is_empty());
  assert!(REGULAR_CASES[255].is_empty());
  assert!(TRANSITION_CASES[0].is_empty());
  assert!(TRANSITION_CASES[511].is_empty());
}

#[test]
fn test_vertices_sit_on_sign_changes() {
  for (code, case) in REGULAR_CASES.iter().enumerate() {
    for &(a, b) in &case.vertices {
      assert!(a < b);
      assert_eq!((a ^ b).count_ones(), 1, "case {code}: ({a}, {b}) is not a cube edge");
      assert_ne!(code >> a & 1, code >> b & 1, "case {code}: edge without crossing");
    }
  }
}

#[test]
fn test_single_corner_cases() {
  for k in 0..8u8 {
    let alone = &REGULAR_CASES[1 << k];
    assert_eq!(alone.vertices.len(), 3);
    assert_eq!(alone.triangles.len(), 1);
    let normal = triangle_normals(alone, regular_point)[0];
    let toward_corner = regular_point(k) - Vec3::splat(0.5);
    assert!(normal.dot(toward_corner) > 0.0, "corner {k}: normal must face the empty corner");

    let buried = &REGULAR_CASES[255 ^ (1 << k)];
    let normal = triangle_normals(buried, regular_point)[0];
    assert!(normal.dot(toward_corner) < 0.0, "corner {k}: normal must face away from solid");
  }
}

#[test]
fn test_half_cube_is_one_quad() {
  // corners with z = 1 are empty
  let case = &REGULAR_CASES[0b1111_0000];
  assert_eq!(case.vertices.len(), 4);
  assert_eq!(case.triangles.len(), 2);
  for normal in triangle_normals(case, regular_point) {
    assert!(normal.z > 0.0);
    assert!(normal.x.abs() < 1e-6 && normal.y.abs() < 1e-6);
  }
}

#[test]
fn test_cases_are_consistently_oriented() {
  for (code, case) in REGULAR_CASES.iter().chain(TRANSITION_CASES.iter()).enumerate() {
    let mut directed = HashSet::new();
    for t in &case.triangles {
      for i in 0..3 {
        let edge = (t[i], t[(i + 1) % 3]);
        assert!(directed.insert(edge), "case {code}: directed edge {edge:?} used twice");
      }
    }
  }
}

#[test]
fn test_complement_uses_same_edges() {
  for code in 0..256 {
    let a: HashSet<_> = REGULAR_CASES[code].vertices.iter().collect();
    let b: HashSet<_> = REGULAR_CASES[255 - code].vertices.iter().collect();
    assert_eq!(a, b, "case {code}");
  }
}

#[test]
fn test_transition_center_bump_faces_out() {
  let case = &TRANSITION_CASES[1 << 4];
  assert_eq!(case.vertices.len(), 4);
  assert_eq!(case.triangles.len(), 2);
  assert!(case.vertices.iter().all(|&(a, b)| a == 4 || b == 4));
  for normal in triangle_normals(case, transition_point) {
    assert!(normal.z < 0.0, "front face looks toward -w");
  }
}

#[test]
fn test_transition_back_edges_follow_corners() {
  // corners 0 and 2 disagree: the back edge 9-10 must carry a vertex
  let case = &TRANSITION_CASES[1 << 0];
  assert!(case.vertices.contains(&(9, 10)));
  assert!(case.vertices.contains(&(9, 11)));
  assert!(case.vertices.contains(&(0, 1)));
  assert!(case.vertices.contains(&(0, 3)));
  // lateral edges never cross
  for &(a, b) in &case.vertices {
    assert_eq!(a < 9, b < 9);
  }
}

#[test]
fn test_transition_row_has_no_slivers() {
  // bottom row solid, the rest empty: the loop runs through three
  // collinear front vertices
  let case = &TRANSITION_CASES[0b1_1111_1000];
  assert_eq!(case.vertices.len(), 5);
  assert_eq!(case.triangles.len(), 3);
  for normal in triangle_normals(case, transition_point) {
    assert!(normal.length() > 1e-3);
    assert!(normal.y > 0.0, "surface faces the empty rows");
  }
}
