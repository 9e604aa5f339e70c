//! Triangulation tables for regular and transition cells.
//!
//! Both tables are derived at first use from the cell polyhedron instead of
//! being spelled out by hand:
//!
//! ```text
//!   1. classify every point: positive (empty) or not (solid)
//!   2. on each face, walked counter-clockwise from outside, every maximal
//!      run of positive points yields one segment, from the edge where the
//!      run starts to the edge where it ends
//!   3. each crossed edge starts exactly one segment and ends exactly one,
//!      so segments chain into closed loops
//!   4. fan-triangulate each loop from the apex that avoids slivers,
//!      reversed so normals face positive space
//! ```
//!
//! A face is split the same way from both of its sides, which keeps
//! neighboring cells watertight.
//!
//! # Regular Cell
//!
//! ```text
//!       6──────7        corner k = (k & 1, k >> 1 & 1, k >> 2 & 1)
//!      /│     /│
//!     4─┼────5 │        case code bit k set when value(k) > 0
//!     │ 2────┼─3
//!     │/     │/
//!     0──────1
//! ```
//!
//! # Transition Cell
//!
//! ```text
//!   front face (w = 0, full resolution)     back face (w = 1)
//!
//!     6───7───8                               11──────12
//!     │   │   │                               │        │
//!     3───4───5                               │        │
//!     │   │   │                               │        │
//!     0───1───2                               9───────10
//! ```
//!
//! Back points copy the values of front corners 0, 2, 6 and 8, so the case
//! code only covers the nine front samples.

use std::sync::LazyLock;

use glam::Vec3;
use smallvec::SmallVec;

/// Surface polygon of one cell configuration.
#[derive(Clone, Debug, Default)]
pub struct CellCase {
  /// Polyhedron edges that carry a vertex, as point pairs `(a, b)`, `a < b`.
  pub vertices: SmallVec<[(u8, u8); 12]>,
  /// Triangles indexing into `vertices`, counter-clockwise seen from the
  /// positive side.
  pub triangles: SmallVec<[[u8; 3]; 12]>,
}

impl CellCase {
  pub fn is_empty(&self) -> bool {
    self.triangles.is_empty()
  }
}

/// Front corner whose value a transition back point copies.
pub const TRANSITION_BACK_SOURCE: [u8; 4] = [0, 2, 6, 8];

pub static REGULAR_CASES: LazyLock<Vec<CellCase>> = LazyLock::new(|| {
  let points: Vec<Vec3> = (0..8)
    .map(|k| Vec3::new((k & 1) as f32, (k >> 1 & 1) as f32, (k >> 2 & 1) as f32))
    .collect();
  let faces: [&[u8]; 6] = [
    &[0, 2, 6, 4],
    &[1, 3, 7, 5],
    &[0, 1, 5, 4],
    &[2, 3, 7, 6],
    &[0, 1, 3, 2],
    &[4, 5, 7, 6],
  ];
  let faces = orient_faces(&points, &faces);
  (0..256u16)
    .map(|case| {
      let positive: Vec<bool> = (0..8).map(|k| case >> k & 1 == 1).collect();
      polygonize(&points, &faces, &positive)
    })
    .collect()
});

pub static TRANSITION_CASES: LazyLock<Vec<CellCase>> = LazyLock::new(|| {
  let mut points: Vec<Vec3> = (0..9)
    .map(|k| Vec3::new((k % 3) as f32, (k / 3) as f32, 0.0))
    .collect();
  for source in TRANSITION_BACK_SOURCE {
    points.push(points[source as usize] + Vec3::Z);
  }
  let faces: [&[u8]; 9] = [
    &[0, 1, 4, 3],
    &[1, 2, 5, 4],
    &[3, 4, 7, 6],
    &[4, 5, 8, 7],
    &[9, 10, 12, 11],
    &[0, 1, 2, 10, 9],
    &[2, 5, 8, 12, 10],
    &[8, 7, 6, 11, 12],
    &[6, 3, 0, 9, 11],
  ];
  let faces = orient_faces(&points, &faces);
  (0..512u16)
    .map(|case| {
      let mut positive: Vec<bool> = (0..9).map(|k| case >> k & 1 == 1).collect();
      for source in TRANSITION_BACK_SOURCE {
        positive.push(positive[source as usize]);
      }
      polygonize(&points, &faces, &positive)
    })
    .collect()
});

/// Reorder every face so it winds counter-clockwise seen from outside the
/// (convex) polyhedron.
fn orient_faces(points: &[Vec3], faces: &[&[u8]]) -> Vec<Vec<u8>> {
  let centroid = points.iter().copied().sum::<Vec3>() / points.len() as f32;
  faces
    .iter()
    .map(|face| {
      let mut face = face.to_vec();
      let center = face.iter().map(|&p| points[p as usize]).sum::<Vec3>() / face.len() as f32;
      if newell_normal(points, &face).dot(center - centroid) < 0.0 {
        face.reverse();
      }
      face
    })
    .collect()
}

fn newell_normal(points: &[Vec3], face: &[u8]) -> Vec3 {
  let mut normal = Vec3::ZERO;
  for (i, &a) in face.iter().enumerate() {
    let a = points[a as usize];
    let b = points[face[(i + 1) % face.len()] as usize];
    normal += Vec3::new(
      (a.y - b.y) * (a.z + b.z),
      (a.z - b.z) * (a.x + b.x),
      (a.x - b.x) * (a.y + b.y),
    );
  }
  normal
}

#[inline]
fn edge(a: u8, b: u8) -> (u8, u8) {
  (a.min(b), a.max(b))
}

fn polygonize(points: &[Vec3], faces: &[Vec<u8>], positive: &[bool]) -> CellCase {
  // next[start] = end for every segment
  let mut segments: Vec<((u8, u8), (u8, u8))> = Vec::new();
  for face in faces {
    let mut crossings: SmallVec<[(bool, (u8, u8)); 6]> = SmallVec::new();
    for (i, &a) in face.iter().enumerate() {
      let b = face[(i + 1) % face.len()];
      match (positive[a as usize], positive[b as usize]) {
        (false, true) => crossings.push((true, edge(a, b))),
        (true, false) => crossings.push((false, edge(a, b))),
        _ => {}
      }
    }
    for (i, &(enters, start)) in crossings.iter().enumerate() {
      if enters {
        let (exits, end) = crossings[(i + 1) % crossings.len()];
        debug_assert!(!exits, "crossings alternate around a face");
        segments.push((start, end));
      }
    }
  }

  let mut case = CellCase::default();
  let mut used = vec![false; segments.len()];
  for first in 0..segments.len() {
    if used[first] {
      continue;
    }
    let mut ring: SmallVec<[u8; 12]> = SmallVec::new();
    let mut current = first;
    loop {
      used[current] = true;
      ring.push(vertex_slot(&mut case, segments[current].0));
      let end = segments[current].1;
      match segments.iter().position(|(start, _)| *start == end) {
        Some(next) if !used[next] => current = next,
        _ => break,
      }
    }
    let midpoint = |slot: u8| {
      let (a, b) = case.vertices[slot as usize];
      (points[a as usize] + points[b as usize]) * 0.5
    };
    let apex = best_apex(&ring.iter().map(|&s| midpoint(s)).collect::<Vec<_>>());
    ring.rotate_left(apex);
    for i in 1..ring.len().saturating_sub(1) {
      case.triangles.push([ring[i + 1], ring[i], ring[0]]);
    }
  }
  case
}

/// Fan start maximizing the smallest triangle. Transition loops often run
/// through three collinear front vertices.
fn best_apex(ring: &[Vec3]) -> usize {
  let n = ring.len();
  let smallest = |apex: usize| {
    (1..n - 1)
      .map(|i| {
        let a = ring[apex];
        let b = ring[(apex + i) % n];
        let c = ring[(apex + i + 1) % n];
        (b - a).cross(c - a).length()
      })
      .fold(f32::INFINITY, f32::min)
  };
  let mut best = 0;
  let mut best_area = smallest(0);
  for apex in 1..n {
    let area = smallest(apex);
    if area > best_area + 1e-6 {
      best = apex;
      best_area = area;
    }
  }
  best
}

fn vertex_slot(case: &mut CellCase, edge: (u8, u8)) -> u8 {
  match case.vertices.iter().position(|e| *e == edge) {
    Some(slot) => slot as u8,
    None => {
      case.vertices.push(edge);
      (case.vertices.len() - 1) as u8
    }
  }
}

#[cfg(test)]
#[path = "tables_test.rs"]
mod tables_test;
