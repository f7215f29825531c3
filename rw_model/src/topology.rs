//! Triangle reconstruction for geometry without explicit faces.
//!
//! Native geometry only stores the vertex indices for each material in its
//! [splits](rw_lib::geometry::Geometry#structfield.splits).
//! Faces use the same `[vertex1, vertex0, material, vertex2]` layout as portable geometry.
use log::warn;
use rw_lib::geometry::{FaceType, Geometry, Split};

/// Replace the faces of `geometry` with triangles generated from its splits.
///
/// Triangle strips skip triangles with two identical vertex positions
/// and flip the winding of every other triangle.
/// Triangle lists use every triple of indices as is.
/// Triangles with out of range vertex indices are skipped.
pub fn generate_faces(geometry: &mut Geometry) {
    let mut faces = Vec::new();
    for (i, split) in geometry.splits.iter().enumerate() {
        let skipped = match geometry.face_type {
            FaceType::TriangleStrip => strip_faces(&geometry.vertices, split, &mut faces),
            FaceType::TriangleList => list_faces(geometry.vertices.len(), split, &mut faces),
        };
        if skipped > 0 {
            warn!(
                "Skipped {skipped} triangles with out of range indices in split {i} for {} vertices",
                geometry.vertices.len()
            );
        }
    }
    geometry.faces = faces;
}

fn strip_faces(vertices: &[[f32; 3]], split: &Split, faces: &mut Vec<[u32; 4]>) -> usize {
    let s = &split.indices;
    let mut skipped = 0;
    for j in 0..s.len().saturating_sub(2) {
        let [v0, v1, v2] = [s[j], s[j + 1], s[j + 2]];
        let positions = [v0, v1, v2].map(|v| vertices.get(v as usize));
        let [Some(p0), Some(p1), Some(p2)] = positions else {
            skipped += 1;
            continue;
        };

        // Strips repeat indices to restart or change direction.
        if p0 == p1 || p0 == p2 || p1 == p2 {
            continue;
        }

        // Odd triangles have the opposite winding.
        let flip = j % 2;
        faces.push([s[j + 1 + flip], s[j], split.material_index, s[j + 2 - flip]]);
    }
    skipped
}

fn list_faces(vertex_count: usize, split: &Split, faces: &mut Vec<[u32; 4]>) -> usize {
    let mut skipped = 0;
    for triangle in split.indices.chunks_exact(3) {
        if triangle.iter().any(|v| *v as usize >= vertex_count) {
            skipped += 1;
            continue;
        }
        faces.push([
            triangle[1],
            triangle[0],
            split.material_index,
            triangle[2],
        ]);
    }
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn geometry(face_type: FaceType, vertices: Vec<[f32; 3]>, splits: Vec<Split>) -> Geometry {
        Geometry {
            native: true,
            vertices,
            face_type,
            splits,
            ..Default::default()
        }
    }

    fn split(material_index: u32, indices: Vec<u32>) -> Split {
        Split {
            material_index,
            indices,
        }
    }

    #[test]
    fn strip_repeated_index() {
        let mut geometry = geometry(
            FaceType::TriangleStrip,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            vec![split(0, vec![0, 0, 1])],
        );
        generate_faces(&mut geometry);
        assert!(geometry.faces.is_empty());
    }

    #[test]
    fn strip_identical_positions() {
        // Different indices with the same position are still degenerate.
        let mut geometry = geometry(
            FaceType::TriangleStrip,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            vec![split(0, vec![0, 1, 2])],
        );
        generate_faces(&mut geometry);
        assert!(geometry.faces.is_empty());
    }

    #[test]
    fn strip_alternating_winding() {
        let mut geometry = geometry(
            FaceType::TriangleStrip,
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            vec![split(3, vec![0, 1, 2, 3])],
        );
        generate_faces(&mut geometry);
        assert_eq!(vec![[1, 0, 3, 2], [3, 1, 3, 2]], geometry.faces);
    }

    #[test]
    fn strip_short_split() {
        let mut geometry = geometry(
            FaceType::TriangleStrip,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            vec![split(0, vec![0, 1]), split(0, Vec::new())],
        );
        generate_faces(&mut geometry);
        assert!(geometry.faces.is_empty());
    }

    #[test]
    fn strip_out_of_range_index() {
        let mut geometry = geometry(
            FaceType::TriangleStrip,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![split(0, vec![0, 1, 2, 7])],
        );
        generate_faces(&mut geometry);
        assert_eq!(vec![[1, 0, 0, 2]], geometry.faces);
    }

    #[test]
    fn list_no_degeneracy_check() {
        let mut geometry = geometry(
            FaceType::TriangleList,
            vec![
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [2.0, 0.0, 0.0],
            ],
            vec![split(1, vec![0, 1, 2, 3, 4, 5])],
        );
        generate_faces(&mut geometry);
        assert_eq!(vec![[1, 0, 1, 2], [4, 3, 1, 5]], geometry.faces);
    }

    #[test]
    fn list_ignores_incomplete_triangle() {
        let mut geometry = geometry(
            FaceType::TriangleList,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![split(0, vec![0, 1, 2, 0, 1])],
        );
        generate_faces(&mut geometry);
        assert_eq!(vec![[1, 0, 0, 2]], geometry.faces);
    }

    #[test]
    fn faces_use_split_material() {
        let mut geometry = geometry(
            FaceType::TriangleList,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![split(2, vec![0, 1, 2]), split(5, vec![2, 1, 0])],
        );
        // Existing faces are replaced.
        geometry.faces = vec![[9, 9, 9, 9]];
        generate_faces(&mut geometry);

        assert_eq!(vec![[1, 0, 2, 2], [1, 2, 5, 0]], geometry.faces);
        for face in &geometry.faces {
            assert!([face[0], face[1], face[3]].iter().all(|v| *v < 3));
        }
    }
}
