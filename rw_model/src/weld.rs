//! Vertex deduplication for native geometry.
//!
//! Native data stores a separate vertex for every triangle corner.
//! Welding merges vertices with identical attributes
//! and updates the split and face indices to use the merged vertices.
use log::warn;
use rw_lib::geometry::Geometry;

/// The attributes compared when merging vertices.
///
/// Channels that are disabled or have the wrong length are not compared or updated.
struct Channels<'a> {
    positions: &'a [[f32; 3]],
    normals: Option<&'a [[f32; 3]]>,
    tex_coords: Vec<(usize, &'a [[f32; 2]])>,
    vertex_colors: Option<&'a [[u8; 4]]>,
    night_colors: Option<&'a [[u8; 4]]>,
    skin: Option<(&'a [[u8; 4]], &'a [[f32; 4]])>,
}

impl<'a> Channels<'a> {
    fn new(geometry: &'a Geometry) -> Self {
        let count = geometry.vertices.len();

        let normals = active(
            "normals",
            geometry.flags.normals(),
            &geometry.normals,
            count,
        );

        let tex_coords = (0..geometry.uv_channel_count())
            .filter_map(|i| {
                active("texture coordinates", true, &geometry.tex_coords[i], count)
                    .map(|uvs| (i, uvs))
            })
            .collect();

        let vertex_colors = active(
            "vertex colors",
            geometry.flags.prelit(),
            &geometry.vertex_colors,
            count,
        );

        // Empty night colors only indicate that the chunk was present.
        let night_colors = geometry
            .night_colors
            .as_deref()
            .filter(|c| !c.is_empty())
            .and_then(|c| active("night colors", true, c, count));

        let skin = geometry.skin.as_ref().and_then(|skin| {
            Some((
                active("bone indices", true, &skin.bone_indices, count)?,
                active("bone weights", true, &skin.weights, count)?,
            ))
        });

        Self {
            positions: &geometry.vertices,
            normals,
            tex_coords,
            vertex_colors,
            night_colors,
            skin,
        }
    }

    /// `true` if vertices `a` and `b` have identical values for all active channels.
    fn matches(&self, a: usize, b: usize) -> bool {
        self.positions[a] == self.positions[b]
            && self.normals.is_none_or(|n| n[a] == n[b])
            && self.tex_coords.iter().all(|(_, uvs)| uvs[a] == uvs[b])
            && self.vertex_colors.is_none_or(|c| c[a] == c[b])
            && self.night_colors.is_none_or(|c| c[a] == c[b])
            && self
                .skin
                .is_none_or(|(indices, weights)| indices[a] == indices[b] && weights[a] == weights[b])
    }
}

fn active<'a, T>(name: &str, enabled: bool, values: &'a [T], count: usize) -> Option<&'a [T]> {
    if !enabled {
        None
    } else if values.len() != count {
        warn!(
            "Skipped welding {name} with {} values for {count} vertices",
            values.len()
        );
        None
    } else {
        Some(values)
    }
}

/// Merge vertices with identical values for all active attributes.
///
/// Each vertex is merged into the first earlier vertex it matches exactly.
/// Split indices and face vertex indices are remapped to the merged vertices.
/// Material indices in faces are unchanged.
pub fn weld_vertices(geometry: &mut Geometry) {
    let channels = Channels::new(geometry);

    // The original index of each merged vertex.
    let mut unique: Vec<usize> = Vec::new();
    let remap: Vec<u32> = (0..channels.positions.len())
        .map(|i| {
            let index = match unique.iter().position(|u| channels.matches(*u, i)) {
                Some(index) => index,
                None => {
                    unique.push(i);
                    unique.len() - 1
                }
            };
            index as u32
        })
        .collect();

    let normals = channels.normals.map(|n| select(n, &unique));
    let tex_coords: Vec<_> = channels
        .tex_coords
        .iter()
        .map(|(i, uvs)| (*i, select(uvs, &unique)))
        .collect();
    let vertex_colors = channels.vertex_colors.map(|c| select(c, &unique));
    let night_colors = channels.night_colors.map(|c| select(c, &unique));
    let skin = channels
        .skin
        .map(|(indices, weights)| (select(indices, &unique), select(weights, &unique)));
    let vertices = select(channels.positions, &unique);

    geometry.vertex_count = vertices.len() as u32;
    geometry.vertices = vertices;
    if let Some(normals) = normals {
        geometry.normals = normals;
    }
    for (i, uvs) in tex_coords {
        geometry.tex_coords[i] = uvs;
    }
    if let Some(colors) = vertex_colors {
        geometry.vertex_colors = colors;
    }
    if let Some(colors) = night_colors {
        geometry.night_colors = Some(colors);
    }
    if let (Some(skin), Some((indices, weights))) = (geometry.skin.as_mut(), skin) {
        skin.bone_indices = indices;
        skin.weights = weights;
    }

    let mut invalid = 0;
    let mut update = |index: &mut u32| match remap.get(*index as usize) {
        Some(new_index) => *index = *new_index,
        None => invalid += 1,
    };
    for split in &mut geometry.splits {
        split.indices.iter_mut().for_each(&mut update);
    }
    for face in &mut geometry.faces {
        let [v0, v1, _, v2] = face;
        update(v0);
        update(v1);
        update(v2);
    }
    if invalid > 0 {
        warn!("Skipped remapping {invalid} out of range vertex indices");
    }
}

fn select<T: Copy>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|i| values[*i]).collect()
}
