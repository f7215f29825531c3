//! # rw_model
//! rw_model provides high level data access for clumps read by rw_lib.
//!
//! Native geometry from console exports does not store faces
//! and stores a separate vertex for each triangle corner.
//! Loading a model reconstructs the faces with [generate_faces]
//! and merges duplicate vertices with [weld_vertices]
//! so native and portable geometry can be processed the same way.
use std::path::Path;

use glam::Mat4;
use log::trace;
use rayon::prelude::*;
use rw_lib::{clump::Clump, geometry::Geometry, native::NativeDecoders};

pub use error::LoadModelError;
pub use topology::generate_faces;
pub use transform::{local_transform, world_transforms};
pub use weld::weld_vertices;

pub mod error;
mod topology;
mod transform;
mod weld;

/// A validated [Clump] with normalized geometry.
#[derive(Debug, PartialEq, Clone)]
pub struct Model {
    pub clump: Clump,
    /// The model space transform for each frame in
    /// [frames](rw_lib::clump::Clump#structfield.frames).
    pub world_transforms: Vec<Mat4>,
}

impl Model {
    /// Validate `clump`, normalize native geometry, and compute frame transforms.
    #[tracing::instrument(skip_all)]
    pub fn from_clump(mut clump: Clump) -> Result<Self, LoadModelError> {
        validate_atomics(&clump)?;
        let world_transforms = world_transforms(&clump.frames)?;

        clump.geometries.par_iter_mut().for_each(normalize_geometry);

        Ok(Self {
            clump,
            world_transforms,
        })
    }

    /// The model space transform and geometry for each atomic.
    pub fn instances(&self) -> impl Iterator<Item = (Mat4, &Geometry)> + '_ {
        self.clump.atomics.iter().filter_map(|atomic| {
            Some((
                *self.world_transforms.get(atomic.frame_index as usize)?,
                self.clump.geometries.get(atomic.geometry_index as usize)?,
            ))
        })
    }
}

/// Load a model from a `.dff` file.
/// Returns `None` if the file does not contain a clump.
#[tracing::instrument(skip_all)]
pub fn load_model<P: AsRef<Path>>(
    path: P,
    decoders: NativeDecoders,
) -> Result<Option<Model>, LoadModelError> {
    let path = path.as_ref();
    match Clump::from_file(path, decoders)? {
        Some(clump) => Model::from_clump(clump).map(Some),
        None => {
            trace!("{path:?} does not contain a clump");
            Ok(None)
        }
    }
}

/// Generate faces for native geometry without faces and merge duplicate vertices.
/// Portable geometry is unchanged.
pub fn normalize_geometry(geometry: &mut Geometry) {
    if !geometry.is_native() {
        return;
    }

    if geometry.faces.is_empty() {
        generate_faces(geometry);
    }
    weld_vertices(geometry);
}

fn validate_atomics(clump: &Clump) -> Result<(), LoadModelError> {
    for (i, atomic) in clump.atomics.iter().enumerate() {
        if atomic.frame_index as usize >= clump.frames.len() {
            return Err(LoadModelError::InvalidFrameIndex {
                atomic: i,
                frame: atomic.frame_index,
                count: clump.frames.len(),
            });
        }
        if atomic.geometry_index as usize >= clump.geometries.len() {
            return Err(LoadModelError::InvalidGeometryIndex {
                atomic: i,
                geometry: atomic.geometry_index,
                count: clump.geometries.len(),
            });
        }
    }
    Ok(())
}
