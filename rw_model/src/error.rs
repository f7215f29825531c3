use rw_lib::error::ReadFileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadModelError {
    #[error("error reading clump")]
    Clump(#[from] ReadFileError),

    #[error("atomic {atomic} references frame {frame} but there are only {count} frames")]
    InvalidFrameIndex {
        atomic: usize,
        frame: u32,
        count: usize,
    },

    #[error("atomic {atomic} references geometry {geometry} but there are only {count} geometries")]
    InvalidGeometryIndex {
        atomic: usize,
        geometry: u32,
        count: usize,
    },

    #[error("frame {frame} references parent {parent} but there are only {count} frames")]
    InvalidParentIndex {
        frame: usize,
        parent: usize,
        count: usize,
    },

    #[error("frame {frame} is its own ancestor")]
    FrameCycle { frame: usize },
}
