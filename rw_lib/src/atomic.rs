//! Atomics bind a [Frame](crate::frame::Frame) to a [Geometry](crate::geometry::Geometry).
use std::io::{Read, Seek};

use binrw::{BinRead, BinResult, Endian};

use crate::chunk::{read_extension, ChunkHeader, ChunkType};

#[derive(Debug, PartialEq, Clone)]
pub struct Atomic {
    /// The index into [frames](crate::clump::Clump#structfield.frames).
    pub frame_index: u32,
    /// The index into [geometries](crate::clump::Clump#structfield.geometries).
    pub geometry_index: u32,
    pub right_to_render: Option<RightToRender>,
    pub particles: Option<u32>,
    pub material_fx: Option<u32>,
    pub pipeline_set: Option<u32>,
}

/// The plugin that renders an [Atomic] or [Material](crate::material::Material).
#[derive(Debug, BinRead, PartialEq, Eq, Clone, Copy)]
pub struct RightToRender {
    pub plugin_id: u32,
    pub extra_data: u32,
}

#[derive(BinRead)]
struct AtomicStruct {
    frame_index: u32,
    // Constant flags.
    #[br(pad_after = 8)]
    geometry_index: u32,
}

impl BinRead for Atomic {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        ChunkHeader::read_expected(reader, endian, ChunkType::Atomic)?;

        ChunkHeader::read_expected(reader, endian, ChunkType::Struct)?;
        let AtomicStruct {
            frame_index,
            geometry_index,
        } = AtomicStruct::read_options(reader, endian, ())?;

        let mut atomic = Atomic {
            frame_index,
            geometry_index,
            right_to_render: None,
            particles: None,
            material_fx: None,
            pipeline_set: None,
        };

        read_extension(reader, endian, |reader, header| {
            match header.ty {
                ChunkType::RightToRender => {
                    atomic.right_to_render = Some(RightToRender::read_options(reader, endian, ())?);
                }
                ChunkType::Particles => {
                    atomic.particles = Some(u32::read_options(reader, endian, ())?);
                }
                ChunkType::MaterialEffects => {
                    atomic.material_fx = Some(u32::read_options(reader, endian, ())?);
                }
                ChunkType::PipelineSet => {
                    atomic.pipeline_set = Some(u32::read_options(reader, endian, ())?);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        Ok(atomic)
    }
}
