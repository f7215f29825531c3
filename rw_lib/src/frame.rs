//! Transform hierarchy nodes in a [Clump](crate::clump::Clump).
//!
//! The frame list stores every frame transform before every frame extension,
//! so reading a frame takes two passes over the list.
use std::io::{Read, Seek};

use binrw::{BinRead, BinResult, Endian};

use crate::chunk::{read_extension, read_string, read_vec, ChunkType};

#[derive(Debug, PartialEq, Clone)]
pub struct Frame {
    /// Row-major 3x3 rotation.
    pub rotation: [f32; 9],
    pub position: [f32; 3],
    /// The index of the parent frame or `None` for root frames.
    pub parent_index: Option<usize>,
    pub name: Option<String>,
    pub hanim: Option<HAnim>,
}

/// Bone hierarchy data for skinned models.
#[derive(Debug, PartialEq, Clone)]
pub struct HAnim {
    pub unk1: u32,
    pub bone_id: i32,
    /// Only present for frames with bones.
    pub unks: Option<[u32; 2]>,
    pub bones: Vec<HAnimBone>,
}

#[derive(Debug, BinRead, PartialEq, Eq, Clone, Copy)]
pub struct HAnimBone {
    pub id: i32,
    pub number: u32,
    pub ty: u32,
}

#[derive(BinRead)]
struct FrameStruct {
    rotation: [f32; 9],
    position: [f32; 3],
    // Matrix creation flags.
    #[br(pad_after = 4, map = |x: i32| x.try_into().ok())]
    parent_index: Option<usize>,
}

impl Frame {
    /// Read the transform from the frame list struct.
    pub fn read_struct<R: Read + Seek>(reader: &mut R, endian: Endian) -> BinResult<Self> {
        let FrameStruct {
            rotation,
            position,
            parent_index,
        } = FrameStruct::read_options(reader, endian, ())?;

        Ok(Self {
            rotation,
            position,
            parent_index,
            name: None,
            hanim: None,
        })
    }

    /// Read the name and bone hierarchy from the frame's extension.
    pub fn read_extension<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        endian: Endian,
    ) -> BinResult<()> {
        read_extension(reader, endian, |reader, header| {
            match header.ty {
                ChunkType::FrameName => {
                    self.name = Some(read_string(reader, header.length as usize)?);
                }
                ChunkType::HAnim => {
                    self.hanim = Some(HAnim::read_options(reader, endian, ())?);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })
    }
}

impl BinRead for HAnim {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let unk1 = u32::read_options(reader, endian, ())?;
        let bone_id = i32::read_options(reader, endian, ())?;
        let bone_count = u32::read_options(reader, endian, ())?;
        let unks = if bone_count != 0 {
            Some(<[u32; 2]>::read_options(reader, endian, ())?)
        } else {
            None
        };
        let bones = read_vec(reader, endian, bone_count as usize)?;

        Ok(Self {
            unk1,
            bone_id,
            unks,
            bones,
        })
    }
}
