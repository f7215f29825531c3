//! Texture references used by a [Material](crate::material::Material)
//! and [MatFx](crate::material::MatFx).
//!
//! Textures only store names. The image data lives in a separate texture dictionary.
use std::io::{Read, Seek};

use bilge::prelude::*;
use binrw::{BinRead, BinResult, Endian};

use crate::chunk::{read_extension, read_string_chunk, ChunkHeader, ChunkType};

/// Texture sampler filtering and addressing modes.
#[bitsize(16)]
#[derive(DebugBits, FromBits, BinRead, PartialEq, Clone, Copy)]
#[br(map = u16::into)]
pub struct TextureFilterFlags {
    pub filter_mode: u8,
    pub address_u: u4,
    pub address_v: u4,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Texture {
    pub filter_flags: TextureFilterFlags,
    pub name: String,
    pub mask_name: String,
    /// `true` if the extension contains a sky mipmap chunk.
    pub sky_mipmap: bool,
}

#[derive(BinRead)]
struct TextureStruct {
    #[br(pad_after = 2)]
    filter_flags: TextureFilterFlags,
}

impl BinRead for Texture {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        ChunkHeader::read_expected(reader, endian, ChunkType::Texture)?;

        ChunkHeader::read_expected(reader, endian, ChunkType::Struct)?;
        let TextureStruct { filter_flags } = TextureStruct::read_options(reader, endian, ())?;

        let name = read_string_chunk(reader, endian)?;
        let mask_name = read_string_chunk(reader, endian)?;

        let mut sky_mipmap = false;
        read_extension(reader, endian, |_, header| {
            if header.ty == ChunkType::SkyMipmap {
                // Only the presence matters.
                sky_mipmap = true;
            }
            Ok(false)
        })?;

        Ok(Self {
            filter_flags,
            name,
            mask_name,
            sky_mipmap,
        })
    }
}
