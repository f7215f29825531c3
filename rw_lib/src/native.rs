//! Strategies for platform specific geometry and skin data.
//!
//! Console exports replace the portable vertex and face arrays of a [Geometry]
//! with a native data chunk. The platform tag is stored 12 bytes into the chunk payload.
//! Decoding the native layouts is left to implementations of [NativeDecoder].
use std::io::{Read, Seek, SeekFrom};

use binrw::{BinRead, BinResult, Endian};
use log::warn;

use crate::{
    chunk::{read_bytes, ChunkHeader},
    geometry::Geometry,
};

pub const PLATFORM_PS2: u32 = 4;
pub const PLATFORM_XBOX: u32 = 5;

/// The offset of the platform tag from the start of a native chunk's payload.
const PLATFORM_OFFSET: u64 = 12;

/// Decodes native data into the same [Geometry] fields the portable layout uses.
///
/// The counts and flags from the geometry struct are already set when a decoder runs.
/// Per vertex arrays should have [vertex_count](Geometry#structfield.vertex_count) elements.
pub trait NativeDecoder: Sync {
    /// Decode a native data chunk payload.
    fn read_geometry(&self, data: &[u8], geometry: &mut Geometry) -> BinResult<()>;

    /// Decode a native skin chunk payload and set [skin](Geometry#structfield.skin).
    fn read_skin(&self, data: &[u8], geometry: &mut Geometry) -> BinResult<()>;
}

/// The available [NativeDecoder] for each supported platform.
///
/// The default has no decoders, so native data is logged and skipped.
#[derive(Clone, Copy, Default)]
pub struct NativeDecoders<'a> {
    pub ps2: Option<&'a dyn NativeDecoder>,
    pub xbox: Option<&'a dyn NativeDecoder>,
}

impl<'a> NativeDecoders<'a> {
    pub fn get(&self, platform: u32) -> Option<&'a dyn NativeDecoder> {
        match platform {
            PLATFORM_PS2 => self.ps2,
            PLATFORM_XBOX => self.xbox,
            _ => None,
        }
    }
}

impl std::fmt::Debug for NativeDecoders<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeDecoders")
            .field("ps2", &self.ps2.is_some())
            .field("xbox", &self.xbox.is_some())
            .finish()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum NativeChunk {
    Geometry,
    Skin,
}

/// Read the platform tag without moving the cursor.
/// Returns `None` if the payload is too small to contain a tag.
pub(crate) fn peek_platform<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
    header: &ChunkHeader,
) -> BinResult<Option<u32>> {
    if (header.length as u64) < PLATFORM_OFFSET + 4 {
        return Ok(None);
    }

    let pos = reader.stream_position()?;
    reader.seek(SeekFrom::Current(PLATFORM_OFFSET as i64))?;
    let platform = u32::read_options(reader, endian, ())?;
    reader.seek(SeekFrom::Start(pos))?;
    Ok(Some(platform))
}

/// Decode the native chunk payload at the cursor with the decoder for its platform.
///
/// Returns `false` without reading anything if the platform is not supported
/// so the extension skips the payload.
pub(crate) fn read_native<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
    header: &ChunkHeader,
    decoders: NativeDecoders,
    kind: NativeChunk,
    geometry: &mut Geometry,
) -> BinResult<bool> {
    let Some(platform) = peek_platform(reader, endian, header)? else {
        warn!(
            "{:?} chunk with {} bytes is too small for a platform",
            header.ty, header.length
        );
        return Ok(false);
    };

    if kind == NativeChunk::Geometry {
        geometry.native_platform = Some(platform);
    }

    match decoders.get(platform) {
        Some(decoder) => {
            let data = read_bytes(reader, header.length as usize)?;
            match kind {
                NativeChunk::Geometry => decoder.read_geometry(&data, geometry)?,
                NativeChunk::Skin => decoder.read_skin(&data, geometry)?,
            }
            Ok(true)
        }
        None => {
            warn!("Unsupported native {kind:?} platform {platform}");
            Ok(false)
        }
    }
}
