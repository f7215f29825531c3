//! The root of a `.dff` model file.
//!
//! # File Structure
//! A [Clump] stores its children in a fixed order.
//! Atomics appear after geometries even though they reference frames and geometries.
//!
//! | Chunk | Contents |
//! | --- | --- |
//! | struct | atomic, light, and camera counts |
//! | frame list | [Frame] transforms followed by [Frame] extensions |
//! | geometry list | [Geometry] |
//! | atomics | [Atomic] |
//! | lights | skipped |
//! | extension | skipped |
use std::{
    io::{Cursor, Read, Seek, SeekFrom},
    path::Path,
};

use binrw::{BinRead, BinResult, Endian};
use log::trace;

use crate::{
    atomic::Atomic,
    chunk::{read_extension, skip, ChunkHeader, ChunkType},
    error::ReadFileError,
    frame::Frame,
    geometry::Geometry,
    native::NativeDecoders,
};

/// The struct size for clumps with light and camera counts.
const CLUMP_STRUCT_SIZE_WITH_LIGHTS: u32 = 12;

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Clump {
    pub frames: Vec<Frame>,
    pub geometries: Vec<Geometry>,
    pub atomics: Vec<Atomic>,
}

impl Clump {
    /// Read a clump with no native decoders.
    /// Returns `None` if the stream does not start with a clump chunk.
    pub fn read<R: Read + Seek>(reader: &mut R) -> BinResult<Option<Self>> {
        Self::read_with(reader, NativeDecoders::default())
    }

    /// Read a clump and decode native data using `decoders`.
    /// Returns `None` if the stream does not start with a clump chunk.
    pub fn read_with<R: Read + Seek>(
        reader: &mut R,
        decoders: NativeDecoders,
    ) -> BinResult<Option<Self>> {
        let pos = reader.stream_position()?;
        let header = ChunkHeader::read_le(reader)?;
        reader.seek(SeekFrom::Start(pos))?;

        if header.ty != ChunkType::Clump {
            trace!("{:?} is not a clump", header.ty);
            return Ok(None);
        }

        Self::read_le_args(reader, decoders).map(Some)
    }

    /// Read from `path` using a fully buffered reader for performance.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        decoders: NativeDecoders,
    ) -> Result<Option<Self>, ReadFileError> {
        let bytes = std::fs::read(path).map_err(ReadFileError::from)?;
        Self::from_bytes(bytes, decoders)
    }

    /// Read from `bytes` using a fully buffered reader for performance.
    pub fn from_bytes<T: AsRef<[u8]>>(
        bytes: T,
        decoders: NativeDecoders,
    ) -> Result<Option<Self>, ReadFileError> {
        Self::read_with(&mut Cursor::new(bytes), decoders).map_err(Into::into)
    }

    /// Remove all frames, geometries, and atomics.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.geometries.clear();
        self.atomics.clear();
    }
}

impl BinRead for Clump {
    type Args<'a> = NativeDecoders<'a>;

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        decoders: Self::Args<'_>,
    ) -> BinResult<Self> {
        ChunkHeader::read_expected(reader, endian, ChunkType::Clump)?;

        let header = ChunkHeader::read_expected(reader, endian, ChunkType::Struct)?;
        let atomic_count = u32::read_options(reader, endian, ())?;
        let light_count = if header.length == CLUMP_STRUCT_SIZE_WITH_LIGHTS {
            let light_count = u32::read_options(reader, endian, ())?;
            // Camera count.
            skip(reader, 4)?;
            light_count
        } else {
            0
        };

        let frames = read_frame_list(reader, endian)?;

        ChunkHeader::read_expected(reader, endian, ChunkType::GeometryList)?;
        ChunkHeader::read_expected(reader, endian, ChunkType::Struct)?;
        let geometry_count = u32::read_options(reader, endian, ())?;
        let geometries = (0..geometry_count)
            .map(|_| Geometry::read_options(reader, endian, decoders))
            .collect::<BinResult<Vec<_>>>()?;

        let atomics = (0..atomic_count)
            .map(|_| Atomic::read_options(reader, endian, ()))
            .collect::<BinResult<Vec<_>>>()?;

        for _ in 0..light_count {
            let header = ChunkHeader::read_expected(reader, endian, ChunkType::Struct)?;
            skip(reader, header.length as u64)?;
            let header = ChunkHeader::read_expected(reader, endian, ChunkType::Light)?;
            skip(reader, header.length as u64)?;
        }

        // Collision models are not decoded.
        read_extension(reader, endian, |_, _| Ok(false))?;

        Ok(Self {
            frames,
            geometries,
            atomics,
        })
    }
}

fn read_frame_list<R: Read + Seek>(reader: &mut R, endian: Endian) -> BinResult<Vec<Frame>> {
    ChunkHeader::read_expected(reader, endian, ChunkType::FrameList)?;

    ChunkHeader::read_expected(reader, endian, ChunkType::Struct)?;
    let frame_count = u32::read_options(reader, endian, ())?;
    let mut frames = (0..frame_count)
        .map(|_| Frame::read_struct(reader, endian))
        .collect::<BinResult<Vec<_>>>()?;

    for frame in &mut frames {
        frame.read_extension(reader, endian)?;
    }

    Ok(frames)
}
