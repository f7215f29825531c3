//! Chunk headers and the extension block protocol shared by every entity.
//!
//! # Overview
//! Every record in a binary stream starts with a [ChunkHeader] followed by exactly
//! [length](struct.ChunkHeader.html#structfield.length) bytes of payload.
//! Skipping the payload of any chunk, known or not, always lands on the next sibling header.
//!
//! Entities attach optional data in an extension chunk.
//! The payload of an extension chunk is a sequence of child chunks identified by [ChunkType].
//! See [read_extension] for how children are dispatched and skipped.
use std::io::{ErrorKind, Read, Seek, SeekFrom};

use binrw::{BinRead, BinResult, Endian, VecArgs};
use log::{trace, warn};

/// The size in bytes of a [ChunkHeader] in the stream.
pub const CHUNK_HEADER_SIZE: u64 = 12;

macro_rules! chunk_types {
    ($($(#[$attr:meta])* $name:ident = $value:expr),* $(,)?) => {
        /// The type tag of a chunk.
        ///
        /// Tags without a dedicated variant are preserved in [ChunkType::Unknown].
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum ChunkType {
            $($(#[$attr])* $name,)*
            Unknown(u32),
        }

        impl From<u32> for ChunkType {
            fn from(value: u32) -> Self {
                match value {
                    $($value => Self::$name,)*
                    value => Self::Unknown(value),
                }
            }
        }

        impl From<ChunkType> for u32 {
            fn from(value: ChunkType) -> Self {
                match value {
                    $(ChunkType::$name => $value,)*
                    ChunkType::Unknown(value) => value,
                }
            }
        }
    };
}

chunk_types! {
    /// The fixed layout data of the enclosing chunk.
    Struct = 0x1,
    String = 0x2,
    Extension = 0x3,
    Texture = 0x6,
    Material = 0x7,
    MaterialList = 0x8,
    FrameList = 0xE,
    Geometry = 0xF,
    Clump = 0x10,
    Light = 0x12,
    Atomic = 0x14,
    GeometryList = 0x1A,
    RightToRender = 0x1F,
    UvAnimDict = 0x2B,
    Morph = 0x105,
    SkyMipmap = 0x110,
    Skin = 0x116,
    Particles = 0x118,
    /// Bone hierarchy data attached to a frame.
    HAnim = 0x11E,
    MaterialEffects = 0x120,
    /// PS2 only collision plugin data.
    CollisionPlugin = 0x134,
    BinMesh = 0x50E,
    NativeData = 0x510,
    PipelineSet = 0x253F2F3,
    SpecularMaterial = 0x253F2F6,
    Effects2d = 0x253F2F8,
    NightVertexColor = 0x253F2F9,
    CollisionModel = 0x253F2FA,
    ReflectionMaterial = 0x253F2FC,
    MeshExtension = 0x253F2FD,
    /// The name of a frame.
    FrameName = 0x253F2FE,
}

/// The header preceding the payload of every chunk.
#[derive(Debug, BinRead, PartialEq, Eq, Clone, Copy)]
pub struct ChunkHeader {
    #[br(map = u32::into)]
    pub ty: ChunkType,
    /// The size of the payload in bytes.
    pub length: u32,
    /// The library version that wrote this chunk.
    pub version: u32,
}

impl ChunkHeader {
    /// Read a header and fail with [binrw::Error::BadMagic] if the type is not `expected`.
    pub fn read_expected<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        expected: ChunkType,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        let header = Self::read_options(reader, endian, ())?;
        if header.ty != expected {
            trace!("expected {expected:?} at {pos} but found {:?}", header.ty);
            return Err(binrw::Error::BadMagic {
                pos,
                found: Box::new(header.ty),
            });
        }
        Ok(header)
    }
}

/// Read an extension chunk and dispatch each child chunk to `handler`.
///
/// The handler returns `true` if it read the child's payload
/// and `false` if the payload should be skipped by its declared length.
/// A handler that leaves bytes unread is logged and the cursor moves to the end of the child.
/// Children that overrun the extension or handlers that overrun their child are errors.
pub fn read_extension<R, F>(reader: &mut R, endian: Endian, mut handler: F) -> BinResult<()>
where
    R: Read + Seek,
    F: FnMut(&mut R, ChunkHeader) -> BinResult<bool>,
{
    let header = ChunkHeader::read_expected(reader, endian, ChunkType::Extension)?;
    let end = reader.stream_position()? + header.length as u64;

    while reader.stream_position()? < end {
        let pos = reader.stream_position()?;
        if end - pos < CHUNK_HEADER_SIZE {
            return Err(truncated(format!(
                "{} bytes at {pos} are too small for a chunk header before the extension end {end}",
                end - pos
            )));
        }
        let child = ChunkHeader::read_options(reader, endian, ())?;
        let child_end = pos + CHUNK_HEADER_SIZE + child.length as u64;
        if child_end > end {
            return Err(binrw::Error::AssertFail {
                pos,
                message: format!(
                    "{:?} chunk ends at {child_end} past the extension end {end}",
                    child.ty
                ),
            });
        }

        trace!("{:?}: {:?}", child.ty, pos);
        if handler(reader, child)? {
            let after = reader.stream_position()?;
            if after > child_end {
                return Err(binrw::Error::AssertFail {
                    pos: after,
                    message: format!(
                        "{:?} chunk read {} bytes past its end",
                        child.ty,
                        after - child_end
                    ),
                });
            }
            if after < child_end {
                warn!(
                    "{:?} chunk at {pos} has {} unread bytes",
                    child.ty,
                    child_end - after
                );
            }
        }
        seek_to(reader, child_end)?;
    }

    Ok(())
}

/// Read a string chunk whose payload is the string bytes.
pub fn read_string_chunk<R: Read + Seek>(reader: &mut R, endian: Endian) -> BinResult<String> {
    let header = ChunkHeader::read_expected(reader, endian, ChunkType::String)?;
    read_string(reader, header.length as usize)
}

/// Read `length` bytes as a string ending at the first NUL byte if any.
pub(crate) fn read_string<R: Read + Seek>(reader: &mut R, length: usize) -> BinResult<String> {
    let bytes = read_bytes(reader, length)?;
    Ok(string_from_bytes(&bytes))
}

pub(crate) fn string_from_bytes(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

pub(crate) fn read_bytes<R: Read + Seek>(reader: &mut R, length: usize) -> BinResult<Vec<u8>> {
    ensure_remaining(reader, length as u64)?;
    let mut bytes = vec![0u8; length];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Read `count` tightly packed values.
///
/// `T` must have the same size in memory as in the stream like `u32` or `[f32; 3]`.
/// The remaining stream length is checked before allocating.
pub(crate) fn read_vec<T, R>(reader: &mut R, endian: Endian, count: usize) -> BinResult<Vec<T>>
where
    for<'a> T: BinRead<Args<'a> = ()> + 'static,
    R: Read + Seek,
{
    let size = (count as u64).checked_mul(std::mem::size_of::<T>() as u64);
    match size {
        Some(size) => ensure_remaining(reader, size)?,
        None => {
            return Err(truncated(format!(
                "{count} values of {} do not fit in the stream",
                std::any::type_name::<T>()
            )))
        }
    }
    Vec::<T>::read_options(reader, endian, VecArgs { count, inner: () })
}

/// Move the cursor forward by `count` bytes.
pub(crate) fn skip<R: Read + Seek>(reader: &mut R, count: u64) -> BinResult<()> {
    let pos = reader.stream_position()?;
    seek_to(reader, pos + count)
}

/// Move the cursor to the absolute position `pos` without passing the end of the stream.
pub(crate) fn seek_to<R: Read + Seek>(reader: &mut R, pos: u64) -> BinResult<()> {
    let len = stream_len(reader)?;
    if pos > len {
        return Err(truncated(format!(
            "seek to {pos} past the end of the stream at {len}"
        )));
    }
    reader.seek(SeekFrom::Start(pos))?;
    Ok(())
}

pub(crate) fn ensure_remaining<R: Read + Seek>(reader: &mut R, count: u64) -> BinResult<()> {
    let pos = reader.stream_position()?;
    let len = stream_len(reader)?;
    if pos.saturating_add(count) > len {
        return Err(truncated(format!(
            "read of {count} bytes at {pos} past the end of the stream at {len}"
        )));
    }
    Ok(())
}

fn stream_len<R: Seek>(reader: &mut R) -> BinResult<u64> {
    let pos = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;
    Ok(len)
}

fn truncated(message: String) -> binrw::Error {
    binrw::Error::Io(std::io::Error::new(ErrorKind::UnexpectedEof, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use hexlit::hex;

    use crate::test_utils::Writer;

    #[test]
    fn chunk_type_unknown_round_trip() {
        assert_eq!(ChunkType::Unknown(0x1234), ChunkType::from(0x1234));
        assert_eq!(0x1234u32, ChunkType::Unknown(0x1234).into());
        assert_eq!(ChunkType::NightVertexColor, ChunkType::from(0x253F2F9));
    }

    #[test]
    fn read_header() {
        let mut reader = Cursor::new(hex!(10000000 0x2C000000 FFFF0318));
        assert_eq!(
            ChunkHeader {
                ty: ChunkType::Clump,
                length: 44,
                version: 0x1803FFFF
            },
            ChunkHeader::read_le(&mut reader).unwrap()
        );
        assert_eq!(12, reader.position());
    }

    #[test]
    fn read_expected_mismatch() {
        let mut reader = Cursor::new(hex!(01000000 04000000 FFFF0318 00000000));
        let result = ChunkHeader::read_expected(&mut reader, Endian::Little, ChunkType::Clump);
        assert!(matches!(result, Err(binrw::Error::BadMagic { pos: 0, .. })));
    }

    /// A small xorshift generator so generated streams are the same on every run.
    struct Xorshift(u32);

    impl Xorshift {
        fn next(&mut self) -> u32 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 17;
            self.0 ^= self.0 << 5;
            self.0
        }
    }

    fn generated_chunks(seed: u32, count: usize) -> Vec<(u32, Vec<u8>)> {
        let known = [0x1, 0x3, 0x10, 0x50E, 0x116, 0x253F2F9];
        let mut rng = Xorshift(seed);
        (0..count)
            .map(|_| {
                let ty = match rng.next() % 3 {
                    0 => known[rng.next() as usize % known.len()],
                    _ => rng.next(),
                };
                let length = rng.next() % 64;
                let payload = (0..length).map(|_| rng.next() as u8).collect();
                (ty, payload)
            })
            .collect()
    }

    #[test]
    fn skip_chunks_by_length() {
        for seed in [1, 0x1234, 0xdeadbeef, 0x2545F491] {
            let chunks = generated_chunks(seed, 32);
            let mut writer = Writer::default();
            for (ty, payload) in &chunks {
                writer = writer.chunk((*ty).into(), Writer::default().bytes(payload));
            }
            let mut reader = Cursor::new(writer.finish());

            for (ty, payload) in &chunks {
                let header = ChunkHeader::read_le(&mut reader).unwrap();
                assert_eq!(ChunkType::from(*ty), header.ty);
                assert_eq!(payload.len() as u32, header.length);
                skip(&mut reader, header.length as u64).unwrap();
            }
            assert_eq!(reader.get_ref().len() as u64, reader.position());
        }
    }

    #[test]
    fn read_extension_skips_generated_children() {
        for seed in [7, 0xabcdef, 0x9E3779B9] {
            let chunks = generated_chunks(seed, 16);
            let mut children = Writer::default();
            for (ty, payload) in &chunks {
                children = children.chunk((*ty).into(), Writer::default().bytes(payload));
            }
            let bytes = Writer::default().extension(children).u32(0xcafe).finish();
            let mut reader = Cursor::new(bytes);

            let mut lengths = Vec::new();
            read_extension(&mut reader, Endian::Little, |_, header| {
                lengths.push(header.length as usize);
                Ok(false)
            })
            .unwrap();

            assert_eq!(
                chunks.iter().map(|(_, p)| p.len()).collect::<Vec<_>>(),
                lengths
            );
            assert_eq!(0xcafe, u32::read_le(&mut reader).unwrap());
        }
    }

    #[test]
    fn skip_past_end() {
        let mut reader = Cursor::new(vec![0u8; 4]);
        let result = skip(&mut reader, 5);
        assert!(matches!(result, Err(binrw::Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof));
    }

    #[test]
    fn read_extension_consumes_declared_length() {
        let bytes = Writer::default()
            .extension(
                Writer::default()
                    .chunk(ChunkType::Morph, Writer::default().u32(0))
                    .chunk(ChunkType::Unknown(0x999), Writer::default().bytes(&[1; 7]))
                    .chunk(ChunkType::Particles, Writer::default().u32(5)),
            )
            .u32(0xcafe)
            .finish();
        let mut reader = Cursor::new(bytes);

        let mut handled = Vec::new();
        read_extension(&mut reader, Endian::Little, |reader, header| {
            match header.ty {
                ChunkType::Particles => {
                    handled.push(u32::read_le(reader)?);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
        .unwrap();

        assert_eq!(vec![5], handled);
        assert_eq!(0xcafe, u32::read_le(&mut reader).unwrap());
    }

    #[test]
    fn read_extension_partial_handler() {
        let bytes = Writer::default()
            .extension(
                Writer::default()
                    .chunk(ChunkType::Particles, Writer::default().u32(1).u32(2))
                    .chunk(ChunkType::Morph, Writer::default().u32(3)),
            )
            .finish();
        let mut reader = Cursor::new(bytes);

        let mut values = Vec::new();
        read_extension(&mut reader, Endian::Little, |reader, _| {
            values.push(u32::read_le(reader)?);
            Ok(true)
        })
        .unwrap();

        // The unread value in the first child does not shift the second child.
        assert_eq!(vec![1, 3], values);
    }

    #[test]
    fn read_extension_handler_overrun() {
        let bytes = Writer::default()
            .extension(Writer::default().chunk(ChunkType::Particles, Writer::default().u32(1)))
            .u32(2)
            .finish();
        let mut reader = Cursor::new(bytes);

        let result = read_extension(&mut reader, Endian::Little, |reader, _| {
            u32::read_le(reader)?;
            u32::read_le(reader)?;
            Ok(true)
        });
        assert!(matches!(result, Err(binrw::Error::AssertFail { .. })));
    }

    #[test]
    fn read_extension_child_past_end() {
        // The child claims 8 bytes but the extension only has room for 4.
        let bytes = hex!(
            03000000 10000000 FFFF0318
            18010000 08000000 FFFF0318
            01000000 02000000
        );
        let mut reader = Cursor::new(bytes);
        let result = read_extension(&mut reader, Endian::Little, |_, _| Ok(false));
        assert!(matches!(result, Err(binrw::Error::AssertFail { pos: 12, .. })));
    }

    #[test]
    fn read_extension_header_past_end() {
        // 8 bytes remain in the extension but the stream continues after it.
        let bytes = hex!(
            03000000 08000000 FFFF0318
            01000000 02000000
            03000000 04000000
        );
        let mut reader = Cursor::new(bytes);
        let result = read_extension(&mut reader, Endian::Little, |_, _| Ok(false));
        assert!(matches!(result, Err(binrw::Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof));
        assert_eq!(12, reader.position());
    }

    #[test]
    fn read_string_stops_at_nul() {
        let mut reader = Cursor::new(hex!(02000000 08000000 FFFF0318 0x6E616D65 00000000));
        assert_eq!(
            "name",
            read_string_chunk(&mut reader, Endian::Little).unwrap()
        );
        assert_eq!(20, reader.position());
    }

    #[test]
    fn read_vec_checks_remaining() {
        let mut reader = Cursor::new(vec![0u8; 8]);
        let result = read_vec::<[f32; 3], _>(&mut reader, Endian::Little, 1);
        assert!(matches!(result, Err(binrw::Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof));
    }
}
