//! Builders for small binary streams and log capture used in tests.
use std::{cell::Cell, sync::Once};

use crate::chunk::ChunkType;

/// The library version used for chunks written by [Writer].
pub const TEST_VERSION: u32 = 0x1803FFFF;

/// Appends little endian values and nested chunks to a byte buffer.
#[derive(Debug, Default)]
pub struct Writer(Vec<u8>);

impl Writer {
    pub fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn f32s(mut self, values: &[f32]) -> Self {
        for value in values {
            self.0.extend_from_slice(&value.to_le_bytes());
        }
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn chunk(self, ty: ChunkType, payload: Writer) -> Self {
        self.chunk_version(ty, TEST_VERSION, payload)
    }

    pub fn chunk_version(self, ty: ChunkType, version: u32, payload: Writer) -> Self {
        let length = payload.0.len() as u32;
        self.u32(ty.into())
            .u32(length)
            .u32(version)
            .bytes(&payload.0)
    }

    pub fn extension(self, children: Writer) -> Self {
        self.chunk(ChunkType::Extension, children)
    }

    pub fn empty_extension(self) -> Self {
        self.extension(Writer::default())
    }

    /// A NUL padded string chunk.
    pub fn string(self, value: &str) -> Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.resize((bytes.len() + 4) & !3, 0);
        self.chunk(ChunkType::String, Writer::default().bytes(&bytes))
    }

    /// A texture chunk with default filtering and no mask.
    pub fn texture(self, name: &str) -> Self {
        self.chunk(
            ChunkType::Texture,
            Writer::default()
                .chunk(ChunkType::Struct, Writer::default().u16(0x1106).u16(1))
                .string(name)
                .string("")
                .empty_extension(),
        )
    }

    /// A material list with `count` untextured white materials.
    pub fn material_list(self, count: u32) -> Self {
        let mut payload = Writer::default().u32(count);
        for _ in 0..count {
            payload = payload.i32(-1);
        }
        let mut list = Writer::default().chunk(ChunkType::Struct, payload);
        for _ in 0..count {
            list = list.chunk(
                ChunkType::Material,
                Writer::default()
                    .chunk(
                        ChunkType::Struct,
                        Writer::default()
                            .u32(0)
                            .bytes(&[255; 4])
                            .u32(0)
                            .i32(0)
                            .f32s(&[1.0, 1.0, 1.0]),
                    )
                    .empty_extension(),
            );
        }
        self.chunk(ChunkType::MaterialList, list)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn finish(self) -> Vec<u8> {
        self.0
    }
}

thread_local! {
    static WARNINGS: Cell<usize> = const { Cell::new(0) };
}

/// Counts warnings logged on the current thread.
struct CountingLogger;

impl log::Log for CountingLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            WARNINGS.with(|w| w.set(w.get() + 1));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CountingLogger = CountingLogger;
static INIT: Once = Once::new();

/// Run `f` and return its result and the number of warnings it logged.
///
/// Tests run on separate threads, so counts never mix between tests.
pub fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
    INIT.call_once(|| {
        // Only fails if another logger is already installed.
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Warn);
    });

    let before = WARNINGS.with(Cell::get);
    let result = f();
    let after = WARNINGS.with(Cell::get);
    (result, after - before)
}
