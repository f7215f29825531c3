//! A library for reading RenderWare binary stream model files.
//!
//! # Getting Started
//! Model files (`.dff`) contain a single [Clump](clump::Clump).
//!
//! ```rust no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rw_lib::{clump::Clump, native::NativeDecoders};
//!
//! match Clump::from_file("player.dff", NativeDecoders::default())? {
//!     Some(clump) => println!("{} geometries", clump.geometries.len()),
//!     None => println!("not a clump"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! Every record in a binary stream is a chunk with a type, a payload length, and a version.
//! Each entity has a Rust type and a [binrw::BinRead] implementation
//! that reads exactly the bytes of its chunk.
//! Optional data attached to an entity is stored in an extension chunk.
//! Unknown extension children are skipped by length, so newer files still parse.
//! See the [chunk] module for details.
//!
//! rw_lib only reads the structures in the file.
//! It does not validate higher level constraints like frame or geometry indices being in range
//! or reconstruct faces for native geometry.
//! These steps are performed by higher level libraries like rw_model.
//!
//! Platform specific native data is decoded by implementations of [native::NativeDecoder].
//! Native data for platforms without a decoder is logged and skipped.
pub mod atomic;
pub mod chunk;
pub mod clump;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod material;
pub mod native;
pub mod texture;

#[cfg(test)]
mod test_utils;
