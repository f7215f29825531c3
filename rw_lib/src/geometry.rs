//! Vertex data, faces, and materials for a single mesh.
//!
//! # Overview
//! A [Geometry] stores either portable vertex arrays or native platform data.
//! Portable geometry stores explicit faces with the material index in the third slot.
//! Native geometry stores its data in a native data chunk in the extension
//! and only stores per material index runs in the [Split] list.
//!
//! | Field | Portable | Native |
//! | --- | --- | --- |
//! | [vertices](Geometry#structfield.vertices) | struct | [NativeDecoder](crate::native::NativeDecoder) |
//! | [faces](Geometry#structfield.faces) | struct | generated from [splits](Geometry#structfield.splits) |
//! | [skin](Geometry#structfield.skin) | skin chunk | [NativeDecoder](crate::native::NativeDecoder) |
use std::io::{ErrorKind, Read, Seek};

use bilge::prelude::*;
use binrw::{BinRead, BinResult, Endian, VecArgs};

use crate::{
    chunk::{
        ensure_remaining, read_extension, read_vec, skip, string_from_bytes, ChunkHeader,
        ChunkType,
    },
    material::Material,
    native::{read_native, NativeChunk, NativeDecoders},
};

/// The maximum number of texture coordinate channels.
pub const MAX_UV_CHANNELS: usize = 8;

/// Library versions with 12 bytes of lighting data after the geometry struct.
const LEGACY_LIGHT_VERSIONS: [u32; 5] = [0x302, 0x304, 0x310, 0x0800FFFF, 0x0C02FFFF];

#[bitsize(16)]
#[derive(DebugBits, FromBits, BinRead, PartialEq, Clone, Copy)]
#[br(map = u16::into)]
pub struct GeometryFlags {
    pub tristrip: bool,
    pub positions: bool,
    /// A single texture coordinate channel.
    pub textured: bool,
    /// Vertex colors.
    pub prelit: bool,
    pub normals: bool,
    pub light: bool,
    pub modulate_material_color: bool,
    /// Up to [MAX_UV_CHANNELS] texture coordinate channels.
    pub textured2: bool,
    pub unk: u8,
}

impl Default for GeometryFlags {
    fn default() -> Self {
        Self::from(0u16)
    }
}

/// The primitive topology of every [Split] in a [Geometry].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum FaceType {
    #[default]
    TriangleList,
    TriangleStrip,
}

impl From<u32> for FaceType {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::TriangleStrip,
            _ => Self::TriangleList,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Geometry {
    pub flags: GeometryFlags,
    /// The stream value for the number of texture coordinate channels.
    /// See [Geometry::uv_channel_count] for the channels actually stored.
    pub num_uvs: u8,
    /// `true` if vertex and face data is stored in a native data chunk.
    pub native: bool,
    /// The number of vertices for each per vertex array.
    /// Native data decoders use this to size the arrays they fill in.
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// RGBA vertex colors.
    pub vertex_colors: Vec<[u8; 4]>,
    pub tex_coords: [Vec<[f32; 2]>; MAX_UV_CHANNELS],
    /// Triangles as `[vertex1, vertex0, material, vertex2]`.
    pub faces: Vec<[u32; 4]>,
    /// Center and radius.
    pub bounding_sphere: [f32; 4],
    pub materials: Vec<Material>,

    pub face_type: FaceType,
    /// The total index count of all splits.
    pub index_count: u32,
    pub splits: Vec<Split>,

    pub native_platform: Option<u32>,
    pub mesh_extension: Option<MeshExtension>,
    pub night_colors: Option<Vec<[u8; 4]>>,
    pub morph: bool,
    pub skin: Option<Skin>,
}

/// The vertex indices using a single material.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Split {
    pub material_index: u32,
    pub indices: Vec<u32>,
}

/// An additional mesh used by some models for effects like reflections.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct MeshExtension {
    pub unk: u32,
    pub vertices: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub vertex_colors: Vec<[u8; 4]>,
    pub faces: Vec<[u16; 3]>,
    /// The material index for each face.
    pub material_assignments: Vec<u16>,
    pub materials: Vec<MeshExtensionMaterial>,
}

#[derive(Debug, BinRead, PartialEq, Clone)]
pub struct MeshExtensionMaterial {
    #[br(map = |x: [u8; 32]| string_from_bytes(&x))]
    pub texture_name: String,
    #[br(map = |x: [u8; 32]| string_from_bytes(&x))]
    pub mask_name: String,
    pub unks: [f32; 3],
}

const MESH_EXTENSION_MATERIAL_SIZE: u64 = 76;

/// Skinning data for each vertex.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Skin {
    pub bone_count: u8,
    pub unk1: u8,
    pub unk2: u8,
    pub special_indices: Vec<u8>,
    pub bone_indices: Vec<[u8; 4]>,
    pub weights: Vec<[f32; 4]>,
    /// Column-major 4x4 inverse bind matrices for each bone.
    pub inverse_bind_matrices: Vec<[[f32; 4]; 4]>,
}

#[derive(BinRead)]
struct GeometryStruct {
    flags: GeometryFlags,
    num_uvs: u8,
    #[br(map = |x: u8| x != 0)]
    native: bool,
    triangle_count: u32,
    // Morph target count.
    #[br(pad_after = 4)]
    vertex_count: u32,
}

impl Geometry {
    pub fn is_native(&self) -> bool {
        self.native
    }

    /// The number of texture coordinate channels enabled by the flags.
    pub fn uv_channel_count(&self) -> usize {
        if self.flags.textured2() {
            (self.num_uvs as usize).min(MAX_UV_CHANNELS)
        } else if self.flags.textured() {
            1
        } else {
            0
        }
    }
}

impl BinRead for Geometry {
    type Args<'a> = NativeDecoders<'a>;

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        decoders: Self::Args<'_>,
    ) -> BinResult<Self> {
        ChunkHeader::read_expected(reader, endian, ChunkType::Geometry)?;

        let header = ChunkHeader::read_expected(reader, endian, ChunkType::Struct)?;
        let GeometryStruct {
            flags,
            num_uvs,
            native,
            triangle_count,
            vertex_count,
        } = GeometryStruct::read_options(reader, endian, ())?;

        if LEGACY_LIGHT_VERSIONS.contains(&header.version) {
            skip(reader, 12)?;
        }

        let mut geometry = Geometry {
            flags,
            num_uvs,
            native,
            vertex_count,
            triangle_count,
            ..Default::default()
        };
        let vertex_count = vertex_count as usize;

        if !native {
            if flags.prelit() {
                geometry.vertex_colors = read_vec(reader, endian, vertex_count)?;
            }

            if flags.textured2() {
                if num_uvs as usize > MAX_UV_CHANNELS {
                    return Err(binrw::Error::AssertFail {
                        pos: reader.stream_position()?,
                        message: format!(
                            "{num_uvs} texture coordinate channels exceed the maximum of {MAX_UV_CHANNELS}"
                        ),
                    });
                }
                for channel in geometry.tex_coords.iter_mut().take(num_uvs as usize) {
                    *channel = read_vec(reader, endian, vertex_count)?;
                }
            } else if flags.textured() {
                geometry.tex_coords[0] = read_vec(reader, endian, vertex_count)?;
            }

            let faces: Vec<[u16; 4]> = read_vec(reader, endian, triangle_count as usize)?;
            geometry.faces = faces.into_iter().map(|f| f.map(u32::from)).collect();
        }

        // There is only ever a single morph target.
        geometry.bounding_sphere = <[f32; 4]>::read_options(reader, endian, ())?;
        // The has positions and has normals values are not reliable.
        // Positions are always present and normals use the flags instead.
        <[u32; 2]>::read_options(reader, endian, ())?;

        if !native {
            geometry.vertices = read_vec(reader, endian, vertex_count)?;
            if flags.normals() {
                geometry.normals = read_vec(reader, endian, vertex_count)?;
            }
        }

        geometry.materials = read_material_list(reader, endian)?;

        read_extension(reader, endian, |reader, header| {
            match header.ty {
                ChunkType::BinMesh => read_bin_mesh(reader, endian, &mut geometry)?,
                ChunkType::NativeData => {
                    return read_native(
                        reader,
                        endian,
                        &header,
                        decoders,
                        NativeChunk::Geometry,
                        &mut geometry,
                    );
                }
                ChunkType::MeshExtension => {
                    geometry.mesh_extension =
                        Some(MeshExtension::read_options(reader, endian, ())?);
                }
                ChunkType::NightVertexColor => {
                    read_night_colors(reader, endian, &header, &mut geometry)?
                }
                ChunkType::Morph => {
                    // Always 0.
                    u32::read_options(reader, endian, ())?;
                    geometry.morph = true;
                }
                ChunkType::Skin => {
                    if native {
                        return read_native(
                            reader,
                            endian,
                            &header,
                            decoders,
                            NativeChunk::Skin,
                            &mut geometry,
                        );
                    } else {
                        geometry.skin = Some(Skin::read_options(reader, endian, vertex_count)?);
                    }
                }
                // Collision plugin and 2D effects are not used.
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        Ok(geometry)
    }
}

fn read_material_list<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
) -> BinResult<Vec<Material>> {
    ChunkHeader::read_expected(reader, endian, ChunkType::MaterialList)?;

    ChunkHeader::read_expected(reader, endian, ChunkType::Struct)?;
    let count = u32::read_options(reader, endian, ())?;
    // Material indices are always -1.
    skip(reader, count as u64 * 4)?;

    (0..count)
        .map(|_| Material::read_options(reader, endian, ()))
        .collect()
}

fn read_bin_mesh<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
    geometry: &mut Geometry,
) -> BinResult<()> {
    geometry.face_type = u32::read_options(reader, endian, ())?.into();
    let split_count = u32::read_options(reader, endian, ())?;
    geometry.index_count = u32::read_options(reader, endian, ())?;

    let native = geometry.native;
    geometry.splits = (0..split_count)
        .map(|_| {
            let count = u32::read_options(reader, endian, ())? as usize;
            let material_index = u32::read_options(reader, endian, ())?;
            let indices = if native {
                // Native data decoders fill in the indices.
                zeroed_indices(count)?
            } else {
                read_vec(reader, endian, count)?
            };
            Ok(Split {
                material_index,
                indices,
            })
        })
        .collect::<BinResult<Vec<_>>>()?;

    Ok(())
}

fn zeroed_indices(count: usize) -> BinResult<Vec<u32>> {
    let mut indices = Vec::new();
    indices.try_reserve_exact(count).map_err(|e| {
        binrw::Error::Io(std::io::Error::new(
            ErrorKind::OutOfMemory,
            format!("failed to allocate {count} split indices: {e}"),
        ))
    })?;
    indices.resize(count, 0);
    Ok(indices)
}

fn read_night_colors<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
    header: &ChunkHeader,
    geometry: &mut Geometry,
) -> BinResult<()> {
    let has_colors = u32::read_options(reader, endian, ())?;
    let length = header.length.saturating_sub(4) as u64;

    if geometry.night_colors.as_ref().is_some_and(|c| !c.is_empty()) {
        // Native data already contains the colors.
        skip(reader, length)?;
    } else if has_colors != 0 {
        geometry.night_colors = Some(read_vec(reader, endian, length as usize / 4)?);
    } else {
        skip(reader, length)?;
        geometry.night_colors = Some(Vec::new());
    }
    Ok(())
}

impl BinRead for MeshExtension {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let unk = u32::read_options(reader, endian, ())?;
        if unk == 0 {
            return Ok(Self::default());
        }

        skip(reader, 4)?;
        let vertex_count = u32::read_options(reader, endian, ())? as usize;
        skip(reader, 12)?;
        let face_count = u32::read_options(reader, endian, ())? as usize;
        skip(reader, 8)?;
        let material_count = u32::read_options(reader, endian, ())?;
        skip(reader, 16)?;

        let vertices = read_vec(reader, endian, vertex_count)?;
        let tex_coords = read_vec(reader, endian, vertex_count)?;
        let vertex_colors = read_vec(reader, endian, vertex_count)?;
        let faces = read_vec(reader, endian, face_count)?;
        let material_assignments = read_vec(reader, endian, face_count)?;

        ensure_remaining(reader, material_count as u64 * MESH_EXTENSION_MATERIAL_SIZE)?;
        let materials = Vec::read_options(
            reader,
            endian,
            VecArgs {
                count: material_count as usize,
                inner: (),
            },
        )?;

        Ok(Self {
            unk,
            vertices,
            tex_coords,
            vertex_colors,
            faces,
            material_assignments,
            materials,
        })
    }
}

impl BinRead for Skin {
    /// The vertex count of the geometry.
    type Args<'a> = usize;

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        vertex_count: Self::Args<'_>,
    ) -> BinResult<Self> {
        let [bone_count, special_index_count, unk1, unk2] =
            <[u8; 4]>::read_options(reader, endian, ())?;

        let special_indices = read_vec(reader, endian, special_index_count as usize)?;
        let bone_indices = read_vec(reader, endian, vertex_count)?;
        let weights = read_vec(reader, endian, vertex_count)?;

        let inverse_bind_matrices = (0..bone_count)
            .map(|_| {
                if special_index_count == 0 {
                    // 0xDEADDEAD
                    skip(reader, 4)?;
                }
                <[[f32; 4]; 4]>::read_options(reader, endian, ())
            })
            .collect::<BinResult<Vec<_>>>()?;

        if special_index_count != 0 {
            skip(reader, 12)?;
        }

        Ok(Self {
            bone_count,
            unk1,
            unk2,
            special_indices,
            bone_indices,
            weights,
            inverse_bind_matrices,
        })
    }
}
