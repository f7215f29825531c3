//! Surface properties for the faces of a [Geometry](crate::geometry::Geometry).
//!
//! Materials are stored in a material list chunk after the geometry data.
//! The material slot of each face and mesh split indexes into this list.
use std::io::{Read, Seek};

use binrw::{BinRead, BinResult, Endian};
use log::warn;

use crate::{
    atomic::RightToRender,
    chunk::{read_extension, read_string, skip, ChunkHeader, ChunkType},
    texture::Texture,
};

#[derive(Debug, PartialEq, Clone)]
pub struct Material {
    pub flags: u32,
    /// RGBA color.
    pub color: [u8; 4],
    pub unk: u32,
    /// Ambient, specular, and diffuse lighting coefficients.
    pub surface_properties: [f32; 3],
    pub texture: Option<Texture>,
    pub right_to_render: Option<RightToRender>,
    pub mat_fx: Option<MatFx>,
    pub reflection: Option<ReflectionMaterial>,
    pub specular: Option<SpecularMaterial>,
}

#[derive(BinRead)]
struct MaterialStruct {
    flags: u32,
    color: [u8; 4],
    unk: u32,
    #[br(map = |x: i32| x != 0)]
    has_texture: bool,
    surface_properties: [f32; 3],
}

/// Material effects selected by a type tag.
#[derive(Debug, PartialEq, Clone)]
pub enum MatFx {
    BumpMap {
        coefficient: f32,
        texture1: Option<Texture>,
        texture2: Option<Texture>,
    },
    EnvMap {
        coefficient: f32,
        texture1: Option<Texture>,
        texture2: Option<Texture>,
    },
    BumpEnvMap {
        bump_coefficient: f32,
        bump_texture: Option<Texture>,
        env_coefficient: f32,
        env_texture: Option<Texture>,
    },
    Dual {
        src_blend: u32,
        dst_blend: u32,
        texture: Option<Texture>,
    },
    UvTransform,
    DualUvTransform,
    /// An effect type with no known layout.
    /// The remaining payload is skipped by the enclosing extension.
    Unknown(u32),
}

#[derive(Debug, BinRead, PartialEq, Clone, Copy)]
pub struct ReflectionMaterial {
    pub channel_amount: [f32; 4],
    #[br(pad_after = 4)]
    pub intensity: f32,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SpecularMaterial {
    pub level: f32,
    pub texture_name: String,
}

/// Read a `u32` presence flag followed by a texture if the flag is nonzero.
fn read_opt_texture<R: Read + Seek>(reader: &mut R, endian: Endian) -> BinResult<Option<Texture>> {
    let has_texture = u32::read_options(reader, endian, ())?;
    if has_texture != 0 {
        Texture::read_options(reader, endian, ()).map(Some)
    } else {
        Ok(None)
    }
}

impl BinRead for MatFx {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let ty = u32::read_options(reader, endian, ())?;
        match ty {
            1 | 2 => {
                // The effect type is repeated.
                skip(reader, 4)?;
                let coefficient = f32::read_options(reader, endian, ())?;
                let texture1 = read_opt_texture(reader, endian)?;
                let texture2 = read_opt_texture(reader, endian)?;
                skip(reader, 4)?;
                if ty == 1 {
                    Ok(Self::BumpMap {
                        coefficient,
                        texture1,
                        texture2,
                    })
                } else {
                    Ok(Self::EnvMap {
                        coefficient,
                        texture1,
                        texture2,
                    })
                }
            }
            3 => {
                skip(reader, 4)?;
                let bump_coefficient = f32::read_options(reader, endian, ())?;
                let bump_texture = read_opt_texture(reader, endian)?;
                // Unused second bump texture flag and the env map effect type.
                skip(reader, 8)?;
                let env_coefficient = f32::read_options(reader, endian, ())?;
                // Unused first env map texture flag.
                skip(reader, 4)?;
                let env_texture = read_opt_texture(reader, endian)?;
                Ok(Self::BumpEnvMap {
                    bump_coefficient,
                    bump_texture,
                    env_coefficient,
                    env_texture,
                })
            }
            4 => {
                skip(reader, 4)?;
                let src_blend = u32::read_options(reader, endian, ())?;
                let dst_blend = u32::read_options(reader, endian, ())?;
                let texture = read_opt_texture(reader, endian)?;
                skip(reader, 4)?;
                Ok(Self::Dual {
                    src_blend,
                    dst_blend,
                    texture,
                })
            }
            5 => {
                skip(reader, 8)?;
                Ok(Self::UvTransform)
            }
            6 => Ok(Self::DualUvTransform),
            _ => {
                warn!("Unsupported material effect type {ty}");
                Ok(Self::Unknown(ty))
            }
        }
    }
}

impl BinRead for Material {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        ChunkHeader::read_expected(reader, endian, ChunkType::Material)?;

        ChunkHeader::read_expected(reader, endian, ChunkType::Struct)?;
        let MaterialStruct {
            flags,
            color,
            unk,
            has_texture,
            surface_properties,
        } = MaterialStruct::read_options(reader, endian, ())?;

        let texture = if has_texture {
            Some(Texture::read_options(reader, endian, ())?)
        } else {
            None
        };

        let mut material = Material {
            flags,
            color,
            unk,
            surface_properties,
            texture,
            right_to_render: None,
            mat_fx: None,
            reflection: None,
            specular: None,
        };

        read_extension(reader, endian, |reader, header| {
            match header.ty {
                ChunkType::RightToRender => {
                    material.right_to_render =
                        Some(RightToRender::read_options(reader, endian, ())?);
                }
                ChunkType::MaterialEffects => {
                    material.mat_fx = Some(MatFx::read_options(reader, endian, ())?);
                }
                ChunkType::ReflectionMaterial => {
                    material.reflection =
                        Some(ReflectionMaterial::read_options(reader, endian, ())?);
                }
                ChunkType::SpecularMaterial => {
                    let pos = reader.stream_position()?;
                    let level = f32::read_options(reader, endian, ())?;
                    // The name fills the payload except for the level and 4 trailing bytes.
                    let name_length = header.length.checked_sub(8).ok_or_else(|| {
                        binrw::Error::AssertFail {
                            pos,
                            message: format!(
                                "specular material length {} is too small",
                                header.length
                            ),
                        }
                    })?;
                    let texture_name = read_string(reader, name_length as usize)?;
                    skip(reader, 4)?;
                    material.specular = Some(SpecularMaterial {
                        level,
                        texture_name,
                    });
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        Ok(material)
    }
}
