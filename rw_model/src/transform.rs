use glam::{Mat4, Vec4};
use rw_lib::frame::Frame;

use crate::error::LoadModelError;

/// The transform of `frame` relative to its parent.
///
/// The rows of the frame's rotation are the right, up, and at vectors.
pub fn local_transform(frame: &Frame) -> Mat4 {
    let [r0, r1, r2, u0, u1, u2, a0, a1, a2] = frame.rotation;
    let [x, y, z] = frame.position;
    Mat4::from_cols(
        Vec4::new(r0, r1, r2, 0.0),
        Vec4::new(u0, u1, u2, 0.0),
        Vec4::new(a0, a1, a2, 0.0),
        Vec4::new(x, y, z, 1.0),
    )
}

/// The model space transform for each frame by recursively applying the parent transform.
///
/// Frames may appear before their parents.
/// Out of range parent indices and cycles are errors.
pub fn world_transforms(frames: &[Frame]) -> Result<Vec<Mat4>, LoadModelError> {
    let mut transforms: Vec<Option<Mat4>> = vec![None; frames.len()];

    for i in 0..frames.len() {
        // Find the ancestors without a transform.
        let mut chain = Vec::new();
        let mut current = Some(i);
        while let Some(index) = current {
            if transforms[index].is_some() {
                break;
            }
            if chain.contains(&index) {
                return Err(LoadModelError::FrameCycle { frame: index });
            }
            chain.push(index);

            current = match frames[index].parent_index {
                Some(parent) if parent >= frames.len() => {
                    return Err(LoadModelError::InvalidParentIndex {
                        frame: index,
                        parent,
                        count: frames.len(),
                    });
                }
                parent => parent,
            };
        }

        for index in chain.into_iter().rev() {
            let parent = frames[index]
                .parent_index
                .and_then(|p| transforms[p])
                .unwrap_or(Mat4::IDENTITY);
            transforms[index] = Some(parent * local_transform(&frames[index]));
        }
    }

    Ok(transforms
        .into_iter()
        .map(|t| t.unwrap_or(Mat4::IDENTITY))
        .collect())
}
