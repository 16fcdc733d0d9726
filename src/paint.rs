//! Replaying decoded commands onto a 2D drawing surface.

use kurbo::{Affine, BezPath};

use crate::{
    codec::{
        color::HexColor,
        command::{Command, DecodedResult, path_to_bez_path},
    },
    foundation::error::TextRenderResult,
};

/// A stateful 2D surface, such as a canvas context.
pub trait Painter {
    /// Replace the current transform.
    fn set_transform(&mut self, transform: Affine) -> TextRenderResult<()>;

    fn fill_path(&mut self, path: &BezPath, color: HexColor) -> TextRenderResult<()>;

    fn stroke_path(&mut self, path: &BezPath, width: f64, color: HexColor)
    -> TextRenderResult<()>;
}

/// Apply `commands` in order. `fill` and `stroke` act on the most recent `path`;
/// before any `path` they act on an empty one.
pub fn paint<P: Painter + ?Sized>(painter: &mut P, commands: &[Command]) -> TextRenderResult<()> {
    let mut current = BezPath::new();
    for command in commands {
        match command {
            Command::Transform(t) => painter.set_transform(t.to_affine())?,
            Command::Path(segments) => current = path_to_bez_path(segments),
            Command::Fill(color) => painter.fill_path(&current, *color)?,
            Command::Stroke(stroke) => {
                painter.stroke_path(&current, f64::from(stroke.width), stroke.color)?
            }
        }
    }
    Ok(())
}

pub fn paint_result<P: Painter + ?Sized>(
    painter: &mut P,
    result: &DecodedResult,
) -> TextRenderResult<()> {
    paint(painter, &result.commands)
}

#[cfg(test)]
#[path = "../tests/unit/paint.rs"]
mod tests;
