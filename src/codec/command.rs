use kurbo::{Affine, BezPath, Point, Rect};

use crate::codec::color::HexColor;

/// Numeric opcodes of top-level command records, indexed by opcode value.
pub const COMMAND_OPCODES: [CommandKind; 4] = [
    CommandKind::Transform,
    CommandKind::Path,
    CommandKind::Stroke,
    CommandKind::Fill,
];

/// Numeric opcodes of path sub-records, indexed by opcode value.
pub const SEGMENT_OPCODES: [SegmentKind; 5] = [
    SegmentKind::Move,
    SegmentKind::Line,
    SegmentKind::Curve,
    SegmentKind::Close,
    SegmentKind::Quad,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Transform,
    Path,
    Stroke,
    Fill,
}

impl CommandKind {
    pub fn opcode(self) -> f32 {
        match self {
            Self::Transform => 0.0,
            Self::Path => 1.0,
            Self::Stroke => 2.0,
            Self::Fill => 3.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Move,
    Line,
    Curve,
    Close,
    Quad,
}

impl SegmentKind {
    pub fn opcode(self) -> f32 {
        match self {
            Self::Move => 0.0,
            Self::Line => 1.0,
            Self::Curve => 2.0,
            Self::Close => 3.0,
            Self::Quad => 4.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Per-line/run bounding box reported by the engine.
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x1),
            f64::from(self.y1),
            f64::from(self.x2),
            f64::from(self.y2),
        )
    }

    /// Smallest box covering every box in `boxes`, `None` when empty.
    pub fn union_all(boxes: &[BBox]) -> Option<BBox> {
        let (first, rest) = boxes.split_first()?;
        Some(rest.iter().fold(*first, |acc, b| BBox {
            x1: acc.x1.min(b.x1),
            y1: acc.y1.min(b.y1),
            x2: acc.x2.max(b.x2),
            y2: acc.y2.max(b.y2),
        }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// 2D affine matrix in canvas `setTransform(a, b, c, d, e, f)` order.
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl Transform {
    pub fn to_affine(self) -> Affine {
        Affine::new([
            f64::from(self.a),
            f64::from(self.b),
            f64::from(self.c),
            f64::from(self.d),
            f64::from(self.e),
            f64::from(self.f),
        ])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
/// One sub-operation of a `path` command.
///
/// `(x, y)` is always the end point; `(x1, y1)` and `(x2, y2)` are control points.
pub enum PathSegment {
    Move {
        x: f32,
        y: f32,
    },
    Line {
        x: f32,
        y: f32,
    },
    Curve {
        x: f32,
        y: f32,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Close,
    Quad {
        x: f32,
        y: f32,
        x1: f32,
        y1: f32,
    },
}

impl PathSegment {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Move { .. } => SegmentKind::Move,
            Self::Line { .. } => SegmentKind::Line,
            Self::Curve { .. } => SegmentKind::Curve,
            Self::Close => SegmentKind::Close,
            Self::Quad { .. } => SegmentKind::Quad,
        }
    }
}

fn pt(x: f32, y: f32) -> Point {
    Point::new(f64::from(x), f64::from(y))
}

/// Build a `kurbo` path from decoded segments.
pub fn path_to_bez_path(segments: &[PathSegment]) -> BezPath {
    let mut path = BezPath::new();
    for seg in segments {
        match *seg {
            PathSegment::Move { x, y } => path.move_to(pt(x, y)),
            PathSegment::Line { x, y } => path.line_to(pt(x, y)),
            PathSegment::Curve {
                x,
                y,
                x1,
                y1,
                x2,
                y2,
            } => path.curve_to(pt(x1, y1), pt(x2, y2), pt(x, y)),
            PathSegment::Close => path.close_path(),
            PathSegment::Quad { x, y, x1, y1 } => path.quad_to(pt(x1, y1), pt(x, y)),
        }
    }
    path
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    pub width: f32,
    pub color: HexColor,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(into = "CommandWire", from = "CommandWire")]
/// Typed drawing instruction, in the order a painter must apply it.
///
/// On the wire every command is `{type, value}`; `stroke` carries its color in
/// `value` and its `width` next to it.
pub enum Command {
    /// Replace the current transform.
    Transform(Transform),
    /// Start a new current path.
    Path(Vec<PathSegment>),
    /// Stroke the current path.
    Stroke(Stroke),
    /// Fill the current path.
    Fill(HexColor),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Transform(_) => CommandKind::Transform,
            Self::Path(_) => CommandKind::Path,
            Self::Stroke(_) => CommandKind::Stroke,
            Self::Fill(_) => CommandKind::Fill,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum CommandWire {
    Transform { value: Transform },
    Path { value: Vec<PathSegment> },
    Stroke { value: HexColor, width: f32 },
    Fill { value: HexColor },
}

impl From<Command> for CommandWire {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Transform(value) => Self::Transform { value },
            Command::Path(value) => Self::Path { value },
            Command::Stroke(Stroke { width, color }) => Self::Stroke {
                value: color,
                width,
            },
            Command::Fill(value) => Self::Fill { value },
        }
    }
}

impl From<CommandWire> for Command {
    fn from(wire: CommandWire) -> Self {
        match wire {
            CommandWire::Transform { value } => Self::Transform(value),
            CommandWire::Path { value } => Self::Path(value),
            CommandWire::Stroke { value, width } => Self::Stroke(Stroke {
                width,
                color: value,
            }),
            CommandWire::Fill { value } => Self::Fill(value),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Output of [`crate::decode`]: bounding boxes plus ordered commands.
pub struct DecodedResult {
    pub boxes: Vec<BBox>,
    pub commands: Vec<Command>,
}

impl DecodedResult {
    /// Union of all boxes, `None` when the engine reported none.
    pub fn bounds(&self) -> Option<BBox> {
        BBox::union_all(&self.boxes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/codec/command.rs"]
mod tests;
