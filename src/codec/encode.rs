use crate::codec::command::{BBox, Command, PathSegment};

/// Pack boxes and commands into the engine's flat command-buffer layout.
///
/// This is what an engine emits; [`crate::decode`] reads it back.
pub fn encode(boxes: &[BBox], commands: &[Command]) -> Vec<f32> {
    let mut out = Vec::with_capacity(1 + boxes.len() * 4 + commands.len() * 8);
    out.push(boxes.len() as f32);
    for b in boxes {
        out.extend_from_slice(&[b.x1, b.y1, b.x2, b.y2]);
    }
    for cmd in commands {
        encode_command(cmd, &mut out);
    }
    out
}

fn encode_command(cmd: &Command, out: &mut Vec<f32>) {
    out.push(cmd.kind().opcode());
    match cmd {
        Command::Transform(t) => out.extend_from_slice(&[t.a, t.b, t.c, t.d, t.e, t.f]),
        Command::Path(segments) => {
            out.push(segments.len() as f32);
            for seg in segments {
                encode_segment(seg, out);
            }
        }
        Command::Stroke(s) => out.extend_from_slice(&[s.width, s.color.packed() as f32]),
        Command::Fill(c) => out.push(c.packed() as f32),
    }
}

fn encode_segment(seg: &PathSegment, out: &mut Vec<f32>) {
    out.push(seg.kind().opcode());
    match *seg {
        PathSegment::Move { x, y } | PathSegment::Line { x, y } => out.extend_from_slice(&[x, y]),
        PathSegment::Curve {
            x,
            y,
            x1,
            y1,
            x2,
            y2,
        } => out.extend_from_slice(&[x, y, x1, y1, x2, y2]),
        PathSegment::Close => {}
        PathSegment::Quad { x, y, x1, y1 } => out.extend_from_slice(&[x, y, x1, y1]),
    }
}
