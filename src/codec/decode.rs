use crate::{
    codec::color::unpack_buffer_color,
    codec::command::{
        BBox, COMMAND_OPCODES, Command, CommandKind, DecodedResult, PathSegment, SEGMENT_OPCODES,
        SegmentKind, Stroke, Transform,
    },
    codec::reader::BufferReader,
    foundation::error::{DecodeError, DecodeErrorKind},
};

/// Decode an engine command buffer into bounding boxes and ordered drawing commands.
///
/// Layout: `[boxCount, boxCount * (x1, y1, x2, y2), command records...]`. Each record
/// starts with an opcode and is followed by exactly the fields that opcode declares.
/// Any opcode outside its table (top level or inside a path) aborts the whole decode:
/// skipping would desynchronize the cursor for every record after it.
pub fn decode(buffer: &[f32]) -> Result<DecodedResult, DecodeError> {
    let mut r = BufferReader::new(buffer);

    let (_, box_count) = r.index(DecodeErrorKind::InvalidCount)?;
    // a count larger than the buffer can hold is truncated, not an allocation request
    let mut boxes = Vec::with_capacity(box_count.min(r.remaining() / 4));
    for _ in 0..box_count {
        boxes.push(read_box(&mut r)?);
    }

    let mut commands = Vec::new();
    while !r.is_at_end() {
        commands.push(read_command(&mut r)?);
    }

    Ok(DecodedResult { boxes, commands })
}

fn read_box(r: &mut BufferReader<'_>) -> Result<BBox, DecodeError> {
    let [x1, y1, x2, y2] = r.take::<4>()?;
    Ok(BBox { x1, y1, x2, y2 })
}

fn read_command(r: &mut BufferReader<'_>) -> Result<Command, DecodeError> {
    let (at, op) = r.index(DecodeErrorKind::UnknownCommand)?;
    let kind = COMMAND_OPCODES
        .get(op)
        .copied()
        .ok_or_else(|| r.error(DecodeErrorKind::UnknownCommand, at))?;

    let cmd = match kind {
        CommandKind::Transform => {
            let [a, b, c, d, e, f] = r.take::<6>()?;
            Command::Transform(Transform { a, b, c, d, e, f })
        }
        CommandKind::Path => Command::Path(read_path(r)?),
        CommandKind::Stroke => {
            let [width, packed] = r.take::<2>()?;
            Command::Stroke(Stroke {
                width,
                color: unpack_buffer_color(packed),
            })
        }
        CommandKind::Fill => {
            let [packed] = r.take::<1>()?;
            Command::Fill(unpack_buffer_color(packed))
        }
    };
    Ok(cmd)
}

fn read_path(r: &mut BufferReader<'_>) -> Result<Vec<PathSegment>, DecodeError> {
    let (_, count) = r.index(DecodeErrorKind::InvalidCount)?;
    // every segment takes at least one number
    let mut segments = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        segments.push(read_segment(r)?);
    }
    Ok(segments)
}

fn read_segment(r: &mut BufferReader<'_>) -> Result<PathSegment, DecodeError> {
    let (at, op) = r.index(DecodeErrorKind::UnknownPathSegment)?;
    let kind = SEGMENT_OPCODES
        .get(op)
        .copied()
        .ok_or_else(|| r.error(DecodeErrorKind::UnknownPathSegment, at))?;

    let seg = match kind {
        SegmentKind::Move => {
            let [x, y] = r.take::<2>()?;
            PathSegment::Move { x, y }
        }
        SegmentKind::Line => {
            let [x, y] = r.take::<2>()?;
            PathSegment::Line { x, y }
        }
        SegmentKind::Curve => {
            let [x, y, x1, y1, x2, y2] = r.take::<6>()?;
            PathSegment::Curve {
                x,
                y,
                x1,
                y1,
                x2,
                y2,
            }
        }
        SegmentKind::Close => PathSegment::Close,
        SegmentKind::Quad => {
            let [x, y, x1, y1] = r.take::<4>()?;
            PathSegment::Quad { x, y, x1, y1 }
        }
    };
    Ok(seg)
}

#[cfg(test)]
#[path = "../../tests/unit/codec/decode.rs"]
mod tests;
