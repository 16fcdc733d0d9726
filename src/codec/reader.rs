use crate::foundation::error::{DecodeError, DecodeErrorKind};

/// Forward-only cursor over a command buffer.
///
/// Every read advances by exactly the numbers it consumes; failures report the
/// cursor position of the offending (or first missing) number.
#[derive(Clone, Debug)]
pub struct BufferReader<'a> {
    buf: &'a [f32],
    pos: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(buf: &'a [f32]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn error(&self, kind: DecodeErrorKind, position: usize) -> DecodeError {
        DecodeError {
            kind,
            position,
            value: self.buf.get(position).copied(),
            buffer: self.buf.to_vec(),
        }
    }

    pub fn read(&mut self) -> Result<f32, DecodeError> {
        let v = self
            .buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error(DecodeErrorKind::Truncated, self.pos))?;
        self.pos += 1;
        Ok(v)
    }

    /// Read `N` consecutive numbers. Nothing is consumed when fewer remain.
    pub fn take<const N: usize>(&mut self) -> Result<[f32; N], DecodeError> {
        if self.remaining() < N {
            return Err(self.error(DecodeErrorKind::Truncated, self.buf.len()));
        }
        let mut out = [0.0; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Read a non-negative integral number, as used for counts and opcodes.
    ///
    /// Returns the position it was read from alongside the value so callers can
    /// report table misses against the right cursor.
    pub fn index(&mut self, kind: DecodeErrorKind) -> Result<(usize, usize), DecodeError> {
        let at = self.pos;
        let v = self.read()?;
        if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
            return Err(self.error(kind, at));
        }
        Ok((at, v as usize))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/codec/reader.rs"]
mod tests;
