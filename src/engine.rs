//! The native layout engine seam and the worker's per-family font cache slots.

use std::collections::HashMap;

/// Synchronous, non-reentrant text layout engine hosted by the worker.
///
/// The worker owns exactly one instance and never calls into it concurrently.
/// Errors are reported as `anyhow::Error`; the worker maps them onto the
/// crate's error taxonomy.
pub trait LayoutEngine {
    /// Register a font from its serialized bytes.
    fn load_font_buffer(&mut self, family: &str, bytes: &[u8]) -> anyhow::Result<()>;

    /// Register `family` using bytes already delivered into `slots`.
    ///
    /// The default consumes the slot and forwards to [`LayoutEngine::load_font_buffer`].
    fn load_font(&mut self, family: &str, slots: &mut FontCacheSlots) -> anyhow::Result<()> {
        let bytes = slots
            .take(family)
            .ok_or_else(|| anyhow::anyhow!("no font bytes delivered for {family:?}"))?;
        self.load_font_buffer(family, &bytes)
    }

    /// Lay out a serialized [`crate::TextData`] job and return its command buffer.
    fn exec(&mut self, job_json: &str) -> anyhow::Result<Vec<f32>>;
}

impl<E: LayoutEngine + ?Sized> LayoutEngine for Box<E> {
    fn load_font_buffer(&mut self, family: &str, bytes: &[u8]) -> anyhow::Result<()> {
        (**self).load_font_buffer(family, bytes)
    }

    fn load_font(&mut self, family: &str, slots: &mut FontCacheSlots) -> anyhow::Result<()> {
        (**self).load_font(family, slots)
    }

    fn exec(&mut self, job_json: &str) -> anyhow::Result<Vec<f32>> {
        (**self).exec(job_json)
    }
}

/// Font payloads delivered by the relay but not yet loaded into the engine.
///
/// One slot per family. A slot lives for a single load cycle: it is created when
/// the bytes arrive and removed when the engine consumes them, so the map never
/// grows with the number of distinct fonts seen over time.
#[derive(Debug, Default)]
pub struct FontCacheSlots {
    slots: HashMap<String, Vec<u8>>,
}

impl FontCacheSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes for `family`, replacing an unconsumed earlier delivery.
    pub fn put(&mut self, family: impl Into<String>, bytes: Vec<u8>) {
        let family = family.into();
        if self.slots.insert(family.clone(), bytes).is_some() {
            tracing::debug!(%family, "replaced unconsumed font cache slot");
        }
    }

    /// Remove and return the bytes for `family`.
    pub fn take(&mut self, family: &str) -> Option<Vec<u8>> {
        self.slots.remove(family)
    }

    pub fn contains(&self, family: &str) -> bool {
        self.slots.contains_key(family)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
#[path = "../tests/unit/engine/slots.rs"]
mod tests;
