use std::{path::Path, time::Duration};

use anyhow::Context;

use crate::foundation::error::{TextRenderError, TextRenderResult};

/// Family name of the font every worker must load before it accepts jobs.
pub const DEFAULT_FONT_FAMILY: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Dispatcher and worker configuration.
///
/// Timeouts default to `None`, meaning a hung resolver or engine stalls the
/// corresponding request indefinitely.
pub struct DispatcherOpts {
    /// Mandatory font loaded during worker initialization.
    pub default_font_family: String,
    /// Bound on waiting for font-relay responses inside the worker, in milliseconds.
    pub relay_timeout_ms: Option<u64>,
    /// Bound on waiting for a dispatched job's reply, in milliseconds.
    pub render_timeout_ms: Option<u64>,
    /// OS thread name of the worker context.
    pub worker_thread_name: String,
}

impl Default for DispatcherOpts {
    fn default() -> Self {
        Self {
            default_font_family: DEFAULT_FONT_FAMILY.to_string(),
            relay_timeout_ms: None,
            render_timeout_ms: None,
            worker_thread_name: "text-render-worker".to_string(),
        }
    }
}

impl DispatcherOpts {
    /// Parse options from a JSON document. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> TextRenderResult<Self> {
        let opts: Self = serde_json::from_str(s)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read and parse options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> TextRenderResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read dispatcher options from {}", path.display()))?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> TextRenderResult<()> {
        if self.default_font_family.trim().is_empty() {
            return Err(TextRenderError::validation(
                "defaultFontFamily must be non-empty",
            ));
        }
        if self.relay_timeout_ms == Some(0) {
            return Err(TextRenderError::validation("relayTimeoutMs must be > 0"));
        }
        if self.render_timeout_ms == Some(0) {
            return Err(TextRenderError::validation("renderTimeoutMs must be > 0"));
        }
        Ok(())
    }

    pub fn relay_timeout(&self) -> Option<Duration> {
        self.relay_timeout_ms.map(Duration::from_millis)
    }

    pub fn render_timeout(&self) -> Option<Duration> {
        self.render_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
