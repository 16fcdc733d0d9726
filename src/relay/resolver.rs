use std::{collections::HashMap, future::Future, sync::Arc};

use futures::future::BoxFuture;

/// Source of serialized font bytes, keyed by family name.
///
/// Installed on the controller side with [`crate::Dispatcher::bind`]. The returned
/// future must eventually settle for every family it is asked about; the payload
/// is opaque to this crate and handed to the engine unchanged.
pub trait FontResolver: Send + Sync + 'static {
    fn resolve(&self, family: &str) -> BoxFuture<'static, anyhow::Result<Vec<u8>>>;
}

impl<F, Fut> FontResolver for F
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
{
    fn resolve(&self, family: &str) -> BoxFuture<'static, anyhow::Result<Vec<u8>>> {
        Box::pin(self(family.to_string()))
    }
}

/// In-memory resolver over a fixed family -> bytes table.
#[derive(Clone, Debug, Default)]
pub struct StaticFontResolver {
    fonts: HashMap<String, Arc<[u8]>>,
}

impl StaticFontResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, family: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(family, bytes);
        self
    }

    pub fn insert(&mut self, family: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.fonts
            .insert(family.into(), Arc::from(bytes.into().into_boxed_slice()));
    }
}

impl FontResolver for StaticFontResolver {
    fn resolve(&self, family: &str) -> BoxFuture<'static, anyhow::Result<Vec<u8>>> {
        let found = self.fonts.get(family).map(|b| b.to_vec());
        let family = family.to_string();
        Box::pin(async move { found.ok_or_else(|| anyhow::anyhow!("unknown font family {family:?}")) })
    }
}
