use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::runtime::asset::ActionListAsset;

/// Shareable set of asset lists. Several engines (one per scene) can hold the
/// same library; invocations copy what they need out of it.
#[derive(Debug, Default)]
pub struct AssetLibrary {
    assets: DashMap<String, Arc<ActionListAsset>>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an asset, returning the previous version.
    pub fn register(&self, asset: ActionListAsset) -> Option<Arc<ActionListAsset>> {
        let id = asset.id.clone();
        debug!(asset = %id, nodes = asset.nodes.len(), "registering asset list");
        self.assets.insert(id, Arc::new(asset))
    }

    pub fn get(&self, id: &str) -> Option<Arc<ActionListAsset>> {
        self.assets.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
