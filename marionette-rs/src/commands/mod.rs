//! Command implementations

pub mod clips;
pub mod simulate;
pub mod solve;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use marionette_anim::{AssetLoader, ClipLibrary, Skeleton};

/// Load a clip manifest and look up one of its skeletons
pub(crate) fn open_skeleton(
    manifest: &Path,
    skeleton: &str,
) -> Result<(Arc<dyn AssetLoader>, Arc<Skeleton>)> {
    let library: Arc<dyn AssetLoader> = Arc::new(
        ClipLibrary::from_path(manifest)
            .with_context(|| format!("Failed to load manifest: {}", manifest.display()))?,
    );
    let base = library
        .load_skeleton(skeleton)
        .with_context(|| format!("Skeleton '{skeleton}' not found in {}", manifest.display()))?;
    Ok((library, base))
}
