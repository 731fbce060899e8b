//! Image provisioning: reuse-or-build, keyed by tag.
//!
//! The cache is the engine's own image store. A tag that resolves is
//! returned unchanged — no rebuild, no staleness check — so images persist
//! across sessions and processes until removed explicitly.

use tracing::{debug, info, warn};

use crate::config::BuildSpec;
use crate::engine::{ContainerEngine, ImageBuild, ImageHandle};
use crate::error::Result;

/// Return a usable image for `tag`, building it from the fixed build
/// context if the engine does not already have one.
///
/// Concurrent callers racing on the same tag are unguarded: first build to
/// finish wins, which is harmless since both produce the same image.
pub async fn ensure_image<E: ContainerEngine>(
    engine: &E,
    tag: &str,
    spec: &BuildSpec,
) -> Result<ImageHandle> {
    if let Some(image) = engine.get_image(tag).await? {
        debug!(tag, "image cache hit");
        return Ok(image);
    }

    warn!(tag, base_image = %spec.base_image, "image cache miss, building");

    let build = ImageBuild {
        tag,
        base_image: &spec.base_image,
        requirements: &spec.requirements,
        options: &spec.options,
    };
    let image = engine.build_image(&build).await?;

    info!(tag, id = %image.id, "image built");
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeEngine;

    #[tokio::test]
    async fn test_ensure_image_builds_on_miss() {
        let engine = FakeEngine::new();
        let log = engine.log.clone();

        let image = ensure_image(&engine, "test_image_tag", &BuildSpec::new())
            .await
            .unwrap();

        assert_eq!(image.tag, "test_image_tag");
        assert_eq!(log.lock().unwrap().builds, vec!["test_image_tag"]);
    }

    #[tokio::test]
    async fn test_ensure_image_reuses_existing_tag() {
        let engine = FakeEngine::new();
        let log = engine.log.clone();

        ensure_image(&engine, "test_image_tag", &BuildSpec::new())
            .await
            .unwrap();
        ensure_image(&engine, "test_image_tag", &BuildSpec::new())
            .await
            .unwrap();

        // Exactly one underlying build; the second call is a cache hit.
        assert_eq!(log.lock().unwrap().builds.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_image_passes_build_parameters_through() {
        let engine = FakeEngine::new();
        let log = engine.log.clone();

        let spec = BuildSpec::new()
            .with_base_image("python:3.11-slim")
            .with_requirements(["pandas==1.5.0", "numpy"]);
        ensure_image(&engine, "report", &spec).await.unwrap();

        let recorded = log.lock().unwrap().build_requests.remove(0);
        assert_eq!(recorded.base_image, "python:3.11-slim");
        assert_eq!(recorded.requirements, vec!["pandas==1.5.0", "numpy"]);
    }
}
