//! Session lifecycle: build → run → collect → close.
//!
//! A [`Session`] owns the engine client for its lifetime and walks the
//! `Created → Built → Ran → Closed` state machine. Every operation asserts
//! its required predecessor state and fails with a structured
//! [`Error::LifecycleViolation`] when called out of order — including a
//! second `close`, which is a programmer error to surface, not swallow.

use std::fs::File;
use std::path::Path;

use tracing::warn;

use crate::config::{BuildSpec, RunSpec};
use crate::engine::{ContainerEngine, DockerEngine, ImageHandle};
use crate::error::{Error, Result};
use crate::image;
use crate::output::{self, Output, ReturnMode};
use crate::runner::{self, RunArtifact};
use crate::source::FunctionSpec;
use crate::template;

pub struct Session<E: ContainerEngine = DockerEngine> {
    function: FunctionSpec,
    engine: Option<E>,
    image: Option<ImageHandle>,
    artifact: Option<RunArtifact>,
}

impl Session<DockerEngine> {
    /// Session against the local Docker daemon.
    pub fn connect(function: FunctionSpec) -> Result<Self> {
        Ok(Self::new(DockerEngine::connect()?, function))
    }
}

impl<E: ContainerEngine> Session<E> {
    /// Session with an explicitly injected engine client.
    pub fn new(engine: E, function: FunctionSpec) -> Self {
        Self {
            function,
            engine: Some(engine),
            image: None,
            artifact: None,
        }
    }

    pub fn function(&self) -> &FunctionSpec {
        &self.function
    }

    fn engine(&self) -> Result<&E> {
        self.engine
            .as_ref()
            .ok_or(Error::LifecycleViolation("client not initialized"))
    }

    fn image(&self) -> Result<&ImageHandle> {
        self.image
            .as_ref()
            .ok_or(Error::LifecycleViolation("image is not built yet"))
    }

    fn artifact(&self) -> Result<&RunArtifact> {
        self.artifact
            .as_ref()
            .ok_or(Error::LifecycleViolation("container has not run yet"))
    }

    /// Ensure the session's image exists (reuse-or-build) and remember it.
    pub async fn build(&mut self, spec: &BuildSpec) -> Result<()> {
        let tag = spec.effective_tag(&self.function);
        let image = image::ensure_image(self.engine()?, &tag, spec).await?;
        self.image = Some(image);
        Ok(())
    }

    /// Render the executor script and run it in one ephemeral container.
    /// Requires a built image.
    pub async fn run(&mut self, spec: &RunSpec) -> Result<()> {
        self.engine()?;
        self.image()?;
        let script = template::render(&self.function)?;
        let artifact = runner::execute(self.engine()?, self.image()?, &script, spec).await?;
        self.artifact = Some(artifact);
        Ok(())
    }

    /// Path of the captured output file. Valid once the container has run;
    /// the caller owns deletion.
    pub fn output_path(&self) -> Result<&Path> {
        Ok(self.artifact()?.output_path())
    }

    /// Open binary-read handle over the captured output file.
    pub fn output_file(&self) -> Result<File> {
        let path = self.output_path()?;
        Ok(File::open(path)?)
    }

    /// The captured output's raw bytes. Deletes the underlying file and
    /// marks the artifact collected.
    pub fn output_contents(&mut self) -> Result<Vec<u8>> {
        let path = self.output_path()?.to_path_buf();
        let bytes = std::fs::read(&path)?;
        std::fs::remove_file(&path)?;
        self.artifact = None;
        Ok(bytes)
    }

    /// Resolve the output in the requested mode.
    pub fn resolve(&mut self, mode: ReturnMode) -> Result<Output> {
        match mode {
            ReturnMode::Contents => Ok(Output::Contents(self.output_contents()?)),
            other => output::resolve(self.output_path()?, other),
        }
    }

    /// Delete the session's built image from the engine store.
    pub async fn remove_image(&mut self, force: bool) -> Result<()> {
        self.engine()?;
        self.engine()?.remove_image(self.image()?, force).await?;
        self.image = None;
        Ok(())
    }

    /// Release the engine client. Exactly-once: a second call fails with a
    /// lifecycle violation instead of silently succeeding.
    pub async fn close(&mut self) -> Result<()> {
        let engine = self
            .engine
            .take()
            .ok_or(Error::LifecycleViolation("client not initialized"))?;
        engine.close().await
    }
}

impl<E: ContainerEngine> Drop for Session<E> {
    fn drop(&mut self) {
        if self.engine.is_some() {
            warn!(
                function = %self.function.name(),
                "session dropped without close(); engine client released implicitly"
            );
        }
    }
}
