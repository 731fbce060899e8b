//! Ephemeral container runs.
//!
//! **Ordering guarantee:** script materialization strictly precedes
//! container launch; container launch strictly precedes artifact
//! availability.
//!
//! **Resource model:** the temporary input directory is scoped and removed
//! when the run step completes, success or failure. The temporary output
//! file deliberately outlives the call — ownership transfers to the
//! returned [`RunArtifact`] (and from there to the output resolver or the
//! caller), so output stays inspectable after a failed run.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::RunSpec;
use crate::engine::{host_user, ContainerEngine, ContainerRun, ImageHandle};
use crate::error::Result;

/// In-container directory the temporary input directory is bound to.
pub const GUEST_INPUT_DIR: &str = "/tmp/cask_input";

/// In-container path of the output file; the executor script writes its
/// result here and the host reads exactly this path's bind source.
pub const GUEST_OUTPUT_FILE: &str = "/tmp/cask_output";

/// Script filename inside the input directory.
pub const SCRIPT_FILENAME: &str = "executor.py";

/// Captured output of a completed run: the host-side path of the bind-
/// mounted output file.
#[derive(Debug)]
pub struct RunArtifact {
    output_path: PathBuf,
}

impl RunArtifact {
    pub(crate) fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Run the rendered script in one ephemeral container from `image` and
/// return the produced artifact.
pub async fn execute<E: ContainerEngine>(
    engine: &E,
    image: &ImageHandle,
    script: &str,
    spec: &RunSpec,
) -> Result<RunArtifact> {
    let input_dir = tempfile::tempdir()?;
    let script_path = input_dir.path().join(SCRIPT_FILENAME);
    tokio::fs::write(&script_path, script).await?;

    // The output file must exist before the bind so Docker mounts a file,
    // not a fresh directory. It is persisted past the temp scope: the
    // artifact owns it from here on.
    let output_path = tempfile::NamedTempFile::new()?
        .into_temp_path()
        .keep()
        .map_err(std::io::Error::from)?;

    let mut command: Vec<String> = spec
        .interpreter
        .split_whitespace()
        .map(str::to_string)
        .collect();
    command.push(format!("{GUEST_INPUT_DIR}/{SCRIPT_FILENAME}"));

    let request = ContainerRun {
        image,
        command,
        binds: vec![
            format!("{}:{}", input_dir.path().display(), GUEST_INPUT_DIR),
            format!("{}:{}", output_path.display(), GUEST_OUTPUT_FILE),
        ],
        user: host_user(),
        capture_stderr: spec.capture_stderr,
        options: &spec.options,
    };

    debug!(image = %image.tag, interpreter = %spec.interpreter, "launching container");
    let outcome = engine.run_container(&request).await;

    // Scoped release of the input side, on success and failure alike.
    drop(input_dir);

    outcome?;
    Ok(RunArtifact::new(output_path))
}
