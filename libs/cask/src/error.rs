//! Error taxonomy for the pipeline.
//!
//! Every stage fails with a distinct variant so callers can tell "my code
//! failed inside the container" apart from "the container infrastructure
//! itself failed". No stage retries; errors abort the remaining pipeline
//! steps for the session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The function's source text could not be obtained or was empty.
    #[error("cannot extract function source: {0}")]
    SourceUnavailable(String),

    /// The function body contains one of the executor template's literal
    /// placeholder tokens, so substitution would produce a corrupt script.
    #[error("function body contains the reserved placeholder token `{token}`")]
    PlaceholderCollision { token: &'static str },

    /// The engine failed to build the image; `detail` carries the engine's
    /// diagnostic output.
    #[error("image build failed for tag '{tag}': {detail}")]
    ImageBuildFailed { tag: String, detail: String },

    /// The container launched but exited with a non-zero status, or the
    /// engine reported a launch failure. `stderr` is populated when the run
    /// requested stderr capture.
    #[error("container execution failed: {}", describe_execution_failure(.exit_code, .stderr))]
    ContainerExecutionFailed {
        exit_code: Option<i64>,
        stderr: String,
    },

    /// A `returning` value other than the three supported modes.
    #[error("invalid returning value '{0}'; valid values are: 'path', 'handle', or 'contents'")]
    InvalidReturnMode(String),

    /// An operation was invoked out of lifecycle order (run before build,
    /// double close, output access before run).
    #[error("lifecycle violation: {0}")]
    LifecycleViolation(&'static str),

    /// Infrastructure failure reported by the Docker API.
    #[error("container engine error: {0}")]
    Engine(#[from] bollard::errors::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe_execution_failure(exit_code: &Option<i64>, stderr: &str) -> String {
    let mut message = match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code reported".to_string(),
    };
    if !stderr.is_empty() {
        message.push_str(": ");
        message.push_str(stderr.trim_end());
    }
    message
}
