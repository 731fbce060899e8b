//! Run a function body inside an ephemeral Docker container and collect
//! the file it writes.
//!
//! Cask packages a function's source text, injects it into a fixed executor
//! script, ensures a suitable image exists (reuse-or-build, keyed by tag),
//! runs one ephemeral container with the script and an output file bind-
//! mounted in, and hands the produced output back as a path, an open
//! handle, or the raw bytes.
//!
//! # Features
//!
//! - **Image caching** — images are built once per tag and reused across
//!   sessions and processes; dependencies are installed at build time.
//! - **Injectable engine** — everything that touches the container runtime
//!   sits behind the [`ContainerEngine`] trait, so tests run without a
//!   daemon.
//! - **Guaranteed cleanup** — the temporary input directory and the engine
//!   client are released on every path; containers are force-removed on
//!   exit.
//! - **Two operating modes** — an async core on tokio and a [`blocking`]
//!   facade with identical semantics.
//!
//! # Example
//!
//! ```no_run
//! use cask::{FunctionSpec, InvokeOptions, Output, ReturnMode};
//!
//! fn main() -> cask::Result<()> {
//!     let function = FunctionSpec::new(
//!         "write_greeting",
//!         "def write_greeting(output_file_path):\n    with open(output_file_path, 'wb') as output_file:\n        output_file.write(b'hello from the container')\n",
//!     )?;
//!
//!     let options = InvokeOptions::new().with_returning(ReturnMode::Contents);
//!     if let Output::Contents(bytes) = cask::blocking::run(function, &options)? {
//!         println!("{}", String::from_utf8_lossy(&bytes));
//!     }
//!     Ok(())
//! }
//! ```

pub mod blocking;
pub mod config;
pub mod engine;
pub mod error;
pub mod image;
pub mod invoke;
pub mod output;
pub mod runner;
pub mod session;
pub mod source;
pub mod template;

#[cfg(test)]
mod testutil;

pub use config::{BuildSpec, InvokeOptions, RunSpec, DEFAULT_BASE_IMAGE, DEFAULT_INTERPRETER};
pub use engine::{ContainerEngine, ContainerRun, DockerEngine, ImageBuild, ImageHandle};
pub use error::{Error, Result};
pub use invoke::{run, run_with};
pub use output::{Output, ReturnMode};
pub use runner::RunArtifact;
pub use session::Session;
pub use source::FunctionSpec;
