//! Blocking operating mode.
//!
//! Functionally identical to the async surface — same pipeline, same
//! errors, same guarantees — differing only in how waiting for image build
//! and container termination is expressed: each blocking session owns a
//! current-thread tokio runtime and drives the async core to completion on
//! the calling thread.

use std::fs::File;
use std::path::Path;

use crate::config::{BuildSpec, InvokeOptions, RunSpec};
use crate::engine::{ContainerEngine, DockerEngine};
use crate::error::Result;
use crate::output::{Output, ReturnMode};
use crate::source::FunctionSpec;

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Blocking counterpart of [`crate::Session`].
pub struct Session<E: ContainerEngine = DockerEngine> {
    runtime: tokio::runtime::Runtime,
    inner: crate::session::Session<E>,
}

impl Session<DockerEngine> {
    pub fn connect(function: FunctionSpec) -> Result<Self> {
        let runtime = runtime()?;
        let engine = DockerEngine::connect()?;
        Ok(Self {
            runtime,
            inner: crate::session::Session::new(engine, function),
        })
    }
}

impl<E: ContainerEngine> Session<E> {
    pub fn new(engine: E, function: FunctionSpec) -> Result<Self> {
        Ok(Self {
            runtime: runtime()?,
            inner: crate::session::Session::new(engine, function),
        })
    }

    pub fn build(&mut self, spec: &BuildSpec) -> Result<()> {
        self.runtime.block_on(self.inner.build(spec))
    }

    pub fn run(&mut self, spec: &RunSpec) -> Result<()> {
        self.runtime.block_on(self.inner.run(spec))
    }

    pub fn output_path(&self) -> Result<&Path> {
        self.inner.output_path()
    }

    pub fn output_file(&self) -> Result<File> {
        self.inner.output_file()
    }

    pub fn output_contents(&mut self) -> Result<Vec<u8>> {
        self.inner.output_contents()
    }

    pub fn resolve(&mut self, mode: ReturnMode) -> Result<Output> {
        self.inner.resolve(mode)
    }

    pub fn remove_image(&mut self, force: bool) -> Result<()> {
        self.runtime.block_on(self.inner.remove_image(force))
    }

    pub fn close(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.close())
    }
}

/// Blocking counterpart of [`crate::invoke::run`].
pub fn run(function: FunctionSpec, options: &InvokeOptions) -> Result<Output> {
    runtime()?.block_on(crate::invoke::run(function, options))
}

/// Blocking counterpart of [`crate::invoke::run_with`].
pub fn run_with<E: ContainerEngine>(
    engine: E,
    function: FunctionSpec,
    options: &InvokeOptions,
) -> Result<Output> {
    runtime()?.block_on(crate::invoke::run_with(engine, function, options))
}
