//! One-shot pipeline: the convenience surface that drives
//! build → run → collect → close in a single call.
//!
//! This is the scoped-acquisition form of the session: the engine client is
//! released exactly once on every path, including when build or run fails,
//! and a close failure never masks the pipeline's own error.

use crate::config::InvokeOptions;
use crate::engine::{ContainerEngine, DockerEngine};
use crate::error::Result;
use crate::output::Output;
use crate::session::Session;
use crate::source::FunctionSpec;

/// Run a packaged function against the local Docker daemon and resolve its
/// output per `options.returning`.
pub async fn run(function: FunctionSpec, options: &InvokeOptions) -> Result<Output> {
    run_with(DockerEngine::connect()?, function, options).await
}

/// Like [`run`], with an explicitly injected engine client. The client is
/// owned by the pipeline and released before returning.
pub async fn run_with<E: ContainerEngine>(
    engine: E,
    function: FunctionSpec,
    options: &InvokeOptions,
) -> Result<Output> {
    let mut session = Session::new(engine, function);
    let outcome = drive(&mut session, options).await;
    let closed = session.close().await;

    let output = outcome?;
    closed?;
    Ok(output)
}

async fn drive<E: ContainerEngine>(
    session: &mut Session<E>,
    options: &InvokeOptions,
) -> Result<Output> {
    session.build(&options.build).await?;
    session.run(&options.run).await?;
    session.resolve(options.returning)
}
