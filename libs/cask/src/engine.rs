//! Container engine capability.
//!
//! **Core Responsibility:**
//! Everything that talks to the container runtime lives behind the
//! [`ContainerEngine`] trait: image lookup, image build, ephemeral container
//! runs, and client release.
//!
//! **Why This Exists:**
//! The session takes the engine as an explicit capability instead of
//! constructing an ambient client, so tests can substitute an in-process
//! fake and alternative runtimes can be slotted in without touching the
//! pipeline.
//!
//! [`DockerEngine`] is the production implementation on top of the Docker
//! API via bollard.

use std::collections::HashMap;

use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::image::{BuildImageOptions, RemoveImageOptions};
use bollard::Docker;
use futures_util::stream::StreamExt;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

const DOCKERFILE: &str = include_str!("../resources/Dockerfile");

/// Opaque reference to an image in the engine's local store.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    pub id: String,
    pub tag: String,
}

/// Request for building an image from the fixed build context.
#[derive(Debug)]
pub struct ImageBuild<'a> {
    pub tag: &'a str,
    pub base_image: &'a str,
    pub requirements: &'a [String],
    pub options: &'a HashMap<String, String>,
}

/// Request for one ephemeral container run.
#[derive(Debug)]
pub struct ContainerRun<'a> {
    pub image: &'a ImageHandle,
    pub command: Vec<String>,
    /// Volume bindings as `host:guest` pairs.
    pub binds: Vec<String>,
    /// `uid:gid` the container process runs as; empty means the image default.
    pub user: String,
    pub capture_stderr: bool,
    pub options: &'a HashMap<String, String>,
}

/// The capability the pipeline consumes.
///
/// `run_container` blocks (cooperatively) until the container exits and
/// fails with [`Error::ContainerExecutionFailed`] on a non-zero exit.
/// `close` releases the underlying client; it consumes the engine so a
/// released client cannot be reused.
pub trait ContainerEngine {
    fn get_image(
        &self,
        tag: &str,
    ) -> impl std::future::Future<Output = Result<Option<ImageHandle>>> + Send;

    fn build_image(
        &self,
        build: &ImageBuild<'_>,
    ) -> impl std::future::Future<Output = Result<ImageHandle>> + Send;

    fn run_container(
        &self,
        run: &ContainerRun<'_>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn remove_image(
        &self,
        image: &ImageHandle,
        force: bool,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn close(self) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Docker implementation of the engine capability.
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect to the local Docker daemon with default settings.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    /// Wrap an existing bollard client.
    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }

    /// Tar archive of the fixed build context (the embedded Dockerfile).
    fn build_context() -> Result<Vec<u8>> {
        let mut archive = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(DOCKERFILE.len() as u64);
        header.set_mode(0o644);
        archive.append_data(&mut header, "Dockerfile", DOCKERFILE.as_bytes())?;
        Ok(archive.into_inner()?)
    }
}

impl ContainerEngine for DockerEngine {
    /// Look up an image by tag. A 404 from the daemon means "not found";
    /// any other failure is an infrastructure error.
    async fn get_image(&self, tag: &str) -> Result<Option<ImageHandle>> {
        match self.docker.inspect_image(tag).await {
            Ok(inspect) => Ok(Some(ImageHandle {
                id: inspect.id.unwrap_or_else(|| tag.to_string()),
                tag: tag.to_string(),
            })),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Build an image from the fixed build context, passing the base image
    /// and the space-joined requirements as build arguments, and tag the
    /// result. Blocks until the build stream completes; build failures carry
    /// the daemon's diagnostic output.
    async fn build_image(&self, build: &ImageBuild<'_>) -> Result<ImageHandle> {
        let context = Self::build_context()?;

        let mut buildargs = HashMap::new();
        buildargs.insert("FROM_IMAGE".to_string(), build.base_image.to_string());
        buildargs.insert("REQUIREMENTS".to_string(), build.requirements.join(" "));

        let nocache = build
            .options
            .get("nocache")
            .is_some_and(|value| value == "true");

        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: build.tag.to_string(),
            buildargs,
            nocache,
            rm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(options, None, Some(context.into()));
        while let Some(progress) = stream.next().await {
            match progress {
                Ok(info) => {
                    if let Some(detail) = info.error {
                        return Err(Error::ImageBuildFailed {
                            tag: build.tag.to_string(),
                            detail,
                        });
                    }
                    if let Some(line) = info.stream {
                        let line = line.trim_end();
                        if !line.is_empty() {
                            trace!(tag = build.tag, "{line}");
                        }
                    }
                }
                Err(e) => {
                    return Err(Error::ImageBuildFailed {
                        tag: build.tag.to_string(),
                        detail: e.to_string(),
                    })
                }
            }
        }

        self.get_image(build.tag)
            .await?
            .ok_or_else(|| Error::ImageBuildFailed {
                tag: build.tag.to_string(),
                detail: "image missing from local store after build".to_string(),
            })
    }

    /// Launch one ephemeral container and block until it terminates.
    ///
    /// The container is removed on every path via a drop guard, including
    /// cancellation mid-wait. Non-zero exits fail with the captured stderr
    /// when the run requested it.
    async fn run_container(&self, run: &ContainerRun<'_>) -> Result<()> {
        let name = format!("cask-{}", Uuid::new_v4());

        let network_disabled = run
            .options
            .get("network_disabled")
            .is_some_and(|value| value == "true");

        let config = Config {
            image: Some(run.image.tag.clone()),
            cmd: Some(run.command.clone()),
            user: (!run.user.is_empty()).then(|| run.user.clone()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            network_disabled: Some(network_disabled),
            host_config: Some(bollard::models::HostConfig {
                binds: Some(run.binds.clone()),
                memory: run
                    .options
                    .get("memory_bytes")
                    .and_then(|value| value.parse().ok()),
                nano_cpus: run
                    .options
                    .get("nano_cpus")
                    .and_then(|value| value.parse().ok()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(create_options), config)
            .await?;
        let container_id = created.id;

        // The guard is installed before start so the container is removed
        // even if we never reach the wait.
        let mut guard = ContainerGuard::new(&self.docker, container_id.clone());

        self.docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await?;

        let mut stderr = String::new();
        if run.capture_stderr {
            let logs_options = LogsOptions::<String> {
                stdout: false,
                stderr: true,
                follow: true,
                ..Default::default()
            };
            let mut logs = self.docker.logs(&container_id, Some(logs_options));
            while let Some(chunk) = logs.next().await {
                match chunk {
                    Ok(LogOutput::StdErr { message }) => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(container = %container_id, error = %e, "error reading container logs");
                        break;
                    }
                }
            }
        }

        let wait_options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut wait = self.docker.wait_container(&container_id, Some(wait_options));
        let mut exit_code = None;
        while let Some(status) = wait.next().await {
            match status {
                Ok(response) => exit_code = Some(response.status_code),
                // Non-zero exits surface as a wait error carrying the code.
                Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                    exit_code = Some(code);
                }
                Err(e) => return Err(e.into()),
            }
        }

        // The container terminated: remove it here, awaited, and leave the
        // guard armed only for the paths that never get this far.
        let remove_options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self
            .docker
            .remove_container(&container_id, Some(remove_options))
            .await
        {
            warn!(container = %container_id, error = %e, "failed to remove container");
        }
        guard.disarm();

        match exit_code {
            Some(0) => {
                debug!(container = %container_id, "container exited cleanly");
                Ok(())
            }
            code => Err(Error::ContainerExecutionFailed {
                exit_code: code,
                stderr,
            }),
        }
    }

    async fn remove_image(&self, image: &ImageHandle, force: bool) -> Result<()> {
        let options = RemoveImageOptions {
            force,
            ..Default::default()
        };
        self.docker.remove_image(&image.tag, Some(options), None).await?;
        debug!(tag = %image.tag, "image removed");
        Ok(())
    }

    /// Release the client. Dropping the bollard handle closes its
    /// connection pool; there is nothing else to flush.
    async fn close(self) -> Result<()> {
        drop(self.docker);
        Ok(())
    }
}

/// Removal guard for the paths that never reach the explicit removal:
/// early returns, panics, and cancellation mid-wait. Best-effort, since
/// `Drop` cannot be async.
struct ContainerGuard<'a> {
    docker: &'a Docker,
    container_id: String,
    armed: bool,
}

impl<'a> ContainerGuard<'a> {
    fn new(docker: &'a Docker, container_id: String) -> Self {
        Self {
            docker,
            container_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ContainerGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let docker = self.docker.clone();
        let container_id = self.container_id.clone();

        tokio::spawn(async move {
            let options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            if let Err(e) = docker.remove_container(&container_id, Some(options)).await {
                warn!(container = %container_id, error = %e, "failed to remove container");
            }
        });
    }
}

/// `uid:gid` of the invoking host user, so output artifacts are not
/// root-owned on the host side of the bind mount.
#[cfg(unix)]
pub(crate) fn host_user() -> String {
    // SAFETY: getuid/getgid cannot fail and have no preconditions.
    unsafe { format!("{}:{}", libc::getuid(), libc::getgid()) }
}

#[cfg(not(unix))]
pub(crate) fn host_user() -> String {
    String::new()
}
