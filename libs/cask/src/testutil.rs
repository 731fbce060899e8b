//! In-process engine double for tests.
//!
//! `FakeEngine` implements [`ContainerEngine`] without a daemon: it records
//! every call, simulates the container writing the output bind, and can be
//! armed to fail the build or run step.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::engine::{ContainerEngine, ContainerRun, ImageBuild, ImageHandle};
use crate::error::{Error, Result};
use crate::runner::{GUEST_INPUT_DIR, GUEST_OUTPUT_FILE, SCRIPT_FILENAME};

pub fn test_image(tag: &str) -> ImageHandle {
    ImageHandle {
        id: format!("sha256:{tag}"),
        tag: tag.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct EngineLog {
    pub known_images: Vec<String>,
    /// Tags built, in order. Length is the underlying build-call count.
    pub builds: Vec<String>,
    pub build_requests: Vec<RecordedBuild>,
    pub runs: Vec<RecordedRun>,
    pub closes: usize,
}

#[derive(Debug)]
pub struct RecordedBuild {
    pub tag: String,
    pub base_image: String,
    pub requirements: Vec<String>,
    pub options: HashMap<String, String>,
}

#[derive(Debug)]
pub struct RecordedRun {
    pub image_tag: String,
    pub command: Vec<String>,
    pub binds: Vec<String>,
    pub user: String,
    /// Script contents as observed at launch time, proving materialization
    /// preceded the launch.
    pub script_at_launch: Option<String>,
}

impl RecordedRun {
    fn host_path_for(&self, guest: &str) -> PathBuf {
        self.binds
            .iter()
            .find_map(|bind| bind.strip_suffix(&format!(":{guest}")))
            .map(PathBuf::from)
            .unwrap_or_else(|| panic!("no bind for {guest}"))
    }

    pub fn host_input_dir(&self) -> PathBuf {
        self.host_path_for(GUEST_INPUT_DIR)
    }

    pub fn host_output_file(&self) -> PathBuf {
        self.host_path_for(GUEST_OUTPUT_FILE)
    }
}

pub struct FakeEngine {
    pub log: Arc<Mutex<EngineLog>>,
    container_output: Vec<u8>,
    run_failure: Option<(Option<i64>, String)>,
    build_failure: Option<String>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(EngineLog::default())),
            container_output: Vec::new(),
            run_failure: None,
            build_failure: None,
        }
    }

    /// Bytes "the container" writes to the output bind on each run.
    pub fn with_container_output(mut self, bytes: &[u8]) -> Self {
        self.container_output = bytes.to_vec();
        self
    }

    pub fn with_run_failure(mut self, exit_code: Option<i64>, stderr: &str) -> Self {
        self.run_failure = Some((exit_code, stderr.to_string()));
        self
    }

    pub fn with_build_failure(mut self, detail: &str) -> Self {
        self.build_failure = Some(detail.to_string());
        self
    }
}

impl ContainerEngine for FakeEngine {
    async fn get_image(&self, tag: &str) -> Result<Option<ImageHandle>> {
        let log = self.log.lock().unwrap();
        Ok(log
            .known_images
            .iter()
            .any(|known| known == tag)
            .then(|| test_image(tag)))
    }

    async fn build_image(&self, build: &ImageBuild<'_>) -> Result<ImageHandle> {
        if let Some(detail) = &self.build_failure {
            return Err(Error::ImageBuildFailed {
                tag: build.tag.to_string(),
                detail: detail.clone(),
            });
        }

        let mut log = self.log.lock().unwrap();
        log.builds.push(build.tag.to_string());
        log.build_requests.push(RecordedBuild {
            tag: build.tag.to_string(),
            base_image: build.base_image.to_string(),
            requirements: build.requirements.to_vec(),
            options: build.options.clone(),
        });
        log.known_images.push(build.tag.to_string());
        Ok(test_image(build.tag))
    }

    async fn run_container(&self, run: &ContainerRun<'_>) -> Result<()> {
        let mut recorded = RecordedRun {
            image_tag: run.image.tag.clone(),
            command: run.command.clone(),
            binds: run.binds.clone(),
            user: run.user.clone(),
            script_at_launch: None,
        };
        recorded.script_at_launch =
            std::fs::read_to_string(recorded.host_input_dir().join(SCRIPT_FILENAME)).ok();

        // Simulate the executor writing the output file, then the exit.
        std::fs::write(recorded.host_output_file(), &self.container_output)?;
        self.log.lock().unwrap().runs.push(recorded);

        match &self.run_failure {
            Some((exit_code, stderr)) => Err(Error::ContainerExecutionFailed {
                exit_code: *exit_code,
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn remove_image(&self, image: &ImageHandle, _force: bool) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.known_images.retain(|known| known != &image.tag);
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}
