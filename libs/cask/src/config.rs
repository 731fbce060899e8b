//! Per-invocation configuration surface.
//!
//! `BuildSpec` and `RunSpec` parameterize the image build and the container
//! run; `InvokeOptions` bundles both with the return mode for the one-shot
//! pipeline. The `options` maps are opaque passthroughs merged into the
//! engine calls; the Docker engine interprets documented keys and ignores
//! the rest.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::output::ReturnMode;
use crate::source::FunctionSpec;

/// Default base image for built images.
pub const DEFAULT_BASE_IMAGE: &str = "python:latest";

/// Default interpreter command executed against the injected script.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Parameters for the image build step.
///
/// The image tag is the cache key. When unset, it is derived from the
/// function's name at build time, so the non-empty invariant always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSpec {
    pub image_tag: Option<String>,
    pub base_image: String,
    pub requirements: Vec<String>,
    /// Passthrough build options. The Docker engine honors `nocache`
    /// (`"true"`/`"false"`).
    pub options: HashMap<String, String>,
}

impl Default for BuildSpec {
    fn default() -> Self {
        Self {
            image_tag: None,
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            requirements: Vec::new(),
            options: HashMap::new(),
        }
    }
}

impl BuildSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_tag(mut self, tag: impl Into<String>) -> Self {
        self.image_tag = Some(tag.into());
        self
    }

    pub fn with_base_image(mut self, image: impl Into<String>) -> Self {
        self.base_image = image.into();
        self
    }

    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements = requirements.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// The tag the image will be cached under: the configured tag when one
    /// was given, the function's name otherwise.
    pub fn effective_tag(&self, function: &FunctionSpec) -> String {
        match &self.image_tag {
            Some(tag) if !tag.is_empty() => tag.clone(),
            _ => function.name().to_string(),
        }
    }
}

/// Parameters for the container run step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSpec {
    pub interpreter: String,
    /// Capture the container's stderr stream so execution failures carry it.
    pub capture_stderr: bool,
    /// Passthrough run options. The Docker engine honors `network_disabled`
    /// (`"true"`/`"false"`), `memory_bytes`, and `nano_cpus`.
    pub options: HashMap<String, String>,
}

impl Default for RunSpec {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            capture_stderr: true,
            options: HashMap::new(),
        }
    }
}

impl RunSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Full configuration for the one-shot build→run→collect→close pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokeOptions {
    pub build: BuildSpec,
    pub run: RunSpec,
    pub returning: ReturnMode,
}

impl InvokeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_tag(mut self, tag: impl Into<String>) -> Self {
        self.build.image_tag = Some(tag.into());
        self
    }

    pub fn with_base_image(mut self, image: impl Into<String>) -> Self {
        self.build.base_image = image.into();
        self
    }

    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build = self.build.with_requirements(requirements);
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.run.interpreter = interpreter.into();
        self
    }

    pub fn with_returning(mut self, returning: ReturnMode) -> Self {
        self.returning = returning;
        self
    }

    pub fn with_build_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.build.options.insert(key.into(), value.into());
        self
    }

    pub fn with_run_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.run.options.insert(key.into(), value.into());
        self
    }
}
