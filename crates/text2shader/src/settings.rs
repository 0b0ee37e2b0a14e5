use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use renderer::WindowOptions;
use serde::{Deserialize, Serialize};
use shadergen::{GeneratorConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};

use crate::cli::Cli;

/// Optional `config.toml` contents. Every key may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub window: WindowSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        let options = WindowOptions::default();
        Self {
            title: options.title,
            width: options.width,
            height: options.height,
        }
    }
}

impl Settings {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file at {}", path.display()))?;
            let settings: Self = toml::from_str(&contents)
                .with_context(|| format!("failed to parse settings file at {}", path.display()))?;
            Ok(settings)
        } else {
            tracing::debug!(path = %path.display(), "no settings file; using defaults");
            Ok(Self::default())
        }
    }
}

/// What the window shows once it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Default,
    Prompt(String),
    File(PathBuf),
}

/// Command line and settings file merged: CLI (and its env fallbacks) win
/// over the file, the file wins over built-in defaults.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub generator: GeneratorConfig,
    pub window: WindowOptions,
    pub job: Job,
    pub export: Option<PathBuf>,
}

impl RunOptions {
    pub fn resolve(cli: Cli, settings: Settings) -> Result<Self> {
        let endpoint = cli
            .endpoint
            .filter(|value| !value.trim().is_empty())
            .or(settings.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let timeout = match cli.timeout.or(settings.timeout_secs) {
            Some(0) => bail!("request timeout must be at least one second"),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };
        let generator = GeneratorConfig::new(&endpoint)
            .context("invalid shader service endpoint")?
            .with_timeout(timeout);

        let (width, height) = match cli.size {
            Some(size) => (size.width, size.height),
            None => (settings.window.width, settings.window.height),
        };
        if width == 0 || height == 0 {
            bail!("window dimensions must be greater than zero (got {width}x{height})");
        }
        let window = WindowOptions {
            title: settings.window.title,
            width,
            height,
            visible: cli.export.is_none(),
        };

        let job = match (cli.prompt, cli.source) {
            (Some(prompt), _) if !prompt.trim().is_empty() => Job::Prompt(prompt),
            (_, Some(path)) => Job::File(path),
            _ => Job::Default,
        };

        Ok(Self {
            generator,
            window,
            job,
            export: cli.export,
        })
    }
}
