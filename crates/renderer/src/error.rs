use std::fmt;

/// The two programmable stages the pipeline compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure modes of a single render attempt.
///
/// None of these are fatal: the surface keeps showing whatever the previous
/// successful render produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("rendering context is not available on this surface")]
    ContextUnavailable,
    #[error("failed to allocate {what}: {reason}")]
    ShaderCreateFailed { what: &'static str, reason: String },
    #[error("failed to compile {stage} shader: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("failed to link shader program: {log}")]
    Link { log: String },
    #[error("failed to present frame: {0}")]
    Present(String),
}

impl RenderError {
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            RenderError::Compile { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Driver diagnostic text for compile and link failures.
    pub fn log(&self) -> Option<&str> {
        match self {
            RenderError::Compile { log, .. } | RenderError::Link { log } => Some(log.as_str()),
            _ => None,
        }
    }
}

/// Errors raised while writing a still frame to disk.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("surface reported an empty {width}x{height} frame")]
    EmptyFrame { width: u32, height: u32 },
    #[error("failed to encode frame: {0}")]
    Image(#[from] image::ImageError),
}
