use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "text2shader",
    author,
    version,
    about = "Describe a shader in plain words and watch it render"
)]
pub struct Cli {
    /// What the shader should look like (e.g. "a colorful gradient that changes with time").
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Render a fragment shader from disk instead of generating one.
    #[arg(long, value_name = "FILE", conflicts_with = "prompt")]
    pub source: Option<PathBuf>,

    /// Base URL of the shader service; can also be supplied via `TEXT2SHADER_API`.
    #[arg(long, env = shadergen::ENV_ENDPOINT, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Give up on a generation request after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Window size (e.g. `800x600`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<WindowSize>,

    /// Write the first rendered frame to the provided PNG path then exit.
    #[arg(long, value_name = "PATH", value_parser = parse_export_path)]
    pub export: Option<PathBuf>,

    /// Settings file to use instead of `config.toml` in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<WindowSize, String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok(WindowSize { width, height })
}

pub fn parse_export_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => Ok(path),
        None => Err("export path has no extension; expected .png".to_string()),
        Some(other) => Err(format!(
            "unsupported export format '.{other}'; expected .png"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(
            parse_size("1280x720").unwrap(),
            WindowSize {
                width: 1280,
                height: 720
            }
        );
        assert_eq!(parse_size(" 64 X 32 ").unwrap().height, 32);
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("widexhigh").is_err());
    }

    #[test]
    fn export_requires_png() {
        assert!(parse_export_path("frame.PNG").is_ok());
        assert!(parse_export_path("frame").is_err());
        assert!(parse_export_path("frame.jpg")
            .unwrap_err()
            .contains(".jpg"));
    }

    #[test]
    fn prompt_and_source_conflict() {
        let err = Cli::try_parse_from(["text2shader", "waves", "--source", "a.frag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_full_invocation() {
        let cli = Cli::try_parse_from([
            "text2shader",
            "a red circle",
            "--endpoint",
            "http://example.test:9000",
            "--timeout",
            "5",
            "--size",
            "320x240",
            "--export",
            "out.png",
        ])
        .unwrap();
        assert_eq!(cli.prompt.as_deref(), Some("a red circle"));
        assert_eq!(cli.endpoint.as_deref(), Some("http://example.test:9000"));
        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.size.map(|size| size.width), Some(320));
        assert_eq!(cli.export, Some(PathBuf::from("out.png")));
    }
}
