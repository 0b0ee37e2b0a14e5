//! State behind the prompt / preview panel.
//!
//! The panel never aborts on a failure: generation and compile errors become a
//! message for the user while the canvas keeps the last frame that rendered.

use renderer::{Canvas, RenderSurface, DEFAULT_FRAGMENT_SHADER, TIME_UNIFORM};
use shadergen::GenerateError;
use tracing::{info, warn};

pub const GENERATE_FAILED: &str = "Failed to generate shader";
pub const GENERATE_LABEL: &str = "Generate Shader";
pub const GENERATING_LABEL: &str = "Generating...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPanel {
    prompt: String,
    shader_code: String,
    is_loading: bool,
    error: Option<String>,
    // Set while `error` describes a failed redraw of the displayed source.
    redraw_failed: bool,
}

impl Default for ShaderPanel {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            shader_code: DEFAULT_FRAGMENT_SHADER.to_string(),
            is_loading: false,
            error: None,
            redraw_failed: false,
        }
    }
}

impl ShaderPanel {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Source currently on screen, exactly as it was received.
    pub fn shader_code(&self) -> &str {
        &self.shader_code
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the displayed source reads the time uniform and so changes
    /// from frame to frame.
    pub fn is_animated(&self) -> bool {
        self.shader_code.contains(TIME_UNIFORM)
    }

    pub fn can_submit(&self) -> bool {
        !self.is_loading && !self.prompt.trim().is_empty()
    }

    pub fn button_label(&self) -> &'static str {
        if self.is_loading {
            GENERATING_LABEL
        } else {
            GENERATE_LABEL
        }
    }

    /// Marks a request as in flight and hands back the prompt to send, or
    /// `None` when submitting is not allowed right now.
    pub fn begin_generate(&mut self) -> Option<String> {
        if !self.can_submit() {
            return None;
        }
        self.error = None;
        self.redraw_failed = false;
        self.is_loading = true;
        Some(self.prompt.clone())
    }

    /// Applies the outcome of a request started with [`ShaderPanel::begin_generate`].
    pub fn finish_generate<S: RenderSurface>(
        &mut self,
        result: Result<String, GenerateError>,
        canvas: &mut Canvas<S>,
    ) {
        self.is_loading = false;
        match result {
            Ok(source) => {
                self.render_source(source, canvas);
            }
            Err(err) if err.is_cancelled() => {
                info!("shader request cancelled; keeping current shader");
            }
            Err(err) => {
                warn!(error = %err, "shader generation failed");
                self.error = Some(GENERATE_FAILED.to_string());
            }
        }
    }

    /// Renders the built-in gradient and makes it the displayed source.
    pub fn show_default<S: RenderSurface>(&mut self, canvas: &mut Canvas<S>) -> bool {
        self.render_source(DEFAULT_FRAGMENT_SHADER.to_string(), canvas)
    }

    /// Renders `source`; on success it replaces the displayed source, on
    /// failure the previous source and frame stay and the error is recorded.
    pub fn render_source<S: RenderSurface>(
        &mut self,
        source: String,
        canvas: &mut Canvas<S>,
    ) -> bool {
        match canvas.render(&source) {
            Ok(()) => {
                info!(bytes = source.len(), "shader rendered");
                self.shader_code = source;
                self.error = None;
                self.redraw_failed = false;
                true
            }
            Err(err) => {
                warn!(error = %err, "shader did not render");
                self.error = Some(format!("Failed to compile shader: {err}"));
                self.redraw_failed = false;
                false
            }
        }
    }

    /// Draws the displayed source again, after a resize or for the next
    /// animation frame. A successful redraw clears an error left by an
    /// earlier failed redraw, but not a generation or compile error.
    pub fn redraw<S: RenderSurface>(&mut self, canvas: &mut Canvas<S>) {
        match canvas.render(&self.shader_code) {
            Ok(()) => {
                if self.redraw_failed {
                    self.redraw_failed = false;
                    self.error = None;
                }
            }
            Err(err) => {
                if !self.redraw_failed {
                    warn!(error = %err, "redraw failed");
                }
                self.error = Some(format!("Failed to compile shader: {err}"));
                self.redraw_failed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::testing::{FakeSurface, GlEvent};
    use shadergen::testing::{Reply, StubTransport};
    use shadergen::{CancelToken, GeneratorConfig, ShaderGenerator};

    const RED_CIRCLE: &str = r"uniform vec2 u_resolution;

void main() {
    vec2 uv = gl_FragCoord.xy / u_resolution;
    float d = distance(uv, vec2(0.5));
    gl_FragColor = d < 0.25 ? vec4(1.0, 0.0, 0.0, 1.0) : vec4(0.0, 0.0, 0.0, 1.0);
}
";

    fn canvas() -> Canvas<FakeSurface> {
        Canvas::new(FakeSurface::new(64, 48))
    }

    async fn generate(reply: Reply, prompt: &str) -> Result<String, GenerateError> {
        let config = GeneratorConfig::new("http://shaders.test").unwrap();
        let generator = ShaderGenerator::new(config, StubTransport::new(reply));
        generator.generate(prompt, &CancelToken::new()).await
    }

    #[test]
    fn submit_is_gated_on_prompt_and_loading() {
        let mut panel = ShaderPanel::default();
        assert!(!panel.can_submit());
        assert_eq!(panel.begin_generate(), None);

        panel.set_prompt("  ");
        assert!(!panel.can_submit());

        panel.set_prompt("plasma");
        assert!(panel.can_submit());
        assert_eq!(panel.button_label(), "Generate Shader");

        assert_eq!(panel.begin_generate().as_deref(), Some("plasma"));
        assert!(panel.is_loading());
        assert!(!panel.can_submit());
        assert_eq!(panel.button_label(), "Generating...");
        assert_eq!(panel.begin_generate(), None);
    }

    #[test]
    fn shows_default_shader_at_start() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::default();

        assert!(panel.show_default(&mut canvas));

        assert_eq!(panel.shader_code(), DEFAULT_FRAGMENT_SHADER);
        assert_eq!(canvas.frames_presented(), 1);
        assert_eq!(panel.error(), None);
    }

    #[tokio::test]
    async fn red_circle_prompt_renders_generated_source() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::new("a red circle in the middle");
        panel.show_default(&mut canvas);

        let prompt = panel.begin_generate().unwrap();
        let result = generate(Reply::shader(RED_CIRCLE), &prompt).await;
        panel.finish_generate(result, &mut canvas);

        assert!(!panel.is_loading());
        assert_eq!(panel.error(), None);
        assert_eq!(panel.shader_code(), RED_CIRCLE);
        assert_eq!(canvas.frames_presented(), 2);
        let gl = canvas.surface().gl().unwrap();
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.live_programs(), 0);
    }

    #[tokio::test]
    async fn network_failure_keeps_canvas() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::new("waves");
        panel.show_default(&mut canvas);

        panel.begin_generate();
        let result = generate(Reply::Fail("connection refused".into()), "waves").await;
        panel.finish_generate(result, &mut canvas);

        assert_eq!(panel.error(), Some("Failed to generate shader"));
        assert!(!panel.is_loading());
        assert_eq!(panel.shader_code(), DEFAULT_FRAGMENT_SHADER);
        assert_eq!(canvas.frames_presented(), 1);
    }

    #[tokio::test]
    async fn empty_shader_list_is_a_generation_failure() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::new("waves");
        panel.show_default(&mut canvas);

        panel.begin_generate();
        let result = generate(Reply::json(200, r#"{"shader_code": []}"#), "waves").await;
        assert!(matches!(result, Err(GenerateError::EmptyResponse)));
        panel.finish_generate(result, &mut canvas);

        assert_eq!(panel.error(), Some("Failed to generate shader"));
        assert_eq!(canvas.frames_presented(), 1);
        assert_eq!(canvas.surface().gl().unwrap().draw_calls(), 1);
    }

    #[tokio::test]
    async fn compile_failure_keeps_last_good_shader() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::new("broken");
        panel.render_source(RED_CIRCLE.to_string(), &mut canvas);

        panel.begin_generate();
        let result = generate(Reply::shader("void main() {"), "broken").await;
        panel.finish_generate(result, &mut canvas);

        let error = panel.error().unwrap();
        assert!(error.starts_with("Failed to compile shader: "));
        assert!(error.contains("fragment"));
        assert_eq!(panel.shader_code(), RED_CIRCLE);
        assert_eq!(canvas.frames_presented(), 1);
        assert!(!panel.is_loading());
    }

    #[test]
    fn cancelled_request_sets_no_error() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::new("waves");
        panel.begin_generate();

        panel.finish_generate(Err(GenerateError::Cancelled), &mut canvas);

        assert!(!panel.is_loading());
        assert_eq!(panel.error(), None);
    }

    #[test]
    fn new_request_clears_previous_error() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::new("waves");
        panel.begin_generate();
        panel.finish_generate(Err(GenerateError::Status(502)), &mut canvas);
        assert!(panel.error().is_some());

        panel.begin_generate();
        assert_eq!(panel.error(), None);
    }

    #[test]
    fn missing_context_is_reported() {
        let mut canvas = Canvas::new(FakeSurface::without_context(64, 48));
        let mut panel = ShaderPanel::default();

        assert!(!panel.show_default(&mut canvas));
        assert!(panel.error().unwrap().contains("not available"));
    }

    #[test]
    fn default_shader_is_animated() {
        let mut panel = ShaderPanel::default();
        assert!(panel.is_animated());

        let mut canvas = canvas();
        panel.render_source(RED_CIRCLE.to_string(), &mut canvas);
        assert!(!panel.is_animated());
    }

    #[test]
    fn successive_redraws_advance_time() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::default();
        panel.show_default(&mut canvas);
        std::thread::sleep(std::time::Duration::from_millis(20));
        panel.redraw(&mut canvas);

        let times: Vec<f32> = canvas
            .surface()
            .gl()
            .unwrap()
            .events()
            .into_iter()
            .filter_map(|event| match event {
                GlEvent::UniformF32(name, value) if name == "u_time" => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(times.len(), 2);
        assert!(times[1] > times[0]);
    }

    #[test]
    fn failed_source_falls_back_to_default_on_screen() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::default();
        panel.show_default(&mut canvas);

        assert!(!panel.render_source("void main() {".to_string(), &mut canvas));

        assert_eq!(panel.shader_code(), DEFAULT_FRAGMENT_SHADER);
        assert_eq!(canvas.frames_presented(), 1);
        assert!(panel.error().is_some());

        // A redraw keeps the compile error of the rejected source visible.
        panel.redraw(&mut canvas);
        assert!(panel.error().unwrap().starts_with("Failed to compile shader"));
        assert_eq!(canvas.frames_presented(), 2);
    }

    #[test]
    fn successful_redraw_clears_redraw_error() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::default();
        panel.show_default(&mut canvas);
        canvas.surface_mut().fail_next_present("surface lost");

        panel.redraw(&mut canvas);
        assert!(panel.error().unwrap().contains("surface lost"));

        panel.redraw(&mut canvas);
        assert_eq!(panel.error(), None);
    }

    #[test]
    fn redraw_keeps_generation_error() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::new("waves");
        panel.show_default(&mut canvas);
        panel.begin_generate();
        panel.finish_generate(Err(GenerateError::Status(500)), &mut canvas);

        panel.redraw(&mut canvas);

        assert_eq!(panel.error(), Some("Failed to generate shader"));
    }

    #[test]
    fn redraw_uses_displayed_source() {
        let mut canvas = canvas();
        let mut panel = ShaderPanel::default();
        panel.render_source(RED_CIRCLE.to_string(), &mut canvas);
        canvas.surface_mut().resize(128, 96);

        panel.redraw(&mut canvas);

        assert_eq!(canvas.frames_presented(), 2);
        let sources = canvas
            .surface()
            .gl()
            .unwrap()
            .compiled_sources(renderer::ShaderStage::Fragment);
        assert!(sources.iter().all(|source| source.ends_with(RED_CIRCLE)));
    }
}
