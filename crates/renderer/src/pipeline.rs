//! Compiles a fragment shader against the fixed vertex stage and draws it over
//! a full-screen quad.
//!
//! Each call to [`Canvas::render`] owns every stage and program it creates and
//! releases them before returning, whatever the outcome. Nothing is cleared or
//! presented until compilation and linking have both succeeded, so a failed
//! attempt leaves the previous frame on screen.

use std::time::Instant;

use tracing::{debug, warn};

use crate::error::{RenderError, ShaderStage};
use crate::gl::{GlApi, RenderSurface};
use crate::source::{
    prepare_fragment, quad_bytes, POSITION_ATTRIBUTE, QUAD_COMPONENTS, QUAD_VERTICES,
    RESOLUTION_UNIFORM, TIME_UNIFORM, VERTEX_SHADER,
};

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

type BufferOf<S> = <<S as RenderSurface>::Gl as GlApi>::Buffer;

/// A rendering surface plus the quad buffer that lives as long as its context.
pub struct Canvas<S: RenderSurface> {
    surface: S,
    quad: Option<BufferOf<S>>,
    epoch: Instant,
    frames: u64,
}

impl<S: RenderSurface> Canvas<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            quad: None,
            epoch: Instant::now(),
            frames: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Number of frames successfully presented on this canvas.
    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    /// Compiles `fragment_source`, draws one frame and presents it.
    pub fn render(&mut self, fragment_source: &str) -> Result<(), RenderError> {
        self.draw(fragment_source, false).map(|_| ())
    }

    /// Same as [`Canvas::render`], additionally reading the drawn frame back as
    /// RGBA8 rows (bottom row first) before it is presented.
    pub fn snapshot(&mut self, fragment_source: &str) -> Result<Vec<u8>, RenderError> {
        self.draw(fragment_source, true)
            .map(|pixels| pixels.unwrap_or_default())
    }

    /// Deletes the quad buffer. The next render recreates it.
    pub fn release(&mut self) {
        if let (Some(gl), Some(quad)) = (self.surface.context(), self.quad.take()) {
            gl.delete_buffer(quad);
        }
    }

    fn draw(
        &mut self,
        fragment_source: &str,
        capture: bool,
    ) -> Result<Option<Vec<u8>>, RenderError> {
        let (width, height) = self.surface.size();
        let time = self.epoch.elapsed().as_secs_f32();
        let gl = self
            .surface
            .context()
            .ok_or(RenderError::ContextUnavailable)?;

        let program = build_program(gl, fragment_source)?;

        let quad = match self.quad {
            Some(quad) => quad,
            None => match gl.create_buffer() {
                Ok(quad) => {
                    gl.upload_array_buffer(quad, quad_bytes());
                    debug!(vertices = QUAD_VERTICES.len(), "created quad buffer");
                    self.quad = Some(quad);
                    quad
                }
                Err(reason) => {
                    gl.delete_program(program);
                    return Err(RenderError::ShaderCreateFailed {
                        what: "geometry buffer",
                        reason,
                    });
                }
            },
        };

        gl.use_program(Some(program));
        gl.bind_array_buffer(Some(quad));
        if let Some(position) = gl.attrib_location(program, POSITION_ATTRIBUTE) {
            gl.float_attrib_pointer(position, QUAD_COMPONENTS);
        } else {
            // The driver strips attributes that do not contribute to the output.
            debug!("vertex attribute `{POSITION_ATTRIBUTE}` is inactive");
        }
        if let Some(location) = gl.uniform_location(program, RESOLUTION_UNIFORM) {
            gl.uniform_vec2(&location, width as f32, height as f32);
        }
        if let Some(location) = gl.uniform_location(program, TIME_UNIFORM) {
            gl.uniform_f32(&location, time);
        }

        gl.viewport(width as i32, height as i32);
        gl.clear_color(CLEAR_COLOR);
        gl.draw_triangle_strip(0, QUAD_VERTICES.len() as i32);

        let pixels = capture.then(|| gl.read_rgba(width as i32, height as i32));

        // Still bound, so the context keeps it alive until the next program
        // replaces it; no handle escapes this call.
        gl.delete_program(program);

        self.surface.present()?;
        self.frames += 1;
        debug!(width, height, frame = self.frames, "presented shader frame");
        Ok(pixels)
    }
}

impl<S: RenderSurface> Drop for Canvas<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Compiles both stages and links them.
///
/// On success only the program remains allocated; on failure nothing does.
fn build_program<G: GlApi>(gl: &G, fragment_source: &str) -> Result<G::Program, RenderError> {
    let vertex = compile_stage(gl, ShaderStage::Vertex, VERTEX_SHADER)?;
    let prepared = prepare_fragment(fragment_source);
    let fragment = match compile_stage(gl, ShaderStage::Fragment, &prepared) {
        Ok(fragment) => fragment,
        Err(err) => {
            gl.delete_shader(vertex);
            return Err(err);
        }
    };

    let result = link_program(gl, vertex, fragment);
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);
    result
}

fn compile_stage<G: GlApi>(
    gl: &G,
    stage: ShaderStage,
    source: &str,
) -> Result<G::Shader, RenderError> {
    let shader = gl
        .create_shader(stage)
        .map_err(|reason| RenderError::ShaderCreateFailed {
            what: match stage {
                ShaderStage::Vertex => "vertex shader",
                ShaderStage::Fragment => "fragment shader",
            },
            reason,
        })?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if gl.shader_compile_status(shader) {
        return Ok(shader);
    }

    let log = gl.shader_info_log(shader);
    gl.delete_shader(shader);
    warn!(%stage, %log, "shader compilation failed");
    Err(RenderError::Compile { stage, log })
}

fn link_program<G: GlApi>(
    gl: &G,
    vertex: G::Shader,
    fragment: G::Shader,
) -> Result<G::Program, RenderError> {
    let program = gl
        .create_program()
        .map_err(|reason| RenderError::ShaderCreateFailed {
            what: "shader program",
            reason,
        })?;
    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    gl.detach_shader(program, vertex);
    gl.detach_shader(program, fragment);

    if gl.program_link_status(program) {
        return Ok(program);
    }

    let log = gl.program_info_log(program);
    gl.delete_program(program);
    warn!(%log, "shader program link failed");
    Err(RenderError::Link { log })
}
