use std::borrow::Cow;

/// Pass-through vertex stage: the quad is already in clip space.
pub const VERTEX_SHADER: &str = r"attribute vec4 position;

void main() {
    gl_Position = position;
}
";

/// Name of the single vertex attribute fed by the quad buffer.
pub const POSITION_ATTRIBUTE: &str = "position";

/// Surface size in pixels, set when the fragment stage declares it.
pub const RESOLUTION_UNIFORM: &str = "u_resolution";

/// Seconds since the canvas was created, set when the fragment stage declares it.
pub const TIME_UNIFORM: &str = "u_time";

/// Prepended to fragment sources that do not pick a float precision.
///
/// GLSL ES rejects float math in fragment shaders without a default
/// precision, while desktop GLSL does not know the qualifier at all, hence
/// the `GL_ES` guard.
pub const PRECISION_PREAMBLE: &str = "#ifdef GL_ES\nprecision mediump float;\n#endif\n\n";

/// Animated gradient shown before anything has been generated.
pub const DEFAULT_FRAGMENT_SHADER: &str = r"#ifdef GL_ES
precision mediump float;
#endif

uniform vec2 u_resolution;
uniform float u_time;

void main() {
    vec2 uv = gl_FragCoord.xy / u_resolution.xy;
    gl_FragColor = vec4(uv.x, uv.y, 0.5 + 0.5 * sin(u_time), 1.0);
}
";

/// Full-screen quad drawn as a triangle strip.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Floats per vertex in [`QUAD_VERTICES`].
pub const QUAD_COMPONENTS: i32 = 2;

pub(crate) fn quad_bytes() -> &'static [u8] {
    bytemuck::cast_slice(&QUAD_VERTICES)
}

/// Returns the text handed to the driver for a user fragment shader.
///
/// The caller's source is never rewritten; only the compiled copy gains the
/// [`PRECISION_PREAMBLE`] when no precision statement is present. A leading
/// `#version` directive stays the first line.
pub fn prepare_fragment(source: &str) -> Cow<'_, str> {
    if source.contains("precision") {
        return Cow::Borrowed(source);
    }
    match version_directive_end(source) {
        Some(end) => {
            let (directive, body) = source.split_at(end);
            let separator = if directive.ends_with('\n') { "" } else { "\n" };
            Cow::Owned(format!("{directive}{separator}{PRECISION_PREAMBLE}{body}"))
        }
        None => Cow::Owned(format!("{PRECISION_PREAMBLE}{source}")),
    }
}

/// Byte offset just past a leading `#version` line, if there is one.
fn version_directive_end(source: &str) -> Option<usize> {
    let leading = source.len() - source.trim_start().len();
    let rest = &source[leading..];
    if !rest.starts_with("#version") {
        return None;
    }
    Some(match rest.find('\n') {
        Some(newline) => leading + newline + 1,
        None => source.len(),
    })
}
