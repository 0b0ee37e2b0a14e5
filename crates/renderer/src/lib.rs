//! Shader render pipeline for text2shader.
//!
//! A fragment shader arrives as plain text, gets compiled against a fixed
//! pass-through vertex stage and is drawn over a full-screen quad:
//!
//! ```text
//!   fragment text ──▶ Canvas::render ──▶ compile vertex + fragment ──▶ link
//!                                                     │
//!        present ◀── draw strip ◀── clear ◀── bind quad buffer
//! ```
//!
//! [`Canvas`] owns a [`RenderSurface`] and the quad buffer tied to its context.
//! The GL entry points live behind [`GlApi`], implemented for `glow::Context`
//! (native GL through [`ShaderWindow`], or WebGL) and, with the `testing`
//! feature, for the in-memory [`testing::FakeGl`].

mod error;
mod export;
mod gl;
mod pipeline;
mod source;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod window;

pub use error::{ExportError, RenderError, ShaderStage};
pub use export::export_png;
pub use gl::{GlApi, RenderSurface};
pub use pipeline::Canvas;
pub use source::{
    prepare_fragment, DEFAULT_FRAGMENT_SHADER, POSITION_ATTRIBUTE, PRECISION_PREAMBLE,
    QUAD_VERTICES, RESOLUTION_UNIFORM, TIME_UNIFORM, VERTEX_SHADER,
};
pub use window::{ShaderWindow, WindowOptions};
