//! Narrow immediate-mode graphics API used by the pipeline.
//!
//! [`GlApi`] lists the handful of GL entry points the pipeline touches, so the
//! pipeline can run against `glow` (native GL/GLES through `glutin`, or WebGL
//! on the web backend) as well as the in-memory double in [`crate::testing`].

use std::fmt;

use glow::HasContext;

use crate::error::{RenderError, ShaderStage};

pub trait GlApi {
    type Shader: Copy + fmt::Debug;
    type Program: Copy + fmt::Debug;
    type Buffer: Copy + fmt::Debug;
    type UniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn use_program(&self, program: Option<Self::Program>);
    fn delete_program(&self, program: Self::Program);

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    /// Binds `buffer` as the array buffer and uploads `data` with static usage.
    fn upload_array_buffer(&self, buffer: Self::Buffer, data: &[u8]);
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    /// Enables `index` and points it at tightly packed, unnormalised floats.
    fn float_attrib_pointer(&self, index: u32, components: i32);

    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn uniform_vec2(&self, location: &Self::UniformLocation, x: f32, y: f32);
    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32);

    fn viewport(&self, width: i32, height: i32);
    fn clear_color(&self, rgba: [f32; 4]);
    fn draw_triangle_strip(&self, first: i32, count: i32);
    /// Reads the current color buffer as tightly packed RGBA8 rows, bottom row first.
    fn read_rgba(&self, width: i32, height: i32) -> Vec<u8>;
}

/// A drawable target that may or may not expose a rendering context.
pub trait RenderSurface {
    type Gl: GlApi;

    /// The GL context backing this surface, or `None` when the platform could
    /// not provide one.
    fn context(&self) -> Option<&Self::Gl>;

    /// Drawable size in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Makes the frame drawn since the last call visible.
    fn present(&mut self) -> Result<(), RenderError>;
}

fn stage_enum(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

// Every method below requires the context to be current on the calling
// thread. `glow::Context` can only be built through an unsafe loader, which
// is where that contract is established (see `window::ShaderWindow`).
impl GlApi for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type UniformLocation = glow::UniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { HasContext::create_shader(self, stage_enum(stage)) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { HasContext::shader_source(self, shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::compile_shader(self, shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { HasContext::link_program(self, program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.get_program_info_log(program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { HasContext::create_buffer(self) }
    }

    fn upload_array_buffer(&self, buffer: Self::Buffer, data: &[u8]) {
        unsafe {
            self.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
        }
    }

    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>) {
        unsafe { self.bind_buffer(glow::ARRAY_BUFFER, buffer) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.get_attrib_location(program, name) }
    }

    fn float_attrib_pointer(&self, index: u32, components: i32) {
        unsafe {
            self.enable_vertex_attrib_array(index);
            self.vertex_attrib_pointer_f32(index, components, glow::FLOAT, false, 0, 0);
        }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.get_uniform_location(program, name) }
    }

    fn uniform_vec2(&self, location: &Self::UniformLocation, x: f32, y: f32) {
        unsafe { self.uniform_2_f32(Some(location), x, y) }
    }

    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32) {
        unsafe { self.uniform_1_f32(Some(location), value) }
    }

    fn viewport(&self, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, 0, 0, width, height) }
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        unsafe {
            HasContext::clear_color(self, rgba[0], rgba[1], rgba[2], rgba[3]);
            self.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn draw_triangle_strip(&self, first: i32, count: i32) {
        unsafe { self.draw_arrays(glow::TRIANGLE_STRIP, first, count) }
    }

    fn read_rgba(&self, width: i32, height: i32) -> Vec<u8> {
        let len = width.max(0) as usize * height.max(0) as usize * 4;
        let mut pixels = vec![0u8; len];
        unsafe {
            self.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            self.read_pixels(
                0,
                0,
                width,
                height,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(&mut pixels),
            );
        }
        pixels
    }
}
