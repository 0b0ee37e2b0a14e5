//! In-memory GL used by the pipeline tests and by downstream crates that
//! enable the `testing` feature.
//!
//! `FakeGl` tracks every handle it hands out and mimics the diagnostics a
//! driver produces for the two failure classes the pipeline cares about:
//! syntax errors (unbalanced braces/parentheses, missing `main`) and link
//! errors (a fragment `varying` the vertex stage never declares).

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use crate::error::{RenderError, ShaderStage};
use crate::gl::{GlApi, RenderSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FakeShader(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FakeProgram(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FakeBuffer(u32);

/// Observable side effects, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum GlEvent {
    CompileShader { stage: ShaderStage, ok: bool },
    LinkProgram { ok: bool },
    UseProgram(Option<FakeProgram>),
    UploadBuffer { bytes: usize },
    BindBuffer(Option<FakeBuffer>),
    AttribPointer { index: u32, components: i32 },
    UniformVec2(String, f32, f32),
    UniformF32(String, f32),
    Viewport(i32, i32),
    Clear([f32; 4]),
    DrawTriangleStrip { first: i32, count: i32 },
    ReadPixels { width: i32, height: i32 },
    /// A call referenced a handle that was never created or already deleted.
    InvalidHandle(&'static str),
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    source: String,
    compiled: Option<Result<(), String>>,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    attached: Vec<FakeShader>,
    linked: Option<Result<(), String>>,
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u32,
    shaders: BTreeMap<FakeShader, ShaderRecord>,
    programs: BTreeMap<FakeProgram, ProgramRecord>,
    buffers: HashSet<FakeBuffer>,
    buffers_created: usize,
    current: Option<FakeProgram>,
    compiled: Vec<(ShaderStage, String)>,
    events: Vec<GlEvent>,
}

impl FakeState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct FakeGl {
    state: RefCell<FakeState>,
    failing_stage: Cell<Option<ShaderStage>>,
    fail_programs: Cell<bool>,
    fail_buffers: Cell<bool>,
}

impl FakeGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `create_shader` for `stage` fail.
    pub fn fail_shader_creation(&self, stage: ShaderStage) {
        self.failing_stage.set(Some(stage));
    }

    pub fn fail_program_creation(&self) {
        self.fail_programs.set(true);
    }

    pub fn fail_buffer_creation(&self) {
        self.fail_buffers.set(true);
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn buffers_created(&self) -> usize {
        self.state.borrow().buffers_created
    }

    pub fn events(&self) -> Vec<GlEvent> {
        self.state.borrow().events.clone()
    }

    pub fn draw_calls(&self) -> usize {
        self.count(|event| matches!(event, GlEvent::DrawTriangleStrip { .. }))
    }

    pub fn clears(&self) -> Vec<[f32; 4]> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                GlEvent::Clear(rgba) => Some(*rgba),
                _ => None,
            })
            .collect()
    }

    pub fn invalid_handles(&self) -> usize {
        self.count(|event| matches!(event, GlEvent::InvalidHandle(_)))
    }

    /// Source text of every shader of `stage` that went through compilation.
    pub fn compiled_sources(&self, stage: ShaderStage) -> Vec<String> {
        self.state
            .borrow()
            .compiled
            .iter()
            .filter(|(compiled_stage, _)| *compiled_stage == stage)
            .map(|(_, source)| source.clone())
            .collect()
    }

    fn count(&self, predicate: impl Fn(&GlEvent) -> bool) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|event| predicate(event))
            .count()
    }

    fn record(&self, event: GlEvent) {
        self.state.borrow_mut().events.push(event);
    }
}

impl GlApi for FakeGl {
    type Shader = FakeShader;
    type Program = FakeProgram;
    type Buffer = FakeBuffer;
    type UniformLocation = String;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        if self.failing_stage.get() == Some(stage) {
            return Err(format!("out of memory allocating {stage} shader"));
        }
        let state = &mut *self.state.borrow_mut();
        let shader = FakeShader(state.next_id());
        state.shaders.insert(
            shader,
            ShaderRecord {
                stage,
                source: String::new(),
                compiled: None,
            },
        );
        Ok(shader)
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        if let Some(record) = self.state.borrow_mut().shaders.get_mut(&shader) {
            record.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        let state = &mut *self.state.borrow_mut();
        let Some(record) = state.shaders.get_mut(&shader) else {
            state.events.push(GlEvent::InvalidHandle("compile_shader"));
            return;
        };
        let result = check_syntax(&record.source);
        let stage = record.stage;
        let source = record.source.clone();
        let ok = result.is_ok();
        record.compiled = Some(result);
        state.compiled.push((stage, source));
        state.events.push(GlEvent::CompileShader { stage, ok });
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|record| matches!(record.compiled, Some(Ok(()))))
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        match self.state.borrow().shaders.get(&shader) {
            Some(ShaderRecord {
                compiled: Some(Err(log)),
                ..
            }) => log.clone(),
            _ => String::new(),
        }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        let state = &mut *self.state.borrow_mut();
        if state.shaders.remove(&shader).is_none() {
            state.events.push(GlEvent::InvalidHandle("delete_shader"));
        }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        if self.fail_programs.get() {
            return Err("out of memory allocating program".into());
        }
        let state = &mut *self.state.borrow_mut();
        let program = FakeProgram(state.next_id());
        state.programs.insert(program, ProgramRecord::default());
        Ok(program)
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        let state = &mut *self.state.borrow_mut();
        if !state.shaders.contains_key(&shader) {
            state.events.push(GlEvent::InvalidHandle("attach_shader"));
            return;
        }
        match state.programs.get_mut(&program) {
            Some(record) => record.attached.push(shader),
            None => state.events.push(GlEvent::InvalidHandle("attach_shader")),
        }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        let state = &mut *self.state.borrow_mut();
        match state.programs.get_mut(&program) {
            Some(record) => record.attached.retain(|attached| *attached != shader),
            None => state.events.push(GlEvent::InvalidHandle("detach_shader")),
        }
    }

    fn link_program(&self, program: Self::Program) {
        let state = &mut *self.state.borrow_mut();
        let Some(record) = state.programs.get(&program) else {
            state.events.push(GlEvent::InvalidHandle("link_program"));
            return;
        };

        let mut vertex = None;
        let mut fragment = None;
        for shader in &record.attached {
            if let Some(attached) = state.shaders.get(shader) {
                if !matches!(attached.compiled, Some(Ok(()))) {
                    continue;
                }
                match attached.stage {
                    ShaderStage::Vertex => vertex = Some(attached.source.clone()),
                    ShaderStage::Fragment => fragment = Some(attached.source.clone()),
                }
            }
        }

        let (result, attributes, uniforms) = match (vertex, fragment) {
            (Some(vertex), Some(fragment)) => {
                let result = check_varyings(&vertex, &fragment);
                let mut uniforms = declarations(&vertex, "uniform");
                uniforms.extend(declarations(&fragment, "uniform"));
                (result, declarations(&vertex, "attribute"), uniforms)
            }
            _ => (
                Err("error: program requires a compiled vertex and fragment shader".to_string()),
                Vec::new(),
                Vec::new(),
            ),
        };

        let ok = result.is_ok();
        if let Some(record) = state.programs.get_mut(&program) {
            record.linked = Some(result);
            record.attributes = attributes;
            record.uniforms = uniforms;
        }
        state.events.push(GlEvent::LinkProgram { ok });
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|record| matches!(record.linked, Some(Ok(()))))
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        match self.state.borrow().programs.get(&program) {
            Some(ProgramRecord {
                linked: Some(Err(log)),
                ..
            }) => log.clone(),
            _ => String::new(),
        }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        let state = &mut *self.state.borrow_mut();
        if let Some(handle) = program {
            if !state.programs.contains_key(&handle) {
                state.events.push(GlEvent::InvalidHandle("use_program"));
                return;
            }
        }
        state.current = program;
        state.events.push(GlEvent::UseProgram(program));
    }

    fn delete_program(&self, program: Self::Program) {
        let state = &mut *self.state.borrow_mut();
        if state.programs.remove(&program).is_none() {
            state.events.push(GlEvent::InvalidHandle("delete_program"));
        }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        if self.fail_buffers.get() {
            return Err("out of memory allocating buffer".into());
        }
        let state = &mut *self.state.borrow_mut();
        let buffer = FakeBuffer(state.next_id());
        state.buffers.insert(buffer);
        state.buffers_created += 1;
        Ok(buffer)
    }

    fn upload_array_buffer(&self, buffer: Self::Buffer, data: &[u8]) {
        let state = &mut *self.state.borrow_mut();
        if !state.buffers.contains(&buffer) {
            state.events.push(GlEvent::InvalidHandle("upload_array_buffer"));
            return;
        }
        state.events.push(GlEvent::BindBuffer(Some(buffer)));
        state.events.push(GlEvent::UploadBuffer { bytes: data.len() });
    }

    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>) {
        let state = &mut *self.state.borrow_mut();
        if let Some(handle) = buffer {
            if !state.buffers.contains(&handle) {
                state.events.push(GlEvent::InvalidHandle("bind_array_buffer"));
                return;
            }
        }
        state.events.push(GlEvent::BindBuffer(buffer));
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        let state = &mut *self.state.borrow_mut();
        if !state.buffers.remove(&buffer) {
            state.events.push(GlEvent::InvalidHandle("delete_buffer"));
        }
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let record = state.programs.get(&program)?;
        record
            .attributes
            .iter()
            .position(|attribute| attribute == name)
            .map(|index| index as u32)
    }

    fn float_attrib_pointer(&self, index: u32, components: i32) {
        self.record(GlEvent::AttribPointer { index, components });
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        let state = self.state.borrow();
        let record = state.programs.get(&program)?;
        record
            .uniforms
            .iter()
            .find(|uniform| *uniform == name)
            .cloned()
    }

    fn uniform_vec2(&self, location: &Self::UniformLocation, x: f32, y: f32) {
        self.record(GlEvent::UniformVec2(location.clone(), x, y));
    }

    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32) {
        self.record(GlEvent::UniformF32(location.clone(), value));
    }

    fn viewport(&self, width: i32, height: i32) {
        self.record(GlEvent::Viewport(width, height));
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.record(GlEvent::Clear(rgba));
    }

    fn draw_triangle_strip(&self, first: i32, count: i32) {
        let current = self.state.borrow().current;
        if current.is_none() {
            self.record(GlEvent::InvalidHandle("draw_triangle_strip"));
            return;
        }
        self.record(GlEvent::DrawTriangleStrip { first, count });
    }

    fn read_rgba(&self, width: i32, height: i32) -> Vec<u8> {
        self.record(GlEvent::ReadPixels { width, height });
        let [r, g, b, a] = self.clears().last().copied().unwrap_or([0.0; 4]);
        let texel = [r, g, b, a].map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8);
        let count = width.max(0) as usize * height.max(0) as usize;
        texel.repeat(count)
    }
}

/// Emulates the compiler's syntax pass.
fn check_syntax(source: &str) -> Result<(), String> {
    let mut depth_brace = 0i32;
    let mut depth_paren = 0i32;
    let mut last_line = 1;
    for (index, line) in source.lines().enumerate() {
        last_line = index + 1;
        for ch in line.chars() {
            match ch {
                '{' => depth_brace += 1,
                '}' => depth_brace -= 1,
                '(' => depth_paren += 1,
                ')' => depth_paren -= 1,
                _ => {}
            }
            if depth_brace < 0 || depth_paren < 0 {
                return Err(format!("ERROR: 0:{last_line}: '{ch}' : syntax error"));
            }
        }
    }
    if depth_brace != 0 || depth_paren != 0 {
        return Err(format!(
            "ERROR: 0:{last_line}: '' : syntax error: unexpected end of file"
        ));
    }
    if !source.contains("main") {
        return Err("ERROR: 0:1: 'main' : function not defined".to_string());
    }
    Ok(())
}

/// Every fragment `varying` must be declared by the vertex stage.
fn check_varyings(vertex: &str, fragment: &str) -> Result<(), String> {
    let produced = declarations(vertex, "varying");
    let missing: Vec<String> = declarations(fragment, "varying")
        .into_iter()
        .filter(|name| !produced.contains(name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing
            .iter()
            .map(|name| format!("error: varying `{name}` is not written by the vertex shader"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Names declared as `<qualifier> [precision] <type> <name>;` at line start.
fn declarations(source: &str, qualifier: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let rest = line.trim_start().strip_prefix(qualifier)?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let declaration = rest.split(';').next()?;
            let name = declaration.split_whitespace().last()?;
            let name = name.split('[').next().unwrap_or(name);
            Some(name.to_string())
        })
        .collect()
}

/// Surface backed by [`FakeGl`], counting presented frames.
#[derive(Debug)]
pub struct FakeSurface {
    gl: Option<FakeGl>,
    size: (u32, u32),
    presented: u64,
    fail_present: Option<String>,
}

impl FakeSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            gl: Some(FakeGl::new()),
            size: (width, height),
            presented: 0,
            fail_present: None,
        }
    }

    /// A surface on which acquiring a context fails.
    pub fn without_context(width: u32, height: u32) -> Self {
        Self {
            gl: None,
            ..Self::new(width, height)
        }
    }

    pub fn gl(&self) -> Option<&FakeGl> {
        self.gl.as_ref()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    pub fn fail_next_present(&mut self, reason: impl Into<String>) {
        self.fail_present = Some(reason.into());
    }
}

impl RenderSurface for FakeSurface {
    type Gl = FakeGl;

    fn context(&self) -> Option<&FakeGl> {
        self.gl.as_ref()
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn present(&mut self) -> Result<(), RenderError> {
        if let Some(reason) = self.fail_present.take() {
            return Err(RenderError::Present(reason));
        }
        self.presented += 1;
        Ok(())
    }
}
