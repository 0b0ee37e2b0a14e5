use std::num::NonZeroU32;

use anyhow::{anyhow, Context, Result};
use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasRawWindowHandle;
use tracing::{debug, info, warn};
use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoopWindowTarget;
use winit::window::{Window, WindowBuilder};

use crate::error::RenderError;
use crate::gl::RenderSurface;

/// Start-up parameters for [`ShaderWindow`].
#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "text2shader".to_string(),
            width: 800,
            height: 600,
            visible: true,
        }
    }
}

struct GlState {
    context: PossiblyCurrentContext,
    surface: Surface<WindowSurface>,
    gl: glow::Context,
}

/// Native window whose GL context backs a [`crate::Canvas`].
///
/// The window opens even when no GL context can be created; [`RenderSurface::context`]
/// then returns `None` and every render reports `ContextUnavailable`.
pub struct ShaderWindow {
    // Dropped before `window`.
    gl: Option<GlState>,
    window: Window,
}

impl ShaderWindow {
    pub fn new<T>(target: &EventLoopWindowTarget<T>, options: &WindowOptions) -> Result<Self> {
        let builder = WindowBuilder::new()
            .with_title(options.title.as_str())
            .with_inner_size(PhysicalSize::new(options.width, options.height))
            .with_visible(options.visible);
        let template = ConfigTemplateBuilder::new().with_alpha_size(8);

        let (window, config) = DisplayBuilder::new()
            .with_window_builder(Some(builder))
            .build(target, template, pick_config)
            .map_err(|err| anyhow!("failed to create window: {err}"))?;
        let window = window.ok_or_else(|| anyhow!("display builder did not create a window"))?;

        let gl = match create_gl(&window, &config) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "GL context unavailable; rendering disabled");
                None
            }
        };

        Ok(Self { gl, window })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Keeps the GL surface in step with the window size.
    pub fn resize(&self, size: PhysicalSize<u32>) {
        let (Some(state), Some(width), Some(height)) = (
            self.gl.as_ref(),
            NonZeroU32::new(size.width),
            NonZeroU32::new(size.height),
        ) else {
            return;
        };
        state.surface.resize(&state.context, width, height);
    }
}

impl RenderSurface for ShaderWindow {
    type Gl = glow::Context;

    fn context(&self) -> Option<&glow::Context> {
        self.gl.as_ref().map(|state| &state.gl)
    }

    fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let state = self.gl.as_ref().ok_or(RenderError::ContextUnavailable)?;
        state
            .surface
            .swap_buffers(&state.context)
            .map_err(|err| RenderError::Present(err.to_string()))
    }
}

fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, candidate| {
            if candidate.num_samples() > best.num_samples() {
                candidate
            } else {
                best
            }
        })
        // glutin only calls the picker with a non-empty set.
        .expect("display offered no GL configs")
}

/// Desktop GL first, GLES 2 second.
fn create_gl(window: &Window, config: &Config) -> Result<GlState> {
    let raw_window_handle = Some(window.raw_window_handle());
    let display = config.display();

    let desktop = ContextAttributesBuilder::new().build(raw_window_handle);
    let gles = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::Gles(Some(Version::new(2, 0))))
        .build(raw_window_handle);

    let not_current = match unsafe { display.create_context(config, &desktop) } {
        Ok(context) => context,
        Err(err) => {
            debug!(%err, "desktop GL context unavailable, trying GLES");
            unsafe { display.create_context(config, &gles) }
                .context("failed to create GL context")?
        }
    };

    let attributes = window.build_surface_attributes(Default::default());
    let surface = unsafe { display.create_window_surface(config, &attributes) }
        .context("failed to create GL window surface")?;
    let context = not_current
        .make_current(&surface)
        .context("failed to make GL context current")?;

    if let Err(err) = surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN)) {
        debug!(%err, "vsync not available");
    }

    // SAFETY: the context was made current on this thread above and is owned
    // by the same `GlState` as the function table, so it outlives every call.
    let gl = unsafe {
        glow::Context::from_loader_function_cstr(|symbol| display.get_proc_address(symbol).cast())
    };
    info!(samples = config.num_samples(), "created GL context");

    Ok(GlState {
        context,
        surface,
        gl,
    })
}
