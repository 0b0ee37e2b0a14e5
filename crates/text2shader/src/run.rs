use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use renderer::{export_png, Canvas, ShaderWindow};
use shadergen::{CancelGuard, CancelToken, GenerateError, HttpTransport, ShaderGenerator};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;
use winit::event::{Event, StartCause, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget};

use crate::cli::Cli;
use crate::panel::ShaderPanel;
use crate::paths::AppPaths;
use crate::settings::{Job, RunOptions, Settings};

/// Pace of redraws while the displayed shader reads `u_time`.
const FRAME_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 30);

#[derive(Debug)]
pub enum UserEvent {
    /// A line typed on stdin while the window is open.
    Prompt(String),
    Generated(Result<String, GenerateError>),
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let settings_path = match cli.config.clone() {
        Some(path) => path,
        None => {
            let paths = AppPaths::discover()?;
            tracing::debug!(config = %paths.config_dir().display(), "resolved config directory");
            paths.settings_file()
        }
    };
    let settings = Settings::load_or_default(&settings_path)?;
    let options = RunOptions::resolve(cli, settings)?;
    tracing::debug!(
        settings = %settings_path.display(),
        endpoint = %options.generator.endpoint(),
        timeout = ?options.generator.timeout(),
        job = ?options.job,
        "resolved text2shader options"
    );

    let source_file = match &options.job {
        Job::File(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read shader source at {}", path.display()))?,
        ),
        _ => None,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let generator = ShaderGenerator::http(options.generator.clone())
        .context("failed to construct shader service client")?;

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event()
        .build()
        .context("failed to create event loop")?;
    let window = ShaderWindow::new(&event_loop, &options.window)?;
    let proxy = event_loop.create_proxy();

    if options.export.is_none() && matches!(options.job, Job::Default | Job::Prompt(_)) {
        spawn_prompt_reader(proxy.clone());
    }

    let mut app = App {
        panel: ShaderPanel::new(match &options.job {
            Job::Prompt(prompt) => prompt.clone(),
            _ => String::new(),
        }),
        canvas: Canvas::new(window),
        title: options.window.title.clone(),
        job: options.job,
        source_file,
        export: options.export,
        generator: Arc::new(generator),
        runtime,
        proxy,
        pending: None,
        clock: FrameClock::new(FRAME_INTERVAL),
        outcome: Ok(()),
    };

    event_loop
        .run(|event, target| app.handle(event, target))
        .context("event loop terminated abnormally")?;

    app.outcome
}

struct App {
    panel: ShaderPanel,
    canvas: Canvas<ShaderWindow>,
    title: String,
    job: Job,
    source_file: Option<String>,
    export: Option<PathBuf>,
    generator: Arc<ShaderGenerator<HttpTransport>>,
    runtime: Runtime,
    proxy: EventLoopProxy<UserEvent>,
    // Dropping the guard cancels the request it belongs to.
    pending: Option<CancelGuard>,
    clock: FrameClock,
    outcome: Result<()>,
}

impl App {
    fn handle(&mut self, event: Event<UserEvent>, target: &EventLoopWindowTarget<UserEvent>) {
        match event {
            Event::NewEvents(StartCause::Init) => self.start(target),
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    if self.pending.take().is_some() {
                        tracing::info!("window closed; cancelling shader request");
                    }
                    target.exit();
                }
                WindowEvent::Resized(size) => {
                    self.canvas.surface().resize(size);
                    self.canvas.surface().request_redraw();
                }
                WindowEvent::RedrawRequested => {
                    if self.export.is_none() {
                        self.panel.redraw(&mut self.canvas);
                    }
                }
                _ => {}
            },
            Event::UserEvent(UserEvent::Prompt(prompt)) => {
                self.panel.set_prompt(prompt);
                self.submit();
            }
            Event::UserEvent(UserEvent::Generated(result)) => {
                self.pending = None;
                self.panel.finish_generate(result, &mut self.canvas);
                self.report();
                if self.export.is_some() {
                    self.finish_export(target);
                }
            }
            Event::AboutToWait => self.schedule_frame(target),
            Event::LoopExiting => {
                self.pending = None;
                self.canvas.release();
            }
            _ => {}
        }
    }

    fn start(&mut self, target: &EventLoopWindowTarget<UserEvent>) {
        // The default stays on screen if a source file does not compile.
        self.panel.show_default(&mut self.canvas);
        if let Some(source) = self.source_file.take() {
            self.panel.render_source(source, &mut self.canvas);
            self.report();
        }

        if let Job::Prompt(_) = self.job {
            self.submit();
        } else if self.export.is_some() {
            self.finish_export(target);
        }
    }

    fn schedule_frame(&mut self, target: &EventLoopWindowTarget<UserEvent>) {
        let animate = self.export.is_none() && self.panel.is_animated();
        match self.clock.tick(animate, Instant::now()) {
            Some(Frame { due, deadline }) => {
                if due {
                    self.canvas.surface().request_redraw();
                }
                target.set_control_flow(ControlFlow::WaitUntil(deadline));
            }
            None => target.set_control_flow(ControlFlow::Wait),
        }
    }

    fn submit(&mut self) {
        let Some(prompt) = self.panel.begin_generate() else {
            tracing::warn!("a shader request is already running or the prompt is empty");
            return;
        };
        self.update_title();
        tracing::info!(prompt = %self.panel.prompt(), "generating shader");

        let token = CancelToken::new();
        let cancel = token.clone();
        let generator = Arc::clone(&self.generator);
        let proxy = self.proxy.clone();
        self.runtime.spawn(async move {
            let result = generator.generate(&prompt, &cancel).await;
            if proxy.send_event(UserEvent::Generated(result)).is_err() {
                tracing::debug!("event loop closed before the shader arrived");
            }
        });
        self.pending = Some(token.guard());
    }

    fn report(&mut self) {
        self.update_title();
        match self.panel.error() {
            Some(message) => eprintln!("{message}"),
            None => println!("{}", self.panel.shader_code()),
        }
    }

    fn update_title(&self) {
        let status = if self.panel.is_loading() {
            self.panel.button_label()
        } else if self.panel.error().is_some() {
            "error"
        } else {
            "ready"
        };
        self.canvas
            .surface()
            .window()
            .set_title(&format!("{} [{status}]", self.title));
    }

    fn finish_export(&mut self, target: &EventLoopWindowTarget<UserEvent>) {
        let Some(path) = self.export.take() else {
            return;
        };
        self.outcome = match self.panel.error() {
            Some(message) => Err(anyhow!("{message}")),
            None => export_png(&mut self.canvas, self.panel.shader_code(), &path)
                .with_context(|| format!("failed to export frame to {}", path.display())),
        };
        target.exit();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    /// A redraw should be requested now.
    due: bool,
    /// When the loop should wake up for the next frame.
    deadline: Instant,
}

/// Fixed-rate redraw schedule for animated shaders.
#[derive(Debug)]
struct FrameClock {
    interval: Duration,
    next: Option<Instant>,
}

impl FrameClock {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// Returns `None` when nothing animates, which also resets the schedule.
    fn tick(&mut self, animate: bool, now: Instant) -> Option<Frame> {
        if !animate {
            self.next = None;
            return None;
        }
        match self.next {
            Some(next) if now < next => Some(Frame {
                due: false,
                deadline: next,
            }),
            _ => {
                let deadline = now + self.interval;
                self.next = Some(deadline);
                Some(Frame {
                    due: true,
                    deadline,
                })
            }
        }
    }
}

fn spawn_prompt_reader(proxy: EventLoopProxy<UserEvent>) {
    let spawned = thread::Builder::new()
        .name("prompt-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                if proxy.send_event(UserEvent::Prompt(line)).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        tracing::warn!(error = %err, "failed to start prompt reader; stdin prompts disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_shaders_wait_for_events() {
        let mut clock = FrameClock::new(FRAME_INTERVAL);
        assert_eq!(clock.tick(false, Instant::now()), None);
    }

    #[test]
    fn animated_shaders_redraw_once_per_interval() {
        let mut clock = FrameClock::new(Duration::from_millis(10));
        let start = Instant::now();

        let first = clock.tick(true, start).unwrap();
        assert!(first.due);
        assert_eq!(first.deadline, start + Duration::from_millis(10));

        let early = clock.tick(true, start + Duration::from_millis(4)).unwrap();
        assert!(!early.due);
        assert_eq!(early.deadline, first.deadline);

        let next = clock.tick(true, start + Duration::from_millis(10)).unwrap();
        assert!(next.due);
        assert_eq!(next.deadline, start + Duration::from_millis(20));
    }

    #[test]
    fn stopping_animation_resets_schedule() {
        let mut clock = FrameClock::new(Duration::from_millis(10));
        let start = Instant::now();
        clock.tick(true, start);
        clock.tick(false, start + Duration::from_millis(1));

        let resumed = clock.tick(true, start + Duration::from_millis(2)).unwrap();
        assert!(resumed.due);
    }
}
