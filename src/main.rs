//! coordcraft: Minecraft coordinate visualizer
//!
//! Paste coordinate text, see it as a 3D scene of points, paths and claimed
//! chunks, and save it to (or load it from) the coordinate-set server.
//!
//! Uses vello/wgpu for rendering and reqwest on a tokio runtime for the
//! persistence API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use vello::peniko::color::palette;
use vello::util::{RenderContext, RenderSurface};
use vello::{AaConfig, Renderer, RendererOptions, Scene};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Fullscreen, Window};

use vello::wgpu;

use coordcraft::api::{PersistenceClient, TokioDispatcher};
use coordcraft::config::Settings;
use coordcraft::controller::{Controller, UpdateOutcome};
use coordcraft::draw::VelloBackend;
use coordcraft::error::ControllerError;
use coordcraft::hud::{self, Hud};
use coordcraft::logging;
use coordcraft::paths::AppPaths;
use coordcraft::scene::{DragMode, DrawBackend, SceneRenderer, Viewport};
use coordcraft::stash::TextStash;

/// Pointer travel (pixels) below which a press/release counts as a click.
const CLICK_SLOP: f32 = 4.0;
/// Wheel pixels per zoom step for touchpads.
const PIXELS_PER_STEP: f32 = 50.0;

/// Minecraft coordinate visualizer
#[derive(Parser, Debug)]
#[command(name = "coordcraft", version, about = "Minecraft coordinate visualizer")]
struct Args {
    /// Coordinate text file to open at startup
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Base URL of the persistence API (overrides the config file)
    #[arg(long)]
    api: Option<String>,

    /// Session cookie for the persistence API, e.g. "PHPSESSID=..."
    #[arg(long)]
    cookie: Option<String>,

    /// Sample mode: no saving or loading of coordinate sets
    #[arg(long)]
    sample: bool,

    /// Config file (defaults to ~/.config/coordcraft/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name to save the coordinates under
    #[arg(long)]
    set_name: Option<String>,

    /// Start in windowed mode instead of fullscreen
    #[arg(short, long)]
    windowed: bool,
}

#[derive(Debug)]
enum RenderState {
    Active {
        surface: Box<RenderSurface<'static>>,
        valid_surface: bool,
        window: Arc<Window>,
    },
    Suspended(Option<Arc<Window>>),
}

/// Where typed characters go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Commands,
    SetName,
}

struct App {
    context: RenderContext,
    renderers: Vec<Option<Renderer>>,
    state: RenderState,
    scene: Scene,
    controller: Controller<TokioDispatcher>,
    backend: VelloBackend,
    hud: Hud,
    clipboard: Option<arboard::Clipboard>,
    /// Sample-mode text is stashed here on exit for the next signed-in run.
    stash: Option<TextStash>,
    windowed: bool,
    focus: Focus,
    modifiers: ModifiersState,
    cursor: (f32, f32),
    /// Left-button press position while waiting to tell a click from a drag.
    press: Option<(f32, f32)>,
}

impl App {
    fn shortcut(&self) -> bool {
        self.modifiers.control_key() || self.modifiers.super_key()
    }

    fn paste(&mut self) {
        let Some(clipboard) = self.clipboard.as_mut() else {
            warn!(target: "app", "Clipboard unavailable");
            return;
        };
        match clipboard.get_text() {
            Ok(text) => {
                self.controller.set_text(text);
                report(self.controller.parse_and_render());
                self.stash_text();
            }
            Err(e) => warn!(target: "app", "Clipboard read failed: {}", e),
        }
    }

    fn copy(&mut self) {
        let text = self.controller.text().to_string();
        if let Some(clipboard) = self.clipboard.as_mut() {
            if let Err(e) = clipboard.set_text(text) {
                warn!(target: "app", "Clipboard write failed: {}", e);
            }
        }
    }

    fn stash_text(&self) {
        if let Some(stash) = &self.stash {
            if let Err(e) = stash.save(self.controller.text()) {
                warn!(target: "app", "Could not stash text: {:#}", e);
            }
        }
    }

    fn handle_name_key(&mut self, key: &Key) {
        match key {
            Key::Named(NamedKey::Enter) => {
                let name = self.controller.set_name().to_string();
                report(self.controller.request_save(&name));
                self.focus = Focus::Commands;
            }
            Key::Named(NamedKey::Escape) => self.focus = Focus::Commands,
            Key::Named(NamedKey::Backspace) => {
                let mut name = self.controller.set_name().to_string();
                name.pop();
                self.controller.set_set_name(name);
            }
            Key::Named(NamedKey::Space) => {
                let name = format!("{} ", self.controller.set_name());
                self.controller.set_set_name(name);
            }
            Key::Character(c) => {
                let name = format!("{}{}", self.controller.set_name(), c.as_str());
                self.controller.set_set_name(name);
            }
            _ => {}
        }
    }

    /// Returns `false` when the app should exit.
    fn handle_command_key(&mut self, key: &Key) -> bool {
        let view = self.controller.view();
        match key {
            Key::Named(NamedKey::Escape) => return false,
            Key::Named(NamedKey::Enter) => report(self.controller.parse_and_render()),
            Key::Named(NamedKey::Delete) => self.controller.clear(),
            Key::Character(s) => match s.as_str().to_ascii_lowercase().as_str() {
                "v" if self.shortcut() => self.paste(),
                "c" if self.shortcut() => self.copy(),
                "p" => report(self.controller.set_connect_path(!view.connect_path)),
                "f" => report(self.controller.set_flatten(!view.flatten)),
                "k" => self.controller.set_chunk_claim(!view.chunk_claim),
                "t" => self.controller.top_view(),
                "r" => self.controller.reset_view(),
                "s" => self.focus = Focus::SetName,
                "u" => match self.controller.request_update() {
                    Ok(UpdateOutcome::NeedsConfirmation { message }) => {
                        info!(target: "app", "{}", message)
                    }
                    other => report(other),
                },
                "y" => report(self.controller.confirm_update()),
                "n" => self.controller.cancel_update(),
                "o" => self.controller.cycle_set(1),
                "l" => report(self.controller.load_selected_set()),
                "[" => report(self.controller.cycle_curve(-1)),
                "]" => report(self.controller.cycle_curve(1)),
                "x" => report(self.controller.delete_current_curve()),
                "g" => report(self.controller.stash_for_sign_in()),
                _ => {}
            },
            _ => {}
        }
        true
    }

    fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        let (x, y) = self.cursor;
        let renderer = self.controller.renderer_mut();
        match (button, state) {
            (MouseButton::Left, ElementState::Pressed) => {
                self.press = Some((x, y));
                renderer.pointer_down(DragMode::Rotate, x, y);
            }
            (MouseButton::Right, ElementState::Pressed) => {
                renderer.pointer_down(DragMode::Pan, x, y);
            }
            (MouseButton::Left, ElementState::Released) => {
                renderer.pointer_up();
                if let Some((px, py)) = self.press.take() {
                    if (x - px).hypot(y - py) < CLICK_SLOP {
                        self.controller.click_claim(x, y);
                    }
                }
            }
            (_, ElementState::Released) => renderer.pointer_up(),
            _ => {}
        }
    }

    fn render(&mut self) {
        let RenderState::Active {
            surface,
            valid_surface,
            window,
        } = &mut self.state
        else {
            return;
        };
        if !*valid_surface {
            return;
        }

        for envelope in self.controller.dispatcher().drain() {
            self.controller.handle_envelope(envelope);
        }
        self.controller.renderer_mut().tick();

        self.scene.reset();
        let renderer = self.controller.renderer();
        self.backend.draw(
            &mut self.scene,
            renderer.graph(),
            renderer.camera(),
            renderer.viewport(),
        );
        self.hud
            .draw(&mut self.scene, &self.controller, surface.config.height as f64);

        let device_handle = &self.context.devices[surface.dev_id];
        let Some(vello_renderer) = self.renderers[surface.dev_id].as_mut() else {
            return;
        };
        if let Err(e) = vello_renderer.render_to_texture(
            &device_handle.device,
            &device_handle.queue,
            &self.scene,
            &surface.target_view,
            &vello::RenderParams {
                base_color: palette::css::BLACK,
                width: surface.config.width,
                height: surface.config.height,
                antialiasing_method: AaConfig::Msaa16,
            },
        ) {
            error!(target: "app", "Failed to render scene: {}", e);
            return;
        }

        let surface_texture = match surface.surface.get_current_texture() {
            Ok(t) => t,
            Err(e) => {
                warn!(target: "app", "Failed to get surface texture: {}", e);
                return;
            }
        };

        let mut encoder =
            device_handle
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Surface Blit"),
                });
        surface.blitter.copy(
            &device_handle.device,
            &mut encoder,
            &surface.target_view,
            &surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
        );
        device_handle.queue.submit([encoder.finish()]);
        surface_texture.present();
        let _ = device_handle.device.poll(wgpu::PollType::Poll);

        window.request_redraw();
    }
}

/// Failures are already on the status lines; just note them in the log.
fn report<T>(result: Result<T, ControllerError>) {
    if let Err(e) = result {
        debug!(target: "app", "{}", e);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let RenderState::Suspended(cached_window) = &mut self.state else {
            return;
        };

        let window = match cached_window.take() {
            Some(w) => w,
            None => match create_window(event_loop, self.windowed) {
                Ok(w) => w,
                Err(e) => {
                    error!(target: "app", "{:#}", e);
                    event_loop.exit();
                    return;
                }
            },
        };

        let size = window.inner_size();
        let surface_future = self.context.create_surface(
            window.clone(),
            size.width,
            size.height,
            wgpu::PresentMode::AutoVsync,
        );
        let surface = match pollster::block_on(surface_future) {
            Ok(s) => s,
            Err(e) => {
                error!(target: "app", "Error creating surface: {}", e);
                event_loop.exit();
                return;
            }
        };

        self.renderers
            .resize_with(self.context.devices.len(), || None);
        if self.renderers[surface.dev_id].is_none() {
            match create_renderer(&self.context, &surface) {
                Ok(r) => self.renderers[surface.dev_id] = Some(r),
                Err(e) => {
                    error!(target: "app", "{:#}", e);
                    event_loop.exit();
                    return;
                }
            }
        }

        self.controller
            .renderer_mut()
            .resize(Viewport::new(size.width as f32, size.height as f32));

        self.state = RenderState::Active {
            surface: Box::new(surface),
            valid_surface: true,
            window,
        };
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let RenderState::Active { window, .. } = &self.state {
            self.state = RenderState::Suspended(Some(window.clone()));
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match &self.state {
            RenderState::Active { window, .. } if window.id() == window_id => {}
            _ => return,
        }

        match event {
            WindowEvent::CloseRequested => {
                self.stash_text();
                event_loop.exit();
            }

            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match self.focus {
                Focus::SetName => self.handle_name_key(&logical_key),
                Focus::Commands => {
                    if !self.handle_command_key(&logical_key) {
                        self.stash_text();
                        event_loop.exit();
                    }
                }
            },

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                let (x, y) = self.cursor;
                self.controller.renderer_mut().pointer_moved(x, y);
                self.controller.pointer_moved(x, y);
            }

            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_mouse_button(button, state)
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_STEP,
                };
                self.controller.renderer_mut().wheel(steps);
            }

            WindowEvent::Resized(size) => {
                let RenderState::Active {
                    surface,
                    valid_surface,
                    ..
                } = &mut self.state
                else {
                    return;
                };
                if size.width != 0 && size.height != 0 {
                    self.context
                        .resize_surface(surface, size.width, size.height);
                    *valid_surface = true;
                    self.controller
                        .renderer_mut()
                        .resize(Viewport::new(size.width as f32, size.height as f32));
                } else {
                    *valid_surface = false;
                }
            }

            WindowEvent::RedrawRequested => self.render(),

            _ => {}
        }
    }
}

fn load_settings(args: &Args, paths: Option<&AppPaths>) -> Result<Settings> {
    let mut settings = match (&args.config, paths) {
        (Some(path), _) => Settings::load(path)?,
        (None, Some(paths)) => Settings::load(&paths.config_file())?,
        (None, None) => Settings::default(),
    };
    if let Some(api) = &args.api {
        settings.api.base_url = api.clone();
    }
    if let Some(cookie) = &args.cookie {
        settings.api.session_cookie = Some(cookie.clone());
    }
    if args.sample {
        settings.app.allow_persistence = false;
    }
    Ok(settings)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let paths = AppPaths::resolve();
    if let Some(p) = &paths {
        if let Err(e) = p.ensure() {
            eprintln!("Could not create app directories: {e}");
        }
    }
    let _log_guard = logging::init(paths.as_ref().map(|p| p.logs.clone()));

    let settings = load_settings(&args, paths.as_ref())?;
    info!(
        target: "app",
        version = env!("CARGO_PKG_VERSION"),
        api = %settings.api.base_url,
        persistence = settings.app.allow_persistence,
        "Starting coordcraft"
    );

    // Tokio runtime for persistence requests
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let client = PersistenceClient::new(settings.api.clone())?;
    let dispatcher = TokioDispatcher::new(runtime.handle().clone(), client);

    let mut renderer = SceneRenderer::new(&settings);
    renderer.initialize(Viewport::default());
    let mut controller = Controller::new(&settings, renderer, dispatcher);

    let stash = paths
        .as_ref()
        .map(|p| TextStash::new(p.stash_file(), settings.app.stash_max_age_hours));
    if settings.app.allow_persistence {
        if let Some(text) = stash.as_ref().and_then(TextStash::take) {
            controller.restore(text);
        }
    }

    if let Some(input) = &args.input {
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        controller.set_text(text);
        report(controller.parse_and_render());
    }
    if let Some(name) = &args.set_name {
        controller.set_set_name(name.clone());
    }
    controller.bootstrap();

    let font = hud::load_hud_font();
    if font.is_none() {
        warn!(target: "app", "No monospace system font found; HUD text is disabled");
    }

    let mut app = App {
        context: RenderContext::new(),
        renderers: vec![],
        state: RenderState::Suspended(None),
        scene: Scene::new(),
        controller,
        backend: VelloBackend,
        hud: Hud::new(font),
        clipboard: arboard::Clipboard::new()
            .map_err(|e| warn!(target: "app", "Clipboard unavailable: {}", e))
            .ok(),
        stash: stash.filter(|_| !settings.app.allow_persistence),
        windowed: args.windowed,
        focus: Focus::Commands,
        modifiers: ModifiersState::empty(),
        cursor: (0.0, 0.0),
        press: None,
    };

    let event_loop = EventLoop::new()?;
    event_loop
        .run_app(&mut app)
        .context("Event loop terminated abnormally")?;

    runtime.shutdown_timeout(std::time::Duration::from_secs(1));

    Ok(())
}

fn create_window(event_loop: &ActiveEventLoop, windowed: bool) -> Result<Arc<Window>> {
    let mut attr = Window::default_attributes().with_title("coordcraft");

    if !windowed {
        attr = attr.with_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        attr = attr.with_inner_size(winit::dpi::LogicalSize::new(1280, 800));
    }

    Ok(Arc::new(
        event_loop
            .create_window(attr)
            .context("Couldn't create window")?,
    ))
}

fn create_renderer(render_cx: &RenderContext, surface: &RenderSurface<'_>) -> Result<Renderer> {
    Renderer::new(
        &render_cx.devices[surface.dev_id].device,
        RendererOptions::default(),
    )
    .map_err(|e| anyhow::anyhow!("Couldn't create renderer: {e}"))
}
