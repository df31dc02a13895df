use anyhow::Result;
use pixels::{Pixels, SurfaceTexture};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rdk_core::{Direction, Phase, StandardPhase};
use rdk_experiment::{ExperimentConfig, ExperimentEvent, ExperimentStateMachine};
use rdk_render::{PanDirection, Scene, SkiaRenderer};
use rdk_timing::{HighPrecisionTimer, Timer};
use std::sync::Arc;
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

type Session = ExperimentStateMachine<StandardPhase, HighPrecisionTimer, SmallRng>;

const WINDOWED_SIZE: PhysicalSize<u32> = PhysicalSize::new(1280, 720);

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    experiment: Session,
    renderer: Option<SkiaRenderer>,
    fullscreen: bool,

    /// Pan keys currently held, in press order
    held_pan: Vec<PanDirection>,
    last_frame_ns: Option<u64>,
    should_exit: bool,
}

impl App {
    pub fn new(config: ExperimentConfig, fullscreen: bool) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => {
                log::info!("Seeding session RNG with {}", seed);
                SmallRng::seed_from_u64(seed)
            }
            None => SmallRng::from_os_rng(),
        };
        let timer = HighPrecisionTimer::new();
        let experiment = ExperimentStateMachine::new(config, timer, rng)?;

        Ok(Self {
            window: None,
            pixels: None,
            experiment,
            renderer: None,
            fullscreen,
            held_pan: Vec::new(),
            last_frame_ns: None,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        log::info!(
            "Random-dot motion task on {} ({})",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        log::info!(
            "SPACE starts, LEFT/RIGHT answer, WASD pans the view, ESC quits. Results go to {}",
            self.experiment.config.output_path.display()
        );

        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());

        let refresh_rate = monitor
            .as_ref()
            .and_then(|m| m.refresh_rate_millihertz())
            .map(|rate| rate as f64 / 1000.0);

        let mut window_attributes = Window::default_attributes().with_title("Random-dot motion");
        window_attributes = if self.fullscreen {
            window_attributes
                .with_fullscreen(Some(Fullscreen::Borderless(monitor)))
                .with_resizable(false)
        } else {
            window_attributes.with_inner_size(WINDOWED_SIZE)
        };

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        let scale_factor = window.scale_factor();

        log::info!(
            "Display: {}x{} at scale {:.2}",
            physical_size.width,
            physical_size.height,
            scale_factor
        );
        if let Some(refresh_rate) = refresh_rate {
            log::info!("Refresh rate: {:.1} Hz", refresh_rate);
        }

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            self.experiment.config.aperture_radius,
        )?);

        if self.fullscreen {
            window.set_cursor_visible(false);
        }
        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    /// Frame bookkeeping shared by every redraw: frame-interval stats and
    /// camera panning.
    fn begin_frame(&mut self) {
        let now = self.experiment.timer.now();
        let Some(last) = self.last_frame_ns.replace(now) else {
            return;
        };
        let dt = Duration::from_nanos(now.saturating_sub(last));
        self.experiment.timer.record_frame(dt);

        if let Some(renderer) = self.renderer.as_mut() {
            for &direction in &self.held_pan {
                renderer.view_mut().pan(direction, dt.as_secs_f32());
            }
        }
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let scene = Scene {
            dots: self.experiment.visible_dots(),
            trial_state: self.experiment.trial_state(),
            feedback: self.experiment.feedback(),
            progress: self.experiment.trial_progress(),
            accuracy: self.experiment.summary().map(|s| s.accuracy),
        };

        let stats = renderer.render_frame(
            self.experiment.current_phase(),
            &scene,
            pixels.frame_mut(),
            &self.experiment.timer,
        )?;
        pixels.render()?;

        log::trace!(
            "clear {:.3}ms, phase {:.3}ms, copy {:.3}ms, total {:.3}ms, dirty {}",
            stats.clear.as_secs_f64() * 1e3,
            stats.phase.as_secs_f64() * 1e3,
            stats.copy.as_secs_f64() * 1e3,
            stats.total.as_secs_f64() * 1e3,
            stats.dirty_count,
        );
        Ok(())
    }

    fn update(&mut self) {
        for event in self.experiment.update() {
            self.experiment.handle_event(event);
        }
    }

    fn handle_key(&mut self, key: PhysicalKey, state: ElementState, event_loop: &ActiveEventLoop) {
        let PhysicalKey::Code(code) = key else {
            return;
        };

        if let Some(direction) = pan_direction(code) {
            match state {
                ElementState::Pressed if !self.held_pan.contains(&direction) => {
                    self.held_pan.push(direction)
                }
                ElementState::Released => self.held_pan.retain(|&d| d != direction),
                _ => {}
            }
            return;
        }
        if !state.is_pressed() {
            return;
        }

        match code {
            KeyCode::Space => {
                if self.experiment.current_phase().is_welcome() {
                    self.experiment.handle_event(ExperimentEvent::SpacePressed);
                } else if let Some(renderer) = self.renderer.as_mut() {
                    renderer.view_mut().reset();
                }
            }
            KeyCode::ArrowLeft => self.respond(Direction::Left),
            KeyCode::ArrowRight => self.respond(Direction::Right),
            KeyCode::Escape => self.abort_and_exit(event_loop),
            _ => {}
        }
    }

    fn respond(&mut self, direction: Direction) {
        if !self.experiment.current_phase().allows_input() {
            return;
        }
        if !self
            .experiment
            .handle_event(ExperimentEvent::ResponseReceived(direction))
        {
            log::debug!("Ignored {:?} outside the response window", direction);
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                log::error!("Failed to resize surface: {}", e);
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                log::error!("Failed to resize buffer: {}", e);
            }
        }
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                log::error!("Failed to resize canvas: {:#}", e);
            }
        }
        log::info!("Display resized to {}x{}", new_size.width, new_size.height);
    }

    /// Ends the session early if it is still running, which saves whatever
    /// has been recorded, then closes the window.
    fn abort_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.experiment.handle_event(ExperimentEvent::Abort);

        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        log::info!(
            "Session closed after {} of {} trials",
            self.experiment.records().len(),
            self.experiment.block().len()
        );

        self.should_exit = true;
        event_loop.exit();
    }
}

fn pan_direction(code: KeyCode) -> Option<PanDirection> {
    match code {
        KeyCode::KeyW => Some(PanDirection::Up),
        KeyCode::KeyS => Some(PanDirection::Down),
        KeyCode::KeyA => Some(PanDirection::Left),
        KeyCode::KeyD => Some(PanDirection::Right),
        _ => None,
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                log::error!("Failed to create window and surface: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.abort_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                self.begin_frame();
                if let Err(e) = self.render() {
                    log::error!("Render failed, frame skipped: {:#}", e);
                }
                self.update();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if !event.repeat => {
                self.handle_key(event.physical_key, event.state, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed to {:.2}", scale_factor);
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
