use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use log::{info, warn};
use vello::wgpu;
use winit::{
  application::ApplicationHandler,
  event::{KeyEvent, WindowEvent},
  event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
  keyboard::Key,
  window::{Window, WindowId},
};

use crate::{
  Error, Result, ResultExt,
  config::Chrome,
  frame::Frames,
  icons::IconCache,
  playback::{Playback, PlaybackCursor},
  render::{GpuHandle, Painter, Render, RenderConfig},
  scene::Scene,
};

/// Opens a window and plays the frames at the playback interval until it is closed.
///
/// With [`Repeat::Once`](crate::playback::Repeat::Once) the last frame stays on screen once
/// the sequence has run out.
pub fn play(
  frames: Frames<'_>,
  playback: &Playback,
  chrome: &Chrome,
  icons: &IconCache,
  size: (u32, u32),
) -> Result<()> {
  let event_loop = EventLoop::new().map_err(|e| Error::Render(e.to_string()))?;

  let mut app = App {
    cursor: playback.cursor(frames.frame_count()),
    frames,
    interval: playback.interval,
    painter: Painter::new(chrome, icons),
    title: chrome.title.clone().unwrap_or_else(|| "neilanim".to_string()),
    size,
    scene: None,
    next_frame: Instant::now(),
    render: Render::new(),
    init: None,
    error: None,
  };
  event_loop.run_app(&mut app).map_err(|e| Error::Render(e.to_string()))?;

  let error = app.error.take();
  // FIXME: Ideally, we'd drop this. But dropping it segfaults.
  std::mem::forget(app);

  match error {
    Some(e) => Err(e),
    None => Ok(()),
  }
}

struct App<'a> {
  frames:     Frames<'a>,
  cursor:     PlaybackCursor,
  interval:   Duration,
  painter:    Painter<'a>,
  title:      String,
  size:       (u32, u32),
  scene:      Option<Scene>,
  next_frame: Instant,
  render:     Render,

  init:  Option<Init>,
  error: Option<Error>,
}

struct Init {
  window:  Arc<Window>,
  surface: wgpu::Surface<'static>,
  config:  wgpu::SurfaceConfiguration,
  handle:  GpuHandle,

  blit:  wgpu::util::TextureBlitter,
  vello: vello::Renderer,
}

impl App<'_> {
  /// Moves to the next frame if its time has come.
  fn advance(&mut self) {
    let now = Instant::now();
    if now < self.next_frame || self.cursor.is_finished() {
      return;
    }
    self.next_frame = now + self.interval;

    let Some(frame) = self.cursor.next() else {
      info!("playback finished");
      return;
    };
    if let Some(scene) = self.frames.scene(frame).log_err() {
      self.scene = Some(scene);
      if let Some(init) = &self.init {
        init.window.request_redraw();
      }
    }
  }

  fn init(&self, event_loop: &ActiveEventLoop) -> Result<Init> {
    let window = Arc::new(
      event_loop
        .create_window(
          Window::default_attributes()
            .with_title(self.title.as_str())
            .with_inner_size(winit::dpi::PhysicalSize::new(self.size.0, self.size.1))
            .with_min_inner_size(winit::dpi::LogicalSize::new(100, 100)),
        )
        .map_err(render_error)?,
    );
    let size = window.inner_size();

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let surface = instance.create_surface(window.clone()).map_err(render_error)?;
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
      compatible_surface: Some(&surface),
      ..Default::default()
    }))
    .map_err(render_error)?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
      .formats
      .iter()
      .copied()
      .find(|f| f.is_srgb())
      .or_else(|| surface_caps.formats.first().copied())
      .ok_or_else(|| Error::Render("surface has no formats".into()))?;
    let alpha_mode = surface_caps
      .alpha_modes
      .first()
      .copied()
      .ok_or_else(|| Error::Render("surface has no alpha modes".into()))?;

    let handle = GpuHandle::new(
      &RenderConfig { width: size.width.max(1), height: size.height.max(1) },
      Some(adapter),
    )?;

    let config = wgpu::SurfaceConfiguration {
      usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_DST,
      format: surface_format,
      width: size.width.max(1),
      height: size.height.max(1),
      present_mode: wgpu::PresentMode::AutoVsync,
      alpha_mode,
      view_formats: vec![],
      desired_maximum_frame_latency: 2,
    };
    surface.configure(&handle.device, &config);

    let vello = vello::Renderer::new(&handle.device, vello::RendererOptions::default())
      .map_err(render_error)?;
    let blit = wgpu::util::TextureBlitter::new(&handle.device, config.format);

    Ok(Init { window, surface, config, handle, blit, vello })
  }

  fn redraw(&mut self) -> Result<()> {
    let (Some(init), Some(scene)) = (&mut self.init, &self.scene) else { return Ok(()) };

    self.render.scene.reset();
    self.painter.draw(&mut self.render, scene, init.config.width, init.config.height);

    let config = RenderConfig { width: init.config.width, height: init.config.height };
    init
      .vello
      .render_to_texture(
        &init.handle.device,
        &init.handle.queue,
        &self.render.scene,
        &init.handle.view,
        &config.render_params(self.render.background),
      )
      .map_err(|e| Error::Render(e.to_string()))?;

    init.present();
    Ok(())
  }
}

impl ApplicationHandler for App<'_> {
  fn resumed(&mut self, event_loop: &ActiveEventLoop) {
    if self.init.is_some() {
      return;
    }

    match self.init(event_loop) {
      Ok(init) => {
        init.window.request_redraw();
        self.init = Some(init);
      }
      Err(e) => {
        self.error = Some(e);
        event_loop.exit();
      }
    }
  }

  fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
    match event {
      WindowEvent::CloseRequested => event_loop.exit(),

      WindowEvent::KeyboardInput {
        event: KeyEvent { logical_key: Key::Character(c), .. }, ..
      } if c == "q" => event_loop.exit(),

      WindowEvent::Resized(new_size) => {
        if let Some(init) = &mut self.init {
          if new_size.width > 0 && new_size.height > 0 {
            init.config.width = new_size.width;
            init.config.height = new_size.height;
            init.handle.resize(&RenderConfig { width: new_size.width, height: new_size.height });
            init.surface.configure(&init.handle.device, &init.config);
            init.window.request_redraw();
          }
        }
      }

      WindowEvent::RedrawRequested => {
        if let Err(e) = self.redraw() {
          self.error = Some(e);
          event_loop.exit();
        }
      }

      _ => (),
    }
  }

  fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
    self.advance();
    if self.cursor.is_finished() {
      event_loop.set_control_flow(ControlFlow::Wait);
    } else {
      event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }
  }
}

fn render_error(e: impl std::fmt::Display) -> Error { Error::Render(e.to_string()) }

impl Init {
  fn present(&mut self) {
    let frame = match self.surface.get_current_texture() {
      Ok(frame) => frame,
      Err(wgpu::SurfaceError::Lost) => {
        self.surface.configure(&self.handle.device, &self.config);
        return;
      }
      Err(e) => {
        warn!("dropped frame: {e:?}");
        return;
      }
    };

    let surface_view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = self
      .handle
      .device
      .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Render Encoder") });

    self.blit.copy(&self.handle.device, &mut encoder, &self.handle.view, &surface_view);
    self.handle.queue.submit(std::iter::once(encoder.finish()));

    frame.present();
  }
}
