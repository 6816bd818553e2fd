use std::sync::mpsc;

use image::RgbaImage;
use log::debug;
use vello::wgpu;

use crate::{
  Error, Result,
  config::Chrome,
  export::Rasterize,
  icons::IconCache,
  render::{GpuHandle, Painter, Render, RenderConfig},
  scene::Scene,
};

/// Renders scenes offscreen and reads the pixels back.
pub struct GpuRasterizer<'a> {
  handle:   GpuHandle,
  config:   RenderConfig,
  renderer: vello::Renderer,
  render:   Render,
  painter:  Painter<'a>,
}

impl<'a> GpuRasterizer<'a> {
  pub fn new(width: u32, height: u32, chrome: &'a Chrome, icons: &IconCache) -> Result<Self> {
    if width == 0 || height == 0 {
      return Err(Error::Config(format!("output size {width}x{height} is empty")));
    }
    let config = RenderConfig { width, height };
    let handle = GpuHandle::new(&config, None)?;
    let renderer = vello::Renderer::new(&handle.device, vello::RendererOptions::default())
      .map_err(|e| Error::Render(e.to_string()))?;

    Ok(GpuRasterizer { handle, config, renderer, render: Render::new(), painter: Painter::new(chrome, icons) })
  }

  fn read_back(&self) -> Result<RgbaImage> {
    let RenderConfig { width, height } = self.config;
    let row = 4 * width;
    // Buffer copies need rows padded to the copy alignment.
    let padded_row = row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let buffer = self.handle.device.create_buffer(&wgpu::BufferDescriptor {
      label:              Some("Output Buffer"),
      size:               u64::from(padded_row) * u64::from(height),
      usage:              wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
      mapped_at_creation: false,
    });

    let mut encoder = self.handle.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
      label: Some("texture_buffer_copy_encoder"),
    });

    encoder.copy_texture_to_buffer(
      wgpu::TexelCopyTextureInfo {
        texture:   &self.handle.texture,
        mip_level: 0,
        origin:    wgpu::Origin3d::ZERO,
        aspect:    wgpu::TextureAspect::All,
      },
      wgpu::TexelCopyBufferInfo {
        buffer: &buffer,
        layout: wgpu::TexelCopyBufferLayout {
          offset:         0,
          bytes_per_row:  Some(padded_row),
          rows_per_image: Some(height),
        },
      },
      self.config.extent_3d(),
    );

    self.handle.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
      let _ = tx.send(result);
    });
    self.handle.device.poll(wgpu::PollType::Wait).map_err(|e| Error::Render(e.to_string()))?;
    rx.recv()
      .map_err(|e| Error::Render(e.to_string()))?
      .map_err(|e| Error::Render(e.to_string()))?;

    let pixels = {
      let data = slice.get_mapped_range();
      let mut pixels = Vec::with_capacity((row * height) as usize);
      for chunk in data.chunks(padded_row as usize) {
        pixels.extend_from_slice(&chunk[..row as usize]);
      }
      pixels
    };
    buffer.unmap();

    RgbaImage::from_raw(width, height, pixels)
      .ok_or_else(|| Error::Render("read back a truncated frame".into()))
  }
}

impl Rasterize for GpuRasterizer<'_> {
  fn rasterize(&mut self, scene: &Scene) -> Result<RgbaImage> {
    self.render.scene.reset();
    self.painter.draw(&mut self.render, scene, self.config.width, self.config.height);

    self
      .renderer
      .render_to_texture(
        &self.handle.device,
        &self.handle.queue,
        &self.render.scene,
        &self.handle.view,
        &self.config.render_params(self.render.background),
      )
      .map_err(|e| Error::Render(e.to_string()))?;

    let image = self.read_back()?;
    debug!("rasterized frame {} at {}x{}", scene.frame, image.width(), image.height());
    Ok(image)
  }
}
