use parley::{Alignment, FontWeight, Layout, PositionedLayoutItem, StyleProperty};
use vello::{
  kurbo::{Affine, Point, Rect, RoundedRect, Shape, Stroke, Vec2},
  peniko::{Blob, Brush, BrushRef, Color, Fill, ImageAlphaType, ImageBrush, ImageData, ImageFormat},
  wgpu::{self, TextureDescriptor},
};

use crate::{Error, Result, theme};

mod draw;
pub mod texture;
pub mod window;

pub(crate) use draw::Painter;

pub(crate) struct Render {
  pub scene:      vello::Scene,
  pub background: Color,
  font:           parley::FontContext,
  layout:         parley::LayoutContext<Brush>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Align {
  #[default]
  Start,
  Center,
  End,
}

pub(crate) struct DrawText<'a> {
  pub text:             &'a str,
  pub size:             f32,
  pub weight:           FontWeight,
  pub brush:            Brush,
  pub position:         Point,
  pub transform:        Affine,
  pub horizontal_align: Align,
  pub vertical_align:   Align,
}

impl Default for DrawText<'_> {
  fn default() -> Self {
    DrawText {
      text:             "",
      size:             16.0,
      weight:           FontWeight::NORMAL,
      brush:            Brush::Solid(theme::TEXT_COLOR),
      position:         Point::ZERO,
      transform:        Affine::IDENTITY,
      horizontal_align: Align::Start,
      vertical_align:   Align::Start,
    }
  }
}

pub(crate) struct GpuHandle {
  pub device:  wgpu::Device,
  pub queue:   wgpu::Queue,
  pub texture: wgpu::Texture,
  pub view:    wgpu::TextureView,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RenderConfig {
  pub width:  u32,
  pub height: u32,
}

impl Render {
  pub fn new() -> Self {
    Render {
      scene:      vello::Scene::new(),
      background: theme::BACKGROUND,
      font:       parley::FontContext::new(),
      layout:     parley::LayoutContext::new(),
    }
  }

  pub fn fill<'b>(&mut self, shape: &impl Shape, transform: Affine, brush: impl Into<BrushRef<'b>>) {
    self.scene.fill(Fill::NonZero, transform, brush, None, shape);
  }

  pub fn stroke<'b>(
    &mut self,
    shape: &impl Shape,
    transform: Affine,
    brush: impl Into<BrushRef<'b>>,
    stroke: &Stroke,
  ) {
    self.scene.stroke(stroke, transform, brush, None, shape);
  }

  pub fn draw_image(&mut self, image: &ImageBrush, transform: Affine) {
    self.scene.draw_image(image, transform);
  }

  pub fn layout_text(&mut self, text: &DrawText) -> Layout<Brush> {
    let mut builder = self.layout.ranged_builder(&mut self.font, text.text, 1.0, true);

    builder.push_default(StyleProperty::FontSize(text.size));
    builder.push_default(StyleProperty::FontWeight(text.weight));
    builder.push_default(StyleProperty::Brush(text.brush.clone()));

    let mut layout = builder.build(text.text);
    layout.break_all_lines(None);
    layout.align(None, Alignment::Start, Default::default());
    layout
  }

  pub fn draw_text(&mut self, text: DrawText) -> Rect {
    let layout = self.layout_text(&text);
    self.draw_text_layout(layout, text)
  }

  /// Draws a label on a filled box, padded by `padding` on every side.
  pub fn draw_text_boxed(&mut self, text: DrawText, background: Color, padding: f64) -> Rect {
    let layout = self.layout_text(&text);
    let bounds = text_rect(&layout, &text).inflate(padding, padding);
    self.fill(&RoundedRect::from_rect(bounds, 3.0), text.transform, background);
    self.draw_text_layout(layout, text)
  }

  /// Draws a laid out text and returns the area it covers, before `text.transform`.
  pub fn draw_text_layout(&mut self, layout: Layout<Brush>, text: DrawText) -> Rect {
    let rect = text_rect(&layout, &text);
    let transform = text.transform * Affine::translate(rect.origin().to_vec2());

    for line in layout.lines() {
      for item in line.items() {
        let PositionedLayoutItem::GlyphRun(glyph_run) = item else { continue };

        let run = glyph_run.run();
        let mut x = glyph_run.offset();
        let baseline = glyph_run.baseline();

        self
          .scene
          .draw_glyphs(run.font())
          .brush(&glyph_run.style().brush)
          .hint(false)
          .transform(transform)
          .glyph_transform(
            run.synthesis().skew().map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0)),
          )
          .font_size(run.font_size())
          .normalized_coords(run.normalized_coords())
          .draw(
            Fill::NonZero,
            glyph_run.glyphs().map(|glyph| {
              let gx = x + glyph.x;
              let gy = baseline + glyph.y;
              x += glyph.advance;
              vello::Glyph { id: glyph.id.into(), x: gx, y: gy }
            }),
          );
      }
    }

    rect
  }
}

/// Where a laid out text lands once its alignment is applied.
fn text_rect(layout: &Layout<Brush>, text: &DrawText) -> Rect {
  let width = f64::from(layout.width());
  let height = f64::from(layout.height());

  let offset = Vec2::new(
    match text.horizontal_align {
      Align::Start => 0.0,
      Align::Center => -width / 2.0,
      Align::End => -width,
    },
    match text.vertical_align {
      Align::Start => 0.0,
      Align::Center => -height / 2.0,
      Align::End => -height,
    },
  );

  Rect::from_origin_size(text.position + offset, (width, height))
}

/// Uploads an icon in the form vello draws images.
pub(crate) fn image_brush(image: &image::RgbaImage) -> ImageBrush {
  ImageBrush::new(ImageData {
    data:       Blob::from(image.as_raw().clone()),
    format:     ImageFormat::Rgba8,
    alpha_type: ImageAlphaType::Alpha,
    width:      image.width(),
    height:     image.height(),
  })
}

impl GpuHandle {
  pub fn new(config: &RenderConfig, adapter: Option<wgpu::Adapter>) -> Result<Self> {
    let adapter = match adapter {
      Some(adapter) => adapter,
      None => {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
          .map_err(|e| Error::Render(format!("no graphics adapter: {e}")))?
      }
    };

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
      label:             None,
      required_features: wgpu::Features::empty(),
      required_limits:   wgpu::Limits::defaults(),
      memory_hints:      wgpu::MemoryHints::MemoryUsage,
      trace:             wgpu::Trace::Off,
    }))
    .map_err(|e| Error::Render(format!("no graphics device: {e}")))?;

    let (texture, view) = create_target(&device, config);
    Ok(GpuHandle { device, queue, texture, view })
  }

  pub fn resize(&mut self, config: &RenderConfig) {
    let (texture, view) = create_target(&self.device, config);
    self.texture = texture;
    self.view = view;
  }
}

fn create_target(device: &wgpu::Device, config: &RenderConfig) -> (wgpu::Texture, wgpu::TextureView) {
  let texture = device.create_texture(&TextureDescriptor {
    label:           Some("Render Texture"),
    size:            config.extent_3d(),
    mip_level_count: 1,
    sample_count:    1,
    dimension:       wgpu::TextureDimension::D2,
    format:          wgpu::TextureFormat::Rgba8Unorm,
    usage:           wgpu::TextureUsages::STORAGE_BINDING
      | wgpu::TextureUsages::TEXTURE_BINDING
      | wgpu::TextureUsages::COPY_SRC,
    view_formats:    &[],
  });
  let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
  (texture, view)
}

impl RenderConfig {
  pub fn extent_3d(&self) -> wgpu::Extent3d {
    wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 }
  }

  pub fn render_params(&self, base_color: Color) -> vello::RenderParams {
    vello::RenderParams {
      base_color,
      width: self.width,
      height: self.height,
      antialiasing_method: vello::AaConfig::Msaa16,
    }
  }
}
