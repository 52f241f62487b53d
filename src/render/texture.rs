use std::{path::Path, sync::mpsc};

use image::RgbaImage;
use vello::wgpu;

use crate::{
  Plot, ResultExt,
  error::RenderError,
  render::{GpuHandle, RenderConfig},
};

/// Rasterizes plots on the GPU and saves them as PNG files.
///
/// The device and renderer are reused between images; each image is drawn into its own
/// scene and texture.
pub struct PngWriter {
  handle:   GpuHandle,
  renderer: vello::Renderer,
}

impl PngWriter {
  pub fn new() -> Result<Self, RenderError> {
    let handle = GpuHandle::new()?;
    let renderer = vello::Renderer::new(&handle.device, vello::RendererOptions::default())
      .map_err(|e| RenderError::Renderer(e.to_string()))?;

    Ok(PngWriter { handle, renderer })
  }

  pub fn write(
    &mut self,
    plot: &Plot,
    config: RenderConfig,
    path: &Path,
  ) -> Result<(), RenderError> {
    config.validate()?;
    let render = plot.build_scene(config);
    let device = &self.handle.device;

    let texture = device.create_texture(&wgpu::TextureDescriptor {
      label:           Some("Render Texture"),
      size:            config.extent_3d(),
      mip_level_count: 1,
      sample_count:    1,
      dimension:       wgpu::TextureDimension::D2,
      format:          wgpu::TextureFormat::Rgba8Unorm,
      usage:           wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
      view_formats:    &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    self
      .renderer
      .render_to_texture(
        device,
        &self.handle.queue,
        &render.scene,
        &view,
        &vello::RenderParams {
          base_color:          render.background,
          width:               config.width,
          height:              config.height,
          antialiasing_method: vello::AaConfig::Msaa16,
        },
      )
      .map_err(|e| RenderError::Renderer(e.to_string()))?;

    let pixels = self.read_back(&texture, config)?;
    let image = RgbaImage::from_raw(config.width, config.height, pixels)
      .ok_or_else(|| RenderError::Readback("pixel buffer has the wrong size".into()))?;

    image.save(path).map_err(|source| RenderError::Image { path: path.to_path_buf(), source })
  }

  fn read_back(
    &self,
    texture: &wgpu::Texture,
    config: RenderConfig,
  ) -> Result<Vec<u8>, RenderError> {
    let device = &self.handle.device;

    let padded = padded_row_bytes(config.width);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
      label:              Some("Output Buffer"),
      size:               u64::from(padded) * u64::from(config.height),
      usage:              wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
      mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
      label: Some("texture_buffer_copy_encoder"),
    });

    encoder.copy_texture_to_buffer(
      wgpu::TexelCopyTextureInfo {
        texture,
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
      },
      wgpu::TexelCopyBufferInfo {
        buffer: &buffer,
        layout: wgpu::TexelCopyBufferLayout {
          offset:         0,
          bytes_per_row:  Some(padded),
          rows_per_image: Some(config.height),
        },
      },
      config.extent_3d(),
    );

    self.handle.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
      let _ = tx.send(result);
    });
    device.poll(wgpu::PollType::Wait).log_err();

    rx.recv()
      .map_err(|e| RenderError::Readback(e.to_string()))?
      .map_err(|e| RenderError::Readback(e.to_string()))?;

    let pixels = strip_row_padding(&slice.get_mapped_range(), config);
    buffer.unmap();

    Ok(pixels)
  }
}

// Rows copied out of a texture must be padded to the copy alignment.
fn padded_row_bytes(width: u32) -> u32 {
  (4 * width).div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Tightly packed RGBA rows from a buffer laid out with [`padded_row_bytes`] per row.
fn strip_row_padding(data: &[u8], config: RenderConfig) -> Vec<u8> {
  let row_bytes = 4 * config.width as usize;
  let mut pixels = Vec::with_capacity(row_bytes * config.height as usize);
  for row in data.chunks(padded_row_bytes(config.width) as usize).take(config.height as usize) {
    pixels.extend_from_slice(&row[..row_bytes]);
  }
  pixels
}
