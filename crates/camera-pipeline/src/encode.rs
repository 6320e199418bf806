//! Still encoding to disk

use crate::convert::yuyv_to_rgb;
use crate::{EncodeOptions, FrameBuffer, PipelineError, PixelFormat, StreamInfo};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageError};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Write `frame` to `path` as JPEG.
pub(crate) fn save_jpeg(
    frame: &FrameBuffer,
    info: &StreamInfo,
    path: &Path,
    options: &EncodeOptions,
) -> Result<(), PipelineError> {
    let result = match info.pixel_format {
        // The driver already produced a JPEG payload; write it through.
        PixelFormat::Mjpeg => std::fs::write(path, &frame.data).map_err(ImageError::IoError),
        PixelFormat::Yuyv => {
            let rgb = yuyv_to_rgb(&frame.data, info.width, info.height);
            encode_rgb(&rgb, info, path, options.quality)
        }
        PixelFormat::Rgb24 => encode_rgb(&frame.data, info, path, options.quality),
    };

    result.map_err(|source| PipelineError::Save {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "saved {}x{} still to {}",
        info.width,
        info.height,
        path.display()
    );
    Ok(())
}

fn encode_rgb(rgb: &[u8], info: &StreamInfo, path: &Path, quality: u8) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    encoder.encode(rgb, info.width, info.height, ExtendedColorType::Rgb8)
}
