//! Image preparation for CTC recognition graphs.
//!
//! The captcha models are trained on raw 8-bit pixels laid out as NHWC, so
//! preparation is only a resize to the graph's declared size, an optional
//! channel swap and a batch axis. No scaling or mean subtraction happens here;
//! any normalization lives inside the exported graph.

use crate::core::constants::INPUT_CHANNELS;
use crate::core::Tensor4D;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Spatial input size declared by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelInputSize {
    /// Height and width are fixed; images are resized to match.
    Fixed { width: u32, height: u32 },
    /// At least one spatial dimension is symbolic; images pass at native size.
    #[default]
    Dynamic,
}

impl ModelInputSize {
    /// Fixed size helper.
    pub fn fixed(width: u32, height: u32) -> Self {
        Self::Fixed { width, height }
    }

    /// Reads the spatial size from an NHWC shape.
    ///
    /// Symbolic dimensions are reported as non-positive values; any such value
    /// in the height or width slot, a size beyond `u32`, or a shape that is
    /// not 4-D, is dynamic.
    pub fn from_nhwc_shape(shape: &[i64]) -> Self {
        let [_, height, width, _] = shape else {
            return Self::Dynamic;
        };
        match (u32::try_from(*width).ok(), u32::try_from(*height).ok()) {
            (Some(width), Some(height)) if width > 0 && height > 0 => Self::Fixed { width, height },
            _ => Self::Dynamic,
        }
    }

    /// True when the graph does not fix the spatial size.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic)
    }
}

/// Order of the color channels in the prepared tensor.
///
/// Training pipelines that read images with OpenCV see BGR, which is why it
/// is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Bgr,
    Rgb,
}

impl ChannelOrder {
    fn arrange(self, [r, g, b]: [u8; 3]) -> [u8; 3] {
        match self {
            ChannelOrder::Bgr => [b, g, r],
            ChannelOrder::Rgb => [r, g, b],
        }
    }
}

impl std::fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelOrder::Bgr => write!(f, "bgr"),
            ChannelOrder::Rgb => write!(f, "rgb"),
        }
    }
}

/// Turns decoded images into `(1, H, W, 3)` float tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptchaPreprocessor {
    input_size: ModelInputSize,
    channel_order: ChannelOrder,
}

impl CaptchaPreprocessor {
    pub fn new(input_size: ModelInputSize, channel_order: ChannelOrder) -> Self {
        Self {
            input_size,
            channel_order,
        }
    }

    pub fn input_size(&self) -> ModelInputSize {
        self.input_size
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    /// Prepares a single image.
    ///
    /// With a fixed input size the image is resized with OpenCV-style
    /// bilinear interpolation unless it already matches. Pixel values stay in
    /// 0..=255.
    pub fn prepare(&self, image: &RgbImage) -> Tensor4D {
        match self.input_size {
            ModelInputSize::Fixed { width, height } if image.dimensions() != (width, height) => {
                tracing::debug!(
                    "Captcha resize: orig={}x{}, target={}x{}",
                    image.width(),
                    image.height(),
                    width,
                    height
                );
                resize_to_tensor(image, width, height, self.channel_order)
            }
            _ => to_tensor(image, self.channel_order),
        }
    }
}

/// Prepares `image` for a model with the given input size and channel order.
pub fn prepare(image: &RgbImage, input_size: ModelInputSize, channel_order: ChannelOrder) -> Tensor4D {
    CaptchaPreprocessor::new(input_size, channel_order).prepare(image)
}

fn to_tensor(image: &RgbImage, channel_order: ChannelOrder) -> Tensor4D {
    let (width, height) = image.dimensions();
    let mut tensor = Tensor4D::zeros((1, height as usize, width as usize, INPUT_CHANNELS));
    for (x, y, pixel) in image.enumerate_pixels() {
        let ordered = channel_order.arrange(pixel.0);
        for (c, value) in ordered.into_iter().enumerate() {
            tensor[[0, y as usize, x as usize, c]] = f32::from(value);
        }
    }
    tensor
}

/// Bilinear resize straight into a tensor.
///
/// Sampling follows OpenCV's `INTER_LINEAR`, which the models were trained
/// with: output pixel centers map back to `(x + 0.5) * scale - 0.5` and blend
/// only the 2x2 source pixels around that point, at any scale. Results are
/// rounded to whole 8-bit levels. A source with no pixels yields zeros.
fn resize_to_tensor(
    image: &RgbImage,
    width: u32,
    height: u32,
    channel_order: ChannelOrder,
) -> Tensor4D {
    let mut tensor = Tensor4D::zeros((1, height as usize, width as usize, INPUT_CHANNELS));
    let (src_width, src_height) = image.dimensions();
    if src_width == 0 || src_height == 0 {
        return tensor;
    }

    let columns: Vec<Taps> = (0..width).map(|x| Taps::new(x, src_width, width)).collect();
    let rows: Vec<Taps> = (0..height).map(|y| Taps::new(y, src_height, height)).collect();
    let pixel = |x: u32, y: u32| channel_order.arrange(image.get_pixel(x, y).0);

    for (y, row) in rows.iter().enumerate() {
        for (x, col) in columns.iter().enumerate() {
            let top = col.blend(pixel(col.lower, row.lower), pixel(col.upper, row.lower));
            let bottom = col.blend(pixel(col.lower, row.upper), pixel(col.upper, row.upper));
            for c in 0..INPUT_CHANNELS {
                let value = top[c] * (1.0 - row.weight) + bottom[c] * row.weight;
                tensor[[0, y, x, c]] = value.round();
            }
        }
    }
    tensor
}

/// Source neighbours of one output coordinate along a single axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Taps {
    lower: u32,
    upper: u32,
    /// Weight of `upper`.
    weight: f32,
}

impl Taps {
    /// `src_len` must be non-zero.
    fn new(dst: u32, src_len: u32, dst_len: u32) -> Self {
        let scale = src_len as f32 / dst_len as f32;
        let position = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
        let last = src_len - 1;
        let lower = (position.floor() as u32).min(last);
        if lower == last {
            return Self {
                lower,
                upper: lower,
                weight: 0.0,
            };
        }
        Self {
            lower,
            upper: lower + 1,
            weight: position - lower as f32,
        }
    }

    fn blend(&self, a: [u8; 3], b: [u8; 3]) -> [f32; 3] {
        std::array::from_fn(|c| f32::from(a[c]) * (1.0 - self.weight) + f32::from(b[c]) * self.weight)
    }
}
