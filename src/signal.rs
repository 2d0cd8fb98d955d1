//! Per-frame content signals.
//!
//! A [`ContentSignal`] is the hue, saturation, and value planes of one
//! (usually downscaled) frame. Two consecutive signals are compared with
//! [`ContentSignal::change_score`]: the mean absolute per-pixel difference of
//! each plane, averaged over the three planes. Because it is a per-pixel
//! mean, the score lives on a fixed `0.0..=255.0` scale regardless of frame
//! resolution, and a hard cut between unrelated shots typically scores well
//! above 30.

use image::RgbImage;

/// HSV planes of one frame, 8 bits per channel.
///
/// Hue is stored in `0..180` (two degrees per step) so that all three
/// planes fit in a byte; saturation and value use the full `0..=255` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSignal {
    width: u32,
    height: u32,
    hue: Vec<u8>,
    saturation: Vec<u8>,
    value: Vec<u8>,
}

impl ContentSignal {
    /// Compute the signal of an RGB frame.
    pub fn from_image(image: &RgbImage) -> Self {
        let pixel_count = (image.width() as usize) * (image.height() as usize);
        let mut hue = Vec::with_capacity(pixel_count);
        let mut saturation = Vec::with_capacity(pixel_count);
        let mut value = Vec::with_capacity(pixel_count);

        for pixel in image.pixels() {
            let [r, g, b] = pixel.0;
            let (h, s, v) = rgb_to_hsv(r, g, b);
            hue.push(h);
            saturation.push(s);
            value.push(v);
        }

        Self {
            width: image.width(),
            height: image.height(),
            hue,
            saturation,
            value,
        }
    }

    /// Frame dimensions the signal was computed at.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Content-change score between `self` (the previous frame) and `other`.
    ///
    /// Returns `None` if the two signals have different dimensions (the
    /// source changed resolution mid-stream); callers treat that as a cut.
    pub fn change_score(&self, other: &ContentSignal) -> Option<f64> {
        if self.dimensions() != other.dimensions() {
            return None;
        }
        if self.hue.is_empty() {
            return Some(0.0);
        }

        let delta_hue = mean_absolute_difference(&self.hue, &other.hue);
        let delta_saturation = mean_absolute_difference(&self.saturation, &other.saturation);
        let delta_value = mean_absolute_difference(&self.value, &other.value);

        Some((delta_hue + delta_saturation + delta_value) / 3.0)
    }
}

fn mean_absolute_difference(a: &[u8], b: &[u8]) -> f64 {
    let total: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    total as f64 / a.len() as f64
}

/// 8-bit RGB to 8-bit HSV with hue halved into `0..180`.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(max - min);

    let value = max;
    if max == 0 || delta == 0.0 {
        return (0, 0, value);
    }

    let saturation = (255.0 * delta / f32::from(max)).round() as u8;

    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let degrees = if max as f32 == r {
        60.0 * (g - b) / delta
    } else if max as f32 == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    let hue = ((degrees / 2.0).round() as u16 % 180) as u8;

    (hue, saturation, value)
}
