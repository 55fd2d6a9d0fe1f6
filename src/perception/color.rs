use anyhow::Result;
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
#[cfg(feature = "parallel-detectors")]
use rayon::prelude::*;

use super::{Frame, FrameDetector, VisualReading};
use crate::signals::round_to;

const WORK_WIDTH: u32 = 320;
const WORK_HEIGHT: u32 = 240;

const BLOOD_RATIO: f64 = 0.015;
const FIRE_RATIO: f64 = 0.03;
const FIRE_BRIGHTNESS: f64 = 120.0;

/// Colour-threshold detectors run on a downscaled copy of the frame.
///
/// Skin uses a YCrCb box, blood the two red hue bands of HSV and fire an
/// orange band that must also sit in a bright frame. Hue is on the 0..180
/// scale, saturation and value on 0..255. None of these can tell whether a
/// person is in shot, so `human_detected` is always false.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorHeuristics {
    pub blood_ratio: f64,
    pub fire_ratio: f64,
    pub fire_brightness: f64,
}

impl Default for ColorHeuristics {
    fn default() -> Self {
        ColorHeuristics {
            blood_ratio: BLOOD_RATIO,
            fire_ratio: FIRE_RATIO,
            fire_brightness: FIRE_BRIGHTNESS,
        }
    }
}

/// Per-pixel verdicts of the three colour tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PixelClass {
    skin: bool,
    blood: bool,
    fire: bool,
    brightness: u16,
}

impl PixelClass {
    fn of(pixel: &[u8]) -> PixelClass {
        let (r, g, b) = (pixel[0], pixel[1], pixel[2]);
        let (h, s, v) = hsv(r, g, b);
        PixelClass {
            skin: is_skin(r, g, b),
            blood: (h <= 10 || h >= 170) && s >= 70 && v >= 50,
            fire: (5..=35).contains(&h) && s >= 120 && v >= 180,
            brightness: r as u16 + g as u16 + b as u16,
        }
    }
}

/// Binary masks (0 or 255) for one working-size frame.
struct Masks {
    skin: GrayImage,
    blood: GrayImage,
    fire: GrayImage,
    mean_brightness: f64,
}

impl Masks {
    fn build(image: &RgbImage) -> Option<Masks> {
        let (width, height) = image.dimensions();
        let classes = classify(image.as_raw());
        if classes.is_empty() {
            return None;
        }

        let mask = |test: fn(&PixelClass) -> bool| {
            let raw = classes.iter().map(|c| if test(c) { 255 } else { 0 }).collect();
            GrayImage::from_raw(width, height, raw)
        };
        let brightness: u64 = classes.iter().map(|c| c.brightness as u64).sum();

        Some(Masks {
            skin: mask(|c| c.skin)?,
            blood: mask(|c| c.blood)?,
            fire: mask(|c| c.fire)?,
            mean_brightness: brightness as f64 / (classes.len() * 3) as f64,
        })
    }
}

fn coverage(mask: &GrayImage) -> f64 {
    let raw = mask.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    raw.iter().filter(|v| **v > 0).count() as f64 / raw.len() as f64
}

fn is_skin(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    (133.0..=173.0).contains(&cr) && (77.0..=127.0).contains(&cb)
}

/// 8-bit HSV with hue halved into 0..180.
fn hsv(r: u8, g: u8, b: u8) -> (u16, u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as f64;
    let v = max;
    if max == 0 || delta == 0.0 {
        return (0, 0, v);
    }
    let s = (255.0 * delta / max as f64).round() as u8;

    let (r, g, b) = (r as f64, g as f64, b as f64);
    let degrees = if max as f64 == r {
        60.0 * (g - b) / delta
    } else if max as f64 == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    ((degrees / 2.0).round() as u16 % 180, s, v)
}

fn classify(raw: &[u8]) -> Vec<PixelClass> {
    #[cfg(feature = "parallel-detectors")]
    {
        raw.par_chunks_exact(3).map(PixelClass::of).collect()
    }
    #[cfg(not(feature = "parallel-detectors"))]
    {
        raw.chunks_exact(3).map(PixelClass::of).collect()
    }
}

impl FrameDetector for ColorHeuristics {
    fn inspect(&self, frame: &Frame) -> Result<VisualReading> {
        let (width, height) = frame.image.dimensions();
        if width == 0 || height == 0 {
            return Ok(VisualReading::default());
        }

        let resized;
        let small = if (width, height) == (WORK_WIDTH, WORK_HEIGHT) {
            &frame.image
        } else {
            resized = imageops::resize(&frame.image, WORK_WIDTH, WORK_HEIGHT, FilterType::Triangle);
            &resized
        };
        let Some(masks) = Masks::build(small) else {
            return Ok(VisualReading::default());
        };

        // Speckle removal before counting: a small open then dilate for skin,
        // a wider open for blood. Fire is counted raw.
        let skin = morphology::dilate(&morphology::open(&masks.skin, Norm::L1, 1), Norm::L1, 1);
        let blood = morphology::open(&masks.blood, Norm::L2, 2);

        Ok(VisualReading {
            skin_ratio: round_to(coverage(&skin), 3),
            blood_visible: coverage(&blood) > self.blood_ratio,
            fire_visible: coverage(&masks.fire) > self.fire_ratio
                && masks.mean_brightness > self.fire_brightness,
            human_detected: false,
        })
    }
}
