// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Letterbox preprocessing for YOLOv8

use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Square input size of the exported detector
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Border colour used to pad the resized image
pub const LETTERBOX_FILL: u8 = 114;

/// Scale and padding applied by [`letterbox`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Map a point from model input space back to the original image, clamped to its bounds
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = (x - self.pad_x as f32) / self.scale;
        let oy = (y - self.pad_y as f32) / self.scale;
        (
            ox.clamp(0.0, self.original_width as f32),
            oy.clamp(0.0, self.original_height as f32),
        )
    }
}

/// Resize preserving aspect ratio, centre on a gray square canvas
pub fn letterbox(image: &DynamicImage, target_size: u32) -> (RgbImage, LetterboxInfo) {
    let (orig_w, orig_h) = image.dimensions();
    let mut canvas = RgbImage::from_pixel(
        target_size,
        target_size,
        Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]),
    );

    if orig_w == 0 || orig_h == 0 {
        let info = LetterboxInfo {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
            original_width: orig_w,
            original_height: orig_h,
        };
        return (canvas, info);
    }

    let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let resized = image
        .resize_exact(new_w, new_h, FilterType::Triangle)
        .to_rgb8();
    image::imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    let info = LetterboxInfo {
        scale,
        pad_x,
        pad_y,
        original_width: orig_w,
        original_height: orig_h,
    };
    (canvas, info)
}

/// Letterbox to [`YOLO_INPUT_SIZE`] and scale to `[0, 1]` in NCHW layout
pub fn preprocess_for_detection(image: &DynamicImage) -> (Array4<f32>, LetterboxInfo) {
    let (canvas, info) = letterbox(image, YOLO_INPUT_SIZE);
    let size = YOLO_INPUT_SIZE as usize;

    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}
