// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the ResNet-50 scene classifier
//!
//! Matches the V2 ImageNet evaluation transform: bilinear resize of the
//! shorter side to 232, centre crop to 224, ImageNet mean/std normalisation.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

/// Shorter side after the first resize
pub const RESIZE_SHORTER_SIDE: u32 = 232;

/// Square crop fed to the network
pub const CROP_SIZE: u32 = 224;

/// Mean values for normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize so the shorter side equals `shorter`, keeping aspect ratio
pub fn resize_shorter_side(image: &DynamicImage, shorter: u32) -> DynamicImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return DynamicImage::new_rgb8(shorter, shorter);
    }

    let (new_w, new_h) = if w <= h {
        let new_h = (h as u64 * shorter as u64 / w as u64) as u32;
        (shorter, new_h.max(1))
    } else {
        let new_w = (w as u64 * shorter as u64 / h as u64) as u32;
        (new_w.max(1), shorter)
    };

    image.resize_exact(new_w, new_h, FilterType::Triangle)
}

/// Crop the centred `size x size` square (rounding the offset like torchvision)
pub fn center_crop(image: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = image.dimensions();
    let left = ((w as f32 - size as f32) / 2.0).round().max(0.0) as u32;
    let top = ((h as f32 - size as f32) / 2.0).round().max(0.0) as u32;
    image.crop_imm(left, top, size.min(w), size.min(h))
}

/// Preprocess an image for classification
///
/// Steps:
/// 1. Resize the shorter side to RESIZE_SHORTER_SIDE
/// 2. Centre crop CROP_SIZE x CROP_SIZE
/// 3. Normalize with ImageNet mean/std: (pixel/255 - mean) / std
/// 4. Convert to NCHW tensor format [1, 3, 224, 224]
pub fn preprocess_for_classification(image: &DynamicImage) -> Array4<f32> {
    let cropped = center_crop(&resize_shorter_side(image, RESIZE_SHORTER_SIDE), CROP_SIZE);
    let rgb = cropped.to_rgb8();
    let size = CROP_SIZE as usize;

    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    tensor
}
