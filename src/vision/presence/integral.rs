// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Summed-area tables for constant-time rectangle sums

use image::GrayImage;

/// Integral and squared-integral image of a grayscale image
///
/// Both tables are `(width + 1) x (height + 1)` with a zero first row and column.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    sum: Vec<i64>,
    sq_sum: Vec<f64>,
}

impl IntegralImage {
    pub fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let stride = width as usize + 1;
        let mut sum = vec![0i64; stride * (height as usize + 1)];
        let mut sq_sum = vec![0f64; stride * (height as usize + 1)];

        for y in 0..height as usize {
            let mut row_sum = 0i64;
            let mut row_sq_sum = 0f64;
            for x in 0..width as usize {
                let v = gray.get_pixel(x as u32, y as u32)[0] as i64;
                row_sum += v;
                row_sq_sum += (v * v) as f64;

                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq_sum;
            }
        }

        Self {
            width,
            height,
            sum,
            sq_sum,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum of pixels in `[x, x + w) x [y, y + h)`
    #[inline]
    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> i64 {
        let stride = self.width as usize + 1;
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        self.sum[y1 * stride + x1] - self.sum[y0 * stride + x1] - self.sum[y1 * stride + x0]
            + self.sum[y0 * stride + x0]
    }

    /// Sum of squared pixels in `[x, x + w) x [y, y + h)`
    #[inline]
    pub fn rect_sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        let stride = self.width as usize + 1;
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        self.sq_sum[y1 * stride + x1] - self.sq_sum[y0 * stride + x1]
            - self.sq_sum[y1 * stride + x0]
            + self.sq_sum[y0 * stride + x0]
    }
}
