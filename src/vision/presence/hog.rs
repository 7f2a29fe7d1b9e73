// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Histogram-of-oriented-gradients pedestrian detector
//!
//! Dalal-Triggs HOG with a linear SVM, laid out like OpenCV's default people
//! detector: 8x8 cells, 16x16 blocks on an 8 pixel stride, 9 unsigned
//! orientation bins, square-root gamma, Gaussian block weighting and L2-Hys
//! block normalisation. The SVM weights (3780 coefficients followed by the
//! bias for a 64x128 window) are read from the XML that
//! `HOGDescriptor::save` writes, or from JSON
//! `{ "width", "height", "detector": [...] }`.
//!
//! OpenCV ships the default people detector compiled in rather than as a
//! file. Export it once with:
//!
//! ```text
//! hog = cv2.HOGDescriptor()
//! hog.setSVMDetector(cv2.HOGDescriptor_getDefaultPeopleDetector())
//! hog.save("hog_people_detector.xml")
//! ```

use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, info};

use super::grouping::{group_rectangles, Rect, GROUP_EPS};
use super::opencv_xml;
use crate::error::ConfigurationError;

const CELL_SIZE: u32 = 8;
const BLOCK_SIZE: u32 = 16;
const BLOCK_STRIDE: u32 = 8;
const NBINS: usize = 9;
const CELLS_PER_BLOCK: usize = 4;
const BLOCK_HIST_LEN: usize = NBINS * CELLS_PER_BLOCK;
const L2HYS_THRESHOLD: f32 = 0.2;
const MAX_LEVELS: usize = 64;

/// Multi-scale scan parameters
#[derive(Debug, Clone, Copy)]
pub struct BodyScanParams {
    /// Window step in pixels (must divide the 8 pixel block stride)
    pub win_stride: u32,
    /// Border added around the image so windows may start outside it
    pub padding: u32,
    /// Image shrink factor between pyramid levels (> 1.0)
    pub scale: f64,
    /// Minimum SVM score for a window to count as a hit
    pub hit_threshold: f32,
    /// Raw hits a cluster needs beyond itself to be kept
    pub group_threshold: usize,
}

impl Default for BodyScanParams {
    fn default() -> Self {
        Self {
            win_stride: 4,
            padding: 8,
            scale: 1.05,
            hit_threshold: 0.0,
            group_threshold: 2,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HogDefinition {
    width: u32,
    height: u32,
    detector: Vec<f32>,
}

/// A saved `HOGDescriptor` with its optional geometry fields kept for checking
struct SavedHog {
    width: u32,
    height: u32,
    detector: Vec<f32>,
    geometry: Vec<(&'static str, Vec<u32>, Vec<u32>)>,
}

fn hog_from_xml(doc: &roxmltree::Document) -> Result<SavedHog, String> {
    let hog = opencv_xml::storage_object(doc)?;
    let [width, height]: [u32; 2] = opencv_xml::fixed(opencv_xml::require(hog, "winSize")?)?;

    let expected: [(&'static str, Vec<u32>); 5] = [
        ("blockSize", vec![BLOCK_SIZE, BLOCK_SIZE]),
        ("blockStride", vec![BLOCK_STRIDE, BLOCK_STRIDE]),
        ("cellSize", vec![CELL_SIZE, CELL_SIZE]),
        ("nbins", vec![NBINS as u32]),
        ("signedGradient", vec![0]),
    ];
    let mut geometry = Vec::new();
    for (field, wanted) in expected {
        if let Some(node) = opencv_xml::child(hog, field) {
            geometry.push((field, opencv_xml::numbers::<u32>(node)?, wanted));
        }
    }

    // Written as a plain sequence, or as an opencv-matrix with a <data> child
    let svm = opencv_xml::require(hog, "SVMDetector")?;
    let detector = match opencv_xml::child(svm, "data") {
        Some(data) => opencv_xml::numbers::<f32>(data)?,
        None => opencv_xml::numbers::<f32>(svm)?,
    };
    if detector.is_empty() {
        return Err("<SVMDetector> is empty".to_string());
    }

    Ok(SavedHog {
        width,
        height,
        detector,
        geometry,
    })
}

/// Per-pixel gradient votes: two neighbouring orientation bins and their magnitudes
struct Gradients {
    width: usize,
    bins: Vec<[u8; 2]>,
    mags: Vec<[f32; 2]>,
}

/// Spatial + Gaussian vote weights of one block pixel into up to four cells
#[derive(Clone, Copy, Default)]
struct PixelVote {
    cells: [usize; 4],
    weights: [f32; 4],
    count: usize,
}

/// HOG descriptor geometry and linear SVM
pub struct HogPeopleDetector {
    width: u32,
    height: u32,
    weights: Vec<f32>,
    bias: f32,
    votes: Vec<PixelVote>,
    gamma_lut: [f32; 256],
}

impl std::fmt::Debug for HogPeopleDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HogPeopleDetector")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("descriptor_len", &self.weights.len())
            .field("bias", &self.bias)
            .finish_non_exhaustive()
    }
}

/// Descriptor length for a detection window
pub fn descriptor_len(width: u32, height: u32) -> usize {
    let blocks_x = ((width - BLOCK_SIZE) / BLOCK_STRIDE + 1) as usize;
    let blocks_y = ((height - BLOCK_SIZE) / BLOCK_STRIDE + 1) as usize;
    blocks_x * blocks_y * BLOCK_HIST_LEN
}

/// Mirror index into `[0, n)` without repeating the edge pixel
fn reflect101(i: i64, n: i64) -> usize {
    if n == 1 {
        return 0;
    }
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl HogPeopleDetector {
    /// Load SVM weights from a `HOGDescriptor::save` XML file or JSON
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::from_io(path, e))?;
        let detector = if opencv_xml::is_xml(path) {
            Self::from_xml_str(&content, path)?
        } else {
            Self::from_json_str(&content, path)?
        };

        info!(
            "✅ HOG people detector loaded from {} ({}x{} window, {} coefficients)",
            path.display(),
            detector.width,
            detector.height,
            detector.weights.len()
        );

        Ok(detector)
    }

    /// Parse SVM weights; `origin` names the resource in errors
    pub fn from_json_str(content: &str, origin: &Path) -> Result<Self, ConfigurationError> {
        let definition: HogDefinition =
            serde_json::from_str(content).map_err(|e| ConfigurationError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

        Self::new(definition.width, definition.height, definition.detector).map_err(|reason| {
            ConfigurationError::Invalid {
                path: origin.to_path_buf(),
                reason,
            }
        })
    }

    /// Parse a saved `HOGDescriptor`; `origin` names the resource in errors
    ///
    /// Geometry fields other than `winSize` are optional but must match the
    /// fixed 16/8/8 block layout with 9 unsigned bins when present.
    pub fn from_xml_str(content: &str, origin: &Path) -> Result<Self, ConfigurationError> {
        let parse_error = |message: String| ConfigurationError::Parse {
            path: origin.to_path_buf(),
            message,
        };
        let invalid = |reason: String| ConfigurationError::Invalid {
            path: origin.to_path_buf(),
            reason,
        };

        let doc = roxmltree::Document::parse(content).map_err(|e| parse_error(e.to_string()))?;
        let definition = hog_from_xml(&doc).map_err(parse_error)?;

        for (field, value, expected) in &definition.geometry {
            if value != expected {
                return Err(invalid(format!(
                    "<{}> is {:?}, only {:?} is supported",
                    field, value, expected
                )));
            }
        }

        Self::new(definition.width, definition.height, definition.detector).map_err(invalid)
    }

    /// Build a detector from descriptor coefficients followed by the bias
    pub fn new(width: u32, height: u32, mut detector: Vec<f32>) -> Result<Self, String> {
        if width < BLOCK_SIZE
            || height < BLOCK_SIZE
            || (width - BLOCK_SIZE) % BLOCK_STRIDE != 0
            || (height - BLOCK_SIZE) % BLOCK_STRIDE != 0
        {
            return Err(format!(
                "window {}x{} does not tile into 16x16 blocks on an 8 pixel stride",
                width, height
            ));
        }

        let expected = descriptor_len(width, height);
        if detector.len() != expected + 1 {
            return Err(format!(
                "expected {} coefficients plus bias, got {} values",
                expected,
                detector.len()
            ));
        }
        let bias = detector.pop().unwrap_or_default();

        let mut gamma_lut = [0f32; 256];
        for (i, v) in gamma_lut.iter_mut().enumerate() {
            *v = (i as f32).sqrt();
        }

        Ok(Self {
            width,
            height,
            weights: detector,
            bias,
            votes: Self::block_votes(),
            gamma_lut,
        })
    }

    /// Detection window size
    pub fn window(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Gaussian-weighted bilinear cell votes for every pixel of a block
    fn block_votes() -> Vec<PixelVote> {
        let sigma = (BLOCK_SIZE + BLOCK_SIZE) as f32 / 8.0;
        let gauss_scale = 1.0 / (sigma * sigma * 2.0);
        let half = BLOCK_SIZE as f32 * 0.5;
        let mut votes = Vec::with_capacity((BLOCK_SIZE * BLOCK_SIZE) as usize);

        for py in 0..BLOCK_SIZE {
            for px in 0..BLOCK_SIZE {
                let (dx, dy) = (px as f32 - half, py as f32 - half);
                let gauss = (-(dx * dx + dy * dy) * gauss_scale).exp();

                let fx = (px as f32 + 0.5) / CELL_SIZE as f32 - 0.5;
                let fy = (py as f32 + 0.5) / CELL_SIZE as f32 - 0.5;
                let (cx0, cy0) = (fx.floor() as i32, fy.floor() as i32);
                let (ax, ay) = (fx - cx0 as f32, fy - cy0 as f32);

                let mut vote = PixelVote::default();
                for (cx, wx) in [(cx0, 1.0 - ax), (cx0 + 1, ax)] {
                    for (cy, wy) in [(cy0, 1.0 - ay), (cy0 + 1, ay)] {
                        if (0..2).contains(&cx) && (0..2).contains(&cy) && wx * wy > 0.0 {
                            // Cells are numbered column-major inside the block
                            vote.cells[vote.count] = (cx * 2 + cy) as usize;
                            vote.weights[vote.count] = gauss * wx * wy;
                            vote.count += 1;
                        }
                    }
                }
                votes.push(vote);
            }
        }

        votes
    }

    /// Gradients of the padded image, strongest colour channel per pixel
    fn compute_gradients(&self, rgb: &RgbImage, pad: u32) -> Gradients {
        let (w, h) = (rgb.width() as i64, rgb.height() as i64);
        let pad = pad as i64;
        let (pw, ph) = ((w + 2 * pad) as usize, (h + 2 * pad) as usize);
        let mut bins = vec![[0u8; 2]; pw * ph];
        let mut mags = vec![[0f32; 2]; pw * ph];
        let angle_scale = NBINS as f32 / std::f32::consts::PI;

        let sample = |x: i64, y: i64, c: usize| -> f32 {
            let px = rgb.get_pixel(reflect101(x - pad, w) as u32, reflect101(y - pad, h) as u32);
            self.gamma_lut[px[c] as usize]
        };

        for y in 0..ph as i64 {
            for x in 0..pw as i64 {
                let (mut best_dx, mut best_dy, mut best_sq) = (0f32, 0f32, -1f32);
                for c in 0..3 {
                    let dx = sample(x + 1, y, c) - sample(x - 1, y, c);
                    let dy = sample(x, y + 1, c) - sample(x, y - 1, c);
                    let sq = dx * dx + dy * dy;
                    if sq > best_sq {
                        (best_dx, best_dy, best_sq) = (dx, dy, sq);
                    }
                }

                let mag = best_sq.sqrt();
                let mut angle = best_dy.atan2(best_dx);
                if angle < 0.0 {
                    angle += 2.0 * std::f32::consts::PI;
                }
                let angle = angle * angle_scale - 0.5;
                let hidx = angle.floor();
                let frac = angle - hidx;
                let bin0 = (hidx as i32).rem_euclid(NBINS as i32) as usize;
                let bin1 = (bin0 + 1) % NBINS;

                let idx = y as usize * pw + x as usize;
                bins[idx] = [bin0 as u8, bin1 as u8];
                mags[idx] = [mag * (1.0 - frac), mag * frac];
            }
        }

        Gradients {
            width: pw,
            bins,
            mags,
        }
    }

    /// Weighted, L2-Hys normalised histogram of the block at `(bx, by)`
    fn block_histogram(&self, grads: &Gradients, bx: usize, by: usize) -> [f32; BLOCK_HIST_LEN] {
        let mut hist = [0f32; BLOCK_HIST_LEN];
        let block = BLOCK_SIZE as usize;

        for py in 0..block {
            let row = (by + py) * grads.width + bx;
            for px in 0..block {
                let idx = row + px;
                let vote = &self.votes[py * block + px];
                let [b0, b1] = grads.bins[idx];
                let [m0, m1] = grads.mags[idx];
                for k in 0..vote.count {
                    let base = vote.cells[k] * NBINS;
                    hist[base + b0 as usize] += m0 * vote.weights[k];
                    hist[base + b1 as usize] += m1 * vote.weights[k];
                }
            }
        }

        normalize_l2hys(&mut hist);
        hist
    }

    /// SVM scores above the hit threshold at one pyramid level, in level pixels
    fn scan_level(&self, rgb: &RgbImage, params: &BodyScanParams) -> Vec<(i64, i64)> {
        let pad = params.padding;
        let grads = self.compute_gradients(rgb, pad);
        let (pw, ph) = (rgb.width() + 2 * pad, rgb.height() + 2 * pad);
        if pw < self.width || ph < self.height {
            return Vec::new();
        }

        // Block histograms on a grid fine enough for every window position
        let step = gcd(params.win_stride.max(1), BLOCK_STRIDE);
        let grid_w = ((pw - BLOCK_SIZE) / step + 1) as usize;
        let grid_h = ((ph - BLOCK_SIZE) / step + 1) as usize;
        let mut cache = Vec::with_capacity(grid_w * grid_h);
        for gy in 0..grid_h {
            for gx in 0..grid_w {
                cache.push(self.block_histogram(
                    &grads,
                    gx * step as usize,
                    gy * step as usize,
                ));
            }
        }

        let blocks_x = ((self.width - BLOCK_SIZE) / BLOCK_STRIDE + 1) as usize;
        let blocks_y = ((self.height - BLOCK_SIZE) / BLOCK_STRIDE + 1) as usize;
        let block_cells = (BLOCK_STRIDE / step) as usize;
        let win_cells = (params.win_stride.max(1) / step) as usize;

        let mut hits = Vec::new();
        let windows_x = ((pw - self.width) / params.win_stride.max(1) + 1) as usize;
        let windows_y = ((ph - self.height) / params.win_stride.max(1) + 1) as usize;
        for wy in 0..windows_y {
            for wx in 0..windows_x {
                let (gx0, gy0) = (wx * win_cells, wy * win_cells);
                let mut score = self.bias;
                // Blocks are ordered column-major across the window
                for bxi in 0..blocks_x {
                    for byi in 0..blocks_y {
                        let j = bxi * blocks_y + byi;
                        let hist = &cache[(gy0 + byi * block_cells) * grid_w
                            + gx0
                            + bxi * block_cells];
                        let w = &self.weights[j * BLOCK_HIST_LEN..(j + 1) * BLOCK_HIST_LEN];
                        score += hist.iter().zip(w).map(|(h, w)| h * w).sum::<f32>();
                    }
                }

                if score >= params.hit_threshold {
                    let stride = params.win_stride.max(1) as i64;
                    hits.push((wx as i64 * stride - pad as i64, wy as i64 * stride - pad as i64));
                }
            }
        }

        hits
    }

    /// Raw hits across the image pyramid, in original image pixels
    pub fn raw_detections(&self, rgb: &RgbImage, params: &BodyScanParams) -> Vec<Rect> {
        let (img_w, img_h) = rgb.dimensions();
        let scale_step = params.scale.max(1.0001);
        let mut hits = Vec::new();

        let mut scale = 1.0f64;
        for _ in 0..MAX_LEVELS {
            let level_w = (img_w as f64 / scale).round() as u32;
            let level_h = (img_h as f64 / scale).round() as u32;
            if level_w < self.width || level_h < self.height {
                break;
            }

            let level_hits = if level_w == img_w && level_h == img_h {
                self.scan_level(rgb, params)
            } else {
                let resized = image::imageops::resize(rgb, level_w, level_h, FilterType::Triangle);
                self.scan_level(&resized, params)
            };

            for (x, y) in level_hits {
                hits.push(Rect::new(
                    (x as f64 * scale).round() as i32,
                    (y as f64 * scale).round() as i32,
                    (self.width as f64 * scale).round() as i32,
                    (self.height as f64 * scale).round() as i32,
                ));
            }

            scale *= scale_step;
        }

        hits
    }

    /// Multi-scale detection with grouping
    pub fn detect_multi_scale(&self, rgb: &RgbImage, params: &BodyScanParams) -> Vec<Rect> {
        let raw = self.raw_detections(rgb, params);
        let people = group_rectangles(&raw, params.group_threshold, GROUP_EPS);
        debug!(
            "HOG scan: {} raw hits, {} after grouping",
            raw.len(),
            people.len()
        );
        people
    }
}

/// L2 normalise, clip at 0.2, renormalise
fn normalize_l2hys(hist: &mut [f32]) {
    let sum: f32 = hist.iter().map(|v| v * v).sum();
    let scale = 1.0 / (sum.sqrt() + hist.len() as f32 * 0.1);

    let mut sum = 0.0;
    for v in hist.iter_mut() {
        *v = (*v * scale).min(L2HYS_THRESHOLD);
        sum += *v * *v;
    }

    let scale = 1.0 / (sum.sqrt() + 1e-3);
    for v in hist.iter_mut() {
        *v *= scale;
    }
}
