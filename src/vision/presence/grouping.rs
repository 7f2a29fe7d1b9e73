// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Clustering of overlapping sliding-window hits
//!
//! Raw multi-scale detections fire many times around one object. Hits are
//! partitioned into clusters of similar rectangles, clusters with too few
//! members are rejected, and small clusters nested inside stronger ones are
//! dropped. This is the `minNeighbors` knob of the face detector and the
//! group threshold of the body detector.

/// Relative tolerance used when deciding two rectangles are the same hit
pub const GROUP_EPS: f64 = 0.2;

/// Axis-aligned rectangle in image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn similar(&self, other: &Rect, eps: f64) -> bool {
        let delta = eps
            * (self.width.min(other.width) + self.height.min(other.height)) as f64
            * 0.5;
        ((self.x - other.x).abs() as f64) <= delta
            && ((self.y - other.y).abs() as f64) <= delta
            && ((self.x + self.width - other.x - other.width).abs() as f64) <= delta
            && ((self.y + self.height - other.y - other.height).abs() as f64) <= delta
    }
}

/// Label each rectangle with its cluster index, clusters numbered by first member
fn partition(rects: &[Rect], eps: f64) -> (Vec<usize>, usize) {
    let mut parent: Vec<usize> = (0..rects.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if rects[i].similar(&rects[j], eps) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut labels = vec![0; rects.len()];
    let mut root_label: Vec<Option<usize>> = vec![None; rects.len()];
    let mut count = 0;
    for i in 0..rects.len() {
        let root = find(&mut parent, i);
        let label = *root_label[root].get_or_insert_with(|| {
            count += 1;
            count - 1
        });
        labels[i] = label;
    }

    (labels, count)
}

/// Cluster raw hits and keep clusters with more than `group_threshold` members
///
/// A threshold of zero returns the input unchanged.
pub fn group_rectangles(rects: &[Rect], group_threshold: usize, eps: f64) -> Vec<Rect> {
    if group_threshold == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let (labels, nclasses) = partition(rects, eps);

    let mut sums = vec![[0i64; 4]; nclasses];
    let mut weights = vec![0usize; nclasses];
    for (rect, &label) in rects.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += rect.x as i64;
        s[1] += rect.y as i64;
        s[2] += rect.width as i64;
        s[3] += rect.height as i64;
        weights[label] += 1;
    }

    let averaged: Vec<Rect> = sums
        .iter()
        .zip(&weights)
        .map(|(s, &n)| {
            let inv = 1.0 / n as f64;
            Rect::new(
                (s[0] as f64 * inv).round() as i32,
                (s[1] as f64 * inv).round() as i32,
                (s[2] as f64 * inv).round() as i32,
                (s[3] as f64 * inv).round() as i32,
            )
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = weights[i];
        if n1 <= group_threshold {
            continue;
        }

        // Drop clusters nested inside a stronger neighbour
        let nested = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = weights[j];
            if j == i || n2 <= group_threshold {
                return false;
            }
            let dx = (r2.width as f64 * eps).round() as i32;
            let dy = (r2.height as f64 * eps).round() as i32;
            r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.x + r1.width <= r2.x + r2.width + dx
                && r1.y + r1.height <= r2.y + r2.height + dy
                && (n2 > n1.max(3) || n1 < 3)
        });

        if !nested {
            grouped.push(*r1);
        }
    }

    grouped
}
