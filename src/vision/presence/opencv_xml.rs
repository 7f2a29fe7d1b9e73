// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Readers for OpenCV `FileStorage` XML
//!
//! Cascades from `opencv_traincascade` and HOG detectors written by
//! `HOGDescriptor::save` share this layout: an `<opencv_storage>` root, one
//! named object below it, scalars and number lists as element text, and
//! sequences as runs of `<_>` elements.

use std::path::Path;
use std::str::FromStr;

use roxmltree::{Document, Node};

/// Resource files ending in `.xml` (any case) are read as `FileStorage` XML
pub(crate) fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// The object stored under `<opencv_storage>`
pub(crate) fn storage_object<'a, 'input>(
    doc: &'a Document<'input>,
) -> Result<Node<'a, 'input>, String> {
    let root = doc.root_element();
    if root.tag_name().name() != "opencv_storage" {
        return Err(format!(
            "root element is <{}>, expected <opencv_storage>",
            root.tag_name().name()
        ));
    }
    elements(root)
        .next()
        .ok_or_else(|| "<opencv_storage> is empty".to_string())
}

/// Element children, skipping comments and whitespace
pub(crate) fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

pub(crate) fn child<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

pub(crate) fn require<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, String> {
    child(node, name).ok_or_else(|| format!("<{}> has no <{}>", node.tag_name().name(), name))
}

/// Text content; comments between text runs are dropped
pub(crate) fn text(node: Node) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whitespace-separated numbers in an element's text
pub(crate) fn numbers<T: FromStr>(node: Node) -> Result<Vec<T>, String> {
    text(node)
        .split_whitespace()
        .map(|token| {
            token.parse::<T>().map_err(|_| {
                format!("<{}> holds '{}', not a number", node.tag_name().name(), token)
            })
        })
        .collect()
}

/// Exactly `N` numbers in an element's text
pub(crate) fn fixed<T, const N: usize>(node: Node) -> Result<[T; N], String>
where
    T: FromStr + Copy + Default,
{
    let values = numbers::<T>(node)?;
    if values.len() != N {
        return Err(format!(
            "<{}> holds {} values, expected {}",
            node.tag_name().name(),
            values.len(),
            N
        ));
    }
    let mut out = [T::default(); N];
    out.copy_from_slice(&values);
    Ok(out)
}

pub(crate) fn scalar<T: FromStr + Copy + Default>(node: Node) -> Result<T, String> {
    fixed::<T, 1>(node).map(|[value]| value)
}
