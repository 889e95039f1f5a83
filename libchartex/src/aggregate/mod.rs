//! Deduplication of extracted images.
//!
//! Images are identified by their original string (`full_image`), so
//! `nginx` and `docker.io/library/nginx:latest` stay distinct entries.

use crate::image::ImageReference;
use std::collections::HashMap;


const SOURCE_SEPARATOR: &str = ", ";

/// Collapses images sharing a `full_image`, merging their sources.
///
/// The first occurrence keeps its position and parsed fields. A later
/// occurrence only appends its source when that source is not already a
/// substring of the accumulated one.
pub fn dedupe(images: Vec<ImageReference>) -> Vec<ImageReference> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<ImageReference> = Vec::with_capacity(images.len());

    for image in images {
        match positions.get(&image.full_image) {
            Some(&index) => merge_source(&mut unique[index].source, &image.source),
            None => {
                positions.insert(image.full_image.clone(), unique.len());
                unique.push(image);
            }
        }
    }

    unique
}

/// Deduplicates and sorts by `full_image` ascending.
///
/// # Examples
///
/// ```
/// use libchartex::aggregate::finalize;
/// use libchartex::image::normalize;
///
/// let images = vec![
///     normalize("redis:7").with_source("StatefulSet/cache"),
///     normalize("nginx").with_source("Deployment/web"),
///     normalize("nginx").with_source("Deployment/api"),
/// ];
///
/// let images = finalize(images);
/// assert_eq!(images.len(), 2);
/// assert_eq!(images[0].full_image, "nginx");
/// assert_eq!(images[0].source, "Deployment/web, Deployment/api");
/// ```
pub fn finalize(images: Vec<ImageReference>) -> Vec<ImageReference> {
    let mut images = dedupe(images);
    images.sort_by(|a, b| a.full_image.cmp(&b.full_image));
    images
}

fn merge_source(accumulated: &mut String, incoming: &str) {
    if accumulated.contains(incoming) {
        return;
    }
    if !accumulated.is_empty() {
        accumulated.push_str(SOURCE_SEPARATOR);
    }
    accumulated.push_str(incoming);
}
