//! Pixel heuristics behind the disease-detection prompt.
//!
//! # Responsibilities
//! - Quantize colours to 32-step buckets and keep the five most frequent
//! - Derive coarse patterns from the dominant colours
//! - Flag the horizontal thirds that contain strongly light or dark pixels

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Number of dominant colours kept.
const DOMINANT_COLORS: usize = 5;

/// Channel mean a pixel must stray from to mark its band as affected.
const NEUTRAL_LEVEL: u32 = 128;
const AFFECTED_DEVIATION: u32 = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for RGBA data")]
    BufferLength { expected: usize, actual: usize },

    #[error("image dimensions {width}x{height} are too large")]
    TooLarge { width: u32, height: u32 },
}

/// A colour with every channel rounded down to a multiple of 32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct QuantizedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl QuantizedColor {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r & 0xE0,
            g: g & 0xE0,
            b: b & 0xE0,
        }
    }
}

impl fmt::Display for QuantizedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

impl From<QuantizedColor> for String {
    fn from(color: QuantizedColor) -> Self {
        color.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// First and third dominant colours differ.
    VerticalGradient,
    /// First and second dominant colours differ.
    Spots,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::VerticalGradient => write!(f, "vertical_gradient"),
            Pattern::Spots => write!(f, "spots"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AffectedArea {
    Upper,
    Middle,
    Lower,
}

impl AffectedArea {
    const ALL: [AffectedArea; 3] = [AffectedArea::Upper, AffectedArea::Middle, AffectedArea::Lower];
}

impl fmt::Display for AffectedArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffectedArea::Upper => write!(f, "upper"),
            AffectedArea::Middle => write!(f, "middle"),
            AffectedArea::Lower => write!(f, "lower"),
        }
    }
}

/// Features extracted from one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageFeatures {
    /// Most frequent quantized colours, most frequent first.
    pub colors: Vec<QuantizedColor>,
    pub patterns: Vec<Pattern>,
    /// Bands in top-to-bottom order.
    pub affected_areas: Vec<AffectedArea>,
}

impl ImageFeatures {
    /// Feature lines for the diagnosis prompt.
    pub fn summary(&self) -> String {
        format!(
            "- Dominant Colors: {}\n- Detected Patterns: {}\n- Affected Areas: {}",
            join_or(&self.colors, ""),
            join_or(&self.patterns, "uniform"),
            join_or(&self.affected_areas, "none detected"),
        )
    }
}

fn join_or<T: fmt::Display>(items: &[T], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Extract features from `rgba`, laid out row by row, four bytes per pixel.
pub fn extract_features(width: u32, height: u32, rgba: &[u8]) -> Result<ImageFeatures, AnalysisError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(AnalysisError::TooLarge { width, height })?;

    if rgba.len() != expected {
        return Err(AnalysisError::BufferLength {
            expected,
            actual: rgba.len(),
        });
    }

    if expected == 0 {
        return Ok(ImageFeatures::default());
    }

    let colors = dominant_colors(rgba);
    let patterns = patterns(&colors);
    let affected_areas = affected_areas(width as usize, height as usize, rgba);

    Ok(ImageFeatures {
        colors,
        patterns,
        affected_areas,
    })
}

/// Ties keep the colour seen first.
fn dominant_colors(rgba: &[u8]) -> Vec<QuantizedColor> {
    let mut index: HashMap<QuantizedColor, usize> = HashMap::new();
    let mut counts: Vec<(QuantizedColor, u64)> = Vec::new();

    for pixel in rgba.chunks_exact(4) {
        let color = QuantizedColor::from_rgb(pixel[0], pixel[1], pixel[2]);
        let slot = *index.entry(color).or_insert_with(|| {
            counts.push((color, 0));
            counts.len() - 1
        });
        counts[slot].1 += 1;
    }

    // Stable sort preserves first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(DOMINANT_COLORS)
        .map(|(color, _)| color)
        .collect()
}

fn patterns(colors: &[QuantizedColor]) -> Vec<Pattern> {
    let Some(top) = colors.first() else {
        return Vec::new();
    };
    let middle = colors.get(1).unwrap_or(top);
    let bottom = colors.get(2).unwrap_or(top);

    let mut patterns = Vec::new();
    if top != bottom {
        patterns.push(Pattern::VerticalGradient);
    }
    if top != middle {
        patterns.push(Pattern::Spots);
    }
    patterns
}

/// Row `y` belongs to band `floor(3y / height)`.
fn affected_areas(width: usize, height: usize, rgba: &[u8]) -> Vec<AffectedArea> {
    let mut affected = [false; 3];

    for (y, row) in rgba.chunks_exact(width * 4).enumerate() {
        let band = (y * 3 / height).min(2);
        if affected[band] {
            continue;
        }
        affected[band] = row.chunks_exact(4).any(is_extreme);
    }

    AffectedArea::ALL
        .into_iter()
        .zip(affected)
        .filter_map(|(area, hit)| hit.then_some(area))
        .collect()
}

/// Mean of the colour channels differs from mid-grey by more than the threshold.
fn is_extreme(pixel: &[u8]) -> bool {
    let sum = u32::from(pixel[0]) + u32::from(pixel[1]) + u32::from(pixel[2]);
    sum.abs_diff(NEUTRAL_LEVEL * 3) > AFFECTED_DEVIATION * 3
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: [u8; 4] = [40, 140, 60, 255];
    const GREY: [u8; 4] = [128, 128, 128, 255];
    const BROWN: [u8; 4] = [100, 70, 40, 255];
    const WHITE: [u8; 4] = [250, 250, 250, 255];

    /// Build an image from rows of pixels.
    fn image(rows: &[Vec<[u8; 4]>]) -> (u32, u32, Vec<u8>) {
        let width = rows.first().map_or(0, Vec::len) as u32;
        let data = rows.iter().flatten().flatten().copied().collect();
        (width, rows.len() as u32, data)
    }

    #[test]
    fn test_quantization() {
        assert_eq!(QuantizedColor::from_rgb(40, 140, 60).to_string(), "rgb(32,128,32)");
        assert_eq!(QuantizedColor::from_rgb(31, 32, 255).to_string(), "rgb(0,32,224)");
    }

    #[test]
    fn test_single_pixel_image() {
        let features = extract_features(1, 1, &GREY).unwrap();
        assert_eq!(features.colors, vec![QuantizedColor::from_rgb(128, 128, 128)]);
        assert!(features.patterns.is_empty());
        assert!(features.affected_areas.is_empty());

        let features = extract_features(1, 1, &WHITE).unwrap();
        assert_eq!(features.affected_areas, vec![AffectedArea::Upper]);
    }

    #[test]
    fn test_empty_images() {
        assert_eq!(extract_features(0, 0, &[]).unwrap(), ImageFeatures::default());
        assert_eq!(extract_features(0, 7, &[]).unwrap(), ImageFeatures::default());
        assert_eq!(extract_features(7, 0, &[]).unwrap(), ImageFeatures::default());
    }

    #[test]
    fn test_buffer_length_mismatch() {
        let err = extract_features(2, 2, &[0; 15]).unwrap_err();
        assert_eq!(err, AnalysisError::BufferLength { expected: 16, actual: 15 });

        let err = extract_features(0, 3, &GREY).unwrap_err();
        assert_eq!(err, AnalysisError::BufferLength { expected: 0, actual: 4 });
    }

    #[test]
    fn test_dominant_colors_ordered_by_frequency() {
        let (w, h, data) = image(&[
            vec![GREEN, GREEN, GREEN],
            vec![BROWN, BROWN, GREY],
        ]);
        let features = extract_features(w, h, &data).unwrap();

        assert_eq!(
            features.colors,
            vec![
                QuantizedColor::from_rgb(40, 140, 60),
                QuantizedColor::from_rgb(100, 70, 40),
                QuantizedColor::from_rgb(128, 128, 128),
            ]
        );
        assert_eq!(features.patterns, vec![Pattern::VerticalGradient, Pattern::Spots]);
    }

    #[test]
    fn test_ties_keep_first_seen_color() {
        let (w, h, data) = image(&[vec![BROWN, GREEN, GREEN, BROWN]]);
        let features = extract_features(w, h, &data).unwrap();
        assert_eq!(features.colors[0], QuantizedColor::from_rgb(100, 70, 40));
    }

    #[test]
    fn test_at_most_five_colors() {
        let row: Vec<[u8; 4]> = (0..8u8).map(|i| [i * 32, 0, 0, 255]).collect();
        let (w, h, data) = image(&[row]);
        let features = extract_features(w, h, &data).unwrap();
        assert_eq!(features.colors.len(), 5);
    }

    #[test]
    fn test_two_colors_give_only_spots() {
        // Missing third colour falls back to the first.
        let (w, h, data) = image(&[vec![GREEN, GREEN, BROWN]]);
        let features = extract_features(w, h, &data).unwrap();
        assert_eq!(features.patterns, vec![Pattern::Spots]);
    }

    #[test]
    fn test_affected_areas_by_band() {
        let (w, h, data) = image(&[
            vec![GREY, GREY],
            vec![GREY, GREY],
            vec![GREY, WHITE],
        ]);
        let features = extract_features(w, h, &data).unwrap();
        assert_eq!(features.affected_areas, vec![AffectedArea::Lower]);
    }

    #[test]
    fn test_height_not_divisible_by_three() {
        // Rows 0..=2 upper, 3..=4 middle, 5..=6 lower for height 7.
        let mut rows = vec![vec![GREY]; 7];
        rows[1] = vec![[10, 10, 10, 255]];
        rows[4] = vec![WHITE];
        let (w, h, data) = image(&rows);
        let features = extract_features(w, h, &data).unwrap();
        assert_eq!(features.affected_areas, vec![AffectedArea::Upper, AffectedArea::Middle]);

        let mut rows = vec![vec![GREY]; 4];
        rows[3] = vec![WHITE];
        let (w, h, data) = image(&rows);
        let features = extract_features(w, h, &data).unwrap();
        assert_eq!(features.affected_areas, vec![AffectedArea::Lower]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // Mean 178 is exactly 50 above neutral.
        let (w, h, data) = image(&[vec![[178, 178, 178, 255]]]);
        assert!(extract_features(w, h, &data).unwrap().affected_areas.is_empty());

        let (w, h, data) = image(&[vec![[179, 178, 178, 255]]]);
        assert_eq!(extract_features(w, h, &data).unwrap().affected_areas, vec![AffectedArea::Upper]);
    }

    #[test]
    fn test_serialized_shape() {
        let (w, h, data) = image(&[vec![GREEN, BROWN, WHITE]]);
        let features = extract_features(w, h, &data).unwrap();
        let json = serde_json::to_value(&features).unwrap();

        assert_eq!(json["colors"][0], "rgb(32,128,32)");
        assert_eq!(json["patterns"][0], "vertical_gradient");
        assert_eq!(json["affected_areas"][0], "upper");
    }

    #[test]
    fn test_summary_fallbacks() {
        let features = extract_features(1, 1, &GREY).unwrap();
        assert_eq!(
            features.summary(),
            "- Dominant Colors: rgb(128,128,128)\n- Detected Patterns: uniform\n- Affected Areas: none detected"
        );
    }
}
