//! JSON + PNG interchange for generated atlases.
//!
//! The JSON layout follows the common MSDF atlas description:
//!
//! ```json
//! {
//!   "atlas": { "type": "msdf", "distanceRange": 4, "size": 48,
//!              "width": 112, "height": 56, "yOrigin": "top" },
//!   "metrics": { "emSize": 1, "lineHeight": 1.1, "ascender": 0.8, "descender": -0.2 },
//!   "glyphs": [ { "unicode": 65, "advance": 0.6,
//!                 "planeBounds": { "left": .., "bottom": .., "right": .., "top": .. },
//!                 "atlasBounds": { "left": .., "bottom": .., "right": .., "top": .. } } ]
//! }
//! ```
//!
//! `yOrigin` applies to both rectangles. With `"top"`, atlas rows count down
//! from the top edge and plane bounds are negated so y points down; with
//! `"bottom"`, atlas rows count up from the bottom edge and plane bounds keep
//! the font's y-up orientation. Readers must honour the field: ignoring it
//! flips every glyph vertically.

use std::path::{Path, PathBuf};

use astrelis_core::alloc::HashMap;
use astrelis_core::geometry::Rect;
use serde::{Deserialize, Serialize};

use crate::atlas::{AtlasConfig, AtlasGlyph, AtlasResult, GlyphMetrics, uv_rect};
use crate::edge::Bounds;
use crate::error::{MsdfError, MsdfResult};
use crate::font::FontMetrics;
use crate::rasterize::AlphaMode;

/// Vertical origin of the rectangles in an [`AtlasDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YOrigin {
    /// Row 0 is the top edge of the image.
    #[default]
    Top,
    /// Row 0 is the bottom edge of the image.
    Bottom,
}

/// Distance field layout named in `atlas.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtlasKind {
    Msdf,
    Mtsdf,
}

impl From<AlphaMode> for AtlasKind {
    fn from(alpha: AlphaMode) -> Self {
        match alpha {
            AlphaMode::Opaque => AtlasKind::Msdf,
            AlphaMode::TrueDistance => AtlasKind::Mtsdf,
        }
    }
}

impl From<AtlasKind> for AlphaMode {
    fn from(kind: AtlasKind) -> Self {
        match kind {
            AtlasKind::Msdf => AlphaMode::Opaque,
            AtlasKind::Mtsdf => AlphaMode::TrueDistance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasInfo {
    #[serde(rename = "type")]
    pub kind: AtlasKind,
    pub distance_range: f64,
    /// Pixels per em.
    pub size: f64,
    pub width: u32,
    pub height: u32,
    pub y_origin: YOrigin,
    #[serde(default)]
    pub padding: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetrics {
    pub em_size: f64,
    pub line_height: f64,
    pub ascender: f64,
    pub descender: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsRecord {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphRecord {
    pub unicode: u32,
    pub advance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plane_bounds: Option<BoundsRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atlas_bounds: Option<BoundsRecord>,
}

/// The JSON half of a saved atlas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasDocument {
    pub atlas: AtlasInfo,
    pub metrics: DocumentMetrics,
    pub glyphs: Vec<GlyphRecord>,
}

fn plane_record(plane: &Bounds, y_origin: YOrigin) -> BoundsRecord {
    match y_origin {
        YOrigin::Bottom => BoundsRecord {
            left: plane.left,
            bottom: plane.bottom,
            right: plane.right,
            top: plane.top,
        },
        YOrigin::Top => BoundsRecord {
            left: plane.left,
            bottom: -plane.bottom,
            right: plane.right,
            top: -plane.top,
        },
    }
}

fn plane_from_record(record: &BoundsRecord, y_origin: YOrigin) -> Bounds {
    match y_origin {
        YOrigin::Bottom => Bounds {
            left: record.left,
            bottom: record.bottom,
            right: record.right,
            top: record.top,
        },
        YOrigin::Top => Bounds {
            left: record.left,
            bottom: -record.bottom,
            right: record.right,
            top: -record.top,
        },
    }
}

fn atlas_record(rect: &Rect<u32>, atlas_height: u32, y_origin: YOrigin) -> BoundsRecord {
    let (left, right) = (f64::from(rect.x), f64::from(rect.right()));
    match y_origin {
        YOrigin::Top => BoundsRecord {
            left,
            bottom: f64::from(rect.bottom()),
            right,
            top: f64::from(rect.y),
        },
        YOrigin::Bottom => BoundsRecord {
            left,
            bottom: f64::from(atlas_height - rect.bottom()),
            right,
            top: f64::from(atlas_height - rect.y),
        },
    }
}

fn rect_from_record(
    record: &BoundsRecord,
    width: u32,
    height: u32,
    y_origin: YOrigin,
) -> MsdfResult<Rect<u32>> {
    let (top_row, bottom_row) = match y_origin {
        YOrigin::Top => (record.top, record.bottom),
        YOrigin::Bottom => (
            f64::from(height) - record.top,
            f64::from(height) - record.bottom,
        ),
    };
    let in_range = |v: f64, max: u32| v.is_finite() && v >= 0.0 && v <= f64::from(max);
    if !(in_range(record.left, width)
        && in_range(record.right, width)
        && in_range(top_row, height)
        && in_range(bottom_row, height)
        && record.right >= record.left
        && bottom_row >= top_row)
    {
        return Err(MsdfError::Interchange {
            reason: format!("atlas bounds {record:?} lie outside the {width}x{height} atlas"),
        });
    }
    let (x, y) = (record.left.round() as u32, top_row.round() as u32);
    Ok(Rect::new(
        x,
        y,
        record.right.round() as u32 - x,
        bottom_row.round() as u32 - y,
    ))
}

impl AtlasResult {
    /// Describe the atlas as an interchange document.
    pub fn to_document(&self, y_origin: YOrigin) -> AtlasDocument {
        let glyphs = self
            .codepoints()
            .into_iter()
            .filter_map(|ch| self.glyphs.get(&ch))
            .map(|glyph| GlyphRecord {
                unicode: glyph.codepoint as u32,
                advance: f64::from(glyph.metrics.advance_width),
                plane_bounds: glyph
                    .plane_bounds
                    .as_ref()
                    .map(|plane| plane_record(plane, y_origin)),
                atlas_bounds: glyph
                    .atlas_bounds
                    .as_ref()
                    .map(|rect| atlas_record(rect, self.height, y_origin)),
            })
            .collect();

        AtlasDocument {
            atlas: AtlasInfo {
                kind: self.config.alpha.into(),
                distance_range: self.config.range,
                size: f64::from(self.config.glyph_size),
                width: self.width,
                height: self.height,
                y_origin,
                padding: self.config.padding,
            },
            metrics: DocumentMetrics {
                em_size: 1.0,
                line_height: self.font_metrics.line_height,
                ascender: self.font_metrics.ascender,
                descender: self.font_metrics.descender,
            },
            glyphs,
        }
    }

    /// Rebuild an atlas from a document and its RGBA8 pixels.
    ///
    /// Colouring settings are not part of the document and come back as
    /// defaults.
    pub fn from_document(document: &AtlasDocument, pixels: Vec<u8>) -> MsdfResult<Self> {
        let info = &document.atlas;
        let expected = (info.width as usize) * (info.height as usize) * 4;
        if pixels.len() != expected {
            return Err(MsdfError::Interchange {
                reason: format!(
                    "expected {} bytes of RGBA pixels for {}x{}, got {}",
                    expected,
                    info.width,
                    info.height,
                    pixels.len()
                ),
            });
        }
        if !(info.size >= 1.0 && info.size.fract() == 0.0) {
            return Err(MsdfError::Interchange {
                reason: format!("atlas size must be a positive integer, got {}", info.size),
            });
        }

        let config = AtlasConfig::new(info.size as u32, info.padding, info.distance_range)
            .with_alpha(info.kind.into());

        let mut glyphs = HashMap::new();
        for record in &document.glyphs {
            let codepoint = char::from_u32(record.unicode).ok_or_else(|| MsdfError::Interchange {
                reason: format!("{:#X} is not a Unicode scalar value", record.unicode),
            })?;
            let atlas_bounds = record
                .atlas_bounds
                .as_ref()
                .map(|b| rect_from_record(b, info.width, info.height, info.y_origin))
                .transpose()?;
            let plane_bounds = record
                .plane_bounds
                .as_ref()
                .map(|b| plane_from_record(b, info.y_origin));
            let (uv_min, uv_max) = match &atlas_bounds {
                Some(rect) => uv_rect(rect, info.width, info.height),
                None => ([0.0; 2], [0.0; 2]),
            };
            let metrics = match &plane_bounds {
                Some(plane) => GlyphMetrics {
                    advance_width: record.advance as f32,
                    bearing_x: plane.left as f32,
                    bearing_y: plane.top as f32,
                    width: (plane.right - plane.left) as f32,
                    height: (plane.top - plane.bottom) as f32,
                },
                None => GlyphMetrics {
                    advance_width: record.advance as f32,
                    ..Default::default()
                },
            };

            glyphs.insert(
                codepoint,
                AtlasGlyph {
                    codepoint,
                    uv_min,
                    uv_max,
                    metrics,
                    atlas_bounds,
                    plane_bounds,
                },
            );
        }

        Ok(AtlasResult {
            width: info.width,
            height: info.height,
            pixels,
            glyphs,
            config,
            // Units-per-em is not stored; the document is already in em.
            font_metrics: FontMetrics {
                units_per_em: 0,
                ascender: document.metrics.ascender,
                descender: document.metrics.descender,
                line_height: document.metrics.line_height,
            },
            missing_glyphs: Vec::new(),
            uncorrected_overlaps: Vec::new(),
        })
    }

    pub fn to_json(&self, y_origin: YOrigin) -> MsdfResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document(y_origin))?)
    }

    /// Write the pixels as an RGBA PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> MsdfResult<()> {
        let path = path.as_ref();
        if self.width == 0 || self.height == 0 {
            return Err(MsdfError::Image {
                reason: "cannot encode an empty atlas".to_string(),
            });
        }
        let image = image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| MsdfError::Image {
                reason: "pixel buffer does not match the atlas size".to_string(),
            })?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        tracing::debug!("Wrote atlas image to {}", path.display());
        Ok(())
    }

    /// Write `<name>.png` and `<name>.json` into `dir`, returning both paths.
    pub fn save(
        &self,
        dir: impl AsRef<Path>,
        name: &str,
        y_origin: YOrigin,
    ) -> MsdfResult<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| MsdfError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let png_path = dir.join(format!("{name}.png"));
        let json_path = dir.join(format!("{name}.json"));
        self.save_png(&png_path)?;
        std::fs::write(&json_path, self.to_json(y_origin)?).map_err(|source| MsdfError::Io {
            path: json_path.clone(),
            source,
        })?;

        tracing::info!(
            "Saved {}x{} atlas with {} glyphs to {}",
            self.width,
            self.height,
            self.glyphs.len(),
            dir.display()
        );
        Ok((png_path, json_path))
    }

    /// Read an atlas written by [`AtlasResult::save`].
    pub fn load(json_path: impl AsRef<Path>, png_path: impl AsRef<Path>) -> MsdfResult<Self> {
        let json_path = json_path.as_ref();
        let text = std::fs::read_to_string(json_path).map_err(|source| MsdfError::Io {
            path: json_path.to_path_buf(),
            source,
        })?;
        let document: AtlasDocument = serde_json::from_str(&text)?;

        let image = image::open(png_path.as_ref())?.into_rgba8();
        if image.dimensions() != (document.atlas.width, document.atlas.height) {
            return Err(MsdfError::Interchange {
                reason: format!(
                    "image is {}x{} but the document describes {}x{}",
                    image.width(),
                    image.height(),
                    document.atlas.width,
                    document.atlas.height
                ),
            });
        }
        Self::from_document(&document, image.into_raw())
    }
}
