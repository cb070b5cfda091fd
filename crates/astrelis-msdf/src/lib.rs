//! Astrelis MSDF - multi-channel signed distance field font atlases
//!
//! Turns a font's vector outlines into a packed RGBA texture where each colour
//! channel holds the distance to a differently coloured subset of edges. A
//! shader takes the median of the three channels and gets sharp glyph corners
//! at any scale from a single small texture.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use astrelis_msdf::{AtlasConfig, ColoringMode, YOrigin, generate_atlas, load_font};
//!
//! let font = load_font(std::fs::read("DejaVuSans.ttf")?)?;
//! let mut config = AtlasConfig::new(48, 4, 4.0);
//! config.coloring = config.coloring.with_mode(ColoringMode::DistanceBased).with_seed(7);
//!
//! let atlas = generate_atlas(&font, "Hello, World!", &config)?;
//! let glyph = atlas.glyph('H').expect("H is in the charset");
//! println!("H at {:?}..{:?}", glyph.uv_min, glyph.uv_max);
//!
//! atlas.save("target/atlas", "dejavu", YOrigin::Bottom)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Pipeline
//!
//! - **Outline extraction** ([`outline`]): `ttf-parser` outlines as em-space
//!   [`Shape`]s, oriented so the fill is on the left of every contour
//! - **Edge colouring** ([`coloring`]): corners and curvature inflections
//!   split each contour into differently coloured runs
//! - **Overlap correction** ([`overlap`]): optional fix-up for fonts built
//!   from overlapping same-winding contours
//! - **Rasterisation** ([`rasterize`]): per-channel signed distances for every
//!   cell pixel, padding included
//! - **Packing** ([`atlas`]): a near-square grid of equal cells plus the
//!   glyph table, rasterised in parallel with the `parallel` feature
//!
//! [`interchange`] reads and writes the PNG + JSON atlas format and
//! [`worker`] runs generation on a background thread.

pub mod atlas;
pub mod color;
pub mod coloring;
pub mod contour;
pub mod edge;
pub mod equations;
pub mod error;
pub mod font;
pub mod interchange;
pub mod outline;
pub mod overlap;
pub mod rasterize;
pub mod worker;

pub use atlas::{
    AtlasConfig, AtlasGlyph, AtlasResult, GlyphMetrics, GridPacker, MAX_ATLAS_DIMENSION,
    generate_atlas,
};
pub use color::EdgeColor;
pub use coloring::{
    BoundaryKind, ColorBoundary, ColoringConfig, ColoringMode, color_shape, find_color_boundaries,
};
pub use contour::{Contour, Shape};
pub use edge::{Bounds, Edge, EdgeSegment, SignedDistance};
pub use error::{MsdfError, MsdfResult};
pub use font::{Font, FontMetrics, load_font};
pub use interchange::{AtlasDocument, YOrigin};
pub use outline::{ShapeBuilder, extract_outline};
pub use overlap::{OverlapReport, correct_overlaps};
pub use rasterize::{AlphaMode, GlyphBitmap, GlyphLayout, rasterize_glyph};
pub use worker::AtlasWorker;
