//! Test fixtures for the Astrelis MSDF crates.
//!
//! Tests never read font files from disk. [`FontBuilder`] writes a small
//! TrueType font in memory and [`sample_font_bytes`] returns a canned one
//! whose glyphs cover the interesting outline cases:
//!
//! | Glyph | Outline |
//! |---|---|
//! | `A` | straight-edged outer contour with a triangular counter |
//! | `B` | lines and quadratic bowls, two counters |
//! | `D` | one bowl, one counter |
//! | `I` | a plain rectangle |
//! | `O` | quadratic ring |
//! | `+` | two overlapping bars with the same winding |
//! | `~` | a quadratic wave with one inflection at (350, 500) |
//! | space | no contours |
//!
//! Outer contours run clockwise and counters counter-clockwise, as TrueType
//! fonts draw them. Units per em is 1000, ascender 800, descender -200 and
//! line gap 100.

pub mod font_builder;

pub use font_builder::{FontBuilder, OutlinePoint, off, on};

/// Every codepoint [`sample_font_bytes`] maps.
pub const SAMPLE_CHARS: &str = "ABDIO+~ ";

pub const SAMPLE_UNITS_PER_EM: u16 = 1000;

/// Location of the inflection of the `~` wave, in font units.
pub const WAVE_INFLECTION: (i16, i16) = (350, 500);

fn rect(left: i16, bottom: i16, right: i16, top: i16) -> Vec<OutlinePoint> {
    vec![
        on(left, bottom),
        on(left, top),
        on(right, top),
        on(right, bottom),
    ]
}

/// The canned sample font described in the crate docs.
pub fn sample_font() -> FontBuilder {
    FontBuilder::new(SAMPLE_UNITS_PER_EM)
        .vertical_metrics(800, -200, 100)
        .notdef(
            500,
            vec![
                rect(50, 0, 450, 700),
                vec![on(100, 50), on(400, 50), on(400, 650), on(100, 650)],
            ],
        )
        .glyph(' ', 250, Vec::new())
        .glyph(
            'A',
            600,
            vec![
                vec![
                    on(0, 0),
                    on(250, 700),
                    on(350, 700),
                    on(600, 0),
                    on(480, 0),
                    on(420, 180),
                    on(180, 180),
                    on(120, 0),
                ],
                vec![on(220, 300), on(380, 300), on(300, 560)],
            ],
        )
        .glyph(
            'B',
            580,
            vec![
                vec![
                    on(80, 0),
                    on(80, 700),
                    on(320, 700),
                    off(470, 700),
                    on(470, 540),
                    off(470, 385),
                    on(360, 365),
                    off(520, 340),
                    on(520, 180),
                    off(520, 0),
                    on(340, 0),
                ],
                vec![
                    on(180, 420),
                    on(300, 420),
                    off(370, 420),
                    on(370, 510),
                    off(370, 600),
                    on(300, 600),
                    on(180, 600),
                ],
                vec![
                    on(180, 100),
                    on(320, 100),
                    off(410, 100),
                    on(410, 180),
                    off(410, 270),
                    on(320, 270),
                    on(180, 270),
                ],
            ],
        )
        .glyph(
            'D',
            620,
            vec![
                vec![
                    on(80, 0),
                    on(80, 700),
                    on(300, 700),
                    off(560, 700),
                    on(560, 350),
                    off(560, 0),
                    on(300, 0),
                ],
                vec![
                    on(180, 100),
                    on(290, 100),
                    off(460, 100),
                    on(460, 350),
                    off(460, 600),
                    on(290, 600),
                    on(180, 600),
                ],
            ],
        )
        .glyph('I', 300, vec![rect(100, 0, 200, 700)])
        .glyph(
            'O',
            600,
            vec![
                vec![
                    on(20, 350),
                    off(20, 700),
                    on(300, 700),
                    off(580, 700),
                    on(580, 350),
                    off(580, 0),
                    on(300, 0),
                    off(20, 0),
                ],
                vec![
                    on(120, 350),
                    off(120, 100),
                    on(300, 100),
                    off(480, 100),
                    on(480, 350),
                    off(480, 600),
                    on(300, 600),
                    off(120, 600),
                ],
            ],
        )
        .glyph(
            '+',
            600,
            vec![rect(50, 300, 550, 400), rect(250, 50, 350, 650)],
        )
        .glyph(
            '~',
            700,
            vec![vec![
                on(50, 100),
                on(50, 500),
                off(200, 300),
                on(350, 500),
                off(500, 700),
                on(650, 500),
                on(650, 100),
            ]],
        )
}

/// Bytes of [`sample_font`].
pub fn sample_font_bytes() -> Vec<u8> {
    sample_font().build()
}
