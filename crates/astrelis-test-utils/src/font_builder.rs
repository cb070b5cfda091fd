//! Minimal TrueType writer.
//!
//! Emits just the tables a glyph-outline reader needs: `cmap` (format 4),
//! `glyf`, `head`, `hhea`, `hmtx`, `loca` (long offsets) and `maxp`
//! (version 0.5). Checksums are left at zero.

/// A point of a TrueType contour, in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlinePoint {
    pub x: i16,
    pub y: i16,
    pub on_curve: bool,
}

/// On-curve point.
pub const fn on(x: i16, y: i16) -> OutlinePoint {
    OutlinePoint {
        x,
        y,
        on_curve: true,
    }
}

/// Off-curve (quadratic control) point.
pub const fn off(x: i16, y: i16) -> OutlinePoint {
    OutlinePoint {
        x,
        y,
        on_curve: false,
    }
}

#[derive(Debug, Clone)]
struct GlyphEntry {
    codepoint: Option<char>,
    advance: u16,
    contours: Vec<Vec<OutlinePoint>>,
}

/// Builds a single-face TrueType font in memory.
///
/// Glyph 0 is `.notdef`; every other glyph is mapped from one codepoint.
#[derive(Debug, Clone)]
pub struct FontBuilder {
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    line_gap: i16,
    glyphs: Vec<GlyphEntry>,
}

impl FontBuilder {
    pub fn new(units_per_em: u16) -> Self {
        Self {
            units_per_em,
            ascender: (units_per_em as i32 * 4 / 5) as i16,
            descender: -((units_per_em as i32 / 5) as i16),
            line_gap: 0,
            glyphs: vec![GlyphEntry {
                codepoint: None,
                advance: units_per_em / 2,
                contours: Vec::new(),
            }],
        }
    }

    pub fn vertical_metrics(mut self, ascender: i16, descender: i16, line_gap: i16) -> Self {
        self.ascender = ascender;
        self.descender = descender;
        self.line_gap = line_gap;
        self
    }

    /// Replace the `.notdef` glyph.
    pub fn notdef(mut self, advance: u16, contours: Vec<Vec<OutlinePoint>>) -> Self {
        self.glyphs[0] = GlyphEntry {
            codepoint: None,
            advance,
            contours,
        };
        self
    }

    /// Add a glyph mapped from `codepoint`. Codepoints must lie in the BMP.
    pub fn glyph(mut self, codepoint: char, advance: u16, contours: Vec<Vec<OutlinePoint>>) -> Self {
        assert!((codepoint as u32) < 0xFFFF, "format 4 cmap covers the BMP only");
        self.glyphs.push(GlyphEntry {
            codepoint: Some(codepoint),
            advance,
            contours,
        });
        self
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn build(&self) -> Vec<u8> {
        let (glyf, loca) = self.glyf_and_loca();
        let tables: [(&[u8; 4], Vec<u8>); 7] = [
            (b"cmap", self.cmap()),
            (b"glyf", glyf),
            (b"head", self.head()),
            (b"hhea", self.hhea()),
            (b"hmtx", self.hmtx()),
            (b"loca", loca),
            (b"maxp", self.maxp()),
        ];

        let num_tables = tables.len() as u16;
        let entry_selector = 15 - num_tables.leading_zeros() as u16;
        let search_range = (1u16 << entry_selector) * 16;

        let mut out = Vec::new();
        put_u32(&mut out, 0x0001_0000);
        put_u16(&mut out, num_tables);
        put_u16(&mut out, search_range);
        put_u16(&mut out, entry_selector);
        put_u16(&mut out, num_tables * 16 - search_range);

        let mut offset = 12 + 16 * tables.len();
        for (tag, data) in &tables {
            out.extend_from_slice(*tag);
            put_u32(&mut out, 0);
            put_u32(&mut out, offset as u32);
            put_u32(&mut out, data.len() as u32);
            offset += padded_len(data.len());
        }
        for (_, data) in &tables {
            out.extend_from_slice(data);
            out.resize(padded_len(out.len()), 0);
        }
        out
    }

    fn bbox(&self) -> [i16; 4] {
        let mut points = self.glyphs.iter().flat_map(|g| g.contours.iter().flatten());
        let Some(first) = points.next() else {
            return [0; 4];
        };
        points.fold([first.x, first.y, first.x, first.y], |b, p| {
            [b[0].min(p.x), b[1].min(p.y), b[2].max(p.x), b[3].max(p.y)]
        })
    }

    fn head(&self) -> Vec<u8> {
        let [x_min, y_min, x_max, y_max] = self.bbox();
        let mut out = Vec::with_capacity(54);
        put_u32(&mut out, 0x0001_0000); // version
        put_u32(&mut out, 0x0001_0000); // font revision
        put_u32(&mut out, 0); // checksum adjustment
        put_u32(&mut out, 0x5F0F_3CF5); // magic
        put_u16(&mut out, 0b11); // flags: baseline and lsb at 0
        put_u16(&mut out, self.units_per_em);
        out.extend_from_slice(&[0; 16]); // created, modified
        for v in [x_min, y_min, x_max, y_max] {
            put_i16(&mut out, v);
        }
        put_u16(&mut out, 0); // mac style
        put_u16(&mut out, 8); // lowest rec ppem
        put_i16(&mut out, 2); // font direction hint
        put_i16(&mut out, 1); // long loca offsets
        put_i16(&mut out, 0); // glyph data format
        out
    }

    fn hhea(&self) -> Vec<u8> {
        let max_advance = self.glyphs.iter().map(|g| g.advance).max().unwrap_or(0);
        let mut out = Vec::with_capacity(36);
        put_u32(&mut out, 0x0001_0000);
        put_i16(&mut out, self.ascender);
        put_i16(&mut out, self.descender);
        put_i16(&mut out, self.line_gap);
        put_u16(&mut out, max_advance);
        put_i16(&mut out, 0); // min lsb
        put_i16(&mut out, 0); // min rsb
        put_i16(&mut out, self.bbox()[2]); // x max extent
        put_i16(&mut out, 1); // caret slope rise
        put_i16(&mut out, 0); // caret slope run
        put_i16(&mut out, 0); // caret offset
        out.extend_from_slice(&[0; 8]);
        put_i16(&mut out, 0); // metric data format
        put_u16(&mut out, self.glyphs.len() as u16);
        out
    }

    fn maxp(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(6);
        put_u32(&mut out, 0x0000_5000);
        put_u16(&mut out, self.glyphs.len() as u16);
        out
    }

    fn hmtx(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.glyphs.len() * 4);
        for glyph in &self.glyphs {
            let lsb = glyph.contours.iter().flatten().map(|p| p.x).min().unwrap_or(0);
            put_u16(&mut out, glyph.advance);
            put_i16(&mut out, lsb);
        }
        out
    }

    fn glyf_and_loca(&self) -> (Vec<u8>, Vec<u8>) {
        let mut glyf = Vec::new();
        let mut loca = Vec::new();
        for glyph in &self.glyphs {
            put_u32(&mut loca, glyf.len() as u32);
            encode_simple_glyph(&glyph.contours, &mut glyf);
            glyf.resize(padded_len(glyf.len()), 0);
        }
        put_u32(&mut loca, glyf.len() as u32);
        (glyf, loca)
    }

    fn cmap(&self) -> Vec<u8> {
        let mut mapping: Vec<(u16, u16)> = self
            .glyphs
            .iter()
            .enumerate()
            .filter_map(|(gid, g)| g.codepoint.map(|c| (c as u16, gid as u16)))
            .collect();
        mapping.sort_unstable();
        mapping.dedup_by_key(|(code, _)| *code);

        // One segment per codepoint plus the mandatory 0xFFFF terminator.
        let seg_count = mapping.len() as u16 + 1;
        let entry_selector = 15 - seg_count.leading_zeros() as u16;
        let search_range = 2 * (1u16 << entry_selector);

        let mut sub = Vec::new();
        put_u16(&mut sub, 4); // format
        put_u16(&mut sub, 16 + 8 * seg_count); // length
        put_u16(&mut sub, 0); // language
        put_u16(&mut sub, seg_count * 2);
        put_u16(&mut sub, search_range);
        put_u16(&mut sub, entry_selector);
        put_u16(&mut sub, seg_count * 2 - search_range);
        for (code, _) in &mapping {
            put_u16(&mut sub, *code);
        }
        put_u16(&mut sub, 0xFFFF);
        put_u16(&mut sub, 0); // reserved pad
        for (code, _) in &mapping {
            put_u16(&mut sub, *code);
        }
        put_u16(&mut sub, 0xFFFF);
        for (code, gid) in &mapping {
            put_u16(&mut sub, gid.wrapping_sub(*code));
        }
        put_u16(&mut sub, 1);
        for _ in 0..seg_count {
            put_u16(&mut sub, 0); // id range offsets
        }

        let mut out = Vec::new();
        put_u16(&mut out, 0); // version
        put_u16(&mut out, 1); // one encoding record
        put_u16(&mut out, 3); // Windows
        put_u16(&mut out, 1); // Unicode BMP
        put_u32(&mut out, 12);
        out.extend_from_slice(&sub);
        out
    }
}

fn encode_simple_glyph(contours: &[Vec<OutlinePoint>], out: &mut Vec<u8>) {
    let contours: Vec<&Vec<OutlinePoint>> = contours.iter().filter(|c| !c.is_empty()).collect();
    if contours.is_empty() {
        return;
    }

    let points: Vec<OutlinePoint> = contours.iter().flat_map(|c| c.iter().copied()).collect();
    put_i16(out, contours.len() as i16);
    let x_min = points.iter().map(|p| p.x).min().unwrap_or(0);
    let y_min = points.iter().map(|p| p.y).min().unwrap_or(0);
    let x_max = points.iter().map(|p| p.x).max().unwrap_or(0);
    let y_max = points.iter().map(|p| p.y).max().unwrap_or(0);
    for v in [x_min, y_min, x_max, y_max] {
        put_i16(out, v);
    }

    let mut end = 0u16;
    for contour in &contours {
        end += contour.len() as u16;
        put_u16(out, end - 1);
    }
    put_u16(out, 0); // no instructions

    // Flags without short/repeat bits: every coordinate is a 16-bit delta.
    for p in &points {
        out.push(u8::from(p.on_curve));
    }
    let mut previous = 0i16;
    for p in &points {
        put_i16(out, p.x - previous);
        previous = p.x;
    }
    previous = 0;
    for p in &points {
        put_i16(out, p.y - previous);
        previous = p.y;
    }
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(4) * 4
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec<OutlinePoint>> {
        vec![vec![on(0, 0), on(0, 500), on(500, 500), on(500, 0)]]
    }

    #[test]
    fn test_table_directory_is_sorted_and_aligned() {
        let bytes = FontBuilder::new(1000).glyph('a', 600, square()).build();
        assert_eq!(&bytes[0..4], &[0, 1, 0, 0]);
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), 7);

        let tags: Vec<&[u8]> = (0..7).map(|i| &bytes[12 + 16 * i..16 + 16 * i]).collect();
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);

        for i in 0..7 {
            let record = &bytes[12 + 16 * i..28 + 16 * i];
            let offset = u32::from_be_bytes([record[8], record[9], record[10], record[11]]);
            assert_eq!(offset % 4, 0);
        }
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn test_parses_with_ttf_parser() {
        let bytes = FontBuilder::new(1000)
            .vertical_metrics(800, -200, 100)
            .glyph(' ', 250, Vec::new())
            .glyph('a', 600, square())
            .build();
        let face = ttf_parser::Face::parse(&bytes, 0).unwrap();
        assert_eq!(face.units_per_em(), 1000);
        assert_eq!(face.number_of_glyphs(), 3);
        assert_eq!(face.ascender(), 800);
        assert_eq!(face.line_gap(), 100);

        let a = face.glyph_index('a').unwrap();
        assert_eq!(face.glyph_hor_advance(a), Some(600));
        let bbox = face.glyph_bounding_box(a).unwrap();
        assert_eq!((bbox.x_max, bbox.y_max), (500, 500));

        let space = face.glyph_index(' ').unwrap();
        assert!(face.glyph_bounding_box(space).is_none());
        assert!(face.glyph_index('b').is_none());
    }
}
