/*!
Text labels rasterized into RGBA buffers.

Labels are drawn glyph by glyph from the 8x8 bitmap font into a buffer of
`LABEL_BASE_WIDTH x LABEL_BASE_HEIGHT` pixels multiplied by `LABEL_SUPERSAMPLING`. Glyphs
are scaled by whole pixels; the quad that shows the buffer is sized so one glyph is
`font_size` world units tall.
*/

use crate::constants::{LABEL_BASE_HEIGHT, LABEL_BASE_WIDTH, LABEL_MARGIN, LABEL_SUPERSAMPLING};
use font8x8::legacy::BASIC_LEGACY;

const GLYPH_SIZE: u32 = 8;

/// Largest glyph as a fraction of the buffer height.
const MAX_GLYPH_FILL: f32 = 0.75;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HorizontalAnchor {
    Start,
    #[default]
    Center,
    End,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VerticalAnchor {
    Top,
    #[default]
    Middle,
    Bottom,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelSpec {
    pub text: String,
    /// Glyph height on the displayed quad (world units).
    pub font_size: f32,
    pub color: [u8; 4],
    pub horizontal: HorizontalAnchor,
    pub vertical: VerticalAnchor,
    /// Extra gap between glyphs, in base (not supersampled) pixels.
    pub letter_spacing: f32,
}

impl LabelSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: 0.15,
            color: [255, 255, 255, 255],
            horizontal: HorizontalAnchor::default(),
            vertical: VerticalAnchor::default(),
            letter_spacing: 0.0,
        }
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_anchor(mut self, horizontal: HorizontalAnchor, vertical: VerticalAnchor) -> Self {
        self.horizontal = horizontal;
        self.vertical = vertical;
        self
    }

    pub fn with_letter_spacing(mut self, letter_spacing: f32) -> Self {
        self.letter_spacing = letter_spacing;
        self
    }

    /// Hashable identity. Equal keys rasterize to equal bitmaps.
    pub fn key(&self) -> LabelKey {
        LabelKey {
            text: self.text.clone(),
            font_size_bits: self.font_size.to_bits(),
            color: self.color,
            horizontal: self.horizontal,
            vertical: self.vertical,
            letter_spacing_bits: self.letter_spacing.to_bits(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LabelKey {
    text: String,
    font_size_bits: u32,
    color: [u8; 4],
    horizontal: HorizontalAnchor,
    vertical: VerticalAnchor,
    letter_spacing_bits: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelBitmap {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, top row first.
    pub pixels: Vec<u8>,
    pub quad_width: f32,
    pub quad_height: f32,
}

impl LabelBitmap {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

fn glyph_for_char(ch: char) -> [u8; 8] {
    let index = ch as usize;
    if index < BASIC_LEGACY.len() {
        BASIC_LEGACY[index]
    } else {
        BASIC_LEGACY[b'?' as usize]
    }
}

/// Horizontal extent of `glyphs` characters at `scale`, in buffer pixels.
fn text_width(glyphs: usize, scale: u32, spacing_px: f32) -> f32 {
    if glyphs == 0 {
        return 0.0;
    }
    let n = glyphs as f32;
    n * (GLYPH_SIZE * scale) as f32 + (n - 1.0) * spacing_px
}

pub fn rasterize_label(spec: &LabelSpec) -> LabelBitmap {
    let ss = LABEL_SUPERSAMPLING;
    let width = LABEL_BASE_WIDTH * ss;
    let height = LABEL_BASE_HEIGHT * ss;
    let margin = LABEL_MARGIN * ss;
    let spacing_px = clamp_spacing(spec.letter_spacing * ss as f32, width);

    let chars: Vec<char> = spec.text.chars().collect();
    let available = width.saturating_sub(2 * margin) as f32;
    let max_scale = ((height as f32 * MAX_GLYPH_FILL) as u32 / GLYPH_SIZE).max(1);
    // Largest whole-pixel scale that fits; text still too wide at scale 1 is clipped.
    let scale = (1..=max_scale)
        .rev()
        .find(|&s| text_width(chars.len(), s, spacing_px) <= available)
        .unwrap_or(1);

    let glyph_px = GLYPH_SIZE * scale;
    let advance = glyph_px as f32 + spacing_px;
    let text_w = text_width(chars.len(), scale, spacing_px);

    let x0 = match spec.horizontal {
        HorizontalAnchor::Start => margin as f32,
        HorizontalAnchor::Center => (width as f32 - text_w) * 0.5,
        HorizontalAnchor::End => width as f32 - margin as f32 - text_w,
    };
    let y0 = match spec.vertical {
        VerticalAnchor::Top => margin as i64,
        VerticalAnchor::Middle => (height as i64 - glyph_px as i64) / 2,
        VerticalAnchor::Bottom => height as i64 - margin as i64 - glyph_px as i64,
    };

    let mut pixels = vec![0u8; (width * height * 4) as usize];
    for (i, &ch) in chars.iter().enumerate() {
        let gx = (x0 + i as f32 * advance).round() as i64;
        if gx >= width as i64 || gx.saturating_add(glyph_px as i64) <= 0 {
            continue;
        }
        let glyph = glyph_for_char(ch);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                fill_block(
                    &mut pixels,
                    (width, height),
                    gx + (col * scale) as i64,
                    y0 + row as i64 * scale as i64,
                    scale,
                    spec.color,
                );
            }
        }
    }

    let quad_height = spec.font_size * height as f32 / glyph_px as f32;
    let quad_width = quad_height * width as f32 / height as f32;

    LabelBitmap {
        width,
        height,
        pixels,
        quad_width,
        quad_height,
    }
}

/// Keeps spacing within one buffer width either way. Non-finite spacing counts as none.
fn clamp_spacing(spacing_px: f32, width: u32) -> f32 {
    if spacing_px.is_finite() {
        spacing_px.clamp(-(width as f32), width as f32)
    } else {
        0.0
    }
}

/// Fills a `size x size` square at `(x, y)`, clipped to the buffer.
fn fill_block(
    pixels: &mut [u8],
    (width, height): (u32, u32),
    x: i64,
    y: i64,
    size: u32,
    color: [u8; 4],
) {
    let x_range = x.max(0)..x.saturating_add(size as i64).min(width as i64);
    let y_range = y.max(0)..y.saturating_add(size as i64).min(height as i64);
    for py in y_range {
        for px in x_range.clone() {
            let i = ((py as usize * width as usize) + px as usize) * 4;
            pixels[i..i + 4].copy_from_slice(&color);
        }
    }
}
