//! Built-in glyphs, copied into memory whenever a machine is loaded.

/// Offset of the 5-byte low resolution glyphs
pub const FONT_START: u16 = 0x000;
/// Offset of the 10-byte high resolution glyphs
pub const HIRES_FONT_START: u16 = 0x100;

pub const FONT_GLYPH_LEN: u16 = 5;
pub const HIRES_FONT_GLYPH_LEN: u16 = 10;

#[rustfmt::skip]
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0x70, 0x10, 0xF0, // 3
    0xA0, 0xA0, 0xF0, 0x20, 0x20, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x10, 0x10, 0x10, // 7
    0x60, 0x90, 0x60, 0x90, 0x60, // 8
    0xF0, 0x90, 0xF0, 0x10, 0x10, // 9
    0x60, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xE0, 0x80, 0x80, // F
];

#[rustfmt::skip]
pub const HIRES_FONT: [u8; 160] = [
    0x3C, 0x66, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0x66, 0x3C, // 0
    0x0C, 0x1C, 0x2C, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, // 1
    0x3E, 0x7F, 0xC3, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xFF, 0xFF, // 2
    0x3C, 0x66, 0xC3, 0x03, 0x0E, 0x0E, 0x03, 0xC3, 0x66, 0x3C, // 3
    0x06, 0x0E, 0x1E, 0x36, 0x66, 0xC6, 0xFF, 0xFF, 0x06, 0x06, // 4
    0xFF, 0xFF, 0xC0, 0xC0, 0xFC, 0xFE, 0x07, 0xC7, 0x7C, 0x38, // 5
    0x3F, 0x7E, 0xC0, 0xC0, 0xFC, 0xFE, 0xC7, 0xC3, 0x7E, 0x3C, // 6
    0xFF, 0xFF, 0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xC0, 0xC0, // 7
    0x3C, 0x66, 0xC3, 0xC3, 0x7E, 0x7E, 0xC3, 0xC3, 0x66, 0x3C, // 8
    0x3C, 0x66, 0xC3, 0xC3, 0x7F, 0x3F, 0x03, 0x03, 0x7E, 0xFC, // 9
    0x7E, 0xFF, 0xC3, 0xC3, 0xC3, 0xFF, 0xFF, 0xC3, 0xC3, 0xC3, // A
    0xFC, 0xFC, 0xC3, 0xC3, 0xFC, 0xFC, 0xC3, 0xC3, 0xFC, 0xFC, // B
    0x3C, 0xFF, 0xC3, 0xC0, 0xC0, 0xC0, 0xC0, 0xC3, 0xFF, 0x3C, // C
    0xFC, 0xFE, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xFE, 0xFC, // D
    0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, // E
    0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, 0xC0, 0xC0, 0xC0, 0xC0, // F
];

/// Address of the low resolution glyph for the low nibble of `digit`
pub fn glyph_addr(digit: u8) -> u16 {
    FONT_START + (digit & 0x0F) as u16 * FONT_GLYPH_LEN
}

/// Address of the high resolution glyph for the low nibble of `digit`
pub fn hires_glyph_addr(digit: u8) -> u16 {
    HIRES_FONT_START + (digit & 0x0F) as u16 * HIRES_FONT_GLYPH_LEN
}
