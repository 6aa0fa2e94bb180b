use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};

pub const GLYPH_SIZE: i32 = 8;

/// Paint one pixel, ignoring coordinates that fall outside the frame.
pub(crate) fn put_pixel_clipped(frame: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x < 0 || y < 0 || x >= frame.width() as i64 || y >= frame.height() as i64 {
        return;
    }
    frame.put_pixel(x as u32, y as u32, color);
}

/// Draw `text` with its glyph bottoms sitting on `baseline`.
///
/// Characters outside the basic Latin block render as `?`.
pub fn draw_text(frame: &mut RgbImage, text: &str, x: i32, baseline: i32, color: Rgb<u8>) {
    let top = baseline as i64 - GLYPH_SIZE as i64;
    let mut cursor = x as i64;

    for ch in text.chars() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE as i64 {
                if bits & (1 << col) != 0 {
                    put_pixel_clipped(frame, cursor + col, top + row as i64, color);
                }
            }
        }
        cursor += GLYPH_SIZE as i64;
    }
}
