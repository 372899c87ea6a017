//! Synthetic images for tests.
//!
//! We draw text with a tiny built-in block font so tests don't need font files
//! or checked-in fixtures.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};

/// Pixels per font cell.
const SCALE: u32 = 12;
/// Blank border around the text, in pixels.
const MARGIN: u32 = 48;

/// 5x7 glyphs, one string per row.
fn glyph(c: char) -> [&'static str; 7] {
    match c {
        'D' => ["11110", "10001", "10001", "10001", "10001", "10001", "11110"],
        'E' => ["11111", "10000", "10000", "11110", "10000", "10000", "11111"],
        'H' => ["10001", "10001", "10001", "11111", "10001", "10001", "10001"],
        'L' => ["10000", "10000", "10000", "10000", "10000", "10000", "11111"],
        'O' => ["01110", "10001", "10001", "10001", "10001", "10001", "01110"],
        'R' => ["11110", "10001", "10001", "11110", "10100", "10010", "10001"],
        'W' => ["10001", "10001", "10001", "10101", "10101", "10101", "01010"],
        _ => ["00000"; 7],
    }
}

/// Render black block text on a white background.
pub fn render_text(text: &str) -> DynamicImage {
    let cols = text.chars().count() as u32 * 6;
    let width = cols * SCALE + 2 * MARGIN;
    let height = 7 * SCALE + 2 * MARGIN;
    let mut img = GrayImage::from_pixel(width, height, Luma([255]));
    for (i, c) in text.chars().enumerate() {
        for (row, bits) in glyph(c).iter().enumerate() {
            for (col, bit) in bits.chars().enumerate() {
                if bit != '1' {
                    continue;
                }
                let x0 = MARGIN + (i as u32 * 6 + col as u32) * SCALE;
                let y0 = MARGIN + row as u32 * SCALE;
                for y in y0..y0 + SCALE {
                    for x in x0..x0 + SCALE {
                        img.put_pixel(x, y, Luma([0]));
                    }
                }
            }
        }
    }
    DynamicImage::ImageLuma8(img)
}

/// A clean image reading "HELLO WORLD".
pub fn hello_world_image() -> DynamicImage {
    render_text("HELLO WORLD")
}

/// Encode an image as PNG bytes.
pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .expect("PNG encoding should not fail");
    buf.into_inner()
}
