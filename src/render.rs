//! Pixel frames for the tray front end's widget and overlay windows
//!
//! Frames are drawn into a `tiny_skia::Pixmap` and then copied into the
//! window's `0RGB` buffer. Windows are opaque, so the tint is composited over
//! black. Text uses the 8x8 bitmap glyphs from `font8x8`, scaled up by
//! whole pixels.

use crate::constants::GLYPH_SIZE_PX;
use crate::preferences::OverlayColor;
use font8x8::{UnicodeFonts, BASIC_FONTS};
use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};

const TEXT_COLOR: [u8; 3] = [255, 255, 255];
const WIDGET_BACKGROUND: [u8; 3] = [32, 32, 32];
const WIDGET_PAUSED_TEXT: [u8; 3] = [255, 193, 7];

/// Whole-pixel glyph scale for `font_px`, shrunk until `chars` glyphs fit
pub fn text_scale(chars: usize, font_px: u32, max_width: u32) -> u32 {
    let desired = ((font_px + GLYPH_SIZE_PX / 2) / GLYPH_SIZE_PX).max(1);
    let line_px = (chars as u32).saturating_mul(GLYPH_SIZE_PX).max(1);
    desired.min(max_width / line_px).max(1)
}

fn solid(rgb: [u8; 3], alpha: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], alpha);
    paint.anti_alias = false;
    paint
}

/// Draw `text` horizontally centred with its middle at `center_y`
pub fn draw_text_centered(pixmap: &mut Pixmap, text: &str, scale: u32, rgb: [u8; 3], center_y: u32) {
    let glyph_px = (GLYPH_SIZE_PX * scale) as f32;
    let width = text.chars().count() as f32 * glyph_px;
    let left = (pixmap.width() as f32 - width) / 2.0;
    let top = center_y as f32 - glyph_px / 2.0;
    let paint = solid(rgb, 255);
    let cell = scale as f32;

    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let origin_x = left + i as f32 * glyph_px;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let x = origin_x + col as f32 * cell;
                let y = top + row as f32 * cell;
                if let Some(rect) = Rect::from_xywh(x, y, cell, cell) {
                    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
        }
    }
}

/// Tinted full-screen frame. `label` is drawn only on the primary display.
pub fn render_overlay(
    width: u32,
    height: u32,
    tint: OverlayColor,
    label: Option<&str>,
    font_px: u32,
) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(width, height)?;
    pixmap.fill(Color::BLACK);
    if let Some(rect) = Rect::from_xywh(0.0, 0.0, width as f32, height as f32) {
        pixmap.fill_rect(
            rect,
            &solid([tint.r, tint.g, tint.b], tint.a),
            Transform::identity(),
            None,
        );
    }

    if let Some(label) = label {
        let scale = text_scale(label.chars().count(), font_px, width);
        draw_text_centered(&mut pixmap, label, scale, TEXT_COLOR, height / 2);
    }
    Some(pixmap)
}

/// Countdown widget frame
pub fn render_widget(width: u32, height: u32, clock: &str, font_px: u32, paused: bool) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(width, height)?;
    let [r, g, b] = WIDGET_BACKGROUND;
    pixmap.fill(Color::from_rgba8(r, g, b, 255));

    let scale = text_scale(clock.chars().count(), font_px, width);
    let rgb = if paused { WIDGET_PAUSED_TEXT } else { TEXT_COLOR };
    draw_text_centered(&mut pixmap, clock, scale, rgb, height / 2);
    Some(pixmap)
}

/// Copy an opaque pixmap into a `0RGB` window buffer of the same size
pub fn copy_to_buffer(pixmap: &Pixmap, buffer: &mut [u32]) {
    for (out, px) in buffer.iter_mut().zip(pixmap.pixels()) {
        *out = (u32::from(px.red()) << 16) | (u32::from(px.green()) << 8) | u32::from(px.blue());
    }
}
