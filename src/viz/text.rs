//! Text measurement for label boxes (plotters cannot measure text up front).

/// Inner padding between label text and its box edge, in pixels.
pub const LABEL_PAD_PX: u32 = 3;

/// Heuristic: estimate pixel width of text at `font_px`.
pub fn estimate_text_width_px(text: &str, font_px: u32) -> u32 {
    ((text.chars().count() as f32) * (font_px as f32) * 0.60).ceil() as u32
}

/// Line height used for single-line label boxes.
pub fn line_height_px(font_px: u32) -> u32 {
    ((font_px as f32) * 1.2).ceil() as u32
}

/// Width and height of the box a one-line label occupies, padding included.
pub fn label_box_px(text: &str, font_px: u32) -> (f64, f64) {
    let w = estimate_text_width_px(text, font_px) + 2 * LABEL_PAD_PX;
    let h = line_height_px(font_px) + 2 * LABEL_PAD_PX;
    (w as f64, h as f64)
}

/// Truncate to fit `max_px`, ending in a single ellipsis when shortened.
pub fn truncate_to_width(text: &str, font_px: u32, max_px: u32) -> String {
    if estimate_text_width_px(text, font_px) <= max_px {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if estimate_text_width_px(&out, font_px) + estimate_text_width_px("…", font_px) > max_px {
            out.pop();
            break;
        }
    }
    out.push('…');
    out
}
