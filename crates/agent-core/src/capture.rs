//! Screenshot feedback: marker burn-in at the last targeted coordinate.

use image::Rgba;
use thiserror::Error;
use webpilot_core_types::Point;

/// Side length of the marker square, in device pixels.
pub const MARKER_SIZE: u32 = 5;

const MARKER_COLOR: Rgba<u8> = Rgba([255, 192, 203, 255]);

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to decode screenshot: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to encode marked screenshot: {0}")]
    Encode(String),
}

/// Burn a filled square centered on `target` into a PNG screenshot and
/// re-encode it.
///
/// Targets at or left/above the origin leave the image untouched, matching
/// the convention that a negative point means "no coordinate was used".
pub fn mark_screenshot(png: &[u8], target: Point) -> Result<Vec<u8>, CaptureError> {
    let mut img = image::load_from_memory(png)?.to_rgba8();

    if target.x > 0 && target.y > 0 {
        let offset = (MARKER_SIZE / 2) as i32;
        for dy in 0..MARKER_SIZE as i32 {
            for dx in 0..MARKER_SIZE as i32 {
                let x = target.x - offset + dx;
                let y = target.y - offset + dy;
                if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
                    img.put_pixel(x as u32, y as u32, MARKER_COLOR);
                }
            }
        }
    }

    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .map_err(|err| CaptureError::Encode(err.to_string()))?;
    Ok(out.into_inner())
}

/// The note accompanying a marked feedback screenshot, telling the model to
/// verify its own aim.
pub fn marker_note(target: Point) -> String {
    format!(
        "Check on the next image whether the coordinates you used ({},{}) are \
         where you intended to act. They are marked with a pink {}x{} square.",
        target.x, target.y, MARKER_SIZE, MARKER_SIZE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn marker_lands_on_the_target_pixel() {
        let marked = mark_screenshot(&white_png(50, 50), Point::new(25, 25)).unwrap();
        let img = image::load_from_memory(&marked).unwrap().to_rgba8();
        assert_eq!(*img.get_pixel(25, 25), MARKER_COLOR);
        // Centered 5x5: two pixels out is still marked, three is not.
        assert_eq!(*img.get_pixel(23, 23), MARKER_COLOR);
        assert_ne!(*img.get_pixel(28, 28), MARKER_COLOR);
        assert_ne!(*img.get_pixel(0, 0), MARKER_COLOR);
    }

    #[test]
    fn marker_near_the_edge_is_clipped_not_panicking() {
        let marked = mark_screenshot(&white_png(10, 10), Point::new(9, 9)).unwrap();
        let img = image::load_from_memory(&marked).unwrap().to_rgba8();
        assert_eq!(*img.get_pixel(9, 9), MARKER_COLOR);
    }

    #[test]
    fn non_positive_target_leaves_image_unmarked() {
        let marked = mark_screenshot(&white_png(10, 10), Point::new(-1, -1)).unwrap();
        let img = image::load_from_memory(&marked).unwrap().to_rgba8();
        for pixel in img.pixels() {
            assert_eq!(*pixel, Rgba([255, 255, 255, 255]));
        }
    }

    #[test]
    fn note_mentions_coordinates_and_marker() {
        let note = marker_note(Point::new(500, 500));
        assert!(note.contains("(500,500)"));
        assert!(note.contains("pink 5x5 square"));
    }
}
