/// Image decoding for the studio.
///
/// Uploaded images (PNG/JPEG/BMP/GIF) are resized to the canvas size and
/// handed to the engine as an RGBA drawing surface, exactly as a browser
/// canvas would provide it.
use ferrite_digit::Surface;

/// Decodes image bytes and resizes to `side × side` RGBA.
pub fn image_bytes_to_surface(bytes: &[u8], side: u32) -> Result<Surface, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let resized = img.resize_exact(side, side, image::imageops::FilterType::Triangle);
    let rgba = resized.to_rgba8();
    Surface::new(side as usize, rgba.into_raw()).map_err(|e| e.to_string())
}
