//! Bitmap preparation before texture upload.

use std::borrow::Cow;

use image::RgbaImage;

/// Pads odd-width images with one transparent column on the right.
///
/// Some GPU upload paths mis-handle odd row lengths. The engine keeps using
/// the original dimensions for its geometry; only the uploaded texture grows.
pub fn pad_to_even_width(image: &RgbaImage) -> Cow<'_, RgbaImage> {
    if image.width() % 2 == 0 {
        return Cow::Borrowed(image);
    }
    let mut padded = RgbaImage::new(image.width() + 1, image.height());
    image::imageops::replace(&mut padded, image, 0, 0);
    Cow::Owned(padded)
}
