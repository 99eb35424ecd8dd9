//! Inline image thumbnails

use base64::Engine;
use image::GenericImageView;

use crate::document::{DocumentResult, ImageFormat, ImageRecord};
use crate::formats::pdf::images::encode_image;

/// A PNG thumbnail ready to embed in a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// `data:image/png;base64,...`
    pub data_uri: String,
}

/// Build a thumbnail that fits within `max_size` x `max_size`.
///
/// Images already inside the box keep their size.
pub fn thumbnail(record: &ImageRecord, max_size: u32) -> DocumentResult<Thumbnail> {
    let image = image::load_from_memory_with_format(&record.data, record.format.as_image_format())?;

    let (width, height) = image.dimensions();
    let image = if width > max_size || height > max_size {
        image.thumbnail(max_size, max_size)
    } else {
        image
    };

    let png = encode_image(&image, ImageFormat::Png)?;
    let data_uri = format!(
        "data:{};base64,{}",
        ImageFormat::Png.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(png)
    );

    Ok(Thumbnail {
        width: image.width(),
        height: image.height(),
        data_uri,
    })
}
