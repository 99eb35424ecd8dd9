//! Embedded image extraction
//!
//! Enumerates the raster image XObjects used by each page, decodes them
//! with the `image` crate, flattens any alpha over white, and re-encodes
//! them (JPEG for `DCTDecode` sources, PNG for everything else).
//!
//! Failures are collected as [`Diagnostic`]s instead of aborting: a broken
//! image is skipped, a PDF that cannot be opened is skipped.

use std::collections::HashSet;
use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, GrayImage, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::filters::{decode_stream, filter_names};
use super::parser::PdfDocument;
use crate::document::{
    Diagnostic, DocumentError, DocumentResult, ImageFormat, ImageRecord, UploadedDocument,
};

/// Largest width or height accepted for an embedded image
const MAX_IMAGE_DIMENSION: u32 = 16_384;

/// Guards against cyclic Parent chains and Form XObject nesting
const MAX_NESTING: usize = 32;

/// Images and warnings produced for a set of PDFs
#[derive(Debug, Default)]
pub struct ImageExtraction {
    pub records: Vec<ImageRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImageExtraction {
    /// Number of images that made it into records
    pub fn total_images(&self) -> usize {
        self.records.len()
    }

    fn merge(&mut self, other: ImageExtraction) {
        self.records.extend(other.records);
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Extract images from every PDF in order, skipping PDFs that fail to open
pub fn extract_images_from_pdfs<'a, I>(documents: I) -> ImageExtraction
where
    I: IntoIterator<Item = &'a UploadedDocument>,
{
    let mut extraction = ImageExtraction::default();

    for upload in documents {
        match PdfDocument::from_bytes(&upload.data) {
            Ok(pdf) => extraction.merge(extract_images(&upload.file_name, &pdf)),
            Err(e) => {
                tracing::warn!(document = %upload.file_name, error = %e, "Skipping PDF for image extraction");
                extraction
                    .diagnostics
                    .push(Diagnostic::document_skipped(&upload.file_name, e.to_string()));
            }
        }
    }

    extraction
}

/// Extract every decodable image from one parsed PDF
pub fn extract_images(document_name: &str, pdf: &PdfDocument) -> ImageExtraction {
    let doc = pdf.inner();
    let mut extraction = ImageExtraction::default();

    for &(page_number, page_id) in pdf.pages() {
        let image_ids = page_image_ids(doc, page_id);

        for (position, image_id) in image_ids.into_iter().enumerate() {
            let index = position as u32 + 1;

            match extract_image(doc, image_id) {
                Ok(encoded) => {
                    extraction.records.push(ImageRecord {
                        document: document_name.to_string(),
                        page: page_number,
                        index,
                        width: encoded.width,
                        height: encoded.height,
                        format: encoded.format,
                        data: encoded.data,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        document = %document_name,
                        page = page_number,
                        image = index,
                        error = %e,
                        "Skipping undecodable image"
                    );
                    extraction.diagnostics.push(Diagnostic::image_skipped(
                        document_name,
                        page_number,
                        index,
                        e.to_string(),
                    ));
                }
            }
        }
    }

    extraction
}

/// An image after decoding, flattening, and re-encoding
struct EncodedImage {
    width: u32,
    height: u32,
    format: ImageFormat,
    data: Vec<u8>,
}

/// Decode, flatten, and re-encode one image XObject
fn extract_image(doc: &Document, image_id: ObjectId) -> DocumentResult<EncodedImage> {
    let stream = doc.get_object(image_id)?.as_stream()?;

    let (decoded, format) = decode_image(doc, stream)?;
    let masked = apply_soft_mask(doc, stream, decoded)?;
    let opaque = flatten_alpha(masked);

    Ok(EncodedImage {
        width: opaque.width(),
        height: opaque.height(),
        format,
        data: encode_image(&opaque, format)?,
    })
}

// ============================================================================
// Enumeration
// ============================================================================

/// Image XObjects used by a page, in resource order, each listed once
pub fn page_image_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut scan = ImageScan {
        doc,
        images: Vec::new(),
        seen_images: HashSet::new(),
        seen_forms: HashSet::new(),
    };

    if let Some(resources) = page_resources(doc, page_id) {
        scan.scan_resources(resources, 0);
    }

    scan.images
}

struct ImageScan<'a> {
    doc: &'a Document,
    images: Vec<ObjectId>,
    seen_images: HashSet<ObjectId>,
    seen_forms: HashSet<ObjectId>,
}

impl<'a> ImageScan<'a> {
    fn scan_resources(&mut self, resources: &'a Dictionary, depth: usize) {
        if depth > MAX_NESTING {
            return;
        }

        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| resolve_dict(self.doc, obj))
        else {
            return;
        };

        for (_name, value) in xobjects.iter() {
            // Direct (unreferenced) streams cannot be identified across the
            // page, so only indirect XObjects are considered
            let Object::Reference(id) = value else {
                continue;
            };
            let Ok(stream) = self.doc.get_object(*id).and_then(Object::as_stream) else {
                continue;
            };

            match name_of(&stream.dict, b"Subtype") {
                Some(b"Image") => {
                    if self.seen_images.insert(*id) {
                        self.images.push(*id);
                    }
                }
                Some(b"Form") => {
                    if self.seen_forms.insert(*id) {
                        if let Some(form_resources) = stream
                            .dict
                            .get(b"Resources")
                            .ok()
                            .and_then(|obj| resolve_dict(self.doc, obj))
                        {
                            self.scan_resources(form_resources, depth + 1);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// The page's Resources dictionary, inherited from the page tree if needed
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_NESTING {
        if let Some(resources) = node
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
        {
            return Some(resources);
        }

        node = match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => doc.get_dictionary(*parent).ok()?,
            _ => return None,
        };
    }

    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

fn name_of<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match dict.get(key) {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

fn integer_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match dict.get(key).ok().and_then(|obj| resolve(doc, obj))? {
        Object::Integer(value) => Some(*value),
        Object::Real(value) => Some(*value as i64),
        _ => None,
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// PDF color spaces the decoder understands
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
            ColorSpace::Indexed { .. } => 1,
        }
    }

    fn parse(doc: &Document, obj: &Object) -> DocumentResult<Self> {
        let obj = resolve(doc, obj)
            .ok_or_else(|| DocumentError::ParseError("dangling color space reference".to_string()))?;

        match obj {
            Object::Name(name) => Self::from_name(name),
            Object::Array(items) => {
                let family = match items.first() {
                    Some(Object::Name(name)) => name.as_slice(),
                    _ => {
                        return Err(DocumentError::UnsupportedFormat(
                            "malformed color space array".to_string(),
                        ))
                    }
                };

                match family {
                    b"ICCBased" => {
                        let profile = items
                            .get(1)
                            .and_then(|obj| resolve_dict(doc, obj))
                            .ok_or_else(|| {
                                DocumentError::ParseError("ICC profile missing".to_string())
                            })?;
                        match integer_of(doc, profile, b"N") {
                            Some(1) => Ok(ColorSpace::Gray),
                            Some(3) => Ok(ColorSpace::Rgb),
                            Some(4) => Ok(ColorSpace::Cmyk),
                            other => Err(DocumentError::UnsupportedFormat(format!(
                                "ICC profile with {:?} components",
                                other
                            ))),
                        }
                    }
                    b"Indexed" | b"I" => Self::parse_indexed(doc, items),
                    b"CalRGB" => Ok(ColorSpace::Rgb),
                    b"CalGray" => Ok(ColorSpace::Gray),
                    other => Err(DocumentError::UnsupportedFormat(format!(
                        "color space {}",
                        String::from_utf8_lossy(other)
                    ))),
                }
            }
            _ => Err(DocumentError::UnsupportedFormat(
                "unrecognised color space".to_string(),
            )),
        }
    }

    fn from_name(name: &[u8]) -> DocumentResult<Self> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
            other => Err(DocumentError::UnsupportedFormat(format!(
                "color space {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn parse_indexed(doc: &Document, items: &[Object]) -> DocumentResult<Self> {
        let malformed = || DocumentError::ParseError("malformed Indexed color space".to_string());

        let base = Self::parse(doc, items.get(1).ok_or_else(malformed)?)?;
        if matches!(base, ColorSpace::Indexed { .. }) {
            return Err(malformed());
        }

        let hival = match items.get(2).and_then(|obj| resolve(doc, obj)) {
            Some(Object::Integer(value)) if (0..=255).contains(value) => *value as usize,
            _ => return Err(malformed()),
        };

        let lookup = match items.get(3).and_then(|obj| resolve(doc, obj)) {
            Some(Object::String(bytes, _)) => bytes.clone(),
            Some(Object::Stream(stream)) => decode_stream(doc, stream)?,
            _ => return Err(malformed()),
        };

        if lookup.len() < (hival + 1) * base.components() {
            return Err(malformed());
        }

        Ok(ColorSpace::Indexed {
            base: Box::new(base),
            hival,
            lookup,
        })
    }
}

/// Decode an image XObject into pixels and pick the re-encoding format
fn decode_image(doc: &Document, stream: &Stream) -> DocumentResult<(DynamicImage, ImageFormat)> {
    let filters = filter_names(stream);

    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") | Some(b"DCT") => {
            if filters.len() > 1 {
                return Err(DocumentError::UnsupportedFormat(
                    "filter chain ending in DCTDecode".to_string(),
                ));
            }
            let image = image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)?;
            Ok((image, ImageFormat::Jpeg))
        }
        Some(codec @ (b"JPXDecode" | b"JBIG2Decode" | b"CCITTFaxDecode" | b"CCF")) => {
            Err(DocumentError::UnsupportedFormat(format!(
                "{} images",
                String::from_utf8_lossy(codec)
            )))
        }
        _ => Ok((decode_raster(doc, stream, None)?, ImageFormat::Png)),
    }
}

/// Decode an uncompressed or Flate/LZW-compressed sample stream
fn decode_raster(
    doc: &Document,
    stream: &Stream,
    fallback_space: Option<ColorSpace>,
) -> DocumentResult<DynamicImage> {
    let dict = &stream.dict;
    let width = dimension(doc, dict, b"Width")?;
    let height = dimension(doc, dict, b"Height")?;
    let data = decode_stream(doc, stream)?;

    let is_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    if is_mask {
        // Stencil masks: sample 0 paints, 1 leaves the background
        let samples = unpack_samples(&data, width, height, 1, 1, true)?;
        return gray_image(width, height, samples);
    }

    let bits = integer_of(doc, dict, b"BitsPerComponent").unwrap_or(8);
    let bits = match bits {
        1 | 2 | 4 | 8 | 16 => bits as u8,
        other => {
            return Err(DocumentError::UnsupportedFormat(format!(
                "{} bits per component",
                other
            )))
        }
    };

    let space = match dict.get(b"ColorSpace") {
        Ok(obj) => ColorSpace::parse(doc, obj)?,
        Err(_) => fallback_space
            .ok_or_else(|| DocumentError::ParseError("image has no color space".to_string()))?,
    };

    match &space {
        ColorSpace::Indexed {
            base,
            hival,
            lookup,
        } => {
            let indices = unpack_samples(&data, width, height, 1, bits, false)?;
            let channels = base.components();
            let mut expanded = Vec::with_capacity(indices.len() * channels);
            for index in indices {
                let entry = (index as usize).min(*hival) * channels;
                expanded.extend_from_slice(&lookup[entry..entry + channels]);
            }
            samples_to_image(base, width, height, expanded)
        }
        other => {
            let samples = unpack_samples(&data, width, height, other.components(), bits, true)?;
            samples_to_image(other, width, height, samples)
        }
    }
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> DocumentResult<u32> {
    let value = integer_of(doc, dict, key).ok_or_else(|| {
        DocumentError::ParseError(format!("image is missing {}", String::from_utf8_lossy(key)))
    })?;

    if value <= 0 || value > MAX_IMAGE_DIMENSION as i64 {
        return Err(DocumentError::ImageError(format!(
            "invalid image {} {}",
            String::from_utf8_lossy(key).to_lowercase(),
            value
        )));
    }

    Ok(value as u32)
}

/// Unpack byte-aligned rows of `bits`-sized samples into one byte per sample.
/// With `scale`, values are stretched to 0..=255; otherwise they are kept as
/// raw palette indices.
fn unpack_samples(
    data: &[u8],
    width: u32,
    height: u32,
    components: usize,
    bits: u8,
    scale: bool,
) -> DocumentResult<Vec<u8>> {
    let samples_per_row = width as usize * components;
    let row_bytes = (samples_per_row * bits as usize).div_ceil(8);
    let needed = row_bytes * height as usize;

    if data.len() < needed {
        return Err(DocumentError::ImageError(format!(
            "image data too short: got {} bytes, expected {}",
            data.len(),
            needed
        )));
    }

    if bits == 8 {
        return Ok(data[..needed].to_vec());
    }

    let mut out = Vec::with_capacity(samples_per_row * height as usize);
    for row in data[..needed].chunks(row_bytes) {
        for i in 0..samples_per_row {
            let value = match bits {
                16 => row[i * 2],
                _ => {
                    let bit_offset = i * bits as usize;
                    let byte = row[bit_offset / 8];
                    let shift = 8 - bits as usize - (bit_offset % 8);
                    let raw = (byte >> shift) & ((1u8 << bits) - 1);
                    if scale {
                        (raw as u32 * 255 / ((1u32 << bits) - 1)) as u8
                    } else {
                        raw
                    }
                }
            };
            out.push(value);
        }
    }

    Ok(out)
}

fn samples_to_image(
    space: &ColorSpace,
    width: u32,
    height: u32,
    samples: Vec<u8>,
) -> DocumentResult<DynamicImage> {
    match space {
        ColorSpace::Gray => gray_image(width, height, samples),
        ColorSpace::Rgb => RgbImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| DocumentError::ImageError("Failed to create RGB image buffer".to_string())),
        ColorSpace::Cmyk => {
            let rgb: Vec<u8> = samples
                .chunks_exact(4)
                .flat_map(|px| cmyk_to_rgb(px[0], px[1], px[2], px[3]))
                .collect();
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| {
                    DocumentError::ImageError("Failed to create RGB image from CMYK data".to_string())
                })
        }
        ColorSpace::Indexed { .. } => Err(DocumentError::UnsupportedFormat(
            "nested Indexed color space".to_string(),
        )),
    }
}

fn gray_image(width: u32, height: u32, samples: Vec<u8>) -> DocumentResult<DynamicImage> {
    GrayImage::from_raw(width, height, samples)
        .map(DynamicImage::ImageLuma8)
        .ok_or_else(|| DocumentError::ImageError("Failed to create grayscale image buffer".to_string()))
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let k = 255 - k as u32;
    [
        ((255 - c as u32) * k / 255) as u8,
        ((255 - m as u32) * k / 255) as u8,
        ((255 - y as u32) * k / 255) as u8,
    ]
}

// ============================================================================
// Alpha handling and encoding
// ============================================================================

/// Attach the `/SMask` soft mask, if any, as an alpha channel
fn apply_soft_mask(doc: &Document, stream: &Stream, image: DynamicImage) -> DocumentResult<DynamicImage> {
    let mask_id = match stream.dict.get(b"SMask") {
        Ok(Object::Reference(id)) => *id,
        _ => return Ok(image),
    };

    let mask_stream = doc.get_object(mask_id)?.as_stream()?;
    let (mask, _) = match filter_names(mask_stream).last().map(Vec::as_slice) {
        Some(b"DCTDecode") | Some(b"DCT") => decode_image(doc, mask_stream)?,
        _ => (
            decode_raster(doc, mask_stream, Some(ColorSpace::Gray))?,
            ImageFormat::Png,
        ),
    };

    let mut mask = mask.to_luma8();
    if mask.dimensions() != (image.width(), image.height()) {
        mask = image::imageops::resize(&mask, image.width(), image.height(), FilterType::Triangle);
    }

    let mut rgba = image.to_rgba8();
    for (pixel, alpha) in rgba.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = alpha.0[0];
    }

    Ok(DynamicImage::ImageRgba8(rgba))
}

/// Composite any alpha channel over a white background
pub fn flatten_alpha(image: DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return image;
    }

    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());

    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        *dst = Rgb([blend(r), blend(g), blend(b)]);
    }

    DynamicImage::ImageRgb8(out)
}

/// Encode an opaque image in the given format
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> DocumentResult<Vec<u8>> {
    let mut output = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            // The JPEG encoder only takes 8-bit gray or RGB
            let image = match image {
                DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.clone(),
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            };
            image.write_to(&mut Cursor::new(&mut output), image::ImageFormat::Jpeg)?;
        }
        ImageFormat::Png => {
            image.write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)?;
        }
    }

    Ok(output)
}
