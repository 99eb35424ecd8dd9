//! Stream filter decoding for image data
//!
//! lopdf refuses to decompress streams whose dictionary says
//! `/Subtype /Image`, so image samples are inflated here. Flate chains are
//! decoded with `flate2` and the `/DecodeParms` predictor; any other
//! filter falls back to lopdf on a copy of the stream without `/Subtype`.

use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document, Object, Stream};

use crate::document::{DocumentError, DocumentResult};

/// Filter names applied to a stream, outermost first
pub fn filter_names(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn is_flate(name: &[u8]) -> bool {
    matches!(name, b"FlateDecode" | b"Fl")
}

/// Decoded bytes of a sample stream (image data, soft mask, palette)
pub fn decode_stream(doc: &Document, stream: &Stream) -> DocumentResult<Vec<u8>> {
    let filters = filter_names(stream);
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }

    if filters.iter().all(|name| is_flate(name)) {
        let mut data = stream.content.clone();
        for position in 0..filters.len() {
            data = inflate(&data)?;
            if let Some(params) = decode_params(doc, stream, position) {
                data = apply_predictor(data, &PredictorParams::from_dict(doc, params))?;
            }
        }
        return Ok(data);
    }

    let mut copy = stream.clone();
    copy.dict.remove(b"Subtype");
    copy.decompressed_content()
        .map_err(|e| DocumentError::ImageError(format!("failed to decompress stream: {}", e)))
}

/// Inflate a zlib stream, keeping whatever decoded before a truncated end
fn inflate(data: &[u8]) -> DocumentResult<Vec<u8>> {
    let mut decoded = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut decoded) {
        Ok(_) => Ok(decoded),
        Err(_) if !decoded.is_empty() => Ok(decoded),
        Err(e) => Err(DocumentError::ImageError(format!(
            "failed to inflate stream: {}",
            e
        ))),
    }
}

/// `/DecodeParms` for the filter at `position`, which may be a single
/// dictionary or an array parallel to `/Filter`
fn decode_params<'a>(doc: &'a Document, stream: &'a Stream, position: usize) -> Option<&'a Dictionary> {
    let params = stream
        .dict
        .get(b"DecodeParms")
        .or_else(|_| stream.dict.get(b"DP"))
        .ok()?;

    let entry = match params {
        Object::Array(items) => items.get(position)?,
        other if position == 0 => other,
        _ => return None,
    };

    match entry {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        _ => None,
    }
}

/// Predictor settings from a `/DecodeParms` dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let defaults = Self::default();
        let int = |key: &[u8]| {
            let value = match dict.get(key).ok()? {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            value.as_i64().ok()
        };

        Self {
            predictor: int(b"Predictor").unwrap_or(defaults.predictor),
            colors: int(b"Colors")
                .filter(|v| *v > 0)
                .map_or(defaults.colors, |v| v as usize),
            bits_per_component: int(b"BitsPerComponent")
                .filter(|v| *v > 0)
                .map_or(defaults.bits_per_component, |v| v as usize),
            columns: int(b"Columns")
                .filter(|v| *v > 0)
                .map_or(defaults.columns, |v| v as usize),
        }
    }

    /// Bytes per row of samples, without the PNG filter-type byte
    fn row_bytes(&self) -> usize {
        (self.colors * self.bits_per_component * self.columns).div_ceil(8)
    }

    /// Byte distance to the corresponding sample of the previous pixel
    fn pixel_bytes(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Undo a TIFF (2) or PNG (10..=15) predictor
pub fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> DocumentResult<Vec<u8>> {
    match params.predictor {
        1 => Ok(data),
        2 => tiff_predictor(data, params),
        10..=15 => png_predictor(&data, params),
        other => Err(DocumentError::UnsupportedFormat(format!(
            "predictor {}",
            other
        ))),
    }
}

fn tiff_predictor(mut data: Vec<u8>, params: &PredictorParams) -> DocumentResult<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(DocumentError::UnsupportedFormat(format!(
            "TIFF predictor with {} bits per component",
            params.bits_per_component
        )));
    }

    let row_bytes = params.row_bytes();
    let colors = params.colors;
    for row in data.chunks_mut(row_bytes) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    Ok(data)
}

fn png_predictor(data: &[u8], params: &PredictorParams) -> DocumentResult<Vec<u8>> {
    let row_bytes = params.row_bytes();
    let bpp = params.pixel_bytes();

    let mut out = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_bytes];

    // Each row is a filter-type byte followed by the filtered samples
    for chunk in data.chunks(row_bytes + 1) {
        let Some((&filter, filtered)) = chunk.split_first() else {
            continue;
        };
        if filtered.len() < row_bytes {
            // Incomplete final row
            break;
        }

        let mut row = filtered[..row_bytes].to_vec();
        for i in 0..row_bytes {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };

            let predicted = match filter {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(DocumentError::ImageError(format!(
                        "invalid PNG row filter {}",
                        other
                    )))
                }
            };
            row[i] = row[i].wrapping_add(predicted);
        }

        out.extend_from_slice(&row);
        previous = row;
    }

    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
