//! In-memory PDF and DOCX builders for tests

use std::io::{Cursor, Write};

use flate2::{write::ZlibEncoder, Compression};
use image::{DynamicImage, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// An image XObject to embed in a test PDF
#[derive(Debug, Clone)]
pub enum TestImage {
    /// Uncompressed 8-bit DeviceRGB samples
    Rgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// DeviceRGB samples with an 8-bit soft mask
    Masked {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        alpha: Vec<u8>,
    },
    /// A DCTDecode stream holding a real JPEG
    Jpeg { width: u32, height: u32 },
    /// A DCTDecode stream whose bytes are not a JPEG
    Broken { width: u32, height: u32 },
    /// FlateDecode DeviceRGB samples
    Flate {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// FlateDecode DeviceRGB samples behind a PNG predictor (15), each row
    /// using a different PNG filter type
    FlatePredicted {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// 8-bit palette indices into a Flate-compressed DeviceRGB lookup stream
    Indexed {
        width: u32,
        height: u32,
        palette: Vec<[u8; 3]>,
        indices: Vec<u8>,
    },
    /// RGB samples tagged with a three-component ICC profile
    IccRgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// Uncompressed DeviceCMYK samples
    Cmyk {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// RGB samples with a Flate-compressed soft mask of a different size
    ScaledMask {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        mask_width: u32,
        mask_height: u32,
        alpha: Vec<u8>,
    },
    /// A JPXDecode stream; JPEG 2000 is not decoded
    Jpx { width: u32, height: u32 },
}

impl TestImage {
    /// Solid-colour RGB image
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        TestImage::Rgb {
            width,
            height,
            pixels,
        }
    }
}

/// PDF with one page per entry; `None` pages have no content stream
pub fn pdf_with_pages(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for text in pages {
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => resources_id,
        };

        if let Some(text) = text {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            page.set("Contents", content_id);
        }

        kids.push(Object::from(doc.add_object(page)));
    }

    finish(doc, pages_id, kids)
}

/// PDF with the given images drawn on each page
pub fn pdf_with_images(pages: &[Vec<TestImage>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for images in pages {
        let mut xobjects = lopdf::Dictionary::new();
        let mut ops = Vec::new();

        for (i, image) in images.iter().enumerate() {
            let name = format!("Im{}", i + 1);
            let image_id = add_image(&mut doc, image);
            xobjects.set(name.as_bytes().to_vec(), image_id);

            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "cm",
                vec![100.into(), 0.into(), 0.into(), 100.into(), 0.into(), 0.into()],
            ));
            ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            ops.push(Operation::new("Q", vec![]));
        }

        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let resources_id = doc.add_object(dictionary! { "XObject" => xobjects });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::from(page_id));
    }

    finish(doc, pages_id, kids)
}

/// PDF whose single page draws an image through a Form XObject, with the
/// page resources inherited from the page tree
pub fn pdf_with_form_image(image: &TestImage) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = add_image(&mut doc, image);
    let form_content = Content {
        operations: vec![Operation::new("Do", vec![Object::Name(b"Im1".to_vec())])],
    };
    let form_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 1.into(), 1.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
        },
        form_content.encode().unwrap(),
    ));

    let content = Content {
        operations: vec![
            Operation::new("Do", vec![Object::Name(b"Fm1".to_vec())]),
            // Same image drawn directly as well; listed once per page
            Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let doc_pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::from(page_id)],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Fm1" => form_id, "Im1" => image_id },
        },
    };
    doc.objects.insert(pages_id, Object::Dictionary(doc_pages));
    save(doc, pages_id)
}

fn add_image(doc: &mut Document, image: &TestImage) -> ObjectId {
    match image {
        TestImage::Rgb {
            width,
            height,
            pixels,
        } => doc.add_object(Stream::new(
            image_dict(*width, *height, "DeviceRGB"),
            pixels.clone(),
        )),
        TestImage::Masked {
            width,
            height,
            pixels,
            alpha,
        } => {
            let mask_id = doc.add_object(Stream::new(
                image_dict(*width, *height, "DeviceGray"),
                alpha.clone(),
            ));
            let mut dict = image_dict(*width, *height, "DeviceRGB");
            dict.set("SMask", mask_id);
            doc.add_object(Stream::new(dict, pixels.clone()))
        }
        TestImage::Jpeg { width, height } => {
            let mut dict = image_dict(*width, *height, "DeviceRGB");
            dict.set("Filter", "DCTDecode");
            doc.add_object(Stream::new(dict, jpeg_bytes(*width, *height)))
        }
        TestImage::Broken { width, height } => {
            let mut dict = image_dict(*width, *height, "DeviceRGB");
            dict.set("Filter", "DCTDecode");
            doc.add_object(Stream::new(dict, b"not a jpeg at all".to_vec()))
        }
        TestImage::Flate {
            width,
            height,
            pixels,
        } => {
            let mut dict = image_dict(*width, *height, "DeviceRGB");
            dict.set("Filter", "FlateDecode");
            doc.add_object(Stream::new(dict, zlib(pixels)))
        }
        TestImage::FlatePredicted {
            width,
            height,
            pixels,
        } => {
            let mut dict = image_dict(*width, *height, "DeviceRGB");
            dict.set("Filter", "FlateDecode");
            dict.set(
                "DecodeParms",
                dictionary! {
                    "Predictor" => 15,
                    "Colors" => 3,
                    "BitsPerComponent" => 8,
                    "Columns" => *width as i64,
                },
            );
            let rows = png_filter_rows(pixels, *width as usize * 3, 3);
            doc.add_object(Stream::new(dict, zlib(&rows)))
        }
        TestImage::Indexed {
            width,
            height,
            palette,
            indices,
        } => {
            let lookup: Vec<u8> = palette.iter().flatten().copied().collect();
            let lookup_id = doc.add_object(Stream::new(
                dictionary! { "Filter" => "FlateDecode" },
                zlib(&lookup),
            ));
            let mut dict = image_dict(*width, *height, "DeviceRGB");
            dict.set(
                "ColorSpace",
                vec![
                    Object::Name(b"Indexed".to_vec()),
                    Object::Name(b"DeviceRGB".to_vec()),
                    Object::Integer(palette.len() as i64 - 1),
                    Object::Reference(lookup_id),
                ],
            );
            doc.add_object(Stream::new(dict, indices.clone()))
        }
        TestImage::IccRgb {
            width,
            height,
            pixels,
        } => {
            // Profile bytes are never read, only /N
            let profile_id = doc.add_object(Stream::new(
                dictionary! { "N" => 3, "Alternate" => "DeviceRGB" },
                b"not a real profile".to_vec(),
            ));
            let mut dict = image_dict(*width, *height, "DeviceRGB");
            dict.set(
                "ColorSpace",
                vec![Object::Name(b"ICCBased".to_vec()), Object::Reference(profile_id)],
            );
            doc.add_object(Stream::new(dict, pixels.clone()))
        }
        TestImage::Cmyk {
            width,
            height,
            pixels,
        } => doc.add_object(Stream::new(
            image_dict(*width, *height, "DeviceCMYK"),
            pixels.clone(),
        )),
        TestImage::ScaledMask {
            width,
            height,
            pixels,
            mask_width,
            mask_height,
            alpha,
        } => {
            let mut mask_dict = image_dict(*mask_width, *mask_height, "DeviceGray");
            mask_dict.set("Filter", "FlateDecode");
            let mask_id = doc.add_object(Stream::new(mask_dict, zlib(alpha)));
            let mut dict = image_dict(*width, *height, "DeviceRGB");
            dict.set("SMask", mask_id);
            doc.add_object(Stream::new(dict, pixels.clone()))
        }
        TestImage::Jpx { width, height } => {
            let mut dict = image_dict(*width, *height, "DeviceRGB");
            dict.set("Filter", "JPXDecode");
            doc.add_object(Stream::new(dict, b"\0\0\0\x0cjP  not decoded".to_vec()))
        }
    }
}

/// zlib-compress sample bytes as a FlateDecode filter expects
fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Apply PNG row filters, cycling through None, Sub, Up, Average and Paeth
fn png_filter_rows(raw: &[u8], row_len: usize, bpp: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + raw.len() / row_len.max(1) + 1);
    let mut previous = vec![0u8; row_len];

    for (index, row) in raw.chunks(row_len).enumerate() {
        let filter = (index % 5) as u8;
        out.push(filter);
        for i in 0..row.len() {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
            let predicted = match filter {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                _ => paeth(left, up, up_left),
            };
            out.push(row[i].wrapping_sub(predicted));
        }
        previous = row.to_vec();
    }

    out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let (pa, pb, pc) = ((p - a as i16).abs(), (p - b as i16).abs(), (p - c as i16).abs());
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn image_dict(width: u32, height: u32, color_space: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

/// A real JPEG of the given size
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 10 % 256) as u8, (y * 10 % 256) as u8, 128])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)
        .unwrap();
    out
}

fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<Object>) -> Vec<u8> {
    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    save(doc, pages_id)
}

fn save(mut doc: Document, pages_id: ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// DOCX with one plain paragraph per entry
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            if p.is_empty() {
                "<w:p/>".to_string()
            } else {
                format!(
                    "<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
                    html_escape::encode_text(p)
                )
            }
        })
        .collect();
    docx_with_body(&body)
}

/// DOCX whose `w:body` holds the given raw XML
pub fn docx_with_body(body_xml: &str) -> Vec<u8> {
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}<w:sectPr/></w:body></w:document>",
        body_xml
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}
