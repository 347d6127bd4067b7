// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page sources — a directory of scans, a scanned PDF, or a single image,
// yielded as ordered page images.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use markwerk_core::{MarkwerkError, Result};
use tracing::{debug, info, instrument};

/// File extensions accepted as page images.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Ordered pages of one input document.
///
/// Pages are decoded lazily; a page that fails to decode yields an error for
/// that page only.
pub enum PageSource {
    Files(std::vec::IntoIter<PathBuf>),
    Pdf {
        document: Box<Document>,
        name: String,
        pages: std::vec::IntoIter<(u32, ObjectId)>,
    },
}

impl PageSource {
    /// Number of pages still to be yielded.
    pub fn remaining(&self) -> usize {
        match self {
            Self::Files(files) => files.len(),
            Self::Pdf { pages, .. } => pages.len(),
        }
    }
}

impl Iterator for PageSource {
    type Item = (String, Result<DynamicImage>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Files(files) => {
                let path = files.next()?;
                Some((file_label(&path), load_image(&path)))
            }
            Self::Pdf {
                document,
                name,
                pages,
            } => {
                let (number, page_id) = pages.next()?;
                let label = format!("{name}#{number}");
                Some((label, page_image(document, page_id)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

/// Open `path` as a sequence of page images.
///
/// A directory yields its image files sorted by name, a `.pdf` yields one
/// image per page, and any other file is a single page.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open_pages(path: impl AsRef<Path>) -> Result<PageSource> {
    let path = path.as_ref();
    if path.is_dir() {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry_path = entry?.path();
            if entry_path.is_file() && has_image_extension(&entry_path) {
                files.push(entry_path);
            }
        }
        files.sort();
        info!(pages = files.len(), "Opened image directory");
        return Ok(PageSource::Files(files.into_iter()));
    }

    if !path.is_file() {
        return Err(MarkwerkError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input not found: {}", path.display()),
        )));
    }

    if extension_of(path).as_deref() == Some("pdf") {
        let document = Document::load(path).map_err(|err| {
            MarkwerkError::PdfError(format!("failed to open {}: {}", path.display(), err))
        })?;
        let pages: Vec<(u32, ObjectId)> = document.get_pages().into_iter().collect();
        info!(pages = pages.len(), "Opened PDF");
        return Ok(PageSource::Pdf {
            document: Box::new(document),
            name: file_label(path),
            pages: pages.into_iter(),
        });
    }

    Ok(PageSource::Files(vec![path.to_path_buf()].into_iter()))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn has_image_extension(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|err| {
        MarkwerkError::ImageError(format!("failed to load {}: {}", path.display(), err))
    })
}

// -- PDF page images ----------------------------------------------------------

/// Follow indirect references until a direct object is reached.
fn resolve<'a>(document: &'a Document, mut object: &'a Object) -> Result<&'a Object> {
    // Bounded so a reference cycle cannot loop forever.
    for _ in 0..32 {
        match object {
            Object::Reference(id) => object = document.get_object(*id).map_err(pdf_error)?,
            direct => return Ok(direct),
        }
    }
    Err(MarkwerkError::PdfError("reference chain too deep".into()))
}

fn pdf_error(err: lopdf::Error) -> MarkwerkError {
    MarkwerkError::PdfError(err.to_string())
}

/// The page's resource dictionary, inherited from ancestors when absent.
fn page_resources(document: &Document, page_id: ObjectId) -> Result<&Dictionary> {
    let mut node = document.get_dictionary(page_id).map_err(pdf_error)?;
    for _ in 0..32 {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(document, resources)?.as_dict().map_err(pdf_error);
        }
        let parent = node
            .get(b"Parent")
            .map_err(|_| MarkwerkError::PdfError("page has no resources".into()))?;
        node = resolve(document, parent)?.as_dict().map_err(pdf_error)?;
    }
    Err(MarkwerkError::PdfError("page tree too deep".into()))
}

fn dict_integer(dict: &Dictionary, key: &[u8]) -> Result<i64> {
    dict.get(key).and_then(Object::as_i64).map_err(|_| {
        MarkwerkError::PdfError(format!(
            "image is missing /{}",
            String::from_utf8_lossy(key)
        ))
    })
}

/// Decode the largest image drawn on a PDF page.
fn page_image(document: &Document, page_id: ObjectId) -> Result<DynamicImage> {
    let resources = page_resources(document, page_id)?;
    let xobjects = resources
        .get(b"XObject")
        .map_err(|_| MarkwerkError::PdfError("page has no images".into()))?;
    let xobjects = resolve(document, xobjects)?.as_dict().map_err(pdf_error)?;

    let mut largest: Option<(&Stream, i64)> = None;
    for (_, object) in xobjects.iter() {
        let Ok(stream) = resolve(document, object)?.as_stream() else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|name| name == b"Image");
        if !is_image {
            continue;
        }
        let area = dict_integer(&stream.dict, b"Width")? * dict_integer(&stream.dict, b"Height")?;
        if largest.is_none_or(|(_, best)| area > best) {
            largest = Some((stream, area));
        }
    }

    let (stream, _) =
        largest.ok_or_else(|| MarkwerkError::PdfError("page has no images".into()))?;
    decode_image_stream(document, stream)
}

fn stream_filters(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_image_stream(document: &Document, stream: &Stream) -> Result<DynamicImage> {
    let filters = stream_filters(stream);
    debug!(
        filters = ?filters.iter().map(|f| String::from_utf8_lossy(f).into_owned()).collect::<Vec<_>>(),
        "Decoding page image"
    );

    if filters.iter().any(|f| f == b"DCTDecode") {
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|err| MarkwerkError::PdfError(format!("JPEG page image: {err}")));
    }

    let samples = match filters.as_slice() {
        [] => stream.content.clone(),
        [flate] if flate == b"FlateDecode" => {
            stream.decompressed_content().map_err(pdf_error)?
        }
        other => {
            return Err(MarkwerkError::PdfError(format!(
                "unsupported image filter {:?}",
                other
                    .iter()
                    .map(|f| String::from_utf8_lossy(f).into_owned())
                    .collect::<Vec<_>>()
            )));
        }
    };

    let width = u32::try_from(dict_integer(&stream.dict, b"Width")?)
        .map_err(|_| MarkwerkError::PdfError("invalid image width".into()))?;
    let height = u32::try_from(dict_integer(&stream.dict, b"Height")?)
        .map_err(|_| MarkwerkError::PdfError("invalid image height".into()))?;
    let bits = dict_integer(&stream.dict, b"BitsPerComponent")?;
    if bits != 8 {
        return Err(MarkwerkError::PdfError(format!(
            "unsupported bits per component: {bits}"
        )));
    }

    let color_space = match stream.dict.get(b"ColorSpace") {
        Ok(object) => resolve(document, object)?
            .as_name()
            .map(<[u8]>::to_vec)
            .map_err(|_| MarkwerkError::PdfError("unsupported color space".into()))?,
        Err(_) => return Err(MarkwerkError::PdfError("image has no color space".into())),
    };

    let malformed = || MarkwerkError::PdfError("image data does not match its size".into());
    match color_space.as_slice() {
        b"DeviceGray" => GrayImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(malformed),
        b"DeviceRGB" => RgbImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(malformed),
        other => Err(MarkwerkError::PdfError(format!(
            "unsupported color space {}",
            String::from_utf8_lossy(other)
        ))),
    }
}
