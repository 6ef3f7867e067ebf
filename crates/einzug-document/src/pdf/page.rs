// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page writer — convert one captured page image into a single-page PDF using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: the page is a `PdfPage` holding a
// `Vec<Op>` operation list, serialised via `PdfDocument::save()`. The page is
// sized from the pixel dimensions at the capture resolution, so the scan
// fills it edge to edge.

use std::path::Path;

use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use einzug_core::error::{EinzugError, Result};

const MM_PER_INCH: f32 = 25.4;

/// Converts captured page images into single-page PDF files.
pub struct PageWriter {
    /// Capture resolution; determines the physical page size.
    resolution_dpi: u32,
    /// Rotate pages 180° (duplex feeders emit them upside down).
    rotate: bool,
}

impl PageWriter {
    pub fn new(resolution_dpi: u32, rotate: bool) -> Self {
        Self {
            resolution_dpi,
            rotate,
        }
    }

    /// Render `image_bytes` as a single-page PDF and write it to `target`.
    #[instrument(skip(self, image_bytes), fields(bytes_len = image_bytes.len(), target = %target.display()))]
    pub fn write_page(&self, image_bytes: &[u8], target: &Path) -> Result<()> {
        let pdf = self.render(image_bytes)?;
        std::fs::write(target, &pdf)?;
        info!("wrote page PDF to {}", target.display());
        Ok(())
    }

    /// Render `image_bytes` as a single-page PDF, returning the PDF bytes.
    pub fn render(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let mut decoded = image::load_from_memory(image_bytes)
            .map_err(|err| EinzugError::Image(format!("failed to decode page image: {err}")))?;

        if self.rotate {
            decoded = decoded.rotate180();
        }

        let width_px = decoded.width() as usize;
        let height_px = decoded.height() as usize;

        let rgb = decoded.to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: width_px,
            height: height_px,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        // Page size equals the physical size of the scan.
        let dpi = self.resolution_dpi as f32;
        let page_w = Mm(width_px as f32 / dpi * MM_PER_INCH);
        let page_h = Mm(height_px as f32 / dpi * MM_PER_INCH);

        let mut doc = PdfDocument::new("Einzug Scan");
        let xobject_id = doc.add_image(&raw);

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: None,
                scale_y: None,
                dpi: Some(dpi),
                rotate: None,
            },
        }];

        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        debug!(width_px, height_px, dpi, "page rendered");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    /// Encode a solid-colour test image as PNG bytes.
    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 200, 200]),
        ));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
        buf.into_inner()
    }

    #[test]
    fn render_produces_a_pdf() {
        let writer = PageWriter::new(600, true);
        let pdf = writer.render(&png_bytes(8, 12)).expect("render");
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn garbage_input_is_an_image_error() {
        let writer = PageWriter::new(600, false);
        let err = writer.render(b"not an image").unwrap_err();
        assert!(matches!(err, EinzugError::Image(_)));
    }

    #[test]
    fn write_page_creates_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("0.pdf");

        let writer = PageWriter::new(300, false);
        writer.write_page(&png_bytes(4, 4), &target).expect("write");

        let written = std::fs::read(&target).expect("read back");
        assert!(written.starts_with(b"%PDF"));
    }
}
