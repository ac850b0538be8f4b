//! # PDF Serializer
//!
//! Executes a page plan against a captured raster and writes a valid PDF
//! file. This is a from-scratch PDF 1.7 writer: the subset needed here —
//! image XObjects, filled rects, Helvetica text, page tree, xref — is small
//! enough that owning the bytes beats carrying a PDF library.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (catalog, fonts, images, streams)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Each page embeds its raster band as a FlateDecode RGB image XObject and
//! draws the footer band (and, on continuation pages, the header band) as
//! filled rects with Helvetica text on top. All page-plan coordinates are
//! millimetres; conversion to PDF points happens here and nowhere else.

use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::model::Document;
use crate::paginate::{PageGeometry, PagePlan, PageSlice};
use crate::raster::Raster;
use crate::theme::Color;

const MM_TO_PT: f64 = 72.0 / 25.4;

/// Left-aligned product label in every footer band.
pub const PRODUCT_LABEL: &str = "Rapport Studio";

const FOOTER_FONT_SIZE: f64 = 8.0;
const HEADER_FONT_SIZE: f64 = 10.0;
/// Horizontal inset of band text from the band edge, in mm.
const BAND_TEXT_INSET: f64 = 2.0;

pub struct PdfWriter;

struct PdfObject {
    data: Vec<u8>,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Execute `plan` against `raster` and return the PDF bytes.
    pub fn write(
        &self,
        document: &Document,
        raster: &Raster,
        plan: &PagePlan,
        geometry: &PageGeometry,
    ) -> Vec<u8> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3 = Helvetica, 4 = Helvetica-Bold
        // 5+ = per-page image XObjects, content streams, page objects
        builder.push(Vec::new());
        builder.push(Vec::new());
        builder.push(Vec::new());
        builder.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
               /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );
        builder.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold \
               /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );

        let page_width_pt = geometry.page_width * MM_TO_PT;
        let page_height_pt = geometry.page_height * MM_TO_PT;

        let mut page_obj_ids: Vec<usize> = Vec::new();
        for slice in &plan.slices {
            let image_obj_id = write_band_xobject(&mut builder, raster, slice);

            let content =
                self.build_content_stream(document, slice, plan.total_pages, geometry);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            let content_obj_id = builder.push(content_data);

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << /F0 3 0 R /F1 4 0 R >> \
                 /XObject << /Im0 {} 0 R >> >> >>",
                page_width_pt, page_height_pt, content_obj_id, image_obj_id
            );
            let page_obj_id = builder.push(page_dict.into_bytes());
            page_obj_ids.push(page_obj_id);
        }

        // Catalog (object 1)
        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        // Pages tree (object 2)
        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        // Info dictionary
        let mut info = String::from("<< ");
        let _ = write!(info, "/Title ({}) ", escape_pdf_string(&document.title));
        if !document.subtitle.is_empty() {
            let _ = write!(info, "/Subject ({}) ", escape_pdf_string(&document.subtitle));
        }
        if let Some(company) = &document.company_name {
            let _ = write!(info, "/Author ({}) ", escape_pdf_string(company));
        }
        let _ = write!(info, "/Producer (Rapport 0.1) /Creator (Rapport) >>");
        let info_obj_id = builder.push(info.into_bytes());

        serialize(&builder, info_obj_id)
    }

    /// Build the PDF content stream for one page: image band, continuation
    /// header, footer band.
    fn build_content_stream(
        &self,
        document: &Document,
        slice: &PageSlice,
        total_pages: usize,
        geometry: &PageGeometry,
    ) -> String {
        let mut stream = String::new();
        let page_height_pt = geometry.page_height * MM_TO_PT;
        let primary = document.theme.primary;

        // The raster band. PDF places images from the bottom-left corner.
        let w = slice.dest_width * MM_TO_PT;
        let h = slice.dest_height * MM_TO_PT;
        let x = slice.dest_x * MM_TO_PT;
        let y = page_height_pt - (slice.dest_y + slice.dest_height) * MM_TO_PT;
        let _ = write!(stream, "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im0 Do\nQ\n", w, h, x, y);

        if slice.continuation_header {
            self.write_continuation_header(&mut stream, document, geometry, primary);
        }
        self.write_footer(&mut stream, document, slice.index, total_pages, geometry, primary);

        stream
    }

    fn write_continuation_header(
        &self,
        stream: &mut String,
        document: &Document,
        geometry: &PageGeometry,
        primary: Color,
    ) {
        let page_height_pt = geometry.page_height * MM_TO_PT;
        let x = geometry.margin * MM_TO_PT;
        let w = geometry.usable_width() * MM_TO_PT;
        let h = geometry.continuation_header * MM_TO_PT;
        let y = page_height_pt - (geometry.margin * MM_TO_PT) - h;

        fill_rect(stream, x, y, w, h, primary);

        let title = format!("{} (continued)", document.title);
        let text_x = (geometry.margin + BAND_TEXT_INSET) * MM_TO_PT;
        let baseline = y + h * 0.32;
        write_text(stream, "F1", HEADER_FONT_SIZE, text_x, baseline, &title, Color::rgb(255, 255, 255));
    }

    /// Footer band on every page: product label left, generation date
    /// centered, page indicator right.
    fn write_footer(
        &self,
        stream: &mut String,
        document: &Document,
        page_index: usize,
        total_pages: usize,
        geometry: &PageGeometry,
        primary: Color,
    ) {
        let x = geometry.margin * MM_TO_PT;
        let w = geometry.usable_width() * MM_TO_PT;
        let h = geometry.footer_band * MM_TO_PT;
        let y = geometry.margin * MM_TO_PT;

        fill_rect(stream, x, y, w, h, primary);

        let white = Color::rgb(255, 255, 255);
        let baseline = y + h * 0.32;
        let inset = BAND_TEXT_INSET * MM_TO_PT;

        write_text(stream, "F0", FOOTER_FONT_SIZE, x + inset, baseline, PRODUCT_LABEL, white);

        let date = document.generated_date.format("%b %d, %Y").to_string();
        let date_x = x + (w - approx_text_width(&date, FOOTER_FONT_SIZE)) / 2.0;
        write_text(stream, "F0", FOOTER_FONT_SIZE, date_x, baseline, &date, white);

        let page_label = format!("Page {} of {}", page_index + 1, total_pages);
        let page_x = x + w - inset - approx_text_width(&page_label, FOOTER_FONT_SIZE);
        write_text(stream, "F0", FOOTER_FONT_SIZE, page_x, baseline, &page_label, white);
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Compress one raster band and write it as an RGB image XObject.
/// Returns the object ID.
fn write_band_xobject(builder: &mut PdfBuilder, raster: &Raster, slice: &PageSlice) -> usize {
    let band = raster.band(slice.source_y, slice.source_height);
    let compressed = compress_to_vec_zlib(band, 6);

    let mut obj_data: Vec<u8> = Vec::new();
    let _ = write!(
        obj_data,
        "<< /Type /XObject /Subtype /Image \
         /Width {} /Height {} \
         /ColorSpace /DeviceRGB \
         /BitsPerComponent 8 \
         /Filter /FlateDecode \
         /Length {} >>\nstream\n",
        raster.width(),
        slice.source_height,
        compressed.len()
    );
    obj_data.extend_from_slice(&compressed);
    obj_data.extend_from_slice(b"\nendstream");
    builder.push(obj_data)
}

fn fill_rect(stream: &mut String, x: f64, y: f64, w: f64, h: f64, color: Color) {
    let (r, g, b) = color.to_unit();
    let _ = write!(
        stream,
        "q\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
        r, g, b, x, y, w, h
    );
}

fn write_text(
    stream: &mut String,
    font: &str,
    size: f64,
    x: f64,
    baseline: f64,
    text: &str,
    color: Color,
) {
    let (r, g, b) = color.to_unit();
    let _ = write!(
        stream,
        "BT\n{:.3} {:.3} {:.3} rg\n/{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
        r,
        g,
        b,
        font,
        size,
        x,
        baseline,
        encode_winansi(text)
    );
}

/// Rough Helvetica advance estimate, good enough to center and right-align
/// the short footer strings.
fn approx_text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * 0.52
}

/// Escape special characters in a PDF string.
fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Encode text for a WinAnsi (Windows-1252) Type1 font: ASCII passes
/// through with delimiter escapes, every other codepage byte goes out as
/// an octal escape, and anything outside the codepage degrades to `?`.
fn encode_winansi(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            ' '..='~' => out.push(ch),
            _ => match winansi_byte(ch) {
                Some(byte) => {
                    let _ = write!(out, "\\{:03o}", byte);
                }
                None => out.push('?'),
            },
        }
    }
    out
}

/// Map a Unicode codepoint to its WinAnsiEncoding byte value.
///
/// WinAnsiEncoding is based on Windows-1252: 0xA0..=0xFF maps directly,
/// and 0x80..=0x9F carries the special mappings for the euro sign, smart
/// quotes, dashes, bullets, and friends.
fn winansi_byte(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // Euro sign
        0x201A => Some(0x82), // Single low-9 quotation mark
        0x0192 => Some(0x83), // Latin small letter f with hook
        0x201E => Some(0x84), // Double low-9 quotation mark
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2020 => Some(0x86), // Dagger
        0x2021 => Some(0x87), // Double dagger
        0x02C6 => Some(0x88), // Modifier letter circumflex accent
        0x2030 => Some(0x89), // Per mille sign
        0x0160 => Some(0x8A), // Latin capital letter S with caron
        0x2039 => Some(0x8B), // Single left-pointing angle quotation
        0x0152 => Some(0x8C), // Latin capital ligature OE
        0x017D => Some(0x8E), // Latin capital letter Z with caron
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x02DC => Some(0x98), // Small tilde
        0x2122 => Some(0x99), // Trade mark sign
        0x0161 => Some(0x9A), // Latin small letter s with caron
        0x203A => Some(0x9B), // Single right-pointing angle quotation
        0x0153 => Some(0x9C), // Latin small ligature oe
        0x017E => Some(0x9E), // Latin small letter z with caron
        0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
        _ => None,
    }
}

fn serialize(builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

    // Header
    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in builder.objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let header = format!("{} 0 obj\n", i);
        output.extend_from_slice(header.as_bytes());
        output.extend_from_slice(&obj.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
    let _ = write!(output, "0000000000 65535 f \n");
    for i in 1..builder.objects.len() {
        let _ = write!(output, "{:010} 00000 n \n", offsets[i]);
    }

    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        builder.objects.len(),
        info_obj_id,
        xref_offset
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;
    use crate::paginate::paginate;

    fn write_pdf(width: u32, height: u32) -> Vec<u8> {
        let document = Document::new("Annual (Q4) Review");
        let raster = Raster::solid(width, height, (240, 240, 255)).unwrap();
        let geometry = PageGeometry::a4_portrait();
        let plan = paginate(raster.width(), raster.height(), &geometry);
        PdfWriter::new().write(&document, &raster, &plan, &geometry)
    }

    fn count_pages(pdf: &[u8]) -> usize {
        let text = String::from_utf8_lossy(pdf);
        text.matches("/Type /Page /Parent").count()
    }

    #[test]
    fn test_single_page_structure() {
        let pdf = write_pdf(800, 600);
        assert!(pdf.starts_with(b"%PDF-1.7"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert_eq!(count_pages(&pdf), 1);
    }

    #[test]
    fn test_multi_page_count_matches_plan() {
        // 800px wide → 267mm content band ≈ 1124 source rows per page.
        let geometry = PageGeometry::a4_portrait();
        let plan = paginate(800, 4000, &geometry);
        assert!(plan.total_pages > 1);
        let pdf = write_pdf(800, 4000);
        assert_eq!(count_pages(&pdf), plan.total_pages);
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_encode_winansi() {
        assert_eq!(encode_winansi("Page 1 of 3"), "Page 1 of 3");
        assert_eq!(encode_winansi("caf\u{e9}"), "caf\\351");
        assert_eq!(encode_winansi("(a)"), "\\(a\\)");
        assert_eq!(encode_winansi("\u{2192}"), "?");
    }

    #[test]
    fn test_encode_winansi_windows_1252_specials() {
        // The 0x80-0x9F region: euro, curly quotes, dashes, trademark.
        assert_eq!(encode_winansi("\u{20ac}100"), "\\200100");
        assert_eq!(encode_winansi("\u{201c}Q4\u{201d}"), "\\223Q4\\224");
        assert_eq!(encode_winansi("2025\u{2013}2026"), "2025\\2262026");
        assert_eq!(encode_winansi("Rapport\u{2122}"), "Rapport\\231");
    }

    #[test]
    fn test_title_lands_in_info_dict_escaped() {
        let pdf = write_pdf(800, 600);
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("/Title (Annual \\(Q4\\) Review)"));
    }
}
