//! # Workbook Serializer
//!
//! Walks the document model directly — no capture, no raster — and emits a
//! multi-sheet XLSX workbook. A fixed "Report Info" sheet leads, then one
//! sheet per section with that section's grid projection.

use rust_xlsxwriter::{Format, Workbook};

use crate::error::Result;
use crate::model::{Document, SheetCell};

/// Sheet 1 always carries the report metadata under this name.
pub const INFO_SHEET_NAME: &str = "Report Info";

/// How many title characters survive into a section's sheet name.
const SHEET_TITLE_LEN: usize = 25;

/// Serialize the document as a workbook and return the XLSX bytes.
pub fn write_workbook(document: &Document) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let info = workbook.add_worksheet().set_name(INFO_SHEET_NAME)?;
    let fields = [
        ("Title", document.title.clone()),
        ("Subtitle", document.subtitle.clone()),
        (
            "Company",
            document.company_name.clone().unwrap_or_default(),
        ),
        (
            "Generated",
            document.generated_date.format("%Y-%m-%d").to_string(),
        ),
        ("Sections", document.sections.len().to_string()),
    ];
    for (row, (label, value)) in fields.iter().enumerate() {
        info.write_string_with_format(row as u32, 0, *label, &header)?;
        info.write_string(row as u32, 1, value.as_str())?;
    }
    info.set_column_width(0, 16)?;
    info.set_column_width(1, 40)?;

    for (index, section) in document.sections.iter().enumerate() {
        let worksheet = workbook
            .add_worksheet()
            .set_name(sheet_name(index, &section.title))?;

        for (row, cells) in section.sheet_rows().iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let (row, col) = (row as u32, col as u16);
                match cell {
                    SheetCell::Empty => {}
                    SheetCell::Text(text) if row == 0 => {
                        worksheet.write_string_with_format(row, col, text.as_str(), &header)?;
                    }
                    SheetCell::Text(text) => {
                        worksheet.write_string(row, col, text.as_str())?;
                    }
                    SheetCell::Number(n) => {
                        worksheet.write_number(row, col, *n)?;
                    }
                }
            }
        }
        worksheet.set_column_width(0, 24)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Section sheet name: 1-based position, a dash, and the first 25 title
/// characters with everything outside `[A-Za-z0-9 ]` stripped. The position
/// prefix keeps names unique when titles collide.
pub fn sheet_name(index: usize, title: &str) -> String {
    let cleaned: String = title
        .chars()
        .take(SHEET_TITLE_LEN)
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        format!("{}-Section", index + 1)
    } else {
        format!("{}-{}", index + 1, cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChartKind, SectionKind};

    #[test]
    fn test_sheet_name_sanitization() {
        assert_eq!(sheet_name(0, "Revenue: Q4 / EMEA"), "1-Revenue Q4  EMEA");
        assert_eq!(
            sheet_name(2, "A very long section title that keeps going"),
            "3-A very long section title"
        );
        assert_eq!(sheet_name(1, "***"), "2-Section");
    }

    #[test]
    fn test_workbook_is_zip_container() {
        let document = Document::new("Monthly Report")
            .add_section(SectionKind::stat_cards())
            .add_section(SectionKind::chart(ChartKind::Bar));
        let bytes = write_workbook(&document).unwrap();
        // XLSX is a ZIP archive.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_document_still_has_info_sheet() {
        let document = Document::new("Empty");
        let bytes = write_workbook(&document).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
