//! Spreadsheet rendering of report results.
//!
//! One worksheet per result sheet. Row 0 holds the display labels in a
//! bold, shaded, bordered header; the report title sits one column to the
//! right of the header. Numeric columns get width 14 and `#,##0.00`;
//! other columns are sized to their label. Dates are written as
//! `YYYY-MM-DD` text.

use std::path::{Path, PathBuf};

use salesbot_core::error::CoreError;
use salesbot_core::runner::{ExportDocument, ReportExporter};
use salesbot_core::table::{Cell, Sheet};
use xlsxwriter::*;

const NUMBER_FORMAT: &str = "#,##0.00";
const NUMERIC_WIDTH: f64 = 14.0;
const MIN_TEXT_WIDTH: usize = 12;
const HEADER_BG: u32 = 0xEFEFEF;

/// Excel caps sheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxExporter;

fn xlsx_err(e: XlsxError) -> CoreError {
    CoreError::Internal(format!("xlsx export failed: {e}"))
}

/// Text column width: the label length plus padding, at least 12.
pub fn text_width(label: &str) -> f64 {
    (label.chars().count() + 2).max(MIN_TEXT_WIDTH) as f64
}

fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.is_empty() {
        "Report".into()
    } else {
        cleaned
    }
}

fn write_sheet(
    workbook: &Workbook,
    doc: &ExportDocument,
    sheet: &Sheet,
    header: &Format,
    number: &Format,
) -> Result<(), XlsxError> {
    let mut ws = workbook.add_worksheet(Some(&sheet_name(&sheet.name)))?;
    let table = &sheet.table;

    for (idx, column) in table.columns.iter().enumerate() {
        let col = idx as u16;
        let label = doc.label(column);
        ws.write_string(0, col, label, Some(header))?;
        if table.is_numeric_column(idx) {
            ws.set_column(col, col, NUMERIC_WIDTH, Some(number))?;
        } else {
            ws.set_column(col, col, text_width(label), None)?;
        }
    }

    for (r, row) in table.rows.iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let col = c as u16;
            match cell {
                Cell::Text(s) => ws.write_string(excel_row, col, s, None)?,
                Cell::Int(n) => ws.write_number(excel_row, col, *n as f64, Some(number))?,
                Cell::Number(x) => ws.write_number(excel_row, col, *x, Some(number))?,
                Cell::Date(d) => {
                    ws.write_string(excel_row, col, &d.format("%Y-%m-%d").to_string(), None)?
                }
                Cell::Empty => {}
            }
        }
    }

    if !doc.title.is_empty() {
        ws.write_string(0, table.columns.len() as u16 + 1, &doc.title, None)?;
    }
    Ok(())
}

impl ReportExporter for XlsxExporter {
    fn export(&self, doc: &ExportDocument, path: &Path) -> Result<PathBuf, CoreError> {
        let target = path
            .to_str()
            .ok_or_else(|| CoreError::Config(format!("non UTF-8 output path: {}", path.display())))?;

        let mut header = Format::new();
        header
            .set_bold()
            .set_bg_color(FormatColor::Custom(HEADER_BG))
            .set_border(FormatBorder::Thin);
        let mut number = Format::new();
        number.set_num_format(NUMBER_FORMAT);

        let workbook = Workbook::new(target).map_err(xlsx_err)?;
        for sheet in &doc.sheets {
            write_sheet(&workbook, doc, sheet, &header, &number).map_err(xlsx_err)?;
        }
        workbook.close().map_err(xlsx_err)?;

        tracing::debug!(path = %path.display(), sheets = doc.sheets.len(), "Workbook written");
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use salesbot_core::table::TabularResult;

    use super::*;

    fn doc() -> ExportDocument {
        let mut table = TabularResult::new(&["client", "last_purchase", "total_spent"]);
        table.push_row(vec![
            "Acme".into(),
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap().into(),
            1234.5.into(),
        ]);
        table.push_row(vec!["Bolt".into(), Cell::Empty, 10.0.into()]);
        ExportDocument {
            title: "Inactive clients".into(),
            labels: vec![("total_spent".into(), "Total spent".into())],
            sheets: vec![Sheet::new("Report", table)],
        }
    }

    #[test]
    fn writes_workbook_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inactive_clients_20240301_0905.xlsx");
        let written = XlsxExporter.export(&doc(), &path).unwrap();
        assert_eq!(written, path);
        let bytes = std::fs::read(&path).unwrap();
        // xlsx is a zip container.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn multi_sheet_documents_are_supported() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = doc();
        let second = d.sheets[0].table.clone();
        d.sheets.push(Sheet::new("Overall", second));
        let path = dir.path().join("declined.xlsx");
        assert!(XlsxExporter.export(&d, &path).is_ok());
    }

    #[test]
    fn widths_and_sheet_names() {
        assert_eq!(text_width("Client"), 12.0);
        assert_eq!(text_width("Days since last purchase"), 26.0);
        assert_eq!(sheet_name("By/Client:*"), "ByClient");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(sheet_name("[]"), "Report");
    }
}
