//! Post-processing of a saved `xlsx` package.
//!
//! The writer refuses sheet names that differ only by case, so such sheets
//! are written under placeholder names and renamed here, in the two package
//! parts that list sheet names.

use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::WorkbookResult;

const NAME_PARTS: [&str; 2] = ["xl/workbook.xml", "docProps/app.xml"];

/// Replace each `(placeholder, name)` pair in the package `bytes`.
pub(super) fn restore_sheet_names(
    bytes: Vec<u8>,
    renames: &[(String, String)],
) -> WorkbookResult<Vec<u8>> {
    if renames.is_empty() {
        return Ok(bytes);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut out = Vec::new();
    {
        let mut writer = ZipWriter::new(Cursor::new(&mut out));

        for index in 0..archive.len() {
            let name = archive.by_index_raw(index)?.name().to_string();

            if NAME_PARTS.contains(&name.as_str()) {
                let mut xml = String::new();
                archive.by_index(index)?.read_to_string(&mut xml)?;
                for (placeholder, real) in renames {
                    xml = rename_in_part(&xml, placeholder, real);
                }

                let options: FileOptions<'_, ()> =
                    FileOptions::default().compression_method(CompressionMethod::Deflated);
                writer.start_file(name, options)?;
                writer.write_all(xml.as_bytes())?;
            } else {
                writer.raw_copy_file(archive.by_index_raw(index)?)?;
            }
        }

        writer.finish()?;
    }

    Ok(out)
}

/// `workbook.xml` names sheets in a `name` attribute, `app.xml` in `vt:lpstr`.
fn rename_in_part(xml: &str, placeholder: &str, real: &str) -> String {
    let real = escape_xml(real);
    xml.replace(
        &format!("name=\"{}\"", placeholder),
        &format!("name=\"{}\"", real),
    )
    .replace(
        &format!("<vt:lpstr>{}</vt:lpstr>", placeholder),
        &format!("<vt:lpstr>{}</vt:lpstr>", real),
    )
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_in_both_parts() {
        let workbook = r#"<sheets><sheet name="DATA" sheetId="1" r:id="rId1"/><sheet name="sheetmerge~1" sheetId="2" r:id="rId2"/><sheet name="sheetmerge~10" sheetId="3" r:id="rId3"/></sheets>"#;
        let renamed = rename_in_part(workbook, "sheetmerge~1", "data");
        assert!(renamed.contains(r#"<sheet name="data" sheetId="2""#));
        assert!(renamed.contains(r#"name="sheetmerge~10""#));

        let app = "<vt:lpstr>DATA</vt:lpstr><vt:lpstr>sheetmerge~1</vt:lpstr>";
        assert_eq!(
            rename_in_part(app, "sheetmerge~1", "data"),
            "<vt:lpstr>DATA</vt:lpstr><vt:lpstr>data</vt:lpstr>"
        );
    }

    #[test]
    fn test_names_are_escaped() {
        let xml = r#"<sheet name="sheetmerge~1"/>"#;
        assert_eq!(
            rename_in_part(xml, "sheetmerge~1", "r&d \"x\""),
            r#"<sheet name="r&amp;d &quot;x&quot;"/>"#
        );
    }

    #[test]
    fn test_no_renames_returns_bytes_unchanged() {
        let bytes = vec![1, 2, 3];
        assert_eq!(restore_sheet_names(bytes.clone(), &[]).unwrap(), bytes);
    }
}
