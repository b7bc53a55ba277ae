//! CSV interchange between the detect stage and the store-load stage.
//!
//! One header row followed by one row per detection record. Fields holding a
//! comma, quote or line break are quoted with doubled inner quotes. Rows that
//! cannot be parsed are rejected individually and counted; they never abort
//! an import.

use std::io::{Read, Write};

use crate::detect::BoundingBox;
use crate::error::{Result, TimelineError};
use crate::record::DetectionRecord;

pub const HEADER: [&str; 8] = [
    "Class",
    "Timestamp",
    "Frame",
    "BoundingBox_Coord0",
    "BoundingBox_Coord1",
    "BoundingBox_Coord2",
    "BoundingBox_Coord3",
    "Confidence",
];

/// Result of reading a CSV export.
#[derive(Debug, Default)]
pub struct TabularImport {
    pub records: Vec<DetectionRecord>,
    pub rejected: usize,
}

/// Write the header and one row per record. Returns the number of rows.
pub fn write_records<W: Write>(mut writer: W, records: &[DetectionRecord]) -> Result<usize> {
    writeln!(writer, "{}", HEADER.join(","))?;
    for record in records {
        let [x0, y0, x1, y1] = record.bbox().coords();
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            escape_field(record.class_name()),
            escape_field(record.timestamp()),
            record.frame_index(),
            x0,
            y0,
            x1,
            y1,
            record.confidence()
        )?;
    }
    writer.flush()?;
    Ok(records.len())
}

/// Read a CSV export. The first row is treated as the header and skipped.
pub fn read_records<R: Read>(mut reader: R) -> Result<TabularImport> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut rows = split_rows(&text).into_iter();
    let mut import = TabularImport::default();
    match rows.next() {
        Some((_, header)) if header != HEADER => {
            log::warn!("unexpected CSV header {:?}; skipping it anyway", header);
        }
        Some(_) => {}
        None => return Ok(import),
    }

    for (line, fields) in rows {
        if fields.len() == 1 && fields[0].trim().is_empty() {
            continue;
        }
        match parse_row(line, fields) {
            Ok(record) => import.records.push(record),
            Err(e) => {
                log::warn!("{}", e);
                import.rejected += 1;
            }
        }
    }
    Ok(import)
}

fn parse_row(line: usize, fields: Vec<String>) -> Result<DetectionRecord> {
    if fields.len() != HEADER.len() {
        return Err(TimelineError::MalformedRecord {
            line,
            reason: format!("expected {} columns, found {}", HEADER.len(), fields.len()),
        });
    }
    let mut fields = fields.into_iter();
    let class_name = fields.next().unwrap_or_default();
    let timestamp = fields.next().unwrap_or_default();
    let frame = fields.next().unwrap_or_default();

    if class_name.trim().is_empty() {
        return Err(TimelineError::MalformedRecord {
            line,
            reason: "empty class".to_string(),
        });
    }
    let frame_index: u64 = frame.trim().parse().map_err(|_| TimelineError::MalformedRecord {
        line,
        reason: format!("frame '{}' is not a non-negative integer", frame),
    })?;
    let mut numbers = [0.0f64; 5];
    for (slot, (value, column)) in numbers.iter_mut().zip(fields.zip(&HEADER[3..])) {
        *slot = value.trim().parse().map_err(|_| TimelineError::MalformedRecord {
            line,
            reason: format!("{} '{}' is not a number", column, value),
        })?;
    }

    Ok(DetectionRecord::from_parts(
        None,
        class_name,
        timestamp,
        frame_index,
        BoundingBox::new(numbers[0], numbers[1], numbers[2], numbers[3]),
        numbers[4],
    ))
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Split CSV text into rows of fields, tagged with the 1-based line each row
/// starts on. Quoted fields may span lines.
fn split_rows(text: &str) -> Vec<(usize, Vec<String>)> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
                rows.push((row_start, std::mem::take(&mut fields)));
                line += 1;
                row_start = line;
            }
            '\n' => {
                field.push(c);
                line += 1;
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        rows.push((row_start, fields));
    }
    rows
}
