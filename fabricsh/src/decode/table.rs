//! Tabular CLI output.

use indexmap::IndexMap;
use log::info;

use super::Record;
use crate::error::DecodeError;

/// Name of the mandatory index column.
const INDEX_COLUMN: &str = "#";

/// Largest `#` value accepted. The CLI numbers rows densely, so anything
/// past this is corrupt output rather than a real table.
pub const MAX_RECORDS: usize = 1 << 16;

/// A column: header and its character span. The last column runs to the
/// end of each row.
#[derive(Debug)]
struct Column {
    name: String,
    start: usize,
    end: Option<usize>,
}

fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    line.contains('|') && line.contains('-') && line.chars().all(|c| matches!(c, '-' | '|'))
}

/// Column spans from a separator line: every `|` closes a column.
fn columns(legend: &str, separator: &str) -> Vec<Column> {
    let separator = separator.trim_end();
    let width = separator.chars().count();

    let mut starts = vec![0];
    let mut ends = Vec::new();
    for (i, c) in separator.chars().enumerate() {
        if c == '|' {
            ends.push(i);
            starts.push(i + 1);
        }
    }
    // A trailing bar leaves an empty span after it.
    if starts.last() == Some(&width) {
        starts.pop();
    }

    let count = starts.len();
    starts
        .into_iter()
        .enumerate()
        .map(|(i, start)| {
            let end = if i + 1 < count { ends.get(i).copied() } else { None };
            Column {
                name: slice(legend, start, end),
                start,
                end,
            }
        })
        .collect()
}

/// Trimmed characters `[start, end)` of `line`.
fn slice(line: &str, start: usize, end: Option<usize>) -> String {
    let chars = line.chars().skip(start);
    let field: String = match end {
        Some(end) => chars.take(end.saturating_sub(start)).collect(),
        None => chars.collect(),
    };
    field.trim().to_string()
}

/// Decode a table into records ordered by their `#` column.
///
/// The result has as many entries as the largest index seen; indices that
/// never appear are left as empty records. An index above [`MAX_RECORDS`]
/// is rejected. Before the legend, blank lines
/// are skipped, lines containing `:` are logged, and a line reading
/// `None.` means the table is empty.
pub fn decode_table(text: &str) -> Result<Vec<Record>, DecodeError> {
    let lines: Vec<&str> = text.lines().collect();

    let mut legend = None;
    for (i, line) in lines.iter().enumerate() {
        if lines.get(i + 1).is_some_and(|next| is_separator(next)) {
            legend = Some(i);
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "None." {
            return Ok(Vec::new());
        }
        if trimmed.contains(':') {
            info!("{trimmed}");
            continue;
        }
        return Err(DecodeError::UnexpectedLine {
            line: trimmed.to_string(),
        });
    }
    let legend = legend.ok_or(DecodeError::MissingLegend)?;

    let columns = columns(lines[legend], lines[legend + 1]);
    if !columns.iter().any(|c| c.name == INDEX_COLUMN) {
        return Err(DecodeError::MissingIndexColumn);
    }

    let mut records: Vec<Record> = Vec::new();
    for row in &lines[legend + 2..] {
        if row.trim().is_empty() {
            continue;
        }
        let record: Record = columns
            .iter()
            .map(|c| (c.name.clone(), slice(row, c.start, c.end)))
            .collect();

        let value = record.get(INDEX_COLUMN).cloned().unwrap_or_default();
        let index = match value.parse::<usize>() {
            Ok(index) if (1..=MAX_RECORDS).contains(&index) => index,
            _ => return Err(DecodeError::BadIndex { value }),
        };
        if records.len() < index {
            records.resize_with(index, Record::new);
        }
        records[index - 1] = record;
    }

    Ok(records)
}

/// Decode `~ Title ~` sections, each holding one table.
///
/// Text before the first title is logged.
pub fn decode_tables(text: &str) -> Result<IndexMap<String, Vec<Record>>, DecodeError> {
    let mut sections: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        let title = trimmed
            .strip_prefix('~')
            .and_then(|rest| rest.strip_suffix('~'))
            .filter(|_| trimmed.len() >= 2);

        match (title, sections.last_mut()) {
            (Some(title), _) => sections.push((title.trim().to_string(), String::new())),
            (None, Some((_, body))) => {
                body.push_str(line);
                body.push('\n');
            }
            (None, None) if trimmed.is_empty() => {}
            (None, None) => info!("{trimmed}"),
        }
    }

    sections
        .into_iter()
        .map(|(title, body)| Ok((title, decode_table(&body)?)))
        .collect()
}
