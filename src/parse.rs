use std::{
    collections::{HashMap, HashSet},
    fs::File,
    path::Path,
};

use csv::StringRecord;
use log::{debug, info};

use crate::{
    dataset::{Column, ColumnType, Dataset, Value},
    error::ParseError,
};

/// Cell contents read as missing values.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Read a comma separated file with a header row into a [`Dataset`].
///
/// Any malformed record (wrong number of fields, invalid UTF-8) fails the
/// whole read.  Column types are inferred from the full column: integer if
/// every non-missing cell is an `i64`, float if every one is an `f64`, text
/// otherwise.
pub fn read_csv(path: &Path) -> Result<Dataset, ParseError> {
    let file = File::open(path).map_err(|e| ParseError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(false)
        .from_reader(file);

    let header = rdr
        .headers()
        .map_err(|e| map_csv_error(path, e))?
        .clone();
    if header.is_empty() {
        return Err(ParseError::MissingHeader {
            path: path.to_path_buf(),
        });
    }
    let names = column_names(&header);

    let mut records: Vec<StringRecord> = Vec::new();
    for record in rdr.records() {
        records.push(record.map_err(|e| map_csv_error(path, e))?);
    }
    debug!("{} records in {}", records.len(), path.display());

    let kinds: Vec<ColumnType> = (0..names.len())
        .map(|j| infer_type(records.iter().map(|r| &r[j])))
        .collect();
    let rows: Vec<Vec<Value>> = records
        .iter()
        .map(|r| {
            r.iter()
                .zip(kinds.iter())
                .map(|(cell, kind)| to_value(cell, *kind))
                .collect()
        })
        .collect();
    let columns: Vec<Column> = names
        .into_iter()
        .zip(kinds)
        .map(|(name, kind)| Column { name, kind })
        .collect();

    info!(
        "parsed {} rows x {} columns from {}",
        rows.len(),
        columns.len(),
        path.display()
    );
    Ok(Dataset::from_parts(columns, rows))
}

fn map_csv_error(path: &Path, e: csv::Error) -> ParseError {
    let line_of = |pos: &Option<csv::Position>| pos.as_ref().map(|p| p.line()).unwrap_or(0);
    let specific = match e.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => Some(ParseError::RaggedRow {
            path: path.to_path_buf(),
            line: line_of(pos),
            expected: *expected_len,
            found: *len,
        }),
        csv::ErrorKind::Utf8 { pos, .. } => Some(ParseError::Encoding {
            path: path.to_path_buf(),
            line: line_of(pos),
        }),
        _ => None,
    };
    match specific {
        Some(err) => err,
        None => ParseError::Csv {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

/// Header names as written, except that empty names become `Unnamed: <i>`
/// and repeats get a `.1`, `.2`, ... suffix.
fn column_names(header: &StringRecord) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut repeats: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(header.len());
    for (i, raw) in header.iter().enumerate() {
        let raw = if i == 0 { raw.trim_start_matches('\u{feff}') } else { raw };
        let base = if raw.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            raw.to_string()
        };
        let mut name = base.clone();
        while seen.contains(&name) {
            let n = repeats.entry(base.clone()).or_insert(0);
            *n += 1;
            name = format!("{}.{}", base, n);
        }
        seen.insert(name.clone());
        names.push(name);
    }
    names
}

fn is_na(cell: &str) -> bool {
    NA_VALUES.contains(&cell)
}

fn infer_type<'a, I>(cells: I) -> ColumnType
where
    I: Iterator<Item = &'a str>,
{
    let mut kind: Option<ColumnType> = None;
    for cell in cells.filter(|c| !is_na(c)) {
        let cell = cell.trim();
        let this = if cell.parse::<i64>().is_ok() {
            ColumnType::Integer
        } else if cell.parse::<f64>().is_ok() {
            ColumnType::Float
        } else {
            return ColumnType::Text;
        };
        kind = match (kind, this) {
            (None, t) => Some(t),
            (Some(ColumnType::Integer), ColumnType::Integer) => Some(ColumnType::Integer),
            _ => Some(ColumnType::Float),
        };
    }
    kind.unwrap_or(ColumnType::Text)
}

/// Convert a cell of a column whose type was already inferred.
fn to_value(cell: &str, kind: ColumnType) -> Value {
    if is_na(cell) {
        return Value::Null;
    }
    match kind {
        ColumnType::Integer => cell
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(cell.to_string())),
        ColumnType::Float => cell
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::Text(cell.to_string())),
        ColumnType::Text => Value::Text(cell.to_string()),
    }
}
