use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::RecordError;
use crate::geometry::Rect;

/// Header names of the columns a detection table must provide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub file_name: String,
    pub area: String,
    pub segmentation_number: String,
    pub x_min: String,
    pub y_min: String,
    pub x_max: String,
    pub y_max: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            file_name: "File Name".into(),
            area: "Area".into(),
            segmentation_number: "Segmentation Number".into(),
            x_min: "x_min".into(),
            y_min: "y_min".into(),
            x_max: "x_max".into(),
            y_max: "y_max".into(),
        }
    }
}

/// One detected region read from a results table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRow {
    /// 1-based line number in the source file
    pub line: usize,
    /// Raw cell value, compared verbatim against image keys
    pub file_name: String,
    /// NaN when the cell is empty
    pub area: f64,
    /// `None` when the cell is empty
    pub segmentation_number: Option<i64>,
    pub rect: Rect,
    /// Every other column, as `(header, value)`
    pub extra: Vec<(String, String)>,
}

impl DetectionRow {
    pub fn extra_value(&self, header: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, value)| value.as_str())
    }
}

/// Resolved header positions for a [`ColumnMap`]
struct ColumnIndex {
    file_name: usize,
    area: usize,
    segmentation_number: usize,
    coords: [(usize, String); 4],
}

impl ColumnIndex {
    fn resolve(header: &[String], columns: &ColumnMap, path: &Path) -> Result<Self, RecordError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| RecordError::MissingColumn {
                    column: name.to_string(),
                    path: path.to_path_buf(),
                })
        };

        Ok(Self {
            file_name: find(&columns.file_name)?,
            area: find(&columns.area)?,
            segmentation_number: find(&columns.segmentation_number)?,
            coords: [
                (find(&columns.x_min)?, columns.x_min.clone()),
                (find(&columns.y_min)?, columns.y_min.clone()),
                (find(&columns.x_max)?, columns.x_max.clone()),
                (find(&columns.y_max)?, columns.y_max.clone()),
            ],
        })
    }

    fn is_known(&self, i: usize) -> bool {
        i == self.file_name
            || i == self.area
            || i == self.segmentation_number
            || self.coords.iter().any(|(c, _)| *c == i)
    }
}

/// All rows of a single model's results file, in file order.
#[derive(Debug, Clone, Default)]
pub struct DetectionTable {
    path: PathBuf,
    header: Vec<String>,
    rows: Vec<DetectionRow>,
}

impl DetectionTable {
    /// Load a comma-separated results file
    pub fn load<P: AsRef<Path>>(path: P, columns: &ColumnMap) -> Result<Self, RecordError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(BufReader::new(file), path, columns)
    }

    /// Parse a table from any reader. `source` is only used in errors.
    pub fn parse<R: BufRead>(
        reader: R,
        source: &Path,
        columns: &ColumnMap,
    ) -> Result<Self, RecordError> {
        let io_err = |e| RecordError::Io {
            path: source.to_path_buf(),
            source: e,
        };

        let mut lines = reader.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line.map_err(io_err)?;
                    let line = line.trim_start_matches('\u{feff}');
                    if !line.trim().is_empty() {
                        break split_record(line);
                    }
                }
                None => {
                    return Err(RecordError::EmptyFile {
                        path: source.to_path_buf(),
                    });
                }
            }
        };

        let index = ColumnIndex::resolve(&header, columns, source)?;
        let mut rows = Vec::new();

        for (line_idx, line) in lines {
            let line = line.map_err(io_err)?;
            let line_num = line_idx + 1;

            if line.trim().is_empty() {
                continue;
            }

            let fields = split_record(&line);
            if fields.len() != header.len() {
                warn!(
                    "Skipping line {} of {:?}: expected {} fields, found {}",
                    line_num,
                    source,
                    header.len(),
                    fields.len()
                );
                continue;
            }

            rows.push(build_row(line_num, &header, fields, &index)?);
        }

        debug!("Loaded {} rows from {:?}", rows.len(), source);

        Ok(Self {
            path: source.to_path_buf(),
            header,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[DetectionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn build_row(
    line: usize,
    header: &[String],
    fields: Vec<String>,
    index: &ColumnIndex,
) -> Result<DetectionRow, RecordError> {
    let invalid = |i: usize| RecordError::InvalidNumber {
        line,
        column: header[i].clone(),
        value: fields[i].clone(),
    };

    let mut coords = [0.0; 4];
    for (slot, (i, name)) in coords.iter_mut().zip(index.coords.iter()) {
        *slot = fields[*i]
            .trim()
            .parse::<f64>()
            .map_err(|_| RecordError::MalformedBox {
                line,
                column: name.clone(),
                value: fields[*i].clone(),
            })?;
    }

    // Dataframe exports write missing values as empty cells
    let area_cell = fields[index.area].trim();
    let area = if area_cell.is_empty() {
        f64::NAN
    } else {
        area_cell.parse::<f64>().map_err(|_| invalid(index.area))?
    };

    let segment_cell = &fields[index.segmentation_number];
    let segmentation_number = if segment_cell.trim().is_empty() {
        None
    } else {
        Some(parse_integer(segment_cell).ok_or_else(|| invalid(index.segmentation_number))?)
    };

    if area.is_nan() || segmentation_number.is_none() {
        debug!("Line {}: missing area or segmentation number", line);
    }

    let extra = header
        .iter()
        .zip(fields.iter())
        .enumerate()
        .filter(|(i, _)| !index.is_known(*i))
        .map(|(_, (h, v))| (h.clone(), v.clone()))
        .collect();

    Ok(DetectionRow {
        line,
        file_name: fields[index.file_name].clone(),
        area,
        segmentation_number,
        rect: Rect::from(coords),
        extra,
    })
}

/// Integers written by dataframe exports sometimes carry a `.0` suffix.
fn parse_integer(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

/// Split one CSV line. Double-quoted fields may contain commas and `""`
/// escapes; quotes spanning several lines are not supported.
fn split_record(line: &str) -> Vec<String> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
