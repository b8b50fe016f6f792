use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::table::{ColumnMap, DetectionRow, DetectionTable};
use crate::error::RecordError;

/// Which rows of an image's table to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstanceFilter {
    /// Every region with a positive area
    #[default]
    AnyPositiveArea,
    /// Only the region with this segmentation number
    Segment(i64),
}

impl InstanceFilter {
    /// `-1` means "no particular instance".
    pub fn from_instance(instance: i64) -> Self {
        if instance == -1 {
            Self::AnyPositiveArea
        } else {
            Self::Segment(instance)
        }
    }

    /// Rows with a missing area or segmentation number never match.
    pub fn matches(&self, row: &DetectionRow) -> bool {
        match self {
            Self::AnyPositiveArea => row.area > 0.0,
            Self::Segment(n) => row.segmentation_number == Some(*n),
        }
    }
}

/// Key used to match an image against the `File Name` column: the file
/// name with everything from the first `.` removed.
pub fn image_key<P: AsRef<Path>>(image_path: P) -> String {
    let name = image_path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}

/// Detection tables of every model found under a results folder.
///
/// The folder holds one sub-directory per model, each with the same
/// results file name inside.
#[derive(Debug, Clone, Default)]
pub struct ResultsStore {
    root: PathBuf,
    tables: BTreeMap<String, DetectionTable>,
}

impl ResultsStore {
    pub const DEFAULT_CSV_NAME: &'static str = "detected_regions_on_all_images.csv";

    /// Read `<dir>/<model>/<csv_name>` for every model sub-directory
    pub fn load<P: AsRef<Path>>(
        dir: P,
        csv_name: &str,
        columns: &ColumnMap,
    ) -> Result<Self, RecordError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(RecordError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }

        let io_err = |source| RecordError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut model_dirs = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_dir() {
                model_dirs.push(path);
            }
        }
        model_dirs.sort();

        let mut store = Self {
            root: dir.to_path_buf(),
            tables: BTreeMap::new(),
        };

        for model_dir in model_dirs {
            let csv_path = model_dir.join(csv_name);
            if !csv_path.is_file() {
                warn!("No {} in {:?}, skipping", csv_name, model_dir);
                continue;
            }

            let model = model_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let table = DetectionTable::load(&csv_path, columns)?;
            debug!("Model '{}': {} rows", model, table.len());
            store.tables.insert(model, table);
        }

        info!(
            "Loaded {} model tables from {:?}",
            store.tables.len(),
            dir
        );
        Ok(store)
    }

    pub fn from_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = (S, DetectionTable)>,
        S: Into<String>,
    {
        Self {
            root: PathBuf::new(),
            tables: tables.into_iter().map(|(m, t)| (m.into(), t)).collect(),
        }
    }

    pub fn insert<S: Into<String>>(&mut self, model: S, table: DetectionTable) {
        self.tables.insert(model.into(), table);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Model names in sorted order
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn table(&self, model: &str) -> Option<&DetectionTable> {
        self.tables.get(model)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Rows belonging to one image, per requested model.
    ///
    /// Models are returned in the order requested; an empty `models` slice
    /// selects every model in the store. Unknown models are skipped.
    pub fn filter_for_image<P, S>(
        &self,
        image_path: P,
        models: &[S],
        filter: InstanceFilter,
    ) -> Vec<(String, Vec<&DetectionRow>)>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let key = image_key(image_path);

        let selected: Vec<&str> = if models.is_empty() {
            self.models().collect()
        } else {
            models.iter().map(|m| m.as_ref()).collect()
        };

        let mut result = Vec::with_capacity(selected.len());
        for model in selected {
            let Some(table) = self.tables.get(model) else {
                debug!("Model '{}' not in results store", model);
                continue;
            };

            let rows: Vec<&DetectionRow> = table
                .rows()
                .iter()
                .filter(|row| row.file_name == key && filter.matches(row))
                .collect();

            debug!(
                "Model '{}': {} rows for image '{}' ({:?})",
                model,
                rows.len(),
                key,
                filter
            );
            result.push((model.to_string(), rows));
        }

        result
    }
}
