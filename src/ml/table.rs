//! CSV feature tables with a reserved binary label column

use csv::StringRecord;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};

use super::{MlError, LABEL_COLUMN};

/// A tabular feature set read from CSV: rows are complex instances, columns
/// are named numeric features plus the reserved `Class` label column.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    path: PathBuf,
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl FeatureTable {
    /// Read a feature table from a CSV file with a header row
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, MlError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record?);
        }

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            headers,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Look up a column, failing with the column and file name
    pub fn require_column(&self, name: &str) -> Result<usize, MlError> {
        self.column_index(name)
            .ok_or_else(|| MlError::MissingColumn {
                column: name.to_string(),
                file: self.path.clone(),
            })
    }

    /// Shuffle the rows in place
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.records.shuffle(rng);
    }

    /// Names of the columns whose every value parses as a number, with the
    /// label column excluded. Order follows the header row.
    pub fn numeric_feature_columns(&self) -> Vec<String> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() != LABEL_COLUMN)
            .filter(|(idx, _)| {
                self.records
                    .iter()
                    .all(|r| r.get(*idx).map_or(false, |v| v.trim().parse::<f64>().is_ok()))
            })
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Read the binary labels from the `Class` column
    pub fn labels(&self) -> Result<Vec<u8>, MlError> {
        let idx = self.require_column(LABEL_COLUMN)?;
        self.records
            .iter()
            .map(|r| {
                let raw = r.get(idx).unwrap_or("").trim();
                match raw.parse::<f64>() {
                    Ok(v) if v == 0.0 => Ok(0),
                    Ok(v) if v == 1.0 => Ok(1),
                    _ => Err(MlError::InvalidLabel(raw.to_string())),
                }
            })
            .collect()
    }

    /// Extract the feature matrix for the given columns, in the given order.
    ///
    /// Fails with [`MlError::MissingColumn`] before reading any value when a
    /// column is absent, and with [`MlError::NonNumeric`] on unparsable
    /// cells. Values are `f32`, the precision the boosted-tree library
    /// works in.
    pub fn feature_matrix(&self, columns: &[String]) -> Result<Vec<Vec<f32>>, MlError> {
        let indices: Vec<usize> = columns
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<_, _>>()?;

        let mut matrix = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let mut row = Vec::with_capacity(indices.len());
            for (&idx, name) in indices.iter().zip(columns.iter()) {
                let raw = record.get(idx).unwrap_or("").trim();
                let value = raw.parse::<f32>().map_err(|_| MlError::NonNumeric {
                    column: name.clone(),
                    value: raw.to_string(),
                })?;
                row.push(value);
            }
            matrix.push(row);
        }

        Ok(matrix)
    }

    /// Write the table to CSV with extra columns appended on the right
    pub fn write_augmented<P: AsRef<Path>>(
        &self,
        path: P,
        extra: &[(&str, Vec<String>)],
    ) -> Result<(), MlError> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header: Vec<&str> = self.headers.iter().map(|h| h.as_str()).collect();
        for (name, _) in extra {
            header.push(name);
        }
        writer.write_record(&header)?;

        for (row_idx, record) in self.records.iter().enumerate() {
            let mut fields: Vec<&str> = record.iter().collect();
            for (_, values) in extra {
                fields.push(&values[row_idx]);
            }
            writer.write_record(&fields)?;
        }

        writer.flush()?;
        Ok(())
    }
}
