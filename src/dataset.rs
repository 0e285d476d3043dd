//! Dataset metadata intake

use crate::value::Fields;

/// Registration payload for an uploaded dataset.
#[derive(Debug, Clone, Default)]
pub struct NewDataset {
    pub name: String,
    pub description: Option<String>,
    pub source_department: Option<String>,
    pub file_size_mb: Option<f64>,
    pub row_count: Option<i64>,
    pub column_count: Option<i64>,
    /// Quality score in `0.0..=1.0`
    pub data_quality_score: Option<f64>,
}

impl NewDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn from_department(mut self, department: impl Into<String>) -> Self {
        self.source_department = Some(department.into());
        self
    }

    pub fn with_shape(mut self, rows: i64, columns: i64) -> Self {
        self.row_count = Some(rows);
        self.column_count = Some(columns);
        self
    }

    pub fn with_size_mb(mut self, size: f64) -> Self {
        self.file_size_mb = Some(size);
        self
    }

    pub fn with_quality(mut self, score: f64) -> Self {
        self.data_quality_score = Some(score);
        self
    }

    pub fn into_fields(self) -> Fields {
        crate::fields! {
            "name" => self.name,
            "description" => self.description,
            "source_department" => self.source_department,
            "file_size_mb" => self.file_size_mb,
            "row_count" => self.row_count,
            "column_count" => self.column_count,
            "data_quality_score" => self.data_quality_score,
        }
    }
}
