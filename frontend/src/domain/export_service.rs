//! Attendance CSV export.
//!
//! Produces the same table as the history view: a `Name,Phone` header
//! followed by one column per date, then one row per student in roster
//! order. Name and phone are always double-quoted (embedded quotes doubled)
//! so commas in free text survive; statuses are written bare, with `-` for
//! cells that have no record.

use anyhow::{Context, Result};
use shared::{AttendanceRecord, Student};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::attendance_matrix::AttendanceMatrix;

pub const EXPORT_FILE_NAME: &str = "attendance.csv";

/// Quote a free-text field, doubling embedded quotes
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Render the attendance table for `students` over the `dates` columns
pub fn to_csv(students: &[Student], records: &[AttendanceRecord], dates: &[String]) -> String {
    render_csv(students, &AttendanceMatrix::new(records.to_vec()), dates)
}

fn render_csv(students: &[Student], matrix: &AttendanceMatrix, dates: &[String]) -> String {
    let mut csv_content = String::from("Name,Phone");
    for date in dates {
        csv_content.push(',');
        csv_content.push_str(date);
    }
    csv_content.push('\n');

    for student in students {
        csv_content.push_str(&quote_field(&student.name));
        csv_content.push(',');
        csv_content.push_str(&quote_field(&student.phone));
        for cell in matrix.row(&student.id, dates) {
            csv_content.push(',');
            csv_content.push_str(cell.as_str());
        }
        csv_content.push('\n');
    }

    csv_content
}

/// Result of writing an export file
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub file_path: PathBuf,
    pub student_count: usize,
    pub date_count: usize,
}

/// Export service that owns where attendance files are written
#[derive(Debug, Clone, Default)]
pub struct ExportService {
    export_dir: Option<PathBuf>,
}

impl ExportService {
    pub fn new(export_dir: Option<PathBuf>) -> Self {
        Self { export_dir }
    }

    /// Write `attendance.csv` into `custom_path` or the configured directory.
    ///
    /// A custom path naming a `.csv` file is used as the file itself.
    pub fn export_attendance(
        &self,
        students: &[Student],
        matrix: &AttendanceMatrix,
        dates: &[String],
        custom_path: Option<&Path>,
    ) -> Result<ExportOutcome> {
        let file_path = self.target_path(custom_path);
        info!(
            "Exporting attendance for {} students over {} dates to {}",
            students.len(),
            dates.len(),
            file_path.display()
        );

        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create export directory {}", parent.display()))?;
            }
        }

        let csv_content = render_csv(students, matrix, dates);
        fs::write(&file_path, csv_content)
            .with_context(|| format!("Failed to write {}", file_path.display()))?;

        info!("Wrote {}", file_path.display());
        Ok(ExportOutcome {
            file_path,
            student_count: students.len(),
            date_count: dates.len(),
        })
    }

    fn target_path(&self, custom_path: Option<&Path>) -> PathBuf {
        match custom_path {
            Some(path) if path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("csv")) => {
                path.to_path_buf()
            }
            Some(dir) => dir.join(EXPORT_FILE_NAME),
            None => self.export_dir().join(EXPORT_FILE_NAME),
        }
    }

    /// Configured directory, else Documents, else home, else the working directory
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::document_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
