//! Attendance matrix: student x date -> status.
//!
//! The history view and the CSV export both read attendance as a table with
//! one row per student and one column per date seen in the records. This
//! module turns the flat record list fetched from the API into that table:
//! the distinct (optionally range-filtered) dates, point lookups of a cell,
//! and per-student present/total statistics.
//!
//! A matrix is an immutable snapshot. Edits produce a new matrix through the
//! same merge rule the API applies: replace the record for (student, date)
//! if one exists, otherwise append.

use shared::{AttendanceRecord, AttendanceStatus, AttendanceSubmission};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// Rendered in place of a status when no record exists for a cell
pub const UNKNOWN_MARKER: &str = "-";

/// Content of a single matrix cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Marked(AttendanceStatus),
    Unknown,
}

impl CellStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellStatus::Marked(status) => status.as_str(),
            CellStatus::Unknown => UNKNOWN_MARKER,
        }
    }

    /// Status a click on this cell submits: unknown and absent become present
    pub fn toggled(&self) -> AttendanceStatus {
        match self {
            CellStatus::Marked(AttendanceStatus::Present) => AttendanceStatus::Absent,
            _ => AttendanceStatus::Present,
        }
    }
}

impl fmt::Display for CellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive bounds on ISO dates; a missing bound does not filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: Option<String>, end: Option<String>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: &str) -> bool {
        self.start.as_deref().map_or(true, |start| date >= start)
            && self.end.as_deref().map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    /// Present share rounded to one decimal; `None` when there are no records
    pub percentage: Option<f64>,
}

impl AttendanceStats {
    fn from_counts(total: usize, present: usize) -> Self {
        let percentage = if total == 0 {
            None
        } else {
            let raw = present as f64 / total as f64 * 100.0;
            Some((raw * 10.0).round() / 10.0)
        };
        Self {
            total,
            present,
            percentage,
        }
    }

    pub fn percentage_label(&self) -> String {
        match self.percentage {
            Some(percentage) => format!("{:.1}", percentage),
            None => "N/A".to_string(),
        }
    }
}

/// Unique dates across all records, ascending, limited to `range`
pub fn distinct_dates(records: &[AttendanceRecord], range: &DateRange) -> Vec<String> {
    records
        .iter()
        .map(|record| record.date.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|date| range.contains(date))
        .map(str::to_string)
        .collect()
}

/// Status of the first record matching the cell, or `Unknown`
pub fn status_at(records: &[AttendanceRecord], student_id: &str, date: &str) -> CellStatus {
    records
        .iter()
        .find(|record| record.is_for(student_id, date))
        .map(|record| CellStatus::Marked(record.status))
        .unwrap_or(CellStatus::Unknown)
}

pub fn per_student_stats(records: &[AttendanceRecord], student_id: &str) -> AttendanceStats {
    let (total, present) = records
        .iter()
        .filter(|record| record.student_id == student_id)
        .fold((0, 0), |(total, present), record| {
            let is_present = record.status == AttendanceStatus::Present;
            (total + 1, present + usize::from(is_present))
        });
    AttendanceStats::from_counts(total, present)
}

/// Replace the record for the same (student, date), or append it
pub fn merge_record(records: &[AttendanceRecord], record: AttendanceRecord) -> Vec<AttendanceRecord> {
    let mut merged = records.to_vec();
    match merged
        .iter_mut()
        .find(|existing| existing.is_for(&record.student_id, &record.date))
    {
        Some(existing) => existing.status = record.status,
        None => merged.push(record),
    }
    merged
}

/// Indexed snapshot of the attendance records
#[derive(Debug, Clone, Default)]
pub struct AttendanceMatrix {
    records: Vec<AttendanceRecord>,
    // student id -> date -> status
    index: HashMap<String, HashMap<String, AttendanceStatus>>,
}

impl AttendanceMatrix {
    pub fn new(records: Vec<AttendanceRecord>) -> Self {
        let mut index: HashMap<String, HashMap<String, AttendanceStatus>> = HashMap::new();
        for record in &records {
            let by_date = index.entry(record.student_id.clone()).or_default();
            if by_date.contains_key(&record.date) {
                debug!(
                    "Duplicate attendance record for {} on {}, keeping the first",
                    record.student_id, record.date
                );
                continue;
            }
            by_date.insert(record.date.clone(), record.status);
        }
        Self { records, index }
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn status_at(&self, student_id: &str, date: &str) -> CellStatus {
        self.index
            .get(student_id)
            .and_then(|by_date| by_date.get(date))
            .map(|status| CellStatus::Marked(*status))
            .unwrap_or(CellStatus::Unknown)
    }

    pub fn distinct_dates(&self, range: &DateRange) -> Vec<String> {
        distinct_dates(&self.records, range)
    }

    pub fn stats_for(&self, student_id: &str) -> AttendanceStats {
        per_student_stats(&self.records, student_id)
    }

    /// One student's cells for the given date columns
    pub fn row(&self, student_id: &str, dates: &[String]) -> Vec<CellStatus> {
        dates
            .iter()
            .map(|date| self.status_at(student_id, date))
            .collect()
    }

    /// New snapshot with `record` merged in
    pub fn with_record(&self, record: AttendanceRecord) -> AttendanceMatrix {
        AttendanceMatrix::new(merge_record(&self.records, record))
    }

    /// New snapshot with every mark of a submitted batch merged in.
    ///
    /// Same rule as `merge_record`, applied to the whole batch over one copy
    /// of the records.
    pub fn with_submission(&self, submission: &AttendanceSubmission) -> AttendanceMatrix {
        let mut merged = self.records.clone();
        // (student id, date) -> position of the first matching record
        let mut positions: HashMap<(String, String), usize> = HashMap::with_capacity(merged.len());
        for (position, record) in merged.iter().enumerate() {
            positions
                .entry((record.student_id.clone(), record.date.clone()))
                .or_insert(position);
        }

        for record in submission.records() {
            let key = (record.student_id.clone(), record.date.clone());
            match positions.get(&key) {
                Some(&position) => merged[position].status = record.status,
                None => {
                    positions.insert(key, merged.len());
                    merged.push(record);
                }
            }
        }
        AttendanceMatrix::new(merged)
    }
}
