//! Attendance screen state: the roster, the record snapshot, and in-flight
//! cell edits.

use shared::{AttendanceRecord, AttendanceStatus, AttendanceSubmission, Student};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{error, info};

use crate::domain::attendance_matrix::{AttendanceMatrix, AttendanceStats, CellStatus, DateRange};
use crate::domain::export_service::{ExportOutcome, ExportService};
use crate::services::api::ApiClient;
use crate::state::attendance_sheet::AttendanceSheet;
use crate::state::{current, replace, DeskError};

/// One student's line in the history table
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub student_id: String,
    pub name: String,
    pub phone: String,
    pub cells: Vec<CellStatus>,
    pub stats: AttendanceStats,
}

/// History table: the visible date columns and a row per roster student
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceHistory {
    pub dates: Vec<String>,
    pub rows: Vec<HistoryRow>,
}

type CellKey = (String, String);

/// Marks a cell as having an edit in flight until dropped
struct CellGuard<'a> {
    in_flight: &'a Mutex<HashSet<CellKey>>,
    key: CellKey,
}

impl<'a> CellGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<CellKey>>, student_id: &str, date: &str) -> Result<Self, DeskError> {
        let key = (student_id.to_string(), date.to_string());
        let mut cells = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !cells.insert(key.clone()) {
            return Err(DeskError::CellBusy {
                student_id: student_id.to_string(),
                date: date.to_string(),
            });
        }
        drop(cells);
        Ok(Self { in_flight, key })
    }
}

impl Drop for CellGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

pub struct AttendanceDesk {
    api: ApiClient,
    students: RwLock<Arc<Vec<Student>>>,
    matrix: RwLock<Arc<AttendanceMatrix>>,
    in_flight: Mutex<HashSet<CellKey>>,
}

impl AttendanceDesk {
    /// Fetch the roster and all attendance records together
    pub async fn load(api: ApiClient) -> Result<Self, DeskError> {
        let (students, records) = tokio::try_join!(api.list_students(), api.list_attendance_records())
            .map_err(|e| {
                error!("Failed to fetch students or attendance records: {}", e);
                e
            })?;
        info!(
            "Loaded {} students and {} attendance records",
            students.len(),
            records.len()
        );
        Ok(Self::from_parts(api, students, records))
    }

    pub fn from_parts(api: ApiClient, students: Vec<Student>, records: Vec<AttendanceRecord>) -> Self {
        Self {
            api,
            students: RwLock::new(Arc::new(students)),
            matrix: RwLock::new(Arc::new(AttendanceMatrix::new(records))),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn students(&self) -> Arc<Vec<Student>> {
        current(&self.students)
    }

    pub fn matrix(&self) -> Arc<AttendanceMatrix> {
        current(&self.matrix)
    }

    /// A marking sheet for `date` with every current student present
    pub fn new_sheet(&self, date: impl Into<String>) -> AttendanceSheet {
        AttendanceSheet::for_roster(&self.students(), date)
    }

    /// Submit a full marking sheet and merge it into the record snapshot
    pub async fn submit_sheet(&self, sheet: &AttendanceSheet) -> Result<Arc<AttendanceMatrix>, DeskError> {
        let submission = sheet.to_submission();
        info!(
            "Submitting attendance for {} students on {}",
            submission.attendance.len(),
            submission.date
        );
        self.api.submit_attendance(&submission).await.map_err(|e| {
            error!("Failed to submit attendance for {}: {}", submission.date, e);
            e
        })?;
        Ok(replace(&self.matrix, |matrix| matrix.with_submission(&submission)))
    }

    /// Build the history table over the dates inside `range`
    pub fn history(&self, range: &DateRange) -> AttendanceHistory {
        let matrix = self.matrix();
        let dates = matrix.distinct_dates(range);
        let rows = self
            .students()
            .iter()
            .map(|student| HistoryRow {
                student_id: student.id.clone(),
                name: student.name.clone(),
                phone: student.phone.clone(),
                cells: matrix.row(&student.id, &dates),
                stats: matrix.stats_for(&student.id),
            })
            .collect();
        AttendanceHistory { dates, rows }
    }

    pub fn is_cell_busy(&self, student_id: &str, date: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(student_id.to_string(), date.to_string()))
    }

    /// Flip one history cell: submit a one-record batch, then merge it locally.
    ///
    /// Fails with `CellBusy` while a previous edit of the same cell is in
    /// flight. The snapshot is left alone when the API rejects the edit.
    pub async fn toggle_cell(&self, student_id: &str, date: &str) -> Result<AttendanceStatus, DeskError> {
        if !self.students().iter().any(|student| student.id == student_id) {
            return Err(DeskError::UnknownStudent(student_id.to_string()));
        }
        let _guard = CellGuard::acquire(&self.in_flight, student_id, date)?;

        let new_status = self.matrix().status_at(student_id, date).toggled();
        let record = AttendanceRecord::new(student_id, date, new_status);
        let submission = AttendanceSubmission::single(student_id, date, new_status);

        self.api.submit_attendance(&submission).await.map_err(|e| {
            error!("Failed to update attendance for {} on {}: {}", student_id, date, e);
            e
        })?;

        replace(&self.matrix, |matrix| matrix.with_record(record));
        info!("Marked {} {} on {}", student_id, new_status, date);
        Ok(new_status)
    }

    /// Write the history table inside `range` as `attendance.csv`
    pub fn export(
        &self,
        export_service: &ExportService,
        range: &DateRange,
        custom_path: Option<&Path>,
    ) -> anyhow::Result<ExportOutcome> {
        let matrix = self.matrix();
        let dates = matrix.distinct_dates(range);
        export_service.export_attendance(&self.students(), &matrix, &dates, custom_path)
    }
}
