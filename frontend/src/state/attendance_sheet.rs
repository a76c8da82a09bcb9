use shared::{AttendanceMark, AttendanceStatus, AttendanceSubmission, Student};

use crate::state::DeskError;

/// The daily marking form: one status per roster student for a single date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceSheet {
    date: String,
    marks: Vec<AttendanceMark>,
}

impl AttendanceSheet {
    /// Every student starts out present
    pub fn for_roster(students: &[Student], date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            marks: students
                .iter()
                .map(|student| AttendanceMark {
                    student_id: student.id.clone(),
                    status: AttendanceStatus::Present,
                })
                .collect(),
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn marks(&self) -> &[AttendanceMark] {
        &self.marks
    }

    pub fn status_of(&self, student_id: &str) -> Option<AttendanceStatus> {
        self.marks
            .iter()
            .find(|mark| mark.student_id == student_id)
            .map(|mark| mark.status)
    }

    pub fn with_date(&self, date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            marks: self.marks.clone(),
        }
    }

    pub fn with_status(&self, student_id: &str, status: AttendanceStatus) -> Result<Self, DeskError> {
        let mut marks = self.marks.clone();
        let mark = marks
            .iter_mut()
            .find(|mark| mark.student_id == student_id)
            .ok_or_else(|| DeskError::UnknownStudent(student_id.to_string()))?;
        mark.status = status;
        Ok(Self {
            date: self.date.clone(),
            marks,
        })
    }

    pub fn to_submission(&self) -> AttendanceSubmission {
        AttendanceSubmission {
            date: self.date.clone(),
            attendance: self.marks.clone(),
        }
    }
}
