//! Fee grid: roster rows against the billing periods of the fee calendar.
//!
//! Like the attendance matrix, a grid is a snapshot. Toggling a cell returns a
//! new grid; saving reports one outcome per student so a failed save can be
//! attributed instead of collapsing into a single flag.

use chrono::{DateTime, NaiveDate, Utc};
use shared::{ClassLabel, PaidAdvance, Student};
use tracing::info;

use crate::domain::calendar::{BillingPeriod, FeeCalendar};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FeeGridError {
    #[error("No student with id {0} in the fee grid")]
    UnknownStudent(String),
    #[error("{0} is not one of the billing periods shown")]
    UnknownPeriod(String),
}

/// One rendered row of the fee grid
#[derive(Debug, Clone, PartialEq)]
pub struct FeeRow {
    pub student_id: String,
    pub name: String,
    pub class_label: ClassLabel,
    pub date_of_joining: NaiveDate,
    pub phone: String,
    /// Rows for students who paid in advance are highlighted
    pub paid_advance: PaidAdvance,
    /// Paid flag per billing period, in calendar order
    pub paid: Vec<bool>,
}

/// Flip one period of a student's fees
pub fn toggle_fee(student: &Student, period_key: &str, now: DateTime<Utc>) -> Student {
    let mut updated = student.clone();
    let current = updated.fees.get(period_key).cloned().unwrap_or_default();
    updated
        .fees
        .insert(period_key.to_string(), current.toggled(now));
    updated
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeGrid {
    periods: Vec<BillingPeriod>,
    students: Vec<Student>,
}

impl FeeGrid {
    pub fn new(calendar: &FeeCalendar, students: Vec<Student>) -> Self {
        Self {
            periods: calendar.periods(),
            students,
        }
    }

    pub fn periods(&self) -> &[BillingPeriod] {
        &self.periods
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|student| student.id == student_id)
    }

    pub fn rows(&self) -> Vec<FeeRow> {
        self.students
            .iter()
            .map(|student| FeeRow {
                student_id: student.id.clone(),
                name: student.name.clone(),
                class_label: student.class_label,
                date_of_joining: student.date_of_joining,
                phone: student.phone.clone(),
                paid_advance: student.paid_advance,
                paid: self
                    .periods
                    .iter()
                    .map(|period| student.is_paid(&period.key))
                    .collect(),
            })
            .collect()
    }

    /// New grid with one cell flipped; `now` stamps a newly paid period
    pub fn toggle(&self, student_id: &str, period_key: &str, now: DateTime<Utc>) -> Result<FeeGrid, FeeGridError> {
        if !self.periods.iter().any(|period| period.key == period_key) {
            return Err(FeeGridError::UnknownPeriod(period_key.to_string()));
        }
        let position = self
            .students
            .iter()
            .position(|student| student.id == student_id)
            .ok_or_else(|| FeeGridError::UnknownStudent(student_id.to_string()))?;

        let mut students = self.students.clone();
        students[position] = toggle_fee(&self.students[position], period_key, now);
        info!(
            "Toggled {} for {}: paid = {}",
            period_key,
            students[position].name,
            students[position].is_paid(period_key)
        );

        Ok(FeeGrid {
            periods: self.periods.clone(),
            students,
        })
    }
}

/// Result of saving one student's fees
#[derive(Debug, Clone, PartialEq)]
pub struct FeeSaveOutcome {
    pub student_id: String,
    pub student_name: String,
    pub result: Result<(), String>,
}

/// Per-student results of a fee save, in roster order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeeSaveReport {
    pub outcomes: Vec<FeeSaveOutcome>,
}

impl FeeSaveReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn saved_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.result.is_ok()).count()
    }

    pub fn failures(&self) -> Vec<&FeeSaveOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .collect()
    }
}
