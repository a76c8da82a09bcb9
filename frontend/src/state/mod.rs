//! Screen state held between API round trips.
//!
//! Each desk owns the data one screen fetched from the API as an immutable
//! snapshot behind an `Arc`. Readers clone the `Arc`; every change swaps in
//! a new snapshot, so a reader never observes a half-applied edit.

pub mod attendance_desk;
pub mod attendance_sheet;
pub mod fee_desk;
pub mod roster_desk;

use shared::StudentValidationError;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::fee_service::FeeGridError;
use crate::services::api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("An edit for student {student_id} on {date} is still in progress")]
    CellBusy { student_id: String, date: String },
    #[error("No student with id {0} on this screen")]
    UnknownStudent(String),
    #[error("{}", format_validation(.0))]
    Invalid(Vec<StudentValidationError>),
    #[error(transparent)]
    FeeGrid(#[from] FeeGridError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

fn format_validation(errors: &[StudentValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Latest value of a snapshot
pub(crate) fn current<T>(slot: &RwLock<Arc<T>>) -> Arc<T> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Replace a snapshot with one derived from the latest value
pub(crate) fn replace<T, F>(slot: &RwLock<Arc<T>>, derive: F) -> Arc<T>
where
    F: FnOnce(&T) -> T,
{
    let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
    let next = Arc::new(derive(guard.as_ref()));
    *guard = next.clone();
    next
}

/// Like `replace`, but the derivation may fail, leaving the snapshot as it was
pub(crate) fn try_replace<T, E, F>(slot: &RwLock<Arc<T>>, derive: F) -> Result<Arc<T>, E>
where
    F: FnOnce(&T) -> Result<T, E>,
{
    let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
    let next = Arc::new(derive(guard.as_ref())?);
    *guard = next.clone();
    Ok(next)
}
