use chrono::Utc;
use shared::Student;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};

use crate::domain::calendar::FeeCalendar;
use crate::domain::fee_service::{FeeGrid, FeeSaveOutcome, FeeSaveReport};
use crate::services::api::ApiClient;
use crate::state::{current, try_replace, DeskError};

/// Fee screen state: the grid snapshot and the client that saves it
pub struct FeeDesk {
    api: ApiClient,
    grid: RwLock<Arc<FeeGrid>>,
}

impl FeeDesk {
    pub async fn load(api: ApiClient, calendar: &FeeCalendar) -> Result<Self, DeskError> {
        let students = api.list_fee_students().await.map_err(|e| {
            error!("Failed to fetch students: {}", e);
            e
        })?;
        info!("Loaded fees for {} students", students.len());
        Ok(Self::from_parts(api, calendar, students))
    }

    pub fn from_parts(api: ApiClient, calendar: &FeeCalendar, students: Vec<Student>) -> Self {
        Self {
            api,
            grid: RwLock::new(Arc::new(FeeGrid::new(calendar, students))),
        }
    }

    pub fn grid(&self) -> Arc<FeeGrid> {
        current(&self.grid)
    }

    /// Flip one cell locally; nothing is sent until `save`
    pub fn toggle(&self, student_id: &str, period_key: &str) -> Result<Arc<FeeGrid>, DeskError> {
        let now = Utc::now();
        try_replace(&self.grid, |grid| grid.toggle(student_id, period_key, now)).map_err(DeskError::from)
    }

    /// Save every student's fees concurrently, one request each.
    ///
    /// Failures do not stop or roll back the other saves; the report names
    /// each student whose save failed.
    pub async fn save(&self) -> FeeSaveReport {
        let grid = self.grid();
        let handles: Vec<_> = grid
            .students()
            .iter()
            .map(|student| {
                let api = self.api.clone();
                let student_id = student.id.clone();
                let fees = student.fees.clone();
                let handle = tokio::spawn(async move { api.update_fees(&student_id, &fees).await });
                (student.id.clone(), student.name.clone(), handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (student_id, student_name, handle) in handles {
            let result = match handle.await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(join_error) => Err(format!("Save task failed: {}", join_error)),
            };
            if let Err(message) = &result {
                warn!("Failed to save fees for {} ({}): {}", student_name, student_id, message);
            }
            outcomes.push(FeeSaveOutcome {
                student_id,
                student_name,
                result,
            });
        }

        let report = FeeSaveReport { outcomes };
        if report.all_succeeded() {
            info!("Saved fees for {} students", report.saved_count());
        } else {
            error!(
                "Saved fees for {} of {} students",
                report.saved_count(),
                report.outcomes.len()
            );
        }
        report
    }
}
