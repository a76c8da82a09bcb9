use shared::{ClassFilter, Student, StudentForm};
use std::sync::{Arc, RwLock};
use tracing::{error, info};

use crate::services::api::ApiClient;
use crate::state::{current, replace, DeskError};

/// Roster screen state: the students of one class group, or everyone
pub struct RosterDesk {
    api: ApiClient,
    filter: Option<ClassFilter>,
    students: RwLock<Arc<Vec<Student>>>,
}

impl RosterDesk {
    pub async fn load(api: ApiClient, filter: Option<ClassFilter>) -> Result<Self, DeskError> {
        let students = match filter {
            Some(filter) => api.list_students_by_class(filter).await,
            None => api.list_students().await,
        }
        .map_err(|e| {
            error!("Failed to fetch students: {}", e);
            e
        })?;
        info!("Loaded {} students (class filter: {:?})", students.len(), filter);
        Ok(Self {
            api,
            filter,
            students: RwLock::new(Arc::new(students)),
        })
    }

    /// A desk with an empty roster, for changes to one student that need no list
    pub fn detached(api: ApiClient, filter: Option<ClassFilter>) -> Self {
        Self {
            api,
            filter,
            students: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn filter(&self) -> Option<ClassFilter> {
        self.filter
    }

    pub fn students(&self) -> Arc<Vec<Student>> {
        current(&self.students)
    }

    pub async fn get(&self, student_id: &str) -> Result<Student, DeskError> {
        Ok(self.api.get_student(student_id).await?)
    }

    /// Validate and create a student; it joins the roster if it matches the filter
    pub async fn add(&self, form: &StudentForm) -> Result<Student, DeskError> {
        form.validate().map_err(DeskError::Invalid)?;
        let created = self.api.create_student(form).await.map_err(|e| {
            error!("Failed to add student {}: {}", form.name, e);
            e
        })?;
        info!("Added student {} ({})", created.name, created.id);

        if self.filter.map_or(true, |filter| filter.matches(created.class_label)) {
            let added = created.clone();
            replace(&self.students, |students| {
                let mut next = students.clone();
                next.push(added);
                next
            });
        }
        Ok(created)
    }

    /// Validate and save edits to an existing student
    pub async fn update(&self, student_id: &str, form: &StudentForm) -> Result<Student, DeskError> {
        form.validate().map_err(DeskError::Invalid)?;
        let updated = self.api.update_student(student_id, form).await.map_err(|e| {
            error!("Failed to update student {}: {}", student_id, e);
            e
        })?;
        info!("Updated student {} ({})", updated.name, updated.id);

        let filter = self.filter;
        let saved = updated.clone();
        replace(&self.students, |students| {
            students
                .iter()
                .filter_map(|student| {
                    if student.id != saved.id {
                        Some(student.clone())
                    } else if filter.map_or(true, |f| f.matches(saved.class_label)) {
                        Some(saved.clone())
                    } else {
                        None
                    }
                })
                .collect()
        });
        Ok(updated)
    }

    pub async fn delete(&self, student_id: &str) -> Result<(), DeskError> {
        self.api.delete_student(student_id).await.map_err(|e| {
            error!("Failed to delete student {}: {}", student_id, e);
            e
        })?;
        info!("Deleted student {}", student_id);
        replace(&self.students, |students| {
            students
                .iter()
                .filter(|student| student.id != student_id)
                .cloned()
                .collect()
        });
        Ok(())
    }
}
