#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::json;
use shared::{
    AttendanceRecord, AttendanceSubmission, ClassFilter, ClassLabel, FeeMap, PaidAdvance, Student,
    StudentForm, UpdateFeesRequest,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tuition_admin::services::api::ApiClient;

/// In-memory stand-in for the tuition API
#[derive(Default)]
pub struct FakeState {
    pub students: Vec<Student>,
    pub records: Vec<AttendanceRecord>,
    pub submissions: Vec<AttendanceSubmission>,
    pub class_queries: Vec<String>,
    pub fee_saves: Vec<String>,
    pub failing_fee_ids: HashSet<String>,
    pub reject_attendance: bool,
    pub fail_listing: bool,
    pub attendance_delay: Option<Duration>,
    pub created: usize,
}

pub type SharedState = Arc<Mutex<FakeState>>;

pub struct FakeApi {
    pub state: SharedState,
    pub client: ApiClient,
}

impl FakeApi {
    pub async fn start(students: Vec<Student>, records: Vec<AttendanceRecord>) -> Self {
        let state: SharedState = Arc::new(Mutex::new(FakeState {
            students,
            records,
            ..FakeState::default()
        }));

        let app = Router::new()
            .route("/api/students", get(list_students).post(create_student))
            .route("/api/students/by-class", get(students_by_class))
            .route("/api/students/attendance-records", get(attendance_records))
            .route("/api/students/attendance", post(submit_attendance))
            .route("/api/students/fees", get(list_students))
            .route(
                "/api/students/:id",
                get(get_student).put(update_student).delete(delete_student),
            )
            .route("/api/students/:id/fees", put(update_fees))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            client: ApiClient::with_base_url(format!("http://{}", addr)),
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

pub fn student(id: &str, name: &str, class_label: ClassLabel) -> Student {
    Student {
        id: id.to_string(),
        name: name.to_string(),
        class_label,
        date_of_joining: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        address: "12 Lake Road".to_string(),
        phone: "9876543210".to_string(),
        paid_advance: PaidAdvance::No,
        photo: None,
        fees: FeeMap::new(),
    }
}

pub fn valid_form(name: &str, class_label: ClassLabel) -> StudentForm {
    StudentForm {
        name: name.to_string(),
        class_label: Some(class_label),
        date_of_joining: Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()),
        address: "4 Hill View".to_string(),
        phone: "9123456780".to_string(),
        paid_advance: PaidAdvance::Yes,
        photo: None,
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Student not found" }))).into_response()
}

fn student_from_form(id: String, form: StudentForm, fees: FeeMap) -> Option<Student> {
    Some(Student {
        id,
        name: form.name,
        class_label: form.class_label?,
        date_of_joining: form.date_of_joining?,
        address: form.address,
        phone: form.phone,
        paid_advance: form.paid_advance,
        photo: form.photo,
        fees,
    })
}

async fn list_students(State(state): State<SharedState>) -> Response {
    let state = state.lock().unwrap();
    if state.fail_listing {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "Roster temporarily unavailable" })),
        )
            .into_response();
    }
    Json(state.students.clone()).into_response()
}

async fn students_by_class(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let raw = params.get("class").cloned().unwrap_or_default();
    let mut state = state.lock().unwrap();
    state.class_queries.push(raw.clone());
    match raw.parse::<ClassFilter>() {
        Ok(filter) => {
            let students: Vec<Student> = state
                .students
                .iter()
                .filter(|s| filter.matches(s.class_label))
                .cloned()
                .collect();
            Json(students).into_response()
        }
        Err(_) => (StatusCode::BAD_REQUEST, Json(json!({ "message": "Invalid class" }))).into_response(),
    }
}

async fn get_student(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let state = state.lock().unwrap();
    match state.students.iter().find(|s| s.id == id) {
        Some(student) => Json(student.clone()).into_response(),
        None => not_found(),
    }
}

async fn create_student(State(state): State<SharedState>, Json(form): Json<StudentForm>) -> Response {
    let mut state = state.lock().unwrap();
    state.created += 1;
    let id = format!("new{}", state.created);
    match student_from_form(id, form, FeeMap::new()) {
        Some(student) => {
            state.students.push(student.clone());
            (StatusCode::CREATED, Json(student)).into_response()
        }
        None => (StatusCode::BAD_REQUEST, Json(json!({ "message": "Missing fields" }))).into_response(),
    }
}

async fn update_student(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(form): Json<StudentForm>,
) -> Response {
    let mut state = state.lock().unwrap();
    let Some(existing) = state.students.iter_mut().find(|s| s.id == id) else {
        return not_found();
    };
    match student_from_form(id, form, existing.fees.clone()) {
        Some(updated) => {
            *existing = updated.clone();
            Json(updated).into_response()
        }
        None => (StatusCode::BAD_REQUEST, Json(json!({ "message": "Missing fields" }))).into_response(),
    }
}

async fn delete_student(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let mut state = state.lock().unwrap();
    let before = state.students.len();
    state.students.retain(|s| s.id != id);
    if state.students.len() == before {
        return not_found();
    }
    Json(json!({ "message": "Student deleted successfully" })).into_response()
}

async fn attendance_records(State(state): State<SharedState>) -> Json<Vec<AttendanceRecord>> {
    Json(state.lock().unwrap().records.clone())
}

async fn submit_attendance(
    State(state): State<SharedState>,
    Json(submission): Json<AttendanceSubmission>,
) -> Response {
    let (reject, delay) = {
        let state = state.lock().unwrap();
        (state.reject_attendance, state.attendance_delay)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if reject {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Database unavailable" })),
        )
            .into_response();
    }

    let mut state = state.lock().unwrap();
    for record in submission.records() {
        match state
            .records
            .iter_mut()
            .find(|r| r.is_for(&record.student_id, &record.date))
        {
            Some(existing) => existing.status = record.status,
            None => state.records.push(record),
        }
    }
    state.submissions.push(submission);
    Json(json!({ "message": "Attendance saved" })).into_response()
}

async fn update_fees(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateFeesRequest>,
) -> Response {
    let mut state = state.lock().unwrap();
    if state.failing_fee_ids.contains(&id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "fee ledger locked").into_response();
    }
    let Some(student) = state.students.iter_mut().find(|s| s.id == id) else {
        return not_found();
    };
    student.fees = body.fees;
    state.fee_saves.push(id);
    StatusCode::NO_CONTENT.into_response()
}
