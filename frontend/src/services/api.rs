use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use shared::{
    ApiMessage, AttendanceRecord, AttendanceSubmission, ClassFilter, FeeMap, Student, StudentForm,
    UpdateFeesRequest,
};
use tracing::{debug, warn};

use crate::config::AdminConfig;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Failures talking to the tuition API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection, timeout, ...)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The API answered with a non-success status
    #[error("Server error {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid API base URL {0}")]
    InvalidBaseUrl(String),
    #[error("'{0}' is not a usable student id")]
    InvalidStudentId(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::InvalidBaseUrl(_) | ApiError::InvalidStudentId(_) => None,
        }
    }
}

/// API client for the tuition center backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a new API client with the default base URL
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new API client with a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Create a client using the configured base URL and request timeout
    pub fn from_config(config: &AdminConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/api/students/<id>/<tail..>` with the id encoded as a single path segment
    fn student_url(&self, id: &str, tail: &[&str]) -> Result<Url, ApiError> {
        // dot segments would be dropped or resolved, addressing another resource
        if matches!(id, "" | "." | "..") {
            return Err(ApiError::InvalidStudentId(id.to_string()));
        }
        let mut url = Url::parse(&self.base_url).map_err(|_| ApiError::InvalidBaseUrl(self.base_url.clone()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["api", "students"])
            .push(id)
            .extend(tail);
        Ok(url)
    }

    /// GET /api/students
    pub async fn list_students(&self) -> Result<Vec<Student>, ApiError> {
        let url = self.url("/api/students");
        debug!("GET {}", url);
        self.fetch_json(self.http.get(url)).await
    }

    /// GET /api/students/by-class?class=<filter>
    pub async fn list_students_by_class(&self, filter: ClassFilter) -> Result<Vec<Student>, ApiError> {
        let url = self.url("/api/students/by-class");
        debug!("GET {} class={}", url, filter);
        self.fetch_json(self.http.get(url).query(&[("class", filter.query_value())]))
            .await
    }

    /// GET /api/students/:id
    pub async fn get_student(&self, id: &str) -> Result<Student, ApiError> {
        let url = self.student_url(id, &[])?;
        debug!("GET {}", url);
        self.fetch_json(self.http.get(url)).await
    }

    /// POST /api/students
    pub async fn create_student(&self, form: &StudentForm) -> Result<Student, ApiError> {
        let url = self.url("/api/students");
        debug!("POST {}", url);
        self.fetch_json(self.http.post(url).json(form)).await
    }

    /// PUT /api/students/:id
    pub async fn update_student(&self, id: &str, form: &StudentForm) -> Result<Student, ApiError> {
        let url = self.student_url(id, &[])?;
        debug!("PUT {}", url);
        self.fetch_json(self.http.put(url).json(form)).await
    }

    /// DELETE /api/students/:id
    pub async fn delete_student(&self, id: &str) -> Result<ApiMessage, ApiError> {
        let url = self.student_url(id, &[])?;
        debug!("DELETE {}", url);
        self.confirm(self.http.delete(url)).await
    }

    /// GET /api/students/attendance-records
    pub async fn list_attendance_records(&self) -> Result<Vec<AttendanceRecord>, ApiError> {
        let url = self.url("/api/students/attendance-records");
        debug!("GET {}", url);
        self.fetch_json(self.http.get(url)).await
    }

    /// POST /api/students/attendance, for a full roster or a single cell
    pub async fn submit_attendance(&self, submission: &AttendanceSubmission) -> Result<ApiMessage, ApiError> {
        let url = self.url("/api/students/attendance");
        debug!(
            "POST {} date={} marks={}",
            url,
            submission.date,
            submission.attendance.len()
        );
        self.confirm(self.http.post(url).json(submission)).await
    }

    /// GET /api/students/fees
    pub async fn list_fee_students(&self) -> Result<Vec<Student>, ApiError> {
        let url = self.url("/api/students/fees");
        debug!("GET {}", url);
        self.fetch_json(self.http.get(url)).await
    }

    /// PUT /api/students/:id/fees
    pub async fn update_fees(&self, id: &str, fees: &FeeMap) -> Result<ApiMessage, ApiError> {
        let url = self.student_url(id, &["fees"])?;
        debug!("PUT {}", url);
        let body = UpdateFeesRequest { fees: fees.clone() };
        self.confirm(self.http.put(url).json(&body)).await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::checked(request.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request whose body, if any, is only a confirmation message
    async fn confirm(&self, request: RequestBuilder) -> Result<ApiMessage, ApiError> {
        let response = Self::checked(request.send().await?).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(ApiMessage::default());
        }
        Ok(serde_json::from_str(&text).unwrap_or(ApiMessage { message: Some(text) }))
    }

    /// Turn a non-success response into `ApiError::Rejected`, preferring the
    /// `message` field of a JSON error body
    async fn checked(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&text)
            .ok()
            .and_then(|body| body.message)
            .or_else(|| Some(text.trim().to_string()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

        warn!("API rejected request with {}: {}", status, message);
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}
