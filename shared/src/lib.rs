use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Fee entries keyed by billing period key (e.g. "June2025")
pub type FeeMap = BTreeMap<String, FeeEntry>;

/// One of the ten classes taught at the center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassLabel {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 10] = [
        ClassLabel::One,
        ClassLabel::Two,
        ClassLabel::Three,
        ClassLabel::Four,
        ClassLabel::Five,
        ClassLabel::Six,
        ClassLabel::Seven,
        ClassLabel::Eight,
        ClassLabel::Nine,
        ClassLabel::Ten,
    ];

    /// Class number, 1 through 10
    pub fn number(&self) -> u8 {
        match self {
            ClassLabel::One => 1,
            ClassLabel::Two => 2,
            ClassLabel::Three => 3,
            ClassLabel::Four => 4,
            ClassLabel::Five => 5,
            ClassLabel::Six => 6,
            ClassLabel::Seven => 7,
            ClassLabel::Eight => 8,
            ClassLabel::Nine => 9,
            ClassLabel::Ten => 10,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    /// Wire value sent to the API
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::One => "1",
            ClassLabel::Two => "2",
            ClassLabel::Three => "3",
            ClassLabel::Four => "4",
            ClassLabel::Five => "5",
            ClassLabel::Six => "6",
            ClassLabel::Seven => "7",
            ClassLabel::Eight => "8",
            ClassLabel::Nine => "9",
            ClassLabel::Ten => "10",
        }
    }

    /// Label shown in forms: the primary classes carry a "Class" prefix
    pub fn display_label(&self) -> String {
        if self.is_primary() {
            format!("Class {}", self.number())
        } else {
            self.number().to_string()
        }
    }

    /// Classes 1-5 are grouped together on the dashboard
    pub fn is_primary(&self) -> bool {
        self.number() <= 5
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassLabel {
    type Err = ParseClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("Class")
            .map(str::trim)
            .unwrap_or(trimmed);
        digits
            .parse::<u8>()
            .ok()
            .and_then(ClassLabel::from_number)
            .ok_or_else(|| ParseClassError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown class: {0}")]
pub struct ParseClassError(pub String);

/// Server-side roster filter: one class or the grouped primary classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassFilter {
    Single(ClassLabel),
    /// Classes 1 through 5, sent as "1-5"
    Primary,
}

impl ClassFilter {
    /// Groups shown on the dashboard, in display order
    pub fn dashboard_groups() -> Vec<ClassFilter> {
        let mut groups = vec![ClassFilter::Primary];
        groups.extend(
            ClassLabel::ALL
                .iter()
                .filter(|label| !label.is_primary())
                .map(|label| ClassFilter::Single(*label)),
        );
        groups
    }

    /// Value of the `class` query parameter
    pub fn query_value(&self) -> String {
        match self {
            ClassFilter::Single(label) => label.as_str().to_string(),
            ClassFilter::Primary => "1-5".to_string(),
        }
    }

    pub fn matches(&self, label: ClassLabel) -> bool {
        match self {
            ClassFilter::Single(wanted) => *wanted == label,
            ClassFilter::Primary => label.is_primary(),
        }
    }
}

impl fmt::Display for ClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query_value())
    }
}

impl FromStr for ClassFilter {
    type Err = ParseClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "1-5" {
            return Ok(ClassFilter::Primary);
        }
        s.parse().map(ClassFilter::Single)
    }
}

/// Whether the student paid in advance; the API stores "Yes", "No" or ""
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaidAdvance {
    Yes,
    No,
    #[default]
    Unset,
}

impl PaidAdvance {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaidAdvance::Yes => "Yes",
            PaidAdvance::No => "No",
            PaidAdvance::Unset => "",
        }
    }
}

impl fmt::Display for PaidAdvance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaidAdvance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(PaidAdvance::Yes),
            "no" | "n" => Ok(PaidAdvance::No),
            "" => Ok(PaidAdvance::Unset),
            other => Err(format!("expected yes or no, got '{}'", other)),
        }
    }
}

impl Serialize for PaidAdvance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaidAdvance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Anything other than a recognizable yes/no (including null) is unset
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|value| value.parse().ok())
            .unwrap_or_default())
    }
}

/// Inline student photo stored as a `data:<mime>;base64,<payload>` URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Photo(String);

#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("photo is not a base64 data URL")]
    NotDataUrl,
    #[error("photo payload is not valid base64: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
}

impl Photo {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Photo(format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)))
    }

    pub fn from_data_url(url: impl Into<String>) -> Self {
        Photo(url.into())
    }

    /// Guess an image mime type from a file extension
    pub fn mime_for_path(path: &Path) -> Option<&'static str> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }

    pub fn as_data_url(&self) -> &str {
        &self.0
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.0
            .strip_prefix("data:")?
            .split(|c: char| c == ';' || c == ',')
            .next()
    }

    /// Decode the embedded image bytes
    pub fn decode(&self) -> Result<Vec<u8>, PhotoError> {
        let (header, payload) = self.0.split_once(',').ok_or(PhotoError::NotDataUrl)?;
        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(PhotoError::NotDataUrl);
        }
        Ok(STANDARD.decode(payload)?)
    }
}

fn photo_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Photo>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|url| !url.trim().is_empty()).map(Photo))
}

/// Parse the date part of either `YYYY-MM-DD` or a full ISO timestamp
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

mod calendar_date {
    use super::parse_calendar_date;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_calendar_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
    }
}

/// Payment state of one billing period
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEntry {
    pub paid: bool,
    /// Set when the period was last marked paid, cleared when unmarked
    #[serde(default)]
    pub paid_date: Option<DateTime<Utc>>,
}

impl FeeEntry {
    /// Flip the paid flag, stamping or clearing the paid date
    pub fn toggled(&self, now: DateTime<Utc>) -> FeeEntry {
        let paid = !self.paid;
        FeeEntry {
            paid,
            paid_date: if paid { Some(now) } else { None },
        }
    }
}

/// A student as stored by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "class")]
    pub class_label: ClassLabel,
    #[serde(with = "calendar_date")]
    pub date_of_joining: NaiveDate,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub paid_advance: PaidAdvance,
    #[serde(
        default,
        deserialize_with = "photo_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo: Option<Photo>,
    #[serde(default)]
    pub fees: FeeMap,
}

impl Student {
    pub fn fee(&self, period_key: &str) -> Option<&FeeEntry> {
        self.fees.get(period_key)
    }

    /// A period without an entry counts as unpaid
    pub fn is_paid(&self, period_key: &str) -> bool {
        self.fee(period_key).map(|entry| entry.paid).unwrap_or(false)
    }
}

/// Body for creating or updating a student (everything but the id)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentForm {
    pub name: String,
    #[serde(rename = "class")]
    pub class_label: Option<ClassLabel>,
    pub date_of_joining: Option<NaiveDate>,
    pub address: String,
    pub phone: String,
    pub paid_advance: PaidAdvance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,
}

pub const PHONE_MIN_DIGITS: usize = 10;
pub const PHONE_MAX_DIGITS: usize = 15;

/// Specific student form validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StudentValidationError {
    #[error("Name is required")]
    MissingName,
    #[error("Class is required")]
    MissingClass,
    #[error("Date of joining is required")]
    MissingJoiningDate,
    #[error("Address is required")]
    MissingAddress,
    #[error("Phone number must contain only digits")]
    PhoneNotDigits,
    #[error("Phone number must have 10 to 15 digits, got {0}")]
    PhoneLength(usize),
    #[error("Paid advance must be Yes or No")]
    MissingPaidAdvance,
}

impl StudentForm {
    /// Check every required field, reporting all violations at once
    pub fn validate(&self) -> Result<(), Vec<StudentValidationError>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(StudentValidationError::MissingName);
        }
        if self.class_label.is_none() {
            errors.push(StudentValidationError::MissingClass);
        }
        if self.date_of_joining.is_none() {
            errors.push(StudentValidationError::MissingJoiningDate);
        }
        if self.address.trim().is_empty() {
            errors.push(StudentValidationError::MissingAddress);
        }

        let phone = self.phone.trim();
        if !phone.chars().all(|c| c.is_ascii_digit()) {
            errors.push(StudentValidationError::PhoneNotDigits);
        } else if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&phone.len()) {
            errors.push(StudentValidationError::PhoneLength(phone.len()));
        }

        if self.paid_advance == PaidAdvance::Unset {
            errors.push(StudentValidationError::MissingPaidAdvance);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<&Student> for StudentForm {
    fn from(student: &Student) -> Self {
        StudentForm {
            name: student.name.clone(),
            class_label: Some(student.class_label),
            date_of_joining: Some(student.date_of_joining),
            address: student.address.clone(),
            phone: student.phone.clone(),
            paid_advance: student.paid_advance,
            photo: student.photo.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }

    pub fn toggled(&self) -> AttendanceStatus {
        match self {
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Present,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One student's status on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    /// ISO calendar date (YYYY-MM-DD)
    pub date: String,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn new(student_id: impl Into<String>, date: impl Into<String>, status: AttendanceStatus) -> Self {
        Self {
            student_id: student_id.into(),
            date: date.into(),
            status,
        }
    }

    pub fn is_for(&self, student_id: &str, date: &str) -> bool {
        self.student_id == student_id && self.date == date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub student_id: String,
    pub status: AttendanceStatus,
}

/// Body of `POST /api/students/attendance`; the API upserts by (student, date)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSubmission {
    pub date: String,
    pub attendance: Vec<AttendanceMark>,
}

impl AttendanceSubmission {
    /// One-record batch used when editing a single history cell
    pub fn single(student_id: impl Into<String>, date: impl Into<String>, status: AttendanceStatus) -> Self {
        Self {
            date: date.into(),
            attendance: vec![AttendanceMark {
                student_id: student_id.into(),
                status,
            }],
        }
    }

    /// Flatten into the records the API will store
    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.attendance
            .iter()
            .map(|mark| AttendanceRecord::new(mark.student_id.clone(), self.date.clone(), mark.status))
            .collect()
    }
}

/// Body of `PUT /api/students/:id/fees`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateFeesRequest {
    pub fees: FeeMap,
}

/// Confirmation or error body returned by the API
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}
