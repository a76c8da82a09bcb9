mod common;

use common::{student, FakeApi};
use shared::{AttendanceRecord, AttendanceStatus, ClassLabel};
use std::fs;
use std::time::Duration;
use tuition_admin::domain::attendance_matrix::{CellStatus, DateRange};
use tuition_admin::domain::export_service::ExportService;
use tuition_admin::services::api::ApiError;
use tuition_admin::state::attendance_desk::AttendanceDesk;
use tuition_admin::state::DeskError;

async fn desk_with_records(records: Vec<AttendanceRecord>) -> (FakeApi, AttendanceDesk) {
    let api = FakeApi::start(
        vec![
            student("s1", "Asha", ClassLabel::Two),
            student("s2", "Bala", ClassLabel::Seven),
        ],
        records,
    )
    .await;
    let desk = AttendanceDesk::load(api.client.clone()).await.unwrap();
    (api, desk)
}

#[tokio::test]
async fn test_toggle_unknown_cell_appends_then_flips() {
    let (api, desk) = desk_with_records(vec![AttendanceRecord::new(
        "s2",
        "2025-06-01",
        AttendanceStatus::Present,
    )])
    .await;
    assert_eq!(desk.matrix().status_at("s1", "2025-06-01"), CellStatus::Unknown);

    let status = desk.toggle_cell("s1", "2025-06-01").await.unwrap();
    assert_eq!(status, AttendanceStatus::Present);
    assert_eq!(desk.matrix().len(), 2);

    let status = desk.toggle_cell("s1", "2025-06-01").await.unwrap();
    assert_eq!(status, AttendanceStatus::Absent);
    assert_eq!(desk.matrix().len(), 2);
    assert_eq!(
        desk.matrix().status_at("s1", "2025-06-01"),
        CellStatus::Marked(AttendanceStatus::Absent)
    );

    api.with_state(|state| {
        assert_eq!(state.submissions.len(), 2);
        assert!(state.submissions.iter().all(|s| s.attendance.len() == 1));
    });
}

#[tokio::test]
async fn test_rejected_toggle_leaves_snapshot_alone() {
    let (api, desk) = desk_with_records(vec![AttendanceRecord::new(
        "s1",
        "2025-06-01",
        AttendanceStatus::Absent,
    )])
    .await;
    api.with_state(|state| state.reject_attendance = true);
    let before = desk.matrix();

    let err = desk.toggle_cell("s1", "2025-06-01").await.unwrap_err();
    match err {
        DeskError::Api(ApiError::Rejected { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Database unavailable");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(desk.matrix().records(), before.records());
    assert!(!desk.is_cell_busy("s1", "2025-06-01"));
}

#[tokio::test]
async fn test_second_toggle_of_busy_cell_is_rejected() {
    let (api, desk) = desk_with_records(vec![]).await;
    api.with_state(|state| state.attendance_delay = Some(Duration::from_millis(200)));

    let (first, second, other_cell) = tokio::join!(
        desk.toggle_cell("s1", "2025-06-05"),
        desk.toggle_cell("s1", "2025-06-05"),
        desk.toggle_cell("s2", "2025-06-05"),
    );

    assert_eq!(first.unwrap(), AttendanceStatus::Present);
    assert!(matches!(second, Err(DeskError::CellBusy { .. })));
    assert_eq!(other_cell.unwrap(), AttendanceStatus::Present);
    assert_eq!(desk.matrix().len(), 2);
    assert!(!desk.is_cell_busy("s1", "2025-06-05"));
}

#[tokio::test]
async fn test_toggle_requires_roster_student() {
    let (_api, desk) = desk_with_records(vec![]).await;
    assert!(matches!(
        desk.toggle_cell("ghost", "2025-06-05").await,
        Err(DeskError::UnknownStudent(_))
    ));
}

#[tokio::test]
async fn test_submit_sheet_merges_marks() {
    let (api, desk) = desk_with_records(vec![]).await;
    let sheet = desk
        .new_sheet("2025-06-10")
        .with_status("s2", AttendanceStatus::Absent)
        .unwrap();

    let matrix = desk.submit_sheet(&sheet).await.unwrap();
    assert_eq!(matrix.len(), 2);
    assert_eq!(
        matrix.status_at("s1", "2025-06-10"),
        CellStatus::Marked(AttendanceStatus::Present)
    );
    assert_eq!(
        matrix.status_at("s2", "2025-06-10"),
        CellStatus::Marked(AttendanceStatus::Absent)
    );

    api.with_state(|state| assert_eq!(state.records.len(), 2));
}

#[tokio::test]
async fn test_history_and_export_follow_date_range() {
    let (_api, desk) = desk_with_records(vec![
        AttendanceRecord::new("s1", "2025-06-01", AttendanceStatus::Present),
        AttendanceRecord::new("s1", "2025-06-02", AttendanceStatus::Absent),
        AttendanceRecord::new("s2", "2025-06-02", AttendanceStatus::Present),
        AttendanceRecord::new("s1", "2025-07-01", AttendanceStatus::Present),
    ])
    .await;

    let june = DateRange::between(Some("2025-06-01".to_string()), Some("2025-06-30".to_string()));
    let history = desk.history(&june);
    assert_eq!(history.dates, vec!["2025-06-01", "2025-06-02"]);
    assert_eq!(history.rows[1].cells, vec![CellStatus::Unknown, CellStatus::Marked(AttendanceStatus::Present)]);
    // totals cover every record, not just the visible columns
    assert_eq!(history.rows[0].stats.total, 3);
    assert_eq!(history.rows[0].stats.present, 2);

    let dir = tempfile::tempdir().unwrap();
    let outcome = desk
        .export(&ExportService::default(), &june, Some(dir.path()))
        .unwrap();
    assert_eq!(outcome.file_path, dir.path().join("attendance.csv"));
    assert_eq!(outcome.student_count, 2);
    assert_eq!(outcome.date_count, 2);

    let csv = fs::read_to_string(&outcome.file_path).unwrap();
    assert_eq!(
        csv,
        "Name,Phone,2025-06-01,2025-06-02\n\
         \"Asha\",\"9876543210\",Present,Absent\n\
         \"Bala\",\"9876543210\",-,Present\n"
    );
}
