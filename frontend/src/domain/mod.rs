pub mod attendance_matrix;
pub mod calendar;
pub mod export_service;
pub mod fee_service;
