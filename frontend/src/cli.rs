//! Command-line front end.
//!
//! Each command fetches only the state it needs from the API, applies the
//! requested action, and prints the result. Failures come back as errors
//! for `main` to report; nothing is retried.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use shared::{AttendanceStatus, ClassFilter, ClassLabel, PaidAdvance, Photo, Student, StudentForm};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AdminConfig;
use crate::domain::attendance_matrix::DateRange;
use crate::domain::calendar::FeeCalendar;
use crate::domain::export_service::ExportService;
use crate::domain::fee_service::{FeeGrid, FeeSaveReport};
use crate::services::api::ApiClient;
use crate::services::date_utils::{current_date, format_date_for_display, parse_date_arg};
use crate::state::attendance_desk::{AttendanceDesk, AttendanceHistory};
use crate::state::fee_desk::FeeDesk;
use crate::state::roster_desk::RosterDesk;

#[derive(Parser, Debug)]
#[command(name = "tuition-admin")]
#[command(about = "Tuition center administration: students, attendance and fees")]
#[command(version)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Student roster
    #[command(subcommand)]
    Students(StudentsCommand),
    /// Daily attendance and history
    #[command(subcommand)]
    Attendance(AttendanceCommand),
    /// Monthly fee payments
    #[command(subcommand)]
    Fees(FeesCommand),
    /// Print the billing periods of the fee calendar
    Calendar,
}

#[derive(Subcommand, Debug)]
pub enum StudentsCommand {
    /// List students, optionally for one class or the 1-5 group
    List {
        #[arg(long = "class")]
        class: Option<ClassFilter>,
    },
    /// Show one student
    Show { id: String },
    /// Add a student
    Add(NewStudentArgs),
    /// Edit a student; only the given fields change
    Edit {
        id: String,
        #[command(flatten)]
        changes: EditStudentArgs,
    },
    /// Delete a student
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct NewStudentArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long = "class")]
    pub class_label: ClassLabel,
    /// Date of joining, YYYY-MM-DD
    #[arg(long)]
    pub joined: NaiveDate,
    #[arg(long)]
    pub address: String,
    #[arg(long)]
    pub phone: String,
    /// yes or no
    #[arg(long)]
    pub paid_advance: PaidAdvance,
    /// Image file to embed as the student photo
    #[arg(long)]
    pub photo: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EditStudentArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long = "class")]
    pub class_label: Option<ClassLabel>,
    #[arg(long)]
    pub joined: Option<NaiveDate>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub paid_advance: Option<PaidAdvance>,
    #[arg(long, conflicts_with = "remove_photo")]
    pub photo: Option<PathBuf>,
    #[arg(long)]
    pub remove_photo: bool,
}

#[derive(Subcommand, Debug)]
pub enum AttendanceCommand {
    /// Submit attendance for a date; everyone not listed as absent is present
    Mark {
        /// Defaults to today
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<String>,
        /// Student id to mark absent (repeatable)
        #[arg(long = "absent")]
        absent: Vec<String>,
    },
    /// Show the full attendance table with per-student totals
    History {
        #[arg(long, value_parser = parse_date_arg)]
        from: Option<String>,
        #[arg(long, value_parser = parse_date_arg)]
        to: Option<String>,
    },
    /// Flip one cell: unknown or absent becomes present, present becomes absent
    Toggle {
        student_id: String,
        #[arg(value_parser = parse_date_arg)]
        date: String,
    },
    /// Write the attendance table to attendance.csv
    Export {
        #[arg(long, value_parser = parse_date_arg)]
        from: Option<String>,
        #[arg(long, value_parser = parse_date_arg)]
        to: Option<String>,
        /// Directory or .csv file to write
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum FeesCommand {
    /// Show the fee grid
    Grid,
    /// Flip the given periods (e.g. June2025) for a student and save
    Toggle {
        student_id: String,
        #[arg(required = true)]
        periods: Vec<String>,
    },
}

pub async fn run(cli: Cli, config: AdminConfig) -> Result<()> {
    let api = ApiClient::from_config(&config)?;
    match cli.command {
        Command::Students(command) => run_students(command, api).await,
        Command::Attendance(command) => run_attendance(command, api, &config).await,
        Command::Fees(command) => run_fees(command, api, &config.fee_calendar()?).await,
        Command::Calendar => {
            for period in config.fee_calendar()?.periods() {
                println!("{:<16} {}", period.key, period);
            }
            Ok(())
        }
    }
}

async fn run_students(command: StudentsCommand, api: ApiClient) -> Result<()> {
    match command {
        StudentsCommand::List { class } => {
            let desk = RosterDesk::load(api, class).await?;
            let students = desk.students();
            match class {
                Some(filter) => println!("Students in class {}", filter),
                None => println!("All students"),
            }
            if students.is_empty() {
                println!("No students found.");
            } else {
                print!("{}", render_roster(&students));
                if class.is_none() {
                    println!("{}", render_group_counts(&students));
                }
            }
        }
        StudentsCommand::Show { id } => {
            let student = api.get_student(&id).await?;
            print!("{}", render_student(&student));
        }
        StudentsCommand::Add(args) => {
            let form = StudentForm {
                name: args.name,
                class_label: Some(args.class_label),
                date_of_joining: Some(args.joined),
                address: args.address,
                phone: args.phone,
                paid_advance: args.paid_advance,
                photo: args.photo.as_deref().map(load_photo).transpose()?,
            };
            let desk = RosterDesk::detached(api, None);
            let created = desk.add(&form).await?;
            println!("Student added: {} ({})", created.name, created.id);
        }
        StudentsCommand::Edit { id, changes } => {
            let desk = RosterDesk::detached(api, None);
            let existing = desk.get(&id).await?;
            let form = apply_edits(StudentForm::from(&existing), changes)?;
            let updated = desk.update(&id, &form).await?;
            println!("Student updated: {} ({})", updated.name, updated.id);
        }
        StudentsCommand::Delete { id } => {
            let desk = RosterDesk::detached(api, None);
            desk.delete(&id).await?;
            println!("Student deleted successfully!");
        }
    }
    Ok(())
}

async fn run_attendance(command: AttendanceCommand, api: ApiClient, config: &AdminConfig) -> Result<()> {
    let desk = AttendanceDesk::load(api).await?;
    match command {
        AttendanceCommand::Mark { date, absent } => {
            let date = date.unwrap_or_else(current_date);
            let mut sheet = desk.new_sheet(date);
            for student_id in &absent {
                sheet = sheet.with_status(student_id, AttendanceStatus::Absent)?;
            }
            if sheet.marks().is_empty() {
                bail!("No students found.");
            }
            desk.submit_sheet(&sheet).await?;
            let absent_count = sheet
                .marks()
                .iter()
                .filter(|mark| mark.status == AttendanceStatus::Absent)
                .count();
            println!(
                "Attendance submitted for {}: {} present, {} absent",
                format_date_for_display(sheet.date()),
                sheet.marks().len() - absent_count,
                absent_count
            );
        }
        AttendanceCommand::History { from, to } => {
            let history = desk.history(&DateRange::between(from, to));
            if history.rows.is_empty() || history.dates.is_empty() {
                println!("No attendance records found.");
            } else {
                print!("{}", render_history(&history));
            }
        }
        AttendanceCommand::Toggle { student_id, date } => {
            let status = desk.toggle_cell(&student_id, &date).await?;
            println!("{} on {} is now {}", student_id, date, status);
        }
        AttendanceCommand::Export { from, to, out } => {
            let export_service = ExportService::new(config.export_dir.clone());
            let outcome = desk.export(&export_service, &DateRange::between(from, to), out.as_deref())?;
            println!(
                "Exported {} students x {} dates to {}",
                outcome.student_count,
                outcome.date_count,
                outcome.file_path.display()
            );
        }
    }
    Ok(())
}

async fn run_fees(command: FeesCommand, api: ApiClient, calendar: &FeeCalendar) -> Result<()> {
    let desk = FeeDesk::load(api, calendar).await?;
    match command {
        FeesCommand::Grid => print!("{}", render_fee_grid(&desk.grid())),
        FeesCommand::Toggle { student_id, periods } => {
            for period_key in &periods {
                desk.toggle(&student_id, period_key)?;
            }
            let report = desk.save().await;
            print!("{}", render_save_report(&report));
            if !report.all_succeeded() {
                bail!("Failed to save changes for {} students", report.failures().len());
            }
        }
    }
    Ok(())
}

fn load_photo(path: &Path) -> Result<Photo> {
    let mime_type = Photo::mime_for_path(path)
        .ok_or_else(|| anyhow!("{} is not a png, jpeg, gif or webp image", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("Failed to read photo {}", path.display()))?;
    Ok(Photo::from_bytes(mime_type, &bytes))
}

fn apply_edits(mut form: StudentForm, changes: EditStudentArgs) -> Result<StudentForm> {
    if let Some(name) = changes.name {
        form.name = name;
    }
    if let Some(class_label) = changes.class_label {
        form.class_label = Some(class_label);
    }
    if let Some(joined) = changes.joined {
        form.date_of_joining = Some(joined);
    }
    if let Some(address) = changes.address {
        form.address = address;
    }
    if let Some(phone) = changes.phone {
        form.phone = phone;
    }
    if let Some(paid_advance) = changes.paid_advance {
        form.paid_advance = paid_advance;
    }
    if let Some(photo) = changes.photo {
        form.photo = Some(load_photo(&photo)?);
    }
    if changes.remove_photo {
        form.photo = None;
    }
    Ok(form)
}

fn render_roster(students: &[Student]) -> String {
    let mut out = format!(
        "{:<26} {:<28} {:<8} {:<12} {:<16} {:<6} {}\n",
        "ID", "Name", "Class", "Joined", "Phone", "Adv.", "Photo"
    );
    for student in students {
        out.push_str(&format!(
            "{:<26} {:<28} {:<8} {:<12} {:<16} {:<6} {}\n",
            student.id,
            student.name,
            student.class_label.display_label(),
            student.date_of_joining,
            student.phone,
            student.paid_advance,
            if student.photo.is_some() { "yes" } else { "-" }
        ));
    }
    out
}

fn render_group_counts(students: &[Student]) -> String {
    let counts: Vec<String> = ClassFilter::dashboard_groups()
        .into_iter()
        .map(|group| {
            let count = students
                .iter()
                .filter(|student| group.matches(student.class_label))
                .count();
            format!("{}: {}", group, count)
        })
        .collect();
    format!("By class: {}", counts.join(", "))
}

fn render_student(student: &Student) -> String {
    let photo = match &student.photo {
        Some(photo) => photo.mime_type().unwrap_or("embedded image").to_string(),
        None => "none".to_string(),
    };
    format!(
        "ID:              {}\nName:            {}\nClass:           {}\nDate of joining: {}\nAddress:         {}\nPhone:           {}\nPaid advance:    {}\nPhoto:           {}\n",
        student.id,
        student.name,
        student.class_label.display_label(),
        student.date_of_joining,
        student.address,
        student.phone,
        student.paid_advance,
        photo
    )
}

fn render_history(history: &AttendanceHistory) -> String {
    let mut out = format!("{:<24}", "Name");
    for date in &history.dates {
        out.push_str(&format!(" {:<10}", date));
    }
    out.push_str("  Present/Total  %\n");

    for row in &history.rows {
        out.push_str(&format!("{:<24}", row.name));
        for cell in &row.cells {
            out.push_str(&format!(" {:<10}", cell));
        }
        out.push_str(&format!(
            "  {:>7}/{:<5}  {}\n",
            row.stats.present,
            row.stats.total,
            row.stats.percentage_label()
        ));
    }
    out
}

fn render_fee_grid(grid: &FeeGrid) -> String {
    let mut out = format!("{:<24} {:<8} {:<12} {:<14}", "Name", "Class", "Joined", "Phone");
    for period in grid.periods() {
        let short = format!("{}{:02}", &period.month_name()[..3], period.year.rem_euclid(100));
        out.push_str(&format!(" {:<6}", short));
    }
    out.push('\n');

    for row in grid.rows() {
        // paid-advance students are starred
        let marker = if row.paid_advance == PaidAdvance::Yes { "*" } else { " " };
        out.push_str(&format!(
            "{}{:<23} {:<8} {:<12} {:<14}",
            marker,
            row.name,
            row.class_label.display_label(),
            row.date_of_joining,
            row.phone
        ));
        for paid in row.paid {
            out.push_str(&format!(" {:<6}", if paid { "[x]" } else { "[ ]" }));
        }
        out.push('\n');
    }
    out.push_str("* paid in advance\n");
    out
}

fn render_save_report(report: &FeeSaveReport) -> String {
    if report.all_succeeded() {
        return "Changes saved successfully!\n".to_string();
    }
    let mut out = format!(
        "Saved {} of {} students. Failed:\n",
        report.saved_count(),
        report.outcomes.len()
    );
    for failure in report.failures() {
        if let Err(message) = &failure.result {
            out.push_str(&format!("  {} ({}): {}\n", failure.student_name, failure.student_id, message));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fee_service::FeeSaveOutcome;
    use shared::FeeMap;

    fn student() -> Student {
        Student {
            id: "s1".to_string(),
            name: "Nila".to_string(),
            class_label: ClassLabel::Three,
            date_of_joining: NaiveDate::from_ymd_opt(2025, 6, 9).unwrap(),
            address: "Temple Street".to_string(),
            phone: "9123456780".to_string(),
            paid_advance: PaidAdvance::Yes,
            photo: None,
            fees: FeeMap::new(),
        }
    }

    #[test]
    fn test_cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "tuition-admin",
            "attendance",
            "export",
            "--from",
            "2025-06-01",
            "--out",
            "/tmp/out.csv",
        ])
        .unwrap();
        match cli.command {
            Command::Attendance(AttendanceCommand::Export { from, to, out }) => {
                assert_eq!(from.as_deref(), Some("2025-06-01"));
                assert_eq!(to, None);
                assert_eq!(out, Some(PathBuf::from("/tmp/out.csv")));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["tuition-admin", "students", "list", "--class", "1-5"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Students(StudentsCommand::List { class: Some(ClassFilter::Primary) })
        ));
    }

    #[test]
    fn test_cli_rejects_bad_dates_and_classes() {
        assert!(Cli::try_parse_from(["tuition-admin", "attendance", "toggle", "s1", "June 3"]).is_err());
        assert!(Cli::try_parse_from(["tuition-admin", "students", "list", "--class", "12"]).is_err());
        assert!(Cli::try_parse_from(["tuition-admin", "fees", "toggle", "s1"]).is_err());
    }

    #[test]
    fn test_apply_edits_changes_only_given_fields() {
        let changes = EditStudentArgs {
            name: None,
            class_label: None,
            joined: None,
            address: None,
            phone: Some("9000011111".to_string()),
            paid_advance: Some(PaidAdvance::No),
            photo: None,
            remove_photo: true,
        };
        let mut original = StudentForm::from(&student());
        original.photo = Some(Photo::from_bytes("image/png", &[1, 2, 3]));

        let edited = apply_edits(original, changes).unwrap();
        assert_eq!(edited.name, "Nila");
        assert_eq!(edited.phone, "9000011111");
        assert_eq!(edited.paid_advance, PaidAdvance::No);
        assert_eq!(edited.photo, None);
    }

    #[test]
    fn test_load_photo_rejects_unknown_types() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        fs::write(&text, "hello").unwrap();
        assert!(load_photo(&text).is_err());

        let png = dir.path().join("face.png");
        fs::write(&png, [0x89, 0x50]).unwrap();
        let photo = load_photo(&png).unwrap();
        assert_eq!(photo.decode().unwrap(), vec![0x89, 0x50]);
    }

    #[test]
    fn test_group_counts_follow_dashboard_order() {
        let mut senior = student();
        senior.class_label = ClassLabel::Ten;
        let rendered = render_group_counts(&[student(), student(), senior]);
        assert_eq!(rendered, "By class: 1-5: 2, 6: 0, 7: 0, 8: 0, 9: 0, 10: 1");
    }

    #[test]
    fn test_render_fee_grid_marks_paid_cells() {
        let mut paid = student();
        paid.fees.insert(
            "June2025".to_string(),
            shared::FeeEntry { paid: true, paid_date: None },
        );
        let grid = FeeGrid::new(&FeeCalendar::default(), vec![paid]);
        let rendered = render_fee_grid(&grid);
        let lines: Vec<&str> = rendered.lines().collect();

        assert!(lines[0].contains("Jun25"));
        assert!(lines[0].contains("Jun26"));
        assert!(lines[1].starts_with("*Nila"));
        assert_eq!(lines[1].matches("[x]").count(), 1);
        assert_eq!(lines[1].matches("[ ]").count(), 12);
    }

    #[test]
    fn test_render_save_report_lists_failures() {
        let report = FeeSaveReport {
            outcomes: vec![FeeSaveOutcome {
                student_id: "s1".to_string(),
                student_name: "Nila".to_string(),
                result: Err("Network error: timed out".to_string()),
            }],
        };
        let rendered = render_save_report(&report);
        assert!(rendered.starts_with("Saved 0 of 1 students."));
        assert!(rendered.contains("Nila (s1): Network error: timed out"));
    }
}
