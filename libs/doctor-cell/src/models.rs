use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::time_format::{format_time, hhmm};
use shared_utils::password::PasswordError;

// ==============================================================================
// DEPARTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentOverview {
    #[serde(flatten)]
    pub department: Department,
    pub doctor_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

// ==============================================================================
// WEEKLY AVAILABILITY
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const WORKING_DAYS: [DayOfWeek; 5] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ];

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A half-open wall-clock interval `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    #[serde(serialize_with = "hhmm::serialize")]
    start: NaiveTime,
    #[serde(serialize_with = "hhmm::serialize")]
    end: NaiveTime,
}

#[derive(Deserialize)]
struct RawTimeRange {
    #[serde(with = "hhmm")]
    start: NaiveTime,
    #[serde(with = "hhmm")]
    end: NaiveTime,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = AvailabilityError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, AvailabilityError> {
        if start >= end {
            return Err(AvailabilityError::InvalidRange {
                start: format_time(start),
                end: format_time(end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Touching ranges (`self.end == other.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn minutes(&self) -> u32 {
        minutes_of_day(self.end) - minutes_of_day(self.start)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_time(self.start), format_time(self.end))
    }
}

pub(crate) fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

pub(crate) fn time_from_minutes(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Recurring weekly schedule: per weekday, sorted disjoint ranges.
///
/// Built only through [`WeeklyAvailability::new`], which is also what
/// deserialization goes through, so a stored blob is re-validated on every
/// read. Ranges that merely touch are merged and empty days are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<DayOfWeek, Vec<TimeRange>>")]
pub struct WeeklyAvailability(BTreeMap<DayOfWeek, Vec<TimeRange>>);

impl WeeklyAvailability {
    pub fn new(days: BTreeMap<DayOfWeek, Vec<TimeRange>>) -> Result<Self, AvailabilityError> {
        let mut normalized = BTreeMap::new();

        for (day, mut ranges) in days {
            ranges.sort();
            let mut merged: Vec<TimeRange> = Vec::with_capacity(ranges.len());
            for range in ranges {
                match merged.last_mut() {
                    Some(last) if last.end > range.start => {
                        return Err(AvailabilityError::Overlap {
                            day,
                            first: *last,
                            second: range,
                        });
                    }
                    Some(last) if last.end == range.start => last.end = range.end,
                    _ => merged.push(range),
                }
            }
            if !merged.is_empty() {
                normalized.insert(day, merged);
            }
        }

        Ok(Self(normalized))
    }

    /// Monday to Friday, 09:00-12:00 and 14:00-17:00.
    pub fn default_schedule() -> Self {
        let hours = |start: u32, end: u32| TimeRange {
            start: NaiveTime::from_hms_opt(start, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(end, 0, 0).unwrap_or(NaiveTime::MIN),
        };
        Self(
            DayOfWeek::WORKING_DAYS
                .iter()
                .map(|day| (*day, vec![hours(9, 12), hours(14, 17)]))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = (&DayOfWeek, &Vec<TimeRange>)> {
        self.0.iter()
    }

    pub fn ranges_on(&self, day: DayOfWeek) -> &[TimeRange] {
        self.0.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ranges_for(&self, date: NaiveDate) -> &[TimeRange] {
        self.ranges_on(DayOfWeek::of(date))
    }

    /// True when `range` fits inside a single declared range for `date`'s weekday.
    pub fn covers(&self, date: NaiveDate, range: &TimeRange) -> bool {
        self.ranges_for(date).iter().any(|declared| declared.contains(range))
    }
}

impl TryFrom<BTreeMap<DayOfWeek, Vec<TimeRange>>> for WeeklyAvailability {
    type Error = AvailabilityError;

    fn try_from(days: BTreeMap<DayOfWeek, Vec<TimeRange>>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl Serialize for WeeklyAvailability {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvailabilityError {
    #[error("Invalid time range {start}-{end}: start must be before end")]
    InvalidRange { start: String, end: String },

    #[error("Availability ranges {first} and {second} overlap on {day}")]
    Overlap {
        day: DayOfWeek,
        first: TimeRange,
        second: TimeRange,
    },

    #[error("Slot length must be between 5 and 480 minutes")]
    InvalidSlotLength,
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// A concrete (date, start, end) the booking flow works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    date: NaiveDate,
    #[serde(serialize_with = "hhmm::serialize")]
    start_time: NaiveTime,
    #[serde(serialize_with = "hhmm::serialize")]
    end_time: NaiveTime,
}

impl Slot {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Result<Self, AvailabilityError> {
        TimeRange::new(start_time, end_time)?;
        Ok(Self {
            date,
            start_time,
            end_time,
        })
    }

    /// `start + minutes`, refusing to run past midnight.
    pub fn starting_at(date: NaiveDate, start_time: NaiveTime, minutes: u32) -> Result<Self, AvailabilityError> {
        let end = minutes_of_day(start_time)
            .checked_add(minutes)
            .and_then(time_from_minutes)
            .ok_or_else(|| AvailabilityError::InvalidRange {
                start: format_time(start_time),
                end: "24:00".to_string(),
            })?;
        Self::new(date, start_time, end)
    }

    pub fn from_range(date: NaiveDate, range: TimeRange) -> Self {
        Self {
            date,
            start_time: range.start,
            end_time: range.end,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.range())
    }
}

// ==============================================================================
// DOCTORS
// ==============================================================================

/// A doctor profile joined with its account and department.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
    pub is_active: bool,
    pub department_id: Uuid,
    pub department_name: String,
    pub specialization: Option<String>,
    pub experience_years: i64,
    pub availability: WeeklyAvailability,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub contact: Option<String>,
    pub department_id: Uuid,
    pub specialization: Option<String>,
    pub experience_years: Option<i64>,
    pub availability: Option<WeeklyAvailability>,
}

/// Admin edit of a doctor. `password` resets the login password.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub password: Option<String>,
    pub department_id: Option<Uuid>,
    pub specialization: Option<String>,
    pub experience_years: Option<i64>,
}

/// What a doctor may change on their own profile.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOwnProfileRequest {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceAvailabilityRequest {
    pub availability: WeeklyAvailability,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchFilters {
    pub department_id: Option<Uuid>,
    /// Matches the doctor's name or department name, case-insensitively.
    pub query: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorWithNextDate {
    #[serde(flatten)]
    pub doctor: DoctorProfile,
    pub next_available_date: Option<NaiveDate>,
}

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Department not found")]
    DepartmentNotFound,

    #[error("Department still has {0} doctor(s) assigned")]
    DepartmentInUse(i64),

    #[error("A department named '{0}' already exists")]
    DuplicateDepartment(String),

    #[error("Email is already registered")]
    EmailTaken,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for DoctorError {
    fn from(err: rusqlite::Error) -> Self {
        DoctorError::Database(err.into())
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound | DoctorError::DepartmentNotFound => AppError::NotFound(err.to_string()),
            DoctorError::DepartmentInUse(_)
            | DoctorError::DuplicateDepartment(_)
            | DoctorError::EmailTaken => AppError::Conflict(err.to_string()),
            DoctorError::Forbidden(msg) => AppError::Forbidden(msg),
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::Availability(e) => AppError::ValidationError(e.to_string()),
            DoctorError::Password(e) => e.into(),
            DoctorError::Database(e) => e.into(),
        }
    }
}
