//! Monthly calendar aggregation.
//!
//! Merges a mechanic's schedule entries and repair tickets into a
//! day-of-month index and classifies each entry for rendering. Everything in
//! here is pure: callers load the rows and pass the current time in.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Repair, RepairStatus, ScheduleEntry, ScheduleStatus};

/// Timestamp layouts accepted for stored start/end text, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("Month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("Year {0} is out of range")]
    InvalidYear(i32),
    #[error("Cannot parse timestamp: '{0}'")]
    Unparsable(String),
}

/// Parse a stored timestamp. Date-only values resolve to midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, CalendarError> {
    let s = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| CalendarError::Unparsable(raw.to_string()))
}

// ============================================================================
// Month boundaries
// ============================================================================

/// A calendar month as the half-open interval `[first, next)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub year: i32,
    pub month: u32,
    pub first: NaiveDate,
    pub next: NaiveDate,
}

impl MonthRange {
    pub fn new(year: i32, month: u32) -> Result<Self, CalendarError> {
        if !(1..=12).contains(&month) {
            return Err(CalendarError::InvalidMonth(month));
        }
        let first =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::InvalidYear(year))?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .ok_or(CalendarError::InvalidYear(year))?;
        Ok(Self {
            year,
            month,
            first,
            next,
        })
    }

    pub fn containing(date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let next = first
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        Self {
            year: date.year(),
            month: date.month(),
            first,
            next,
        }
    }

    pub fn days(&self) -> u32 {
        (self.next - self.first).num_days() as u32
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let date = at.date();
        date >= self.first && date < self.next
    }

    /// Step forwards or backwards by whole months, wrapping the year.
    pub fn shift(&self, delta: i32) -> Result<Self, CalendarError> {
        let index = self.year * 12 + (self.month as i32 - 1) + delta;
        Self::new(index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
    }

    pub fn label(&self) -> String {
        self.first.format("%B %Y").to_string()
    }

    /// Sunday-first week rows; `None` pads days outside the month.
    pub fn weeks(&self) -> Vec<[Option<u32>; 7]> {
        let offset = self.first.weekday().num_days_from_sunday() as usize;
        let mut weeks = Vec::new();
        let mut row = [None; 7];
        let mut col = offset;
        for day in 1..=self.days() {
            row[col] = Some(day);
            col += 1;
            if col == 7 {
                weeks.push(row);
                row = [None; 7];
                col = 0;
            }
        }
        if col != 0 {
            weeks.push(row);
        }
        weeks
    }
}

// ============================================================================
// Entries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Schedule,
    Repair,
}

impl EntryKind {
    pub fn label_prefix(&self) -> &'static str {
        match self {
            EntryKind::Schedule => "Task:",
            EntryKind::Repair => "Service:",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    /// Done, and the end time has already passed.
    DoneLate,
    Done,
    Late,
    Task,
    Service,
}

impl EntryCategory {
    pub fn classify(kind: EntryKind, done: bool, overdue: bool) -> Self {
        match (done, overdue) {
            (true, true) => EntryCategory::DoneLate,
            (true, false) => EntryCategory::Done,
            (false, true) => EntryCategory::Late,
            (false, false) => match kind {
                EntryKind::Schedule => EntryCategory::Task,
                EntryKind::Repair => EntryCategory::Service,
            },
        }
    }

    /// Background and foreground colours.
    pub fn colors(&self) -> (&'static str, &'static str) {
        match self {
            EntryCategory::DoneLate => ("#a8ffb0", "#222"),
            EntryCategory::Done => ("#4CAF50", "#fff"),
            EntryCategory::Late => ("#ffe066", "#222"),
            EntryCategory::Task => ("#5ecfff", "#222"),
            EntryCategory::Service => ("#ffd580", "#222"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub kind: EntryKind,
    pub id: i32,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub start_text: String,
    pub end_text: Option<String>,
    pub description: String,
    pub status: String,
    pub done: bool,
    pub late: bool,
    pub category: EntryCategory,
    pub background: String,
    pub foreground: String,
}

/// A row that could not be placed on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarWarning {
    pub kind: EntryKind,
    pub id: i32,
    pub value: String,
    pub reason: String,
}

/// Year and month of a neighbouring page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl From<MonthRange> for MonthRef {
    fn from(range: MonthRange) -> Self {
        Self {
            year: range.year,
            month: range.month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    pub label: String,
    /// `None` at the edge of the representable date range.
    pub previous: Option<MonthRef>,
    pub next: Option<MonthRef>,
    pub mechanic: String,
    /// `days[d - 1]` holds the entries for day `d`.
    pub days: Vec<Vec<CalendarEntry>>,
    pub warnings: Vec<CalendarWarning>,
}

impl MonthCalendar {
    pub fn day(&self, day: u32) -> &[CalendarEntry] {
        day.checked_sub(1)
            .and_then(|i| self.days.get(i as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn entries(&self) -> impl Iterator<Item = &CalendarEntry> {
        self.days.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }
}

// ============================================================================
// Aggregation
// ============================================================================

struct RawEntry<'a> {
    kind: EntryKind,
    id: i32,
    start: Option<&'a str>,
    end: Option<&'a str>,
    description: Option<&'a str>,
    status: &'a str,
    done: bool,
}

/// Build the month view for `mechanic` from already-loaded rows.
///
/// Rows belonging to other mechanics or other months are ignored. Rows whose
/// start cannot be parsed are reported in `warnings` instead of being placed.
pub fn aggregate(
    mechanic: &str,
    range: MonthRange,
    schedules: &[ScheduleEntry],
    repairs: &[Repair],
    now: NaiveDateTime,
) -> MonthCalendar {
    let schedule_rows = schedules
        .iter()
        .filter(|s| s.mechanic == mechanic)
        .map(|s| RawEntry {
            kind: EntryKind::Schedule,
            id: s.id,
            start: Some(&s.start_time),
            end: Some(&s.end_time),
            description: s.task.as_deref(),
            status: &s.status,
            done: ScheduleStatus::parse(&s.status) == Some(ScheduleStatus::Done),
        });

    let repair_rows = repairs
        .iter()
        .filter(|r| r.assigned_mechanic.as_deref() == Some(mechanic))
        .map(|r| RawEntry {
            kind: EntryKind::Repair,
            id: r.id,
            start: r.start_date.as_deref(),
            end: r.end_date.as_deref(),
            description: r.issue.as_deref(),
            status: &r.status,
            done: RepairStatus::parse(&r.status) == Some(RepairStatus::Repaired),
        });

    let mut days: Vec<Vec<CalendarEntry>> = vec![Vec::new(); range.days() as usize];
    let mut warnings = Vec::new();

    for raw in schedule_rows.chain(repair_rows) {
        let start_text = raw.start.unwrap_or_default();
        let start = match parse_timestamp(start_text) {
            Ok(dt) => dt,
            Err(e) => {
                tracing::warn!(
                    kind = ?raw.kind,
                    id = raw.id,
                    value = start_text,
                    "dropping calendar row with unparsable start"
                );
                warnings.push(CalendarWarning {
                    kind: raw.kind,
                    id: raw.id,
                    value: start_text.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !range.contains(start) {
            continue;
        }

        // An unreadable end is treated as no end at all.
        let end = raw.end.and_then(|e| parse_timestamp(e).ok());
        let overdue = end.is_some_and(|e| e < now);
        let late = overdue && !raw.done;
        let category = EntryCategory::classify(raw.kind, raw.done, overdue);
        let (background, foreground) = category.colors();

        let entry = CalendarEntry {
            kind: raw.kind,
            id: raw.id,
            start,
            end,
            start_text: start_text.to_string(),
            end_text: raw.end.map(str::to_string),
            description: raw.description.unwrap_or_default().to_string(),
            status: raw.status.to_string(),
            done: raw.done,
            late,
            category,
            background: background.to_string(),
            foreground: foreground.to_string(),
        };

        let index = (start.day() - 1) as usize;
        days[index].push(entry);
    }

    for entries in &mut days {
        entries.sort_by(|a, b| (a.start, a.kind, a.id).cmp(&(b.start, b.kind, b.id)));
    }

    MonthCalendar {
        year: range.year,
        month: range.month,
        label: range.label(),
        previous: range.shift(-1).ok().map(MonthRef::from),
        next: range.shift(1).ok().map(MonthRef::from),
        mechanic: mechanic.to_string(),
        days,
        warnings,
    }
}
