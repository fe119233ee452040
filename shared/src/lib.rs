pub mod calendar;
mod types;

pub use calendar::{
    CalendarEntry, CalendarError, CalendarWarning, EntryCategory, EntryKind, MonthCalendar,
    MonthRange, MonthRef,
};
pub use types::*;
