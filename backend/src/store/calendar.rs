use chrono::NaiveDateTime;
use diesel::prelude::*;
use shared::calendar::{aggregate, MonthRange};
use shared::{MonthCalendar, Session};

use super::Store;
use crate::db::schema::schedules;
use crate::error::{GarageError, GarageResult};
use crate::models::Schedule;

impl Store {
    /// Month view of one mechanic's bookings and assigned repairs.
    ///
    /// Mechanics always see their own calendar; admins have to say whose.
    pub fn month_calendar(
        &mut self,
        actor: &Session,
        year: i32,
        month: u32,
        mechanic: Option<&str>,
        now: NaiveDateTime,
    ) -> GarageResult<MonthCalendar> {
        let range =
            MonthRange::new(year, month).map_err(|e| GarageError::validation(e.to_string()))?;

        let mechanic = if actor.is_admin() {
            mechanic
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .ok_or_else(|| GarageError::validation("Choose a mechanic to view"))?
                .to_string()
        } else {
            actor.full_name.clone()
        };

        let schedule_rows: Vec<shared::ScheduleEntry> = schedules::table
            .filter(schedules::mechanic.eq(&mechanic))
            .select(Schedule::as_select())
            .load(&mut self.conn)?
            .into_iter()
            .map(Into::into)
            .collect();
        let repair_rows = self.repairs_for_mechanic(&mechanic)?;

        let calendar = aggregate(&mechanic, range, &schedule_rows, &repair_rows, now);
        tracing::debug!(
            mechanic = %mechanic,
            year,
            month,
            entries = calendar.entries().count(),
            warnings = calendar.warnings.len(),
            "built month calendar"
        );
        Ok(calendar)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::*;
    use crate::db::schema::repairs;
    use chrono::NaiveDate;
    use shared::{CreateCustomer, CreateSchedule, EntryCategory, EntryKind, Priority, UpdateRepair};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn book(store: &mut Store, actor: &Session) -> i32 {
        store
            .add_schedule(
                actor,
                &CreateSchedule {
                    mechanic: String::new(),
                    task: "Oil change".to_string(),
                    start: "2025-03-14 09:00".to_string(),
                    end: "2025-03-14 10:00".to_string(),
                },
            )
            .unwrap()
            .id
    }

    #[test]
    fn marking_done_shows_on_next_call() {
        let mut store = testing::store();
        let sam = testing::mechanic(&mut store, "sam", "Sam Spanner");
        let id = book(&mut store, &sam);

        let before = store.month_calendar(&sam, 2025, 3, None, at(14, 11)).unwrap();
        let entry = &before.day(14)[0];
        assert!(entry.late);
        assert_eq!(entry.category, EntryCategory::Late);

        store.mark_schedule_done(&sam, id).unwrap();
        let after = store.month_calendar(&sam, 2025, 3, None, at(14, 11)).unwrap();
        let entry = &after.day(14)[0];
        assert!(!entry.late);
        assert_eq!(entry.category, EntryCategory::DoneLate);
    }

    #[test]
    fn mechanic_cannot_peek_at_another_calendar() {
        let mut store = testing::store();
        let sam = testing::mechanic(&mut store, "sam", "Sam Spanner");
        let ria = testing::mechanic(&mut store, "ria", "Ria Ratchet");
        book(&mut store, &sam);

        let view = store
            .month_calendar(&ria, 2025, 3, Some("Sam Spanner"), at(1, 0))
            .unwrap();
        assert_eq!(view.mechanic, "Ria Ratchet");
        assert!(view.is_empty());
    }

    #[test]
    fn admin_must_choose_a_mechanic_and_a_real_month() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        assert!(matches!(
            store.month_calendar(&admin, 2025, 3, None, at(1, 0)),
            Err(GarageError::Validation(_))
        ));
        assert!(matches!(
            store.month_calendar(&admin, 2025, 13, Some("Sam"), at(1, 0)),
            Err(GarageError::Validation(_))
        ));
    }

    #[test]
    fn assigned_repairs_join_bookings_and_bad_dates_become_warnings() {
        let mut store = testing::store();
        let admin = testing::admin(&mut store);
        let sam = testing::mechanic(&mut store, "sam", "Sam Spanner");
        book(&mut store, &sam);

        store
            .add_customer(
                &admin,
                &CreateCustomer {
                    name: "Jo Driver".to_string(),
                    car_model: "Golf".to_string(),
                    vin: "V1".to_string(),
                    issue: "Rattle".to_string(),
                },
            )
            .unwrap();
        let repair_id = store.list_repairs(&admin).unwrap()[0].id;
        store
            .edit_repair(
                &admin,
                repair_id,
                &UpdateRepair {
                    assigned_mechanic: "Sam Spanner".to_string(),
                    priority: Priority::Medium,
                    estimated_hours: 1.0,
                    estimated_cost: None,
                },
            )
            .unwrap();
        diesel::update(repairs::table.find(repair_id))
            .set(repairs::start_date.eq("2025-03-14T08:30:00.123456"))
            .execute(&mut store.conn)
            .unwrap();

        let view = store
            .month_calendar(&admin, 2025, 3, Some("Sam Spanner"), at(1, 0))
            .unwrap();
        let kinds: Vec<_> = view.day(14).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntryKind::Repair, EntryKind::Schedule]);
        assert!(view.warnings.is_empty());

        diesel::update(repairs::table.find(repair_id))
            .set(repairs::start_date.eq(""))
            .execute(&mut store.conn)
            .unwrap();
        let view = store
            .month_calendar(&admin, 2025, 3, Some("Sam Spanner"), at(1, 0))
            .unwrap();
        assert_eq!(view.entries().count(), 1);
        assert_eq!(view.warnings.len(), 1);
        assert_eq!(view.warnings[0].id, repair_id);
    }
}
