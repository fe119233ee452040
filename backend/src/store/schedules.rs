use diesel::prelude::*;
use shared::calendar::parse_timestamp;
use shared::{CreateSchedule, ScheduleStatus, Session, UpdateSchedule};

use super::{required, Store};
use crate::db::schema::schedules;
use crate::error::{GarageError, GarageResult};
use crate::models::{self, NewSchedule, Schedule};

/// Validated `(task, start, end)` for a booking. The times are kept as the
/// caller wrote them, trimmed.
fn checked_window(task: &str, start: &str, end: &str) -> GarageResult<(String, String, String)> {
    let task = required(task, "Task")?;
    let start = required(start, "Start time")?;
    let end = required(end, "End time")?;

    let parsed_start = parse_timestamp(&start)
        .map_err(|_| GarageError::validation(format!("Start time '{start}' is not a valid date")))?;
    let parsed_end = parse_timestamp(&end)
        .map_err(|_| GarageError::validation(format!("End time '{end}' is not a valid date")))?;
    if parsed_end < parsed_start {
        return Err(GarageError::validation("End time must not be before start time"));
    }
    Ok((task, start, end))
}

impl Store {
    /// Schedules for one mechanic, or for everyone when an admin passes no
    /// name. Mechanics always get their own.
    pub fn list_schedules(
        &mut self,
        actor: &Session,
        mechanic: Option<&str>,
    ) -> GarageResult<Vec<shared::ScheduleEntry>> {
        let mechanic = if actor.is_admin() {
            mechanic.map(str::trim).filter(|m| !m.is_empty())
        } else {
            Some(actor.full_name.as_str())
        };

        let mut query = schedules::table
            .order((schedules::start_time.asc(), schedules::id.asc()))
            .select(Schedule::as_select())
            .into_boxed();
        if let Some(name) = mechanic {
            query = query.filter(schedules::mechanic.eq(name.to_string()));
        }
        let rows = query.load(&mut self.conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub fn add_schedule(
        &mut self,
        actor: &Session,
        req: &CreateSchedule,
    ) -> GarageResult<shared::ScheduleEntry> {
        let requested = req.mechanic.trim();
        let mechanic = if actor.is_admin() {
            let name = required(requested, "Mechanic")?;
            if !self.is_mechanic_name(&name)? {
                return Err(GarageError::validation(format!(
                    "'{name}' is not a registered mechanic"
                )));
            }
            name
        } else if requested.is_empty() || requested == actor.full_name {
            actor.full_name.clone()
        } else {
            return Err(GarageError::forbidden(
                "Mechanics can only schedule their own work",
            ));
        };

        let (task, start, end) = checked_window(&req.task, &req.start, &req.end)?;
        let entry = diesel::insert_into(schedules::table)
            .values(&NewSchedule {
                mechanic,
                start_time: start,
                end_time: end,
                task: Some(task),
                status: ScheduleStatus::Pending.as_str().to_string(),
            })
            .returning(Schedule::as_returning())
            .get_result(&mut self.conn)?;
        tracing::info!(schedule_id = entry.id, mechanic = %entry.mechanic, "added schedule");
        Ok(entry.into())
    }

    fn owned_schedule(&mut self, actor: &Session, id: i32) -> GarageResult<Schedule> {
        let entry = schedules::table
            .find(id)
            .select(Schedule::as_select())
            .first(&mut self.conn)
            .optional()?
            .ok_or_else(|| GarageError::not_found(format!("Schedule {id} not found")))?;
        if !actor.is_admin() && entry.mechanic != actor.full_name {
            return Err(GarageError::forbidden(format!(
                "Schedule {id} belongs to another mechanic"
            )));
        }
        Ok(entry)
    }

    fn apply_schedule_change(
        &mut self,
        id: i32,
        change: &models::UpdateSchedule,
    ) -> GarageResult<shared::ScheduleEntry> {
        let updated = diesel::update(schedules::table.find(id))
            .set(change)
            .returning(Schedule::as_returning())
            .get_result(&mut self.conn)?;
        Ok(updated.into())
    }

    pub fn edit_schedule(
        &mut self,
        actor: &Session,
        id: i32,
        req: &UpdateSchedule,
    ) -> GarageResult<shared::ScheduleEntry> {
        self.owned_schedule(actor, id)?;
        let (task, start, end) = checked_window(&req.task, &req.start, &req.end)?;
        let change = models::UpdateSchedule {
            start_time: Some(start),
            end_time: Some(end),
            task: Some(Some(task)),
            ..Default::default()
        };
        self.apply_schedule_change(id, &change)
    }

    pub fn delete_schedule(&mut self, actor: &Session, id: i32) -> GarageResult<()> {
        self.owned_schedule(actor, id)?;
        diesel::delete(schedules::table.find(id)).execute(&mut self.conn)?;
        tracing::info!(schedule_id = id, by = %actor.username, "deleted schedule");
        Ok(())
    }

    pub fn set_schedule_status(
        &mut self,
        actor: &Session,
        id: i32,
        status: ScheduleStatus,
    ) -> GarageResult<shared::ScheduleEntry> {
        self.owned_schedule(actor, id)?;
        let change = models::UpdateSchedule {
            status: Some(status.as_str().to_string()),
            ..Default::default()
        };
        let entry = self.apply_schedule_change(id, &change)?;
        tracing::info!(schedule_id = id, status = status.as_str(), "schedule status changed");
        Ok(entry)
    }

    pub fn mark_schedule_done(
        &mut self,
        actor: &Session,
        id: i32,
    ) -> GarageResult<shared::ScheduleEntry> {
        self.set_schedule_status(actor, id, ScheduleStatus::Done)
    }
}
