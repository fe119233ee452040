use diesel::prelude::*;
use shared::{RepairStatus, Session, UpdateRepair};

use super::{non_negative, now_stamp, require_admin, Store};
use crate::db::schema::repairs;
use crate::error::{GarageError, GarageResult};
use crate::models::{self, Repair};

impl Store {
    /// Admins see every ticket; mechanics only the ones assigned to them.
    pub fn list_repairs(&mut self, actor: &Session) -> GarageResult<Vec<shared::Repair>> {
        let mut query = repairs::table
            .order(repairs::id.desc())
            .select(Repair::as_select())
            .into_boxed();
        if !actor.is_admin() {
            query = query.filter(repairs::assigned_mechanic.eq(actor.full_name.clone()));
        }
        let rows = query.load(&mut self.conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub(crate) fn repairs_for_mechanic(&mut self, mechanic: &str) -> GarageResult<Vec<shared::Repair>> {
        let rows = repairs::table
            .filter(repairs::assigned_mechanic.eq(mechanic))
            .select(Repair::as_select())
            .load(&mut self.conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn load_repair(&mut self, actor: &Session, id: i32) -> GarageResult<Repair> {
        let repair = repairs::table
            .find(id)
            .select(Repair::as_select())
            .first(&mut self.conn)
            .optional()?
            .ok_or_else(|| GarageError::not_found(format!("Repair {id} not found")))?;

        if !actor.is_admin() && repair.assigned_mechanic.as_deref() != Some(actor.full_name.as_str()) {
            return Err(GarageError::forbidden(format!(
                "Repair {id} is not assigned to you"
            )));
        }
        Ok(repair)
    }

    pub fn repair(&mut self, actor: &Session, id: i32) -> GarageResult<shared::Repair> {
        Ok(self.load_repair(actor, id)?.into())
    }

    fn apply_repair_change(
        &mut self,
        id: i32,
        change: &models::UpdateRepair,
    ) -> GarageResult<shared::Repair> {
        let updated = diesel::update(repairs::table.find(id))
            .set(change)
            .returning(Repair::as_returning())
            .get_result(&mut self.conn)?;
        Ok(updated.into())
    }

    /// Marking a repair done stamps its end date; reopening it clears the date.
    pub fn set_repair_status(
        &mut self,
        actor: &Session,
        id: i32,
        status: RepairStatus,
    ) -> GarageResult<shared::Repair> {
        self.load_repair(actor, id)?;
        let end_date = match status {
            RepairStatus::Repaired => Some(now_stamp()),
            RepairStatus::Pending => None,
        };
        let change = models::UpdateRepair {
            status: Some(status.as_str().to_string()),
            end_date: Some(end_date),
            ..Default::default()
        };
        let repair = self.apply_repair_change(id, &change)?;
        tracing::info!(repair_id = id, status = status.as_str(), by = %actor.username, "repair status changed");
        Ok(repair)
    }

    pub fn edit_repair(
        &mut self,
        actor: &Session,
        id: i32,
        req: &UpdateRepair,
    ) -> GarageResult<shared::Repair> {
        require_admin(actor, "edit repair details")?;
        self.load_repair(actor, id)?;

        let hours = non_negative(req.estimated_hours, "Estimated hours")?;
        let cost = req
            .estimated_cost
            .map(|c| non_negative(c, "Estimated cost"))
            .transpose()?;

        let mechanic = req.assigned_mechanic.trim();
        let assigned = if mechanic.is_empty() {
            None
        } else {
            if !self.is_mechanic_name(mechanic)? {
                return Err(GarageError::validation(format!(
                    "'{mechanic}' is not a registered mechanic"
                )));
            }
            Some(mechanic.to_string())
        };

        let change = models::UpdateRepair {
            assigned_mechanic: Some(assigned),
            priority: Some(Some(req.priority.as_str().to_string())),
            estimated_hours: Some(Some(hours)),
            estimated_cost: Some(cost),
            ..Default::default()
        };
        let repair = self.apply_repair_change(id, &change)?;
        tracing::info!(repair_id = id, mechanic = ?repair.assigned_mechanic, "repair details updated");
        Ok(repair)
    }

    pub fn update_repair_notes(
        &mut self,
        actor: &Session,
        id: i32,
        notes: &str,
    ) -> GarageResult<shared::Repair> {
        self.load_repair(actor, id)?;
        let notes = notes.trim();
        let change = models::UpdateRepair {
            issue: Some((!notes.is_empty()).then(|| notes.to_string())),
            ..Default::default()
        };
        self.apply_repair_change(id, &change)
    }
}
