use diesel::prelude::*;
use shared::{CreateCustomer, Priority, RepairStatus, Session};

use super::{now_stamp, required, Store};
use crate::db::schema::{customers, repairs};
use crate::error::{conflict_on_unique, GarageError, GarageResult};
use crate::models::{Customer, NewCustomer, NewRepair};

const DUPLICATE_VIN: &str = "VIN already exists in system";

impl Store {
    /// Register a customer and open a pending repair ticket for their car.
    ///
    /// Both rows are written in one transaction; a duplicate VIN leaves the
    /// database untouched.
    pub fn add_customer(
        &mut self,
        actor: &Session,
        req: &CreateCustomer,
    ) -> GarageResult<shared::Customer> {
        let name = required(&req.name, "Customer name")?;
        let car_model = required(&req.car_model, "Car model")?;
        let vin = required(&req.vin, "VIN")?;
        let issue = required(&req.issue, "Issue")?;
        let now = now_stamp();

        let customer = self.conn.transaction::<_, GarageError, _>(|conn| {
            let taken: i64 = customers::table
                .filter(customers::vin.eq(&vin))
                .count()
                .get_result(conn)?;
            if taken > 0 {
                return Err(GarageError::Conflict(DUPLICATE_VIN.to_string()));
            }

            let customer = diesel::insert_into(customers::table)
                .values(&NewCustomer {
                    name: name.clone(),
                    car_model: car_model.clone(),
                    vin: vin.clone(),
                    issue: Some(issue.clone()),
                    date_added: Some(now.clone()),
                })
                .returning(Customer::as_returning())
                .get_result(conn)
                .map_err(conflict_on_unique(DUPLICATE_VIN))?;

            diesel::insert_into(repairs::table)
                .values(&NewRepair {
                    vehicle: format!("{car_model} ({vin})"),
                    customer_name: name.clone(),
                    car_model: car_model.clone(),
                    vin: vin.clone(),
                    issue: Some(issue.clone()),
                    status: RepairStatus::Pending.as_str().to_string(),
                    start_date: Some(now.clone()),
                    priority: Some(Priority::Medium.as_str().to_string()),
                })
                .execute(conn)?;

            Ok(customer)
        })?;

        tracing::info!(
            customer_id = customer.id,
            vin = %customer.vin,
            added_by = %actor.username,
            "registered customer and opened repair"
        );
        Ok(customer.into())
    }

    pub fn list_customers(&mut self) -> GarageResult<Vec<shared::Customer>> {
        let rows = customers::table
            .order((customers::date_added.desc(), customers::id.desc()))
            .select(Customer::as_select())
            .load(&mut self.conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
