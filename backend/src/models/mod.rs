use diesel::prelude::*;
use shared::Role;

use crate::db::schema::*;

// ============================================================================
// User
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub role: String,
    pub full_name: Option<String>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    /// Name shown on repair assignments and schedules; falls back to the
    /// username for accounts registered without one.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: String,
    pub full_name: Option<String>,
}

// ============================================================================
// Customer
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = customers)]
pub struct Customer {
    pub id: i32,
    pub name: String,
    pub car_model: String,
    pub vin: String,
    pub issue: Option<String>,
    pub date_added: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub name: String,
    pub car_model: String,
    pub vin: String,
    pub issue: Option<String>,
    pub date_added: Option<String>,
}

// ============================================================================
// Repair
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = repairs)]
pub struct Repair {
    pub id: i32,
    pub vehicle: String,
    pub customer_name: String,
    pub car_model: String,
    pub vin: String,
    pub issue: Option<String>,
    pub status: String,
    pub start_date: Option<String>,
    pub assigned_mechanic: Option<String>,
    pub priority: Option<String>,
    pub estimated_hours: Option<f64>,
    pub estimated_cost: Option<f64>,
    pub end_date: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = repairs)]
pub struct NewRepair {
    pub vehicle: String,
    pub customer_name: String,
    pub car_model: String,
    pub vin: String,
    pub issue: Option<String>,
    pub status: String,
    pub start_date: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = repairs)]
pub struct UpdateRepair {
    pub issue: Option<Option<String>>,
    pub status: Option<String>,
    pub assigned_mechanic: Option<Option<String>>,
    pub priority: Option<Option<String>>,
    pub estimated_hours: Option<Option<f64>>,
    pub estimated_cost: Option<Option<f64>>,
    pub end_date: Option<Option<String>>,
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = inventory)]
pub struct Part {
    pub id: i32,
    pub part_name: String,
    pub quantity: i32,
    pub price: f64,
    pub supplier: Option<String>,
    pub last_ordered: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inventory)]
pub struct NewPart {
    pub part_name: String,
    pub quantity: i32,
    pub price: f64,
    pub supplier: Option<String>,
    pub last_ordered: Option<String>,
}

// ============================================================================
// Schedule
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schedules)]
pub struct Schedule {
    pub id: i32,
    pub mechanic: String,
    pub start_time: String,
    pub end_time: String,
    pub task: Option<String>,
    pub status: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schedules)]
pub struct NewSchedule {
    pub mechanic: String,
    pub start_time: String,
    pub end_time: String,
    pub task: Option<String>,
    pub status: String,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = schedules)]
pub struct UpdateSchedule {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub task: Option<Option<String>>,
    pub status: Option<String>,
}

// ============================================================================
// LoginLog
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = login_logs)]
pub struct LoginLog {
    pub id: i32,
    pub username: Option<String>,
    pub role: Option<String>,
    pub login_time: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = login_logs)]
pub struct NewLoginLog {
    pub username: Option<String>,
    pub role: Option<String>,
    pub login_time: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<User> for shared::User {
    fn from(u: User) -> Self {
        shared::User {
            id: u.id,
            role: u.role().unwrap_or(Role::Mechanic),
            username: u.username,
            full_name: u.full_name,
        }
    }
}

impl From<Customer> for shared::Customer {
    fn from(c: Customer) -> Self {
        shared::Customer {
            id: c.id,
            name: c.name,
            car_model: c.car_model,
            vin: c.vin,
            issue: c.issue,
            date_added: c.date_added,
        }
    }
}

impl From<Repair> for shared::Repair {
    fn from(r: Repair) -> Self {
        shared::Repair {
            id: r.id,
            vehicle: r.vehicle,
            customer_name: r.customer_name,
            car_model: r.car_model,
            vin: r.vin,
            issue: r.issue,
            status: r.status,
            start_date: r.start_date,
            assigned_mechanic: r.assigned_mechanic,
            priority: r.priority,
            estimated_hours: r.estimated_hours,
            estimated_cost: r.estimated_cost,
            end_date: r.end_date,
        }
    }
}

impl From<Part> for shared::InventoryPart {
    fn from(p: Part) -> Self {
        shared::InventoryPart {
            id: p.id,
            part_name: p.part_name,
            quantity: p.quantity,
            price: p.price,
            supplier: p.supplier,
            last_ordered: p.last_ordered,
        }
    }
}

impl From<Schedule> for shared::ScheduleEntry {
    fn from(s: Schedule) -> Self {
        shared::ScheduleEntry {
            id: s.id,
            mechanic: s.mechanic,
            start_time: s.start_time,
            end_time: s.end_time,
            task: s.task,
            status: s.status,
        }
    }
}

impl From<LoginLog> for shared::LoginLog {
    fn from(l: LoginLog) -> Self {
        shared::LoginLog {
            id: l.id,
            username: l.username,
            role: l.role,
            login_time: l.login_time,
        }
    }
}
