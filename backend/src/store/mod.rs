//! The storage handle every surface drives.
//!
//! A `Store` owns the one SQLite connection for the life of the process.
//! Operations that depend on who is asking take the acting [`Session`] and
//! apply the admin/mechanic rules themselves, so the CLI and the HTTP routes
//! share one set of checks.

mod calendar;
mod customers;
mod inventory;
mod repairs;
mod schedules;
mod users;

pub use inventory::{ImportSummary, DEFAULT_RESTOCK_AMOUNT, DEFAULT_RESTOCK_THRESHOLD};

use diesel::prelude::*;
use diesel::SqliteConnection;
use shared::Session;

use crate::db;
use crate::error::{GarageError, GarageResult};

/// Format used for every timestamp this crate writes, except schedule times.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub bcrypt_cost: u32,
    pub admin_password: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin_password: "admin".to_string(),
        }
    }
}

pub struct Store {
    conn: SqliteConnection,
    bcrypt_cost: u32,
}

impl Store {
    pub fn open(path: &str) -> GarageResult<Self> {
        tracing::debug!(path, "opening garage database");
        let conn = SqliteConnection::establish(path)?;
        Ok(Self {
            conn,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        })
    }

    pub fn open_in_memory() -> GarageResult<Self> {
        Self::open(":memory:")
    }

    /// Create missing tables, bring legacy tables up to the current column
    /// set and make sure an administrator account exists.
    pub fn initialize(&mut self, options: &StoreOptions) -> GarageResult<()> {
        self.bcrypt_cost = options.bcrypt_cost;
        db::create_tables(&mut self.conn)?;
        let added = db::add_missing_columns(&mut self.conn)?;
        if !added.is_empty() {
            tracing::info!(columns = ?added, "migrated legacy columns");
        }
        self.seed_admin(&options.admin_password)?;
        Ok(())
    }
}

pub(crate) fn now_stamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Trimmed value of a required text field.
pub(crate) fn required(value: &str, field: &str) -> GarageResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GarageError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn require_admin(actor: &Session, action: &str) -> GarageResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(GarageError::forbidden(format!(
            "Only administrators can {action}"
        )))
    }
}

pub(crate) fn non_negative(value: f64, field: &str) -> GarageResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(GarageError::validation(format!(
            "{field} must be a non-negative number"
        )))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_idempotent() {
        let mut store = testing::store();
        store.initialize(&StoreOptions::default()).unwrap();
        let admins = store
            .list_users()
            .unwrap()
            .into_iter()
            .filter(|u| u.role == shared::Role::Admin)
            .count();
        assert_eq!(admins, 1);
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("  Civic ", "Car model").unwrap(), "Civic");
        let err = required("   ", "Car model").unwrap_err();
        assert_eq!(err.to_string(), "Car model is required");
    }

    #[test]
    fn non_negative_rejects_nan_and_negatives() {
        assert!(non_negative(f64::NAN, "Hours").is_err());
        assert!(non_negative(-1.0, "Hours").is_err());
        assert_eq!(non_negative(2.5, "Hours").unwrap(), 2.5);
    }
}
