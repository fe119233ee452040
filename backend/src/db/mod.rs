pub mod schema;

use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Text;
use diesel::SqliteConnection;

const CREATE_TABLES: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin', 'mechanic')),
            full_name TEXT
        )",
    ),
    (
        "customers",
        "CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            car_model TEXT NOT NULL,
            vin TEXT UNIQUE NOT NULL,
            issue TEXT,
            date_added TEXT
        )",
    ),
    (
        "repairs",
        "CREATE TABLE IF NOT EXISTS repairs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vehicle TEXT NOT NULL,
            customer_name TEXT NOT NULL,
            car_model TEXT NOT NULL,
            vin TEXT NOT NULL,
            issue TEXT,
            status TEXT NOT NULL,
            start_date TEXT,
            assigned_mechanic TEXT,
            priority TEXT,
            estimated_hours REAL,
            estimated_cost REAL,
            end_date TEXT
        )",
    ),
    (
        "inventory",
        "CREATE TABLE IF NOT EXISTS inventory (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            part_name TEXT UNIQUE NOT NULL,
            quantity INTEGER NOT NULL,
            price REAL NOT NULL DEFAULT 0,
            supplier TEXT,
            last_ordered TEXT
        )",
    ),
    (
        "schedules",
        "CREATE TABLE IF NOT EXISTS schedules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mechanic TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            task TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
        )",
    ),
    (
        "login_logs",
        "CREATE TABLE IF NOT EXISTS login_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT,
            role TEXT,
            login_time TEXT
        )",
    ),
];

/// Columns that older database files may lack: (table, column, declaration).
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    ("inventory", "price", "REAL NOT NULL DEFAULT 0"),
    ("inventory", "supplier", "TEXT"),
    ("inventory", "last_ordered", "TEXT"),
    ("schedules", "status", "TEXT NOT NULL DEFAULT 'pending'"),
    ("repairs", "customer_name", "TEXT NOT NULL DEFAULT ''"),
    ("repairs", "car_model", "TEXT NOT NULL DEFAULT ''"),
    ("repairs", "vin", "TEXT NOT NULL DEFAULT ''"),
    ("repairs", "issue", "TEXT"),
    ("repairs", "assigned_mechanic", "TEXT"),
    ("repairs", "priority", "TEXT"),
    ("repairs", "estimated_hours", "REAL"),
    ("repairs", "estimated_cost", "REAL"),
    ("repairs", "end_date", "TEXT"),
];

#[derive(Debug, QueryableByName)]
struct ColumnInfo {
    #[diesel(sql_type = Text)]
    name: String,
}

pub fn create_tables(conn: &mut SqliteConnection) -> QueryResult<()> {
    for (table, ddl) in CREATE_TABLES {
        sql_query(*ddl).execute(conn)?;
        tracing::debug!(table, "table ready");
    }
    Ok(())
}

pub fn table_columns(conn: &mut SqliteConnection, table: &str) -> QueryResult<Vec<String>> {
    let columns: Vec<ColumnInfo> = sql_query("SELECT name FROM pragma_table_info(?)")
        .bind::<Text, _>(table)
        .load(conn)?;
    Ok(columns.into_iter().map(|c| c.name).collect())
}

/// Bring a database created by an earlier revision up to the current column
/// set. Returns the `table.column` names that were added.
pub fn add_missing_columns(conn: &mut SqliteConnection) -> QueryResult<Vec<String>> {
    let mut added = Vec::new();
    for (table, column, declaration) in ADDED_COLUMNS {
        let existing = table_columns(conn, table)?;
        if existing.iter().any(|c| c == column) {
            continue;
        }
        sql_query(format!("ALTER TABLE {table} ADD COLUMN {column} {declaration}"))
            .execute(conn)?;
        tracing::info!(table, column, "added missing column");
        added.push(format!("{table}.{column}"));
    }
    Ok(added)
}
