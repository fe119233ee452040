use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};

use backend::config::DEFAULT_DB_PATH;
use backend::store::{DEFAULT_RESTOCK_AMOUNT, DEFAULT_RESTOCK_THRESHOLD};
use backend::{Store, StoreOptions};
use shared::calendar::MonthRange;
use shared::{CreateCustomer, CreatePart, CreateSchedule, EntryCategory, MonthCalendar, Role};

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(name = "garage-cli")]
#[command(about = "Admin CLI for the garage database")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "GARAGE_DB", default_value = DEFAULT_DB_PATH, global = true)]
    db: String,
    /// Account the command runs as
    #[arg(long = "as", env = "GARAGE_USER", default_value = "admin", global = true)]
    user: String,
    /// bcrypt work factor for new passwords
    #[arg(long, env = "BCRYPT_COST", default_value_t = 12, global = true)]
    bcrypt_cost: u32,
    /// Password given to the administrator account when it is first created
    #[arg(long, env = "GARAGE_ADMIN_PASSWORD", default_value = "admin", global = true, hide_env_values = true)]
    admin_password: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tables, migrate old columns and seed the administrator
    Init,
    /// Create a new user
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// admin or mechanic
        #[arg(long, default_value = "mechanic")]
        role: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// List all users
    ListUsers,
    /// Remove a mechanic account
    RemoveMechanic {
        #[arg(long)]
        username: String,
    },
    /// List customers, newest first
    ListCustomers,
    /// Register a customer and open a repair ticket
    AddCustomer {
        #[arg(long)]
        name: String,
        #[arg(long)]
        car_model: String,
        #[arg(long)]
        vin: String,
        #[arg(long)]
        issue: String,
    },
    /// List repair tickets visible to the acting user
    ListRepairs,
    /// List inventory
    ListParts,
    /// Add a part to inventory
    AddPart {
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: i32,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        supplier: String,
    },
    /// Receive stock for a part
    OrderPart {
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: i32,
    },
    /// Take stock out of inventory
    ShipPart {
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: i32,
    },
    /// Top up every part running low
    Restock {
        #[arg(long, default_value_t = DEFAULT_RESTOCK_THRESHOLD)]
        threshold: i32,
        #[arg(long, default_value_t = DEFAULT_RESTOCK_AMOUNT)]
        amount: i32,
    },
    /// Insert the starter parts into an empty inventory
    SeedInventory,
    /// Import parts from a CSV file (part_name,quantity,price,supplier)
    ImportParts {
        /// Path to the CSV file
        #[arg(long)]
        file: PathBuf,
        /// Dry run - parse and validate without writing to the database
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Book a task for a mechanic
    AddSchedule {
        /// Mechanic full name (defaults to the acting mechanic)
        #[arg(long, default_value = "")]
        mechanic: String,
        #[arg(long)]
        task: String,
        /// e.g. "2025-03-14 09:00"
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Mark a schedule entry as done
    MarkDone {
        #[arg(long)]
        id: i32,
    },
    /// Print a mechanic's month calendar
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        /// Mechanic full name (required for administrators)
        #[arg(long)]
        mechanic: Option<String>,
        /// Months to step from the chosen month, e.g. -1 for the one before
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i32,
        /// Print the calendar as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show recent logins
    LoginLogs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

fn open_store(cli: &Cli) -> anyhow::Result<Store> {
    let mut store =
        Store::open(&cli.db).with_context(|| format!("Failed to open database: {}", cli.db))?;
    store
        .initialize(&StoreOptions {
            bcrypt_cost: cli.bcrypt_cost,
            admin_password: cli.admin_password.clone(),
        })
        .context("Failed to initialize database")?;
    Ok(store)
}

// ============================================================================
// CSV import
// ============================================================================

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    part_name: String,
    quantity: String,
    price: String,
    supplier: String,
}

fn parse_row(row: &CsvRow) -> anyhow::Result<CreatePart> {
    let part_name = row.part_name.trim();
    if part_name.is_empty() {
        anyhow::bail!("part_name is empty");
    }
    let supplier = row.supplier.trim();
    if supplier.is_empty() {
        anyhow::bail!("supplier is empty for '{}'", part_name);
    }
    let quantity: i32 = row
        .quantity
        .trim()
        .parse()
        .with_context(|| format!("Invalid quantity: '{}'", row.quantity))?;
    if quantity < 0 {
        anyhow::bail!("Negative quantity for '{}'", part_name);
    }
    let price: f64 = row
        .price
        .trim()
        .trim_start_matches('$')
        .parse()
        .with_context(|| format!("Invalid price: '{}'", row.price))?;
    if !price.is_finite() || price < 0.0 {
        anyhow::bail!("Invalid price for '{}': {}", part_name, price);
    }
    Ok(CreatePart {
        part_name: part_name.to_string(),
        quantity,
        price,
        supplier: supplier.to_string(),
    })
}

fn import_parts(cli: &Cli, file: &PathBuf, dry_run: bool) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut parts: Vec<CreatePart> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for (i, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let line = i + 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                errors.push(format!("Row {}: {}", line, e));
                continue;
            }
        };
        match parse_row(&row) {
            Ok(part) => {
                if !seen.insert(part.part_name.to_lowercase()) {
                    errors.push(format!("Row {}: '{}' listed twice", line, part.part_name));
                    continue;
                }
                parts.push(part);
            }
            Err(e) => errors.push(format!("Row {}: {}", line, e)),
        }
    }

    if !errors.is_empty() {
        println!("Validation errors:");
        for e in &errors {
            println!("  ERROR: {}", e);
        }
        anyhow::bail!("{} validation error(s) found", errors.len());
    }

    if parts.is_empty() {
        println!("No parts found in CSV.");
        return Ok(());
    }

    println!("Parsed {} parts. All rows validated successfully.", parts.len());

    let mut store = open_store(cli)?;
    let actor = store.session_for(&cli.user)?;

    if dry_run {
        let existing: HashSet<String> = store
            .list_parts()?
            .into_iter()
            .map(|p| p.part_name)
            .collect();
        println!("\n[DRY RUN] Would import:");
        for part in &parts {
            if existing.contains(&part.part_name) {
                println!("  SKIP {} (already exists)", part.part_name);
            } else {
                println!(
                    "  {} - qty {} @ {:.2} from {}",
                    part.part_name, part.quantity, part.price, part.supplier
                );
            }
        }
        return Ok(());
    }

    let summary = store.import_parts(&actor, &parts)?;
    for name in &summary.skipped {
        println!("  SKIP {} (already exists)", name);
    }
    println!(
        "\nImport complete: {} imported, {} skipped",
        summary.imported,
        summary.skipped.len()
    );
    Ok(())
}

// ============================================================================
// Calendar rendering
// ============================================================================

fn category_label(category: EntryCategory) -> &'static str {
    match category {
        EntryCategory::DoneLate => "done (late)",
        EntryCategory::Done => "done",
        EntryCategory::Late => "LATE",
        EntryCategory::Task => "pending",
        EntryCategory::Service => "in service",
    }
}

fn render_calendar(calendar: &MonthCalendar, range: &MonthRange) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} - {}\n", range.label(), calendar.mechanic));
    out.push_str(" Sun  Mon  Tue  Wed  Thu  Fri  Sat\n");
    for week in range.weeks() {
        for cell in week {
            match cell {
                Some(day) => {
                    let marker = if calendar.day(day).is_empty() { ' ' } else { '*' };
                    out.push_str(&format!(" {:>3}{}", day, marker));
                }
                None => out.push_str("     "),
            }
        }
        out.push('\n');
    }

    for day in 1..=range.days() {
        for entry in calendar.day(day) {
            let end = entry
                .end
                .map(|e| e.format("%H:%M").to_string())
                .unwrap_or_else(|| "--:--".to_string());
            out.push_str(&format!(
                "\n{:>3}  {}-{}  {} {}  [{}]",
                day,
                entry.start.format("%H:%M"),
                end,
                entry.kind.label_prefix(),
                entry.description,
                category_label(entry.category)
            ));
        }
    }
    if !calendar.is_empty() {
        out.push('\n');
    }

    for warning in &calendar.warnings {
        out.push_str(&format!(
            "\nWARNING: {:?} {} has unreadable start '{}'",
            warning.kind, warning.id, warning.value
        ));
    }
    if !calendar.warnings.is_empty() {
        out.push('\n');
    }

    let step = |link: Option<shared::MonthRef>| {
        link.map(|m| format!("{}-{:02}", m.year, m.month))
            .unwrap_or_else(|| "-".to_string())
    };
    out.push_str(&format!(
        "\nprev {}  next {}\n",
        step(calendar.previous),
        step(calendar.next)
    ));
    out
}

// ============================================================================
// Main
// ============================================================================

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init => {
            open_store(&cli)?;
            println!("Database ready: {}", cli.db);
        }

        Commands::CreateUser {
            username,
            password,
            role,
            full_name,
        } => {
            let role = Role::parse(role)
                .with_context(|| format!("Unknown role '{}' (use admin or mechanic)", role))?;
            let mut store = open_store(&cli)?;
            let user = store.create_user(username, password, role, full_name.as_deref())?;
            println!("Created {}: {}", user.role.as_str(), user.username);
        }

        Commands::ListUsers => {
            let mut store = open_store(&cli)?;
            println!(
                "{:<5} {:<20} {:<30} {:<10}",
                "ID", "Username", "Full name", "Role"
            );
            println!("{}", "-".repeat(70));
            for user in store.list_users()? {
                println!(
                    "{:<5} {:<20} {:<30} {:<10}",
                    user.id,
                    user.username,
                    user.full_name.unwrap_or_default(),
                    user.role.as_str()
                );
            }
        }

        Commands::RemoveMechanic { username } => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            store.remove_mechanic(&actor, username)?;
            println!("Removed mechanic: {}", username);
        }

        Commands::ListCustomers => {
            let mut store = open_store(&cli)?;
            println!(
                "{:<5} {:<25} {:<20} {:<20} {:<28}",
                "ID", "Name", "Car", "VIN", "Added"
            );
            println!("{}", "-".repeat(100));
            for c in store.list_customers()? {
                println!(
                    "{:<5} {:<25} {:<20} {:<20} {:<28}",
                    c.id,
                    c.name,
                    c.car_model,
                    c.vin,
                    c.date_added.unwrap_or_default()
                );
            }
        }

        Commands::AddCustomer {
            name,
            car_model,
            vin,
            issue,
        } => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            let customer = store.add_customer(
                &actor,
                &CreateCustomer {
                    name: name.clone(),
                    car_model: car_model.clone(),
                    vin: vin.clone(),
                    issue: issue.clone(),
                },
            )?;
            println!(
                "Added customer {} ({} {}) and opened a repair ticket",
                customer.name, customer.car_model, customer.vin
            );
        }

        Commands::ListRepairs => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            println!(
                "{:<5} {:<30} {:<20} {:<10} {:<8} {:<20}",
                "ID", "Vehicle", "Customer", "Status", "Priority", "Mechanic"
            );
            println!("{}", "-".repeat(98));
            for r in store.list_repairs(&actor)? {
                println!(
                    "{:<5} {:<30} {:<20} {:<10} {:<8} {:<20}",
                    r.id,
                    r.vehicle,
                    r.customer_name,
                    r.status,
                    r.priority.unwrap_or_default(),
                    r.assigned_mechanic.unwrap_or_default()
                );
            }
        }

        Commands::ListParts => {
            let mut store = open_store(&cli)?;
            println!(
                "{:<5} {:<25} {:>8} {:>10} {:<20} {:<28}",
                "ID", "Part", "Qty", "Price", "Supplier", "Last ordered"
            );
            println!("{}", "-".repeat(100));
            for p in store.list_parts()? {
                println!(
                    "{:<5} {:<25} {:>8} {:>10.2} {:<20} {:<28}",
                    p.id,
                    p.part_name,
                    p.quantity,
                    p.price,
                    p.supplier.unwrap_or_default(),
                    p.last_ordered.unwrap_or_default()
                );
            }
        }

        Commands::AddPart {
            name,
            quantity,
            price,
            supplier,
        } => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            let part = store.add_part(
                &actor,
                &CreatePart {
                    part_name: name.clone(),
                    quantity: *quantity,
                    price: *price,
                    supplier: supplier.clone(),
                },
            )?;
            println!("Added part: {} (qty {})", part.part_name, part.quantity);
        }

        Commands::OrderPart { name, quantity } => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            let part = store.order_part(&actor, name, *quantity)?;
            println!("Ordered {} x {}; now {} in stock", quantity, part.part_name, part.quantity);
        }

        Commands::ShipPart { name, quantity } => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            let part = store.ship_part(&actor, name, *quantity)?;
            println!("Shipped {} x {}; {} left", quantity, part.part_name, part.quantity);
        }

        Commands::Restock { threshold, amount } => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            let restocked = store.restock_low(&actor, *threshold, *amount)?;
            if restocked.is_empty() {
                println!("Nothing below {} units.", threshold);
            } else {
                println!("Restocked +{} each:", amount);
                for name in restocked {
                    println!("  - {}", name);
                }
            }
        }

        Commands::SeedInventory => {
            let mut store = open_store(&cli)?;
            let inserted = store.seed_inventory()?;
            if inserted == 0 {
                println!("Inventory already has parts; nothing seeded.");
            } else {
                println!("Seeded {} starter parts.", inserted);
            }
        }

        Commands::ImportParts { file, dry_run } => {
            import_parts(&cli, file, *dry_run)?;
        }

        Commands::AddSchedule {
            mechanic,
            task,
            start,
            end,
        } => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            let entry = store.add_schedule(
                &actor,
                &CreateSchedule {
                    mechanic: mechanic.clone(),
                    task: task.clone(),
                    start: start.clone(),
                    end: end.clone(),
                },
            )?;
            println!(
                "Scheduled #{} for {}: {} to {}",
                entry.id, entry.mechanic, entry.start_time, entry.end_time
            );
        }

        Commands::MarkDone { id } => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            let entry = store.mark_schedule_done(&actor, *id)?;
            println!("Schedule #{} marked {}", entry.id, entry.status);
        }

        Commands::Calendar {
            year,
            month,
            mechanic,
            offset,
            json,
        } => {
            let now = Local::now().naive_local();
            let current = MonthRange::containing(now.date());
            let range = MonthRange::new(
                year.unwrap_or(current.year),
                month.unwrap_or(current.month),
            )?
            .shift(*offset)?;
            let (year, month) = (range.year, range.month);

            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            let calendar =
                store.month_calendar(&actor, year, month, mechanic.as_deref(), now)?;
            tracing::debug!(entries = calendar.entries().count(), "calendar loaded");

            if *json {
                println!("{}", serde_json::to_string_pretty(&calendar)?);
            } else {
                print!("{}", render_calendar(&calendar, &range));
            }
        }

        Commands::LoginLogs { limit } => {
            let mut store = open_store(&cli)?;
            let actor = store.session_for(&cli.user)?;
            println!("{:<5} {:<20} {:<10} {:<28}", "ID", "Username", "Role", "Time");
            println!("{}", "-".repeat(65));
            for log in store.login_logs(&actor, *limit)? {
                println!(
                    "{:<5} {:<20} {:<10} {:<28}",
                    log.id,
                    log.username.unwrap_or_default(),
                    log.role.unwrap_or_default(),
                    log.login_time.unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
