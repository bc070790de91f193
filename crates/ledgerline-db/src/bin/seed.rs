//! # Seed Data Generator
//!
//! Populates a database with demo rows for two tenants, then exercises the
//! read paths against them.
//!
//! ## Usage
//! ```bash
//! # Use LEDGER_* environment configuration
//! cargo run -p ledgerline-db --bin seed
//!
//! # Specify database path
//! cargo run -p ledgerline-db --bin seed -- --db ./data/ledgerline.db
//! ```
//!
//! ## Generated Rows
//! Per tenant, in the `env_sandbox` environment:
//! - Tax rates (percentage and fixed)
//! - Import and export tasks
//! - Credit notes with line items
//! - One private API key

use std::env;

use ledgerline_core::dsl::{FilterCondition, FilterOperator, FilterValue};
use ledgerline_core::filter::{CreditNoteFilter, TaxRateFilter};
use ledgerline_core::{CoreResult, CreditNote, RequestContext, Secret, Task, TaskType, TaxRate, TaxRateType};
use ledgerline_db::{Database, DbConfig, LedgerConfig};
use tracing_subscriber::EnvFilter;

const TENANTS: &[&str] = &["tenant_acme", "tenant_globex"];
const ENVIRONMENT: &str = "env_sandbox";

/// (code, name, percentage)
const PERCENTAGE_RATES: &[(&str, &str, f64)] = &[
    ("VAT20", "UK VAT", 20.0),
    ("GST10", "AU GST", 10.0),
    ("SALES825", "Texas sales tax", 8.25),
];

/// (display name, amount in cents)
const REFUND_LINES: &[(&str, i64)] = &[("Seat refund", 1500), ("Usage credit", 250), ("Goodwill", 1000)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = LedgerConfig::from_env()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database = DbConfig::new(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Ledgerline Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: LEDGER_DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Ledgerline Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database.database_path.display());
    println!("Tenants:  {}", TENANTS.join(", "));
    println!();

    let db = Database::connect(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let probe = context(TENANTS[0]);
    let existing = db.tax_rates().count(&probe, None).await?;
    if existing > 0 {
        println!("⚠ Database already has {} tax rates for {}", existing, TENANTS[0]);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating rows...");
    let start = std::time::Instant::now();
    let mut api_keys = Vec::new();

    for tenant_id in TENANTS {
        let key = seed_tenant(&db, tenant_id).await?;
        println!("  ✓ {}", tenant_id);
        api_keys.push(key);
    }

    println!();
    println!("✓ Seeded {} tenants in {:?}", TENANTS.len(), start.elapsed());

    println!();
    println!("Verifying read paths...");
    for tenant_id in TENANTS {
        let ctx = context(tenant_id);

        let percentage = TaxRateFilter {
            filters: vec![FilterCondition::new(
                "tax_rate_type",
                FilterOperator::Equal,
                FilterValue::String(TaxRateType::Percentage.as_str().to_string()),
            )],
            ..TaxRateFilter::default()
        };
        let rates = db.tax_rates().list(&ctx, Some(&percentage)).await?;
        let notes = db.credit_notes().count(&ctx, Some(&CreditNoteFilter::default())).await?;
        let tasks = db.tasks().count(&ctx, None).await?;
        println!(
            "  {}: {} percentage rates, {} credit notes, {} tasks",
            tenant_id,
            rates.len(),
            notes,
            tasks
        );
    }

    let anonymous = RequestContext::new("");
    for key in &api_keys {
        let secret = db.secrets().get_by_value(&anonymous, key).await?;
        println!("  API key ...{} → {}", secret.display_id, secret.tenant_id);
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

fn context(tenant_id: &str) -> RequestContext {
    RequestContext::new(tenant_id)
        .with_environment(ENVIRONMENT)
        .with_user("seed")
}

/// Seeds one tenant and returns the value of its API key.
async fn seed_tenant(db: &Database, tenant_id: &str) -> CoreResult<String> {
    let ctx = context(tenant_id);

    for (code, name, percentage) in PERCENTAGE_RATES {
        let mut rate = TaxRate::percentage(tenant_id, code, name, *percentage);
        db.tax_rates().create(&ctx, &mut rate).await?;
    }
    let mut fixed = TaxRate::percentage(tenant_id, "ENV5", "Environmental fee", 0.0);
    fixed.tax_rate_type = TaxRateType::Fixed;
    fixed.percentage_value = None;
    fixed.fixed_value_cents = Some(500);
    db.tax_rates().create(&ctx, &mut fixed).await?;

    let mut import = Task::new(tenant_id, TaskType::Import, "events", "s3://seed/events.csv");
    import.file_name = Some("events.csv".to_string());
    db.tasks().create(&ctx, &mut import).await?;
    let mut export = Task::new(tenant_id, TaskType::Export, "invoices", "s3://seed/invoices.csv");
    db.tasks().create(&ctx, &mut export).await?;

    for (n, invoice_id) in ["inv_001", "inv_002"].iter().enumerate() {
        let number = format!("CN-{:04}", n + 1);
        let mut note = CreditNote::new(tenant_id, invoice_id, "cus_001", &number, "usd");
        note.idempotency_key = Some(format!("{}-{}", tenant_id, number));
        for (display_name, amount_cents) in REFUND_LINES {
            note.add_line_item(display_name, *amount_cents);
        }
        db.credit_notes().create_with_line_items(&ctx, &mut note).await?;
    }

    let mut key = Secret::api_key(tenant_id, "Seed server key");
    db.secrets().create(&ctx, &mut key).await?;
    Ok(key.value)
}
