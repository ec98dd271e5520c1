//! # Coupon Catalog Seeder
//!
//! Writes the default coupon set into the database for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./checkout_dev.db if its coupon table is empty
//! cargo run -p checkout-db --bin seed
//!
//! # Specify database path
//! cargo run -p checkout-db --bin seed -- --db ./data/checkout.db
//!
//! # Replace whatever is there with the defaults
//! cargo run -p checkout-db --bin seed -- --force
//! ```
//!
//! ## Seeded Coupons
//! SAVE10, WELCOME5, B2G1, BOGO, FRESH15 and BIG20, each valid from now for
//! one year.

use chrono::Utc;
use std::env;

use checkout_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./checkout_dev.db");
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--force" | "-f" => force = true,
            "--help" | "-h" => {
                println!("Coupon Catalog Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./checkout_dev.db)");
                println!("  -f, --force        Replace existing coupons with the defaults");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Coupon Catalog Seeder");
    println!("========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.coupons().count().await?;
    if existing > 0 && !force {
        println!("⚠ Database already has {} coupons", existing);
        println!("  Pass --force to replace them with the defaults.");
        return Ok(());
    }

    let seeded = db.coupons().reset_to_defaults(Utc::now()).await?;

    println!();
    for coupon in &seeded {
        println!(
            "  {:<10} {:<18} {}",
            coupon.code,
            coupon.kind.tag().to_string(),
            coupon.description
        );
    }
    println!();
    println!("✓ Seeded {} coupons", seeded.len());

    db.close().await;
    Ok(())
}
