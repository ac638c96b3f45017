//! # Seed Data Generator
//!
//! Populates the database with demo accounts and products for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by DATABASE_PATH (default ./stockadoodle.db)
//! cargo run -p stockadoodle-api --bin seed
//!
//! # Specify database path
//! cargo run -p stockadoodle-api --bin seed -- --db ./data/stockadoodle.db
//! ```
//!
//! ## Generated Data
//! - One account per role: `admin`, `manager`, `retailer`
//! - Described categories, plus an empty "Frozen" one
//! - Products across Beverages, Snacks, Dairy, Bakery and Household
//! - A few items below their reorder threshold, out of stock, or
//!   expiring within the week, so every alert status shows up
//! - A handful of sales by the demo retailer

use chrono::{Duration, Utc};
use std::env;
use stockadoodle_api::auth::hash_password;
use stockadoodle_api::ApiConfig;
use stockadoodle_core::{NewCategory, NewProduct, NewUser, Role};
use stockadoodle_db::{Database, DbConfig, DbError};

/// Password shared by the demo accounts.
const DEMO_PASSWORD: &str = "stockadoodle";

/// (username, full name, e-mail, role)
const DEMO_USERS: &[(&str, &str, &str, Role)] = &[
    ("admin", "Ada Admin", "admin@stockadoodle.local", Role::Admin),
    ("manager", "Max Manager", "manager@stockadoodle.local", Role::Manager),
    ("retailer", "Rae Retailer", "retailer@stockadoodle.local", Role::Retailer),
];

/// (name, description)
const DEMO_CATEGORIES: &[(&str, &str)] = &[
    ("Beverages", "Soft drinks, juice and water"),
    ("Snacks", "Chips, nuts and confectionery"),
    ("Dairy", "Chilled milk products"),
    ("Bakery", "Bread and pastries baked daily"),
    ("Household", "Cleaning and paper goods"),
    ("Frozen", "Freezer stock"),
];

/// (name, category, quantity, reorder threshold, price cents, expires in days)
const DEMO_PRODUCTS: &[(&str, &str, i64, i64, i64, Option<i64>)] = &[
    ("Cola 330ml", "Beverages", 120, 24, 125, None),
    ("Orange Juice 1L", "Beverages", 18, 12, 299, Some(5)),
    ("Mineral Water 500ml", "Beverages", 200, 48, 89, None),
    ("Iced Tea 500ml", "Beverages", 6, 12, 149, None),
    ("Potato Chips", "Snacks", 60, 15, 199, Some(90)),
    ("Chocolate Bar", "Snacks", 0, 20, 129, Some(180)),
    ("Salted Peanuts", "Snacks", 35, 10, 249, Some(120)),
    ("Whole Milk 1L", "Dairy", 14, 10, 179, Some(3)),
    ("Greek Yogurt", "Dairy", 4, 8, 229, Some(2)),
    ("Cheddar Cheese", "Dairy", 22, 6, 549, Some(30)),
    ("White Bread", "Bakery", 9, 10, 259, Some(1)),
    ("Croissant", "Bakery", 16, 6, 149, Some(-1)),
    ("Dish Soap", "Household", 40, 10, 349, None),
    ("Paper Towels", "Household", 3, 8, 499, None),
];

/// (product index, quantity) sold by the demo retailer.
const DEMO_SALES: &[(usize, i64)] = &[(0, 6), (2, 10), (4, 3), (7, 2), (12, 1)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = ApiConfig::load()?.database_path;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("StockaDoodle Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("StockaDoodle Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Accounts
    let password_hash = hash_password(DEMO_PASSWORD)?;
    let mut retailer_id = None;
    for (username, full_name, email, role) in DEMO_USERS {
        let input = NewUser {
            username: username.to_string(),
            password: DEMO_PASSWORD.to_string(),
            full_name: full_name.to_string(),
            email: Some(email.to_string()),
            role: *role,
            mfa_enabled: false,
        };

        match db.users().create(&input, &password_hash, None).await {
            Ok(user) => {
                println!("  + {:<10} {}", user.role, user.username);
                if user.role == Role::Retailer {
                    retailer_id = Some(user.id);
                }
            }
            Err(DbError::UniqueViolation { .. }) => {
                println!("  = {:<10} {} (already exists)", role, username);
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!();
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping products and sales to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating categories...");
    for (name, description) in DEMO_CATEGORIES {
        let input = NewCategory {
            name: name.to_string(),
            description: Some(description.to_string()),
        };
        match db.categories().insert(&input, None).await {
            Ok(_) => println!("  + {}", name),
            Err(DbError::UniqueViolation { .. }) => println!("  = {} (already exists)", name),
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    println!("Generating products...");

    let today = Utc::now().date_naive();
    let mut product_ids = Vec::with_capacity(DEMO_PRODUCTS.len());
    for (name, category, qty, threshold, price, expires_in) in DEMO_PRODUCTS {
        let input = NewProduct {
            name: name.to_string(),
            category: category.to_string(),
            quantity_on_hand: *qty,
            reorder_threshold: *threshold,
            expiration_date: expires_in.map(|days| today + Duration::days(days)),
            price_cents: *price,
        };
        let product = db.products().insert(&input, None).await?;
        product_ids.push(product.id);
    }
    println!("✓ Generated {} products", product_ids.len());

    // Sales
    if let Some(retailer_id) = retailer_id {
        let mut recorded = 0;
        for (index, qty) in DEMO_SALES {
            let Some(product_id) = product_ids.get(*index) else {
                continue;
            };
            match db.sales().record(product_id, &retailer_id, *qty, None).await {
                Ok(_) => recorded += 1,
                Err(e) => eprintln!("Failed to record sale: {}", e),
            }
        }
        println!("✓ Recorded {} sales for 'retailer'", recorded);
    }

    println!();
    println!("✓ Seed complete! Demo password: {}", DEMO_PASSWORD);
    println!("  Admin logins need the MFA code printed in the server log.");

    Ok(())
}
