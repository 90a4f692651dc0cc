//! # Seed Data Generator
//!
//! Populates a development database with a small restaurant's ingredient
//! stock, product recipes and supplier invoices.
//!
//! ## Usage
//! ```bash
//! # Seed ./mizan_dev.db
//! cargo run -p mizan-db --bin seed
//!
//! # Specify database path
//! cargo run -p mizan-db --bin seed -- --db ./data/mizan.db
//!
//! # Number of months of supplier invoices (default 3)
//! cargo run -p mizan-db --bin seed -- --months 6
//! ```
//!
//! ## Generated Data
//! - Ingredients with a stock level and low-stock threshold
//! - Recipes mapping menu product ids to ingredient amounts
//! - Supplier invoices at 15% VAT, a few per month, ending this month

use chrono::{Datelike, Duration, TimeZone, Utc};
use mizan_core::{InventoryItem, Measure, Money, PurchaseInvoice, RecipeComponent, TaxRate};
use mizan_db::{Database, DbConfig};
use std::env;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (id, name, unit, quantity in thousandths, low-stock threshold in thousandths)
const INGREDIENTS: &[(&str, &str, &str, i64, i64)] = &[
    ("chicken", "Chicken", "g", 25_000_000, 5_000_000),
    ("lamb", "Lamb", "g", 12_000_000, 3_000_000),
    ("rice", "Basmati Rice", "g", 40_000_000, 8_000_000),
    ("bread", "Saj Bread", "pc", 300_000, 60_000),
    ("garlic_sauce", "Garlic Sauce", "ml", 6_000_000, 1_500_000),
    ("potato", "Potato", "g", 20_000_000, 4_000_000),
    ("tea", "Black Tea", "g", 2_000_000, 500_000),
    ("milk", "Milk", "ml", 15_000_000, 4_000_000),
    ("laban", "Laban Bottle", "pc", 48_000, 24_000),
];

/// (product id, ingredient id, amount per unit sold in thousandths)
const RECIPES: &[(&str, &str, i64)] = &[
    ("chicken_shawarma", "chicken", 150_000),
    ("chicken_shawarma", "bread", 1_000),
    ("chicken_shawarma", "garlic_sauce", 30_000),
    ("chicken_mandi", "chicken", 500_000),
    ("chicken_mandi", "rice", 250_000),
    ("lamb_kabsa", "lamb", 350_000),
    ("lamb_kabsa", "rice", 300_000),
    ("fries", "potato", 200_000),
    ("karak_tea", "tea", 8_000),
    ("karak_tea", "milk", 120_000),
    ("laban", "laban", 1_000),
];

/// (supplier, tax number, subtotal in halalas)
const SUPPLIERS: &[(&str, &str, i64)] = &[
    ("Riyadh Poultry Co.", "310122334400003", 480_000),
    ("Najd Meat Traders", "310455667700003", 620_000),
    ("Al Wadi Grains", "310988776600003", 210_000),
    ("Fresh Dairy Est.", "310223344500003", 95_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .try_init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut months: u32 = 3;
    let mut db_path = String::from("./mizan_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--months" | "-m" => {
                if i + 1 < args.len() {
                    months = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mizan POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -m, --months <N>   Months of supplier invoices (default: 3)");
                println!("  -d, --db <PATH>    Database file path (default: ./mizan_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Mizan POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Months:   {}", months);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.inventory().count_items().await?;
    if existing > 0 {
        println!("⚠ Database already has {} ingredients", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Ingredients
    let now = Utc::now();
    for (id, name, unit, quantity, threshold) in INGREDIENTS {
        db.inventory()
            .create_item(&InventoryItem {
                id: id.to_string(),
                name: name.to_string(),
                unit: unit.to_string(),
                quantity: Measure::from_milli(*quantity),
                low_stock_threshold: Measure::from_milli(*threshold),
                last_updated: now,
            })
            .await?;
    }
    println!("✓ Created {} ingredients", INGREDIENTS.len());

    // Recipes, grouped per product
    let mut products: Vec<&str> = RECIPES.iter().map(|(product, _, _)| *product).collect();
    products.dedup();
    for product in &products {
        let components: Vec<RecipeComponent> = RECIPES
            .iter()
            .filter(|(p, _, _)| p == product)
            .map(|(p, ingredient, amount)| RecipeComponent {
                product_id: p.to_string(),
                ingredient_id: ingredient.to_string(),
                amount_per_unit: Measure::from_milli(*amount),
            })
            .collect();
        db.inventory().set_recipe(product, &components).await?;
    }
    println!("✓ Created recipes for {} products", products.len());

    // Supplier invoices, one per supplier per month, walking back from today
    let vat = TaxRate::default();
    let mut created = 0;
    let mut month_start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 9, 0, 0)
        .single()
        .ok_or("invalid current month")?;

    for month in 0..months {
        for (index, (supplier, tax_number, subtotal)) in SUPPLIERS.iter().enumerate() {
            // Vary amounts a little per month
            let subtotal = Money::from_cents(subtotal + (month as i64 * 1_250) - (index as i64 * 300));
            let tax_amount = subtotal.calculate_tax(vat);
            let date = month_start + Duration::days(3 + index as i64 * 6);

            db.purchases()
                .create(&PurchaseInvoice {
                    id: Uuid::new_v4().to_string(),
                    number: format!("PO-{}-{:02}{:02}", date.format("%Y%m"), month, index),
                    supplier_name: supplier.to_string(),
                    supplier_tax_number: Some(tax_number.to_string()),
                    date,
                    subtotal,
                    tax_amount,
                    total: subtotal + tax_amount,
                    notes: None,
                })
                .await?;
            created += 1;
        }

        // Previous month
        month_start = (month_start - Duration::days(1))
            .with_day(1)
            .ok_or("invalid previous month")?;
    }
    println!("✓ Created {} supplier invoices", created);

    println!();
    let low = db.inventory().low_stock().await?;
    println!("Low stock items: {}", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
