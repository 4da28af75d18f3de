//! # Seed Data Generator
//!
//! Populates the catalog with pet products for local development.
//!
//! ## Usage
//! ```bash
//! # Seed ./petbox_dev.db
//! cargo run -p petbox-db --bin seed
//!
//! # Specify database path
//! cargo run -p petbox-db --bin seed -- --db ./data/petbox.db
//! ```
//!
//! ## Generated Catalog
//! Every product gets two to three size variants with a price ladder.
//! Roughly one product in five carries a minimum budget, one in seven
//! is not subscription-eligible, and a few variants start out of stock
//! so the shop view and availability checks have something to hide.

use std::env;

use petbox_core::{CatalogItem, PetType, Variant};
use petbox_db::{Database, DbConfig};
use uuid::Uuid;

/// (category, product names, eligible pet types)
const CATEGORIES: &[(&str, &[&str], &[PetType])] = &[
    (
        "food",
        &[
            "Chicken & Rice Kibble",
            "Salmon Grain-Free Kibble",
            "Puppy Starter Kibble",
            "Senior Joint Care Kibble",
            "Lamb Wet Food Tray",
        ],
        &[PetType::Dog],
    ),
    (
        "food",
        &[
            "Tuna Pate",
            "Indoor Cat Dry Food",
            "Kitten Growth Formula",
            "Ocean Fish Pouches",
        ],
        &[PetType::Cat],
    ),
    (
        "treats",
        &[
            "Chew Sticks",
            "Dental Bones",
            "Freeze-Dried Liver Bites",
            "Catnip Crunchies",
        ],
        &[PetType::Dog, PetType::Cat],
    ),
    (
        "litter",
        &["Clumping Clay Litter", "Pine Pellet Litter"],
        &[PetType::Cat],
    ),
    (
        "grooming",
        &["Oatmeal Shampoo", "Deshedding Brush", "Paw Balm"],
        &[PetType::Dog, PetType::Cat],
    ),
    (
        "toys",
        &["Rope Tug", "Squeaky Ball Set", "Feather Wand"],
        &[PetType::Dog, PetType::Cat],
    ),
];

/// (variant name, price multiplier in percent)
const SIZES: &[(&str, i64)] = &[("Small", 100), ("Medium", 180), ("Large", 320)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./petbox_dev.db");

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
                println!("Petbox Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./petbox_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Petbox Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().list_catalog(&[]).await?;
    if !existing.is_empty() {
        println!("⚠ Catalog already has {} eligible products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut generated = 0;
    let mut display_order = 0;

    for (category, names, pet_types) in CATEGORIES {
        for name in names.iter() {
            display_order += 10;
            let product = generate_product(category, name, pet_types, display_order);

            if let Err(e) = db.catalog().insert_product(&product).await {
                eprintln!("Failed to insert {}: {}", product.name, e);
                continue;
            }
            generated += 1;
        }
    }

    println!();
    println!("✓ Generated {} products", generated);

    let listed = db.catalog().list_catalog(&[]).await?;
    println!("  Subscription-eligible: {}", listed.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one product with a deterministic spread of prices and flags.
fn generate_product(
    category: &str,
    name: &str,
    pet_types: &[PetType],
    seed: i64,
) -> CatalogItem {
    let id = Uuid::new_v4().to_string();
    let slug = name.to_lowercase().replace([' ', '&'], "-");

    // ₹149 - ₹649 base price
    let base_price = 14_900 + (seed * 37 % 50) * 1_000;
    let size_count = 2 + (seed as usize / 10) % 2;

    let variants = SIZES
        .iter()
        .take(size_count)
        .enumerate()
        .map(|(idx, (size, multiplier))| Variant {
            id: Uuid::new_v4().to_string(),
            product_id: id.clone(),
            name: size.to_string(),
            price_minor: base_price * multiplier / 100,
            stock: if (seed + idx as i64) % 9 == 0 { 0 } else { 20 + seed % 30 },
            is_active: true,
        })
        .collect();

    CatalogItem {
        id,
        name: name.to_string(),
        category: category.to_string(),
        description: Some(format!("{name} for everyday care")),
        image_bucket: Some("product-images".to_string()),
        image_path: Some(format!("{category}/{slug}.webp")),
        is_active: true,
        is_eligible: seed % 70 != 0,
        eligible_pet_types: pet_types.to_vec(),
        min_budget_minor: (seed % 50 == 0).then_some(150_000),
        display_order: seed,
        variants,
    }
}
