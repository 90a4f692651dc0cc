//! Fixtures shared by the engine's unit tests.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};

use crate::checkout::CheckoutRequest;
use crate::config::EngineConfig;
use crate::Engine;
use mizan_core::{
    ActorPermissions, DiscountSpec, InventoryItem, Invoice, InvoiceStatus, LineItem, Measure, Money,
    OrderType, PaymentMethod, RecipeComponent, Role, TaxRate,
};

/// In-memory engine with chicken and rice in stock and a `mandi` recipe.
/// `tea` has no recipe.
pub(crate) async fn engine() -> Engine {
    stocked(EngineConfig::in_memory()).await
}

/// Same stock as [`engine`], on a WAL database file with a multi-connection
/// pool. Remove the returned path's directory when done.
pub(crate) async fn file_engine() -> (Engine, PathBuf) {
    let dir = std::env::temp_dir().join(format!("mizan-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut config = EngineConfig::in_memory();
    config.database.path = dir.join("mizan.db");
    config.database.max_connections = 5;

    (stocked(config).await, dir)
}

async fn stocked(config: EngineConfig) -> Engine {
    let engine = Engine::open(config).await.unwrap();
    let inventory = engine.database().inventory();

    for (id, name, milli) in [("chicken", "Chicken", 10_000_000), ("rice", "Basmati Rice", 5_000_000)] {
        inventory
            .create_item(&InventoryItem {
                id: id.to_string(),
                name: name.to_string(),
                unit: "g".to_string(),
                quantity: Measure::from_milli(milli),
                low_stock_threshold: Measure::from_units(500),
                last_updated: Utc::now(),
            })
            .await
            .unwrap();
    }

    inventory
        .set_recipe(
            "mandi",
            &[
                RecipeComponent {
                    product_id: "mandi".to_string(),
                    ingredient_id: "chicken".to_string(),
                    amount_per_unit: Measure::from_units(500),
                },
                RecipeComponent {
                    product_id: "mandi".to_string(),
                    ingredient_id: "rice".to_string(),
                    amount_per_unit: Measure::from_units(250),
                },
            ],
        )
        .await
        .unwrap();

    engine
}

/// Two mandi at 40.00 and one tea at 3.00: 83.00 + 12.45 VAT = 95.45.
pub(crate) fn cart() -> Vec<LineItem> {
    vec![
        LineItem::new("mandi", "Chicken Mandi", Money::from_cents(4000), 2),
        LineItem::new("tea", "Karak Tea", Money::from_cents(300), 1),
    ]
}

/// The [`cart`] paid in full in cash.
pub(crate) fn checkout_request(status: InvoiceStatus) -> CheckoutRequest {
    let mut request = CheckoutRequest::new(cart(), "u-1", "Saad");
    request.paid_amount = Money::from_cents(9545);
    request.status = status;
    request.table_number = Some("4".to_string());
    request
}

pub(crate) async fn stock(engine: &Engine, ingredient_id: &str) -> i64 {
    engine
        .database()
        .inventory()
        .get_item(ingredient_id)
        .await
        .unwrap()
        .unwrap()
        .quantity
        .milli()
}

/// A pending invoice stored directly, bypassing checkout.
pub(crate) fn stored_invoice(number: &str) -> Invoice {
    Invoice {
        id: format!("legacy-{number}"),
        number: number.to_string(),
        date: Utc::now(),
        items: vec![LineItem::new("tea", "Karak Tea", Money::from_cents(300), 1)],
        subtotal: Money::from_cents(300),
        tax_amount: Money::from_cents(45),
        tax_rate: TaxRate::default(),
        discount: DiscountSpec::none(),
        discount_amount: Money::zero(),
        total: Money::from_cents(345),
        paid_amount: Money::from_cents(345),
        remaining_amount: None,
        payment_method: PaymentMethod::Cash,
        cashier_id: "u-1".to_string(),
        cashier_name: "Saad".to_string(),
        customer: None,
        status: InvoiceStatus::Pending,
        order_type: OrderType::Takeaway,
        table_number: None,
    }
}

pub(crate) fn on_day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub(crate) fn cashier() -> ActorPermissions {
    ActorPermissions::new("u-1", Role::Cashier)
}

pub(crate) fn manager() -> ActorPermissions {
    ActorPermissions::new("u-2", Role::Manager)
}
