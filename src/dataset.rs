//! RetailX dataset: the schema text shown to the model and the sample
//! data that backs the `Retail` table.

use crate::error::Result;
use chrono::{Duration, NaiveDate};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

pub const TABLE_NAME: &str = "Retail";

/// Schema description given to the model as context. Must be kept in step
/// with [`CREATE_TABLE_SQL`] by hand.
pub const DB_DESCRIPTION: &str = "
The database contains a single table named 'Retail' with the following columns:
- Customer_ID: Unique identifier for each customer
- Name: Customer's name
- Gender: Customer's gender (Male/Female)
- Age: Customer's age
- Country: Customer's country of residence
- State: Customer's state of residence
- City: Customer's city of residence
- Zip_Code: Customer's zip code
- Product: Name of the product purchased
- Category: Category of the product
- Price: Price of the product
- Purchase_Date: Date of purchase
- Quantity: Quantity of the product purchased
- Total_Spent: Total amount spent on the purchase
";

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE "Retail" (
    "Customer_ID" INTEGER,
    "Name" TEXT,
    "Gender" TEXT,
    "Age" INTEGER,
    "Country" TEXT,
    "State" TEXT,
    "City" TEXT,
    "Zip_Code" TEXT,
    "Product" TEXT,
    "Category" TEXT,
    "Price" INTEGER,
    "Purchase_Date" TEXT,
    "Quantity" INTEGER,
    "Total_Spent" INTEGER
)
"#;

const SAMPLE_SIZE: i64 = 100;

/// One row of the `Retail` table
#[derive(Debug, Clone, PartialEq)]
pub struct RetailRecord {
    pub customer_id: i64,
    pub name: String,
    pub gender: &'static str,
    pub age: i64,
    pub country: &'static str,
    pub state: &'static str,
    pub city: &'static str,
    pub zip_code: String,
    pub product: String,
    pub category: &'static str,
    pub price: i64,
    pub purchase_date: String,
    pub quantity: i64,
    pub total_spent: i64,
}

/// Deterministic sample rows. `total_spent` is derived from price and
/// quantity here, at load time.
pub fn create_sample_data() -> Vec<RetailRecord> {
    const GENDERS: [&str; 2] = ["Male", "Female"];
    const COUNTRIES: [&str; 2] = ["USA", "Canada"];
    const STATES: [&str; 4] = ["CA", "NY", "ON", "BC"];
    const CITIES: [&str; 4] = ["Los Angeles", "New York", "Toronto", "Vancouver"];
    const CATEGORIES: [&str; 4] = ["Electronics", "Clothing", "Books", "Home"];

    let first_day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();

    (0..SAMPLE_SIZE)
        .map(|i| {
            let idx = i as usize;
            let price = 10 + i * 5;
            let quantity = 1 + i % 5;
            RetailRecord {
                customer_id: i + 1,
                name: format!("Customer {}", i + 1),
                gender: GENDERS[idx % 2],
                age: 20 + i % 60,
                country: COUNTRIES[idx % 2],
                state: STATES[idx % 4],
                city: CITIES[idx % 4],
                zip_code: (90000 + i).to_string(),
                product: format!("Product {}", i + 1),
                category: CATEGORIES[idx % 4],
                price,
                purchase_date: (first_day + Duration::days(i)).format("%Y-%m-%d").to_string(),
                quantity,
                total_spent: price * quantity,
            }
        })
        .collect()
}

/// Replace the `Retail` table in `conn` with the sample data.
pub fn load_sample_data(conn: &mut Connection) -> Result<usize> {
    let records = create_sample_data();
    let tx = conn.transaction()?;

    tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\";", TABLE_NAME))?;
    tx.execute_batch(CREATE_TABLE_SQL)?;

    {
        let mut stmt = tx.prepare(
            r#"INSERT INTO "Retail"
               ("Customer_ID", "Name", "Gender", "Age", "Country", "State", "City", "Zip_Code",
                "Product", "Category", "Price", "Purchase_Date", "Quantity", "Total_Spent")
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
        )?;
        for r in &records {
            stmt.execute(params![
                r.customer_id,
                r.name,
                r.gender,
                r.age,
                r.country,
                r.state,
                r.city,
                r.zip_code,
                r.product,
                r.category,
                r.price,
                r.purchase_date,
                r.quantity,
                r.total_spent,
            ])?;
        }
    }

    tx.commit()?;
    Ok(records.len())
}

/// Create (or recreate) the database file at `path` with sample data.
pub fn initialize_database(path: &Path) -> Result<usize> {
    let mut conn = Connection::open(path)?;
    let count = load_sample_data(&mut conn)?;
    info!("Database initialized with {} sample rows at {}", count, path.display());
    Ok(count)
}
