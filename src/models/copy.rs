//! Catalog book and physical copy models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Catalog entry; the ledger only uses the code as a key and the title for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub book_code: String,
    pub title: String,
}

/// Physical copy, the unit of lending
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub copy_id: i32,
    pub book_code: String,
    pub rack_number: Option<String>,
    pub barcode: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub is_available: bool,
}

/// Book with at least one copy on the shelf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AvailableBook {
    pub book_code: String,
    pub title: String,
    pub available_copies: i64,
}
