use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Unpaid,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            other => Err(StorageError::validation(format!(
                "unknown bill status '{other}'"
            ))),
        }
    }
}

/// One checkout's bill. Created once, never mutated; the total always equals
/// the sum of the line items.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Bill {
    pub bill_id: Uuid,
    pub session_id: Uuid,
    pub participant_id: Uuid,
    pub total: Decimal,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BillLineItem {
    pub line_item_id: Uuid,
    pub bill_id: Uuid,
    pub description: String,
    pub amount: Decimal,
}
