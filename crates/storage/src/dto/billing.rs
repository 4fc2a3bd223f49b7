use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Bill, BillLineItem, BillStatus};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BillLine {
    pub description: String,
    pub amount: Decimal,
}

/// The summary returned from a checkout
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BillSummary {
    pub bill_id: Uuid,
    pub participant_id: Uuid,
    pub total: Decimal,
    pub status: BillStatus,
    pub line_items: Vec<BillLine>,
    pub created_at: DateTime<Utc>,
}

impl BillSummary {
    pub fn from_bill(bill: &Bill, lines: &[BillLineItem]) -> Self {
        Self {
            bill_id: bill.bill_id,
            participant_id: bill.participant_id,
            total: bill.total,
            status: bill.status,
            line_items: lines
                .iter()
                .map(|li| BillLine {
                    description: li.description.clone(),
                    amount: li.amount,
                })
                .collect(),
            created_at: bill.created_at,
        }
    }
}
