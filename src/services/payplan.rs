//! Pay-plan arithmetic over integer minor units.
//!
//! All amounts are minor currency units (hundredths). The split plan must
//! sum exactly to the order total; any rounding remainder lands on the
//! earliest installments.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Days between split installments
const INSTALLMENT_SPACING_DAYS: i64 = 14;
/// Number of split installments
pub const SPLIT_PARTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPlan {
    Full,
    Deposit,
    Split,
}

impl PayPlan {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "full" => Ok(PayPlan::Full),
            "deposit" => Ok(PayPlan::Deposit),
            "split" => Ok(PayPlan::Split),
            other => Err(ServiceError::ValidationError(format!(
                "invalid pay plan: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayPlan::Full => "full",
            PayPlan::Deposit => "deposit",
            PayPlan::Split => "split",
        }
    }
}

/// A single scheduled installment under the split plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Installment {
    pub seq: u32,
    pub amount: i64,
    pub due_date: DateTime<Utc>,
}

/// 5% of the total, rounded half-up, never below one minor unit.
pub fn deposit_minor(total: i64) -> i64 {
    debug_assert!(total >= 0);
    ((total * 5 + 50) / 100).max(1)
}

/// Four parts as even as possible; `floor(total/4)` each with the remainder
/// (0-3 units) distributed one unit at a time to the earliest parts, so the
/// parts always sum exactly to the total.
pub fn split_parts(total: i64) -> [i64; SPLIT_PARTS] {
    debug_assert!(total >= 0);
    let base = total / SPLIT_PARTS as i64;
    let remainder = total % SPLIT_PARTS as i64;
    let mut parts = [base; SPLIT_PARTS];
    for (i, part) in parts.iter_mut().enumerate() {
        if (i as i64) < remainder {
            *part += 1;
        }
    }
    parts
}

/// Amount charged at checkout time for the chosen plan.
pub fn amount_due_now(plan: PayPlan, total: i64) -> i64 {
    match plan {
        PayPlan::Full => total,
        PayPlan::Deposit => deposit_minor(total),
        PayPlan::Split => split_parts(total)[0],
    }
}

/// Dated split schedule starting now, 14-day spacing. Informational only;
/// no follow-up billing is driven from it.
pub fn installment_schedule(total: i64, start: DateTime<Utc>) -> Vec<Installment> {
    split_parts(total)
        .iter()
        .enumerate()
        .map(|(i, &amount)| Installment {
            seq: i as u32 + 1,
            amount,
            due_date: start + Duration::days(INSTALLMENT_SPACING_DAYS * i as i64),
        })
        .collect()
}
