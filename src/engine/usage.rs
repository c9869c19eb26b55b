use chrono::Utc;
use tracing::{info, warn};

use crate::{
    engine::validation::{check_eligibility, compute_benefit, ValidationRequest},
    error::Result,
    storage::{db, models::UsageRecord, Database},
    VoucherError,
};

/// Applies a validated voucher to a transaction: records the usage and takes
/// one quota unit, atomically. A failed decrement aborts the transaction, so
/// no usage record survives without its quota unit.
pub struct UsageProtocol {
    db: Database,
}

impl UsageProtocol {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn use_voucher(
        &self,
        user_id: i64,
        voucher_code: &str,
        transaction_amount: f64,
        payment_method: &str,
        area: &str,
    ) -> Result<UsageRecord> {
        info!(
            "Using voucher {} for user {} (amount {:.2})",
            voucher_code, user_id, transaction_amount
        );

        let now = Utc::now();
        let req = ValidationRequest {
            user_id,
            voucher_code: voucher_code.to_string(),
            transaction_amount,
            shipping_amount: 0.0,
            area: area.to_string(),
            payment_method: payment_method.to_string(),
            transaction_date: now,
        };

        let record = self.db.immediate_transaction(|tx| {
            let voucher = db::find_redeemed_voucher(tx, user_id, voucher_code)?
                .ok_or(VoucherError::VoucherNotFound)?;
            check_eligibility(&voucher, &req)?;
            let benefit = compute_benefit(&voucher, transaction_amount, req.shipping_amount);

            let record = db::insert_usage_record(
                tx,
                user_id,
                voucher.id,
                transaction_amount,
                benefit,
                now,
            )?;
            if !db::decrement_quota(tx, voucher.id, now)? {
                return Err(VoucherError::QuotaExceeded);
            }
            Ok(record)
        });

        match &record {
            Ok(r) => info!(
                "Voucher {} used by user {}, benefit {:.2}",
                voucher_code, user_id, r.benefit_value
            ),
            Err(e) if e.is_business_rejection() => {
                warn!("Usage rejected for user {}: {}", user_id, e);
            }
            Err(e) => warn!("Usage failed for user {}: {}", user_id, e),
        }
        record
    }
}
