use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    error::Result,
    storage::{models::VoucherCategory, Database, Voucher},
    VoucherError,
};

/// Inputs a voucher is checked against.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub user_id: i64,
    pub voucher_code: String,
    pub transaction_amount: f64,
    pub shipping_amount: f64,
    pub area: String,
    pub payment_method: String,
    pub transaction_date: DateTime<Utc>,
}

/// Decides whether a voucher applies to a transaction and what it is worth.
/// Performs no writes, so validation-only queries and the usage protocol can
/// share it.
pub struct ValidationEngine {
    db: Database,
}

impl ValidationEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn validate(&self, req: &ValidationRequest) -> Result<(Voucher, f64)> {
        info!(
            "Validating voucher {} for user {} (amount {:.2})",
            req.voucher_code, req.user_id, req.transaction_amount
        );

        let voucher = self
            .db
            .find_redeemed_voucher(req.user_id, &req.voucher_code)?
            .ok_or(VoucherError::VoucherNotFound)?;

        check_eligibility(&voucher, req)?;
        let benefit = compute_benefit(&voucher, req.transaction_amount, req.shipping_amount);

        info!(
            "Voucher {} validated, benefit {:.2}",
            req.voucher_code, benefit
        );
        Ok((voucher, benefit))
    }
}

/// Ordered eligibility rules. Each violation is a distinct terminal
/// rejection; the first one hit wins.
pub fn check_eligibility(voucher: &Voucher, req: &ValidationRequest) -> Result<()> {
    if req.transaction_amount < voucher.minimum_purchase {
        return Err(VoucherError::MinimumPurchaseNotMet(voucher.minimum_purchase));
    }

    if !voucher.applicable_areas.is_empty()
        && !voucher.applicable_areas.iter().any(|a| a == &req.area)
    {
        debug!("Area {} not in {:?}", req.area, voucher.applicable_areas);
        return Err(VoucherError::AreaNotEligible);
    }

    if !voucher.payment_methods.is_empty()
        && !voucher.payment_methods.iter().any(|m| m == &req.payment_method)
    {
        debug!(
            "Payment method {} not in {:?}",
            req.payment_method, voucher.payment_methods
        );
        return Err(VoucherError::PaymentMethodNotEligible);
    }

    if req.transaction_date < voucher.start_date {
        return Err(VoucherError::NotYetActive(voucher.start_date));
    }
    if req.transaction_date > voucher.end_date {
        return Err(VoucherError::Expired);
    }

    Ok(())
}

/// Monetary benefit of an applicable voucher. Free Shipping refunds the
/// shipping amount. For Discount vouchers the stored value is a percentage,
/// unless it has five or more integer digits, in which case it is a flat
/// currency amount. The digit heuristic is inherited behavior; see
/// DESIGN.md.
pub fn compute_benefit(voucher: &Voucher, transaction_amount: f64, shipping_amount: f64) -> f64 {
    if voucher.voucher_category == VoucherCategory::FreeShipping {
        return shipping_amount;
    }
    let formatted = format!("{:.0}", voucher.discount_value);
    if formatted.len() > 4 {
        voucher.discount_value
    } else {
        (voucher.discount_value / 100.0) * transaction_amount
    }
}
