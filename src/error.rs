use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoucherError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("voucher not found")]
    VoucherNotFound,

    #[error("user {user_id} already claimed voucher {voucher_id}")]
    AlreadyClaimed { user_id: i64, voucher_id: i64 },

    #[error("quota for voucher {0} is not sufficient")]
    QuotaExhausted(i64),

    #[error("voucher quota exceeded")]
    QuotaExceeded,

    #[error("required points ({required}) do not match provided points ({provided})")]
    PointsMismatch { required: i64, provided: i64 },

    #[error("voucher cannot be used before its start date: {}", .0.format("%Y-%m-%d"))]
    NotYetActive(DateTime<Utc>),

    #[error("voucher expired")]
    Expired,

    #[error("transaction amount must be at least {0:.2}")]
    MinimumPurchaseNotMet(f64),

    #[error("area not eligible for this voucher")]
    AreaNotEligible,

    #[error("payment method not eligible for this voucher")]
    PaymentMethodNotEligible,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VoucherError {
    /// Business-rule rejections are terminal: the caller must correct the
    /// input, not retry. Everything else is infrastructure and safe to retry
    /// since failed protocols leave no partial state.
    pub fn is_business_rejection(&self) -> bool {
        !matches!(
            self,
            VoucherError::Database(_)
                | VoucherError::Json(_)
                | VoucherError::Config(_)
                | VoucherError::Other(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VoucherError>;
