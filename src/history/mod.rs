use tracing::info;

use crate::{
    error::Result,
    storage::{
        models::{RedeemClaim, UsageRecord, VoucherType},
        Database, Voucher,
    },
};

/// Raw history retrieval over the two ledgers. Empty results are empty, not
/// errors.
pub struct HistoryService {
    db: Database,
}

impl HistoryService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn redeem_history_by_user(&self, user_id: i64) -> Result<Vec<RedeemClaim>> {
        info!("Fetching redeem history for user {}", user_id);
        self.db.redeem_history_by_user(user_id)
    }

    pub fn usage_history_by_user(&self, user_id: i64) -> Result<Vec<UsageRecord>> {
        info!("Fetching usage history for user {}", user_id);
        self.db.usage_history_by_user(user_id)
    }

    pub fn claimants_by_voucher_code(&self, code: &str) -> Result<Vec<RedeemClaim>> {
        info!("Fetching claimants for voucher code {}", code);
        self.db.claimants_by_voucher_code(code)
    }

    /// Active vouchers the user has claimed, optionally narrowed by type.
    pub fn redeemed_vouchers(
        &self,
        user_id: i64,
        voucher_type: Option<VoucherType>,
    ) -> Result<Vec<Voucher>> {
        self.db.list_redeemed_by_user(user_id, voucher_type)
    }
}
