use tracing::{error, info};

use crate::{
    error::Result,
    storage::{
        models::{NewVoucher, RedeemPointsOffer, VoucherFilter, VoucherUpdate},
        Database, Voucher,
    },
};

/// Administrative voucher operations: plain data access around the store,
/// no protocol invariants beyond code uniqueness and soft deletion.
pub struct ManagementService {
    db: Database,
}

impl ManagementService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create_voucher(&self, new: &NewVoucher) -> Result<Voucher> {
        info!("Creating voucher with code {}", new.voucher_code);
        let voucher = self.db.create_voucher(new).map_err(|e| {
            error!("Error creating voucher {}: {}", new.voucher_code, e);
            e
        })?;
        Ok(voucher)
    }

    pub fn update_voucher(&self, voucher_id: i64, changes: &VoucherUpdate) -> Result<()> {
        info!("Updating voucher {}", voucher_id);
        self.db.update_voucher(voucher_id, changes)
    }

    pub fn soft_delete_voucher(&self, voucher_id: i64) -> Result<()> {
        info!("Soft-deleting voucher {}", voucher_id);
        self.db.soft_delete_voucher(voucher_id)
    }

    pub fn list_vouchers(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>> {
        self.db.list_vouchers(filter)
    }

    pub fn redeem_points_catalog(&self) -> Result<Vec<RedeemPointsOffer>> {
        self.db.redeem_points_catalog()
    }
}
