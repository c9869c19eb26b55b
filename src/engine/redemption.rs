use chrono::Utc;
use tracing::{info, warn};

use crate::{
    error::Result,
    storage::{db, models::RedeemClaim, Database},
    VoucherError,
};

/// Exchanges loyalty points for a voucher claim. The whole procedure runs in
/// one write-locking transaction: the existence check, the quota check and
/// both writes either all land or none do.
pub struct RedemptionProtocol {
    db: Database,
}

impl RedemptionProtocol {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn redeem(&self, voucher_id: i64, user_id: i64, points: i64) -> Result<RedeemClaim> {
        info!(
            "Redeeming voucher {} for user {} with {} points",
            voucher_id, user_id, points
        );

        let claim = self.db.immediate_transaction(|tx| {
            if db::claim_exists(tx, user_id, voucher_id)? {
                return Err(VoucherError::AlreadyClaimed {
                    user_id,
                    voucher_id,
                });
            }

            let terms =
                db::voucher_terms(tx, voucher_id)?.ok_or(VoucherError::VoucherNotFound)?;

            if terms.quota <= 0 {
                return Err(VoucherError::QuotaExhausted(voucher_id));
            }
            if points != terms.points_required {
                return Err(VoucherError::PointsMismatch {
                    required: terms.points_required,
                    provided: points,
                });
            }

            let now = Utc::now();
            if now < terms.start_date {
                return Err(VoucherError::NotYetActive(terms.start_date));
            }
            if now > terms.end_date {
                return Err(VoucherError::Expired);
            }

            // The UNIQUE(user_id, voucher_id) constraint backs the existence
            // check for writers that did not take the immediate lock.
            let claim = match db::insert_claim(tx, user_id, voucher_id, now) {
                Ok(claim) => claim,
                Err(VoucherError::Database(rusqlite::Error::SqliteFailure(e, _)))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Err(VoucherError::AlreadyClaimed {
                        user_id,
                        voucher_id,
                    });
                }
                Err(e) => return Err(e),
            };
            if !db::decrement_quota(tx, voucher_id, now)? {
                // Quota raced to zero between the check and the decrement;
                // aborting rolls the claim back too.
                return Err(VoucherError::QuotaExhausted(voucher_id));
            }
            Ok(claim)
        });

        match &claim {
            Ok(c) => info!("User {} claimed voucher {} (claim {})", user_id, voucher_id, c.id),
            Err(e) if e.is_business_rejection() => {
                warn!("Redemption rejected for user {}: {}", user_id, e);
            }
            Err(e) => warn!("Redemption failed for user {}: {}", user_id, e),
        }
        claim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{NewVoucher, VoucherCategory, VoucherType};
    use chrono::Duration;
    use tempfile::TempDir;

    fn points_voucher(code: &str, quota: i64, points: i64) -> NewVoucher {
        let now = Utc::now();
        NewVoucher {
            voucher_name: "Points Voucher".into(),
            voucher_code: code.into(),
            voucher_type: VoucherType::RedeemPoints,
            points_required: points,
            description: String::new(),
            voucher_category: VoucherCategory::Discount,
            discount_value: 20.0,
            minimum_purchase: 0.0,
            payment_methods: vec![],
            applicable_areas: vec![],
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            quota,
        }
    }

    fn setup(dir: &TempDir, voucher: &NewVoucher) -> (Database, i64) {
        let path = dir.path().join("vouchers.db");
        let db = Database::new(path.to_str().unwrap(), 5000).unwrap();
        let v = db.create_voucher(voucher).unwrap();
        (db, v.id)
    }

    #[test]
    fn test_successful_redeem_creates_claim_and_decrements_quota() {
        let dir = TempDir::new().unwrap();
        let (db, id) = setup(&dir, &points_voucher("PTS", 5, 50));

        let claim = RedemptionProtocol::new(db.clone()).redeem(id, 1, 50).unwrap();
        assert_eq!(claim.user_id, 1);
        assert_eq!(claim.voucher_id, id);

        assert_eq!(db.get_voucher(id).unwrap().unwrap().quota, 4);
        assert_eq!(db.redeem_history_by_user(1).unwrap().len(), 1);
    }

    #[test]
    fn test_second_redeem_by_same_user_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (db, id) = setup(&dir, &points_voucher("PTS", 5, 50));
        let protocol = RedemptionProtocol::new(db.clone());

        protocol.redeem(id, 1, 50).unwrap();
        for _ in 0..3 {
            assert!(matches!(
                protocol.redeem(id, 1, 50),
                Err(VoucherError::AlreadyClaimed { user_id: 1, .. })
            ));
        }
        // Only the first attempt consumed quota.
        assert_eq!(db.get_voucher(id).unwrap().unwrap().quota, 4);
    }

    #[test]
    fn test_points_mismatch_leaves_no_state() {
        let dir = TempDir::new().unwrap();
        let (db, id) = setup(&dir, &points_voucher("PTS", 5, 50));

        let err = RedemptionProtocol::new(db.clone()).redeem(id, 1, 40).unwrap_err();
        assert!(matches!(
            err,
            VoucherError::PointsMismatch {
                required: 50,
                provided: 40
            }
        ));
        assert_eq!(
            err.to_string(),
            "required points (50) do not match provided points (40)"
        );

        assert_eq!(db.get_voucher(id).unwrap().unwrap().quota, 5);
        assert!(db.redeem_history_by_user(1).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_voucher_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (db, _) = setup(&dir, &points_voucher("PTS", 5, 50));

        assert!(matches!(
            RedemptionProtocol::new(db).redeem(999, 1, 50),
            Err(VoucherError::VoucherNotFound)
        ));
    }

    #[test]
    fn test_exhausted_quota_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (db, id) = setup(&dir, &points_voucher("PTS", 1, 50));
        let protocol = RedemptionProtocol::new(db.clone());

        protocol.redeem(id, 1, 50).unwrap();
        assert!(matches!(
            protocol.redeem(id, 2, 50),
            Err(VoucherError::QuotaExhausted(_))
        ));
        assert_eq!(db.get_voucher(id).unwrap().unwrap().quota, 0);
    }

    #[test]
    fn test_window_is_enforced() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();

        let mut future = points_voucher("LATER", 5, 50);
        future.start_date = now + Duration::days(1);
        future.end_date = now + Duration::days(2);
        let mut past = points_voucher("OVER", 5, 50);
        past.start_date = now - Duration::days(2);
        past.end_date = now - Duration::days(1);

        let path = dir.path().join("vouchers.db");
        let db = Database::new(path.to_str().unwrap(), 5000).unwrap();
        let future_id = db.create_voucher(&future).unwrap().id;
        let past_id = db.create_voucher(&past).unwrap().id;
        let protocol = RedemptionProtocol::new(db.clone());

        assert!(matches!(
            protocol.redeem(future_id, 1, 50),
            Err(VoucherError::NotYetActive(_))
        ));
        assert!(matches!(
            protocol.redeem(past_id, 1, 50),
            Err(VoucherError::Expired)
        ));
        assert_eq!(db.get_voucher(future_id).unwrap().unwrap().quota, 5);
        assert_eq!(db.get_voucher(past_id).unwrap().unwrap().quota, 5);
    }

    #[test]
    fn test_concurrent_redeems_oversell_nothing() {
        // quota = 1, two users race on independent connections: exactly one
        // claim lands, the loser sees the exhausted quota.
        let dir = TempDir::new().unwrap();
        let (_db, id) = setup(&dir, &points_voucher("RACE", 1, 50));
        let path = dir.path().join("vouchers.db");

        let handles: Vec<_> = (1..=2)
            .map(|user_id| {
                let path = path.to_str().unwrap().to_string();
                std::thread::spawn(move || {
                    let db = Database::new(&path, 5000).unwrap();
                    RedemptionProtocol::new(db).redeem(id, user_id, 50)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(VoucherError::QuotaExhausted(_)))));

        let db = Database::new(path.to_str().unwrap(), 5000).unwrap();
        assert_eq!(db.get_voucher(id).unwrap().unwrap().quota, 0);
    }

    #[test]
    fn test_concurrent_duplicate_claims_yield_one_success() {
        // Same user races against itself: one success, the rest AlreadyClaimed.
        let dir = TempDir::new().unwrap();
        let (_db, id) = setup(&dir, &points_voucher("DUPRACE", 10, 50));
        let path = dir.path().join("vouchers.db");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.to_str().unwrap().to_string();
                std::thread::spawn(move || {
                    let db = Database::new(&path, 5000).unwrap();
                    RedemptionProtocol::new(db).redeem(id, 7, 50)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(VoucherError::AlreadyClaimed { .. }))));

        let db = Database::new(path.to_str().unwrap(), 5000).unwrap();
        assert_eq!(db.get_voucher(id).unwrap().unwrap().quota, 9);
        assert_eq!(db.redeem_history_by_user(7).unwrap().len(), 1);
    }
}
