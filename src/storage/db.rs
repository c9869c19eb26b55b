use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

use crate::{
    error::Result,
    storage::models::{
        NewVoucher, RedeemClaim, RedeemPointsOffer, StatusFilter, UsageRecord, Voucher,
        VoucherFilter, VoucherType, VoucherUpdate,
    },
    VoucherError,
};

/// Shared handle to the voucher database. Cloning is cheap; clones share one
/// connection. Workers may also open independent handles on the same path,
/// the WAL journal and busy timeout make concurrent writers queue on the
/// writer lock instead of failing.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str, busy_timeout_ms: u64) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", busy_timeout_ms as i64)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS vouchers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                voucher_name TEXT NOT NULL,
                voucher_code TEXT NOT NULL UNIQUE,
                voucher_type TEXT NOT NULL
                    CHECK (voucher_type IN ('e-commerce', 'redeem points')),
                points_required INTEGER NOT NULL DEFAULT 0,
                description TEXT NOT NULL DEFAULT '',
                voucher_category TEXT NOT NULL
                    CHECK (voucher_category IN ('Discount', 'Free Shipping')),
                discount_value REAL NOT NULL,
                minimum_purchase REAL NOT NULL DEFAULT 0,
                payment_methods TEXT NOT NULL DEFAULT '[]',
                applicable_areas TEXT NOT NULL DEFAULT '[]',
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                quota INTEGER NOT NULL DEFAULT 0 CHECK (quota >= 0),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS redeem_claims (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                voucher_id INTEGER NOT NULL,
                redeem_date TEXT NOT NULL,
                FOREIGN KEY (voucher_id) REFERENCES vouchers(id),
                UNIQUE (user_id, voucher_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS usage_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                voucher_id INTEGER NOT NULL,
                usage_date TEXT NOT NULL,
                transaction_amount REAL NOT NULL,
                benefit_value REAL NOT NULL,
                FOREIGN KEY (voucher_id) REFERENCES vouchers(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_claims_user ON redeem_claims(user_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_usage_user ON usage_records(user_id)",
            [],
        )?;

        Ok(())
    }

    /// Run `f` inside a write-locking transaction. The immediate behavior
    /// takes SQLite's writer lock up front, so every check `f` performs is
    /// serialized with the writes it guards. Commit only on success; an error
    /// or panic drops the transaction, which rolls back.
    pub fn immediate_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub fn create_voucher(&self, new: &NewVoucher) -> Result<Voucher> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO vouchers
             (voucher_name, voucher_code, voucher_type, points_required, description,
              voucher_category, discount_value, minimum_purchase, payment_methods,
              applicable_areas, start_date, end_date, quota, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                new.voucher_name,
                new.voucher_code,
                new.voucher_type.to_string(),
                new.points_required,
                new.description,
                new.voucher_category.to_string(),
                new.discount_value,
                new.minimum_purchase,
                serde_json::to_string(&new.payment_methods)?,
                serde_json::to_string(&new.applicable_areas)?,
                new.start_date.to_rfc3339(),
                new.end_date.to_rfc3339(),
                new.quota,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Created voucher {} with code {}", id, new.voucher_code);
        fetch_voucher(&conn, "id = ?1", params![id])?.ok_or(VoucherError::VoucherNotFound)
    }

    pub fn get_voucher(&self, voucher_id: i64) -> Result<Option<Voucher>> {
        let conn = self.conn.lock().unwrap();
        fetch_voucher(&conn, "id = ?1 AND deleted_at IS NULL", params![voucher_id])
    }

    pub fn get_voucher_by_code(&self, code: &str) -> Result<Option<Voucher>> {
        let conn = self.conn.lock().unwrap();
        fetch_voucher(
            &conn,
            "voucher_code = ?1 AND deleted_at IS NULL",
            params![code],
        )
    }

    pub fn list_vouchers(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let mut sql = format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE deleted_at IS NULL"
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        match filter.status {
            Some(StatusFilter::Active) => {
                sql.push_str(" AND start_date <= ? AND end_date >= ?");
                args.push(Box::new(now.clone()));
                args.push(Box::new(now.clone()));
            }
            Some(StatusFilter::NonActive) => {
                sql.push_str(" AND end_date < ?");
                args.push(Box::new(now.clone()));
            }
            None => {}
        }
        if let Some(area) = &filter.area {
            // List columns hold JSON arrays of strings; containment is a
            // match on the quoted element.
            sql.push_str(" AND applicable_areas LIKE ?");
            args.push(Box::new(format!("%\"{}\"%", area)));
        }
        if let Some(vt) = filter.voucher_type {
            sql.push_str(" AND voucher_type = ?");
            args.push(Box::new(vt.to_string()));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let vouchers = stmt
            .query_map(
                rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
                map_voucher_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vouchers)
    }

    /// Active vouchers the user has claimed, optionally narrowed by type.
    pub fn list_redeemed_by_user(
        &self,
        user_id: i64,
        voucher_type: Option<VoucherType>,
    ) -> Result<Vec<Voucher>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        // v.* keeps the mapper's column order; unqualified names would be
        // ambiguous against the claim columns.
        let mut sql = String::from(
            "SELECT v.* FROM vouchers v
             JOIN redeem_claims rc ON rc.voucher_id = v.id
             WHERE rc.user_id = ? AND v.deleted_at IS NULL
               AND v.start_date <= ? AND v.end_date >= ?",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(user_id),
            Box::new(now.clone()),
            Box::new(now),
        ];
        if let Some(vt) = voucher_type {
            sql.push_str(" AND v.voucher_type = ?");
            args.push(Box::new(vt.to_string()));
        }
        sql.push_str(" ORDER BY v.id");

        let mut stmt = conn.prepare(&sql)?;
        let vouchers = stmt
            .query_map(
                rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
                map_voucher_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vouchers)
    }

    pub fn update_voucher(&self, voucher_id: i64, changes: &VoucherUpdate) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(v) = &changes.voucher_name {
            sets.push("voucher_name = ?");
            args.push(Box::new(v.clone()));
        }
        if let Some(v) = &changes.description {
            sets.push("description = ?");
            args.push(Box::new(v.clone()));
        }
        if let Some(v) = changes.discount_value {
            sets.push("discount_value = ?");
            args.push(Box::new(v));
        }
        if let Some(v) = changes.minimum_purchase {
            sets.push("minimum_purchase = ?");
            args.push(Box::new(v));
        }
        if let Some(v) = changes.points_required {
            sets.push("points_required = ?");
            args.push(Box::new(v));
        }
        if let Some(v) = &changes.payment_methods {
            sets.push("payment_methods = ?");
            args.push(Box::new(serde_json::to_string(v)?));
        }
        if let Some(v) = &changes.applicable_areas {
            sets.push("applicable_areas = ?");
            args.push(Box::new(serde_json::to_string(v)?));
        }
        if let Some(v) = changes.start_date {
            sets.push("start_date = ?");
            args.push(Box::new(v.to_rfc3339()));
        }
        if let Some(v) = changes.end_date {
            sets.push("end_date = ?");
            args.push(Box::new(v.to_rfc3339()));
        }
        if let Some(v) = changes.quota {
            sets.push("quota = ?");
            args.push(Box::new(v));
        }

        sets.push("updated_at = ?");
        args.push(Box::new(Utc::now().to_rfc3339()));
        args.push(Box::new(voucher_id));

        let sql = format!(
            "UPDATE vouchers SET {} WHERE id = ? AND deleted_at IS NULL",
            sets.join(", ")
        );
        let affected =
            conn.execute(&sql, rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())))?;
        if affected == 0 {
            return Err(VoucherError::VoucherNotFound);
        }
        Ok(())
    }

    pub fn soft_delete_voucher(&self, voucher_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE vouchers SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL",
            params![Utc::now().to_rfc3339(), voucher_id],
        )?;
        if affected == 0 {
            return Err(VoucherError::VoucherNotFound);
        }
        Ok(())
    }

    /// Points offers currently open for redemption.
    pub fn redeem_points_catalog(&self) -> Result<Vec<RedeemPointsOffer>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let mut stmt = conn.prepare(
            "SELECT voucher_name, points_required, discount_value
             FROM vouchers
             WHERE voucher_type = 'redeem points'
               AND deleted_at IS NULL
               AND start_date <= ?1 AND end_date >= ?1
             ORDER BY points_required",
        )?;
        let offers = stmt
            .query_map(params![now], |row| {
                Ok(RedeemPointsOffer {
                    voucher_name: row.get(0)?,
                    points_required: row.get(1)?,
                    discount_value: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(offers)
    }

    pub fn redeem_history_by_user(&self, user_id: i64) -> Result<Vec<RedeemClaim>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, voucher_id, redeem_date
             FROM redeem_claims WHERE user_id = ?1 ORDER BY redeem_date DESC",
        )?;
        let claims = stmt
            .query_map(params![user_id], map_claim_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(claims)
    }

    pub fn usage_history_by_user(&self, user_id: i64) -> Result<Vec<UsageRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, voucher_id, usage_date, transaction_amount, benefit_value
             FROM usage_records WHERE user_id = ?1 ORDER BY usage_date DESC",
        )?;
        let records = stmt
            .query_map(params![user_id], map_usage_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn claimants_by_voucher_code(&self, code: &str) -> Result<Vec<RedeemClaim>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT rc.id, rc.user_id, rc.voucher_id, rc.redeem_date
             FROM redeem_claims rc
             JOIN vouchers v ON v.id = rc.voucher_id
             WHERE v.voucher_code = ?1
             ORDER BY rc.redeem_date",
        )?;
        let claims = stmt
            .query_map(params![code], map_claim_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(claims)
    }

    /// Insert the demo voucher set, skipping codes that already exist.
    /// Returns how many rows were inserted.
    pub fn seed(&self, vouchers: &[NewVoucher]) -> Result<usize> {
        let mut inserted = 0;
        for v in vouchers {
            match self.create_voucher(v) {
                Ok(_) => inserted += 1,
                Err(VoucherError::Database(rusqlite::Error::SqliteFailure(e, _)))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    debug!("Seed voucher {} already present, skipping", v.voucher_code);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(inserted)
    }

    /// Read-only lookup behind the validation engine.
    pub fn find_redeemed_voucher(&self, user_id: i64, code: &str) -> Result<Option<Voucher>> {
        let conn = self.conn.lock().unwrap();
        find_redeemed_voucher(&conn, user_id, code)
    }

    pub fn get_stats(&self) -> Result<EngineStats> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let total_vouchers: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vouchers WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;

        let active_vouchers: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vouchers
             WHERE deleted_at IS NULL AND start_date <= ?1 AND end_date >= ?1",
            params![now],
            |row| row.get(0),
        )?;

        let total_claims: i64 =
            conn.query_row("SELECT COUNT(*) FROM redeem_claims", [], |row| row.get(0))?;

        let total_usages: i64 =
            conn.query_row("SELECT COUNT(*) FROM usage_records", [], |row| row.get(0))?;

        let total_benefit: Option<f64> = conn.query_row(
            "SELECT SUM(benefit_value) FROM usage_records",
            [],
            |row| row.get(0),
        )?;

        let avg_benefit: Option<f64> = conn.query_row(
            "SELECT AVG(benefit_value) FROM usage_records",
            [],
            |row| row.get(0),
        )?;

        Ok(EngineStats {
            total_vouchers: total_vouchers as usize,
            active_vouchers: active_vouchers as usize,
            total_claims: total_claims as usize,
            total_usages: total_usages as usize,
            total_benefit_issued: total_benefit.unwrap_or(0.0),
            avg_benefit_value: avg_benefit.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub total_vouchers: usize,
    pub active_vouchers: usize,
    pub total_claims: usize,
    pub total_usages: usize,
    pub total_benefit_issued: f64,
    pub avg_benefit_value: f64,
}

const VOUCHER_COLUMNS: &str = "id, voucher_name, voucher_code, voucher_type, points_required, \
     description, voucher_category, discount_value, minimum_purchase, payment_methods, \
     applicable_areas, start_date, end_date, quota, created_at, updated_at";

fn fetch_voucher(
    conn: &Connection,
    predicate: &str,
    args: impl rusqlite::Params,
) -> Result<Option<Voucher>> {
    let sql = format!("SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE {predicate}");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(args, map_voucher_row)?;
    Ok(rows.next().transpose()?)
}

fn map_voucher_row(row: &Row<'_>) -> rusqlite::Result<Voucher> {
    let start_date: DateTime<Utc> = row.get::<_, String>(11)?.parse().unwrap();
    let end_date: DateTime<Utc> = row.get::<_, String>(12)?.parse().unwrap();
    let now = Utc::now();

    Ok(Voucher {
        id: row.get(0)?,
        voucher_name: row.get(1)?,
        voucher_code: row.get(2)?,
        voucher_type: row.get::<_, String>(3)?.parse().unwrap(),
        points_required: row.get(4)?,
        description: row.get(5)?,
        voucher_category: row.get::<_, String>(6)?.parse().unwrap(),
        discount_value: row.get(7)?,
        minimum_purchase: row.get(8)?,
        payment_methods: json_list(row, 9)?,
        applicable_areas: json_list(row, 10)?,
        start_date,
        end_date,
        quota: row.get(13)?,
        status: now >= start_date && now <= end_date,
        created_at: row.get::<_, String>(14)?.parse().unwrap(),
        updated_at: row.get::<_, String>(15)?.parse().unwrap(),
    })
}

fn json_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_claim_row(row: &Row<'_>) -> rusqlite::Result<RedeemClaim> {
    Ok(RedeemClaim {
        id: row.get(0)?,
        user_id: row.get(1)?,
        voucher_id: row.get(2)?,
        redeem_date: row.get::<_, String>(3)?.parse().unwrap(),
    })
}

fn map_usage_row(row: &Row<'_>) -> rusqlite::Result<UsageRecord> {
    Ok(UsageRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        voucher_id: row.get(2)?,
        usage_date: row.get::<_, String>(3)?.parse().unwrap(),
        transaction_amount: row.get(4)?,
        benefit_value: row.get(5)?,
    })
}

// ---------------------------------------------------------------------------
// Row-level operations used inside protocol transactions. They take a plain
// `&Connection` (a `Transaction` derefs to one), so the same lookup serves
// the read-only validation path and the write-locked protocols.
// ---------------------------------------------------------------------------

pub fn claim_exists(conn: &Connection, user_id: i64, voucher_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM redeem_claims WHERE user_id = ?1 AND voucher_id = ?2",
        params![user_id, voucher_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn insert_claim(
    conn: &Connection,
    user_id: i64,
    voucher_id: i64,
    now: DateTime<Utc>,
) -> Result<RedeemClaim> {
    conn.execute(
        "INSERT INTO redeem_claims (user_id, voucher_id, redeem_date) VALUES (?1, ?2, ?3)",
        params![user_id, voucher_id, now.to_rfc3339()],
    )?;
    Ok(RedeemClaim {
        id: conn.last_insert_rowid(),
        user_id,
        voucher_id,
        redeem_date: now,
    })
}

pub fn insert_usage_record(
    conn: &Connection,
    user_id: i64,
    voucher_id: i64,
    transaction_amount: f64,
    benefit_value: f64,
    now: DateTime<Utc>,
) -> Result<UsageRecord> {
    conn.execute(
        "INSERT INTO usage_records
         (user_id, voucher_id, usage_date, transaction_amount, benefit_value)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            voucher_id,
            now.to_rfc3339(),
            transaction_amount,
            benefit_value
        ],
    )?;
    Ok(UsageRecord {
        id: conn.last_insert_rowid(),
        user_id,
        voucher_id,
        usage_date: now,
        transaction_amount,
        benefit_value,
    })
}

/// Redemption terms of a voucher, read inside the claiming transaction.
#[derive(Debug, Clone)]
pub struct VoucherTerms {
    pub quota: i64,
    pub points_required: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

pub fn voucher_terms(conn: &Connection, voucher_id: i64) -> Result<Option<VoucherTerms>> {
    let mut stmt = conn.prepare(
        "SELECT quota, points_required, start_date, end_date
         FROM vouchers WHERE id = ?1 AND deleted_at IS NULL",
    )?;
    let mut rows = stmt.query_map(params![voucher_id], |row| {
        Ok(VoucherTerms {
            quota: row.get(0)?,
            points_required: row.get(1)?,
            start_date: row.get::<_, String>(2)?.parse().unwrap(),
            end_date: row.get::<_, String>(3)?.parse().unwrap(),
        })
    })?;
    Ok(rows.next().transpose()?)
}

/// Voucher lookup for validation and usage: the code must exist with quota
/// left, and a points-type voucher must have been claimed by this user.
pub fn find_redeemed_voucher(
    conn: &Connection,
    user_id: i64,
    voucher_code: &str,
) -> Result<Option<Voucher>> {
    let voucher = fetch_voucher(
        conn,
        "voucher_code = ?1 AND deleted_at IS NULL AND quota > 0",
        params![voucher_code],
    )?;
    let Some(voucher) = voucher else {
        return Ok(None);
    };
    if voucher.voucher_type == VoucherType::RedeemPoints
        && !claim_exists(conn, user_id, voucher.id)?
    {
        return Ok(None);
    }
    Ok(Some(voucher))
}

/// Guarded decrement: touches no row once the quota is exhausted, so the
/// stored quota can never go negative. Returns whether a unit was taken.
pub fn decrement_quota(conn: &Connection, voucher_id: i64, now: DateTime<Utc>) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE vouchers SET quota = quota - 1, updated_at = ?1
         WHERE id = ?2 AND quota > 0",
        params![now.to_rfc3339(), voucher_id],
    )?;
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::seed_vouchers;
    use tempfile::TempDir;

    fn open_db(dir: &TempDir) -> Database {
        let path = dir.path().join("vouchers.db");
        Database::new(path.to_str().unwrap(), 5000).unwrap()
    }

    fn sample_voucher(code: &str) -> NewVoucher {
        let now = Utc::now();
        NewVoucher {
            voucher_name: "Test Voucher".into(),
            voucher_code: code.into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "test".into(),
            voucher_category: crate::storage::models::VoucherCategory::Discount,
            discount_value: 10.0,
            minimum_purchase: 0.0,
            payment_methods: vec!["Credit Card".into()],
            applicable_areas: vec!["US".into()],
            start_date: now - chrono::Duration::days(1),
            end_date: now + chrono::Duration::days(1),
            quota: 5,
        }
    }

    #[test]
    fn test_create_and_fetch_roundtrip() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let created = db.create_voucher(&sample_voucher("ROUNDTRIP")).unwrap();
        assert!(created.status);
        assert_eq!(created.payment_methods, vec!["Credit Card".to_string()]);

        let by_code = db.get_voucher_by_code("ROUNDTRIP").unwrap().unwrap();
        assert_eq!(by_code.id, created.id);
        assert_eq!(by_code.quota, 5);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        db.create_voucher(&sample_voucher("DUP")).unwrap();
        let err = db.create_voucher(&sample_voucher("DUP")).unwrap_err();
        assert!(matches!(err, VoucherError::Database(_)));
    }

    #[test]
    fn test_soft_delete_hides_voucher() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let v = db.create_voucher(&sample_voucher("GONE")).unwrap();
        db.soft_delete_voucher(v.id).unwrap();

        assert!(db.get_voucher_by_code("GONE").unwrap().is_none());
        assert!(db.get_voucher(v.id).unwrap().is_none());
        // Deleting again reports not found.
        assert!(matches!(
            db.soft_delete_voucher(v.id),
            Err(VoucherError::VoucherNotFound)
        ));
    }

    #[test]
    fn test_update_missing_voucher_errors() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let changes = VoucherUpdate {
            quota: Some(9),
            ..Default::default()
        };
        assert!(matches!(
            db.update_voucher(4242, &changes),
            Err(VoucherError::VoucherNotFound)
        ));
    }

    #[test]
    fn test_update_applies_partial_changes() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let v = db.create_voucher(&sample_voucher("PARTIAL")).unwrap();
        db.update_voucher(
            v.id,
            &VoucherUpdate {
                voucher_name: Some("Renamed".into()),
                quota: Some(42),
                ..Default::default()
            },
        )
        .unwrap();

        let updated = db.get_voucher(v.id).unwrap().unwrap();
        assert_eq!(updated.voucher_name, "Renamed");
        assert_eq!(updated.quota, 42);
        // Untouched fields survive.
        assert_eq!(updated.discount_value, 10.0);
        assert_eq!(updated.voucher_code, "PARTIAL");
    }

    #[test]
    fn test_list_filters() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        db.seed(&seed_vouchers()).unwrap();

        let all = db.list_vouchers(&VoucherFilter::default()).unwrap();
        assert_eq!(all.len(), 10);

        // DISCOUNT10 is seeded with a window entirely in the past.
        let active = db
            .list_vouchers(&VoucherFilter {
                status: Some(StatusFilter::Active),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active.len(), 9);
        assert!(active.iter().all(|v| v.status));

        let expired = db
            .list_vouchers(&VoucherFilter {
                status: Some(StatusFilter::NonActive),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].voucher_code, "DISCOUNT10");

        let europe = db
            .list_vouchers(&VoucherFilter {
                area: Some("Europe".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(europe.iter().all(|v| v
            .applicable_areas
            .contains(&"Europe".to_string())));

        let points = db
            .list_vouchers(&VoucherFilter {
                voucher_type: Some(VoucherType::RedeemPoints),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].voucher_code, "POINTS500");
    }

    #[test]
    fn test_seed_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        assert_eq!(db.seed(&seed_vouchers()).unwrap(), 10);
        assert_eq!(db.seed(&seed_vouchers()).unwrap(), 0);
        assert_eq!(db.list_vouchers(&VoucherFilter::default()).unwrap().len(), 10);
    }

    #[test]
    fn test_redeem_points_catalog_lists_active_offers() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        db.seed(&seed_vouchers()).unwrap();

        let offers = db.redeem_points_catalog().unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].voucher_name, "Redeem 500 Points");
        assert_eq!(offers[0].points_required, 500);
    }

    #[test]
    fn test_find_redeemed_voucher_requires_claim_for_points_type() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        db.seed(&seed_vouchers()).unwrap();

        let conn = db.conn.lock().unwrap();
        // e-commerce voucher needs no claim.
        assert!(find_redeemed_voucher(&conn, 7, "FREESHIP50")
            .unwrap()
            .is_some());
        // points voucher without a claim is invisible.
        assert!(find_redeemed_voucher(&conn, 7, "POINTS500")
            .unwrap()
            .is_none());

        let points = fetch_voucher(&conn, "voucher_code = 'POINTS500'", params![])
            .unwrap()
            .unwrap();
        insert_claim(&conn, 7, points.id, Utc::now()).unwrap();
        assert!(find_redeemed_voucher(&conn, 7, "POINTS500")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_decrement_quota_stops_at_zero() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let mut v = sample_voucher("DRAIN");
        v.quota = 2;
        let v = db.create_voucher(&v).unwrap();

        let conn = db.conn.lock().unwrap();
        assert!(decrement_quota(&conn, v.id, Utc::now()).unwrap());
        assert!(decrement_quota(&conn, v.id, Utc::now()).unwrap());
        // Exhausted: no row touched, quota stays at zero.
        assert!(!decrement_quota(&conn, v.id, Utc::now()).unwrap());

        let quota: i64 = conn
            .query_row("SELECT quota FROM vouchers WHERE id = ?1", params![v.id], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(quota, 0);
    }

    #[test]
    fn test_stats_aggregates() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let v = db.create_voucher(&sample_voucher("STATS")).unwrap();

        {
            let conn = db.conn.lock().unwrap();
            insert_claim(&conn, 1, v.id, Utc::now()).unwrap();
            insert_usage_record(&conn, 1, v.id, 100.0, 10.0, Utc::now()).unwrap();
            insert_usage_record(&conn, 2, v.id, 300.0, 30.0, Utc::now()).unwrap();
        }

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_vouchers, 1);
        assert_eq!(stats.total_claims, 1);
        assert_eq!(stats.total_usages, 2);
        assert!((stats.total_benefit_issued - 40.0).abs() < f64::EPSILON);
        assert!((stats.avg_benefit_value - 20.0).abs() < f64::EPSILON);
    }
}
