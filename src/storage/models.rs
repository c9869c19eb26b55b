use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    pub id: i64,
    pub voucher_name: String,
    pub voucher_code: String,
    pub voucher_type: VoucherType,
    pub points_required: i64,
    pub description: String,
    pub voucher_category: VoucherCategory,
    pub discount_value: f64,
    pub minimum_purchase: f64,
    pub payment_methods: Vec<String>,
    pub applicable_areas: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub quota: i64,
    /// Computed on load: true while now is inside [start_date, end_date].
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_date && now <= self.end_date
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VoucherType {
    #[serde(rename = "e-commerce")]
    ECommerce,
    #[serde(rename = "redeem points")]
    RedeemPoints,
}

impl std::fmt::Display for VoucherType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoucherType::ECommerce => write!(f, "e-commerce"),
            VoucherType::RedeemPoints => write!(f, "redeem points"),
        }
    }
}

impl std::str::FromStr for VoucherType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "e-commerce" => Ok(VoucherType::ECommerce),
            "redeem points" => Ok(VoucherType::RedeemPoints),
            other => Err(format!("unknown voucher type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VoucherCategory {
    Discount,
    #[serde(rename = "Free Shipping")]
    FreeShipping,
}

impl std::fmt::Display for VoucherCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoucherCategory::Discount => write!(f, "Discount"),
            VoucherCategory::FreeShipping => write!(f, "Free Shipping"),
        }
    }
}

impl std::str::FromStr for VoucherCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Discount" => Ok(VoucherCategory::Discount),
            "Free Shipping" => Ok(VoucherCategory::FreeShipping),
            other => Err(format!("unknown voucher category: {other}")),
        }
    }
}

/// One row per successful points redemption. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemClaim {
    pub id: i64,
    pub user_id: i64,
    pub voucher_id: i64,
    pub redeem_date: DateTime<Utc>,
}

/// One row per successful voucher application. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: i64,
    pub user_id: i64,
    pub voucher_id: i64,
    pub usage_date: DateTime<Utc>,
    pub transaction_amount: f64,
    pub benefit_value: f64,
}

/// Payload for creating a voucher. The code is immutable once inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVoucher {
    pub voucher_name: String,
    pub voucher_code: String,
    pub voucher_type: VoucherType,
    pub points_required: i64,
    pub description: String,
    pub voucher_category: VoucherCategory,
    pub discount_value: f64,
    pub minimum_purchase: f64,
    pub payment_methods: Vec<String>,
    pub applicable_areas: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub quota: i64,
}

/// Partial update; None leaves the stored field untouched.
#[derive(Debug, Clone, Default)]
pub struct VoucherUpdate {
    pub voucher_name: Option<String>,
    pub description: Option<String>,
    pub discount_value: Option<f64>,
    pub minimum_purchase: Option<f64>,
    pub points_required: Option<i64>,
    pub payment_methods: Option<Vec<String>>,
    pub applicable_areas: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub quota: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Active,
    NonActive,
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(StatusFilter::Active),
            "non-active" => Ok(StatusFilter::NonActive),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoucherFilter {
    pub status: Option<StatusFilter>,
    pub area: Option<String>,
    pub voucher_type: Option<VoucherType>,
}

/// Catalog entry for the redeem-points listing.
#[derive(Debug, Clone, Serialize)]
pub struct RedeemPointsOffer {
    pub voucher_name: String,
    pub points_required: i64,
    pub discount_value: f64,
}

/// Demo voucher set mirroring the original seed data.
pub fn seed_vouchers() -> Vec<NewVoucher> {
    let now = Utc::now();
    vec![
        NewVoucher {
            voucher_name: "10% Discount".into(),
            voucher_code: "DISCOUNT10".into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "10% off for purchases above $100".into(),
            voucher_category: VoucherCategory::Discount,
            discount_value: 10.0,
            minimum_purchase: 100.0,
            payment_methods: vec!["Credit Card".into(), "PayPal".into()],
            applicable_areas: vec!["US".into(), "Canada".into()],
            start_date: now - Duration::days(5),
            end_date: now - Duration::days(1),
            quota: 100,
        },
        NewVoucher {
            voucher_name: "Free Shipping".into(),
            voucher_code: "FREESHIP50".into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "Free shipping for orders above $50".into(),
            voucher_category: VoucherCategory::FreeShipping,
            discount_value: 0.0,
            minimum_purchase: 50.0,
            payment_methods: vec!["All".into()],
            applicable_areas: vec!["Worldwide".into()],
            start_date: now,
            end_date: now + Duration::days(60),
            quota: 200,
        },
        NewVoucher {
            voucher_name: "Redeem 500 Points".into(),
            voucher_code: "POINTS500".into(),
            voucher_type: VoucherType::RedeemPoints,
            points_required: 500,
            description: "Redeem 500 points for a $20 discount".into(),
            voucher_category: VoucherCategory::Discount,
            discount_value: 20.0,
            minimum_purchase: 0.0,
            payment_methods: vec!["Credit Card".into()],
            applicable_areas: vec!["US".into()],
            start_date: now,
            end_date: now + Duration::days(90),
            quota: 150,
        },
        NewVoucher {
            voucher_name: "5% Discount".into(),
            voucher_code: "DISCOUNT5".into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "5% discount on all purchases".into(),
            voucher_category: VoucherCategory::Discount,
            discount_value: 5.0,
            minimum_purchase: 0.0,
            payment_methods: vec!["PayPal".into()],
            applicable_areas: vec!["Europe".into()],
            start_date: now,
            end_date: now + Duration::days(30),
            quota: 500,
        },
        NewVoucher {
            voucher_name: "Black Friday Sale".into(),
            voucher_code: "BLACKFRIDAY".into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "20% off for Black Friday".into(),
            voucher_category: VoucherCategory::Discount,
            discount_value: 20.0,
            minimum_purchase: 200.0,
            payment_methods: vec!["Credit Card".into(), "Bank Transfer".into()],
            applicable_areas: vec!["Worldwide".into()],
            start_date: now,
            end_date: now + Duration::days(7),
            quota: 300,
        },
        NewVoucher {
            voucher_name: "Holiday Free Shipping".into(),
            voucher_code: "HOLIDAYSHIP".into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "Free shipping during the holiday season".into(),
            voucher_category: VoucherCategory::FreeShipping,
            discount_value: 0.0,
            minimum_purchase: 75.0,
            payment_methods: vec!["All".into()],
            applicable_areas: vec!["US".into(), "Canada".into()],
            start_date: now,
            end_date: now + Duration::days(30),
            quota: 400,
        },
        NewVoucher {
            voucher_name: "Cyber Monday Special".into(),
            voucher_code: "CYBERMON".into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "15% off for Cyber Monday".into(),
            voucher_category: VoucherCategory::Discount,
            discount_value: 15.0,
            minimum_purchase: 150.0,
            payment_methods: vec!["Credit Card".into()],
            applicable_areas: vec!["Worldwide".into()],
            start_date: now,
            end_date: now + Duration::days(5),
            quota: 100,
        },
        NewVoucher {
            voucher_name: "Student Discount".into(),
            voucher_code: "STUDENT15".into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "15% discount for students".into(),
            voucher_category: VoucherCategory::Discount,
            discount_value: 15.0,
            minimum_purchase: 0.0,
            payment_methods: vec!["Credit Card".into(), "PayPal".into()],
            applicable_areas: vec!["Europe".into()],
            start_date: now,
            end_date: now + Duration::days(60),
            quota: 200,
        },
        NewVoucher {
            voucher_name: "New Year Sale".into(),
            voucher_code: "NEWYEAR50".into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "Flat $50 off for the New Year sale".into(),
            voucher_category: VoucherCategory::Discount,
            discount_value: 50.0,
            minimum_purchase: 300.0,
            payment_methods: vec!["All".into()],
            applicable_areas: vec!["US".into()],
            start_date: now,
            end_date: now + Duration::days(30),
            quota: 150,
        },
        NewVoucher {
            voucher_name: "Valentine's Free Shipping".into(),
            voucher_code: "VALSHIP".into(),
            voucher_type: VoucherType::ECommerce,
            points_required: 0,
            description: "Free shipping for Valentine's Day".into(),
            voucher_category: VoucherCategory::FreeShipping,
            discount_value: 0.0,
            minimum_purchase: 100.0,
            payment_methods: vec!["Credit Card".into(), "PayPal".into()],
            applicable_areas: vec!["Worldwide".into()],
            start_date: now,
            end_date: now + Duration::days(44),
            quota: 300,
        },
    ]
}
