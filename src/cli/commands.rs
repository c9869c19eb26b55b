use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "voucher-cli")]
#[command(about = "Promotional voucher engine: redemption, usage and management")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize database and configuration
    Init,

    /// Insert the demo voucher set
    Seed,

    /// Create a voucher
    Create {
        /// Voucher name
        #[arg(long)]
        name: String,

        /// Unique voucher code (immutable after creation)
        #[arg(long)]
        code: String,

        /// Voucher type: "e-commerce" or "redeem points"
        #[arg(long, default_value = "e-commerce")]
        voucher_type: String,

        /// Voucher category: "Discount" or "Free Shipping"
        #[arg(long, default_value = "Discount")]
        category: String,

        /// Discount value (percentage, or flat amount for 5+ digit values)
        #[arg(long)]
        discount: f64,

        /// Minimum purchase amount
        #[arg(long, default_value = "0")]
        minimum_purchase: f64,

        /// Points required to redeem (points vouchers only)
        #[arg(long, default_value = "0")]
        points: i64,

        /// Free-text description
        #[arg(long, default_value = "")]
        description: String,

        /// Comma-separated payment methods (empty = unrestricted)
        #[arg(long, default_value = "")]
        payment_methods: String,

        /// Comma-separated applicable areas (empty = unrestricted)
        #[arg(long, default_value = "")]
        areas: String,

        /// Validity window start (RFC 3339)
        #[arg(long)]
        starts: String,

        /// Validity window end (RFC 3339)
        #[arg(long)]
        ends: String,

        /// Remaining quota
        #[arg(long)]
        quota: i64,
    },

    /// Update voucher fields (the code cannot change)
    Update {
        /// Voucher id
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        discount: Option<f64>,

        #[arg(long)]
        minimum_purchase: Option<f64>,

        #[arg(long)]
        points: Option<i64>,

        /// Comma-separated payment methods
        #[arg(long)]
        payment_methods: Option<String>,

        /// Comma-separated applicable areas
        #[arg(long)]
        areas: Option<String>,

        /// Validity window start (RFC 3339)
        #[arg(long)]
        starts: Option<String>,

        /// Validity window end (RFC 3339)
        #[arg(long)]
        ends: Option<String>,

        #[arg(long)]
        quota: Option<i64>,
    },

    /// Soft-delete a voucher
    Delete {
        /// Voucher id
        id: i64,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List vouchers
    List {
        /// Filter by status (active, non-active)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by applicable area
        #[arg(short, long)]
        area: Option<String>,

        /// Filter by voucher type
        #[arg(short = 't', long)]
        voucher_type: Option<String>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show the redeem-points catalog
    RedeemPoints,

    /// Check whether a voucher applies to a transaction (no writes)
    Validate {
        /// User id
        #[arg(long)]
        user: i64,

        /// Voucher code
        #[arg(long)]
        code: String,

        /// Transaction amount
        #[arg(long)]
        amount: f64,

        /// Shipping amount (benefit for Free Shipping vouchers)
        #[arg(long, default_value = "0")]
        shipping: f64,

        /// Transaction area
        #[arg(long)]
        area: String,

        /// Payment method
        #[arg(long)]
        payment_method: String,

        /// Transaction date (RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Claim a voucher with loyalty points
    Redeem {
        /// Voucher id
        #[arg(long)]
        voucher: i64,

        /// User id
        #[arg(long)]
        user: i64,

        /// Points to spend (must match the voucher's requirement)
        #[arg(long)]
        points: i64,
    },

    /// Apply a voucher to a transaction
    Use {
        /// User id
        #[arg(long)]
        user: i64,

        /// Voucher code
        #[arg(long)]
        code: String,

        /// Transaction amount
        #[arg(long)]
        amount: f64,

        /// Payment method
        #[arg(long)]
        payment_method: String,

        /// Transaction area
        #[arg(long)]
        area: String,
    },

    /// Show a user's redemption and usage history
    History {
        /// User id
        user: i64,
    },

    /// List users who claimed a voucher code
    Claimants {
        /// Voucher code
        code: String,
    },

    /// Show statistics and reports
    Stats {
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}
