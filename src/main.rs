mod cli;

use chrono::{DateTime, Utc};
use clap::Parser;
use cli::{Cli, Commands};
use colored::*;
use tracing::{error, info};

use voucher_engine::{
    engine::{RedemptionProtocol, UsageProtocol, ValidationEngine, ValidationRequest},
    error,
    history::HistoryService,
    management::ManagementService,
    storage::{
        models::{seed_vouchers, NewVoucher, VoucherFilter, VoucherUpdate},
        Database,
    },
    utils, Config, VoucherError,
};

fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(config.logging.filter.as_str())
        .init();

    let db = match Database::new(&config.database.path, config.database.busy_timeout_ms) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Init => initialize(&config, &db),

        Commands::Seed => seed(&db),

        Commands::Create {
            name,
            code,
            voucher_type,
            category,
            discount,
            minimum_purchase,
            points,
            description,
            payment_methods,
            areas,
            starts,
            ends,
            quota,
        } => create_voucher(
            &db,
            NewVoucherArgs {
                name,
                code,
                voucher_type,
                category,
                discount,
                minimum_purchase,
                points,
                description,
                payment_methods,
                areas,
                starts,
                ends,
                quota,
            },
        ),

        Commands::Update {
            id,
            name,
            description,
            discount,
            minimum_purchase,
            points,
            payment_methods,
            areas,
            starts,
            ends,
            quota,
        } => update_voucher(
            &db,
            id,
            UpdateArgs {
                name,
                description,
                discount,
                minimum_purchase,
                points,
                payment_methods,
                areas,
                starts,
                ends,
                quota,
            },
        ),

        Commands::Delete { id, yes } => delete_voucher(&db, id, yes),

        Commands::List {
            status,
            area,
            voucher_type,
            format,
        } => list_vouchers(&db, status, area, voucher_type, &format),

        Commands::RedeemPoints => show_redeem_points(&db),

        Commands::Validate {
            user,
            code,
            amount,
            shipping,
            area,
            payment_method,
            date,
        } => validate_voucher(&db, user, &code, amount, shipping, &area, &payment_method, date),

        Commands::Redeem {
            voucher,
            user,
            points,
        } => {
            info!("Redeeming voucher {} for user {}", voucher, user);
            redeem_voucher(&db, voucher, user, points)
        }

        Commands::Use {
            user,
            code,
            amount,
            payment_method,
            area,
        } => {
            info!("Using voucher {} for user {}", code, user);
            use_voucher(&db, user, &code, amount, &payment_method, &area)
        }

        Commands::History { user } => show_history(&db, user),

        Commands::Claimants { code } => show_claimants(&db, &code),

        Commands::Stats { format } => show_stats(&db, &format),
    };

    if let Err(e) = result {
        if e.is_business_rejection() {
            println!("{}", format!("Rejected: {}", e).red());
        } else {
            error!("{}", format!("Error: {}", e).red());
        }
        std::process::exit(1);
    }
}

fn initialize(config: &Config, _db: &Database) -> error::Result<()> {
    println!("{}", "Initializing voucher engine...".green());
    println!("{}", "✓ Database initialized".green());
    println!("{}", "✓ Configuration loaded".green());
    println!("\n{}", "Configuration:".cyan());
    println!("  Database:      {}", config.database.path);
    println!("  Busy timeout:  {} ms", config.database.busy_timeout_ms);
    println!("  Log filter:    {}", config.logging.filter);

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to load the demo vouchers", "voucher-cli seed".yellow());
    println!("  {} to browse them", "voucher-cli list".yellow());
    println!("  {} to view statistics", "voucher-cli stats".yellow());
    Ok(())
}

fn seed(db: &Database) -> error::Result<()> {
    let inserted = db.seed(&seed_vouchers())?;
    println!(
        "{}",
        format!("✓ Seeded {} vouchers", inserted).green()
    );
    Ok(())
}

struct NewVoucherArgs {
    name: String,
    code: String,
    voucher_type: String,
    category: String,
    discount: f64,
    minimum_purchase: f64,
    points: i64,
    description: String,
    payment_methods: String,
    areas: String,
    starts: String,
    ends: String,
    quota: i64,
}

fn create_voucher(db: &Database, args: NewVoucherArgs) -> error::Result<()> {
    let new = NewVoucher {
        voucher_name: args.name,
        voucher_code: args.code,
        voucher_type: parse_arg(&args.voucher_type)?,
        points_required: args.points,
        description: args.description,
        voucher_category: parse_arg(&args.category)?,
        discount_value: args.discount,
        minimum_purchase: args.minimum_purchase,
        payment_methods: utils::parse_list(&args.payment_methods),
        applicable_areas: utils::parse_list(&args.areas),
        start_date: parse_date(&args.starts)?,
        end_date: parse_date(&args.ends)?,
        quota: args.quota,
    };

    let voucher = ManagementService::new(db.clone()).create_voucher(&new)?;
    println!(
        "{}",
        format!("✓ Created voucher {} ({})", voucher.id, voucher.voucher_code).green()
    );
    Ok(())
}

struct UpdateArgs {
    name: Option<String>,
    description: Option<String>,
    discount: Option<f64>,
    minimum_purchase: Option<f64>,
    points: Option<i64>,
    payment_methods: Option<String>,
    areas: Option<String>,
    starts: Option<String>,
    ends: Option<String>,
    quota: Option<i64>,
}

fn update_voucher(db: &Database, id: i64, args: UpdateArgs) -> error::Result<()> {
    let changes = VoucherUpdate {
        voucher_name: args.name,
        description: args.description,
        discount_value: args.discount,
        minimum_purchase: args.minimum_purchase,
        points_required: args.points,
        payment_methods: args.payment_methods.as_deref().map(utils::parse_list),
        applicable_areas: args.areas.as_deref().map(utils::parse_list),
        start_date: args.starts.as_deref().map(parse_date).transpose()?,
        end_date: args.ends.as_deref().map(parse_date).transpose()?,
        quota: args.quota,
    };

    ManagementService::new(db.clone()).update_voucher(id, &changes)?;
    println!("{}", format!("✓ Updated voucher {}", id).green());
    Ok(())
}

fn delete_voucher(db: &Database, id: i64, yes: bool) -> error::Result<()> {
    if !yes && !utils::confirm_action(&format!("Soft-delete voucher {}?", id)) {
        println!("Cancelled");
        return Ok(());
    }
    ManagementService::new(db.clone()).soft_delete_voucher(id)?;
    println!("{}", format!("✓ Voucher {} soft-deleted", id).green());
    Ok(())
}

fn list_vouchers(
    db: &Database,
    status: Option<String>,
    area: Option<String>,
    voucher_type: Option<String>,
    format: &str,
) -> error::Result<()> {
    let filter = VoucherFilter {
        status: status.as_deref().map(parse_arg).transpose()?,
        area,
        voucher_type: voucher_type.as_deref().map(parse_arg).transpose()?,
    };
    let vouchers = ManagementService::new(db.clone()).list_vouchers(&filter)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&vouchers)?);
        return Ok(());
    }

    if vouchers.is_empty() {
        println!("{}", "No vouchers found".yellow());
        return Ok(());
    }

    println!("{}", "=== Vouchers ===".cyan().bold());
    utils::print_table_border(110);
    utils::print_table_row(
        &["ID", "Code", "Name", "Type", "Category", "Value", "Min", "Quota", "Active", "Ends"],
        &[4, 14, 24, 13, 13, 9, 9, 6, 6, 12],
    );
    utils::print_table_border(110);
    for v in &vouchers {
        utils::print_table_row(
            &[
                &v.id.to_string(),
                &v.voucher_code,
                &v.voucher_name,
                &v.voucher_type.to_string(),
                &v.voucher_category.to_string(),
                &format!("{:.2}", v.discount_value),
                &format!("{:.2}", v.minimum_purchase),
                &v.quota.to_string(),
                if v.status { "yes" } else { "no" },
                &v.end_date.format("%Y-%m-%d").to_string(),
            ],
            &[4, 14, 24, 13, 13, 9, 9, 6, 6, 12],
        );
    }
    utils::print_table_border(110);
    println!("{} vouchers", vouchers.len());
    Ok(())
}

fn show_redeem_points(db: &Database) -> error::Result<()> {
    let offers = ManagementService::new(db.clone()).redeem_points_catalog()?;
    if offers.is_empty() {
        println!("{}", "No redeem-points vouchers are currently active".yellow());
        return Ok(());
    }

    println!("{}", "=== Redeem Points Catalog ===".cyan().bold());
    utils::print_table_border(60);
    utils::print_table_row(&["Voucher", "Points", "Value"], &[30, 10, 10]);
    utils::print_table_border(60);
    for offer in &offers {
        utils::print_table_row(
            &[
                &offer.voucher_name,
                &offer.points_required.to_string(),
                &format!("{:.2}", offer.discount_value),
            ],
            &[30, 10, 10],
        );
    }
    utils::print_table_border(60);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn validate_voucher(
    db: &Database,
    user: i64,
    code: &str,
    amount: f64,
    shipping: f64,
    area: &str,
    payment_method: &str,
    date: Option<String>,
) -> error::Result<()> {
    let transaction_date = match date {
        Some(raw) => parse_date(&raw)?,
        None => Utc::now(),
    };

    let engine = ValidationEngine::new(db.clone());
    let (voucher, benefit) = engine.validate(&ValidationRequest {
        user_id: user,
        voucher_code: code.to_string(),
        transaction_amount: amount,
        shipping_amount: shipping,
        area: area.to_string(),
        payment_method: payment_method.to_string(),
        transaction_date,
    })?;

    println!("{}", "✓ Voucher is applicable".green());
    println!("  Voucher:  {} ({})", voucher.voucher_name, voucher.voucher_code);
    println!("  Category: {}", voucher.voucher_category);
    println!("  Areas:    {}", utils::format_list(&voucher.applicable_areas));
    println!("  Payment:  {}", utils::format_list(&voucher.payment_methods));
    println!("  Benefit:  {}", utils::format_amount(benefit));
    Ok(())
}

fn redeem_voucher(db: &Database, voucher: i64, user: i64, points: i64) -> error::Result<()> {
    let claim = RedemptionProtocol::new(db.clone()).redeem(voucher, user, points)?;
    println!("{}", "✓ Voucher claimed".green());
    println!("  Claim id: {}", claim.id);
    println!("  Date:     {}", utils::format_timestamp(&claim.redeem_date));
    Ok(())
}

fn use_voucher(
    db: &Database,
    user: i64,
    code: &str,
    amount: f64,
    payment_method: &str,
    area: &str,
) -> error::Result<()> {
    let record = UsageProtocol::new(db.clone()).use_voucher(user, code, amount, payment_method, area)?;
    println!("{}", "✓ Voucher applied".green());
    println!("  Transaction: {}", utils::format_amount(record.transaction_amount));
    println!("  Benefit:     {}", utils::format_amount(record.benefit_value));
    println!("  Date:        {}", utils::format_timestamp(&record.usage_date));
    Ok(())
}

fn show_history(db: &Database, user: i64) -> error::Result<()> {
    let history = HistoryService::new(db.clone());

    let redeemed = history.redeemed_vouchers(user, None)?;
    println!("{}", format!("=== Claimed vouchers for user {} ===", user).cyan().bold());
    if redeemed.is_empty() {
        println!("{}", "No active claimed vouchers".yellow());
    } else {
        for v in &redeemed {
            println!(
                "  {} ({}) [{}]",
                v.voucher_name, v.voucher_code, v.voucher_category
            );
        }
    }

    let claims = history.redeem_history_by_user(user)?;
    println!();
    println!("{}", format!("=== Redemptions for user {} ===", user).cyan().bold());
    if claims.is_empty() {
        println!("{}", "No voucher exchange history found".yellow());
    } else {
        utils::print_table_border(50);
        utils::print_table_row(&["Claim", "Voucher", "Date"], &[8, 10, 24]);
        utils::print_table_border(50);
        for c in &claims {
            utils::print_table_row(
                &[
                    &c.id.to_string(),
                    &c.voucher_id.to_string(),
                    &utils::format_timestamp(&c.redeem_date),
                ],
                &[8, 10, 24],
            );
        }
        utils::print_table_border(50);
    }

    let usages = history.usage_history_by_user(user)?;
    println!("\n{}", format!("=== Usages for user {} ===", user).cyan().bold());
    if usages.is_empty() {
        println!("{}", "No voucher usage history found".yellow());
    } else {
        utils::print_table_border(70);
        utils::print_table_row(&["Usage", "Voucher", "Amount", "Benefit", "Date"], &[8, 10, 10, 10, 24]);
        utils::print_table_border(70);
        for u in &usages {
            utils::print_table_row(
                &[
                    &u.id.to_string(),
                    &u.voucher_id.to_string(),
                    &format!("{:.2}", u.transaction_amount),
                    &format!("{:.2}", u.benefit_value),
                    &utils::format_timestamp(&u.usage_date),
                ],
                &[8, 10, 10, 10, 24],
            );
        }
        utils::print_table_border(70);
    }
    Ok(())
}

fn show_claimants(db: &Database, code: &str) -> error::Result<()> {
    let claims = HistoryService::new(db.clone()).claimants_by_voucher_code(code)?;
    if claims.is_empty() {
        println!("{}", format!("No users have claimed voucher {}", code).yellow());
        return Ok(());
    }

    println!("{}", format!("=== Claimants of {} ===", code).cyan().bold());
    utils::print_table_border(50);
    utils::print_table_row(&["User", "Claim", "Date"], &[10, 8, 24]);
    utils::print_table_border(50);
    for c in &claims {
        utils::print_table_row(
            &[
                &c.user_id.to_string(),
                &c.id.to_string(),
                &utils::format_timestamp(&c.redeem_date),
            ],
            &[10, 8, 24],
        );
    }
    utils::print_table_border(50);
    Ok(())
}

fn show_stats(db: &Database, format: &str) -> error::Result<()> {
    let stats = db.get_stats()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "=== Voucher Engine Statistics ===".cyan().bold());
    println!("\nVouchers:");
    println!("  Total:      {}", stats.total_vouchers);
    println!("  Active:     {}", stats.active_vouchers.to_string().green());

    println!("\nLedgers:");
    println!("  Claims:     {}", stats.total_claims);
    println!("  Usages:     {}", stats.total_usages);
    println!("  Benefit:    {}", utils::format_amount(stats.total_benefit_issued));
    println!("  Average:    {}", utils::format_amount(stats.avg_benefit_value));
    Ok(())
}

fn parse_date(raw: &str) -> error::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| VoucherError::Other(anyhow::anyhow!("Invalid date '{}': {}", raw, e)))
}

fn parse_arg<T>(raw: &str) -> error::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse()
        .map_err(|e: String| VoucherError::Other(anyhow::anyhow!(e)))
}
