use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .set_default("database.path", "vouchers.db")?
            .set_default("database.busy_timeout_ms", 5000_i64)?
            .set_default("logging.filter", "voucher_engine=debug,info")?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("VOUCHER"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
