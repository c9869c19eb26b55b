pub mod db;
pub mod models;

pub use db::{Database, EngineStats};
pub use models::Voucher;
