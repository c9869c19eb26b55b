pub mod redemption;
pub mod usage;
pub mod validation;

pub use redemption::RedemptionProtocol;
pub use usage::UsageProtocol;
pub use validation::{ValidationEngine, ValidationRequest};
