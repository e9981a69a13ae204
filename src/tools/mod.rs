//! Callable functions exposed to the model
//!
//! Each supported action is described once, as a parameter schema in the
//! registry. The same schema is rendered into the `tools` payload of every
//! model request and drives the validator's runtime checks.

mod registry;
mod types;

pub use registry::{registry, SchemaRegistry};
pub use types::{FieldSpec, FieldType, ParameterSchema};

pub const TOOL_TRANSFER_TOKENS: &str = "transfer_tokens";
pub const TOOL_SWAP_TOKENS: &str = "swap_tokens";
pub const TOOL_AUTO_TRADE_SETTING: &str = "settingAI";

/// Argument names as they appear in function calls
pub mod fields {
    pub const SPECIFIED_TOKEN: &str = "specifiedToken";
    pub const SPECIFIED_AMOUNT: &str = "specifiedAmount";
    pub const TRANSFER_TO: &str = "transferTo";
    pub const TOKEN_TO_BUY: &str = "tokenToBuy";
    pub const TOKEN_TO_SELL: &str = "tokenToSell";
    pub const BUY_MIN: &str = "buyMin";
    pub const BUY_MAX: &str = "buyMax";
    pub const SELL_MIN: &str = "sellMin";
    pub const SELL_MAX: &str = "sellMax";
}
