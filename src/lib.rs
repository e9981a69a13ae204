//! Wallet Intent Agent
//!
//! Turns a free-form wallet request ("send 5 USD to Alice", "buy ETH when it
//! drops to $100") into exactly one validated action:
//! - Transfer a token to a recipient
//! - Swap one token for another
//! - Configure an automated buy/sell rule
//!
//! A language model picks the action and extracts raw arguments against a
//! fixed set of function schemas. Nothing the model returns is trusted: every
//! call is checked against the same schemas, currency names are normalized to
//! canonical tickers, and anything incomplete comes back as a clarification
//! request instead of a guess.

pub mod action;
pub mod audit;
pub mod config;
pub mod oracle;
pub mod resolver;
pub mod tokens;
pub mod tools;
pub mod validator;

mod error;

// Re-export commonly used types
pub use action::{Action, ActionKind, AutoTradeSetting, PriceRange, SwapAction, TransferAction};
pub use config::{Config, OracleConfig};
pub use error::{Error, Result};
pub use oracle::{IntentOracle, OpenAiOracle, OracleError, OracleReply, OracleRequest};
pub use resolver::{IntentResolver, ResolvedIntent};
pub use tokens::{normalize, CurrencySymbol};
pub use tools::registry;
pub use validator::{validate, validate_call, ValidationError, ValidationErrors};
