//! Executable action records
//!
//! An [`Action`] is only ever produced by the validator, so holding one means
//! every field passed its schema checks and cross-field invariants. Records are
//! handed to the execution engine as-is.

use crate::tokens::CurrencySymbol;
use crate::tools::fields;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Supported wallet operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Transfer,
    Swap,
    AutoTradeSetting,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::Transfer,
        ActionKind::Swap,
        ActionKind::AutoTradeSetting,
    ];

    /// Name of the callable function the model uses for this kind
    pub fn function_name(&self) -> &'static str {
        match self {
            ActionKind::Transfer => crate::tools::TOOL_TRANSFER_TOKENS,
            ActionKind::Swap => crate::tools::TOOL_SWAP_TOKENS,
            ActionKind::AutoTradeSetting => crate::tools::TOOL_AUTO_TRADE_SETTING,
        }
    }

    pub fn from_function_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.function_name() == name.trim())
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Transfer => "transfer",
            ActionKind::Swap => "swap",
            ActionKind::AutoTradeSetting => "auto_trade_setting",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Send tokens to another user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferAction {
    pub token: CurrencySymbol,
    /// Always greater than zero
    #[serde(with = "rust_decimal::serde::str")]
    #[schemars(with = "String")]
    pub amount: Decimal,
    pub recipient: String,
}

/// Exchange one token for another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwapAction {
    pub token_to_buy: CurrencySymbol,
    pub token_to_sell: CurrencySymbol,
    #[serde(with = "rust_decimal::serde::str")]
    #[schemars(with = "String")]
    pub amount: Decimal,
    /// Token the amount is denominated in; one of the two sides
    pub reference_token: CurrencySymbol,
}

/// Conditions under which the trading algorithm buys or sells on the user's behalf
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoTradeSetting {
    pub token_to_buy: Option<CurrencySymbol>,
    pub token_to_sell: Option<CurrencySymbol>,
    /// `None` means use all available funds
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[schemars(with = "Option<String>")]
    pub amount: Option<Decimal>,
    pub reference_token: Option<CurrencySymbol>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[schemars(with = "Option<String>")]
    pub buy_min: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[schemars(with = "Option<String>")]
    pub buy_max: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[schemars(with = "Option<String>")]
    pub sell_min: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[schemars(with = "Option<String>")]
    pub sell_max: Option<Decimal>,
}

impl AutoTradeSetting {
    pub fn uses_all_funds(&self) -> bool {
        self.amount.is_none()
    }

    pub fn buy_range(&self) -> PriceRange {
        PriceRange::new(self.buy_min, self.buy_max)
    }

    pub fn sell_range(&self) -> PriceRange {
        PriceRange::new(self.sell_min, self.sell_max)
    }
}

/// Price window that triggers an automatic trade.
///
/// A missing lower bound means 0, a missing upper bound means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl PriceRange {
    pub fn new(min: Option<Decimal>, max: Option<Decimal>) -> Self {
        Self { min, max }
    }

    /// True when neither bound was given
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn lower(&self) -> Decimal {
        self.min.unwrap_or(Decimal::ZERO)
    }

    pub fn upper(&self) -> Option<Decimal> {
        self.max
    }

    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.lower() && self.max.map_or(true, |max| price <= max)
    }
}

/// A validated wallet action, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Transfer(TransferAction),
    Swap(SwapAction),
    AutoTradeSetting(AutoTradeSetting),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Transfer(_) => ActionKind::Transfer,
            Action::Swap(_) => ActionKind::Swap,
            Action::AutoTradeSetting(_) => ActionKind::AutoTradeSetting,
        }
    }

    /// Render the record back into the argument map of its callable function.
    ///
    /// Validating the result with [`crate::validate`] yields this same record.
    pub fn arguments(&self) -> Map<String, Value> {
        let mut args = Map::new();
        match self {
            Action::Transfer(transfer) => {
                put_symbol(&mut args, fields::SPECIFIED_TOKEN, Some(&transfer.token));
                put_decimal(&mut args, fields::SPECIFIED_AMOUNT, Some(transfer.amount));
                args.insert(
                    fields::TRANSFER_TO.to_string(),
                    Value::String(transfer.recipient.clone()),
                );
            }
            Action::Swap(swap) => {
                put_symbol(&mut args, fields::TOKEN_TO_BUY, Some(&swap.token_to_buy));
                put_symbol(&mut args, fields::TOKEN_TO_SELL, Some(&swap.token_to_sell));
                put_decimal(&mut args, fields::SPECIFIED_AMOUNT, Some(swap.amount));
                put_symbol(&mut args, fields::SPECIFIED_TOKEN, Some(&swap.reference_token));
            }
            Action::AutoTradeSetting(setting) => {
                put_symbol(&mut args, fields::TOKEN_TO_BUY, setting.token_to_buy.as_ref());
                put_symbol(&mut args, fields::TOKEN_TO_SELL, setting.token_to_sell.as_ref());
                put_decimal(&mut args, fields::SPECIFIED_AMOUNT, setting.amount);
                put_symbol(
                    &mut args,
                    fields::SPECIFIED_TOKEN,
                    setting.reference_token.as_ref(),
                );
                put_decimal(&mut args, fields::BUY_MIN, setting.buy_min);
                put_decimal(&mut args, fields::BUY_MAX, setting.buy_max);
                put_decimal(&mut args, fields::SELL_MIN, setting.sell_min);
                put_decimal(&mut args, fields::SELL_MAX, setting.sell_max);
            }
        }
        args
    }
}

fn put_symbol(args: &mut Map<String, Value>, field: &str, symbol: Option<&CurrencySymbol>) {
    let value = symbol
        .map(|s| Value::String(s.as_str().to_string()))
        .unwrap_or(Value::Null);
    args.insert(field.to_string(), value);
}

// A JSON number only when f64 carries the exact value; otherwise the
// normalized decimal string, which the validator also accepts.
fn put_decimal(args: &mut Map<String, Value>, field: &str, value: Option<Decimal>) {
    let value = match value {
        Some(d) => exact_number(d).unwrap_or_else(|| Value::String(d.normalize().to_string())),
        None => Value::Null,
    };
    args.insert(field.to_string(), value);
}

fn exact_number(d: Decimal) -> Option<Value> {
    let f = d.to_f64()?;
    if Decimal::from_f64(f)? != d {
        return None;
    }
    Number::from_f64(f).map(Value::Number)
}
