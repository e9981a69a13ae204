//! Static catalog of the actions the model may call.
//!
//! Both the request sent to the model and the validator read from this one
//! registry, so the function definitions the model sees and the checks applied
//! to its output cannot drift apart.

use serde_json::Value;

use super::fields::*;
use super::types::{FieldSpec, FieldType, ParameterSchema};
use crate::action::ActionKind;

const CURRENCY_NOTE: &str = "Currencies accepted are USDC, ETH, BTC, and any other ERC20 token. \
Account for user abbreviations and full names; always interpret USD as USDC and Ethereum as ETH.";

/// Immutable lookup from action kind to its argument contract
pub struct SchemaRegistry {
    /// Indexed by `slot(kind)`
    schemas: [ParameterSchema; 3],
}

fn slot(kind: ActionKind) -> usize {
    match kind {
        ActionKind::Transfer => 0,
        ActionKind::Swap => 1,
        ActionKind::AutoTradeSetting => 2,
    }
}

impl SchemaRegistry {
    /// Build the registry with every supported action
    pub fn new() -> Self {
        Self {
            schemas: [transfer_schema(), swap_schema(), auto_trade_schema()],
        }
    }

    pub fn schema_for(&self, kind: ActionKind) -> &ParameterSchema {
        &self.schemas[slot(kind)]
    }

    pub fn schema_by_function(&self, function_name: &str) -> Option<&ParameterSchema> {
        ActionKind::from_function_name(function_name).map(|kind| self.schema_for(kind))
    }

    /// All schemas in declaration order
    pub fn schemas(&self) -> impl Iterator<Item = &ParameterSchema> + '_ {
        self.schemas.iter()
    }

    /// Function definitions sent to the model with every request
    pub fn tool_definitions(&self) -> Vec<Value> {
        self.schemas()
            .map(ParameterSchema::function_definition)
            .collect()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn transfer_schema() -> ParameterSchema {
    ParameterSchema::new(
        ActionKind::Transfer,
        concat_description(
            "Transfer or send tokens to another user, given the amount, the currency and the \
             receiver's name.",
        ),
        vec![
            FieldSpec::required(
                SPECIFIED_TOKEN,
                FieldType::String,
                "The currency of the token to transfer.",
            ),
            FieldSpec::required(
                SPECIFIED_AMOUNT,
                FieldType::Number,
                "The amount of tokens to transfer; may be a decimal or floating point number.",
            ),
            FieldSpec::required(
                TRANSFER_TO,
                FieldType::String,
                "The name of the user to transfer the tokens to.",
            ),
        ],
    )
}

fn swap_schema() -> ParameterSchema {
    ParameterSchema::new(
        ActionKind::Swap,
        concat_description(
            "Buy or sell tokens between two currencies. specifiedAmount and specifiedToken hold \
             whatever value the user mentions, whether that token is the one being bought or \
             the one being sold.",
        ),
        vec![
            FieldSpec::required(TOKEN_TO_BUY, FieldType::String, "The token currency to buy."),
            FieldSpec::required(TOKEN_TO_SELL, FieldType::String, "The token currency to sell."),
            FieldSpec::required(
                SPECIFIED_AMOUNT,
                FieldType::Number,
                "The amount of tokens to buy or sell, on whichever side the user gave a value \
                 for; may be a decimal or floating point number.",
            ),
            FieldSpec::required(
                SPECIFIED_TOKEN,
                FieldType::String,
                "The token currency the user refers to when giving the amount.",
            ),
        ],
    )
}

fn auto_trade_schema() -> ParameterSchema {
    ParameterSchema::new(
        ActionKind::AutoTradeSetting,
        concat_description(
            "Set the conditions the AI trading algorithm uses to buy or sell tokens for the user \
             once they are met. Not every parameter is needed; set any field the user did not \
             provide to null.",
        ),
        vec![
            FieldSpec::required(TOKEN_TO_BUY, FieldType::String, "The token currency to buy.")
                .nullable(),
            FieldSpec::required(TOKEN_TO_SELL, FieldType::String, "The token currency to sell.")
                .nullable(),
            FieldSpec::required(
                SPECIFIED_AMOUNT,
                FieldType::Number,
                "The amount of tokens to trade; may be a decimal or floating point number. If \
                 the user does not give an amount they want to use all of their funds, so the \
                 value is null.",
            )
            .nullable(),
            FieldSpec::required(
                SPECIFIED_TOKEN,
                FieldType::String,
                "The token currency the user refers to when giving the amount.",
            )
            .nullable(),
            FieldSpec::optional(
                BUY_MAX,
                FieldType::Number,
                "When buying, the upper bound of the price range that triggers a trade. Buying \
                 ethereum when the price drops to $100 gives buyMax 100, a buy range of $0-$100. \
                 Defaults to null.",
            )
            .nullable(),
            FieldSpec::optional(
                BUY_MIN,
                FieldType::Number,
                "When buying, the lower bound of the price range that triggers a trade. Buying \
                 ethereum when the price rises to $50 gives buyMin 50, a buy range of \
                 $50-infinity. Defaults to null.",
            )
            .nullable(),
            FieldSpec::optional(
                SELL_MAX,
                FieldType::Number,
                "When selling, the upper bound of the price range that triggers a trade. Selling \
                 USDC for ETH when the price of ETH drops to $10 gives sellMax 10, a sell range \
                 of $0-$10. Defaults to null.",
            )
            .nullable(),
            FieldSpec::optional(
                SELL_MIN,
                FieldType::Number,
                "When selling, the lower bound of the price range that triggers a trade. Selling \
                 USDC for ETH when the price of ETH rises to $20 gives sellMin 20, a sell range \
                 of $20-infinity. Defaults to null.",
            )
            .nullable(),
        ],
    )
}

fn concat_description(summary: &str) -> String {
    format!("{summary} {CURRENCY_NOTE}")
}

/// Global schema registry (lazy initialized)
static REGISTRY: std::sync::OnceLock<SchemaRegistry> = std::sync::OnceLock::new();

/// Get the global schema registry
pub fn registry() -> &'static SchemaRegistry {
    REGISTRY.get_or_init(SchemaRegistry::new)
}
