//! Validation of raw function calls against the schema registry
//!
//! The model's arguments are checked in two passes. The first walks the
//! registry schema field by field (presence, then type) and reports every
//! problem it finds so one clarification message can name all of them. Only a
//! clean first pass moves on to value and cross-field invariants, after which
//! the immutable [`Action`] record is built with every currency normalized.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::action::{Action, ActionKind, AutoTradeSetting, SwapAction, TransferAction};
use crate::tokens::{normalize, CurrencySymbol};
use crate::tools::fields::*;
use crate::tools::{registry, FieldType, ParameterSchema};

/// A single reason a function call cannot be executed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required field `{field}`")]
    MissingRequiredField { field: &'static str },

    #[error("`{field}` should be a {expected}, got {actual}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("`{field}` must not be empty")]
    EmptyValue { field: &'static str },

    #[error("`{field}` must be greater than zero, got {value}")]
    NonPositiveAmount { field: &'static str, value: Decimal },

    #[error("`{field}` must not be negative, got {value}")]
    NegativeBound { field: &'static str, value: Decimal },

    #[error("`{lower_field}` ({lower}) must be less than `{upper_field}` ({upper})")]
    RangeInvariantViolation {
        lower_field: &'static str,
        lower: Decimal,
        upper_field: &'static str,
        upper: Decimal,
    },

    #[error("`tokenToBuy` and `tokenToSell` are both {token}")]
    SameToken { token: CurrencySymbol },

    #[error("`specifiedToken` {reference} is neither the token to buy ({buy}) nor the token to sell ({sell})")]
    ReferenceTokenMismatch {
        reference: CurrencySymbol,
        buy: CurrencySymbol,
        sell: CurrencySymbol,
    },
}

impl ValidationError {
    /// Argument names this error is about
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            ValidationError::MissingRequiredField { field }
            | ValidationError::TypeMismatch { field, .. }
            | ValidationError::EmptyValue { field }
            | ValidationError::NonPositiveAmount { field, .. }
            | ValidationError::NegativeBound { field, .. } => vec![*field],
            ValidationError::RangeInvariantViolation {
                lower_field,
                upper_field,
                ..
            } => vec![*lower_field, *upper_field],
            ValidationError::SameToken { .. } => vec![TOKEN_TO_BUY, TOKEN_TO_SELL],
            ValidationError::ReferenceTokenMismatch { .. } => {
                vec![SPECIFIED_TOKEN, TOKEN_TO_BUY, TOKEN_TO_SELL]
            }
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ValidationError::MissingRequiredField { .. })
    }
}

/// Every problem found in one function call, in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.0
            .iter()
            .filter_map(|e| match e {
                ValidationError::MissingRequiredField { field } => Some(*field),
                _ => None,
            })
            .collect()
    }

    /// User-facing clarification request naming exactly the offending fields.
    ///
    /// Missing fields are grouped as `missing: a, b`; every other problem is
    /// described on its own, separated by `; `.
    pub fn needs_info_message(&self) -> String {
        let mut parts = Vec::new();
        let missing = self.missing_fields();
        if !missing.is_empty() {
            parts.push(format!("missing: {}", missing.join(", ")));
        }
        parts.extend(
            self.0
                .iter()
                .filter(|e| !e.is_missing())
                .map(|e| format!("invalid: {e}")),
        );
        parts.join("; ")
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.needs_info_message())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

/// A field value that passed its type check
#[derive(Debug, Clone)]
enum Scalar {
    Text(String),
    Number(Decimal),
}

/// Arguments that passed the first pass; `null` and absent fields are not stored
struct CheckedArgs {
    values: HashMap<&'static str, Scalar>,
}

/// Validate a raw function call for `kind` and build its action record
pub fn validate(kind: ActionKind, raw: &Map<String, Value>) -> Result<Action, ValidationErrors> {
    let schema = registry().schema_for(kind);
    let args = check_fields(schema, raw)?;

    let mut errors = Vec::new();
    let action = match kind {
        ActionKind::Transfer => build_transfer(&args, &mut errors),
        ActionKind::Swap => build_swap(&args, &mut errors),
        ActionKind::AutoTradeSetting => build_auto_trade(&args, &mut errors),
    };

    match action {
        Some(action) if errors.is_empty() => Ok(action),
        _ => Err(ValidationErrors(errors)),
    }
}

/// Validate a call addressed by its function name
pub fn validate_call(
    function_name: &str,
    raw: &Map<String, Value>,
) -> Option<Result<Action, ValidationErrors>> {
    ActionKind::from_function_name(function_name).map(|kind| validate(kind, raw))
}

fn check_fields(
    schema: &ParameterSchema,
    raw: &Map<String, Value>,
) -> Result<CheckedArgs, ValidationErrors> {
    let mut errors = Vec::new();
    let mut values = HashMap::new();

    for spec in schema.fields() {
        let value = match raw.get(spec.name) {
            None => {
                if spec.required {
                    errors.push(ValidationError::MissingRequiredField { field: spec.name });
                }
                continue;
            }
            Some(value) => value,
        };

        if value.is_null() {
            if !spec.nullable {
                errors.push(ValidationError::TypeMismatch {
                    field: spec.name,
                    expected: spec.ty.json_name(),
                    actual: "null",
                });
            }
            continue;
        }

        let checked = match spec.ty {
            FieldType::String => value.as_str().map(|s| Scalar::Text(s.to_string())),
            FieldType::Number => parse_decimal(value).map(Scalar::Number),
        };
        match checked {
            Some(scalar) => {
                values.insert(spec.name, scalar);
            }
            None => errors.push(ValidationError::TypeMismatch {
                field: spec.name,
                expected: spec.ty.json_name(),
                actual: mismatch_type(spec.ty, value),
            }),
        }
    }

    for key in raw.keys() {
        if schema.field(key).is_none() {
            tracing::warn!(
                function = schema.function_name(),
                field = %key,
                "Ignoring argument not declared by the schema"
            );
        }
    }

    if errors.is_empty() {
        Ok(CheckedArgs { values })
    } else {
        Err(ValidationErrors(errors))
    }
}

/// Accepts JSON numbers and strings holding a plain or scientific decimal
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_str(&n.to_string()),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}

fn parse_decimal_str(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn mismatch_type(expected: FieldType, value: &Value) -> &'static str {
    match (expected, value) {
        (FieldType::Number, Value::Number(_)) => "out-of-range number",
        _ => json_type(value),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl CheckedArgs {
    fn text(&self, field: &'static str) -> Option<&str> {
        match self.values.get(field) {
            Some(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    fn number(&self, field: &'static str) -> Option<Decimal> {
        match self.values.get(field) {
            Some(Scalar::Number(n)) => Some(*n),
            _ => None,
        }
    }

    fn symbol(
        &self,
        field: &'static str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<CurrencySymbol> {
        let symbol = normalize(self.text(field)?);
        if symbol.is_empty() {
            errors.push(ValidationError::EmptyValue { field });
            return None;
        }
        Some(symbol)
    }

    fn amount(&self, field: &'static str, errors: &mut Vec<ValidationError>) -> Option<Decimal> {
        let value = self.number(field)?;
        if value <= Decimal::ZERO {
            errors.push(ValidationError::NonPositiveAmount { field, value });
            return None;
        }
        Some(value)
    }

    fn bound(&self, field: &'static str, errors: &mut Vec<ValidationError>) -> Option<Decimal> {
        let value = self.number(field)?;
        if value < Decimal::ZERO {
            errors.push(ValidationError::NegativeBound { field, value });
            return None;
        }
        Some(value)
    }
}

/// Presence of a non-nullable field is guaranteed by the first pass; this
/// only turns the impossible case into an error instead of a panic.
fn require<T>(
    value: Option<T>,
    field: &'static str,
    errors: &mut Vec<ValidationError>,
) -> Option<T> {
    if value.is_none() && !errors.iter().any(|e| e.fields().contains(&field)) {
        errors.push(ValidationError::MissingRequiredField { field });
    }
    value
}

fn build_transfer(args: &CheckedArgs, errors: &mut Vec<ValidationError>) -> Option<Action> {
    let token = require(args.symbol(SPECIFIED_TOKEN, errors), SPECIFIED_TOKEN, errors);
    let amount = require(args.amount(SPECIFIED_AMOUNT, errors), SPECIFIED_AMOUNT, errors);
    let recipient = args.text(TRANSFER_TO).map(str::trim);
    let recipient = match recipient {
        Some("") => {
            errors.push(ValidationError::EmptyValue { field: TRANSFER_TO });
            None
        }
        other => require(other, TRANSFER_TO, errors),
    };

    Some(Action::Transfer(TransferAction {
        token: token?,
        amount: amount?,
        recipient: recipient?.to_string(),
    }))
}

fn build_swap(args: &CheckedArgs, errors: &mut Vec<ValidationError>) -> Option<Action> {
    let buy = require(args.symbol(TOKEN_TO_BUY, errors), TOKEN_TO_BUY, errors);
    let sell = require(args.symbol(TOKEN_TO_SELL, errors), TOKEN_TO_SELL, errors);
    let amount = require(args.amount(SPECIFIED_AMOUNT, errors), SPECIFIED_AMOUNT, errors);
    let reference = require(args.symbol(SPECIFIED_TOKEN, errors), SPECIFIED_TOKEN, errors);

    let (buy, sell, amount, reference) = (buy?, sell?, amount?, reference?);
    check_sides(&buy, &sell, Some(&reference), errors);

    Some(Action::Swap(SwapAction {
        token_to_buy: buy,
        token_to_sell: sell,
        amount,
        reference_token: reference,
    }))
}

fn build_auto_trade(args: &CheckedArgs, errors: &mut Vec<ValidationError>) -> Option<Action> {
    let setting = AutoTradeSetting {
        token_to_buy: args.symbol(TOKEN_TO_BUY, errors),
        token_to_sell: args.symbol(TOKEN_TO_SELL, errors),
        amount: args.amount(SPECIFIED_AMOUNT, errors),
        reference_token: args.symbol(SPECIFIED_TOKEN, errors),
        buy_min: args.bound(BUY_MIN, errors),
        buy_max: args.bound(BUY_MAX, errors),
        sell_min: args.bound(SELL_MIN, errors),
        sell_max: args.bound(SELL_MAX, errors),
    };

    // Side checks only make sense once both sides are named.
    if let (Some(buy), Some(sell)) = (&setting.token_to_buy, &setting.token_to_sell) {
        check_sides(buy, sell, setting.reference_token.as_ref(), errors);
    }
    check_order(BUY_MIN, setting.buy_min, BUY_MAX, setting.buy_max, errors);
    check_order(SELL_MIN, setting.sell_min, SELL_MAX, setting.sell_max, errors);

    Some(Action::AutoTradeSetting(setting))
}

fn check_sides(
    buy: &CurrencySymbol,
    sell: &CurrencySymbol,
    reference: Option<&CurrencySymbol>,
    errors: &mut Vec<ValidationError>,
) {
    if buy == sell {
        errors.push(ValidationError::SameToken { token: buy.clone() });
        return;
    }
    if let Some(reference) = reference {
        if reference != buy && reference != sell {
            errors.push(ValidationError::ReferenceTokenMismatch {
                reference: reference.clone(),
                buy: buy.clone(),
                sell: sell.clone(),
            });
        }
    }
}

fn check_order(
    lower_field: &'static str,
    lower: Option<Decimal>,
    upper_field: &'static str,
    upper: Option<Decimal>,
    errors: &mut Vec<ValidationError>,
) {
    if let (Some(lower), Some(upper)) = (lower, upper) {
        if lower >= upper {
            errors.push(ValidationError::RangeInvariantViolation {
                lower_field,
                lower,
                upper_field,
                upper,
            });
        }
    }
}
