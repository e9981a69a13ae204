//! Intent resolution facade
//!
//! Turns one utterance into one [`ResolvedIntent`]:
//! utterance -> single constrained model request -> raw function call ->
//! validator (normalizing currencies) -> executable action or a clarification.
//!
//! The resolver is stateless between calls. The only shared data is the
//! read-only schema registry, so any number of resolutions may run at once.
//! There is no retry, backoff or timeout at this layer; a failed model call is
//! reported as [`ResolvedIntent::OracleFailure`] and the caller decides what
//! to do next.

use crate::action::{Action, ActionKind};
use crate::audit::{AuditEntry, AuditLog};
use crate::config::Config;
use crate::oracle::{build_request, IntentOracle, OpenAiOracle, OracleReply};
use crate::tools::registry;
use crate::validator::{validate, ValidationErrors};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Outcome of resolving one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedIntent {
    /// Fully specified and valid; ready for the execution engine
    Executable { action: Action },
    /// Required information is missing or unusable; nothing was decided
    NeedsInfo { message: String },
    /// The model call itself failed; the caller may try again
    OracleFailure { reason: String },
}

impl ResolvedIntent {
    pub fn status(&self) -> &'static str {
        match self {
            ResolvedIntent::Executable { .. } => "executable",
            ResolvedIntent::NeedsInfo { .. } => "needs_info",
            ResolvedIntent::OracleFailure { .. } => "oracle_failure",
        }
    }

    pub fn action(&self) -> Option<&Action> {
        match self {
            ResolvedIntent::Executable { action } => Some(action),
            _ => None,
        }
    }

    /// Every validation problem becomes a clarification request
    pub fn from_validation(result: Result<Action, ValidationErrors>) -> Self {
        match result {
            Ok(action) => ResolvedIntent::Executable { action },
            Err(errors) => ResolvedIntent::NeedsInfo {
                message: errors.needs_info_message(),
            },
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            ResolvedIntent::Executable { .. } => None,
            ResolvedIntent::NeedsInfo { message } => Some(message.clone()),
            ResolvedIntent::OracleFailure { reason } => Some(reason.clone()),
        }
    }
}

/// Resolves utterances against the schema registry through an oracle
pub struct IntentResolver {
    oracle: Arc<dyn IntentOracle>,
    default_model: String,
    audit: Option<AuditLog>,
}

impl IntentResolver {
    /// Create a resolver
    ///
    /// # Arguments
    /// * `oracle` - Model boundary used for every resolution
    /// * `default_model` - Model name used when a request does not pick one
    pub fn new(oracle: Arc<dyn IntentOracle>, default_model: impl Into<String>) -> Self {
        Self {
            oracle,
            default_model: default_model.into(),
            audit: None,
        }
    }

    /// Build the production resolver: HTTP oracle plus optional audit log
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let oracle = OpenAiOracle::from_config(&config.oracle)?;
        let mut resolver = Self::new(Arc::new(oracle), config.oracle.model.clone());
        if let Some(path) = &config.audit_log_path {
            tracing::info!(path = %path, "Writing resolution audit log");
            resolver = resolver.with_audit_log(AuditLog::new(path));
        }
        Ok(resolver)
    }

    /// Record every resolution to an audit log
    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Resolve with the default model
    pub async fn resolve(&self, utterance: &str) -> ResolvedIntent {
        self.resolve_with_model(utterance, None).await
    }

    /// Resolve, optionally overriding the model for this request only
    pub async fn resolve_with_model(&self, utterance: &str, model: Option<&str>) -> ResolvedIntent {
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str())
            .to_string();
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "resolve",
            request_id = %request_id,
            oracle = self.oracle.name(),
            model = %model,
        );

        async move {
            let started = Instant::now();
            let (outcome, function_name) = self.resolve_once(utterance, &model).await;
            let duration_ms = millis(started.elapsed());

            match &outcome {
                ResolvedIntent::Executable { action } => tracing::info!(
                    kind = %action.kind(),
                    duration_ms,
                    "Resolved executable action"
                ),
                ResolvedIntent::NeedsInfo { message } => tracing::info!(
                    message = %message,
                    duration_ms,
                    "Utterance needs more information"
                ),
                ResolvedIntent::OracleFailure { reason } => tracing::warn!(
                    reason = %reason,
                    duration_ms,
                    "Oracle failed to produce a structured reply"
                ),
            }

            if let Some(audit) = &self.audit {
                let mut entry =
                    AuditEntry::new(request_id.to_string(), self.oracle.name(), &model, utterance);
                entry.function_name = function_name;
                entry.status = outcome.status();
                entry.detail = outcome.detail();
                entry.duration_ms = duration_ms;
                audit.record(&entry).await;
            }

            outcome
        }
        .instrument(span)
        .await
    }

    /// One oracle request, then interpretation of its reply
    async fn resolve_once(&self, utterance: &str, model: &str) -> (ResolvedIntent, Option<String>) {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return (
                ResolvedIntent::NeedsInfo {
                    message: "missing: request".to_string(),
                },
                None,
            );
        }

        let request = build_request(registry(), model, utterance);
        match self.oracle.complete(&request).await {
            Ok(reply) => interpret(reply),
            Err(e) => (
                ResolvedIntent::OracleFailure {
                    reason: e.to_string(),
                },
                None,
            ),
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn interpret(reply: OracleReply) -> (ResolvedIntent, Option<String>) {
    match reply {
        OracleReply::Message(message) => (ResolvedIntent::NeedsInfo { message }, None),
        OracleReply::FunctionCall { name, arguments } => {
            let Some(kind) = ActionKind::from_function_name(&name) else {
                let reason = format!("model called unknown function `{name}`");
                return (ResolvedIntent::OracleFailure { reason }, Some(name));
            };
            let Some(arguments) = arguments.as_object() else {
                let reason = format!("arguments for `{name}` are not a JSON object");
                return (ResolvedIntent::OracleFailure { reason }, Some(name));
            };
            tracing::debug!(function = %name, "Validating function call");
            (
                ResolvedIntent::from_validation(validate(kind, arguments)),
                Some(name),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{AutoTradeSetting, SwapAction, TransferAction};
    use crate::oracle::{OracleError, OracleRequest};
    use crate::tokens::normalize;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    /// Oracle that answers every request with the same scripted reply
    struct ScriptedOracle {
        reply: Option<OracleReply>,
        calls: AtomicUsize,
        last_request: Mutex<Option<OracleRequest>>,
    }

    impl ScriptedOracle {
        fn call(name: &str, arguments: Value) -> Arc<Self> {
            Self::with(Some(OracleReply::FunctionCall {
                name: name.to_string(),
                arguments,
            }))
        }

        fn message(text: &str) -> Arc<Self> {
            Self::with(Some(OracleReply::Message(text.to_string())))
        }

        fn outage() -> Arc<Self> {
            Self::with(None)
        }

        fn with(reply: Option<OracleReply>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IntentOracle for ScriptedOracle {
        async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            self.reply.clone().ok_or(OracleError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn resolver(oracle: &Arc<ScriptedOracle>) -> IntentResolver {
        IntentResolver::new(oracle.clone(), "gpt-4o")
    }

    #[tokio::test]
    async fn scenario_transfer_with_usd_alias() {
        let oracle = ScriptedOracle::call(
            "transfer_tokens",
            json!({"specifiedToken": "USD", "specifiedAmount": 5, "transferTo": "Alice"}),
        );

        let outcome = resolver(&oracle).resolve("send 5 USD to Alice").await;

        assert_eq!(
            outcome,
            ResolvedIntent::Executable {
                action: Action::Transfer(TransferAction {
                    token: normalize("USDC"),
                    amount: Decimal::from(5),
                    recipient: "Alice".to_string(),
                })
            }
        );
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn scenario_swap_denominated_in_sell_token() {
        let oracle = ScriptedOracle::call(
            "swap_tokens",
            json!({
                "tokenToBuy": "USDC",
                "tokenToSell": "ETH",
                "specifiedAmount": 10,
                "specifiedToken": "ETH"
            }),
        );

        let outcome = resolver(&oracle)
            .resolve("swap my ETH for USDC, I want 10 worth of ETH")
            .await;

        assert_eq!(
            outcome,
            ResolvedIntent::Executable {
                action: Action::Swap(SwapAction {
                    token_to_buy: normalize("USDC"),
                    token_to_sell: normalize("ETH"),
                    amount: Decimal::from(10),
                    reference_token: normalize("ETH"),
                })
            }
        );
    }

    #[tokio::test]
    async fn scenario_auto_trade_buy_on_drop() {
        let oracle = ScriptedOracle::call(
            "settingAI",
            json!({
                "tokenToBuy": "ETH",
                "tokenToSell": null,
                "specifiedAmount": null,
                "specifiedToken": null,
                "buyMax": 100,
                "buyMin": null,
                "sellMax": null,
                "sellMin": null
            }),
        );

        let outcome = resolver(&oracle).resolve("buy ETH when it drops to $100").await;

        assert_eq!(
            outcome,
            ResolvedIntent::Executable {
                action: Action::AutoTradeSetting(AutoTradeSetting {
                    token_to_buy: Some(normalize("ETH")),
                    buy_max: Some(Decimal::from(100)),
                    ..AutoTradeSetting::default()
                })
            }
        );
    }

    #[tokio::test]
    async fn scenario_missing_everything_needs_info() {
        let oracle = ScriptedOracle::call("transfer_tokens", json!({}));

        let outcome = resolver(&oracle).resolve("send some tokens").await;

        assert_eq!(
            outcome,
            ResolvedIntent::NeedsInfo {
                message: "missing: specifiedToken, specifiedAmount, transferTo".to_string()
            }
        );
    }

    #[tokio::test]
    async fn scenario_provider_outage_is_oracle_failure() {
        let oracle = ScriptedOracle::outage();

        let outcome = resolver(&oracle).resolve("send 5 USD to Alice").await;

        match outcome {
            ResolvedIntent::OracleFailure { reason } => assert!(reason.contains("503")),
            other => panic!("expected oracle failure, got {other:?}"),
        }
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn text_reply_becomes_needs_info() {
        let oracle = ScriptedOracle::message("Who should receive the tokens?");

        let outcome = resolver(&oracle).resolve("send 5 ETH").await;

        assert_eq!(
            outcome,
            ResolvedIntent::NeedsInfo {
                message: "Who should receive the tokens?".to_string()
            }
        );
    }

    #[tokio::test]
    async fn invariant_violation_becomes_needs_info() {
        let oracle = ScriptedOracle::call(
            "settingAI",
            json!({
                "tokenToBuy": "ETH",
                "tokenToSell": null,
                "specifiedAmount": null,
                "specifiedToken": null,
                "buyMin": 200,
                "buyMax": 100
            }),
        );

        let outcome = resolver(&oracle).resolve("buy ETH between 200 and 100").await;

        assert_eq!(
            outcome,
            ResolvedIntent::NeedsInfo {
                message: "invalid: `buyMin` (200) must be less than `buyMax` (100)".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unknown_function_is_oracle_failure() {
        let oracle = ScriptedOracle::call("bridge_tokens", json!({}));
        let outcome = resolver(&oracle).resolve("bridge my ETH").await;
        assert_eq!(outcome.status(), "oracle_failure");
    }

    #[tokio::test]
    async fn non_object_arguments_are_oracle_failure() {
        let oracle = ScriptedOracle::call("transfer_tokens", json!(["USD", 5, "Alice"]));
        let outcome = resolver(&oracle).resolve("send 5 USD to Alice").await;
        assert_eq!(outcome.status(), "oracle_failure");
    }

    #[tokio::test]
    async fn blank_utterance_skips_oracle() {
        let oracle = ScriptedOracle::outage();
        let outcome = resolver(&oracle).resolve("   ").await;
        assert_eq!(
            outcome,
            ResolvedIntent::NeedsInfo {
                message: "missing: request".to_string()
            }
        );
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn request_is_constrained_to_registry() {
        let oracle = ScriptedOracle::message("missing amount");
        let resolver = resolver(&oracle);

        resolver.resolve("  send ETH to Bob ").await;
        {
            let request = oracle.last_request.lock().unwrap().clone().unwrap();
            assert_eq!(request.model, "gpt-4o");
            assert_eq!(request.utterance, "send ETH to Bob");
            assert_eq!(request.tools, registry().tool_definitions());
        }

        resolver
            .resolve_with_model("send ETH to Bob", Some("gpt-4o-mini"))
            .await;
        let request = oracle.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_resolutions_are_independent() {
        let oracle = ScriptedOracle::call(
            "transfer_tokens",
            json!({"specifiedToken": "eth", "specifiedAmount": "0.5", "transferTo": "Eve"}),
        );
        let resolver = resolver(&oracle);

        let outcomes =
            futures::future::join_all((0..8).map(|_| resolver.resolve("send half an eth to Eve")))
                .await;

        assert_eq!(oracle.calls(), 8);
        assert!(outcomes.iter().all(|o| o.status() == "executable"));
    }

    #[tokio::test]
    async fn resolutions_are_audited() {
        let temp_file = NamedTempFile::new().unwrap();
        let oracle = ScriptedOracle::call("transfer_tokens", json!({"transferTo": "Alice"}));
        let resolver = resolver(&oracle).with_audit_log(AuditLog::new(temp_file.path()));

        resolver.resolve("send tokens to Alice").await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let entry: Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(entry["status"], "needs_info");
        assert_eq!(entry["function_name"], "transfer_tokens");
        assert_eq!(entry["oracle"], "scripted");
        assert_eq!(entry["detail"], "missing: specifiedToken, specifiedAmount");
    }

    #[test]
    fn durations_saturate_instead_of_wrapping() {
        assert_eq!(millis(Duration::from_millis(1_250)), 1_250);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn resolved_intent_wire_format() {
        let executable = ResolvedIntent::Executable {
            action: Action::Transfer(TransferAction {
                token: normalize("USDC"),
                amount: Decimal::from(5),
                recipient: "Alice".to_string(),
            }),
        };
        let value = serde_json::to_value(&executable).unwrap();
        assert_eq!(value["status"], "executable");
        assert_eq!(value["action"]["kind"], "transfer");
        assert_eq!(value["action"]["token"], "USDC");

        let needs_info = ResolvedIntent::NeedsInfo {
            message: "missing: transferTo".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&needs_info).unwrap(),
            json!({"status": "needs_info", "message": "missing: transferTo"})
        );
    }
}
