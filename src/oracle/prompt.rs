//! Instruction and payload sent with every resolution request.

use super::OracleRequest;
use crate::tools::SchemaRegistry;

/// Behavioral rules for the model
pub const SYSTEM_PROMPT: &str = "You are a blockchain wallet assistant. You turn a user's request \
into the parameters of the wallet action they want to perform. Never invent factual information. \
Confirmation is handled elsewhere: never ask the user to confirm anything. Always answer with a \
function call. Only if the user did not give enough information for a function's required fields, \
reply with a message that names the missing information. The AI trading setting lets the user \
describe conditions under which trades are made for them; if they give no trading limits, do not \
ask about them and call the function anyway.";

/// Build the single request for `utterance`, constrained to every registered function
pub fn build_request(
    registry: &SchemaRegistry,
    model: &str,
    utterance: &str,
) -> OracleRequest {
    OracleRequest {
        model: model.to_string(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        utterance: utterance.to_string(),
        tools: registry.tool_definitions(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry;

    #[test]
    fn request_carries_every_function() {
        let request = build_request(registry(), "gpt-4o", "send 5 USD to Alice");
        assert_eq!(request.tools.len(), 3);
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.utterance, "send 5 USD to Alice");
    }

    #[test]
    fn prompt_forbids_confirmation() {
        assert!(SYSTEM_PROMPT.contains("never ask the user to confirm"));
        assert!(SYSTEM_PROMPT.contains("Never invent"));
    }
}
