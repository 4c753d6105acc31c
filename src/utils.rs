//! Argument helpers shared by the MCP tools.

use serde::de::DeserializeOwned;
use serde_json::{from_value, Value};

use crate::mcp::protocol::{error_codes, Response};

/// Helper function to extract a required argument from a JSON object
pub fn get_required_arg<T: DeserializeOwned>(
    args: &Value,
    key: &str,
    req_id: &Value,
) -> Result<T, Response> {
    from_value(args.get(key).cloned().unwrap_or(Value::Null)).map_err(|_| {
        Response::error(
            req_id.clone(),
            error_codes::INVALID_PARAMS,
            format!("Missing or invalid required argument: '{}'", key),
        )
    })
}

/// Optional string argument; empty strings count as absent.
pub fn get_optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Deserializes the whole arguments object into an operation's parameters.
pub fn parse_args<T: DeserializeOwned>(args: &Value, req_id: &Value) -> Result<T, Response> {
    from_value(args.clone()).map_err(|e| {
        Response::error(
            req_id.clone(),
            error_codes::INVALID_PARAMS,
            format!("Invalid arguments: {}", e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_and_optional_args() {
        let args = json!({"chain": "base", "blank": "  "});
        let id = json!(1);
        let chain: String = get_required_arg(&args, "chain", &id).unwrap();
        assert_eq!(chain, "base");
        assert!(get_required_arg::<String>(&args, "missing", &id).is_err());
        assert_eq!(get_optional_str(&args, "blank"), None);
    }
}
