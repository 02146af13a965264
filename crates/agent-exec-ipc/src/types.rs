use agent_exec_common::error_codes;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default = "jsonrpc_version")]
    #[allow(dead_code)]
    jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

fn jsonrpc_version() -> String {
    "2.0".to_string()
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            method: method.to_string(),
            params,
        }
    }

    fn param(&self, key: &str) -> Option<&Value> {
        self.params
            .as_ref()
            .and_then(|p| p.get(key))
            .filter(|v| !v.is_null())
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(|v| v.as_str())
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.param(key).and_then(|v| v.as_u64())
    }

    pub fn param_usize(&self, key: &str) -> Option<usize> {
        self.param_u64(key).and_then(|n| usize::try_from(n).ok())
    }

    /// Accepts integers and fractions, e.g. a timeout of `0.5` seconds.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.param(key).and_then(|v| v.as_f64())
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.param(key).is_some()
    }

    #[allow(clippy::result_large_err)]
    pub fn require_str(&self, key: &str) -> Result<&str, RpcResponse> {
        self.param_str(key).ok_or_else(|| {
            RpcResponse::error(
                self.id,
                error_codes::INVALID_PARAMS,
                &format!("Missing '{}' param", key),
            )
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    jsonrpc: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcServerError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcServerError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: None,
            error: Some(RpcServerError {
                code,
                message: message.to_string(),
                data: None,
            }),
        }
    }

    /// Error with the structured fields agents branch on.
    pub fn domain_error(
        id: u64,
        code: i32,
        message: &str,
        category: &str,
        context: Option<Value>,
        suggestion: Option<String>,
    ) -> Self {
        let mut data = json!({
            "category": category,
            "retryable": error_codes::is_retryable(code),
        });
        if let Some(context) = context {
            data["context"] = context;
        }
        if let Some(suggestion) = suggestion {
            data["suggestion"] = Value::String(suggestion);
        }
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: None,
            error: Some(RpcServerError {
                code,
                message: message.to_string(),
                data: Some(data),
            }),
        }
    }

    pub fn parse_error(message: &str) -> Self {
        Self::error(0, error_codes::PARSE_ERROR, message)
    }

    pub fn method_not_found(id: u64, method: &str) -> Self {
        Self::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            &format!("Unknown method: {}", method),
        )
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
