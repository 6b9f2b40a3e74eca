use serde::Deserialize;
use serde_json::Value;

/// Error body returned by the backend on non-2xx responses.
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

/// Body of `GET /`.
#[derive(Deserialize, Debug)]
pub struct WelcomeResp {
    pub message: String,
}
