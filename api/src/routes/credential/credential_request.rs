use serde::{Deserialize, Serialize};

/// Request payload for PUT /credential.
#[derive(Deserialize)]
pub struct SetCredentialRequest {
    /// Raw credential; surrounding whitespace is dropped.
    pub value: String,
    /// Chat to notify with the "key has been set" notice.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Credential presence. The value itself is never echoed back.
#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    pub has_credential: bool,
}
