use serde::{Deserialize, Serialize};

/// Request payload for /ask.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// Free-text customer question.
    pub question: String,
}

/// Response payload for /ask.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    /// FAQ answer, model reply or fallback text.
    pub answer: String,
}
