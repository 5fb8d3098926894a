use faq_resolver::Message;
use serde::{Deserialize, Serialize};

/// Response for POST /sessions and GET /sessions/{id}.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub busy: bool,
    pub messages: Vec<Message>,
}

/// Request payload for POST /sessions/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PostMessageResponse {
    pub user_message: Message,
    pub reply: Message,
}
