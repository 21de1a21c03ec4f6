use crate::adapter::AdapterError;
use crate::connect::Backend;

use serde::Serialize;

#[derive(Serialize)]
struct ChatTurn<'a> {
    user_prompt: &'a str,
    assistant_prompt: &'a str,
}

/// Records one prompt/response exchange. The backend's ack is opaque.
pub async fn add_chat_history(
    backend: &Backend,
    user_prompt: &str,
    assistant_prompt: &str,
) -> Result<serde_json::Value, AdapterError> {
    let mut response = backend
        .post_json(
            "/api/add_chat_history",
            &ChatTurn {
                user_prompt,
                assistant_prompt,
            },
        )
        .await
        .inspect_err(|e| log::warn!("add_chat_history failed: {e}"))?;

    Ok(response
        .get_mut("results")
        .map(serde_json::Value::take)
        .unwrap_or(serde_json::Value::Null))
}
