use async_openai::types::{
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{api_state::ApiState, error::ApiError};

/// How many rows of chart data the prompt may carry.
const PROMPT_ROW_LIMIT: usize = 100;

const SYSTEM_PROMPT: &str = "You are an expert observability assistant.";

#[derive(Debug, Deserialize)]
pub struct InsightRequest {
    pub table_name: String,
    #[serde(default = "default_granularity")]
    pub granularity: String,
    #[serde(default)]
    pub rows: Vec<Value>,
}

fn default_granularity() -> String {
    "hour".to_string()
}

/// Summarizes chart data through the configured LLM.
///
/// Model failures answer 200 with the error folded into the insight text so
/// the dashboard renders something instead of breaking the chart view.
pub async fn generate_insights(
    State(state): State<ApiState>,
    Json(request): Json<InsightRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = build_insight_prompt(&request);
    info!(
        table = %request.table_name,
        granularity = %request.granularity,
        rows = request.rows.len(),
        "generating insights"
    );

    let chat_request = CreateChatCompletionRequestArgs::default()
        .model(&state.config.insight_model)
        .messages([
            ChatCompletionRequestSystemMessage::from(SYSTEM_PROMPT).into(),
            ChatCompletionRequestUserMessage::from(prompt).into(),
        ])
        .build()
        .map_err(common::error::AppError::from)?;

    let insight = match state.openai_client.chat().create(chat_request).await {
        Ok(response) => response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .unwrap_or_default(),
        Err(err) => {
            warn!(error = %err, "insight model call failed");
            format!("AI model error: {err}")
        }
    };

    Ok(Json(json!({ "insight": insight })))
}

fn build_insight_prompt(request: &InsightRequest) -> String {
    let preview: Vec<&Value> = request.rows.iter().take(PROMPT_ROW_LIMIT).collect();
    let preview_json =
        serde_json::to_string(&preview).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are given JVM performance data from the table \"{table}\".\n\
         Each row has fields like an ISO timestamp and per-bucket measurements.\n\
         \n\
         Granularity: {granularity}\n\
         \n\
         Here is a sample of the data in JSON:\n\
         {preview_json}\n\
         \n\
         In 3-6 concise bullet points, explain:\n\
         - Key trends over time\n\
         - Any spikes or drops\n\
         - Anything that looks anomalous or worth investigating\n\
         \n\
         Respond in plain text, no markdown, no JSON.",
        table = request.table_name,
        granularity = request.granularity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_bounded_to_the_row_limit() {
        let rows: Vec<Value> = (0..500).map(|i| json!({ "max_active": i })).collect();
        let request = InsightRequest {
            table_name: "20250101_upload1_MethodContextStats".to_string(),
            granularity: "hour".to_string(),
            rows,
        };

        let prompt = build_insight_prompt(&request);
        assert!(prompt.contains("\"max_active\":99"));
        assert!(!prompt.contains("\"max_active\":100"));
        assert!(prompt.contains("Granularity: hour"));
    }

    #[test]
    fn granularity_defaults_to_hour() {
        let request: InsightRequest =
            serde_json::from_value(json!({ "table_name": "t" })).expect("deserialize");
        assert_eq!(request.granularity, "hour");
        assert!(request.rows.is_empty());
    }
}
