use crate::models::chat::*;
use crate::services::{ChatService, ChatStreamChunk};
use crate::utils::error::ApiError;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    Json,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

pub async fn chat_handler(
    State(chat_service): State<Arc<ChatService>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let start_time = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!(
        "chat",
        request_id = %request_id,
        session_id = %request.session_id,
        mode = request.mode.as_str(),
    );

    info!(
        parent: &span,
        "Chat request: message_len={}, stream={}",
        request.message.len(),
        request.stream
    );

    if !request.stream {
        let reply = chat_service.reply(&request).instrument(span.clone()).await;
        info!(
            parent: &span,
            "Chat reply ready in {}ms",
            start_time.elapsed().as_millis()
        );
        return Ok(Json(ChatReply { reply }).into_response());
    }

    let session_id = request.session_id.clone();
    let mut rx = span.in_scope(|| chat_service.reply_stream(request));

    let stream = async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            match chunk {
                ChatStreamChunk::Token(token) => {
                    yield Ok::<_, Infallible>(create_sse_event("message", &MessageChunk { token }));
                }
                ChatStreamChunk::Done => {
                    let processing_time_ms = start_time.elapsed().as_millis() as u64;
                    info!(parent: &span, "Chat stream completed in {}ms", processing_time_ms);

                    yield Ok(create_sse_event("done", &CompletionInfo {
                        done: true,
                        session_id: session_id.clone(),
                        request_id: request_id.clone(),
                        processing_time_ms,
                    }));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()).into_response())
}

fn create_sse_event<T: serde::Serialize>(event_type: &str, data: &T) -> Event {
    Event::default()
        .event(event_type)
        .data(serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string()))
}

