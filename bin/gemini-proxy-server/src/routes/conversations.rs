//! Conversation CRUD routes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::extract::ValidatedJson;
use crate::schemas::conversation::{
    ConversationResponse, CreateConversationRequest, ListQuery, MessageResponse,
    RenameConversationRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_conversations,
        create_conversation,
        get_conversation,
        rename_conversation,
        delete_conversation,
        list_conversation_messages
    ),
    components(schemas(
        ConversationResponse,
        CreateConversationRequest,
        RenameConversationRequest,
        MessageResponse
    ))
)]
pub struct ConversationsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", get(list_conversations).post(create_conversation))
        .route(
            "/conversations/{id}",
            get(get_conversation)
                .put(rename_conversation)
                .delete(delete_conversation),
        )
        .route("/conversations/{id}/messages", get(list_conversation_messages))
}

#[utoipa::path(
    get,
    path = "/conversations",
    tag = "conversations",
    params(ListQuery),
    responses(
        (status = 200, description = "Conversations", body = Vec<ConversationResponse>),
        (status = 400, description = "Bad limit or order"),
    )
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ConversationResponse>>, ServerError> {
    let conversations = state.conversations.list(q.limit(), q.order()?).await?;
    Ok(Json(conversations.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/conversations",
    tag = "conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 200, description = "Conversation created", body = ConversationResponse),
        (status = 400, description = "Bad name"),
    )
)]
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateConversationRequest>,
) -> Result<Json<ConversationResponse>, ServerError> {
    let created = state.conversations.create(req.name.as_deref()).await?;
    Ok(Json(created.into()))
}

/// Conversation with its 10 most recent messages, oldest first.
#[utoipa::path(
    get,
    path = "/conversations/{id}",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation", body = ConversationResponse),
        (status = 404, description = "No such conversation"),
    )
)]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, ServerError> {
    Ok(Json(state.conversations.get(&id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/conversations/{id}",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    request_body = RenameConversationRequest,
    responses(
        (status = 200, description = "Conversation renamed", body = ConversationResponse),
        (status = 400, description = "Bad name"),
        (status = 404, description = "No such conversation"),
    )
)]
pub async fn rename_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<RenameConversationRequest>,
) -> Result<Json<ConversationResponse>, ServerError> {
    Ok(Json(state.conversations.rename(&id, &req.name).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/conversations/{id}",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation and its messages deleted", body = Value),
        (status = 404, description = "No such conversation"),
    )
)]
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    state.conversations.delete(&id).await?;
    Ok(Json(json!({ "deleted": true })))
}

#[utoipa::path(
    get,
    path = "/conversations/{id}/messages",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id"), ListQuery),
    responses(
        (status = 200, description = "Messages", body = Vec<MessageResponse>),
        (status = 404, description = "No such conversation"),
    )
)]
pub async fn list_conversation_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let messages = state
        .conversations
        .messages(&id, q.limit(), q.order()?)
        .await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
