//! Conversation orchestrator.
//!
//! A request goes through: validate, persist the user message, load history,
//! call the generator, relay fragments, persist the reply. Store failures
//! along the way are logged and never fail the request. Upstream failures do.

use std::sync::Arc;

use futures::stream::{self, BoxStream, Fuse};
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::ChatSettings;
use crate::domain::validation::{resolve_model, validate_message_content, ContentLimits};
use crate::domain::{Fragment, Message, Role};
use crate::entities::MessageStore;
use crate::error::CoreError;
use crate::gemini::{FragmentStream, Generator};

/// Reply fragments for the client. Ends on upstream completion or failure.
pub type ChatStream = BoxStream<'static, Fragment>;

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub conversation_id: String,
    pub content: String,
    /// Falls back to the configured default when absent or malformed.
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub conversation_id: String,
    pub model: String,
    pub content: String,
}

/// Everything generation needs, resolved from a request.
struct Prepared {
    conversation_id: String,
    model: String,
    history: Vec<Message>,
}

pub struct ChatService<S, G> {
    store: Arc<S>,
    generator: Arc<G>,
    settings: ChatSettings,
}

impl<S, G> Clone for ChatService<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            settings: self.settings.clone(),
        }
    }
}

impl<S: MessageStore, G: Generator> ChatService<S, G> {
    pub fn new(store: Arc<S>, generator: Arc<G>, settings: ChatSettings) -> Self {
        Self {
            store,
            generator,
            settings,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    async fn prepare(&self, req: ChatRequest) -> Result<Prepared, CoreError> {
        let conversation_id = req.conversation_id.trim().to_owned();
        if conversation_id.is_empty() {
            return Err(CoreError::Validation("conversation_id must be provided".into()));
        }
        let content = validate_message_content(
            &req.content,
            ContentLimits {
                allow_sql_snippets: self.settings.allow_sql_snippets,
                ..ContentLimits::default()
            },
        )?;

        let user_msg = Message::new(&conversation_id, Role::User, content);
        self.store
            .save(user_msg.clone())
            .await
            .map(drop)
            .unwrap_or_else(|e| warn!(%conversation_id, error = %e, "failed to persist user message"));

        let model = resolve_model(req.model.as_deref(), &self.settings.default_model);

        let limit = self.settings.history_limit;
        let mut history = self
            .store
            .get_latest_by_conversation(&conversation_id, limit)
            .await
            .unwrap_or_else(|e| {
                warn!(%conversation_id, error = %e, "failed to load history; continuing without it");
                Vec::new()
            });

        // The prompt goes last whether or not its save succeeded.
        history.retain(|m| m.id != user_msg.id);
        history.sort_by_key(|m| m.created_at);
        history.push(user_msg);
        let excess = history.len().saturating_sub(limit.max(1) as usize);
        history.drain(..excess);

        debug!(%conversation_id, %model, history_len = history.len(), "prepared generation request");
        Ok(Prepared {
            conversation_id,
            model,
            history,
        })
    }

    /// One-shot generation under the configured deadline.
    pub async fn query(&self, req: ChatRequest) -> Result<ChatReply, CoreError> {
        let prepared = self.prepare(req).await?;
        let deadline = self.settings.upstream_timeout;

        let generation = self.generator.generate(&prepared.model, &prepared.history);
        let content = match tokio::time::timeout(deadline, generation).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                error!(conversation_id = %prepared.conversation_id, error = %e, "generation failed");
                return Err(e.into());
            }
            Err(_) => {
                error!(conversation_id = %prepared.conversation_id, deadline_secs = deadline.as_secs(), "generation timed out");
                return Err(CoreError::UpstreamTimeout(deadline.as_secs()));
            }
        };

        persist_reply(self.store.as_ref(), &prepared.conversation_id, content.clone()).await;
        info!(conversation_id = %prepared.conversation_id, model = %prepared.model, reply_len = content.len(), "query complete");
        Ok(ChatReply {
            conversation_id: prepared.conversation_id,
            model: prepared.model,
            content,
        })
    }

    /// Streaming generation.
    ///
    /// Resolves once the upstream has produced its first fragment (or ended),
    /// so a failure before anything was relayed is returned as an error rather
    /// than as an empty stream.
    pub async fn query_stream(&self, req: ChatRequest) -> Result<ChatStream, CoreError> {
        let prepared = self.prepare(req).await?;

        let mut upstream = self
            .generator
            .stream_generate(&prepared.model, &prepared.history)
            .await
            .map_err(|e| {
                error!(conversation_id = %prepared.conversation_id, error = %e, "could not start generation stream");
                CoreError::from(e)
            })?
            .fuse();

        let first = match upstream.next().await {
            Some(Ok(fragment)) => Some(fragment),
            Some(Err(e)) => {
                error!(conversation_id = %prepared.conversation_id, error = %e, "generation stream failed before first fragment");
                return Err(e.into());
            }
            None => None,
        };

        let relay = Relay {
            upstream,
            store: Arc::clone(&self.store),
            conversation_id: prepared.conversation_id,
            first,
            accumulated: String::new(),
            finished: false,
        };
        Ok(relay.into_stream())
    }
}

async fn persist_reply<S: MessageStore>(store: &S, conversation_id: &str, content: String) {
    store
        .save(Message::new(conversation_id, Role::Model, content))
        .await
        .map(drop)
        .unwrap_or_else(|e| warn!(%conversation_id, error = %e, "failed to persist assistant message"));
}

/// Forwards fragments while accumulating them.
///
/// Dropped without `finished` set means the consumer went away mid-stream.
struct Relay<S: MessageStore> {
    /// Fused: the first item was already awaited and may have been the end.
    upstream: Fuse<FragmentStream>,
    store: Arc<S>,
    conversation_id: String,
    first: Option<Fragment>,
    accumulated: String,
    finished: bool,
}

impl<S: MessageStore> Relay<S> {
    fn into_stream(self) -> ChatStream {
        stream::unfold(self, |mut relay| async move {
            if let Some(fragment) = relay.first.take() {
                relay.accumulated.push_str(&fragment);
                return Some((fragment, relay));
            }
            if relay.finished {
                return None;
            }
            match relay.upstream.next().await {
                Some(Ok(fragment)) => {
                    relay.accumulated.push_str(&fragment);
                    Some((fragment, relay))
                }
                Some(Err(e)) => {
                    relay.finished = true;
                    warn!(
                        conversation_id = %relay.conversation_id,
                        relayed_len = relay.accumulated.len(),
                        error = %e,
                        "generation stream failed mid-way; reply not persisted"
                    );
                    None
                }
                None => {
                    relay.finished = true;
                    let content = std::mem::take(&mut relay.accumulated);
                    info!(conversation_id = %relay.conversation_id, reply_len = content.len(), "stream complete");
                    persist_reply(relay.store.as_ref(), &relay.conversation_id, content).await;
                    None
                }
            }
        })
        .boxed()
    }
}

impl<S: MessageStore> Drop for Relay<S> {
    fn drop(&mut self) {
        if !self.finished {
            info!(
                conversation_id = %self.conversation_id,
                relayed_len = self.accumulated.len(),
                "client went away mid-stream; reply discarded"
            );
        }
    }
}
