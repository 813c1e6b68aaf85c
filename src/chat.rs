use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use crate::ai_service::CompletionService;
use crate::error::{AppError, AppResult};
use crate::models::{ChatHistory, Conversation};
use crate::store::HistoryStore;

/// Result of one chat exchange. `conversation_id` is the id the message
/// pair actually landed in; when the caller-supplied id matched nothing,
/// this is the freshly minted one the client should use from now on.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub assistant_text: String,
    pub conversation_id: String,
}

/// Chat orchestrator and history queries.
///
/// Every read-modify-write of a ChatHistory document runs under that
/// user's lock, so two concurrent chats for one user cannot overwrite
/// each other's copy. The AI call happens before the lock is taken.
pub struct ChatService {
    store: Arc<dyn HistoryStore>,
    ai: Arc<dyn CompletionService>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChatService {
    pub fn new(store: Arc<dyn HistoryStore>, ai: Arc<dyn CompletionService>) -> Self {
        Self {
            store,
            ai,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// One chat exchange: call the AI once, then append the prompt/reply
    /// pair to the target conversation, creating history or conversation
    /// as needed. Exactly one store write, completed before returning.
    pub async fn handle_chat(
        &self,
        prompt: &str,
        user_id: &str,
        conversation_id: &str,
    ) -> AppResult<ChatReply> {
        if prompt.trim().is_empty() || user_id.trim().is_empty() || conversation_id.trim().is_empty()
        {
            return Err(AppError::Validation(
                "question, userId and messageId are required".into(),
            ));
        }

        // Single attempt, no retry; a failure here persists nothing.
        let assistant_text = self
            .ai
            .complete(prompt)
            .await
            .map_err(|e| AppError::Upstream(format!("{e:#}")))?;

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut history = self
            .store
            .find_by_user(user_id)
            .await
            .map_err(AppError::persistence)?
            .unwrap_or_else(|| ChatHistory::new(user_id.to_string()));

        let position = history
            .conversations
            .iter()
            .position(|c| c.id == conversation_id);
        let target_id = match position {
            Some(i) => {
                let conversation = &mut history.conversations[i];
                conversation.push_pair(prompt.to_string(), assistant_text.clone());
                conversation.id.clone()
            }
            None => {
                // Unknown (or stale) id: mint a fresh conversation and
                // report its real id back to the caller.
                let mut conversation = Conversation::new();
                conversation.push_pair(prompt.to_string(), assistant_text.clone());
                let id = conversation.id.clone();
                history.conversations.push(conversation);
                id
            }
        };
        history.updated_at = Utc::now();

        self.store
            .upsert(&history)
            .await
            .map_err(AppError::persistence)?;

        info!(user_id, conversation_id = %target_id, "appended chat exchange");

        Ok(ChatReply {
            assistant_text,
            conversation_id: target_id,
        })
    }

    /// Append a fresh empty conversation to the user's history
    /// (creating the history on first use) and return it.
    pub async fn start_conversation(&self, user_id: &str) -> AppResult<Conversation> {
        if user_id.trim().is_empty() {
            return Err(AppError::Validation("userId is required".into()));
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut history = self
            .store
            .find_by_user(user_id)
            .await
            .map_err(AppError::persistence)?
            .unwrap_or_else(|| ChatHistory::new(user_id.to_string()));

        let conversation = Conversation::new();
        history.conversations.push(conversation.clone());
        history.updated_at = Utc::now();

        self.store
            .upsert(&history)
            .await
            .map_err(AppError::persistence)?;

        info!(user_id, conversation_id = %conversation.id, "started conversation");
        Ok(conversation)
    }

    /// All of a user's conversations; empty when the user has no history.
    pub async fn get_history(&self, user_id: &str) -> AppResult<Vec<Conversation>> {
        let history = self
            .store
            .find_by_user(user_id)
            .await
            .map_err(AppError::persistence)?;

        Ok(history.map(|h| h.conversations).unwrap_or_default())
    }

    /// Linear scan of the user's conversation list by id.
    pub async fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> AppResult<Conversation> {
        let history = self
            .store
            .find_by_user(user_id)
            .await
            .map_err(AppError::persistence)?
            .ok_or_else(|| AppError::NotFound("conversation not found".into()))?;

        history
            .find_conversation(conversation_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("conversation not found".into()))
    }
}
