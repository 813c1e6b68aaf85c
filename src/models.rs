use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message. Always stored explicitly per message; the
/// position of a message within a conversation is never used to infer it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Sender::User),
            "assistant" => Some(Sender::Assistant),
            _ => None,
        }
    }
}

/// A single message in a conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, content: String) -> Self {
        Self {
            content,
            sender,
            timestamp: Utc::now(),
        }
    }
}

/// One ordered thread of user/assistant message pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Fresh empty conversation with a server-minted id.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
        }
    }

    /// Append one request/response pair as a unit.
    pub fn push_pair(&mut self, prompt: String, reply: String) {
        self.messages.push(Message::new(Sender::User, prompt));
        self.messages.push(Message::new(Sender::Assistant, reply));
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-user container of all of that user's conversations.
/// At most one exists per user (lookup-or-create).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    pub user_id: String,
    pub conversations: Vec<Conversation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatHistory {
    pub fn new(user_id: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            conversations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn find_conversation(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == conversation_id)
    }
}

/// An account. Exactly one of `password_hash` / `google_id` is set:
/// password accounts have a hash, Google accounts have a provider id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub picture: Option<String>,
}

impl User {
    pub fn new_local(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash: Some(password_hash),
            google_id: None,
            picture: None,
        }
    }

    pub fn new_google(
        google_id: String,
        name: String,
        email: String,
        picture: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash: None,
            google_id: Some(google_id),
            picture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_round_trips_through_strings() {
        assert_eq!(Sender::from_str("user"), Some(Sender::User));
        assert_eq!(Sender::from_str("ASSISTANT"), Some(Sender::Assistant));
        assert_eq!(Sender::from_str("system"), None);
        assert_eq!(Sender::Assistant.as_str(), "assistant");
    }

    #[test]
    fn push_pair_appends_user_then_assistant() {
        let mut conv = Conversation::new();
        conv.push_pair("hi".into(), "hello!".into());

        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].sender, Sender::User);
        assert_eq!(conv.messages[0].content, "hi");
        assert_eq!(conv.messages[1].sender, Sender::Assistant);
        assert_eq!(conv.messages[1].content, "hello!");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new_local("A".into(), "a@x.com".into(), "$2b$hash".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "a@x.com");
    }
}
