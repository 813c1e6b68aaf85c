pub mod ai_service;
pub mod app_config;
pub mod auth;
pub mod chat;
pub mod error;
pub mod http;
pub mod models;
pub mod oauth;
pub mod store;
pub mod users;

pub use ai_service::{AIService, CompletionService};
pub use app_config::AppConfig;
pub use chat::{ChatReply, ChatService};
pub use error::{AppError, AppResult};
pub use http::{router, AppState};
pub use models::{ChatHistory, Conversation, Message, Sender, User};
pub use store::{connect_turso, HistoryStore, MemoryStore, TursoStore, UserStore};
pub use users::AccountService;
