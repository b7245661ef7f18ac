pub mod blog;
pub mod chat;
pub mod context;

pub use blog::{BlogReport, BlogService, quality_label};
pub use chat::{ChatReply, ChatService, DisplayMessage, DisplayRole, transcript_of, workflow_kind};
pub use context::AppContext;
