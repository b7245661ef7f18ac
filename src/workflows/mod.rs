pub mod conversation;
pub mod refinement;

pub use conversation::{
    AgentProfile, ConversationState, STOCK_SYSTEM_PROMPT, build_conversation_graph,
    tools_condition,
};
pub use refinement::{
    BlogEvaluation, RefinementSettings, RefinementState, blog_optimizer, build_refinement_graph,
};
