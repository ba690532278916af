// Public modules
pub mod free_token;
pub mod message;
pub mod query_result;
pub mod source;

// Re-exports
pub use free_token::FreeToken;
pub use message::{
    Citation, MISSING_EXCERPT, Message, MessageBody, MessageId, MessageKind, UNKNOWN_FILENAME,
    UNKNOWN_RANK,
};
pub use query_result::{QueryRequest, QueryResponse, QueryResult, SUCCESS_STATUS};
pub use source::{Rank, Source};
