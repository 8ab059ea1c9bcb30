mod article;
mod entry;
mod rejection;
mod sentiment;
mod source;

pub use article::{Article, NewArticle, Paginated, Pagination};
pub use entry::RawEntry;
pub use rejection::{RejectedUrl, RejectionReason};
pub use sentiment::SentimentResult;
pub use source::{Source, SourceKind};
