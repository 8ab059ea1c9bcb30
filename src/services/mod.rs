mod images;
mod language;
mod scheduler;

pub use images::ImageResolver;
pub use language::{detect_language, is_english_like};
pub use scheduler::Scheduler;
