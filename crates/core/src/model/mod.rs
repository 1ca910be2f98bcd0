mod book;
mod ids;
mod progress;

pub use book::{Book, Chapter, ChapterStatus};
pub use ids::{BookId, ChapterId, ParseIdError, UserId};
pub use progress::{BookProgress, ChapterProgress, ResumePoint, ScrollSample};
