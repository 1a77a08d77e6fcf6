pub mod feeds;
pub mod jobs;
pub mod stopwords;

pub use feeds::{FeedStore, MemoryFeedStore};
pub use jobs::{spawn_job_sweeper, JobStore, MemoryJobStore};
pub use stopwords::StopWords;
