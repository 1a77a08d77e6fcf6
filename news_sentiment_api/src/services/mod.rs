pub mod aggregator;
pub mod earthquakes;
pub mod movies;
pub mod power_of_words;
pub mod sentiment;

pub use earthquakes::EarthquakeService;
pub use movies::MovieService;
pub use power_of_words::PowerOfWordsService;
pub use sentiment::{SentimentAnalyzer, SentimentWorkerPool};
