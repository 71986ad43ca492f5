mod alert;
mod score;
mod scrape;
mod search;

pub use alert::{AlertStage, DeliverySummary};
pub use score::ScoreStage;
pub use scrape::ScrapeStage;
pub use search::SearchStage;
