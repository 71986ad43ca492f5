pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ScoutError, ScoutResult};
pub use models::{
    campaign::{CampaignOutcome, CampaignStatus},
    product::{DatasetStats, Product, ProductData},
    score::{Criterion, CriterionScores, ScoreBreakdown, ScoreRecord, ScoringWeights},
    subscription::{NotificationMethod, Subscription},
    task::{
        queues, AlertPayload, EnqueueOptions, ScorePayload, ScrapePayload, SearchParams,
        SearchPayload, TaskState,
    },
};
pub use ports::{
    broker::{Broker, RateLimit, TaskHandler, WorkerOptions},
    fetcher::PageFetcher,
    notify::NotificationSender,
    repositories::{
        CampaignRepository, ProductRepository, ScoreRepository, SubscriptionRepository,
    },
};
