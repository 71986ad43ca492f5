pub mod database;
pub mod http_fetcher;
pub mod in_memory_broker;
pub mod notify;

pub use database::{
    connect, run_migrations, SqliteCampaignRepository, SqliteProductRepository,
    SqliteScoreRepository, SqliteSubscriptionRepository,
};
pub use http_fetcher::HttpPageFetcher;
pub use in_memory_broker::InMemoryBroker;
pub use notify::{LogNotifier, WebhookNotifier};
