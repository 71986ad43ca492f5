pub mod broker;
pub mod fetcher;
pub mod notify;
pub mod repositories;
