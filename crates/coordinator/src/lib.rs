pub mod campaign;

pub use campaign::{CampaignHandle, Coordinator, CoordinatorConfig};
