pub mod extract;
pub mod scoring;
pub mod sources;
pub mod stages;
#[cfg(test)]
pub(crate) mod test_support;

pub use extract::{extract_product, ExtractionRules};
pub use sources::{HtmlSource, SourceAdapter, SourceDefinition};
pub use stages::{AlertStage, ScoreStage, ScrapeStage, SearchStage};
