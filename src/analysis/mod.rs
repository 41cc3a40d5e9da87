/// Numeric core: regression, physical conversion, and the orchestrator
/// that turns a [`RawData`](crate::data::model::RawData) plus an index
/// selection into an [`AnalysisResult`](result::AnalysisResult).

pub mod analyzer;
pub mod fitting;
pub mod physics;
pub mod result;
