pub mod adapter;
pub mod connect;
pub mod dataset;
pub mod intention;
pub mod query;
pub mod segment;
mod unit;

pub use adapter::AdapterError;
pub use connect::Backend;
pub use dataset::{Column, RawDataset, XValues};
pub use intention::{
    GlobalChoice, GroupChoice, GroupRelationChoice, GroupRelationIntention, Intentions,
    SegmentGroupIntention, SingleChoice, SingleRelationChoice, SingleRelationIntention,
    SingleSegmentIntention,
};
pub use query::{Comparator, QuerySpec, QuerySpecWithSource, TextSource};
pub use segment::{
    ApproximationResults, ApproximationSegments, ApproximationSegmentsContainer, Segment, Source,
    TrendCategory,
};
pub use unit::Unit;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub time_column: String,
    pub value_columns: Vec<String>,
}
