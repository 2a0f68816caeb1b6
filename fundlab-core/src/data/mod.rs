//! Series ingestion, alignment, and split adjustment

pub mod align;
pub mod extract;
pub mod ingest;
pub mod split;

pub use align::{align, AlignMode, AlignedSeries};
pub use extract::{parse_extract, ExtractError, ExtractLayout, RawBatch, RawTable};
pub use ingest::merge_batches;
pub use split::{adjust_split, detect_split, SplitEvent};
