pub mod logging;
pub mod matching;
pub mod record;

pub use record::{Record, RecordList};
