pub mod action;
pub mod extract;
pub mod types;

pub use action::{Action, GoldenAction, split_component};
pub use extract::{
    CHECKPOINT_ONLY_FLAG, NAVIGATE, RecordGroup, SUBMIT, TEST_BEGIN, TEST_FINISH, extract_records, group_records,
    parse_header, read_records,
};
pub use types::{Checkpoint, LogError, LogResult, TestHeader, TestRecord};
