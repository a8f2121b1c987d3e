pub mod reset_record;
pub mod subject;

pub use reset_record::{NewResetRecord, ResetRecord, ResetRecordPatch, ResetStatus};
pub use subject::Subject;
