mod commands;
mod queries;
mod types;

pub(crate) use commands::{create, save_grading};
pub(crate) use queries::{count_by_user, find_by_id, find_details, list_by_user};
pub(crate) use types::{GradingSave, GradingWrite, NewSubmissionItem, SubmissionDetails};
