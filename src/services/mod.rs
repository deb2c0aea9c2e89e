pub(crate) mod grading;
pub(crate) mod notifications;
pub(crate) mod question_content;
pub(crate) mod scoring;
pub(crate) mod storage;
