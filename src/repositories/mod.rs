pub(crate) mod exams;
pub(crate) mod health;
pub(crate) mod notifications;
pub(crate) mod questions;
pub(crate) mod submissions;
pub(crate) mod users;
