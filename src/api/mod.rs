pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod extract;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod notifications;
pub(crate) mod pagination;
pub(crate) mod questions;
pub(crate) mod response;
pub(crate) mod router;
pub(crate) mod submissions;
pub(crate) mod uploads;
pub(crate) mod users;
pub(crate) mod validation;
