use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::scoring::ResultSummary;

pub(crate) const SUBMISSION_GRADED: &str = "submission_graded";

#[derive(Debug, Clone)]
pub(crate) struct NotificationEvent {
    pub(crate) user_id: String,
    pub(crate) kind: &'static str,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) payload: serde_json::Value,
}

#[derive(Debug, Error)]
pub(crate) enum NotifyError {
    #[error("failed to store notification: {0}")]
    Database(#[from] sqlx::Error),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Sink for user-facing events. Delivery is best effort; callers go through
/// [`notify_best_effort`] so a failing sink never fails the caller's work.
#[async_trait]
pub(crate) trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Writes events into the `notifications` inbox table.
pub(crate) struct PgNotifier {
    pool: PgPool,
}

impl PgNotifier {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        repositories::notifications::create(
            &self.pool,
            repositories::notifications::CreateNotification {
                id: &Uuid::new_v4().to_string(),
                user_id: &event.user_id,
                kind: event.kind,
                title: &event.title,
                message: &event.message,
                payload: event.payload,
                created_at: primitive_now_utc(),
            },
        )
        .await?;
        Ok(())
    }
}

pub(crate) async fn notify_best_effort(notifier: &dyn Notifier, event: NotificationEvent) {
    let kind = event.kind;
    let user_id = event.user_id.clone();
    if let Err(err) = notifier.notify(event).await {
        metrics::record_notification_failure(kind);
        tracing::warn!(error = %err, kind, user_id = %user_id, "Failed to emit notification");
    }
}

pub(crate) fn submission_graded(
    user_id: &str,
    submission_id: &str,
    exam_id: &str,
    exam_title: &str,
    summary: &ResultSummary,
) -> NotificationEvent {
    let verdict = if summary.passed { "passed" } else { "did not pass" };
    NotificationEvent {
        user_id: user_id.to_string(),
        kind: SUBMISSION_GRADED,
        title: format!("Results for {exam_title}"),
        message: format!(
            "You scored {} of {} and {verdict}.",
            format_points(summary.total_score),
            format_points(summary.max_score)
        ),
        payload: json!({
            "submission_id": submission_id,
            "exam_id": exam_id,
            "total_score": summary.total_score,
            "max_score": summary.max_score,
            "passed": summary.passed,
        }),
    }
}

fn format_points(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total: f64, passed: bool) -> ResultSummary {
        ResultSummary {
            correct_count: 1,
            wrong_count: 1,
            unanswered_count: 0,
            total_questions: 2,
            total_score: total,
            max_score: 10.0,
            passing_score: 5.0,
            passed,
        }
    }

    #[test]
    fn graded_event_mentions_score_and_verdict() {
        let event = submission_graded("u1", "s1", "e1", "Algebra", &summary(7.5, true));
        assert_eq!(event.kind, SUBMISSION_GRADED);
        assert_eq!(event.title, "Results for Algebra");
        assert_eq!(event.message, "You scored 7.50 of 10 and passed.");
        assert_eq!(event.payload["submission_id"], "s1");

        let failed = submission_graded("u1", "s1", "e1", "Algebra", &summary(2.0, false));
        assert!(failed.message.ends_with("did not pass."));
    }
}
