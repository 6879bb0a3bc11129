use std::collections::BTreeMap;

use crate::{
    db::FeedbackStore,
    error::AppResult,
    models::{
        FeedbackCreate, RecommendationFeedback, RecommendationStats, RecommendationType,
        ServedTotals, UserId,
    },
    services::scoring::round3,
};

/// Appends one feedback row. No deduplication: repeated submissions are all kept.
pub async fn record_feedback(
    store: &dyn FeedbackStore,
    user_id: UserId,
    feedback: &FeedbackCreate,
) -> AppResult<RecommendationFeedback> {
    let saved = store.insert_feedback(user_id, feedback).await?;

    tracing::info!(
        user_id,
        book_id = saved.book_id,
        feedback_id = saved.id,
        strategy = %saved.recommendation_type,
        positive = saved.is_positive,
        "Recorded recommendation feedback"
    );

    Ok(saved)
}

/// Loads feedback and serve counters and aggregates them per strategy
pub async fn recommendation_stats(
    store: &dyn FeedbackStore,
    recommendation_type: Option<RecommendationType>,
    assumed_served: i64,
) -> AppResult<Vec<RecommendationStats>> {
    let rows = store.list_feedback(recommendation_type).await?;
    let served = store.served_totals().await?;

    Ok(aggregate_stats(&rows, &served, assumed_served))
}

#[derive(Default)]
struct Tally {
    total: i64,
    positive: i64,
    negative: i64,
}

/// Groups feedback rows by strategy. Strategies without feedback are omitted.
///
/// The feedback rate divides by the recorded serve count; `assumed_served`
/// stands in while a strategy has no recorded serves.
pub fn aggregate_stats(
    rows: &[RecommendationFeedback],
    served: &[ServedTotals],
    assumed_served: i64,
) -> Vec<RecommendationStats> {
    let mut tallies: BTreeMap<RecommendationType, Tally> = BTreeMap::new();
    for row in rows {
        let tally = tallies.entry(row.recommendation_type).or_default();
        tally.total += 1;
        if row.is_positive {
            tally.positive += 1;
        } else {
            tally.negative += 1;
        }
    }

    tallies
        .into_iter()
        .map(|(recommendation_type, tally)| {
            let totals = served
                .iter()
                .find(|s| s.recommendation_type == recommendation_type && s.served_count > 0);

            let total_generated = totals.map_or(assumed_served, |s| s.served_count);
            let feedback_rate = if total_generated > 0 {
                tally.total as f64 / total_generated as f64
            } else {
                0.0
            };
            let positive_rate = if tally.total > 0 {
                tally.positive as f64 / tally.total as f64
            } else {
                0.0
            };

            RecommendationStats {
                recommendation_type,
                total_generated,
                total_feedback: tally.total,
                positive_feedback: tally.positive,
                negative_feedback: tally.negative,
                feedback_rate: round3(feedback_rate),
                positive_rate: round3(positive_rate),
                avg_score: totals.map(|s| round3(s.score_sum / s.served_count as f64)),
            }
        })
        .collect()
}
