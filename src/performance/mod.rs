//! # Performance
//!
//! Evaluation scoring and periodic aggregation.
//!
//! Team and org-unit aggregates are two-level: a per-user mean is computed
//! first, then the group figure is the unweighted mean of those means. A
//! user with one evaluated task counts the same as a user with twenty.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::debug;

use crate::error::{Result, TeamflowError};
use crate::models::{Task, TaskEvaluation, UserPerformance};

/// The fixed evaluation vocabulary. Scores are integers 1..=5 per criterion.
pub const EVALUATION_CRITERIA: [&str; 3] = ["timeliness", "quality", "completeness"];

pub const MIN_CRITERION_SCORE: i64 = 1;
pub const MAX_CRITERION_SCORE: i64 = 5;

/// Reject unknown criteria, non-integer values, and out-of-range scores.
/// An empty criteria object is also invalid.
pub fn validate_criteria(criteria: &Map<String, Value>) -> Result<()> {
    if criteria.is_empty() {
        return Err(TeamflowError::Validation(
            "at least one evaluation criterion is required".to_string(),
        ));
    }
    for (key, value) in criteria {
        if !EVALUATION_CRITERIA.contains(&key.as_str()) {
            return Err(TeamflowError::Validation(format!(
                "unknown evaluation criterion: {key}"
            )));
        }
        let score = value.as_i64().ok_or_else(|| {
            TeamflowError::Validation(format!("criterion {key} must be an integer score"))
        })?;
        if !(MIN_CRITERION_SCORE..=MAX_CRITERION_SCORE).contains(&score) {
            return Err(TeamflowError::Validation(format!(
                "criterion {key} must be between {MIN_CRITERION_SCORE} and {MAX_CRITERION_SCORE}"
            )));
        }
    }
    Ok(())
}

/// Mean of the criterion scores. Call after [`validate_criteria`].
pub fn mean_score(criteria: &Map<String, Value>) -> f64 {
    let scores: Vec<i64> = criteria.values().filter_map(|v| v.as_i64()).collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<i64>() as f64 / scores.len() as f64
}

/// Calendar quarter containing `date`, as an inclusive date range.
pub fn quarter_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let quarter = (date.month0() / 3) as i32;
    let start_month = quarter as u32 * 3 + 1;
    let year = date.year();
    // Start of the following quarter, minus one day.
    let (next_year, next_month) = if start_month + 3 > 12 {
        (year + 1, 1)
    } else {
        (year, start_month + 3)
    };
    let start = NaiveDate::from_ymd_opt(year, start_month, 1);
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|d| d.pred_opt());
    match (start, end) {
        (Some(start), Some(Some(end))) => (start, end),
        // Unreachable for valid dates; fall back to the input day.
        _ => (date, date),
    }
}

/// Mean of per-user means, skipping users with no evaluations.
pub fn mean_of_user_means(user_means: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = user_means.iter().filter_map(|m| *m).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Rebuild one user's performance row for a period from the evaluations of
/// their tasks completed inside it.
pub async fn recompute_user_performance(
    pool: &PgPool,
    user_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<UserPerformance> {
    let evaluations =
        TaskEvaluation::list_for_assignee_in_period(pool, user_id, period_start, period_end)
            .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM tasks
        WHERE assignee_id = $1
          AND created_at >= $2::date
          AND created_at < ($3::date + INTERVAL '1 day')
        "#,
    )
    .bind(user_id)
    .bind(period_start)
    .bind(period_end)
    .fetch_one(pool)
    .await?;

    let completed: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM tasks
        WHERE assignee_id = $1
          AND status = 'completed'
          AND completed_at >= $2::date
          AND completed_at < ($3::date + INTERVAL '1 day')
        "#,
    )
    .bind(user_id)
    .bind(period_start)
    .bind(period_end)
    .fetch_one(pool)
    .await?;

    let scores: Vec<f64> = evaluations.iter().filter_map(|e| e.score).collect();
    let average_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    debug!(
        user_id,
        %period_start,
        %period_end,
        total_tasks = total.0,
        completed_tasks = completed.0,
        evaluations = evaluations.len(),
        "recomputed user performance"
    );

    let row = UserPerformance::upsert(
        pool,
        user_id,
        period_start,
        period_end,
        total.0 as i32,
        completed.0 as i32,
        average_score,
    )
    .await?;
    Ok(row)
}

/// Execution figures derived from one task's timestamps and hour columns.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ExecutionMetrics {
    pub is_overdue: bool,
    /// Wall-clock hours from first start to completion.
    pub completion_hours: Option<f64>,
    /// Estimated over actual hours; above 1.0 means faster than estimated.
    pub efficiency: Option<f64>,
}

/// A task is overdue when it completed after its due time, or is still open
/// past it. Tasks without a due time are never overdue.
pub fn execution_metrics(task: &Task, now: DateTime<Utc>) -> ExecutionMetrics {
    let is_overdue = match (task.due_at, task.completed_at) {
        (Some(due), Some(done)) => done > due,
        (Some(due), None) => {
            let terminal = task.status().map(|s| s.is_terminal()).unwrap_or(false);
            !terminal && now > due
        }
        (None, _) => false,
    };

    let completion_hours = match (task.started_at, task.completed_at) {
        (Some(started), Some(done)) if done >= started => {
            Some((done - started).num_seconds() as f64 / 3600.0)
        }
        _ => None,
    };

    let efficiency = match (task.estimated_hours, task.actual_hours) {
        (Some(estimated), Some(actual)) if actual > 0.0 => Some(estimated / actual),
        _ => None,
    };

    ExecutionMetrics {
        is_overdue,
        completion_hours,
        efficiency,
    }
}

/// Average score per criterion across a set of evaluations. Criteria absent
/// from an evaluation simply do not contribute to that criterion's mean.
pub fn criteria_breakdown(evaluations: &[TaskEvaluation]) -> Map<String, Value> {
    let mut sums: std::collections::BTreeMap<&str, (f64, usize)> = Default::default();
    for evaluation in evaluations {
        let Some(criteria) = evaluation.criteria.as_object() else {
            continue;
        };
        for name in EVALUATION_CRITERIA {
            if let Some(score) = criteria.get(name).and_then(|v| v.as_i64()) {
                let entry = sums.entry(name).or_insert((0.0, 0));
                entry.0 += score as f64;
                entry.1 += 1;
            }
        }
    }

    sums.into_iter()
        .map(|(name, (sum, count))| (name.to_string(), Value::from(sum / count as f64)))
        .collect()
}

/// Per-user mean score inside a period, `None` when nothing was evaluated.
async fn user_mean_for_period(
    pool: &PgPool,
    user_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<Option<f64>> {
    let evaluations =
        TaskEvaluation::list_for_assignee_in_period(pool, user_id, period_start, period_end)
            .await?;
    let scores: Vec<f64> = evaluations.iter().filter_map(|e| e.score).collect();
    Ok(if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    })
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GroupPerformance {
    pub member_count: usize,
    pub evaluated_member_count: usize,
    pub average_score: Option<f64>,
}

/// Two-level team aggregate over the team's distinct assignees.
pub async fn team_performance(
    pool: &PgPool,
    team_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<GroupPerformance> {
    let assignees: Vec<(i64,)> = sqlx::query_as(
        "SELECT DISTINCT assignee_id FROM tasks WHERE team_id = $1 AND assignee_id IS NOT NULL",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    group_performance(pool, &assignees, period_start, period_end).await
}

/// Two-level org-unit aggregate over the unit's distinct assignees.
pub async fn org_unit_performance(
    pool: &PgPool,
    org_unit_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<GroupPerformance> {
    let assignees: Vec<(i64,)> = sqlx::query_as(
        "SELECT DISTINCT assignee_id FROM tasks WHERE org_unit_id = $1 AND assignee_id IS NOT NULL",
    )
    .bind(org_unit_id)
    .fetch_all(pool)
    .await?;

    group_performance(pool, &assignees, period_start, period_end).await
}

async fn group_performance(
    pool: &PgPool,
    assignees: &[(i64,)],
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<GroupPerformance> {
    let mut user_means = Vec::with_capacity(assignees.len());
    for &(user_id,) in assignees {
        user_means.push(user_mean_for_period(pool, user_id, period_start, period_end).await?);
    }

    Ok(GroupPerformance {
        member_count: assignees.len(),
        evaluated_member_count: user_means.iter().filter(|m| m.is_some()).count(),
        average_score: mean_of_user_means(&user_means),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn criteria(pairs: &[(&str, i64)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn valid_criteria_pass() {
        let c = criteria(&[("timeliness", 5), ("quality", 3), ("completeness", 1)]);
        assert!(validate_criteria(&c).is_ok());
    }

    #[test]
    fn unknown_criterion_rejected() {
        let c = criteria(&[("velocity", 4)]);
        assert!(validate_criteria(&c).is_err());
    }

    #[test]
    fn out_of_range_and_non_integer_scores_rejected() {
        assert!(validate_criteria(&criteria(&[("quality", 0)])).is_err());
        assert!(validate_criteria(&criteria(&[("quality", 6)])).is_err());

        let mut c = Map::new();
        c.insert("quality".to_string(), json!(3.5));
        assert!(validate_criteria(&c).is_err());

        assert!(validate_criteria(&Map::new()).is_err());
    }

    #[test]
    fn mean_score_averages_criteria() {
        let c = criteria(&[("timeliness", 5), ("quality", 4), ("completeness", 3)]);
        assert!((mean_score(&c) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn quarter_bounds_cover_the_year() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(quarter_bounds(d(2025, 2, 15)), (d(2025, 1, 1), d(2025, 3, 31)));
        assert_eq!(quarter_bounds(d(2025, 6, 1)), (d(2025, 4, 1), d(2025, 6, 30)));
        assert_eq!(quarter_bounds(d(2025, 12, 31)), (d(2025, 10, 1), d(2025, 12, 31)));
    }

    #[test]
    fn breakdown_averages_each_criterion_independently() {
        use crate::models::TaskEvaluation;
        use chrono::Utc;

        let eval = |criteria: Value| TaskEvaluation {
            id: 0,
            task_id: 1,
            evaluator_id: 1,
            criteria,
            score: None,
            feedback: None,
            created_at: Utc::now(),
        };
        let evaluations = vec![
            eval(json!({"timeliness": 5, "quality": 3})),
            eval(json!({"timeliness": 3})),
        ];

        let breakdown = criteria_breakdown(&evaluations);
        assert_eq!(breakdown.get("timeliness"), Some(&json!(4.0)));
        assert_eq!(breakdown.get("quality"), Some(&json!(3.0)));
        assert!(breakdown.get("completeness").is_none());
    }

    fn task(status: &str) -> crate::models::Task {
        crate::models::Task {
            id: 1,
            title: "task".to_string(),
            description: None,
            creator_id: 1,
            assignee_id: Some(2),
            team_id: None,
            org_unit_id: None,
            status: status.to_string(),
            priority: "medium".to_string(),
            due_at: None,
            started_at: None,
            completed_at: None,
            estimated_hours: None,
            actual_hours: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn completed_task_is_overdue_only_when_late() {
        let mut t = task("completed");
        t.due_at = Some(day(10));
        t.completed_at = Some(day(12));
        assert!(execution_metrics(&t, day(20)).is_overdue);

        t.completed_at = Some(day(9));
        assert!(!execution_metrics(&t, day(20)).is_overdue);
    }

    #[test]
    fn open_task_past_due_is_overdue_but_cancelled_is_not() {
        let mut t = task("in_progress");
        t.due_at = Some(day(10));
        assert!(execution_metrics(&t, day(11)).is_overdue);
        assert!(!execution_metrics(&t, day(9)).is_overdue);

        t.status = "cancelled".to_string();
        assert!(!execution_metrics(&t, day(11)).is_overdue);
    }

    #[test]
    fn task_without_due_time_is_never_overdue() {
        let t = task("in_progress");
        assert!(!execution_metrics(&t, day(28)).is_overdue);
    }

    #[test]
    fn completion_hours_and_efficiency_come_from_timestamps_and_hours() {
        let mut t = task("completed");
        t.started_at = Some(day(10));
        t.completed_at = Some(day(11));
        t.estimated_hours = Some(12.0);
        t.actual_hours = Some(8.0);

        let metrics = execution_metrics(&t, day(12));
        assert_eq!(metrics.completion_hours, Some(24.0));
        assert_eq!(metrics.efficiency, Some(1.5));
    }

    #[test]
    fn execution_figures_absent_without_their_inputs() {
        let mut t = task("created");
        t.actual_hours = Some(0.0);
        t.estimated_hours = Some(4.0);

        let metrics = execution_metrics(&t, day(1));
        assert_eq!(metrics.completion_hours, None);
        // Zero actual hours would divide by zero.
        assert_eq!(metrics.efficiency, None);
    }

    #[test]
    fn group_mean_weighs_users_equally() {
        // One user with many high scores, one with a single low score.
        // The group mean is the mean of the two user means, not of all tasks.
        let user_means = [Some(5.0), Some(1.0), None];
        assert_eq!(mean_of_user_means(&user_means), Some(3.0));
    }

    #[test]
    fn group_mean_absent_when_no_user_evaluated() {
        assert_eq!(mean_of_user_means(&[None, None]), None);
        assert_eq!(mean_of_user_means(&[]), None);
    }
}
