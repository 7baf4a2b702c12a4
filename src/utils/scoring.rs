// src/utils/scoring.rs
//
// Pure scoring and aggregation logic. Everything here is side-effect
// free; handlers feed it rows from the ledger and persist the results.

use crate::error::AppError;
use crate::models::attempt::{Attempt, DateRating, QuestionDetail, QuizProgression, Rating};
use crate::models::quiz::Question;

/// Outcome of scoring one submission against a quiz's answer key.
#[derive(Debug)]
pub struct ScoredAttempt {
    pub questions_total: i32,
    pub right_answers: i32,
    /// Per-question detail, in question order, destined for the cache.
    pub detail: Vec<QuestionDetail>,
}

/// Compares submitted variant indices against the quiz's ordered question
/// list, position by position.
///
/// The submission must carry exactly one answer per question and every
/// index must point into that question's variants; anything else is a
/// validation error, never silently truncated or padded.
pub fn score_attempt(questions: &[Question], answers: &[i32]) -> Result<ScoredAttempt, AppError> {
    if answers.len() != questions.len() {
        return Err(AppError::UnprocessableEntity(
            "Quantity of answers must be equal to that of questions.".to_string(),
        ));
    }

    let mut right_answers = 0;
    let mut detail = Vec::with_capacity(questions.len());

    for (question, &chosen) in questions.iter().zip(answers) {
        let variants = &question.answer_variants.0;
        if chosen < 0 || chosen as usize >= variants.len() {
            return Err(AppError::UnprocessableEntity(format!(
                "Answer index {} out of range for question {}",
                chosen, question.id
            )));
        }

        let is_correct = chosen == question.right_answer;
        if is_correct {
            right_answers += 1;
        }

        detail.push(QuestionDetail {
            question_text: question.content.clone(),
            user_answer: variants[chosen as usize].clone(),
            is_correct: if is_correct { "correct" } else { "incorrect" }.to_string(),
        });
    }

    Ok(ScoredAttempt {
        questions_total: questions.len() as i32,
        right_answers,
        detail,
    })
}

/// Standard two-decimal rounding used for every stored percentage.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of correct answers, rounded to two decimals.
/// Total is never zero in practice: quizzes keep at least two questions.
pub fn percentage(correct: i32, total: i32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(correct as f64 / total as f64 * 100.0)
}

/// Folds this attempt's counters into the running summary.
///
/// Returns (summary_total, summary_correct, summary_percentage). The
/// first attempt uses its own counters as the summary.
pub fn fold_summary(previous: Option<&Attempt>, total: i32, correct: i32) -> (i32, i32, f64) {
    let (summary_total, summary_correct) = match previous {
        Some(prev) => (
            prev.summary_questions_total + total,
            prev.summary_correct_answers + correct,
        ),
        None => (total, correct),
    };

    (
        summary_total,
        summary_correct,
        percentage(summary_correct, summary_total),
    )
}

/// Combines each quiz's latest ledger row into one rating: counters are
/// summed across quizzes, while the percentage is the average of the
/// per-quiz cumulative percentages, not re-derived from the sums.
pub fn fold_rating(latest_rows: &[Attempt]) -> Option<Rating> {
    if latest_rows.is_empty() {
        return None;
    }

    let mut total_answers = 0;
    let mut right_answers = 0;
    let mut percent_sum = 0.0;

    for row in latest_rows {
        total_answers += row.summary_questions_total;
        right_answers += row.summary_correct_answers;
        percent_sum += row.summary_percentage;
    }

    Some(Rating {
        total_answers,
        right_answers,
        rating_percent: round2(percent_sum / latest_rows.len() as f64),
    })
}

/// Average of the latest cumulative percentages across quizzes, or 0.0
/// when the user has no attempts at all.
pub fn average_rating(latest_rows: &[Attempt]) -> f64 {
    if latest_rows.is_empty() {
        return 0.0;
    }
    let sum: f64 = latest_rows.iter().map(|r| r.summary_percentage).sum();
    round2(sum / latest_rows.len() as f64)
}

/// Groups per-day latest attempts into one series per quiz.
///
/// Expects rows ordered by quiz then date descending (one row per
/// distinct day per quiz, that day's latest attempt); the order within
/// each series is preserved.
pub fn build_progression(rows: &[Attempt]) -> Vec<QuizProgression> {
    let mut series: Vec<QuizProgression> = Vec::new();

    for row in rows {
        let point = DateRating {
            date: row.taken_on,
            rating: row.summary_percentage,
        };

        match series.iter_mut().find(|s| s.quiz_id == row.quiz_id) {
            Some(entry) => entry.ratings_by_date.push(point),
            None => series.push(QuizProgression {
                quiz_id: row.quiz_id,
                ratings_by_date: vec![point],
            }),
        }
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sqlx::types::Json;

    fn question(id: i64, content: &str, variants: &[&str], right: i32) -> Question {
        Question {
            id,
            quiz_id: 1,
            content: content.to_string(),
            answer_variants: Json(variants.iter().map(|s| s.to_string()).collect()),
            right_answer: right,
        }
    }

    fn three_questions() -> Vec<Question> {
        vec![
            question(1, "q1", &["a", "b", "c"], 0),
            question(2, "q2", &["a", "b", "c"], 1),
            question(3, "q3", &["a", "b", "c"], 2),
        ]
    }

    fn attempt(quiz_id: i64, total: i32, correct: i32, pct: f64, day: &str) -> Attempt {
        Attempt {
            id: 0,
            user_id: 1,
            company_id: 1,
            quiz_id,
            questions_total: total,
            correct_answers: correct,
            correct_percentage: percentage(correct, total),
            summary_questions_total: total,
            summary_correct_answers: correct,
            summary_percentage: pct,
            taken_on: NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap(),
        }
    }

    #[test]
    fn perfect_submission_scores_full() {
        let scored = score_attempt(&three_questions(), &[0, 1, 2]).unwrap();
        assert_eq!(scored.questions_total, 3);
        assert_eq!(scored.right_answers, 3);
        assert!(scored.detail.iter().all(|d| d.is_correct == "correct"));
    }

    #[test]
    fn partial_submission_counts_positional_matches() {
        let scored = score_attempt(&three_questions(), &[0, 0, 0]).unwrap();
        assert_eq!(scored.questions_total, 3);
        assert_eq!(scored.right_answers, 1);
        assert_eq!(scored.detail[0].is_correct, "correct");
        assert_eq!(scored.detail[1].is_correct, "incorrect");
        assert_eq!(scored.detail[2].is_correct, "incorrect");
    }

    #[test]
    fn detail_carries_chosen_variant_text() {
        let scored = score_attempt(&three_questions(), &[2, 1, 0]).unwrap();
        assert_eq!(scored.detail[0].user_answer, "c");
        assert_eq!(scored.detail[1].user_answer, "b");
        assert_eq!(scored.detail[2].user_answer, "a");
    }

    #[test]
    fn answer_count_mismatch_is_rejected() {
        let err = score_attempt(&three_questions(), &[0, 1]).unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));

        let err = score_attempt(&three_questions(), &[0, 1, 2, 0]).unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let err = score_attempt(&three_questions(), &[0, 1, 3]).unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));

        let err = score_attempt(&three_questions(), &[-1, 1, 2]).unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[test]
    fn first_attempt_summary_uses_own_counters() {
        let (total, correct, pct) = fold_summary(None, 3, 3);
        assert_eq!((total, correct), (3, 3));
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn summary_fold_accumulates_across_attempts() {
        let mut first = attempt(1, 3, 3, 100.0, "2024-01-01");
        first.summary_questions_total = 3;
        first.summary_correct_answers = 3;

        let (total, correct, pct) = fold_summary(Some(&first), 3, 1);
        assert_eq!((total, correct), (6, 4));
        assert_eq!(pct, 66.67);
    }

    #[test]
    fn summary_fold_matches_running_sums() {
        let sequence = [(3, 2), (3, 3), (3, 0), (3, 1)];
        let mut previous: Option<Attempt> = None;

        let mut expected_total = 0;
        let mut expected_correct = 0;

        for (total, correct) in sequence {
            expected_total += total;
            expected_correct += correct;

            let (st, sc, pct) = fold_summary(previous.as_ref(), total, correct);
            assert_eq!(st, expected_total);
            assert_eq!(sc, expected_correct);
            assert_eq!(pct, percentage(expected_correct, expected_total));

            let mut row = attempt(1, total, correct, pct, "2024-01-01");
            row.summary_questions_total = st;
            row.summary_correct_answers = sc;
            previous = Some(row);
        }
    }

    #[test]
    fn rating_percent_averages_per_quiz_percentages() {
        let mut a = attempt(1, 10, 8, 80.0, "2024-01-01");
        a.summary_questions_total = 10;
        a.summary_correct_answers = 8;
        let mut b = attempt(2, 10, 6, 60.0, "2024-01-02");
        b.summary_questions_total = 10;
        b.summary_correct_answers = 6;

        let rating = fold_rating(&[a, b]).unwrap();
        assert_eq!(rating.rating_percent, 70.0);
        assert_eq!(rating.total_answers, 20);
        assert_eq!(rating.right_answers, 14);
    }

    #[test]
    fn rating_over_no_rows_is_none() {
        assert!(fold_rating(&[]).is_none());
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn progression_groups_by_quiz_preserving_order() {
        let rows = vec![
            attempt(1, 3, 2, 66.67, "2024-01-05"),
            attempt(1, 3, 2, 55.0, "2024-01-02"),
            attempt(2, 3, 3, 100.0, "2024-01-04"),
        ];

        let series = build_progression(&rows);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].quiz_id, 1);
        assert_eq!(series[0].ratings_by_date.len(), 2);
        assert_eq!(
            series[0].ratings_by_date[0].date,
            NaiveDate::parse_from_str("2024-01-05", "%Y-%m-%d").unwrap()
        );
        assert_eq!(series[1].quiz_id, 2);
        assert_eq!(series[1].ratings_by_date[0].rating, 100.0);
    }

    #[test]
    fn round2_behaves_like_standard_rounding() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(33.333_333), 33.33);
        assert_eq!(round2(100.0), 100.0);
    }
}
