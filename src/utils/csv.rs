// src/utils/csv.rs

use crate::models::attempt::CachedAttempt;

/// Escapes a CSV field.
/// Wraps fields containing special characters in quotes and doubles
/// embedded quotes.
fn escape_csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders cached attempt detail as flat tabular rows:
/// `user_id, quiz_id, question_text, user_answer, is_correct`.
pub fn render_detail_csv(results: &[CachedAttempt]) -> String {
    let mut lines = vec!["user_id,quiz_id,question_text,user_answer,is_correct".to_string()];

    for result in results {
        for question in &result.questions {
            lines.push(format!(
                "{},{},{},{},{}",
                result.user_id,
                result.quiz_id,
                escape_csv_field(&question.question_text),
                escape_csv_field(&question.user_answer),
                question.is_correct
            ));
        }
    }

    lines.join("\n")
}
