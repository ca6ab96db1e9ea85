//! Turning free-form model output into questions.

use serde_json::Value;

use crate::{
    matcher,
    source::{GeneratedQuestion, SourceError, SourceResult},
    state::room::Citation,
};

const TEXT_FIELDS: [&str; 2] = ["text", "question"];
const ANSWER_FIELDS: [&str; 3] = ["answer", "answer_text", "answerText"];

/// Extract up to `count` questions from `raw`, attaching `citations` to each.
///
/// `raw` is expected to hold a JSON array of `{text, answer}` objects, possibly wrapped in
/// prose or a code fence. Entries whose answer normalizes to nothing are skipped.
pub fn parse_questions(
    raw: &str,
    citations: &[Citation],
    count: usize,
) -> SourceResult<Vec<GeneratedQuestion>> {
    let entries = extract_array(raw)?;
    let questions: Vec<GeneratedQuestion> = entries
        .iter()
        .filter_map(|entry| {
            let text = first_string(entry, &TEXT_FIELDS)?.trim().to_owned();
            let answer = matcher::normalize(first_string(entry, &ANSWER_FIELDS)?);
            (!text.is_empty() && !answer.is_empty()).then(|| GeneratedQuestion {
                text,
                answer,
                sources: citations.to_vec(),
            })
        })
        .take(count)
        .collect();

    if questions.is_empty() {
        return Err(SourceError::Empty);
    }
    Ok(questions)
}

fn extract_array(raw: &str) -> SourceResult<Vec<Value>> {
    if let Ok(entries) = serde_json::from_str::<Vec<Value>>(raw.trim()) {
        return Ok(entries);
    }
    let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) else {
        return Err(SourceError::Malformed("no JSON array in response".into()));
    };
    if end <= start {
        return Err(SourceError::Malformed("no JSON array in response".into()));
    }
    serde_json::from_str::<Vec<Value>>(&raw[start..=end])
        .map_err(|err| SourceError::Malformed(err.to_string()))
}

fn first_string<'a>(entry: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| entry.get(*field).and_then(Value::as_str))
        .find(|value| !value.trim().is_empty())
}
