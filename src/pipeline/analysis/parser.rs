use super::AnalysisError;
use crate::pipeline::reconcile::RawFinding;

/// Parse the model's text answer into raw findings.
///
/// The answer must be a JSON array. A surrounding markdown code fence is
/// tolerated; anything else that is not an array of objects is rejected as
/// a whole. One bad element fails the entire pass.
pub fn parse_findings_response(response: &str) -> Result<Vec<RawFinding>, AnalysisError> {
    let json_str = strip_code_fence(response);

    let value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| AnalysisError::MalformedResponse(format!("not valid JSON: {e}")))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(AnalysisError::MalformedResponse(format!(
                "expected a JSON array of findings, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(AnalysisError::MalformedResponse(format!(
                    "finding {i} is {}, expected an object",
                    json_kind(&item)
                )));
            }
            serde_json::from_value(item)
                .map_err(|e| AnalysisError::MalformedResponse(format!("finding {i}: {e}")))
        })
        .collect()
}

/// Return the body of a ```json / ``` fence if present, else the trimmed input.
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    trimmed
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
