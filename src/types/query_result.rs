use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Citation, MessageBody, Source};

/// The `status` value the backend uses for a usable answer.
pub const SUCCESS_STATUS: &str = "success";

/// Body of a query request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    /// The user's question, already trimmed.
    pub question: String,
}

impl QueryRequest {
    /// Creates a new QueryRequest.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// The payload of a successful query.
///
/// Decoding never fails on well-formed JSON: fields of an unexpected type
/// read as missing and a `sources` value that is not an array reads as no
/// sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Value")]
pub struct QueryResponse {
    /// The generated answer.
    #[serde(default)]
    pub answer: Option<String>,

    /// Supporting sources in the backend's rank order.
    #[serde(default)]
    pub sources: Option<Vec<Source>>,

    /// Backend-specific metadata, passed through untouched.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl From<Value> for QueryResponse {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return QueryResponse::default();
        };
        let sources = match fields.remove("sources") {
            Some(Value::Array(items)) => Some(items.into_iter().map(Source::from).collect()),
            _ => None,
        };
        QueryResponse {
            answer: fields.get("answer").and_then(scalar_text),
            sources,
            metadata: fields.remove("metadata").unwrap_or_default(),
        }
    }
}

impl QueryResponse {
    /// Returns the sources, treating a missing list as empty.
    pub fn sources(&self) -> &[Source] {
        self.sources.as_deref().unwrap_or(&[])
    }

    /// Builds the message body for this answer.
    ///
    /// Citations keep the server's order.
    pub fn to_body(&self) -> MessageBody {
        let citations = self.sources().iter().map(Citation::from_source).collect();
        MessageBody::with_citations(self.answer.clone().unwrap_or_default(), citations)
    }
}

/// Envelope returned by the query endpoint.
///
/// Any JSON value decodes.  A `status` that is not a string reads as
/// missing, and a `response` that is absent, `null`, `false`, `0` or `""`
/// reads as no response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Value")]
pub struct QueryResult {
    /// `"success"` for a usable answer; anything else is treated as empty.
    #[serde(default)]
    pub status: Option<String>,

    /// The answer payload.
    #[serde(default)]
    pub response: Option<QueryResponse>,
}

impl From<Value> for QueryResult {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return QueryResult::default();
        };
        let status = match fields.remove("status") {
            Some(Value::String(status)) => Some(status),
            _ => None,
        };
        let response = fields
            .remove("response")
            .filter(is_truthy)
            .map(QueryResponse::from);
        QueryResult { status, response }
    }
}

impl QueryResult {
    /// Returns true if the backend reported success.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(SUCCESS_STATUS)
    }

    /// Returns the answer body, or `None` when the result carries no usable
    /// answer.
    pub fn reply(&self) -> Option<MessageBody> {
        if !self.is_success() {
            return None;
        }
        self.response.as_ref().map(QueryResponse::to_body)
    }
}

/// Text for a scalar JSON value; `None` for null, empty strings, arrays and
/// objects.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let json = serde_json::to_string(&QueryRequest::new("What is estoppel?")).unwrap();
        assert_eq!(json, r#"{"question":"What is estoppel?"}"#);
    }

    #[test]
    fn answer_without_sources() {
        let result: QueryResult =
            serde_json::from_str(r#"{"status":"success","response":{"answer":"A","sources":[]}}"#)
                .unwrap();
        let body = result.reply().unwrap();
        assert_eq!(body.plain_text(), "A");
        assert!(body.citations.is_empty());
    }

    #[test]
    fn answer_with_sources_keeps_order() {
        let result: QueryResult = serde_json::from_str(
            r#"{
                "status": "success",
                "response": {
                    "answer": "Consideration is required.",
                    "sources": [
                        {"rank": 2, "filename": "b.pdf", "excerpt": "second"},
                        {"rank": 1, "filename": "a.pdf", "excerpt": "first"}
                    ],
                    "metadata": {"model": "rag-v1"}
                }
            }"#,
        )
        .unwrap();
        let response = result.response.as_ref().unwrap();
        assert_eq!(response.metadata["model"], "rag-v1");

        let body = result.reply().unwrap();
        assert_eq!(body.citations.len(), 2);
        assert_eq!(body.citations[0].filename, "b.pdf");
        assert_eq!(body.citations[1].filename, "a.pdf");
    }

    #[test]
    fn non_success_status_has_no_reply() {
        let result: QueryResult =
            serde_json::from_str(r#"{"status":"error","response":{"answer":"A"}}"#).unwrap();
        assert!(!result.is_success());
        assert!(result.reply().is_none());
    }

    #[test]
    fn missing_response_has_no_reply() {
        let result: QueryResult = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(result.is_success());
        assert!(result.reply().is_none());
    }

    #[test]
    fn null_sources_are_empty() {
        let result: QueryResult = serde_json::from_str(
            r#"{"status":"success","response":{"answer":"A","sources":null}}"#,
        )
        .unwrap();
        assert_eq!(result.reply().unwrap().plain_text(), "A");
    }

    #[test]
    fn missing_answer_renders_empty() {
        let result: QueryResult =
            serde_json::from_str(r#"{"status":"success","response":{}}"#).unwrap();
        assert_eq!(result.reply().unwrap().plain_text(), "");
    }

    fn decode(body: &str) -> QueryResult {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn non_string_status_is_not_success() {
        let result = decode(r#"{"status":500}"#);
        assert_eq!(result.status, None);
        assert!(result.reply().is_none());
    }

    #[test]
    fn non_object_response_with_error_status() {
        let result = decode(r#"{"status":"error","response":"index offline"}"#);
        assert!(!result.is_success());
        assert!(result.reply().is_none());
    }

    #[test]
    fn mistyped_sources_with_error_status() {
        let result = decode(r#"{"status":"error","response":{"answer":null,"sources":"n/a"}}"#);
        assert!(result.reply().is_none());
        assert!(result.response.unwrap().sources().is_empty());
    }

    #[test]
    fn non_object_sources_read_as_missing_fields() {
        let body = decode(r#"{"status":"success","response":{"answer":"A","sources":["doc.pdf",7]}}"#)
            .reply()
            .unwrap();
        assert_eq!(
            body.plain_text(),
            "A\n\nSources (2):\nRank ? - Unknown: Excerpt unavailable\nRank ? - Unknown: Excerpt unavailable"
        );
    }

    #[test]
    fn falsy_response_is_no_response() {
        for body in [
            r#"{"status":"success","response":null}"#,
            r#"{"status":"success","response":false}"#,
            r#"{"status":"success","response":0}"#,
            r#"{"status":"success","response":""}"#,
        ] {
            assert!(decode(body).reply().is_none(), "{body}");
        }
    }

    #[test]
    fn truthy_non_object_response_has_empty_answer() {
        let body = decode(r#"{"status":"success","response":"done"}"#).reply().unwrap();
        assert_eq!(body.plain_text(), "");
    }

    #[test]
    fn non_object_bodies_decode_as_empty() {
        for body in ["[]", "\"ok\"", "42", "null"] {
            assert_eq!(decode(body), QueryResult::default(), "{body}");
        }
    }

    #[test]
    fn numeric_answer_is_shown() {
        let body = decode(r#"{"status":"success","response":{"answer":42}}"#).reply().unwrap();
        assert_eq!(body.plain_text(), "42");
    }
}
