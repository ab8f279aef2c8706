use serde::Deserialize;
use std::time::Duration;

/// Errors surfaced by the AnalyticsFlow API client.
///
/// `Auth` aborts the current view and signals the caller to send the user
/// back to a login surface; everything else is recoverable at the view level.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("authentication rejected")]
    Auth,
    #[error("resource not found")]
    NotFound,
    #[error("server returned status {status}")]
    Service { status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// One statistic value: the wire value is a number, a string, or absent.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Number(f64),
    Text(String),
    Absent,
}

impl StatValue {
    /// Interpret a raw JSON value as a statistic value. Null maps to Absent;
    /// anything that is neither number nor string is carried as its literal
    /// JSON text so it still renders instead of disappearing.
    pub fn from_json(value: &serde_json::Value) -> StatValue {
        match value {
            serde_json::Value::Null => StatValue::Absent,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => StatValue::Number(f),
                None => StatValue::Text(n.to_string()),
            },
            serde_json::Value::String(s) => StatValue::Text(s.clone()),
            other => StatValue::Text(other.to_string()),
        }
    }
}

/// Statistics for one dataset column.
///
/// `column_type` is an open-ended label produced by the analytics service
/// (e.g. "Integer", "Float", "String", "Boolean"), not a fixed enum. The
/// `stats` keys vary freely between columns, even within one type; key order
/// is the wire order (serde_json is built with `preserve_order`).
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnStat {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub stats: serde_json::Map<String, serde_json::Value>,
}

impl ColumnStat {
    /// Look up a statistic by its raw key. Missing keys read as Absent.
    pub fn stat(&self, key: &str) -> StatValue {
        match self.stats.get(key) {
            Some(value) => StatValue::from_json(value),
            None => StatValue::Absent,
        }
    }

    /// Statistic keys in wire order
    pub fn stat_keys(&self) -> impl Iterator<Item = &String> {
        self.stats.keys()
    }
}

/// Column statistics for one dataset, as returned by the analytics endpoint.
/// Immutable once fetched; owned by the view that requested it.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSnapshot {
    pub filename: String,
    pub columns: Vec<ColumnStat>,
}

/// Dataset file metadata
#[derive(Debug, Clone, Deserialize)]
pub struct FileMeta {
    pub id: String,
    pub filename: String,
    pub upload_date: String,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    answer: Option<String>,
}

/// Blocking HTTP client for the AnalyticsFlow API.
///
/// Every request carries the bearer token it is handed; the client never
/// stores or refreshes credentials itself.
#[derive(Clone)]
pub struct AnalyticsClient {
    agent: ureq::Agent,
    base_url: String,
}

impl AnalyticsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /files/{id}
    pub fn file_metadata(&self, dataset_id: &str, token: &str) -> Result<FileMeta, ClientError> {
        let url = format!("{}/files/{}", self.base_url, dataset_id);
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", token))
            .call()
            .map_err(map_request_error)?;
        decode(response)
    }

    /// GET /analytics/{id}
    pub fn column_statistics(
        &self,
        dataset_id: &str,
        token: &str,
    ) -> Result<AnalyticsSnapshot, ClientError> {
        let url = format!("{}/analytics/{}", self.base_url, dataset_id);
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", token))
            .call()
            .map_err(map_request_error)?;
        decode(response)
    }

    /// POST /analytics/{id}/chat
    pub fn chat_exchange(
        &self,
        dataset_id: &str,
        token: &str,
        message: &str,
    ) -> Result<String, ClientError> {
        let url = format!("{}/analytics/{}/chat", self.base_url, dataset_id);
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", token))
            .send_json(serde_json::json!({ "message": message }))
            .map_err(map_request_error)?;
        let reply: ChatReply = decode(response)?;
        Ok(reply.answer.unwrap_or_default())
    }
}

fn map_request_error(error: ureq::Error) -> ClientError {
    match error {
        ureq::Error::Status(401, _) => ClientError::Auth,
        ureq::Error::Status(404, _) => ClientError::NotFound,
        ureq::Error::Status(status, _) => ClientError::Service { status },
        ureq::Error::Transport(t) => ClientError::Transport(t.to_string()),
    }
}

fn decode<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T, ClientError> {
    response
        .into_json::<T>()
        .map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_stat_preserves_wire_key_order() {
        let column: ColumnStat = serde_json::from_str(
            r#"{"name": "age", "type": "Integer",
                "stats": {"missing_values": 0, "total_count": 100, "mean": 30.5, "25%": 21}}"#,
        )
        .unwrap();

        let keys: Vec<&String> = column.stat_keys().collect();
        assert_eq!(keys, ["missing_values", "total_count", "mean", "25%"]);
    }

    #[test]
    fn test_stat_lookup_variants() {
        let column: ColumnStat = serde_json::from_str(
            r#"{"name": "city", "type": "String",
                "stats": {"unique_count": 5, "most_frequent": "Oslo", "mean": null}}"#,
        )
        .unwrap();

        assert_eq!(column.stat("unique_count"), StatValue::Number(5.0));
        assert_eq!(column.stat("most_frequent"), StatValue::Text("Oslo".to_string()));
        assert_eq!(column.stat("mean"), StatValue::Absent);
        assert_eq!(column.stat("no_such_key"), StatValue::Absent);
    }

    #[test]
    fn test_snapshot_deserializes_heterogeneous_columns() {
        let snapshot: AnalyticsSnapshot = serde_json::from_str(
            r#"{"filename": "people.csv", "columns": [
                {"name": "age", "type": "Integer", "stats": {"mean": 30, "max": 90}},
                {"name": "city", "type": "String", "stats": {"unique_count": 5}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(snapshot.filename, "people.csv");
        assert_eq!(snapshot.columns.len(), 2);
        assert_eq!(snapshot.columns[0].column_type, "Integer");
        assert_eq!(snapshot.columns[1].stat("unique_count"), StatValue::Number(5.0));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = AnalyticsClient::new("http://localhost:8000/", Duration::from_secs(5));
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
