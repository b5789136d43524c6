//! REST point backend.
//!
//! Speaks the Qdrant-compatible HTTP API over a blocking `reqwest` client.
//!
//! # Endpoints Used
//!
//! | Operation | Request | Description |
//! |-----------|---------|-------------|
//! | Create collection | `PUT /collections/{name}` | Vector size and distance |
//! | Delete collection | `DELETE /collections/{name}` | Drops all points |
//! | List collections | `GET /collections` | Names only |
//! | Upsert | `PUT /collections/{name}/points?wait=` | Batch of points |
//! | Retrieve | `POST /collections/{name}/points` | By id, with vectors |
//! | Search | `POST /collections/{name}/points/search` | Optional `must` match filter |
//! | Scroll | `POST /collections/{name}/points/scroll` | First page only |
//!
//! Responses wrap their data in a `{"result": ...}` envelope. Payloads are
//! parsed as raw JSON first. Values outside the supported field kinds
//! (booleans, nulls, nested objects) are skipped with a warning, so foreign
//! keys never fail a whole response.

use crate::models::{
    CollectionDescription, FieldValue, Payload, PayloadFilter, Point, PointId, Record,
    ScoredPoint, SearchRequest, VectorParams,
};
use crate::storage::traits::PointBackend;
use crate::{Error, Result};
use reqwest::blocking::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "api-key";

/// REST backend for Qdrant-compatible servers.
pub struct RestBackend {
    /// Base URL without trailing slash.
    base_url: String,
    /// Optional API key.
    api_key: Option<SecretString>,
    /// HTTP client.
    client: Client,
}

impl RestBackend {
    /// Default local server URL.
    pub const DEFAULT_URL: &'static str = "http://localhost:6333";

    /// Creates a backend for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key: None,
            client: Client::new(),
        }
    }

    /// Sets the API key sent with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, name: &str, suffix: &str) -> String {
        format!("{}/collections/{name}{suffix}", self.base_url)
    }

    /// Sends a request and unwraps the `result` envelope.
    fn send<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> Result<T> {
        let request = match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.expose_secret()),
            None => request,
        };

        let response = request
            .send()
            .map_err(|e| Error::backend(operation, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::backend(
                operation,
                format!("server returned status: {status} - {body}"),
            ));
        }

        let envelope: ApiResponse<T> = response
            .json()
            .map_err(|e| Error::backend(operation, e))?;
        Ok(envelope.result)
    }
}

/// Response envelope.
#[derive(Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Serialize)]
struct CreateCollectionBody {
    vectors: VectorParams,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    points: &'a [Point],
}

#[derive(Serialize)]
struct RetrieveBody<'a> {
    ids: &'a [PointId],
    with_payload: bool,
    with_vector: bool,
}

/// Payload as sent by the server, before conversion.
type RawPayload = serde_json::Map<String, serde_json::Value>;

/// Converts a raw payload, dropping values no [`FieldValue`] can hold.
fn convert_payload(raw: RawPayload) -> Payload {
    raw.into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<FieldValue>(value) {
            Ok(value) => Some((key, value)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping unsupported payload value");
                None
            },
        })
        .collect()
}

#[derive(Deserialize)]
struct RetrievedPoint {
    id: PointId,
    #[serde(default)]
    payload: Option<RawPayload>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct RawScoredPoint {
    id: PointId,
    score: f32,
    #[serde(default)]
    payload: Option<RawPayload>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

impl From<RawScoredPoint> for ScoredPoint {
    fn from(raw: RawScoredPoint) -> Self {
        Self {
            id: raw.id,
            score: raw.score,
            payload: raw.payload.map(convert_payload),
            vector: raw.vector,
        }
    }
}

#[derive(Deserialize)]
struct RawRecord {
    id: PointId,
    #[serde(default)]
    payload: Option<RawPayload>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        Self {
            id: raw.id,
            payload: raw.payload.map(convert_payload),
            vector: raw.vector,
        }
    }
}

#[derive(Serialize)]
struct SearchBody<'a> {
    vector: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<FilterBody<'a>>,
    limit: usize,
    with_payload: bool,
    with_vector: bool,
}

#[derive(Serialize)]
struct FilterBody<'a> {
    must: [ConditionBody<'a>; 1],
}

#[derive(Serialize)]
struct ConditionBody<'a> {
    key: &'a str,
    #[serde(rename = "match")]
    matches: MatchBody<'a>,
}

#[derive(Serialize)]
struct MatchBody<'a> {
    value: &'a FieldValue,
}

impl<'a> From<&'a PayloadFilter> for FilterBody<'a> {
    fn from(filter: &'a PayloadFilter) -> Self {
        Self {
            must: [ConditionBody {
                key: &filter.key,
                matches: MatchBody {
                    value: &filter.value,
                },
            }],
        }
    }
}

#[derive(Serialize)]
struct ScrollBody {
    limit: usize,
    with_payload: bool,
    with_vector: bool,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<RawRecord>,
}

impl PointBackend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn create_collection(&self, name: &str, params: &VectorParams) -> Result<()> {
        let body = CreateCollectionBody { vectors: *params };
        let _: serde_json::Value = self.send(
            "create_collection",
            self.client.put(self.collection_url(name, "")).json(&body),
        )?;
        Ok(())
    }

    fn delete_collection(&self, name: &str) -> Result<bool> {
        self.send(
            "delete_collection",
            self.client.delete(self.collection_url(name, "")),
        )
    }

    fn list_collections(&self) -> Result<Vec<CollectionDescription>> {
        let result: CollectionsResult = self.send(
            "list_collections",
            self.client.get(format!("{}/collections", self.base_url)),
        )?;
        Ok(result.collections)
    }

    fn upsert(&self, collection: &str, points: Vec<Point>, wait: bool) -> Result<()> {
        let body = UpsertBody { points: &points };
        let _: serde_json::Value = self.send(
            "upsert",
            self.client
                .put(self.collection_url(collection, "/points"))
                .query(&[("wait", wait)])
                .json(&body),
        )?;
        Ok(())
    }

    fn retrieve(&self, collection: &str, ids: &[PointId]) -> Result<Vec<Point>> {
        let body = RetrieveBody {
            ids,
            with_payload: true,
            with_vector: true,
        };
        let retrieved: Vec<RetrievedPoint> = self.send(
            "retrieve",
            self.client
                .post(self.collection_url(collection, "/points"))
                .json(&body),
        )?;

        Ok(retrieved
            .into_iter()
            .map(|p| {
                Point::new(
                    p.id,
                    p.vector.unwrap_or_default(),
                    p.payload.map(convert_payload).unwrap_or_default(),
                )
            })
            .collect())
    }

    fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<ScoredPoint>> {
        let body = SearchBody {
            vector: &request.vector,
            filter: request.filter.as_ref().map(FilterBody::from),
            limit: request.limit,
            with_payload: request.with_payload,
            with_vector: request.with_vector,
        };
        let hits: Vec<RawScoredPoint> = self.send(
            "search",
            self.client
                .post(self.collection_url(collection, "/points/search"))
                .json(&body),
        )?;
        Ok(hits.into_iter().map(ScoredPoint::from).collect())
    }

    fn scroll(&self, collection: &str, limit: usize) -> Result<Vec<Record>> {
        let body = ScrollBody {
            limit,
            with_payload: true,
            with_vector: false,
        };
        let result: ScrollResult = self.send(
            "scroll",
            self.client
                .post(self.collection_url(collection, "/points/scroll"))
                .json(&body),
        )?;
        Ok(result.points.into_iter().map(Record::from).collect())
    }
}
