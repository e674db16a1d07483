use crate::catalog::CardsSource;
use crate::http::build_client;
use crate::models::{CardsCursor, CardsPage};
use crate::wildberries::config::{CARDS_LIST_URL, CARDS_PAGE_LIMIT};
use reqwest::Client;
use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentApiError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    Deserialize(String),
}

#[derive(Debug, Serialize)]
pub struct CardsListRequest<'a> {
    pub settings: CardsListSettings<'a>,
}

#[derive(Debug, Serialize)]
pub struct CardsListSettings<'a> {
    pub cursor: CursorRequest<'a>,
    pub filter: CardsFilter<'a>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorRequest<'a> {
    pub limit: u32,
    pub updated_at: Option<&'a str>,
    #[serde(rename = "nmID")]
    pub nm_id: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsFilter<'a> {
    pub with_photo: i32,
    #[serde(rename = "objectIDs")]
    pub object_ids: &'a [u64],
}

impl<'a> CardsListRequest<'a> {
    /// The first page omits both cursor fields.
    pub fn new(cursor: &'a CardsCursor, object_ids: &'a [u64]) -> Self {
        Self {
            settings: CardsListSettings {
                cursor: CursorRequest {
                    limit: CARDS_PAGE_LIMIT,
                    updated_at: Some(cursor.updated_at.as_str()).filter(|s| !s.is_empty()),
                    nm_id: Some(cursor.nm_id).filter(|id| *id != 0),
                },
                filter: CardsFilter {
                    with_photo: 1,
                    object_ids,
                },
            },
        }
    }
}

/// Content API client listing cards for a fixed set of categories.
#[derive(Debug, Clone)]
pub struct ContentClient {
    http: Client,
    api_key: String,
    object_ids: Vec<u64>,
}

impl ContentClient {
    pub fn new(api_key: impl Into<String>, object_ids: Vec<u64>) -> Self {
        Self {
            http: build_client(10),
            api_key: api_key.into(),
            object_ids,
        }
    }
}

impl CardsSource for ContentClient {
    type Error = ContentApiError;

    async fn page(&self, cursor: &CardsCursor) -> Result<CardsPage, ContentApiError> {
        let body = CardsListRequest::new(cursor, &self.object_ids);
        let response = self
            .http
            .post(CARDS_LIST_URL.as_str())
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ContentApiError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ContentApiError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json::<CardsPage>()
            .await
            .map_err(|err| ContentApiError::Deserialize(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_page_omits_cursor_position() {
        let cursor = CardsCursor::default();
        let ids = [802, 1349];
        let body = serde_json::to_value(CardsListRequest::new(&cursor, &ids)).unwrap();
        assert_eq!(
            body,
            json!({
                "settings": {
                    "cursor": {"limit": 100},
                    "filter": {"withPhoto": 1, "objectIDs": [802, 1349]}
                }
            })
        );
    }

    #[test]
    fn next_page_carries_cursor() {
        let cursor = CardsCursor {
            updated_at: "2024-05-01T10:00:00Z".into(),
            nm_id: 42,
            total: 100,
        };
        let body = serde_json::to_value(CardsListRequest::new(&cursor, &[7246])).unwrap();
        assert_eq!(
            body["settings"]["cursor"],
            json!({"limit": 100, "updatedAt": "2024-05-01T10:00:00Z", "nmID": 42})
        );
    }
}
