//! PostgREST document store.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use super::auth::AccessTokenSource;
use crate::backend::{
    Document, DocumentStore, DocumentWrite, Fields, Query, StoreError, StoreResult,
};
use crate::util::{compact_text, service_endpoint};

const ID_FIELD: &str = "id";

pub struct SupabaseDocumentStore {
    rest_url: String,
    anon_key: String,
    client: Client,
    tokens: Arc<dyn AccessTokenSource>,
}

impl SupabaseDocumentStore {
    pub fn new(
        url: impl AsRef<str>,
        anon_key: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> StoreResult<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(StoreError::ServiceUnavailable(
                "Supabase anon key must not be empty".to_string(),
            ));
        }
        let client = Client::builder()
            .build()
            .map_err(|error| StoreError::ServiceUnavailable(error.to_string()))?;

        Ok(Self {
            rest_url,
            anon_key,
            client,
            tokens,
        })
    }

    fn table_url(&self, collection: &str) -> String {
        format!("{}/{}", self.rest_url, collection)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .tokens
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        request.header("apikey", &self.anon_key).bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|error| StoreError::ServiceUnavailable(error.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    async fn rows(&self, request: RequestBuilder) -> StoreResult<Vec<Document>> {
        let response = self.send(request).await?;
        let rows = response
            .json::<Vec<Fields>>()
            .await
            .map_err(|error| StoreError::Malformed(error.to_string()))?;
        rows.into_iter().map(row_to_document).collect()
    }
}

impl fmt::Debug for SupabaseDocumentStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseDocumentStore")
            .field("rest_url", &self.rest_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentStore for SupabaseDocumentStore {
    async fn create(&self, collection: &str, write: DocumentWrite) -> StoreResult<String> {
        // Server timestamps are column defaults, so they are left out of the body.
        let request = self
            .client
            .post(self.table_url(collection))
            .header("Prefer", "return=representation")
            .json(&write.fields);
        self.rows(request)
            .await?
            .into_iter()
            .next()
            .map(|document| document.id)
            .ok_or_else(|| StoreError::Malformed("insert returned no rows".to_string()))
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let request = self
            .client
            .get(self.table_url(collection))
            .query(&[("select", "*".to_string()), (ID_FIELD, eq_filter(id))]);
        Ok(self.rows(request).await?.into_iter().next())
    }

    async fn set(&self, collection: &str, id: &str, write: DocumentWrite) -> StoreResult<()> {
        let mut fields = write.fields;
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        let request = self
            .client
            .post(self.table_url(collection))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&fields);
        self.send(request).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let request = self
            .client
            .patch(self.table_url(collection))
            .query(&[(ID_FIELD, eq_filter(id))])
            .header("Prefer", "return=minimal")
            .json(&fields);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let request = self
            .client
            .delete(self.table_url(collection))
            .query(&[(ID_FIELD, eq_filter(id))]);
        self.send(request).await?;
        Ok(())
    }

    async fn query(&self, collection: &str, query: Query) -> StoreResult<Vec<Document>> {
        let request = self
            .client
            .get(self.table_url(collection))
            .query(&query_params(&query));
        self.rows(request).await
    }
}

pub fn normalize_rest_url(url: &str) -> StoreResult<String> {
    service_endpoint(url, "/rest/v1").ok_or_else(|| {
        StoreError::ServiceUnavailable("Supabase URL must include http:// or https://".to_string())
    })
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for (field, value) in &query.filters {
        params.push((field.clone(), eq_filter(&filter_value(value))));
    }
    if let Some(order) = &query.order_by {
        let direction = if order.descending {
            "desc.nullsfirst"
        } else {
            "asc.nullsfirst"
        };
        params.push(("order".to_string(), format!("{}.{direction}", order.field)));
    }
    params
}

fn eq_filter(value: &str) -> String {
    format!("eq.{value}")
}

fn filter_value(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

fn row_to_document(mut row: Fields) -> StoreResult<Document> {
    let id = match row.remove(ID_FIELD) {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(StoreError::Malformed("row without id".to_string())),
    };
    Ok(Document { id, fields: row })
}

fn classify_status(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<Fields>(body)
        .ok()
        .and_then(|payload| {
            payload
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| compact_text(body));
    let message = if message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{message} ({})", status.as_u16())
    };

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        StoreError::PermissionDenied(message)
    } else {
        StoreError::ServiceUnavailable(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn normalize_rest_url_appends_rest_path() {
        assert_eq!(
            normalize_rest_url("https://demo.supabase.co/").unwrap(),
            "https://demo.supabase.co/rest/v1"
        );
        assert_eq!(
            normalize_rest_url("https://demo.supabase.co/rest/v1").unwrap(),
            "https://demo.supabase.co/rest/v1"
        );
    }

    #[test]
    fn query_params_encode_filters_and_order() {
        let query = Query::new()
            .where_eq("owner_id", "u1")
            .where_eq("pinned", true)
            .order_by_desc("created_at");
        assert_eq!(
            query_params(&query),
            vec![
                ("select".to_string(), "*".to_string()),
                ("owner_id".to_string(), "eq.u1".to_string()),
                ("pinned".to_string(), "eq.true".to_string()),
                ("order".to_string(), "created_at.desc.nullsfirst".to_string()),
            ]
        );
    }

    #[test]
    fn row_to_document_splits_id() {
        let row = json!({ "id": "n1", "text": "hi" });
        let Value::Object(row) = row else {
            unreachable!()
        };
        let document = row_to_document(row).unwrap();
        assert_eq!(document.id, "n1");
        assert_eq!(document.fields.get("text"), Some(&json!("hi")));
        assert!(!document.fields.contains_key("id"));
    }

    #[test]
    fn row_without_id_is_malformed() {
        assert!(matches!(
            row_to_document(Fields::new()),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn auth_statuses_map_to_permission_denied() {
        let error = classify_status(
            StatusCode::FORBIDDEN,
            r#"{"message":"new row violates row-level security policy"}"#,
        );
        assert_eq!(
            error,
            StoreError::PermissionDenied(
                "new row violates row-level security policy (403)".to_string()
            )
        );
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            StoreError::ServiceUnavailable(message) if message == "HTTP 503"
        ));
    }
}
