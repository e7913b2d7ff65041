//! Table-level read/write builder.
//!
//! Follows the gateway's REST conventions: filter predicates as query
//! parameters (`col=eq.value`, `col=in.(a,b)`), ordering as
//! `order=col.direction`, and write behavior negotiated through `Prefer`
//! headers. Only the operators this application uses are implemented.

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use super::{check_status, expect_json, Gateway};
use crate::error::{Error, Result};

pub struct TableQuery<'g> {
    gateway: &'g Gateway,
    table: String,
    params: Vec<(String, String)>,
}

impl<'g> TableQuery<'g> {
    pub(crate) fn new(gateway: &'g Gateway, table: &str) -> Self {
        Self {
            gateway,
            table: table.to_string(),
            params: Vec::new(),
        }
    }

    /// Restricts returned columns. Defaults to `*`.
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn in_<V: ToString>(mut self, column: &str, values: &[V]) -> Self {
        let list = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.params
            .push((column.to_string(), format!("in.({list})")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{column}.{direction}")));
        self
    }

    fn url(&self, extra: Option<(&str, &str)>) -> String {
        let mut pairs: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if let Some((k, v)) = extra {
            pairs.push(format!("{k}={v}"));
        }

        let path = format!("/rest/v1/{}", self.table);
        if pairs.is_empty() {
            self.gateway.endpoint(&path)
        } else {
            format!("{}?{}", self.gateway.endpoint(&path), pairs.join("&"))
        }
    }

    async fn request(&self, method: Method, url: String) -> RequestBuilder {
        trace!(method = %method, url = %url, "Gateway request");
        let mut builder = self
            .gateway
            .http()
            .request(method, url)
            .header("apikey", self.gateway.api_key());
        if let Some(token) = self.gateway.bearer().await {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Executes the read and decodes all matching rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let url = self.url(None);
        let response = self.request(Method::GET, url).await.send().await?;
        expect_json(response).await
    }

    /// Exact row count for the current filters, without transferring rows.
    pub async fn count(self) -> Result<u64> {
        let url = self.url(None);
        let response = self
            .request(Method::GET, url)
            .await
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await?;
        let response = check_status(response).await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        // "0-9/57" or "*/0"
        range
            .rsplit('/')
            .next()
            .and_then(|total| total.parse().ok())
            .ok_or_else(|| Error::Rejected {
                status: 200,
                message: format!("unparseable content-range `{range}`"),
            })
    }

    /// Inserts one or more rows and returns the stored representation.
    pub async fn insert<R, T>(self, rows: &T) -> Result<Vec<R>>
    where
        R: DeserializeOwned,
        T: Serialize + ?Sized,
    {
        let url = self.url(None);
        let response = self
            .request(Method::POST, url)
            .await
            .header("Prefer", "return=representation")
            .json(&normalize_rows(rows)?)
            .send()
            .await?;
        expect_json(response).await
    }

    /// Applies a partial update to every row matching the filters.
    pub async fn update<T: Serialize>(self, patch: &T) -> Result<()> {
        let url = self.url(None);
        let response = self
            .request(Method::PATCH, url)
            .await
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    /// Inserts rows, merging into existing ones that share the conflict key.
    pub async fn upsert<T>(self, rows: &T, on_conflict: &str) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let url = self.url(Some(("on_conflict", on_conflict)));
        let response = self
            .request(Method::POST, url)
            .await
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&normalize_rows(rows)?)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    /// Deletes every row matching the filters.
    pub async fn delete(self) -> Result<()> {
        let url = self.url(None);
        let response = self.request(Method::DELETE, url).await.send().await?;
        check_status(response).await.map(|_| ())
    }
}

/// The gateway expects a JSON array on write paths; wrap single objects.
fn normalize_rows<T: Serialize + ?Sized>(rows: &T) -> Result<serde_json::Value> {
    let value = serde_json::to_value(rows)?;
    Ok(match value {
        serde_json::Value::Array(_) => value,
        other => serde_json::Value::Array(vec![other]),
    })
}
