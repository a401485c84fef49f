//! ClickHouse HTTP interface client.
//!
//! Statements go in the POST body; bound parameters travel as
//! `param_<name>` URL arguments in ClickHouse text format and are matched to
//! `{name:Type}` placeholders server side. Query results are requested as
//! `JSONCompact`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use super::{BackendError, Database, QueryResult};
use crate::config::DatabaseConfig;
use crate::sql::BoundParams;

/// `Database` over the ClickHouse HTTP port (8123 by default).
#[derive(Debug, Clone)]
pub struct ClickHouseHttp {
    client: Client,
    base_url: String,
    user: String,
    password: String,
    database: String,
}

#[derive(Debug, Deserialize)]
struct JsonCompactBody {
    meta: Vec<MetaColumn>,
    data: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct MetaColumn {
    name: String,
}

impl ClickHouseHttp {
    pub fn new(config: &DatabaseConfig) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if config.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.request_timeout_ms));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url(),
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, params: &BoundParams, settings: &[(&str, &str)]) -> RequestBuilder {
        let mut query: Vec<(String, String)> = Vec::with_capacity(params.len() + settings.len() + 1);
        query.push(("database".to_string(), self.database.clone()));
        for (key, value) in settings {
            query.push(((*key).to_string(), (*value).to_string()));
        }
        for (name, value) in params.iter() {
            query.push((format!("param_{name}"), value.to_param_text()));
        }
        self.client
            .post(&self.base_url)
            .header("X-ClickHouse-User", &self.user)
            .header("X-ClickHouse-Key", &self.password)
            .query(&query)
    }

    async fn send(builder: RequestBuilder) -> Result<String, BackendError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: text.trim().to_string(),
            });
        }
        Ok(text)
    }
}

/// Drop trailing whitespace and semicolons so a `FORMAT` clause can follow.
fn strip_terminator(sql: &str) -> &str {
    sql.trim_end().trim_end_matches(';').trim_end()
}

/// Backtick-quote an identifier that did not come from a live schema.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
}

fn decode_json_compact(body: &str) -> Result<QueryResult, BackendError> {
    let parsed: JsonCompactBody =
        serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))?;
    Ok(QueryResult {
        columns: parsed.meta.into_iter().map(|m| m.name).collect(),
        rows: parsed.data,
    })
}

#[async_trait]
impl Database for ClickHouseHttp {
    async fn command(&self, sql: &str, params: &BoundParams) -> Result<(), BackendError> {
        tracing::debug!(sql = %sql, params = params.len(), "command");
        let builder = self.request(params, &[]).body(sql.to_string());
        Self::send(builder).await.map(|_| ())
    }

    async fn query(&self, sql: &str, params: &BoundParams) -> Result<QueryResult, BackendError> {
        tracing::debug!(sql = %sql, params = params.len(), "query");
        let body = format!("{}\nFORMAT JSONCompact", strip_terminator(sql));
        let builder = self
            .request(params, &[("output_format_json_quote_64bit_integers", "0")])
            .body(body);
        let text = Self::send(builder).await?;
        decode_json_compact(&text)
    }

    async fn insert_json_rows(
        &self,
        table: &str,
        columns: &[String],
        body: Vec<u8>,
    ) -> Result<(), BackendError> {
        let cols: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        let statement = format!(
            "INSERT INTO {table} ({}) FORMAT JSONEachRow",
            cols.join(", ")
        );
        let builder = self
            .request(
                &BoundParams::new(),
                &[
                    ("query", statement.as_str()),
                    ("date_time_input_format", "best_effort"),
                ],
            )
            .body(body);
        Self::send(builder).await.map(|_| ())
    }
}
