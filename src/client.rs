//! HTTP access to the country services
//!
//! The REST service answers one country per request. The GraphQL service
//! answers a batched query built by [`crate::workflow::build_graphql_query`].

use crate::config::EndpointConfig;
use crate::error::FetchError;
use crate::workflow::CountryRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::warn;

/// Source of country data, one method per protocol
#[async_trait]
pub trait CountrySource: Send + Sync {
    /// Look up a single country by its alpha-3 code
    async fn country_by_code(&self, code: &str) -> Result<CountryRecord, FetchError>;

    /// Run a batched GraphQL document and return its countries in response order
    async fn countries_by_query(&self, query: &str) -> Result<Vec<CountryRecord>, FetchError>;
}

/// Shape of a REST lookup answer (extra fields ignored)
#[derive(Debug, Deserialize)]
struct RestCountry {
    name: String,
    #[serde(rename = "alpha3Code")]
    alpha3_code: String,
    population: u64,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
}

pub struct HttpCountryClient {
    client: Client,
    rest_base: Url,
    graphql_url: Url,
}

impl HttpCountryClient {
    pub fn new(endpoints: &EndpointConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoints.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Self::with_client(client, endpoints)
    }

    /// Use an already configured reqwest client
    pub fn with_client(client: Client, endpoints: &EndpointConfig) -> Result<Self> {
        let rest_base = Url::parse(&endpoints.rest)
            .with_context(|| format!("Invalid REST endpoint: {}", endpoints.rest))?;
        let graphql_url = Url::parse(&endpoints.graphql)
            .with_context(|| format!("Invalid GraphQL endpoint: {}", endpoints.graphql))?;

        Ok(Self {
            client,
            rest_base,
            graphql_url,
        })
    }

    /// `{rest_base}/{code}` with the code percent-encoded as one segment
    fn country_url(&self, code: &str) -> Result<Url, FetchError> {
        let mut url = self.rest_base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::BaseUrl(self.rest_base.to_string()))?
            .pop_if_empty()
            .push(code);
        Ok(url)
    }
}

#[async_trait]
impl CountrySource for HttpCountryClient {
    async fn country_by_code(&self, code: &str) -> Result<CountryRecord, FetchError> {
        let url = self.country_url(code)?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        decode_rest_country(&body)
    }

    async fn countries_by_query(&self, query: &str) -> Result<Vec<CountryRecord>, FetchError> {
        // .json() sets Content-Type: application/json
        let response = self
            .client
            .post(self.graphql_url.clone())
            .json(&GraphQlRequest { query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: self.graphql_url.to_string(),
            });
        }

        let body = response.bytes().await?;
        decode_graphql_countries(&body)
    }
}

/// Map a REST answer onto a record (`alpha3Code` becomes `code`)
pub fn decode_rest_country(body: &[u8]) -> Result<CountryRecord, FetchError> {
    let country: RestCountry = serde_json::from_slice(body)?;
    Ok(CountryRecord {
        name: country.name,
        code: country.alpha3_code,
        population: country.population,
    })
}

/// Extract every value of the top-level `data` object, in response order.
///
/// A missing or non-object `data` is [`FetchError::MissingData`]. Aliases
/// answered with `null` (unknown code) are skipped.
pub fn decode_graphql_countries(body: &[u8]) -> Result<Vec<CountryRecord>, FetchError> {
    let response: GraphQlResponse = serde_json::from_slice(body)?;
    let data: Map<String, Value> = match response.data {
        Some(Value::Object(data)) => data,
        _ => return Err(FetchError::MissingData),
    };

    let mut records = Vec::with_capacity(data.len());
    for (alias, value) in data {
        if value.is_null() {
            warn!(%alias, "GraphQL lookup returned no country");
            continue;
        }
        let record = serde_json::from_value(value)
            .map_err(|source| FetchError::InvalidRecord { alias, source })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one HTTP request with `status` and `body`, returning the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .map(|v| v.trim().parse::<usize>().unwrap())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            String::from_utf8(request).unwrap()
        });
        (format!("http://{addr}"), handle)
    }

    fn local_client(base: &str) -> HttpCountryClient {
        let endpoints = EndpointConfig {
            rest: format!("{base}/alpha"),
            graphql: format!("{base}/graphql"),
            ..EndpointConfig::default()
        };
        let client = Client::builder().no_proxy().build().unwrap();
        HttpCountryClient::with_client(client, &endpoints).unwrap()
    }

    fn split_request(raw: &str) -> (String, &str) {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        (head.to_lowercase(), body)
    }

    #[tokio::test]
    async fn test_rest_lookup_gets_code_path() {
        let (base, server) =
            serve_once("200 OK", r#"{"name":"France","alpha3Code":"FRA","population":67}"#).await;
        let record = local_client(&base).country_by_code("FRA").await.unwrap();
        assert_eq!(record.code, "FRA");
        assert_eq!(record.population, 67);

        let raw = server.await.unwrap();
        let (head, _) = split_request(&raw);
        assert!(head.starts_with("get /alpha/fra http/1.1"), "{head}");
    }

    #[tokio::test]
    async fn test_graphql_posts_json_query() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"data":{"country0":{"name":"France","code":"FRA","population":67}}}"#,
        )
        .await;
        let query = r#"query{country0: getCountriesByCode(code:"FRA") { ...fields } } fragment fields on Country {name code population}"#;
        let records = local_client(&base).countries_by_query(query).await.unwrap();
        assert_eq!(records.len(), 1);

        let raw = server.await.unwrap();
        let (head, body) = split_request(&raw);
        assert!(head.starts_with("post /graphql http/1.1"), "{head}");
        assert!(head.lines().any(|line| line == "content-type: application/json"), "{head}");
        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body, serde_json::json!({ "query": query }));
    }

    #[tokio::test]
    async fn test_rest_error_status_is_a_failure() {
        let (base, server) = serve_once("500 Internal Server Error", "{}").await;
        let err = local_client(&base).country_by_code("FRA").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }), "{err:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_graphql_error_status_is_a_failure() {
        let (base, server) = serve_once("500 Internal Server Error", "{}").await;
        let err = local_client(&base).countries_by_query("query{}").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }), "{err:?}");
        server.await.unwrap();
    }

    fn client(rest: &str) -> HttpCountryClient {
        HttpCountryClient::new(&EndpointConfig {
            rest: rest.into(),
            ..EndpointConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_country_url_appends_code() {
        let c = client("https://restcountries.eu/rest/v2/alpha");
        assert_eq!(
            c.country_url("FRA").unwrap().as_str(),
            "https://restcountries.eu/rest/v2/alpha/FRA"
        );

        let c = client("https://restcountries.eu/rest/v2/alpha/");
        assert_eq!(
            c.country_url("DEU").unwrap().as_str(),
            "https://restcountries.eu/rest/v2/alpha/DEU"
        );
    }

    #[test]
    fn test_country_url_encodes_code() {
        let c = client("http://localhost/alpha");
        assert_eq!(
            c.country_url("a/b?c").unwrap().as_str(),
            "http://localhost/alpha/a%2Fb%3Fc"
        );
    }

    #[test]
    fn test_rejects_invalid_endpoints() {
        let result = HttpCountryClient::new(&EndpointConfig {
            graphql: "not a url".into(),
            ..EndpointConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rest_country_maps_alpha3() {
        let body = br#"{"name":"France","alpha2Code":"FR","alpha3Code":"FRA","population":67000000,"capital":"Paris"}"#;
        let record = decode_rest_country(body).unwrap();
        assert_eq!(
            record,
            CountryRecord {
                name: "France".into(),
                code: "FRA".into(),
                population: 67_000_000,
            }
        );
    }

    #[test]
    fn test_decode_rest_country_rejects_missing_fields() {
        let err = decode_rest_country(br#"{"name":"France"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_decode_graphql_keeps_server_order() {
        let body = br#"{"data":{"country0":{"name":"France","code":"FRA","population":67},"country1":{"name":"Germany","code":"DEU","population":83}}}"#;
        let records = decode_graphql_countries(body).unwrap();
        assert_eq!(
            records,
            vec![
                CountryRecord { name: "France".into(), code: "FRA".into(), population: 67 },
                CountryRecord { name: "Germany".into(), code: "DEU".into(), population: 83 },
            ]
        );

        // Order is whatever the server sent, not alias order
        let body = br#"{"data":{"country1":{"name":"Germany","code":"DEU","population":83},"country0":{"name":"France","code":"FRA","population":67}}}"#;
        let codes: Vec<_> = decode_graphql_countries(body)
            .unwrap()
            .into_iter()
            .map(|r| r.code)
            .collect();
        assert_eq!(codes, ["DEU", "FRA"]);
    }

    #[test]
    fn test_decode_graphql_missing_data() {
        let body = br#"{"errors":[{"message":"boom"}]}"#;
        assert!(matches!(decode_graphql_countries(body), Err(FetchError::MissingData)));
        assert!(matches!(decode_graphql_countries(br#"{"data":null}"#), Err(FetchError::MissingData)));
        assert!(matches!(decode_graphql_countries(br#"{"data":[1]}"#), Err(FetchError::MissingData)));
    }

    #[test]
    fn test_decode_graphql_invalid_record() {
        let body = br#"{"data":{"country0":{"name":"France"}}}"#;
        match decode_graphql_countries(body) {
            Err(FetchError::InvalidRecord { alias, .. }) => assert_eq!(alias, "country0"),
            other => panic!("expected InvalidRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_graphql_skips_unknown_codes() {
        let body = br#"{"data":{"country0":null,"country1":{"name":"Germany","code":"DEU","population":83}}}"#;
        let records = decode_graphql_countries(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, "DEU");
    }

    #[test]
    fn test_decode_graphql_empty_data() {
        assert!(decode_graphql_countries(br#"{"data":{}}"#).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_graphql_countries(b"<html>"), Err(FetchError::Decode(_))));
    }
}
