use thiserror::Error;

/// Failure of a single country lookup request.
///
/// Every variant is terminal for the request that produced it and never for
/// its siblings.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { status: u16, url: String },

    #[error("could not decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// GraphQL answer without a usable `data` object
    #[error("GraphQL response has no data object")]
    MissingData,

    #[error("GraphQL field {alias} is not a country: {source}")]
    InvalidRecord {
        alias: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("endpoint {0} cannot take a path segment")]
    BaseUrl(String),
}

/// Problems with the geography dataset.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("could not parse GeoJSON: {0}")]
    Parse(#[from] simd_json::Error),

    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("geography dataset must be a FeatureCollection")]
    NotACollection,

    #[error("feature {index} has no `{key}` property")]
    MissingProperty { index: usize, key: &'static str },
}
