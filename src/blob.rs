//! A narrow seam over remote blob storage.
//!
//! Refresh loaders only need one operation: fetch an object together with its storage-supplied
//! version identifier. Everything else about the storage client (authentication, retries,
//! regioning) stays behind [`BlobStore`].
use reqwest::{header::ETAG, StatusCode, Url};

/// An artifact fetched from blob storage. Immutable per fetch.
#[derive(Debug, Clone)]
pub struct BlobObject {
    /// Raw object body.
    pub body: Vec<u8>,
    /// Opaque content fingerprint supplied by the storage layer (e.g., an ETag). Used to detect
    /// change without re-reading unchanged content.
    pub version_identifier: String,
}

/// Transient outcomes of a blob fetch. Loaders branch on the kind: all of these mean "skip this
/// refresh and keep the previous cache generation", never "crash".
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// The object does not exist (yet). A missing artifact simply means there is nothing to
    /// refresh.
    #[error("object not found: {bucket}/{key}")]
    NotFound {
        /// Bucket that was queried.
        bucket: String,
        /// Object key that was queried.
        key: String,
    },

    /// The transport failed before or while reading the object body.
    #[error(transparent)]
    Network(#[from] reqwest::Error),

    /// The object was served but is unusable (e.g., the storage layer did not attach a version
    /// identifier).
    #[error("unusable object {key}: {reason}")]
    Unusable {
        /// Object key that was queried.
        key: String,
        /// What made the object unusable.
        reason: String,
    },
}

/// Read access to versioned blob storage.
pub trait BlobStore: Send + Sync {
    /// Fetch the object at `bucket`/`key` together with its version identifier.
    fn get(&self, bucket: &str, key: &str) -> Result<BlobObject, FetchError>;
}

/// A [`BlobStore`] over an HTTP(S) object-storage endpoint.
///
/// Objects are addressed as `{base_url}/{bucket}/{key}` and the `ETag` response header is used as
/// the version identifier.
pub struct HttpBlobStore {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl HttpBlobStore {
    /// Create a store rooted at `base_url`.
    pub fn new(base_url: Url) -> HttpBlobStore {
        HttpBlobStore {
            client: reqwest::blocking::Client::new(),
            base_url,
        }
    }

    /// Create a store rooted at the given endpoint string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBaseUrl`](crate::Error::InvalidBaseUrl) if `base_url` does not
    /// parse.
    pub fn from_base_url(base_url: &str) -> crate::Result<HttpBlobStore> {
        let base_url = Url::parse(base_url).map_err(crate::Error::InvalidBaseUrl)?;
        Ok(HttpBlobStore::new(base_url))
    }
}

impl BlobStore for HttpBlobStore {
    fn get(&self, bucket: &str, key: &str) -> Result<BlobObject, FetchError> {
        let url = {
            let mut url = self.base_url.clone();
            {
                let mut segments = url
                    .path_segments_mut()
                    .map_err(|()| FetchError::Unusable {
                        key: key.to_owned(),
                        reason: "base url cannot be a base".to_owned(),
                    })?;
                segments.push(bucket);
                segments.extend(key.split('/'));
            }
            url
        };

        log::debug!(target: "adeval", "fetching artifact {}/{}", bucket, key);
        let response = self.client.get(url).send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            });
        }
        let response = response.error_for_status()?;

        let version_identifier = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_matches('"').to_owned())
            .ok_or_else(|| FetchError::Unusable {
                key: key.to_owned(),
                reason: "response carries no ETag header".to_owned(),
            })?;

        let body = response.bytes()?.to_vec();

        Ok(BlobObject {
            body,
            version_identifier,
        })
    }
}
