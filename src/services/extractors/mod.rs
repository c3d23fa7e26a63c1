// Feature extractors: URL-lexical, page content and TLS certificate
// Each one owns a disjoint namespace of the feature schema and never fails

pub mod content_features;
pub mod tls_features;
pub mod url_features;

use crate::models::{FeatureSource, FeatureVector};
use async_trait::async_trait;

pub use content_features::ContentFeatureExtractor;
pub use tls_features::TlsFeatureExtractor;
pub use url_features::UrlFeatureExtractor;

#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Namespace of the features this extractor may produce
    fn source(&self) -> FeatureSource;

    /// Features for `url`; data-source failures degrade to sentinel values
    async fn extract(&self, url: &str) -> FeatureVector;

    /// Vector reported when the extractor cannot run at all
    fn empty(&self) -> FeatureVector;

    /// Vector reported when `extract` misses the caller's deadline.
    /// Extractors with network-free features override this to keep them.
    fn fallback(&self, _url: &str) -> FeatureVector {
        self.empty()
    }
}
