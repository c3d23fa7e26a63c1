// Utility modules for the phishing detector

pub mod api_errors;
pub mod csv_rows;
pub mod domain_age;
pub mod domain_parts;
pub mod http_fetch;
pub mod tls_probe;
pub mod url_validator;

pub use api_errors::{ApiError, ApiErrorResponse, ApiResult};
pub use csv_rows::{read_training_samples, CsvError, CsvTable};
pub use domain_age::{DomainAgeError, DomainAgeLookup, RdapLookup};
pub use domain_parts::DomainParts;
pub use http_fetch::{FetchConfig, FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use tls_probe::{CertificateSource, PeerCertificate, TlsProbe, TlsProbeError};
pub use url_validator::{normalize_input, ValidationError};
