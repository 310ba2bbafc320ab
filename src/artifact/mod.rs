//! Artifact storage
//!
//! A run's artifact root is an opaque URI. The router classifies it once and
//! sends each file down one of three paths:
//!
//! ```text
//!                          ┌──────────────────────────┐
//!   artifact_uri(run) ───▶ │ ArtifactLocation::parse  │
//!                          └────────────┬─────────────┘
//!              ┌────────────────────────┼─────────────────────────┐
//!              ▼                        ▼                         ▼
//!   mlflow-artifacts:/E/R      dbfs:/databricks/             file:///path
//!              │               mlflow-tracking/E/R            or /path
//!              │                        │                         │
//!              ▼                        ▼                         ▼
//!   PUT <base>/api/2.0/      credentials-for-write        mkdir -p + copy
//!   mlflow-artifacts/...     ──▶ PUT signed URI
//! ```

mod credentials;
mod direct;
mod location;
mod router;
mod signed;

pub use credentials::{CredentialBroker, CredentialType, HttpHeader, UploadCredential};
pub use direct::{copy_to_local, direct_store_path, DirectStoreUploader};
pub use location::ArtifactLocation;
pub use router::{ArtifactRouter, UploadReport, UploadRequest, MAX_IN_FLIGHT_UPLOADS};
pub use signed::{default_headers, upload_headers, SignedUriUploader};
