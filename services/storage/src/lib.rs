//! Blob storage request signing, resource addressing and paginated listing.
//!
//! This crate provides the client-side pieces a blob storage REST API needs
//! before any byte leaves the process:
//!
//! - Shared Key authorization: [`RequestSigner`]
//! - Shared access signatures, account and service scoped: [`AccountSas`],
//!   [`ServiceSas`]
//! - Structured resource addresses: [`ResourceLocator`]
//! - Continuation-marker pagination: [`Pager`], [`list_all`]
//!
//! Everything here is a pure computation over immutable inputs. The HTTP
//! transport, the clock for production signing, and the page-fetching
//! callback are all supplied by the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use blobsign_core::Result;
//! use blobsign_storage::{Credential, RequestSigner, ResourceLocator};
//!
//! fn main() -> Result<()> {
//!     let locator = ResourceLocator::parse("https://acct.blob.example.com")?
//!         .with_container("images")
//!         .with_blob("2024/cat.png")?;
//!
//!     let cred = Credential::with_shared_key("acct", "MDEyMzQ1Njc4OWFiY2RlZg==");
//!     let signer = RequestSigner::new();
//!
//!     let mut parts = http::Request::put(locator.to_url())
//!         .header("content-length", "3")
//!         .body(())
//!         .unwrap()
//!         .into_parts()
//!         .0;
//!     signer.sign(&mut parts, &cred)?;
//!
//!     // Hand the signed parts to your HTTP transport of choice.
//!     Ok(())
//! }
//! ```

mod constants;

mod config;
pub use config::Config;
mod connection_string;

mod credential;
pub use credential::Credential;

mod locator;
pub use locator::ResourceLocator;

mod signer;
pub use signer::RequestSigner;

mod sas;
pub use sas::{
    AccountSas, AccountSasPermissions, BlobSasPermissions, ResourceTypes, SasProtocol, ServiceSas,
    Services, SignedQueryParameters,
};

mod listing;
pub use listing::{list_all, Page, Pager};

pub mod model;
