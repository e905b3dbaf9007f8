//! Wire models for listing responses.
//!
//! The service enumerates containers and blobs as XML bodies. Only the
//! narrow shapes the listing path actually consumes are modeled here, as
//! hand-maintained structs rather than schema-generated code.

use serde::Deserialize;

use blobsign_core::Error;
use blobsign_core::Result;

use crate::listing::Page;

/// Body of a list-blobs call (`comp=list` on a container).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListBlobsResult {
    /// Prefix filter the listing was issued with, if any.
    pub prefix: Option<String>,
    /// Marker this page resumed from.
    pub marker: Option<String>,
    /// Page size cap the listing was issued with.
    pub max_results: Option<u32>,
    /// The blobs on this page.
    #[serde(default)]
    pub blobs: Blobs,
    /// Marker for the next page. Empty when the listing is exhausted.
    pub next_marker: Option<String>,
}

/// Wrapper element around the blob entries.
#[derive(Debug, Default, Deserialize)]
pub struct Blobs {
    /// Entries in server order.
    #[serde(rename = "Blob", default)]
    pub items: Vec<Blob>,
}

/// A single blob entry.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Blob {
    /// Blob name, relative to its container.
    pub name: String,
    /// Properties the listing reports.
    #[serde(default)]
    pub properties: BlobProperties,
}

/// The subset of blob properties the listing path consumes.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct BlobProperties {
    /// Last modification time, HTTP date format.
    #[serde(rename = "Last-Modified")]
    pub last_modified: Option<String>,
    /// Entity tag.
    #[serde(rename = "Etag")]
    pub etag: Option<String>,
    /// Content length in bytes.
    #[serde(rename = "Content-Length")]
    pub content_length: Option<u64>,
    /// MIME type.
    #[serde(rename = "Content-Type")]
    pub content_type: Option<String>,
    /// Base64 MD5 of the content, when the service reports one.
    #[serde(rename = "Content-MD5")]
    pub content_md5: Option<String>,
}

/// Body of a list-containers call (`comp=list` on the account).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListContainersResult {
    /// Marker this page resumed from.
    pub marker: Option<String>,
    /// The containers on this page.
    #[serde(default)]
    pub containers: Containers,
    /// Marker for the next page. Empty when the listing is exhausted.
    pub next_marker: Option<String>,
}

/// Wrapper element around the container entries.
#[derive(Debug, Default, Deserialize)]
pub struct Containers {
    /// Entries in server order.
    #[serde(rename = "Container", default)]
    pub items: Vec<Container>,
}

/// A single container entry.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Container {
    /// Container name.
    pub name: String,
}

/// Parse a list-blobs XML body.
pub fn parse_list_blobs(body: &str) -> Result<ListBlobsResult> {
    quick_xml::de::from_str(body)
        .map_err(|e| Error::unexpected("failed to parse blob listing body").with_source(e))
}

/// Parse a list-containers XML body.
pub fn parse_list_containers(body: &str) -> Result<ListContainersResult> {
    quick_xml::de::from_str(body)
        .map_err(|e| Error::unexpected("failed to parse container listing body").with_source(e))
}

impl ListBlobsResult {
    /// Convert into a listing page, normalizing an empty terminal marker
    /// away.
    pub fn into_page(self) -> Page<Blob> {
        Page {
            items: self.blobs.items,
            next_marker: self.next_marker.filter(|m| !m.is_empty()),
        }
    }
}

impl ListContainersResult {
    /// Convert into a listing page, normalizing an empty terminal marker
    /// away.
    pub fn into_page(self) -> Page<Container> {
        Page {
            items: self.containers.items,
            next_marker: self.next_marker.filter(|m| !m.is_empty()),
        }
    }
}
