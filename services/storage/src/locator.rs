use http::uri::Authority;
use http::uri::Scheme;
use http::Uri;
use percent_encoding::percent_encode;

use blobsign_core::Error;
use blobsign_core::Result;

use crate::constants::QUERY_ENCODE_SET;
use crate::sas::SignedQueryParameters;

/// Structured address of a storage resource.
///
/// A locator names an account endpoint and, optionally, a container, a blob
/// inside that container, and a snapshot of that blob. Signed query
/// parameters produced by the SAS generators can be attached for serialized
/// delegated-access URLs.
///
/// Locators are immutable: every `with_*` method consumes the value and
/// returns a new one, so a locator shared by concurrent requests can never
/// change underneath them. Two invariants hold by construction:
///
/// - a blob requires a container
/// - a snapshot requires a blob
///
/// [`ResourceLocator::parse`] and [`ResourceLocator::to_url`] round-trip:
/// for any valid locator `x`, `parse(&x.to_url())` equals `x` field-wise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    scheme: Scheme,
    authority: Authority,
    container: Option<String>,
    blob: Option<String>,
    snapshot: Option<String>,
    /// Key-sorted so URL serialization is deterministic.
    query: Vec<(String, String)>,
}

impl ResourceLocator {
    /// Parse a URL into a locator.
    ///
    /// The first path segment becomes the container, the remaining segments
    /// join into the blob name (blob names may contain `/`). A `snapshot`
    /// query parameter is lifted into the snapshot field; all other query
    /// parameters are kept as signed query parameters.
    ///
    /// Fails with a malformed-url error when the scheme or host is absent,
    /// or when a `snapshot` parameter appears without a blob path.
    pub fn parse(url: &str) -> Result<Self> {
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::url_malformed("failed to parse url").with_source(e))?;
        let parts = uri.into_parts();

        let scheme = parts
            .scheme
            .ok_or_else(|| Error::url_malformed("url has no scheme"))?;
        let authority = parts
            .authority
            .ok_or_else(|| Error::url_malformed("url has no host"))?;

        let (path, raw_query) = match &parts.path_and_query {
            Some(paq) => (paq.path(), paq.query()),
            None => ("/", None),
        };

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let container = segments.next().map(decode_segment).transpose()?;
        let rest = segments.map(decode_segment).collect::<Result<Vec<_>>>()?;
        let blob = if rest.is_empty() {
            None
        } else {
            Some(rest.join("/"))
        };

        let mut snapshot = None;
        let mut query = Vec::new();
        if let Some(q) = raw_query {
            for (k, v) in form_urlencoded::parse(q.as_bytes()) {
                if k == "snapshot" {
                    snapshot = Some(v.into_owned());
                } else {
                    query.push((k.into_owned(), v.into_owned()));
                }
            }
        }
        if snapshot.is_some() && blob.is_none() {
            return Err(Error::url_malformed(
                "snapshot query parameter requires a blob path",
            ));
        }
        query.sort();

        Ok(Self {
            scheme,
            authority,
            container,
            blob,
            snapshot,
            query,
        })
    }

    /// Return a locator addressing `container` under the same endpoint.
    ///
    /// Blob, snapshot and signed query parameters of `self` are dropped:
    /// they named a resource inside the previous container.
    pub fn with_container(self, container: impl Into<String>) -> Self {
        Self {
            container: Some(container.into()),
            blob: None,
            snapshot: None,
            query: Vec::new(),
            ..self
        }
    }

    /// Return a locator addressing `blob` inside the current container.
    ///
    /// Fails when no container is set, or when the blob name is empty or
    /// contains an empty segment (`a//b`, a leading or trailing `/`): such a
    /// name would not survive URL serialization.
    pub fn with_blob(self, blob: impl Into<String>) -> Result<Self> {
        if self.container.is_none() {
            return Err(Error::url_malformed("blob requires a container"));
        }
        let blob = blob.into();
        if blob.split('/').any(str::is_empty) {
            return Err(Error::url_malformed(
                "blob name must not be empty or contain empty segments",
            ));
        }
        Ok(Self {
            blob: Some(blob),
            snapshot: None,
            ..self
        })
    }

    /// Return a locator addressing a snapshot of the current blob.
    ///
    /// Fails when no blob is set.
    pub fn with_snapshot(self, snapshot: impl Into<String>) -> Result<Self> {
        if self.blob.is_none() {
            return Err(Error::url_malformed("snapshot requires a blob"));
        }
        Ok(Self {
            snapshot: Some(snapshot.into()),
            ..self
        })
    }

    /// Return a locator carrying the given signed query parameters.
    ///
    /// Replaces any parameters already attached.
    pub fn with_signed_query(self, params: SignedQueryParameters) -> Self {
        let mut query = params.into_pairs();
        query.sort();
        Self { query, ..self }
    }

    /// The URL scheme.
    pub fn scheme(&self) -> &str {
        self.scheme.as_str()
    }

    /// The host (authority) component.
    pub fn host(&self) -> &str {
        self.authority.as_str()
    }

    /// The container name, if any.
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// The blob name, if any.
    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }

    /// The snapshot timestamp, if any.
    pub fn snapshot(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    /// The attached signed query parameters, key-sorted.
    pub fn signed_query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Serialize back into a URL string.
    ///
    /// Path segments and query values are percent-encoded here, exactly
    /// once; query keys (including `snapshot`) are emitted in sorted order
    /// so the output is reproducible.
    pub fn to_url(&self) -> String {
        let mut s = format!("{}://{}", self.scheme, self.authority);

        if let Some(container) = &self.container {
            s.push('/');
            s.push_str(&encode_segment(container));
        }
        if let Some(blob) = &self.blob {
            for segment in blob.split('/') {
                s.push('/');
                s.push_str(&encode_segment(segment));
            }
        }

        let mut pairs: Vec<(&str, &str)> = self
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(snapshot) = &self.snapshot {
            pairs.push(("snapshot", snapshot));
        }
        pairs.sort();

        if !pairs.is_empty() {
            s.push('?');
            for (idx, (k, v)) in pairs.iter().enumerate() {
                if idx != 0 {
                    s.push('&');
                }
                s.push_str(&percent_encode(k.as_bytes(), &QUERY_ENCODE_SET).to_string());
                if !v.is_empty() {
                    s.push('=');
                    s.push_str(&percent_encode(v.as_bytes(), &QUERY_ENCODE_SET).to_string());
                }
            }
        }

        s
    }
}

fn decode_segment(segment: &str) -> Result<String> {
    percent_encoding::percent_decode_str(segment)
        .decode_utf8()
        .map(|v| v.into_owned())
        .map_err(|e| Error::url_malformed("path segment is not valid utf-8").with_source(e))
}

fn encode_segment(segment: &str) -> String {
    percent_encode(segment.as_bytes(), &QUERY_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_account_url() {
        let locator = ResourceLocator::parse("https://acct.blob.example.com").unwrap();
        assert_eq!(locator.scheme(), "https");
        assert_eq!(locator.host(), "acct.blob.example.com");
        assert_eq!(locator.container(), None);
        assert_eq!(locator.blob(), None);
        assert_eq!(locator.to_url(), "https://acct.blob.example.com");
    }

    #[test]
    fn test_parse_blob_url() {
        let locator =
            ResourceLocator::parse("https://acct.blob.example.com/images/2024/cat.png").unwrap();
        assert_eq!(locator.container(), Some("images"));
        assert_eq!(locator.blob(), Some("2024/cat.png"));
    }

    #[test]
    fn test_parse_snapshot_url() {
        let locator = ResourceLocator::parse(
            "https://acct.blob.example.com/c/b?snapshot=2022-03-01T08%3A12%3A34Z",
        )
        .unwrap();
        assert_eq!(locator.snapshot(), Some("2022-03-01T08:12:34Z"));
        assert!(locator.signed_query().is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_scheme_or_host() {
        let err = ResourceLocator::parse("/c/b").unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::UrlMalformed);

        // `Uri` treats a bare name as a path, leaving no authority.
        let err = ResourceLocator::parse("acct.blob.example.com/c/b").unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::UrlMalformed);
    }

    #[test]
    fn test_parse_rejects_snapshot_without_blob() {
        let err = ResourceLocator::parse("https://acct.blob.example.com/c?snapshot=2022")
            .unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::UrlMalformed);
    }

    #[test]
    fn test_blob_requires_container() {
        let locator = ResourceLocator::parse("https://acct.blob.example.com").unwrap();
        let err = locator.with_blob("b").unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::UrlMalformed);
    }

    #[test]
    fn test_blob_rejects_empty_segments() {
        let base = || {
            ResourceLocator::parse("https://acct.blob.example.com")
                .unwrap()
                .with_container("c")
        };

        // Each of these would serialize to a URL whose empty segments parse
        // away again, breaking the parse/to_url round trip.
        for name in ["", "a//b", "/a", "a/"] {
            let err = base().with_blob(name).unwrap_err();
            assert_eq!(
                err.kind(),
                blobsign_core::ErrorKind::UrlMalformed,
                "failed on: {name:?}"
            );
        }

        assert!(base().with_blob("a/b").is_ok());
    }

    #[test]
    fn test_snapshot_requires_blob() {
        let locator = ResourceLocator::parse("https://acct.blob.example.com")
            .unwrap()
            .with_container("c");
        let err = locator.with_snapshot("2022-03-01T08:12:34Z").unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::UrlMalformed);
    }

    #[test]
    fn test_with_container_drops_blob_scope() {
        let locator = ResourceLocator::parse("https://acct.blob.example.com/c/b").unwrap();
        let other = locator.with_container("d");
        assert_eq!(other.container(), Some("d"));
        assert_eq!(other.blob(), None);
        assert_eq!(other.to_url(), "https://acct.blob.example.com/d");
    }

    #[test]
    fn test_to_url_sorts_and_encodes_query() {
        let locator = ResourceLocator::parse(
            "https://acct.blob.example.com/c/b?sv=2018-11-09&sig=ab%2Fcd%3D&se=2022-03-01T08%3A17%3A34Z",
        )
        .unwrap();
        assert_eq!(
            locator.to_url(),
            "https://acct.blob.example.com/c/b?se=2022-03-01T08%3A17%3A34Z&sig=ab%2Fcd%3D&sv=2018-11-09"
        );
    }

    #[test]
    fn test_round_trip() {
        let cases = vec![
            "https://acct.blob.example.com",
            "https://acct.blob.example.com/c",
            "https://acct.blob.example.com/c/b",
            "https://acct.blob.example.com/c/nested/path/blob.bin",
            "https://acct.blob.example.com/c/b?snapshot=2022-03-01T08%3A12%3A34Z",
            "http://127.0.0.1:10000/devstoreaccount1/c/b?sig=ab%2Bcd&sv=2018-11-09",
        ];

        for case in cases {
            let locator = ResourceLocator::parse(case).unwrap();
            let round_tripped = ResourceLocator::parse(&locator.to_url()).unwrap();
            assert_eq!(locator, round_tripped, "failed on: {case}");
        }
    }

    #[test]
    fn test_compose_service_sas_url() {
        use crate::sas::{SasProtocol, ServiceSas};

        let token = ServiceSas::new(
            "account",
            "a2V5",
            "c",
            blobsign_core::time::parse_rfc3339("2022-03-01T08:17:34Z").unwrap(),
        )
        .with_blob("b")
        .with_protocol(SasProtocol::Https)
        .token()
        .unwrap();

        let locator = ResourceLocator::parse("https://account.blob.example.com")
            .unwrap()
            .with_container("c")
            .with_blob("b")
            .unwrap()
            .with_signed_query(token);

        // Keys sorted, values encoded exactly once, pinned signature.
        assert_eq!(
            locator.to_url(),
            "https://account.blob.example.com/c/b?se=2022-03-01T08%3A17%3A34Z&sig=ARV5k8JWsWpsF5LCSQdnZy2xYhrrSi2TD4e%2BiaKycGc%3D&sp=r&spr=https&sr=b&sv=2018-11-09"
        );

        // And the composed URL still parses back to the same locator.
        assert_eq!(ResourceLocator::parse(&locator.to_url()).unwrap(), locator);
    }

    #[test]
    fn test_round_trip_after_construction() {
        let locator = ResourceLocator::parse("https://acct.blob.example.com")
            .unwrap()
            .with_container("c")
            .with_blob("dir/data blob.bin")
            .unwrap()
            .with_snapshot("2022-03-01T08:12:34Z")
            .unwrap();

        let reparsed = ResourceLocator::parse(&locator.to_url()).unwrap();
        assert_eq!(locator, reparsed);
        assert_eq!(reparsed.blob(), Some("dir/data blob.bin"));
    }
}
