use http::header::HeaderName;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

// Headers used by the storage wire contract.
pub const X_MS_DATE: HeaderName = HeaderName::from_static("x-ms-date");
pub const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

/// Characters percent-encoded in query values.
///
/// Everything outside RFC 3986 unreserved is encoded, so values are stored
/// raw and encoded exactly once at URL composition.
pub const QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
