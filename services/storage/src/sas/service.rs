use log::debug;

use blobsign_core::hash;
use blobsign_core::time::format_rfc3339;
use blobsign_core::time::DateTime;
use blobsign_core::Error;
use blobsign_core::Result;

use super::BlobSasPermissions;
use super::SasProtocol;
use super::SignedQueryParameters;
use super::SAS_VERSION;

/// A service-level shared access signature descriptor.
///
/// Grants access to one container, or to one blob when
/// [`ServiceSas::with_blob`] is set. Defaults to read-only.
pub struct ServiceSas {
    account: String,
    key: String,
    container: String,
    blob: Option<String>,
    permissions: BlobSasPermissions,
    expiry: DateTime,
    start: Option<DateTime>,
    ip: Option<String>,
    protocol: Option<SasProtocol>,
}

impl ServiceSas {
    /// Create a read-only container-scoped descriptor expiring at `expiry`.
    pub fn new(
        account: impl Into<String>,
        key: impl Into<String>,
        container: impl Into<String>,
        expiry: DateTime,
    ) -> Self {
        Self {
            account: account.into(),
            key: key.into(),
            container: container.into(),
            blob: None,
            permissions: BlobSasPermissions::READ,
            expiry,
            start: None,
            ip: None,
            protocol: None,
        }
    }

    /// Narrow the scope to a single blob inside the container.
    pub fn with_blob(mut self, blob: impl Into<String>) -> Self {
        self.blob = Some(blob.into());
        self
    }

    /// Replace the granted permissions.
    pub fn with_permissions(mut self, permissions: BlobSasPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Delay validity until `start`.
    pub fn with_start(mut self, start: DateTime) -> Self {
        self.start = Some(start);
        self
    }

    /// Restrict the token to requests from `ip` (an address or range).
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Restrict the token to the given protocol.
    pub fn with_protocol(mut self, protocol: SasProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.container.is_empty() {
            return Err(Error::descriptor_invalid("container name is empty"));
        }
        if self.permissions.is_empty() {
            return Err(Error::descriptor_invalid("permission set is empty"));
        }
        if let Some(start) = self.start {
            if start >= self.expiry {
                return Err(Error::descriptor_invalid(
                    "start time does not precede expiry",
                ));
            }
        }
        Ok(())
    }

    /// `b` when a blob is scoped, `c` for the whole container.
    fn resource(&self) -> &'static str {
        if self.blob.is_some() {
            "b"
        } else {
            "c"
        }
    }

    /// `/blob/{account}/{container}[/{blob}]`.
    fn canonicalized_resource(&self) -> String {
        match &self.blob {
            Some(blob) => format!("/blob/{}/{}/{}", self.account, self.container, blob),
            None => format!("/blob/{}/{}", self.account, self.container),
        }
    }

    /// The fixed-order signing input for the service scope. Note the order
    /// differs from the account scope; the blank line is the stored access
    /// policy identifier, which this generator does not model.
    ///
    /// ```text
    /// permissions \n start \n expiry \n canonicalized-resource \n
    /// identifier \n ip \n protocol \n version \n resource
    /// ```
    fn string_to_sign(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n\n{}\n{}\n{}\n{}",
            self.permissions.canonical(),
            self.start.map_or(String::new(), format_rfc3339),
            format_rfc3339(self.expiry),
            self.canonicalized_resource(),
            self.ip.clone().unwrap_or_default(),
            self.protocol.map_or(String::new(), |v| v.to_string()),
            SAS_VERSION,
            self.resource(),
        )
    }

    fn signature(&self) -> Result<String> {
        let string_to_sign = self.string_to_sign();
        debug!("service sas string to sign: {}", &string_to_sign);

        let key = hash::base64_decode(&self.key)
            .map_err(|e| Error::key_invalid("account key is not valid base64").with_source(e))?;

        Ok(hash::base64_hmac_sha256(&key, string_to_sign.as_bytes()))
    }

    /// Validate the descriptor and produce the signed query parameters.
    pub fn token(&self) -> Result<SignedQueryParameters> {
        self.validate()?;

        let mut params = SignedQueryParameters::new();
        params.push("sv", SAS_VERSION);
        params.push("sr", self.resource());
        params.push("sp", self.permissions.canonical());
        params.push("se", format_rfc3339(self.expiry));
        if let Some(start) = self.start {
            params.push("st", format_rfc3339(start));
        }
        if let Some(ip) = &self.ip {
            params.push("sip", ip.clone());
        }
        if let Some(protocol) = self.protocol {
            params.push("spr", protocol.to_string());
        }
        params.push("sig", self.signature()?);

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobsign_core::time::parse_rfc3339;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blob_token_pinned() {
        let sas = ServiceSas::new(
            "account",
            "a2V5",
            "c",
            parse_rfc3339("2022-03-01T08:17:34Z").unwrap(),
        )
        .with_blob("b")
        .with_protocol(SasProtocol::Https);

        let pairs = sas.token().unwrap().into_pairs();
        assert_eq!(
            pairs,
            vec![
                ("sv".to_string(), "2018-11-09".to_string()),
                ("sr".to_string(), "b".to_string()),
                ("sp".to_string(), "r".to_string()),
                ("se".to_string(), "2022-03-01T08:17:34Z".to_string()),
                ("spr".to_string(), "https".to_string()),
                (
                    "sig".to_string(),
                    "ARV5k8JWsWpsF5LCSQdnZy2xYhrrSi2TD4e+iaKycGc=".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_container_scope_resource_token() {
        let sas = ServiceSas::new(
            "account",
            "a2V5",
            "c",
            parse_rfc3339("2022-03-01T08:17:34Z").unwrap(),
        )
        .with_permissions(BlobSasPermissions::READ | BlobSasPermissions::LIST);

        let pairs = sas.token().unwrap().into_pairs();
        assert!(pairs.contains(&("sr".to_string(), "c".to_string())));
        assert!(pairs.contains(&("sp".to_string(), "rl".to_string())));
    }

    #[test]
    fn test_empty_container_rejected() {
        let err = ServiceSas::new(
            "account",
            "a2V5",
            "",
            parse_rfc3339("2022-03-01T08:17:34Z").unwrap(),
        )
        .token()
        .unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::DescriptorInvalid);
    }

    #[test]
    fn test_empty_permissions_rejected() {
        let err = ServiceSas::new(
            "account",
            "a2V5",
            "c",
            parse_rfc3339("2022-03-01T08:17:34Z").unwrap(),
        )
        .with_permissions(BlobSasPermissions::empty())
        .token()
        .unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::DescriptorInvalid);
    }

    #[test]
    fn test_determinism() {
        let build = || {
            ServiceSas::new(
                "account",
                "a2V5",
                "c",
                parse_rfc3339("2022-03-01T08:17:34Z").unwrap(),
            )
            .with_blob("b")
            .with_protocol(SasProtocol::Https)
            .token()
            .unwrap()
        };
        assert_eq!(build(), build());
    }
}
