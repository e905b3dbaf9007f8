use log::debug;

use blobsign_core::hash;
use blobsign_core::time::format_rfc3339;
use blobsign_core::time::DateTime;
use blobsign_core::Error;
use blobsign_core::Result;

use super::AccountSasPermissions;
use super::ResourceTypes;
use super::SasProtocol;
use super::Services;
use super::SignedQueryParameters;
use super::SAS_VERSION;

/// An account-level shared access signature descriptor.
///
/// Grants access across storage services and resource types. The default
/// grant covers every service (`bqtf`), every resource type (`sco`) and the
/// broad `rwdlacu` permission set; narrow it with the `with_*` methods.
pub struct AccountSas {
    account: String,
    key: String,
    services: Services,
    resource_types: ResourceTypes,
    permissions: AccountSasPermissions,
    expiry: DateTime,
    start: Option<DateTime>,
    ip: Option<String>,
    protocol: Option<SasProtocol>,
}

impl AccountSas {
    /// Create a descriptor with default grants expiring at `expiry`.
    pub fn new(account: impl Into<String>, key: impl Into<String>, expiry: DateTime) -> Self {
        Self {
            account: account.into(),
            key: key.into(),
            expiry,
            start: None,
            ip: None,
            protocol: None,
            services: Services::BLOB | Services::QUEUE | Services::TABLE | Services::FILE,
            resource_types: ResourceTypes::SERVICE | ResourceTypes::CONTAINER | ResourceTypes::OBJECT,
            permissions: AccountSasPermissions::READ
                | AccountSasPermissions::WRITE
                | AccountSasPermissions::DELETE
                | AccountSasPermissions::LIST
                | AccountSasPermissions::ADD
                | AccountSasPermissions::CREATE
                | AccountSasPermissions::UPDATE,
        }
    }

    /// Restrict the granted permissions.
    pub fn with_permissions(mut self, permissions: AccountSasPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Restrict the services the token applies to.
    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    /// Restrict the resource types the token applies to.
    pub fn with_resource_types(mut self, resource_types: ResourceTypes) -> Self {
        self.resource_types = resource_types;
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
        if self.permissions.is_empty() {
            return Err(Error::descriptor_invalid("permission set is empty"));
        }
        if self.services.is_empty() {
            return Err(Error::descriptor_invalid("service set is empty"));
        }
        if self.resource_types.is_empty() {
            return Err(Error::descriptor_invalid("resource type set is empty"));
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

    /// The fixed-order signing input for the account scope.
    ///
    /// ```text
    /// account \n permissions \n services \n resource-types \n
    /// start \n expiry \n ip \n protocol \n version \n
    /// ```
    fn string_to_sign(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n",
            self.account,
            self.permissions.canonical(),
            self.services.canonical(),
            self.resource_types.canonical(),
            self.start.map_or(String::new(), format_rfc3339),
            format_rfc3339(self.expiry),
            self.ip.clone().unwrap_or_default(),
            self.protocol.map_or(String::new(), |v| v.to_string()),
            SAS_VERSION,
        )
    }

    fn signature(&self) -> Result<String> {
        let string_to_sign = self.string_to_sign();
        debug!("account sas string to sign: {}", &string_to_sign);

        let key = hash::base64_decode(&self.key)
            .map_err(|e| Error::key_invalid("account key is not valid base64").with_source(e))?;

        Ok(hash::base64_hmac_sha256(&key, string_to_sign.as_bytes()))
    }

    /// Validate the descriptor and produce the signed query parameters.
    pub fn token(&self) -> Result<SignedQueryParameters> {
        self.validate()?;

        let mut params = SignedQueryParameters::new();
        params.push("sv", SAS_VERSION);
        params.push("ss", self.services.canonical());
        params.push("srt", self.resource_types.canonical());
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

    fn query_string(params: SignedQueryParameters) -> String {
        params
            .into_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    #[test]
    fn test_default_token_pinned() {
        let expiry = parse_rfc3339("2022-03-01T08:17:34Z").unwrap();
        let sas = AccountSas::new("account", hash::base64_encode(b"key"), expiry);

        assert_eq!(
            query_string(sas.token().unwrap()),
            "sv=2018-11-09&ss=bqtf&srt=sco&sp=rwdlacu&se=2022-03-01T08:17:34Z&sig=jgK9nDUT0ntH/p28LPs0jzwxsk91W6hePLPlfrElv4k="
        );
    }

    #[test]
    fn test_narrowed_token_pinned() {
        let sas = AccountSas::new(
            "account",
            "a2V5",
            parse_rfc3339("2022-03-01T08:17:34Z").unwrap(),
        )
        .with_start(parse_rfc3339("2022-03-01T08:12:34Z").unwrap())
        .with_services(Services::BLOB)
        .with_resource_types(ResourceTypes::CONTAINER | ResourceTypes::OBJECT)
        .with_permissions(AccountSasPermissions::READ | AccountSasPermissions::LIST);

        assert_eq!(
            query_string(sas.token().unwrap()),
            "sv=2018-11-09&ss=b&srt=co&sp=rl&se=2022-03-01T08:17:34Z&st=2022-03-01T08:12:34Z&sig=2PzfGYFS3P1oZmLJ26PigUDnFZEYcqKUXTofVqyP6KE="
        );
    }

    #[test]
    fn test_token_is_permission_order_independent() {
        let expiry = parse_rfc3339("2022-03-01T08:17:34Z").unwrap();
        let a = AccountSas::new("account", "a2V5", expiry)
            .with_permissions(AccountSasPermissions::WRITE | AccountSasPermissions::READ);
        let b = AccountSas::new("account", "a2V5", expiry)
            .with_permissions(AccountSasPermissions::READ | AccountSasPermissions::WRITE);

        assert_eq!(a.token().unwrap(), b.token().unwrap());
    }

    #[test]
    fn test_empty_permissions_rejected() {
        let expiry = parse_rfc3339("2022-03-01T08:17:34Z").unwrap();
        let err = AccountSas::new("account", "a2V5", expiry)
            .with_permissions(AccountSasPermissions::empty())
            .token()
            .unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::DescriptorInvalid);
    }

    #[test]
    fn test_start_after_expiry_rejected() {
        let err = AccountSas::new(
            "account",
            "a2V5",
            parse_rfc3339("2022-03-01T08:17:34Z").unwrap(),
        )
        .with_start(parse_rfc3339("2022-03-01T09:00:00Z").unwrap())
        .token()
        .unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::DescriptorInvalid);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let err = AccountSas::new(
            "account",
            "not a base64 key!",
            parse_rfc3339("2022-03-01T08:17:34Z").unwrap(),
        )
        .token()
        .unwrap_err();
        assert_eq!(err.kind(), blobsign_core::ErrorKind::KeyInvalid);
    }
}
