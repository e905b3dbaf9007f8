use std::collections::HashMap;
use std::env;

use blobsign_core::Result;

use crate::connection_string;
use crate::Credential;

/// Config carries everything needed to address and sign requests against a
/// storage account.
#[derive(Clone, Default)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`BLOBSIGN_ACCOUNT_NAME`]
    /// - connection string: `AccountName`
    pub account_name: Option<String>,
    /// `account_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`BLOBSIGN_ACCOUNT_KEY`]
    /// - connection string: `AccountKey`
    pub account_key: Option<String>,
    /// `sas_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`BLOBSIGN_SAS_TOKEN`]
    /// - connection string: `SharedAccessSignature`
    pub sas_token: Option<String>,
    /// `endpoint` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`BLOBSIGN_ENDPOINT`]
    /// - connection string: `BlobEndpoint`, or assembled from
    ///   `DefaultEndpointsProtocol`/`AccountName`/`EndpointSuffix`
    pub endpoint: Option<String>,
}

/// Env key for the account name.
pub const BLOBSIGN_ACCOUNT_NAME: &str = "BLOBSIGN_ACCOUNT_NAME";
/// Env key for the base64 account key.
pub const BLOBSIGN_ACCOUNT_KEY: &str = "BLOBSIGN_ACCOUNT_KEY";
/// Env key for a pre-minted SAS token.
pub const BLOBSIGN_SAS_TOKEN: &str = "BLOBSIGN_SAS_TOKEN";
/// Env key for the endpoint URL.
pub const BLOBSIGN_ENDPOINT: &str = "BLOBSIGN_ENDPOINT";

impl Config {
    /// Load config values from the environment, filling fields not already
    /// set explicitly.
    pub fn from_env(mut self) -> Self {
        let envs = env::vars().collect::<HashMap<_, _>>();

        if self.account_name.is_none() {
            self.account_name = envs.get(BLOBSIGN_ACCOUNT_NAME).cloned();
        }
        if self.account_key.is_none() {
            self.account_key = envs.get(BLOBSIGN_ACCOUNT_KEY).cloned();
        }
        if self.sas_token.is_none() {
            self.sas_token = envs.get(BLOBSIGN_SAS_TOKEN).cloned();
        }
        if self.endpoint.is_none() {
            self.endpoint = envs.get(BLOBSIGN_ENDPOINT).cloned();
        }

        self
    }

    /// Parse a storage connection string into a configuration.
    ///
    /// The connection string doesn't have to specify all parameters; the
    /// caller can still set missing ones directly on the result. An example
    /// looks like:
    ///
    /// ```txt
    /// DefaultEndpointsProtocol=https;
    /// AccountName=acct;
    /// AccountKey=MDEyMzQ1Njc4OWFiY2RlZg==;
    /// EndpointSuffix=blob.example.com
    /// ```
    pub fn try_from_connection_string(conn_str: &str) -> Result<Self> {
        connection_string::parse(conn_str)
    }

    /// Resolve the credential this configuration describes.
    ///
    /// A SAS token takes priority over a shared key: holding a token is a
    /// deliberate choice to delegate instead of signing with the account
    /// key. Fields that are present but empty count as absent, so the
    /// fallthrough is anonymous.
    pub fn credential(&self) -> Credential {
        if let Some(token) = &self.sas_token {
            let cred = Credential::with_sas_token(token);
            if cred.is_valid() {
                return cred;
            }
        }
        if let (Some(name), Some(key)) = (&self.account_name, &self.account_key) {
            let cred = Credential::with_shared_key(name, key);
            if cred.is_valid() {
                return cred;
            }
        }
        Credential::Anonymous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_fields_win_over_env() {
        let config = Config {
            account_name: Some("explicit".to_string()),
            ..Default::default()
        }
        .from_env();
        assert_eq!(config.account_name.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_credential_resolution() {
        let config = Config {
            account_name: Some("acct".to_string()),
            account_key: Some("a2V5".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.credential(),
            Credential::SharedKey { .. }
        ));

        let config = Config::default();
        assert!(matches!(config.credential(), Credential::Anonymous));
    }

    #[test]
    fn test_sas_token_wins_over_shared_key() {
        let config = Config {
            account_name: Some("acct".to_string()),
            account_key: Some("a2V5".to_string()),
            sas_token: Some("sv=2018-11-09&sig=abc".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.credential(),
            Credential::SasToken { token } if token == "sv=2018-11-09&sig=abc"
        ));
    }

    #[test]
    fn test_empty_fields_resolve_to_anonymous() {
        let config = Config {
            account_name: Some("acct".to_string()),
            account_key: Some(String::new()),
            sas_token: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(config.credential(), Credential::Anonymous));
    }
}
