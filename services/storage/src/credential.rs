use std::fmt::Debug;
use std::fmt::Formatter;

use blobsign_core::utils::Redact;

/// Credential used to authorize storage requests.
///
/// Credentials are immutable once built and cheap to clone, so a single
/// value can be shared by any number of concurrent signing operations.
#[derive(Clone)]
pub enum Credential {
    /// Storage account name plus its base64-encoded account key.
    SharedKey {
        /// Storage account name, part of the canonicalized resource path.
        account_name: String,
        /// Base64-encoded signing secret.
        account_key: String,
    },
    /// Pre-minted shared access signature token, stored without a leading
    /// `?`. Signing appends it to the URL query instead of computing an
    /// `Authorization` header.
    SasToken {
        /// The token query string, e.g. `sv=...&ss=...&sig=...`.
        token: String,
    },
    /// No credential. Requests pass through unsigned, which only works
    /// against resources with public access.
    Anonymous,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => f
                .debug_struct("SharedKey")
                .field("account_name", account_name)
                .field("account_key", &Redact::from(account_key))
                .finish(),
            Credential::SasToken { token } => f
                .debug_struct("SasToken")
                .field("token", &Redact::from(token))
                .finish(),
            Credential::Anonymous => f.write_str("Anonymous"),
        }
    }
}

impl Credential {
    /// Create a shared key credential.
    pub fn with_shared_key(
        account_name: impl Into<String>,
        account_key: impl Into<String>,
    ) -> Self {
        Self::SharedKey {
            account_name: account_name.into(),
            account_key: account_key.into(),
        }
    }

    /// Create a shared access signature credential from a pre-minted token.
    ///
    /// A leading `?` is stripped, so both bare tokens and tokens copied from
    /// a presigned URL work.
    pub fn with_sas_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self::SasToken {
            token: token
                .strip_prefix('?')
                .map(str::to_string)
                .unwrap_or(token),
        }
    }

    /// Check if the credential carries everything its variant needs.
    pub fn is_valid(&self) -> bool {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => !account_name.is_empty() && !account_key.is_empty(),
            Credential::SasToken { token } => !token.is_empty(),
            Credential::Anonymous => true,
        }
    }
}
