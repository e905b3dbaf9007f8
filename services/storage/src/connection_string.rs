use std::collections::HashMap;

use blobsign_core::Error;
use blobsign_core::Result;

use crate::Config;

/// Parses a storage connection string into a [`Config`].
///
/// Supports the blob endpoint fields plus the `UseDevelopmentStorage=true`
/// shortcut used by local storage emulators.
pub(crate) fn parse(conn_str: &str) -> Result<Config> {
    let key_values = parse_into_key_values(conn_str)?;

    if let Some(config) = collect_development_config(&key_values) {
        return Ok(config);
    }

    Ok(Config {
        account_name: key_values.get("AccountName").cloned(),
        account_key: key_values.get("AccountKey").cloned(),
        sas_token: key_values.get("SharedAccessSignature").cloned(),
        endpoint: collect_endpoint(&key_values),
    })
}

fn parse_into_key_values(conn_str: &str) -> Result<HashMap<String, String>> {
    conn_str
        .trim()
        .replace('\n', "")
        .split(';')
        .filter(|field| !field.is_empty())
        .map(|field| {
            let (key, value) = field.trim().split_once('=').ok_or_else(|| {
                Error::config_invalid(format!(
                    "invalid connection string, expected '=' in field: {field}"
                ))
            })?;
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Emulator (Azurite style) development storage defaults.
fn collect_development_config(key_values: &HashMap<String, String>) -> Option<Config> {
    const DEFAULT_DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
    const DEFAULT_DEV_ACCOUNT_KEY: &str =
        "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
    const DEFAULT_DEV_BLOB_URI: &str = "http://127.0.0.1:10000";

    if key_values.get("UseDevelopmentStorage").map(String::as_str) != Some("true") {
        return None;
    }

    let account_name = key_values
        .get("AccountName")
        .cloned()
        .unwrap_or_else(|| DEFAULT_DEV_ACCOUNT_NAME.to_string());
    let account_key = key_values
        .get("AccountKey")
        .cloned()
        .unwrap_or_else(|| DEFAULT_DEV_ACCOUNT_KEY.to_string());
    let proxy_uri = key_values
        .get("DevelopmentStorageProxyUri")
        .cloned()
        .unwrap_or_else(|| DEFAULT_DEV_BLOB_URI.to_string());

    Some(Config {
        endpoint: Some(format!("{proxy_uri}/{account_name}")),
        account_name: Some(account_name),
        account_key: Some(account_key),
        sas_token: None,
    })
}

/// An explicit `BlobEndpoint` wins; otherwise the endpoint is assembled from
/// `DefaultEndpointsProtocol`, `AccountName` and `EndpointSuffix` when all
/// three are present. Endpoint fields are optional either way, since the
/// caller may supply one later.
fn collect_endpoint(key_values: &HashMap<String, String>) -> Option<String> {
    if let Some(endpoint) = key_values.get("BlobEndpoint") {
        return Some(endpoint.clone());
    }

    match (
        key_values.get("DefaultEndpointsProtocol"),
        key_values.get("AccountName"),
        key_values.get("EndpointSuffix"),
    ) {
        (Some(protocol), Some(account), Some(suffix)) => {
            Some(format!("{protocol}://{account}.blob.{suffix}"))
        }
        _ => None,
    }
}
