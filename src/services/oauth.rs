//! OAuth 1.0a request signing (HMAC-SHA1, user context)
//!
//! Only query parameters and the `oauth_*` parameters are signed. Multipart and
//! JSON bodies are not part of the signature base string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha1::Sha1;
use url::Url;

use crate::config::TwitterCredentials;
use crate::error::{ArtbotError, Result};

type HmacSha1 = Hmac<Sha1>;

const NONCE_LEN: usize = 32;

/// Signs requests on behalf of one account
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    credentials: TwitterCredentials,
}

impl OAuthSigner {
    pub fn new(credentials: TwitterCredentials) -> Self {
        Self { credentials }
    }

    /// `Authorization` header value for a request with a fresh nonce and timestamp
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_header_with(method, url, params, &nonce, timestamp)
    }

    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String> {
        let timestamp = timestamp.to_string();
        let oauth_params = [
            ("oauth_consumer_key", self.credentials.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.credentials.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let mut signed: Vec<(&str, &str)> = oauth_params.to_vec();
        signed.extend_from_slice(params);
        let base = signature_base_string(method, url, &signed)?;
        let signature = self.sign(&base)?;

        let mut header_params: Vec<(&str, &str)> = oauth_params.to_vec();
        header_params.push(("oauth_signature", signature.as_str()));
        header_params.sort();

        let fields = header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {fields}"))
    }

    fn sign(&self, base: &str) -> Result<String> {
        let key = format!(
            "{}&{}",
            encode(&self.credentials.consumer_secret),
            encode(&self.credentials.access_token_secret)
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| ArtbotError::Signing(e.to_string()))?;
        mac.update(base.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// `METHOD&enc(base url)&enc(sorted params)`; query parameters in `url` are signed too
pub fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|e| ArtbotError::Signing(format!("{url}: {e}")))?;

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .collect();
    pairs.extend(params.iter().map(|(k, v)| (encode(k), encode(v))));
    pairs.sort();

    parsed.set_query(None);
    parsed.set_fragment(None);

    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(parsed.as_str()),
        encode(&param_string)
    ))
}

/// RFC 3986 percent-encoding: everything but `A-Z a-z 0-9 - . _ ~`
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
