use alloy::{
    hex,
    primitives::{Address, Bytes},
    signers::{local::PrivateKeySigner, Signer},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signer as _, SigningKey};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::{
    constants::{BIND_SOLANA_PATH, CLAIM_AIRDROP_PATH},
    errors::ApiError,
    proxy::ProxyEndpoint,
};

const SUCCESS_CODE: i64 = 200;

/// Server-attested claim parameters for one wallet.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub address: Address,
    /// Whole tokens as a decimal string, e.g. `"1234.5"`.
    #[serde(deserialize_with = "string_or_number")]
    pub amount: String,
    #[serde(deserialize_with = "deadline_from_string_or_number")]
    pub deadline: u64,
    pub sign: Bytes,
}

/// Response envelope. `data` stays untyped until the envelope reports success.
#[derive(Deserialize, Debug)]
pub struct ApiResponse {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AirdropRequest<'a> {
    address: String,
    sign_str: &'a str,
    sol_address: &'a str,
    sol_sign_str: &'a str,
}

#[derive(Clone)]
pub struct RequestParams<'a, S: Serialize> {
    pub url: &'a str,
    pub method: Method,
    pub body: Option<S>,
}

/// Sends the request and returns the status with the decoded envelope, if the body was one.
pub async fn send_http_request(
    request_params: &RequestParams<'_, impl Serialize>,
    headers: Option<&HeaderMap>,
    proxy: Option<&ProxyEndpoint>,
) -> reqwest::Result<(StatusCode, Option<ApiResponse>)> {
    let client = match proxy {
        Some(proxy) => Client::builder().proxy(proxy.to_reqwest()?).build()?,
        None => Client::new(),
    };

    let mut request = client.request(request_params.method.clone(), request_params.url);

    if let Some(body) = &request_params.body {
        request = request.json(&body);
    }

    if let Some(headers) = headers {
        request = request.headers(headers.clone());
    }

    let response = request
        .send()
        .await
        .inspect_err(|e| tracing::debug!("Request failed: {}", e))?;
    let status = response.status();

    let text = response
        .text()
        .await
        .inspect_err(|e| tracing::debug!("Failed to retrieve response text: {}", e))?;

    Ok((status, serde_json::from_str(&text).ok()))
}

/// Client for the airdrop backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    headers: HeaderMap,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: get_headers(),
        }
    }

    pub async fn get_allocation(
        &self,
        signer: &PrivateKeySigner,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Allocation, ApiError> {
        let sign_str = sign_address(signer).await?;
        let body = AirdropRequest {
            address: signer.address().to_string(),
            sign_str: &sign_str,
            sol_address: "",
            sol_sign_str: "",
        };

        self.post(CLAIM_AIRDROP_PATH, &body, proxy)
            .await
            .map_err(|(status, message)| ApiError::AllocationUnavailable { status, message })
    }

    /// Binds `keypair`'s Solana address to the wallet. Returns the bound address.
    pub async fn bind_solana(
        &self,
        signer: &PrivateKeySigner,
        keypair: &SigningKey,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<String, ApiError> {
        let address = signer.address().to_string();
        let sign_str = sign_address(signer).await?;
        let sol_address = solana_address(keypair);
        let sol_sign_str = sign_solana_message(keypair, &address);

        let body = AirdropRequest {
            address,
            sign_str: &sign_str,
            sol_address: &sol_address,
            sol_sign_str: &sol_sign_str,
        };

        self.post::<serde_json::Value>(BIND_SOLANA_PATH, &body, proxy)
            .await
            .map_err(|(status, message)| ApiError::BindingFailed { status, message })?;

        Ok(sol_address)
    }

    /// Succeeds only on a 2xx status carrying `code: 200` and a non-null `data`.
    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &AirdropRequest<'_>,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<T, (Option<u16>, String)> {
        let url = format!("{}{path}", self.base_url);
        let request_params = RequestParams {
            url: &url,
            method: Method::POST,
            body: Some(body),
        };

        let (status, envelope) =
            send_http_request(&request_params, Some(&self.headers), proxy)
                .await
                .map_err(|e| (e.status().map(|s| s.as_u16()), e.to_string()))?;

        match envelope {
            Some(ApiResponse {
                code: Some(SUCCESS_CODE),
                data: Some(data),
                ..
            }) if status.is_success() => serde_json::from_value(data)
                .map_err(|e| (Some(status.as_u16()), format!("malformed data: {e}"))),
            Some(envelope) => Err((
                Some(status.as_u16()),
                envelope.message.unwrap_or_else(|| "unknown error".to_string()),
            )),
            None => Err((Some(status.as_u16()), "malformed response".to_string())),
        }
    }
}

/// EIP-191 signature of the wallet's checksummed address, `0x`-prefixed hex.
pub async fn sign_address(signer: &PrivateKeySigner) -> Result<String, alloy::signers::Error> {
    let message = signer.address().to_string();
    let signature = signer.sign_message(message.as_bytes()).await?;

    Ok(hex::encode_prefixed(signature.as_bytes()))
}

pub fn solana_address(keypair: &SigningKey) -> String {
    bs58::encode(keypair.verifying_key().to_bytes()).into_string()
}

/// Detached ed25519 signature over the UTF-8 message, base64 encoded.
pub fn sign_solana_message(keypair: &SigningKey, message: &str) -> String {
    let signature = keypair.sign(message.as_bytes());
    STANDARD.encode(signature.to_bytes())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

fn deadline_from_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<u64, D::Error> {
    let raw = string_or_number(deserializer)?;
    raw.trim().parse().map_err(serde::de::Error::custom)
}

fn get_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        HeaderName::from_static("accept"),
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        HeaderName::from_static("accept-language"),
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        HeaderName::from_static("origin"),
        HeaderValue::from_static("https://jager.meme"),
    );
    headers.insert(
        HeaderName::from_static("referer"),
        HeaderValue::from_static("https://jager.meme/"),
    );
    headers.insert(
        HeaderName::from_static("user-agent"),
        HeaderValue::from_static("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36"),
    );

    headers
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use alloy::primitives::PrimitiveSignature;
    use ed25519_dalek::{Signature as Ed25519Signature, Verifier};
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    use super::*;
    use crate::wallets::tests::PRIVATE_KEY;

    fn signer() -> PrivateKeySigner {
        PrivateKeySigner::from_str(PRIVATE_KEY).unwrap()
    }

    #[tokio::test]
    async fn allocation_is_returned_on_success_envelope() {
        let server = MockServer::start_async().await;
        let signer = signer();

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(CLAIM_AIRDROP_PATH)
                    .json_body_partial(r#"{"solAddress":"","solSignStr":""}"#)
                    .body_contains(signer.address().to_string());
                then.status(200).json_body(json!({
                    "code": 200,
                    "message": "ok",
                    "data": {
                        "address": signer.address(),
                        "amount": "1234.5",
                        "deadline": 1_750_000_000u64,
                        "sign": "0xdeadbeef"
                    }
                }));
            })
            .await;

        let client = ApiClient::new(&server.base_url());
        let allocation = client.get_allocation(&signer, None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(allocation.address, signer.address());
        assert_eq!(allocation.amount, "1234.5");
        assert_eq!(allocation.deadline, 1_750_000_000);
        assert_eq!(allocation.sign, Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[tokio::test]
    async fn deadline_may_be_a_string() {
        let server = MockServer::start_async().await;
        let signer = signer();

        server
            .mock_async(|when, then| {
                when.method(POST).path(CLAIM_AIRDROP_PATH);
                then.status(200).json_body(json!({
                    "code": 200,
                    "data": {
                        "address": signer.address(),
                        "amount": 42,
                        "deadline": "1750000000",
                        "sign": "0x01"
                    }
                }));
            })
            .await;

        let allocation = ApiClient::new(&server.base_url())
            .get_allocation(&signer, None)
            .await
            .unwrap();

        assert_eq!(allocation.amount, "42");
        assert_eq!(allocation.deadline, 1_750_000_000);
    }

    #[tokio::test]
    async fn non_success_code_is_allocation_unavailable() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path(CLAIM_AIRDROP_PATH);
                then.status(200)
                    .json_body(json!({ "code": 500, "message": "address not eligible", "data": null }));
            })
            .await;

        let err = ApiClient::new(&server.base_url())
            .get_allocation(&signer(), None)
            .await
            .unwrap_err();

        match err {
            ApiError::AllocationUnavailable { status, message } => {
                assert_eq!(status, Some(200));
                assert_eq!(message, "address not eligible");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_data_is_allocation_unavailable() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path(CLAIM_AIRDROP_PATH);
                then.status(200).json_body(json!({ "code": 200, "message": "ok" }));
            })
            .await;

        let err = ApiClient::new(&server.base_url())
            .get_allocation(&signer(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::AllocationUnavailable { status: Some(200), .. }));
    }

    #[tokio::test]
    async fn server_message_survives_unexpected_data_shape() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path(CLAIM_AIRDROP_PATH);
                then.status(200).json_body(json!({
                    "code": 401,
                    "message": "signature expired",
                    "data": "retry later"
                }));
            })
            .await;

        let err = ApiClient::new(&server.base_url())
            .get_allocation(&signer(), None)
            .await
            .unwrap_err();

        match err {
            ApiError::AllocationUnavailable { status, message } => {
                assert_eq!(status, Some(200));
                assert_eq!(message, "signature expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_with_wrong_data_shape_is_allocation_unavailable() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path(CLAIM_AIRDROP_PATH);
                then.status(200)
                    .json_body(json!({ "code": 200, "message": "ok", "data": { "amount": "1" } }));
            })
            .await;

        let err = ApiClient::new(&server.base_url())
            .get_allocation(&signer(), None)
            .await
            .unwrap_err();

        match err {
            ApiError::AllocationUnavailable { status, message } => {
                assert_eq!(status, Some(200));
                assert!(message.starts_with("malformed data"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path(CLAIM_AIRDROP_PATH);
                then.status(503).body("upstream unavailable");
            })
            .await;

        let err = ApiClient::new(&server.base_url())
            .get_allocation(&signer(), None)
            .await
            .unwrap_err();

        match err {
            ApiError::AllocationUnavailable { status, message } => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "malformed response");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_has_no_status() {
        let err = ApiClient::new("http://127.0.0.1:1")
            .get_allocation(&signer(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::AllocationUnavailable { status: None, .. }));
    }

    #[tokio::test]
    async fn bind_sends_both_signatures() {
        let server = MockServer::start_async().await;
        let signer = signer();
        let keypair = SigningKey::from_bytes(&[7u8; 32]);
        let sol_address = solana_address(&keypair);
        let sol_sign_str = sign_solana_message(&keypair, &signer.address().to_string());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(BIND_SOLANA_PATH)
                    .json_body_partial(
                        json!({ "solAddress": sol_address, "solSignStr": sol_sign_str }).to_string(),
                    );
                then.status(200).json_body(json!({ "code": 200, "data": true }));
            })
            .await;

        let bound = ApiClient::new(&server.base_url())
            .bind_solana(&signer, &keypair, None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bound, sol_address);
    }

    #[tokio::test]
    async fn bind_failure_is_binding_failed() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path(BIND_SOLANA_PATH);
                then.status(400).json_body(json!({ "code": 400, "message": "already bound" }));
            })
            .await;

        let err = ApiClient::new(&server.base_url())
            .bind_solana(&signer(), &SigningKey::from_bytes(&[7u8; 32]), None)
            .await
            .unwrap_err();

        match err {
            ApiError::BindingFailed { status, message } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "already bound");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn address_signature_recovers_to_wallet() {
        let signer = signer();

        let sign_str = sign_address(&signer).await.unwrap();
        let signature = PrimitiveSignature::from_str(&sign_str).unwrap();

        assert_eq!(sign_str.len(), 2 + 65 * 2);
        assert_eq!(
            signature
                .recover_address_from_msg(signer.address().to_string())
                .unwrap(),
            signer.address()
        );
    }

    #[test]
    fn solana_signature_verifies_over_utf8_message() {
        let keypair = SigningKey::from_bytes(&[7u8; 32]);
        let message = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

        let encoded = sign_solana_message(&keypair, message);
        let bytes: [u8; 64] = STANDARD.decode(encoded).unwrap().try_into().unwrap();

        keypair
            .verifying_key()
            .verify(message.as_bytes(), &Ed25519Signature::from_bytes(&bytes))
            .unwrap();
        assert_eq!(
            bs58::decode(solana_address(&keypair)).into_vec().unwrap(),
            keypair.verifying_key().to_bytes()
        );
    }
}
