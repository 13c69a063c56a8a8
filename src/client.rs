//! Async HTTP client for the Daraja STK push gateway.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use rust_decimal::Decimal;
use secrecy::ExposeSecret as _;

use crate::config::GatewayConfig;
use crate::error::{DarajaError, Result};
use crate::models::{GatewayErrorBody, PhoneNumber, StkPushRequest, StkPushResponse, TokenResponse};

/// Base URL for the production gateway.
const DEFAULT_BASE_URL: &str = "https://api.safaricom.co.ke";

/// OAuth token endpoint path.
const TOKEN_PATH: &str = "/oauth/v1/generate";

/// STK push initiation endpoint path.
const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";

/// Transaction type constant for pay-bill push prompts.
const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// Timestamp layout the password scheme requires (`YYYYMMDDHHmmss`).
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Builder for constructing a [`DarajaClient`].
#[derive(Debug)]
pub struct DarajaClientBuilder {
    /// Gateway configuration.
    config: Option<GatewayConfig>,
    /// Base URL override (for testing).
    base_url: Option<String>,
}

impl DarajaClientBuilder {
    /// Sets the gateway configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the base URL (useful for testing with a mock server).
    #[inline]
    #[must_use]
    pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`DarajaError::Config`] if no configuration was provided.
    /// Returns [`DarajaError::Http`] if the HTTP client fails to build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<DarajaClient> {
        let config = self
            .config
            .ok_or_else(|| DarajaError::Config("gateway configuration is required".to_owned()))?;
        let base_url = self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        tracing::debug!(base_url = %base_url, "building client");
        let http = reqwest::Client::builder().build()?;

        Ok(DarajaClient {
            http,
            config,
            base_url,
        })
    }
}

/// Async client for the Daraja token and STK push endpoints.
///
/// Use [`DarajaClient::builder()`] to construct an instance. The client
/// is stateless: no token is cached between calls, and every initiation
/// re-authenticates.
#[derive(Debug)]
pub struct DarajaClient {
    /// Underlying HTTP client.
    http: reqwest::Client,
    /// Gateway configuration.
    config: GatewayConfig,
    /// API base URL.
    base_url: String,
}

impl DarajaClient {
    /// Creates a new builder for configuring the client.
    #[inline]
    #[must_use]
    pub const fn builder() -> DarajaClientBuilder {
        DarajaClientBuilder {
            config: None,
            base_url: None,
        }
    }

    /// Fetches a short-lived bearer token using the configured service
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns [`DarajaError::Auth`] if the gateway rejects the
    /// credentials, or [`DarajaError::Http`] on transport failure. The
    /// caller must not proceed to initiate a payment without a token.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub async fn fetch_token(&self) -> Result<String> {
        let url = format!("{}{TOKEN_PATH}?grant_type=client_credentials", self.base_url);
        tracing::debug!("requesting access token");
        let response = self
            .http
            .post(&url)
            .basic_auth(
                &self.config.consumer_key,
                Some(self.config.consumer_secret.expose_secret()),
            )
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "received token response");
        if status.is_success() {
            let body = response.text().await?;
            let token: TokenResponse = serde_json::from_str(&body)?;
            tracing::debug!(expires_in = %token.expires_in, "access token issued");
            Ok(token.access_token)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_owned());
            tracing::debug!(status = status.as_u16(), message = %message, "token request rejected");
            Err(DarajaError::Auth {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Asks the gateway to prompt `phone` for authorization of `amount`.
    ///
    /// Builds the timestamped base64 password from the configured
    /// shortcode and passkey, then posts the push request. On acceptance
    /// the gateway issues the checkout and merchant request identifiers
    /// returned here; the actual payment outcome arrives later on the
    /// configured callback URL.
    ///
    /// # Errors
    ///
    /// Returns [`DarajaError::InvalidAmount`] for non-positive amounts
    /// (checked before any network traffic), [`DarajaError::Auth`] if
    /// the bearer token is rejected, and [`DarajaError::Gateway`] for
    /// business rejections, whether reported through a non-success HTTP
    /// status or a non-zero `ResponseCode` in an accepted response.
    #[inline]
    #[tracing::instrument(skip_all, fields(phone = %phone, amount = %amount))]
    pub async fn stk_push(
        &self,
        token: &str,
        phone: &PhoneNumber,
        amount: Decimal,
        reference: &str,
    ) -> Result<StkPushResponse> {
        if amount <= Decimal::ZERO {
            return Err(DarajaError::InvalidAmount { value: amount });
        }

        let request = self.push_request(phone, amount, reference, Utc::now());
        let url = format!("{}{STK_PUSH_PATH}", self.base_url);
        tracing::debug!(url = %url, "sending push request");
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "received push response");
        if status.is_success() {
            let body = response.text().await?;
            let parsed: StkPushResponse = serde_json::from_str(&body)?;
            if parsed.response_code == "0" {
                tracing::debug!(checkout = %parsed.checkout_request_id, "push accepted");
                Ok(parsed)
            } else {
                Err(DarajaError::Gateway {
                    status: status.as_u16(),
                    code: parsed.response_code,
                    message: parsed.response_description,
                })
            }
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_owned());
            tracing::debug!(status = status.as_u16(), message = %message, "push rejected");
            Err(push_rejection(status.as_u16(), message))
        }
    }

    /// Assembles the wire request body for one push initiation.
    fn push_request(
        &self,
        phone: &PhoneNumber,
        amount: Decimal,
        reference: &str,
        now: DateTime<Utc>,
    ) -> StkPushRequest {
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let password = stk_password(
            &self.config.short_code,
            self.config.passkey.expose_secret(),
            &timestamp,
        );
        StkPushRequest {
            business_short_code: self.config.short_code.clone(),
            password,
            timestamp,
            transaction_type: TRANSACTION_TYPE.to_owned(),
            amount,
            party_a: phone.as_str().to_owned(),
            party_b: self.config.short_code.clone(),
            phone_number: phone.as_str().to_owned(),
            call_back_url: self.config.callback_url.clone(),
            account_reference: reference.to_owned(),
            transaction_desc: self.config.transaction_desc.clone(),
        }
    }
}

/// Maps a non-success push response to the matching error variant.
///
/// A 401 means the bearer token was not accepted (upstream auth); any
/// other status is a gateway business rejection, with the structured
/// error body parsed when present.
fn push_rejection(status: u16, message: String) -> DarajaError {
    if status == 401 {
        return DarajaError::Auth { status, message };
    }
    match serde_json::from_str::<GatewayErrorBody>(&message) {
        Ok(body) => DarajaError::Gateway {
            status,
            code: body.error_code,
            message: body.error_message,
        },
        Err(_) => DarajaError::Gateway {
            status,
            code: "unknown".to_owned(),
            message,
        },
    }
}

/// Derives the base64 password from `shortcode + passkey + timestamp`.
fn stk_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{short_code}{passkey}{timestamp}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            consumer_key: "key".to_owned(),
            consumer_secret: SecretString::from("secret".to_owned()),
            short_code: "174379".to_owned(),
            passkey: SecretString::from("passkey".to_owned()),
            callback_url: "https://example.com/callback".to_owned(),
            transaction_desc: "Fee payment".to_owned(),
        }
    }

    fn client_for(base_url: &str) -> DarajaClient {
        DarajaClient::builder()
            .config(test_config())
            .base_url(base_url)
            .build()
            .unwrap()
    }

    fn phone() -> PhoneNumber {
        PhoneNumber::new("254712345678").unwrap()
    }

    #[test]
    fn builder_requires_config() {
        let result = DarajaClient::builder().build();
        assert!(matches!(result, Err(DarajaError::Config(_))));
    }

    #[test]
    fn builder_default_base_url() {
        let client = DarajaClient::builder()
            .config(test_config())
            .build()
            .unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_custom_base_url() {
        let client = client_for("http://localhost:8080");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn password_is_base64_of_concatenated_parts() {
        let password = stk_password("174379", "passkey", "20240101120000");
        assert_eq!(password, "MTc0Mzc5cGFzc2tleTIwMjQwMTAxMTIwMDAw");
    }

    #[test]
    fn push_request_carries_timestamp_and_parties() {
        let client = client_for("http://localhost:8080");
        let now = DateTime::from_timestamp(1_704_110_400, 0).unwrap();
        let request = client.push_request(&phone(), Decimal::from(500_u32), "SCH-001", now);
        assert_eq!(request.timestamp, "20240101120000");
        assert_eq!(request.party_a, "254712345678");
        assert_eq!(request.party_b, "174379");
        assert_eq!(request.phone_number, "254712345678");
        assert_eq!(
            request.password,
            stk_password("174379", "passkey", "20240101120000")
        );
    }

    #[tokio::test]
    async fn fetch_token_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(query_param("grant_type", "client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc123",
                "expires_in": "3599"
            })))
            .mount(&server)
            .await;

        let token = client_for(&server.uri()).fetch_token().await.unwrap();
        assert_eq!(token, "abc123");
    }

    #[tokio::test]
    async fn fetch_token_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri()).fetch_token().await.unwrap_err();
        assert!(matches!(err, DarajaError::Auth { status: 401, .. }));
    }

    #[tokio::test]
    async fn stk_push_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STK_PUSH_PATH))
            .and(body_partial_json(serde_json::json!({
                "BusinessShortCode": "174379",
                "TransactionType": "CustomerPayBillOnline",
                "PhoneNumber": "254712345678",
                "Amount": "500",
                "CallBackURL": "https://example.com/callback"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MerchantRequestID": "mr-1",
                "CheckoutRequestID": "ws_CO_1",
                "ResponseCode": "0",
                "ResponseDescription": "Success. Request accepted for processing",
                "CustomerMessage": "Success. Request accepted for processing"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server.uri())
            .stk_push("token", &phone(), Decimal::from(500_u32), "SCH-001")
            .await
            .unwrap();
        assert_eq!(response.checkout_request_id.as_inner(), "ws_CO_1");
        assert_eq!(response.merchant_request_id.as_inner(), "mr-1");
    }

    #[tokio::test]
    async fn stk_push_business_rejection_in_accepted_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STK_PUSH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MerchantRequestID": "mr-1",
                "CheckoutRequestID": "ws_CO_1",
                "ResponseCode": "1",
                "ResponseDescription": "Insufficient permissions",
                "CustomerMessage": "Unable to process"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .stk_push("token", &phone(), Decimal::from(500_u32), "SCH-001")
            .await
            .unwrap_err();
        assert!(matches!(err, DarajaError::Gateway { code, .. } if code == "1"));
    }

    #[tokio::test]
    async fn stk_push_structured_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STK_PUSH_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "requestId": "16813-15-1",
                "errorCode": "400.002.02",
                "errorMessage": "Bad Request - Invalid ShortCode"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .stk_push("token", &phone(), Decimal::from(500_u32), "SCH-001")
            .await
            .unwrap_err();
        assert!(
            matches!(err, DarajaError::Gateway { status: 400, code, .. } if code == "400.002.02")
        );
    }

    #[tokio::test]
    async fn stk_push_expired_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STK_PUSH_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Access Token"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .stk_push("stale", &phone(), Decimal::from(500_u32), "SCH-001")
            .await
            .unwrap_err();
        assert!(matches!(err, DarajaError::Auth { status: 401, .. }));
    }

    #[tokio::test]
    async fn stk_push_rejects_non_positive_amount_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .stk_push("token", &phone(), Decimal::ZERO, "SCH-001")
            .await
            .unwrap_err();
        assert!(matches!(err, DarajaError::InvalidAmount { .. }));
    }
}
