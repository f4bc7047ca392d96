use data_encoding::BASE64;
use std::env;

/// Token signing and lifetime configuration.
///
/// The signing secret is configured as a base64 string and decoded into raw
/// key bytes once at startup; a malformed secret aborts startup rather than
/// failing at request time. All TTLs are in milliseconds.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    /// Raw HMAC key bytes, decoded from the base64 `JWT_SECRET`.
    pub secret: Vec<u8>,
    pub access_token_expiry_ms: i64,
    pub refresh_token_expiry_ms: i64,
    pub activation_code_expiry_ms: i64,
    /// `iss` claim stamped into every issued token.
    pub issuer: String,
    /// Scheme prefix expected on the `Authorization` header.
    pub bearer_prefix: String,
}

// base64 of "slateboard-dev-secret-change-in-production"
const DEV_SECRET_B64: &str = "c2xhdGVib2FyZC1kZXYtc2VjcmV0LWNoYW5nZS1pbi1wcm9kdWN0aW9u";

impl JwtConfig {
    pub fn from_env() -> Self {
        let secret_b64 = env::var("JWT_SECRET").unwrap_or_else(|_| DEV_SECRET_B64.to_string());
        let secret = BASE64
            .decode(secret_b64.as_bytes())
            .expect("JWT_SECRET must be valid base64");

        Self {
            secret,
            access_token_expiry_ms: env::var("JWT_ACCESS_EXPIRY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3_600_000), // 1 hour
            refresh_token_expiry_ms: env::var("JWT_REFRESH_EXPIRY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(604_800_000), // 7 days
            activation_code_expiry_ms: env::var("JWT_ACTIVATION_EXPIRY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(86_400_000), // 24 hours
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "slateboard".to_string()),
            bearer_prefix: "Bearer ".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_secret_decodes() {
        let secret = BASE64.decode(DEV_SECRET_B64.as_bytes()).unwrap();
        assert_eq!(secret, b"slateboard-dev-secret-change-in-production");
    }
}
