//! HMAC-SHA256 signed URLs for email verification links.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use domains::{SignedUrl, UrlSigner};

type HmacSha256 = Hmac<Sha256>;

/// Signs `path?expires=<unix>` with a server-side key.
pub struct HmacUrlSigner {
    key: Vec<u8>,
}

impl HmacUrlSigner {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    fn mac(&self, path: &str, expires: i64) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(path.as_bytes());
        mac.update(b"?expires=");
        mac.update(expires.to_string().as_bytes());
        Some(mac)
    }
}

impl UrlSigner for HmacUrlSigner {
    fn sign(&self, path: &str, expires_at: DateTime<Utc>) -> SignedUrl {
        let expires = expires_at.timestamp();
        let signature = self
            .mac(path, expires)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default();
        SignedUrl {
            path: path.to_string(),
            expires,
            signature,
        }
    }

    fn verify(&self, path: &str, expires: i64, signature: &str) -> bool {
        if expires <= Utc::now().timestamp() {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        self.mac(path, expires)
            .is_some_and(|mac| mac.verify_slice(&expected).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn accepts_untampered_links() {
        let signer = HmacUrlSigner::new("app-key");
        let url = signer.sign("/email/verify/1/abc", Utc::now() + Duration::minutes(60));
        assert!(signer.verify(&url.path, url.expires, &url.signature));
        assert!(url.to_string().starts_with("/email/verify/1/abc?expires="));
    }

    #[test]
    fn rejects_tampering() {
        let signer = HmacUrlSigner::new("app-key");
        let url = signer.sign("/email/verify/1/abc", Utc::now() + Duration::minutes(60));
        assert!(!signer.verify("/email/verify/2/abc", url.expires, &url.signature));
        assert!(!signer.verify(&url.path, url.expires + 1, &url.signature));
        assert!(!signer.verify(&url.path, url.expires, "deadbeef"));
        assert!(!signer.verify(&url.path, url.expires, "not hex"));
        assert!(!HmacUrlSigner::new("other-key").verify(&url.path, url.expires, &url.signature));
    }

    #[test]
    fn rejects_expired_links() {
        let signer = HmacUrlSigner::new("app-key");
        let url = signer.sign("/email/verify/1/abc", Utc::now() - Duration::seconds(1));
        assert!(!signer.verify(&url.path, url.expires, &url.signature));
    }
}
