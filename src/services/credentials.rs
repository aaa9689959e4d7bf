use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chacha20poly1305::{
    AeadCore, ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::services::pipeline::PipelineError;

/// Decrypts encrypted-at-rest secret blobs.
#[async_trait]
pub trait SecretDecryptor: Send + Sync {
    async fn decrypt(&self, ciphertext_b64: &str) -> Result<Vec<u8>>;
}

/// Working storage credentials, decrypted once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

/// The three sealed blobs as supplied via the environment.
#[derive(Debug, Clone)]
pub struct EncryptedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

/// Derive the symmetric sealing key from the master secret.
pub fn derive_master_key(secret: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(secret.as_bytes());
    // Context string for domain separation
    hasher.update(b"rust-image-pipeline-credential-key");
    *hasher.finalize().as_bytes()
}

/// ChaCha20-Poly1305 decryptor over Base64(nonce + ciphertext + tag) blobs.
pub struct MasterKeyDecryptor {
    key: [u8; 32],
}

impl MasterKeyDecryptor {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Seal a plaintext under the master key, producing an env-ready blob.
    /// Counterpart of `decrypt`, used by the seal_secret tool and tests.
    pub fn seal(plaintext: &[u8], key: &[u8; 32]) -> Result<String> {
        let cipher = ChaCha20Poly1305::new(&Key::from(*key));
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng); // 96-bits
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| anyhow::anyhow!("sealing failed: {}", e))?;

        // Combine Nonce + Ciphertext
        let mut combined = Vec::with_capacity(nonce.len() + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }
}

#[async_trait]
impl SecretDecryptor for MasterKeyDecryptor {
    async fn decrypt(&self, ciphertext_b64: &str) -> Result<Vec<u8>> {
        let decoded = BASE64
            .decode(ciphertext_b64)
            .context("failed to decode base64")?;

        if decoded.len() < 12 + 16 {
            // Nonce + MinTag
            anyhow::bail!("invalid ciphertext length");
        }

        let nonce = Nonce::from_slice(&decoded[0..12]);
        let ciphertext = &decoded[12..];

        let cipher = ChaCha20Poly1305::new(&Key::from(self.key));
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| anyhow::anyhow!("decryption failed: {}", e))?;

        Ok(plaintext)
    }
}

/// Process-lifetime credential cache with a single resolve entry point.
///
/// The three blobs are decrypted concurrently; the first failure wins and
/// partial results are discarded. There is no refresh: rotated secrets are
/// not picked up until the process is replaced.
pub struct CredentialCache {
    encrypted: EncryptedCredentials,
    resolved: OnceCell<StorageCredentials>,
}

impl CredentialCache {
    pub fn new(encrypted: EncryptedCredentials) -> Self {
        Self {
            encrypted,
            resolved: OnceCell::new(),
        }
    }

    pub async fn get_or_resolve(
        &self,
        decryptor: &dyn SecretDecryptor,
    ) -> Result<&StorageCredentials, PipelineError> {
        self.resolved
            .get_or_try_init(|| async {
                debug!("resolving storage credentials");

                let (access_key_id, secret_access_key, region) = tokio::try_join!(
                    decryptor.decrypt(&self.encrypted.access_key_id),
                    decryptor.decrypt(&self.encrypted.secret_access_key),
                    decryptor.decrypt(&self.encrypted.region),
                )
                .map_err(|e| PipelineError::Decryption(e.to_string()))?;

                let creds = StorageCredentials {
                    access_key_id: into_utf8(access_key_id)?,
                    secret_access_key: into_utf8(secret_access_key)?,
                    region: into_utf8(region)?,
                };

                info!(region = %creds.region, "storage credentials resolved and cached");
                Ok(creds)
            })
            .await
    }
}

fn into_utf8(bytes: Vec<u8>) -> Result<String, PipelineError> {
    String::from_utf8(bytes)
        .map_err(|_| PipelineError::Decryption("secret is not valid UTF-8".to_string()))
}
