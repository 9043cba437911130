use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use bip39::{Language, Mnemonic};
use ed25519_dalek::SigningKey;
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use tiny_hderive::bip32::ExtendedPrivKey;

use crate::error::{Result, WalletDbError};

const NONCE_LEN: usize = 12;
const SALT_LEN: usize = 16;

/// Hex-encoded 20-byte digest of a public key
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&PublicKey> for Address {
    fn from(key: &PublicKey) -> Self {
        let digest = Sha256::digest(key.0);
        Address(hex::encode(&digest[..20]))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ed25519 public key, hex on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn address(&self) -> Address {
        Address::from(self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| WalletDbError::Crypto(format!("Invalid pubkey hex: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| WalletDbError::Crypto("Invalid pubkey length".to_string()))?;
        Ok(PublicKey(bytes))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Ed25519 signing key. Debug output never includes the secret.
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    pub fn generate() -> Self {
        PrivateKey {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| WalletDbError::Crypto("Invalid private key length".to_string()))?;
        Ok(PrivateKey {
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn address(&self) -> Address {
        self.public_key().address()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key().to_hex())
            .finish()
    }
}

/// BIP32 root material. Children are derived along `<path prefix>/<index>`.
#[derive(Clone)]
pub struct ExtendedKey {
    seed: Vec<u8>,
}

impl ExtendedKey {
    /// Fresh 24-word mnemonic and the key it seeds
    pub fn generate() -> Result<(Self, String)> {
        let mut entropy = [0u8; 32];
        OsRng.fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| WalletDbError::Crypto(format!("Failed to create mnemonic: {}", e)))?;
        let key = Self::from_seed(&mnemonic.to_seed(""));
        Ok((key, mnemonic.to_string()))
    }

    pub fn from_mnemonic(phrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
            .map_err(|e| WalletDbError::Crypto(format!("Invalid mnemonic: {}", e)))?;
        Ok(Self::from_seed(&mnemonic.to_seed("")))
    }

    pub fn from_seed(seed: &[u8]) -> Self {
        ExtendedKey { seed: seed.to_vec() }
    }

    pub fn seed(&self) -> &[u8] {
        &self.seed
    }

    pub fn child(&self, path_prefix: &str, index: i32) -> Result<PrivateKey> {
        if index < 0 {
            return Err(WalletDbError::Crypto(format!("Invalid child index {}", index)));
        }
        let path = format!("{}/{}", path_prefix.trim_end_matches('/'), index);
        let ext_key = ExtendedPrivKey::derive(&self.seed, path.as_str())
            .map_err(|e| WalletDbError::Crypto(format!("Key derivation failed for {}: {:?}", path, e)))?;
        PrivateKey::from_bytes(&ext_key.secret())
    }
}

impl std::fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExtendedKey(..)")
    }
}

pub fn new_salt() -> Vec<u8> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt.to_vec()
}

fn derive_encryption_key(password: &str, salt: &[u8], rounds: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, rounds, &mut key);
    key
}

/// AES-256-GCM under a PBKDF2 key. Output is `nonce || ciphertext || tag`.
pub fn encrypt_data(data: &[u8], password: &str, salt: &[u8], rounds: u32) -> Result<Vec<u8>> {
    let key = derive_encryption_key(password, salt, rounds);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| WalletDbError::Crypto("Invalid key length".to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, data)
        .map_err(|e| WalletDbError::Crypto(format!("Encryption failure: {:?}", e)))?;

    let mut blob = nonce_bytes.to_vec();
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

pub fn decrypt_data(blob: &[u8], password: &str, salt: &[u8], rounds: u32) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return Err(WalletDbError::Crypto("Invalid blob size".to_string()));
    }

    let key = derive_encryption_key(password, salt, rounds);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| WalletDbError::Crypto("Invalid key length".to_string()))?;
    let nonce = Nonce::from_slice(&blob[..NONCE_LEN]);

    cipher
        .decrypt(nonce, &blob[NONCE_LEN..])
        .map_err(|_| WalletDbError::Crypto("Decryption failed (wrong password?)".to_string()))
}
