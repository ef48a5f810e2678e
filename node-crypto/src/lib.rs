//! Hashing and signature primitives shared by every component. `HashValue`
//! is the 32-byte SHA-256 digest type used for transaction hashes, Merkle
//! accumulator leaves and roots, and write-set hashes. Signature
//! verification wraps `ed25519-dalek`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

pub const HASH_LENGTH: usize = 32;

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct HashValue([u8; HASH_LENGTH]);

impl HashValue {
    pub fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn zero() -> Self {
        Self([0u8; HASH_LENGTH])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// The SHA-256 digest of `bytes`.
    pub fn sha256(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_LENGTH];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// `H(left ∥ right)`, the interior-node hash used by every Merkle
    /// accumulator in this crate.
    pub fn combine(left: &HashValue, right: &HashValue) -> Self {
        let mut buf = Vec::with_capacity(HASH_LENGTH * 2);
        buf.extend_from_slice(&left.0);
        buf.extend_from_slice(&right.0);
        Self::sha256(&buf)
    }
}

impl TryFrom<&[u8]> for HashValue {
    type Error = HashValueError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != HASH_LENGTH {
            return Err(HashValueError::WrongLength(bytes.len()));
        }
        let mut out = [0u8; HASH_LENGTH];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }
}

#[derive(Debug, Error)]
pub enum HashValueError {
    #[error("expected {} bytes, got {0}", HASH_LENGTH)]
    WrongLength(usize),
}

impl fmt::Debug for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("malformed public key")]
    MalformedKey,
    #[error("malformed signature")]
    MalformedSignature,
    #[error("signature does not verify")]
    VerifyFailed,
}

/// An Ed25519 keypair, used by tests and the CLI to produce signed
/// transactions without a real wallet (out of scope per the design).
pub struct KeyPair(ed25519_dalek::Keypair);

impl KeyPair {
    pub fn generate<R: rand::RngCore + rand::CryptoRng>(rng: &mut R) -> Self {
        Self(ed25519_dalek::Keypair::generate(rng))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.public)
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(message))
    }
}

#[derive(Clone, Copy)]
pub struct PublicKey(ed25519_dalek::PublicKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        ed25519_dalek::PublicKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| SignatureError::MalformedKey)
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        self.0
            .verify(message, &signature.0)
            .map_err(|_| SignatureError::VerifyFailed)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "signature_bytes")] ed25519_dalek::Signature);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        ed25519_dalek::Signature::from_bytes(bytes)
            .map(Self)
            .map_err(|_| SignatureError::MalformedSignature)
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

mod signature_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        sig: &ed25519_dalek::Signature,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&sig.to_bytes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<ed25519_dalek::Signature, D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        ed25519_dalek::Signature::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}
