//! Peppered, salted credential hashing.
//!
//! `digest = base64(SHA-512(salt || hex(pre(pepper || plaintext))))` where `pre` is picked at
//! random per credential and stored next to the digest so the value can be re-derived.
//!
//! MD5 and SHA-1 remain in the candidate set of pre-hash algorithms. They are weak digests;
//! the strength of the stored value rests on the final salted SHA-512.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::Md5;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;

use crate::config::Pepper;
use crate::error::Error;

/// Marker placed first in the array form of a hashed value.
pub const HASH_MARKER: &str = "hash";

/// Number of random salt bytes; hex-encoded this gives 48 characters.
pub const SALT_BYTES: usize = 24;

/// Digest applied to `pepper || plaintext` before the final salted SHA-512.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreHashAlgorithm {
    Sha1,
    Sha256,
    Sha512,
    Md5,
}

impl PreHashAlgorithm {
    pub const ALL: [PreHashAlgorithm; 4] = [
        PreHashAlgorithm::Sha1,
        PreHashAlgorithm::Sha256,
        PreHashAlgorithm::Sha512,
        PreHashAlgorithm::Md5,
    ];

    /// Name stored in the `_HA_` column.
    pub fn as_str(self) -> &'static str {
        match self {
            PreHashAlgorithm::Sha1 => "sha1",
            PreHashAlgorithm::Sha256 => "sha256",
            PreHashAlgorithm::Sha512 => "sha512",
            PreHashAlgorithm::Md5 => "md5",
        }
    }

    /// Lower-case hex digest of `input`.
    pub fn hex_digest(self, input: &[u8]) -> String {
        match self {
            PreHashAlgorithm::Sha1 => hex::encode(Sha1::digest(input)),
            PreHashAlgorithm::Sha256 => hex::encode(Sha256::digest(input)),
            PreHashAlgorithm::Sha512 => hex::encode(Sha512::digest(input)),
            PreHashAlgorithm::Md5 => hex::encode(Md5::digest(input)),
        }
    }

    fn random() -> Self {
        Self::ALL[OsRng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for PreHashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreHashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown pre-hash algorithm '{}'", s)))
    }
}

/// A hashed credential as stored in the three hash columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedValue {
    pub algorithm: PreHashAlgorithm,
    /// Base64 SHA-512 digest, 88 characters.
    pub digest: String,
    /// Hex-encoded salt, 48 characters.
    pub salt: String,
}

impl HashedValue {
    /// `["hash", algorithm, digest, salt]`
    pub fn to_array(&self) -> [String; 4] {
        [
            HASH_MARKER.to_string(),
            self.algorithm.as_str().to_string(),
            self.digest.clone(),
            self.salt.clone(),
        ]
    }

    /// Parse the array form produced by [`HashedValue::to_array`].
    pub fn from_array<S: AsRef<str>>(parts: &[S]) -> Result<Self, Error> {
        match parts {
            [marker, algorithm, digest, salt] if marker.as_ref() == HASH_MARKER => Ok(Self {
                algorithm: algorithm.as_ref().parse()?,
                digest: digest.as_ref().to_string(),
                salt: salt.as_ref().to_string(),
            }),
            _ => Err(Error::Config(
                "a hashed value must be [\"hash\", algorithm, digest, salt]".to_string(),
            )),
        }
    }

    /// Re-derive the digest for `plaintext` with the stored algorithm and salt and compare.
    pub fn verify(&self, pepper: &Pepper, plaintext: &str) -> bool {
        derive_digest(pepper, plaintext, self.algorithm, &self.salt) == self.digest
    }
}

/// `base64(SHA-512(salt || hex(algorithm(pepper || plaintext))))`
pub fn derive_digest(
    pepper: &Pepper,
    plaintext: &str,
    algorithm: PreHashAlgorithm,
    salt: &str,
) -> String {
    let mut peppered = String::with_capacity(pepper.expose().len() + plaintext.len());
    peppered.push_str(pepper.expose());
    peppered.push_str(plaintext);
    let pre = algorithm.hex_digest(peppered.as_bytes());

    let mut hasher = Sha512::new();
    hasher.update(salt.as_bytes());
    hasher.update(pre.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Hash `plaintext` with a fresh salt and a randomly chosen pre-hash algorithm.
pub fn hash(pepper: &Pepper, plaintext: &str) -> HashedValue {
    let algorithm = PreHashAlgorithm::random();
    let mut salt_bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);
    let digest = derive_digest(pepper, plaintext, algorithm, &salt);
    HashedValue {
        algorithm,
        digest,
        salt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips_through_rederivation() {
        let pepper = Pepper::new("pepper");
        let hashed = hash(&pepper, "hunter2");

        assert_eq!(hashed.salt.len(), 48);
        assert_eq!(hashed.digest.len(), 88);
        assert_eq!(
            derive_digest(&pepper, "hunter2", hashed.algorithm, &hashed.salt),
            hashed.digest
        );
        assert!(hashed.verify(&pepper, "hunter2"));
        assert!(!hashed.verify(&pepper, "hunter3"));
        assert!(!hashed.verify(&Pepper::new("other"), "hunter2"));
    }

    #[test]
    fn hashing_is_not_deterministic() {
        let pepper = Pepper::new("pepper");
        let a = hash(&pepper, "same");
        let b = hash(&pepper, "same");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn known_derivation() {
        // sha256("p" + "x") in hex, then sha512(salt + that hex)
        let pepper = Pepper::new("p");
        let pre = PreHashAlgorithm::Sha256.hex_digest(b"px");
        let mut hasher = Sha512::new();
        hasher.update(b"00");
        hasher.update(pre.as_bytes());
        let expected = STANDARD.encode(hasher.finalize());

        assert_eq!(
            derive_digest(&pepper, "x", PreHashAlgorithm::Sha256, "00"),
            expected
        );
    }

    #[test]
    fn pre_hash_digest_lengths() {
        assert_eq!(PreHashAlgorithm::Md5.hex_digest(b"").len(), 32);
        assert_eq!(PreHashAlgorithm::Sha1.hex_digest(b"").len(), 40);
        assert_eq!(PreHashAlgorithm::Sha256.hex_digest(b"").len(), 64);
        assert_eq!(PreHashAlgorithm::Sha512.hex_digest(b"").len(), 128);
        assert_eq!(
            PreHashAlgorithm::Md5.hex_digest(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn every_algorithm_gets_picked() {
        let pepper = Pepper::new("pepper");
        let mut seen = std::collections::HashSet::new();
        for _ in 0..400 {
            seen.insert(hash(&pepper, "pw").algorithm);
        }
        assert_eq!(seen.len(), PreHashAlgorithm::ALL.len());
    }

    #[test]
    fn array_form() {
        let hashed = hash(&Pepper::new("pepper"), "pw");
        let array = hashed.to_array();
        assert_eq!(array[0], "hash");
        assert_eq!(array[1], hashed.algorithm.as_str());
        assert_eq!(HashedValue::from_array(&array).unwrap(), hashed);

        assert!(HashedValue::from_array(&["plain", "md5", "d", "s"]).is_err());
        assert!(HashedValue::from_array(&["hash", "crc32", "d", "s"]).is_err());
    }

    #[test]
    fn algorithm_names_round_trip() {
        for algorithm in PreHashAlgorithm::ALL {
            assert_eq!(algorithm.as_str().parse::<PreHashAlgorithm>().unwrap(), algorithm);
        }
    }
}
