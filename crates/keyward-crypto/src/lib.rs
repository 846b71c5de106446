//! Cryptographic primitives for the Keyward node.
//!
//! This crate is the only place in the workspace that touches raw
//! cryptography. Everything else goes through these wrappers.
//!
//! # Modules
//!
//! - [`signing`]: Ed25519 account keypairs and address derivation
//! - [`aead`]: XChaCha20-Poly1305 sealing of key material at rest
//! - [`kdf`]: Argon2id password-based key derivation
//! - [`hash`]: SHA3-256

pub mod aead;
pub mod hash;
pub mod kdf;
pub mod signing;
