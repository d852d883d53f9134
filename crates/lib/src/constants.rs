//! Constants used throughout the recordvault library.
//!
//! Central definitions for well-known storage keys, storage kind tags and
//! envelope format identifiers.

/// Storage key of the single root store of a local identity.
pub const MAIN_STORE_KEY: &str = "main";

/// Storage kind tag written into every store envelope.
pub const STORE_KIND: &str = "store";

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// Envelope scheme tag for [`EncryptionScheme::Simple`](crate::crypto::EncryptionScheme::Simple).
pub const SCHEME_SIMPLE: &str = "simple";

/// Envelope scheme tag for [`EncryptionScheme::PasswordDerived`](crate::crypto::EncryptionScheme::PasswordDerived).
pub const SCHEME_PASSWORD: &str = "PBES2";

/// Envelope scheme tag for [`EncryptionScheme::Shared`](crate::crypto::EncryptionScheme::Shared).
pub const SCHEME_SHARED: &str = "shared";

/// HKDF info string binding wrapped content keys to this format.
pub const WRAP_INFO: &[u8] = b"recordvault-key-wrap-v1";
