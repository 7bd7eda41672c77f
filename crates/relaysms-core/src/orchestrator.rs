//! Session bootstrap, resume, and framing.
//!
//! [`SessionOrchestrator`] ties a [`StateStore`] to a [`RatchetPrimitive`].
//! For each message it either bootstraps a new session (no stored record) or
//! resumes the stored one, encrypts, persists the advanced state, and returns
//! the framed ciphertext.
//!
//! The whole load/encrypt/persist sequence runs inside
//! [`StateStore::update`], so two callers encrypting for the same
//! correspondent at once are serialized and neither loses a ratchet step.

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{debug, info, warn};

use crate::{
    config::StorageConfig,
    error::SessionError,
    frame::FramedCiphertext,
    primitive::{DoubleRatchet, RatchetPrimitive},
    record_key::RecordKey,
    storage::{SqliteStateStore, StateStore},
};

/// Drives per-correspondent Double Ratchet sessions.
#[derive(Debug, Clone)]
pub struct SessionOrchestrator<S, P> {
    store: S,
    primitive: P,
}

impl SessionOrchestrator<SqliteStateStore, DoubleRatchet> {
    /// Production wiring: SQLite session database plus the ratchet keystore,
    /// both under `config.base_dir`.
    ///
    /// # Errors
    ///
    /// - `SessionError::Storage` if the database cannot be created or opened
    pub fn open(config: &StorageConfig) -> Result<Self, SessionError> {
        let store = SqliteStateStore::open(config)?;
        let primitive = DoubleRatchet::new(config.aux_db_path());
        Ok(Self::new(store, primitive))
    }
}

impl<S: StateStore, P: RatchetPrimitive> SessionOrchestrator<S, P> {
    /// Create an orchestrator over an existing store and primitive.
    pub fn new(store: S, primitive: P) -> Self {
        Self { store, primitive }
    }

    /// Underlying state store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Underlying ratchet primitive.
    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    /// Encrypt `plaintext` for `identifier` and return the base64 frame.
    ///
    /// `secret_key` and `peer_public_key` are base64. They are only used to
    /// bootstrap; once a session is stored, the stored state governs and the
    /// peer public key is only bound as associated data.
    ///
    /// # Errors
    ///
    /// See [`SessionOrchestrator::encrypt_framed`].
    pub fn encrypt(
        &self,
        identifier: &str,
        plaintext: &str,
        secret_key: &str,
        peer_public_key: &str,
    ) -> Result<String, SessionError> {
        let frame =
            self.encrypt_framed(identifier, plaintext.as_bytes(), secret_key, peer_public_key)?;
        Ok(frame.to_base64()?)
    }

    /// Encrypt `plaintext` for `identifier`, returning the frame unencoded.
    ///
    /// # Errors
    ///
    /// - `InputEncoding` if a key is not valid base64; nothing is read or
    ///   written
    /// - `StateCorruption` if a stored record cannot be deserialized; the
    ///   record is left as is and no new session is started
    /// - `Primitive` if the primitive rejects the keys or fails to encrypt;
    ///   nothing is written
    /// - `Storage` if the database fails
    pub fn encrypt_framed(
        &self,
        identifier: &str,
        plaintext: &[u8],
        secret_key: &str,
        peer_public_key: &str,
    ) -> Result<FramedCiphertext, SessionError> {
        let secret_key = decode_key("secret key", secret_key)?;
        let peer_public_key = decode_key("peer public key", peer_public_key)?;
        let record = RecordKey::derive(identifier);

        let result = self.store.update(identifier, |prior| -> Result<_, SessionError> {
            let mut state = match prior {
                None => {
                    info!(record = record.short(), "no stored session, bootstrapping");
                    self.primitive.reset_auxiliary_state()?;
                    self.primitive.init(&secret_key, &peer_public_key)?
                },
                Some(blob) => {
                    debug!(record = record.short(), len = blob.len(), "resuming stored session");
                    self.primitive.deserialize_state(&blob).map_err(SessionError::StateCorruption)?
                },
            };

            let (header, ciphertext) =
                self.primitive.encrypt(&mut state, plaintext, &peer_public_key)?;
            let blob = self.primitive.serialize_state(&state)?;

            Ok((blob, (self.primitive.serialize_header(&header), ciphertext)))
        });

        let (header, ciphertext) = match result {
            Ok(parts) => parts,
            Err(SessionError::Storage(err)) => {
                warn!(record = record.short(), error = %err, "session state not persisted");
                return Err(SessionError::Storage(err));
            },
            Err(err) => return Err(err),
        };

        debug!(
            record = record.short(),
            header_len = header.len(),
            ciphertext_len = ciphertext.len(),
            "encrypted message"
        );
        Ok(FramedCiphertext::new(header, ciphertext))
    }

    /// Delete the stored session for `identifier`. The next
    /// [`encrypt`](Self::encrypt) for it bootstraps a new session.
    ///
    /// # Errors
    ///
    /// - `Storage` if the database fails
    pub fn forget(&self, identifier: &str) -> Result<(), SessionError> {
        self.store.delete(identifier)?;
        info!(record = RecordKey::derive(identifier).short(), "forgot stored session");
        Ok(())
    }

    /// Returns true if a session is stored for `identifier`.
    ///
    /// # Errors
    ///
    /// - `Storage` if the database fails
    pub fn has_session(&self, identifier: &str) -> Result<bool, SessionError> {
        Ok(self.store.retrieve(identifier)?.is_some())
    }
}

fn decode_key(field: &'static str, text: &str) -> Result<Vec<u8>, SessionError> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| SessionError::InputEncoding { field, reason: e.to_string() })
}
