//! End-to-end session lifecycle against the SQLite store and the real ratchet.
//!
//! Every frame produced by the orchestrator is decrypted by a responder that
//! holds the matching session, so these tests check the bytes on the wire and
//! not just the bookkeeping.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use relaysms_core::{
    DoubleRatchet, FramedCiphertext, LENGTH_PREFIX_SIZE, SessionError, SessionOrchestrator,
    SqliteStateStore, StateStore, StorageConfig, StorageError,
};
use relaysms_ratchet::{Header, Keystore, RatchetState, decrypt, init_bob};
use tempfile::tempdir;
use x25519_dalek::{PublicKey, StaticSecret};

/// The receiving side of a conversation.
struct Correspondent {
    sk: [u8; 32],
    secret: StaticSecret,
    rng: ChaCha20Rng,
}

impl Correspondent {
    fn new(seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let secret = StaticSecret::random_from_rng(&mut rng);
        Self { sk: [seed as u8; 32], secret, rng }
    }

    fn sk(&self) -> String {
        STANDARD.encode(self.sk)
    }

    fn public(&self) -> [u8; 32] {
        *PublicKey::from(&self.secret).as_bytes()
    }

    fn ppk(&self) -> String {
        STANDARD.encode(self.public())
    }

    fn session(&self) -> RatchetState {
        init_bob(&self.sk, &self.secret.to_bytes()).unwrap()
    }

    fn read(&mut self, session: &mut RatchetState, payload: &str) -> String {
        let frame = FramedCiphertext::from_base64(payload).unwrap();
        let header = Header::from_bytes(&frame.header).unwrap();
        let ad = self.public();
        let plaintext = decrypt(&mut self.rng, session, &header, &frame.ciphertext, &ad).unwrap();
        String::from_utf8(plaintext).unwrap()
    }
}

fn orchestrator(config: &StorageConfig) -> SessionOrchestrator<SqliteStateStore, DoubleRatchet> {
    SessionOrchestrator::open(config).unwrap()
}

#[test]
fn first_use_then_resume_scenario() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::new(dir.path());
    let orch = orchestrator(&config);
    let mut bob = Correspondent::new(1);
    let mut session = bob.session();

    let first = orch.encrypt("+15550000000", "hello", &bob.sk(), &bob.ppk()).unwrap();
    let raw = STANDARD.decode(&first).unwrap();
    let header_len = i32::from_le_bytes(raw[..LENGTH_PREFIX_SIZE].try_into().unwrap());
    assert_eq!(header_len as usize, Header::SIZE);
    assert_eq!(orch.store().count().unwrap(), 1);

    let second = orch.encrypt("+15550000000", "hello", &bob.sk(), &bob.ppk()).unwrap();
    assert_ne!(first, second);
    assert_eq!(orch.store().count().unwrap(), 1);

    assert_eq!(bob.read(&mut session, &first), "hello");
    assert_eq!(bob.read(&mut session, &second), "hello");
}

#[test]
fn messages_decrypt_out_of_order() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(&StorageConfig::new(dir.path()));
    let mut bob = Correspondent::new(2);
    let mut session = bob.session();

    let payloads: Vec<String> = (0..5)
        .map(|i| orch.encrypt("+15550000001", &format!("msg {i}"), &bob.sk(), &bob.ppk()).unwrap())
        .collect();

    assert_eq!(bob.read(&mut session, &payloads[3]), "msg 3");
    assert_eq!(bob.read(&mut session, &payloads[0]), "msg 0");
    assert_eq!(bob.read(&mut session, &payloads[4]), "msg 4");
    assert_eq!(bob.read(&mut session, &payloads[1]), "msg 1");
    assert_eq!(bob.read(&mut session, &payloads[2]), "msg 2");
}

#[test]
fn session_survives_restart() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::new(dir.path().join("nested").join("storage"));
    let mut bob = Correspondent::new(3);
    let mut session = bob.session();

    let first = {
        let orch = orchestrator(&config);
        orch.encrypt("+15550000002", "before restart", &bob.sk(), &bob.ppk()).unwrap()
    };

    let second = {
        let orch = orchestrator(&config);
        assert!(orch.has_session("+15550000002").unwrap());
        orch.encrypt("+15550000002", "after restart", &bob.sk(), &bob.ppk()).unwrap()
    };

    assert_eq!(bob.read(&mut session, &first), "before restart");
    assert_eq!(bob.read(&mut session, &second), "after restart");
}

#[test]
fn identifiers_do_not_share_sessions() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(&StorageConfig::new(dir.path()));
    let mut bob = Correspondent::new(4);
    let mut carol = Correspondent::new(5);
    let mut bob_session = bob.session();
    let mut carol_session = carol.session();

    let to_bob = orch.encrypt("+15550000003", "for bob", &bob.sk(), &bob.ppk()).unwrap();
    let bob_record = orch.store().retrieve("+15550000003").unwrap().unwrap();

    let to_carol = orch.encrypt("+15550000004", "for carol", &carol.sk(), &carol.ppk()).unwrap();

    assert_eq!(orch.store().retrieve("+15550000003").unwrap().unwrap(), bob_record);
    assert_eq!(orch.store().count().unwrap(), 2);
    assert_eq!(bob.read(&mut bob_session, &to_bob), "for bob");
    assert_eq!(carol.read(&mut carol_session, &to_carol), "for carol");
}

#[test]
fn forget_starts_a_new_session() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(&StorageConfig::new(dir.path()));
    let mut bob = Correspondent::new(6);

    orch.forget("+15550000005").unwrap();
    orch.encrypt("+15550000005", "old", &bob.sk(), &bob.ppk()).unwrap();
    orch.encrypt("+15550000005", "old", &bob.sk(), &bob.ppk()).unwrap();
    orch.forget("+15550000005").unwrap();
    assert_eq!(orch.store().count().unwrap(), 0);

    // A fresh responder session reads the first message after forgetting
    let mut session = bob.session();
    let payload = orch.encrypt("+15550000005", "new", &bob.sk(), &bob.ppk()).unwrap();
    let frame = FramedCiphertext::from_base64(&payload).unwrap();
    assert_eq!(Header::from_bytes(&frame.header).unwrap().n, 0);
    assert_eq!(bob.read(&mut session, &payload), "new");
}

#[test]
fn bootstrap_replaces_stale_auxiliary_store() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::new(dir.path());
    let orch = orchestrator(&config);
    let bob = Correspondent::new(7);

    std::fs::write(config.aux_db_path(), b"left over from an earlier run").unwrap();

    let payload = orch.encrypt("+15550000006", "hi", &bob.sk(), &bob.ppk()).unwrap();
    let frame = FramedCiphertext::from_base64(&payload).unwrap();
    let header = Header::from_bytes(&frame.header).unwrap();

    let keystore = Keystore::open(config.aux_db_path()).unwrap();
    assert!(keystore.contains(&header.dh).unwrap());
}

#[test]
fn unwritable_storage_path_fails_to_open() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("occupied");
    std::fs::write(&file, b"not a directory").unwrap();

    let result = SessionOrchestrator::open(&StorageConfig::new(file.join("storage")));

    assert!(matches!(result, Err(SessionError::Storage(StorageError::Io(_)))));
}

#[test]
fn failed_auxiliary_reset_aborts_bootstrap() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::new(dir.path());
    let orch = orchestrator(&config);
    let bob = Correspondent::new(12);

    std::fs::create_dir(config.aux_db_path()).unwrap();

    let err = orch.encrypt("+15550000011", "hi", &bob.sk(), &bob.ppk()).unwrap_err();
    assert!(matches!(&err, SessionError::Primitive(e) if e.operation == "reset auxiliary state"));
    assert!(!err.is_retryable());
    assert_eq!(orch.store().count().unwrap(), 0);
}

#[test]
fn resume_leaves_auxiliary_store_alone() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::new(dir.path());
    let orch = orchestrator(&config);
    let bob = Correspondent::new(8);

    orch.encrypt("+15550000007", "one", &bob.sk(), &bob.ppk()).unwrap();
    std::fs::write(config.aux_db_path(), b"marker").unwrap();

    orch.encrypt("+15550000007", "two", &bob.sk(), &bob.ppk()).unwrap();
    assert_eq!(std::fs::read(config.aux_db_path()).unwrap(), b"marker");
}

#[test]
fn corrupt_record_is_not_overwritten() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(&StorageConfig::new(dir.path()));
    let bob = Correspondent::new(9);

    orch.store().store("+15550000008", b"\x01not cbor").unwrap();

    let err = orch.encrypt("+15550000008", "hi", &bob.sk(), &bob.ppk()).unwrap_err();
    assert!(matches!(err, SessionError::StateCorruption(_)));
    assert_eq!(orch.store().retrieve("+15550000008").unwrap().unwrap(), b"\x01not cbor");
}

#[test]
fn invalid_keys_are_rejected_before_storage() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(&StorageConfig::new(dir.path()));
    let bob = Correspondent::new(10);

    let err = orch.encrypt("+15550000009", "hi", "***", &bob.ppk()).unwrap_err();
    assert!(matches!(err, SessionError::InputEncoding { .. }));

    // Valid base64, wrong length
    let short_key = STANDARD.encode([1u8; 16]);
    let err = orch.encrypt("+15550000009", "hi", &short_key, &bob.ppk()).unwrap_err();
    assert!(matches!(err, SessionError::Primitive(_)));

    assert_eq!(orch.store().count().unwrap(), 0);
}

#[test]
fn resume_ignores_bootstrap_keys() {
    let dir = tempdir().unwrap();
    let orch = orchestrator(&StorageConfig::new(dir.path()));
    let mut bob = Correspondent::new(11);
    let mut session = bob.session();

    let first = orch.encrypt("+15550000010", "one", &bob.sk(), &bob.ppk()).unwrap();
    let second =
        orch.encrypt("+15550000010", "two", &STANDARD.encode([0xEEu8; 32]), &bob.ppk()).unwrap();

    assert_eq!(bob.read(&mut session, &first), "one");
    assert_eq!(bob.read(&mut session, &second), "two");
}
