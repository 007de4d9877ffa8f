//! Crypto layer of the maildex search core
//!
//! Everything keyed by the database key lives here: the deterministic
//! index-key encoding for term lookups, entry-id encryption and the id
//! hash used for pre-intersection, and the payload / metadata ciphers.
//!
//! Two IV regimes coexist on purpose. Lookup keys and entry-id prefixes
//! use the store-wide fixed IV — equal terms must produce equal lookup
//! keys and equal ids equal element-data keys, so these encryptions have
//! to be deterministic. Every other ciphertext (entry payloads, metadata
//! rows, element data) carries its own random IV as a 16-byte prefix.

pub mod cbc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use maildex_core::{
    ChunkDescriptor, ElementData, EncryptedEntry, EntityId, Entry, EntryPayload, Result,
    SearchError,
};

/// Length of the deterministically encrypted id prefix of an entry block.
pub const ENC_ID_SIZE: usize = 16;

/// Minimum length of a well-formed entry block:
/// enc_id ∥ payload IV ∥ one ciphertext block.
pub const MIN_BLOCK_SIZE: usize = ENC_ID_SIZE + cbc::BLOCK_SIZE + cbc::BLOCK_SIZE;

/// CRC-32 of an encrypted id prefix.
///
/// Cheap enough to compute for every block during a scan; collisions are
/// tolerated because plaintext-id intersection runs afterwards.
pub fn id_hash(enc_id: &[u8]) -> u32 {
    crc32fast::hash(enc_id)
}

/// The database key and fixed IV, with every derived encoding.
#[derive(Clone)]
pub struct SearchKeys {
    key: [u8; 16],
    iv: [u8; 16],
}

impl SearchKeys {
    /// Wrap a database key and its fixed IV.
    pub fn new(key: [u8; 16], iv: [u8; 16]) -> Self {
        SearchKeys { key, iv }
    }

    // ========================================================================
    // Index keys (deterministic)
    // ========================================================================

    /// Opaque lookup key for a term: base64 of the fixed-IV encryption.
    ///
    /// Deterministic — equal terms yield equal keys. `term` must be a
    /// single tokenizer output, not raw user input.
    pub fn index_key(&self, term: &str) -> String {
        BASE64.encode(cbc::encrypt(&self.key, &self.iv, term.as_bytes()))
    }

    /// Deterministically encrypt an entity id (8 bytes → one padded block).
    pub fn encrypt_id(&self, id: EntityId) -> [u8; 16] {
        let ct = cbc::encrypt(&self.key, &self.iv, &id.to_be_bytes());
        debug_assert_eq!(ct.len(), ENC_ID_SIZE);
        let mut out = [0u8; ENC_ID_SIZE];
        out.copy_from_slice(&ct);
        out
    }

    /// Recover an entity id from its encrypted prefix.
    pub fn decrypt_id(&self, enc_id: &[u8; 16]) -> Result<EntityId> {
        let plain = cbc::decrypt(&self.key, &self.iv, enc_id)?;
        let bytes: [u8; 8] = plain
            .as_slice()
            .try_into()
            .map_err(|_| SearchError::crypto("entity id has wrong length"))?;
        Ok(EntityId::from_be_bytes(bytes))
    }

    /// Key of an entity's element-data row: base64 of the encrypted id.
    pub fn element_data_key(&self, id: EntityId) -> String {
        BASE64.encode(self.encrypt_id(id))
    }

    // ========================================================================
    // Entry blocks
    // ========================================================================

    /// Parse one framed block into its encrypted parts, computing the id
    /// hash. Structural problems are corruption: the framing promised a
    /// block and the block cannot be one.
    pub fn parse_block(&self, block: &[u8]) -> Result<EncryptedEntry> {
        if block.len() < MIN_BLOCK_SIZE {
            return Err(SearchError::corruption(format!(
                "entry block of {} bytes is shorter than the {} byte minimum",
                block.len(),
                MIN_BLOCK_SIZE
            )));
        }
        let mut enc_id = [0u8; ENC_ID_SIZE];
        enc_id.copy_from_slice(&block[..ENC_ID_SIZE]);
        Ok(EncryptedEntry {
            id_hash: id_hash(&enc_id),
            enc_id,
            payload: block[ENC_ID_SIZE..].to_vec(),
        })
    }

    /// Decrypt a parsed block into a posting entry.
    pub fn decrypt_entry(&self, enc: &EncryptedEntry) -> Result<Entry> {
        let id = self.decrypt_id(&enc.enc_id)?;
        let (iv, ct) = enc.payload.split_at(cbc::BLOCK_SIZE);
        let iv: [u8; 16] = iv.try_into().expect("split at block size");
        let plain = cbc::decrypt(&self.key, &iv, ct)?;
        let payload: EntryPayload = bincode::deserialize(&plain)
            .map_err(|e| SearchError::crypto(format!("entry payload decode: {e}")))?;
        Ok(Entry {
            id,
            attribute: payload.attribute,
            positions: payload.positions,
        })
    }

    /// Encode an entry as a stored block (writer side; used by the
    /// indexer and by test fixtures).
    pub fn encrypt_entry(&self, entry: &Entry, payload_iv: &[u8; 16]) -> Vec<u8> {
        let payload = EntryPayload {
            attribute: entry.attribute,
            positions: entry.positions.clone(),
        };
        let plain = bincode::serialize(&payload).expect("in-memory serialize");
        let mut block = Vec::with_capacity(MIN_BLOCK_SIZE + plain.len());
        block.extend_from_slice(&self.encrypt_id(entry.id));
        block.extend_from_slice(payload_iv);
        block.extend_from_slice(&cbc::encrypt(&self.key, payload_iv, &plain));
        block
    }

    // ========================================================================
    // Metadata and element rows
    // ========================================================================

    /// Decrypt a metadata row into its chunk descriptor list.
    pub fn decrypt_meta(&self, row: &[u8]) -> Result<Vec<ChunkDescriptor>> {
        let plain = self.decrypt_prefixed(row, "metadata row")?;
        bincode::deserialize(&plain)
            .map_err(|e| SearchError::crypto(format!("metadata decode: {e}")))
    }

    /// Encrypt a chunk descriptor list (writer side).
    pub fn encrypt_meta(&self, rows: &[ChunkDescriptor], iv: &[u8; 16]) -> Vec<u8> {
        let plain = bincode::serialize(rows).expect("in-memory serialize");
        self.encrypt_prefixed(&plain, iv)
    }

    /// Decrypt an element-data row.
    pub fn decrypt_element(&self, row: &[u8]) -> Result<ElementData> {
        let plain = self.decrypt_prefixed(row, "element data")?;
        bincode::deserialize(&plain)
            .map_err(|e| SearchError::crypto(format!("element data decode: {e}")))
    }

    /// Encrypt an element-data row (writer side).
    pub fn encrypt_element(&self, data: &ElementData, iv: &[u8; 16]) -> Vec<u8> {
        let plain = bincode::serialize(data).expect("in-memory serialize");
        self.encrypt_prefixed(&plain, iv)
    }

    fn encrypt_prefixed(&self, plain: &[u8], iv: &[u8; 16]) -> Vec<u8> {
        let mut out = Vec::with_capacity(cbc::BLOCK_SIZE + plain.len() + cbc::BLOCK_SIZE);
        out.extend_from_slice(iv);
        out.extend_from_slice(&cbc::encrypt(&self.key, iv, plain));
        out
    }

    fn decrypt_prefixed(&self, row: &[u8], what: &str) -> Result<Vec<u8>> {
        if row.len() < cbc::BLOCK_SIZE * 2 {
            return Err(SearchError::corruption(format!(
                "{what} of {} bytes is too short for IV and ciphertext",
                row.len()
            )));
        }
        let (iv, ct) = row.split_at(cbc::BLOCK_SIZE);
        let iv: [u8; 16] = iv.try_into().expect("split at block size");
        cbc::decrypt(&self.key, &iv, ct)
    }
}

impl std::fmt::Debug for SearchKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.write_str("SearchKeys(..)")
    }
}
