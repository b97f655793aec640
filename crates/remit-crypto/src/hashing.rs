/// 32-byte BLAKE3 digest.
pub type Digest = [u8; 32];

/// One-shot BLAKE3 over a fully assembled input.
pub fn hash(data: &[u8]) -> Digest {
    *blake3::hash(data).as_bytes()
}

/// Length prefix used by every variable-length field fed into a hasher.
pub(crate) fn len_prefix(len: usize) -> [u8; 4] {
    (len as u32).to_le_bytes()
}
