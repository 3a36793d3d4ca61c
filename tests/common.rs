//! tests/common.rs
//! Keys, fixtures and envelope helpers shared across test files

#![allow(dead_code)] // each test crate uses a different subset

use backup_envelope::aliases::Iv16;
use backup_envelope::crypto::new_hmac;
use backup_envelope::decryptor::CbcDecryptReader;
use backup_envelope::encryptor::{encrypt_stream, write_iv, MacWriter};
use backup_envelope::{
    BackupConfig, BackupService, KeyMaterial, Pass, SourceFactory, StaticKeys,
};
use std::io::{self, Cursor, Read};

pub const TEST_CIPHER_KEY: [u8; 32] = [0x4B; 32];
pub const TEST_MAC_KEY: &[u8] = b"test mac key, distinct from the cipher key";

/// Small chunks so tests cross many chunk boundaries.
pub const TEST_CHUNK_SIZE: usize = 64;

pub fn test_keys() -> KeyMaterial {
    KeyMaterial::from_bytes(TEST_CIPHER_KEY, TEST_MAC_KEY).unwrap()
}

pub fn test_config() -> BackupConfig {
    BackupConfig::new().with_chunk_size(TEST_CHUNK_SIZE)
}

pub fn test_service() -> BackupService<StaticKeys> {
    BackupService::with_config(
        StaticKeys::new(TEST_CIPHER_KEY, TEST_MAC_KEY.to_vec()).unwrap(),
        test_config(),
    )
}

pub fn sample_records() -> Vec<Vec<u8>> {
    vec![
        b"{\"id\":1,\"title\":\"first entry\"}".to_vec(),
        Vec::new(),
        (0..2000u32).map(|i| (i % 97) as u8).collect(),
        b"last".to_vec(),
    ]
}

pub fn export_to_vec(records: &[Vec<u8>]) -> Vec<u8> {
    let mut envelope = Vec::new();
    test_service()
        .export_backup(records.to_vec().into_iter(), &mut envelope)
        .unwrap();
    envelope
}

/// Factory that serves the same bytes on every open.
pub fn memory_factory(bytes: Vec<u8>) -> impl SourceFactory {
    move || Ok::<_, io::Error>(Cursor::new(bytes.clone()))
}

/// Decrypt the ciphertext of `envelope` without checking the MAC.
///
/// Returns the padded gzip stream exactly as the cipher stage produced it.
pub fn decrypt_body(envelope: &[u8], keys: &KeyMaterial) -> Vec<u8> {
    let (iv, rest) = envelope.split_at(16);
    let body = &rest[..rest.len() - 32];
    let iv = Iv16::new(iv.try_into().unwrap());
    let mut reader = CbcDecryptReader::new(Cursor::new(body), keys.cipher_key(), &iv, 64, Pass::Decrypt);
    let mut plain = Vec::new();
    reader.read_to_end(&mut plain).unwrap();
    plain
}

/// Encrypt and authenticate arbitrary plaintext under `keys`.
///
/// Produces a MAC-valid envelope whose content did not come from export, for
/// exercising the post-authentication decoders.
pub fn seal(plaintext: &[u8], keys: &KeyMaterial) -> Vec<u8> {
    let iv = Iv16::new([0x5A; 16]);
    let mut writer = MacWriter::new(Vec::new(), new_hmac(keys.mac_key(), Pass::Export).unwrap());
    write_iv(&mut writer, &iv).unwrap();
    encrypt_stream(Cursor::new(plaintext), &mut writer, &iv, keys.cipher_key(), 64).unwrap();
    writer.finish().unwrap().0
}

/// Framed gzip member for `records`, as export would feed the padding stage.
pub fn gzip_framed(records: &[Vec<u8>]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    for record in records {
        gz.write_all(&(record.len() as u32).to_be_bytes()).unwrap();
        gz.write_all(record).unwrap();
    }
    gz.finish().unwrap()
}
