//! tests/service_tests.rs
//! Operation guard, configuration loading and key providers through the service

mod common;

use backup_envelope::{
    AccountSecret, BackupConfig, BackupError, BackupService, PassphraseKeys, StaticKeys,
};
use common::{export_to_vec, memory_factory, sample_records, test_service, TEST_CIPHER_KEY, TEST_MAC_KEY};
use std::cell::Cell;
use std::io::{self, Cursor, Read, Write};
use std::thread;

#[test]
fn second_operation_while_import_blocks_is_busy() {
    let service = test_service();
    let records = sample_records();
    let envelope = export_to_vec(&records);
    let (pipe_reader, mut pipe_writer) = pipe::pipe();

    thread::scope(|s| {
        let importer = s.spawn(|| {
            // pass 1 reads from the pipe, pass 2 from memory
            let first = Cell::new(Some(pipe_reader));
            let again = envelope.clone();
            let factory = move || -> io::Result<Box<dyn Read>> {
                match first.take() {
                    Some(reader) => Ok(Box::new(reader)),
                    None => Ok(Box::new(Cursor::new(again.clone()))),
                }
            };
            let mut restored: Vec<Vec<u8>> = Vec::new();
            service.import_backup(&factory, &mut restored).map(|_| restored)
        });

        while !service.is_busy() {
            thread::yield_now();
        }

        let mut sink = Vec::new();
        let err = service
            .export_backup(records.clone().into_iter(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, BackupError::Busy));
        assert!(sink.is_empty(), "rejected export must not write");

        let mut restored: Vec<Vec<u8>> = Vec::new();
        let err = service
            .import_backup(&memory_factory(envelope.clone()), &mut restored)
            .unwrap_err();
        assert!(matches!(err, BackupError::Busy));
        assert!(restored.is_empty());

        pipe_writer.write_all(&envelope).unwrap();
        drop(pipe_writer);

        let restored = importer.join().unwrap().unwrap();
        assert_eq!(restored, records, "first operation unaffected");
    });

    assert!(!service.is_busy());
}

#[test]
fn guard_released_after_failed_operations() {
    let service = test_service();
    let mut tampered = export_to_vec(&sample_records());
    tampered[20] ^= 0x01;

    let mut restored: Vec<Vec<u8>> = Vec::new();
    service
        .import_backup(&memory_factory(tampered), &mut restored)
        .unwrap_err();
    assert!(!service.is_busy());

    let mut sink = Vec::new();
    service
        .export_backup(sample_records().into_iter(), &mut sink)
        .unwrap();
    assert!(!service.is_busy());
}

#[test]
fn config_file_drives_the_service() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "chunk_size = 128\ncompression_level = 1").unwrap();

    let config = BackupConfig::load(file.path()).unwrap();
    assert_eq!(config.chunk_size, 128);
    assert_eq!(config.compression_level, 1);

    let service = BackupService::with_config(
        StaticKeys::new(TEST_CIPHER_KEY, TEST_MAC_KEY.to_vec()).unwrap(),
        config.clone(),
    );
    assert_eq!(service.config(), &config);

    let records = sample_records();
    let mut envelope = Vec::new();
    service
        .export_backup(records.clone().into_iter(), &mut envelope)
        .unwrap();
    let mut restored: Vec<Vec<u8>> = Vec::new();
    service
        .import_backup(&memory_factory(envelope), &mut restored)
        .unwrap();
    assert_eq!(restored, records);
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BackupConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, BackupError::Config(_)));
}

#[test]
fn passphrase_keys_roundtrip_and_isolate() {
    let salt = [0x21u8; 16];
    let exporter = BackupService::new(
        PassphraseKeys::with_iterations(AccountSecret::new("account secret".to_string()), salt, 10).unwrap(),
    );
    let records = sample_records();
    let mut envelope = Vec::new();
    exporter
        .export_backup(records.clone().into_iter(), &mut envelope)
        .unwrap();

    let same = BackupService::new(
        PassphraseKeys::with_iterations(AccountSecret::new("account secret".to_string()), salt, 10).unwrap(),
    );
    let mut restored: Vec<Vec<u8>> = Vec::new();
    same.import_backup(&memory_factory(envelope.clone()), &mut restored)
        .unwrap();
    assert_eq!(restored, records);

    let other = BackupService::new(
        PassphraseKeys::with_iterations(AccountSecret::new("other secret".to_string()), salt, 10).unwrap(),
    );
    let mut restored: Vec<Vec<u8>> = Vec::new();
    let err = other
        .import_backup(&memory_factory(envelope), &mut restored)
        .unwrap_err();
    assert!(err.is_authentication_failure());
    assert!(restored.is_empty());
}

#[test]
fn invalid_key_material_is_rejected_up_front() {
    let cases: Vec<(Vec<u8>, &str)> = vec![
        (Vec::new(), "empty MAC key"),
        (TEST_CIPHER_KEY.to_vec(), "MAC key equals cipher key"),
    ];
    for (mac_key, desc) in cases {
        let err = StaticKeys::new(TEST_CIPHER_KEY, mac_key).err().unwrap();
        assert!(matches!(err, BackupError::KeyMaterial(_)), "{desc}: {err:?}");
    }
}
