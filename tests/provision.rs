use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use gis_harvest::domain::MonthStamp;
use gis_harvest::error::HarvestError;
use gis_harvest::provision::PathProvisioner;

fn temp_base(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
}

#[test]
fn provisioning_twice_in_a_month_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp_base(&temp);
    let stamp = MonthStamp::new(2024, 3).unwrap();

    let first = PathProvisioner.provision_for(&base, stamp).unwrap();
    fs::write(first.join("Assessor_Book.zip").as_std_path(), b"earlier").unwrap();
    let second = PathProvisioner.provision_for(&base, stamp).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, base.join("2024_03"));
    assert_eq!(
        fs::read(second.join("Assessor_Book.zip").as_std_path()).unwrap(),
        b"earlier"
    );
}

#[test]
fn missing_base_is_not_created() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp_base(&temp).join("Roads");

    let err = PathProvisioner
        .provision_for(&base, MonthStamp::new(2024, 3).unwrap())
        .unwrap_err();

    assert_matches!(err, HarvestError::DirectoryProvision(_));
    assert!(!base.as_std_path().exists());
}

#[test]
fn base_that_is_a_file_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp_base(&temp).join("Roads");
    fs::write(base.as_std_path(), b"not a directory").unwrap();

    let err = PathProvisioner
        .provision_for(&base, MonthStamp::new(2024, 3).unwrap())
        .unwrap_err();
    assert_matches!(err, HarvestError::DirectoryProvision(_));
}

#[test]
fn stamp_occupied_by_a_file_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp_base(&temp);
    fs::write(base.join("2024_03").as_std_path(), b"").unwrap();

    let err = PathProvisioner
        .provision_for(&base, MonthStamp::new(2024, 3).unwrap())
        .unwrap_err();
    assert_matches!(err, HarvestError::DirectoryProvision(_));
}

#[test]
fn provision_uses_current_month() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp_base(&temp);

    let before = MonthStamp::current();
    let resolved = PathProvisioner.provision(&base).unwrap();
    let after = MonthStamp::current();

    let name = resolved.file_name().unwrap();
    assert!(name == before.to_string() || name == after.to_string());
    assert!(resolved.as_std_path().is_dir());
}
