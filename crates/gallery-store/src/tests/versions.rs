//! Creation, version ledger and restore tests.

use super::{at, backends, codes, fixture};
use crate::{ErrorKind, NewEffect, ParentRef, StoreError};

#[test]
fn create_has_single_version() {
    for backend in backends() {
        let repo = &backend.repo;
        let id = repo
            .create_effect(NewEffect::fork(10, 5, "user", "first"))
            .unwrap();

        let effect = repo.get_effect(id).unwrap();
        assert_eq!(codes(&effect), vec!["first"], "{}", backend.name);
        assert_eq!(effect.parent, Some(ParentRef { id: 10, version: 5 }));
        assert_eq!(effect.owner, "user");
        assert!(!effect.hidden);
        assert_eq!(effect.latest_version_number(), Some(0));
    }
}

#[test]
fn sequential_appends_are_contiguous() {
    for backend in backends() {
        let repo = &backend.repo;
        let id = repo.create_effect(NewEffect::root("ana", "v0")).unwrap();

        let numbers: Vec<i64> = (1..=12)
            .map(|i| repo.append_version(id, &format!("v{i}")).unwrap())
            .collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<_>>(), "{}", backend.name);

        let effect = repo.get_effect(id).unwrap();
        assert_eq!(effect.versions.len(), 13);
        for (n, version) in effect.versions.iter().enumerate() {
            assert_eq!(version.code, format!("v{n}"));
        }
        assert_eq!(effect.version(12).unwrap().code, "v12");
    }
}

#[test]
fn append_to_missing_effect_is_not_found() {
    for backend in backends() {
        let repo = &backend.repo;
        repo.create_effect(NewEffect::root("ana", "a")).unwrap();

        let err = repo.append_version(2, "invalid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{}", backend.name);
        assert!(repo.get_effect(2).unwrap_err().is_not_found());
        assert_eq!(repo.count(true).unwrap(), 1);
    }
}

#[test]
fn restore_keeps_effect_verbatim() {
    for backend in backends() {
        let repo = &backend.repo;
        let mut effect = fixture(10141, 1_366_033_527_000, Some(10140), &["a", "b", "c"]);
        effect.hidden = true;
        effect.modified_at = effect.versions[2].created_at;

        repo.restore_effect(&effect).unwrap();
        assert_eq!(repo.get_effect(10141).unwrap(), effect, "{}", backend.name);

        // Appends continue the restored ledger.
        assert_eq!(repo.append_version(10141, "d").unwrap(), 3);
    }
}

#[test]
fn restore_rejects_taken_id() {
    for backend in backends() {
        let repo = &backend.repo;
        repo.restore_effect(&fixture(7, 1_000, None, &["original"]))
            .unwrap();

        let err = repo
            .restore_effect(&fixture(7, 2_000, None, &["replacement"]))
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)), "{}", backend.name);

        let kept = repo.get_effect(7).unwrap();
        assert_eq!(codes(&kept), vec!["original"]);
    }
}

#[test]
fn restore_rejects_malformed_effects() {
    for backend in backends() {
        let repo = &backend.repo;

        let err = repo.restore_effect(&fixture(3, 1_000, None, &[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", backend.name);

        let err = repo.restore_effect(&fixture(0, 1_000, None, &["x"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", backend.name);

        assert_eq!(repo.count(true).unwrap(), 0);
    }
}

#[test]
fn created_ids_follow_restored_ids() {
    for backend in backends() {
        let repo = &backend.repo;
        repo.restore_effect(&fixture(40, 1_000, None, &["x"])).unwrap();

        let id = repo.create_effect(NewEffect::root("ana", "y")).unwrap();
        assert_eq!(id, 41, "{}", backend.name);
    }
}

#[test]
fn restore_rejects_unrepresentable_dates() {
    for backend in backends() {
        let repo = &backend.repo;

        let late = fixture(5, 253_402_300_800_000, None, &["x"]);
        let err = repo.restore_effect(&late).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", backend.name);

        let mut early_version = fixture(6, 1_000, None, &["x"]);
        early_version.versions[0].created_at = at(-62_135_596_800_001);
        assert!(matches!(
            repo.restore_effect(&early_version),
            Err(StoreError::InvalidData(_))
        ));

        assert_eq!(repo.count(true).unwrap(), 0);
        assert!(repo.page(0, 10, true).unwrap().is_empty());
    }
}
