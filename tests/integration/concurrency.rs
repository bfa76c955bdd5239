//! Several writers sharing one hive file.
//!
//! Each `FileHive` call holds the hive's lock file for its whole
//! load-modify-save cycle, so writers in different threads (or processes)
//! never lose each other's updates.

use dutil::dependency::{DependencyAttributes, DependencyList, DependencyStore};
use dutil::registry::{FileHive, RegistryRoot};
use dutil::test_utils::TestHive;
use std::time::Duration;

const WRITERS: usize = 8;

#[test]
fn test_concurrent_dependents_all_recorded() {
    let test_hive = TestHive::new();
    test_hive
        .store(RegistryRoot::LocalMachine)
        .register_dependency("Shared", "1.0", "Shared", None, DependencyAttributes::empty())
        .unwrap();

    std::thread::scope(|scope| {
        for writer in 0..WRITERS {
            let path = test_hive.path().to_path_buf();
            scope.spawn(move || {
                let hive = FileHive::new(path).with_lock_timeout(Duration::from_secs(60));
                let store = DependencyStore::new(&hive, RegistryRoot::LocalMachine);
                store
                    .register_dependent(
                        "Shared",
                        &format!("App{writer}"),
                        None,
                        None,
                        DependencyAttributes::empty(),
                    )
                    .unwrap();
            });
        }
    });

    let mut dependents = DependencyList::new();
    test_hive
        .store(RegistryRoot::LocalMachine)
        .check_dependents("Shared", None, &mut dependents)
        .unwrap();
    assert_eq!(dependents.len(), WRITERS);
}

#[test]
fn test_concurrent_uninstalls_clean_up_once() {
    let test_hive = TestHive::new();
    let store = test_hive.store(RegistryRoot::LocalMachine);
    for writer in 0..WRITERS {
        store
            .register_dependent(
                "Shared",
                &format!("App{writer}"),
                None,
                None,
                DependencyAttributes::empty(),
            )
            .unwrap();
    }

    std::thread::scope(|scope| {
        for writer in 0..WRITERS {
            let path = test_hive.path().to_path_buf();
            scope.spawn(move || {
                let hive = FileHive::new(path).with_lock_timeout(Duration::from_secs(60));
                DependencyStore::new(&hive, RegistryRoot::LocalMachine)
                    .unregister_dependent("Shared", &format!("App{writer}"))
                    .unwrap();
            });
        }
    });

    assert!(!store.provider_exists("Shared").unwrap());
}
