//! Install/uninstall sequences against a persistent hive.

use dutil::core::{DutilError, LibraryContext};
use dutil::dependency::{Dependency, DependencyAttributes, DependencyList, DependencyStore};
use dutil::dict::{DictFlags, StringDict};
use dutil::registry::{FileHive, RegKey, RegistryBackend, RegistryRoot};
use dutil::test_utils::{TestHive, init_test_logging, seed_bundle};
use dutil::version::FourPartVersion;

const NONE: DependencyAttributes = DependencyAttributes::empty();

fn check_all(
    store: &DependencyStore<'_>,
    keys: &[&str],
    min: Option<&str>,
    attributes: DependencyAttributes,
) -> DependencyList {
    let min = min.map(|v| FourPartVersion::parse(v).unwrap());
    let mut seen =
        StringDict::create_string_list(keys.len(), DictFlags::CASE_INSENSITIVE).unwrap();
    let mut failed = DependencyList::new();
    for key in keys {
        match store.check_dependency(key, min, None, attributes, &mut seen, &mut failed) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => panic!("unexpected failure checking {key}: {e}"),
        }
    }
    failed
}

#[test]
fn test_registrations_survive_reopening_the_hive() {
    init_test_logging(None);
    let test_hive = TestHive::new();
    seed_bundle(&test_hive.hive, RegistryRoot::LocalMachine).unwrap();

    // a fresh handle on the same file, as a later installer run would have
    let reopened = FileHive::new(test_hive.path());
    let store = DependencyStore::new(&reopened, RegistryRoot::LocalMachine);

    let info = store.get_provider_information("Runtime").unwrap();
    assert_eq!(info.id.as_deref(), Some("{RUNTIME}"));
    assert_eq!(info.name.as_deref(), Some("Shared Runtime"));
    assert_eq!(info.version, Some(FourPartVersion::new(4, 8, 0, 0)));

    let mut dependents = DependencyList::new();
    store.check_dependents("Runtime", None, &mut dependents).unwrap();
    assert_eq!(
        dependents.into_vec(),
        vec![
            Dependency::new("AppOne", Some("Application One".to_string())),
            Dependency::new("AppTwo", None),
        ]
    );
}

#[test]
fn test_sweep_collects_each_problem_once() {
    let test_hive = TestHive::new();
    let store = seed_bundle(&test_hive.hive, RegistryRoot::LocalMachine).unwrap();

    let failed = check_all(
        &store,
        &["Runtime", "Missing", "Legacy", "AppOne", "missing"],
        Some("2.0"),
        DependencyAttributes::MIN_VERSION_INCLUSIVE,
    );

    assert_eq!(
        failed.into_vec(),
        vec![
            Dependency::new("Missing", None),
            Dependency::new("Legacy", None),
            Dependency::new("AppOne", Some("Application One".to_string())),
        ]
    );
}

#[test]
fn test_scopes_do_not_mix() {
    let test_hive = TestHive::new();
    seed_bundle(&test_hive.hive, RegistryRoot::CurrentUser).unwrap();

    let machine = test_hive.store(RegistryRoot::LocalMachine);
    assert!(!machine.provider_exists("Runtime").unwrap());
    let err = machine.check_dependents("Runtime", None, &mut DependencyList::new()).unwrap_err();
    assert!(matches!(err, DutilError::CorruptStore { .. }));

    let user = test_hive.store(RegistryRoot::CurrentUser);
    assert!(user.provider_exists("Runtime").unwrap());
}

#[test]
fn test_full_uninstall_leaves_no_trace() {
    let test_hive = TestHive::new();
    let store = test_hive.store(RegistryRoot::LocalMachine);

    // ProviderB's installer registers a dependency on ProviderA without
    // ProviderA having published anything
    store.register_dependent("ProviderA", "ProviderB", Some("1.0"), None, NONE).unwrap();
    store.register_dependent("ProviderA", "ProviderC", None, None, NONE).unwrap();

    store.unregister_dependent("ProviderA", "ProviderB").unwrap();
    assert!(store.provider_exists("ProviderA").unwrap());
    assert!(store.dependent_exists("ProviderA", "ProviderC").unwrap());

    store.unregister_dependent("ProviderA", "ProviderC").unwrap();
    assert!(!store.provider_exists("ProviderA").unwrap());

    // nothing but the empty dependency root remains
    let root = RegKey::open(
        &test_hive.hive,
        RegistryRoot::LocalMachine,
        dutil::constants::DEPENDENCY_REGISTRY_ROOT,
    )
    .unwrap();
    assert_eq!(root.query_info().unwrap().subkeys, 0);

    // repeating every step is harmless
    store.unregister_dependent("ProviderA", "ProviderC").unwrap();
    store.unregister_dependency("ProviderA").unwrap();
}

#[test]
fn test_provider_upgrade_rewrites_metadata() {
    let test_hive = TestHive::new();
    let store = test_hive.store(RegistryRoot::LocalMachine);

    store.register_dependency("P", "1.0", "Old Name", Some("{OLD}"), NONE).unwrap();
    store.register_dependent("P", "D", Some("1.0"), None, NONE).unwrap();
    store.register_dependency("P", "2.0", "New Name", None, NONE).unwrap();

    let info = store.get_provider_information("P").unwrap();
    assert_eq!(info.version, Some(FourPartVersion::new(2, 0, 0, 0)));
    assert_eq!(info.name.as_deref(), Some("New Name"));
    // id is only written when supplied
    assert_eq!(info.id.as_deref(), Some("{OLD}"));
    assert!(store.dependent_exists("P", "D").unwrap());
}

#[test]
fn test_end_to_end_scenario() {
    let test_hive = TestHive::new();
    let store = test_hive.store(RegistryRoot::LocalMachine);
    let min_inclusive = DependencyAttributes::MIN_VERSION_INCLUSIVE;

    store.register_dependency("ProviderA", "2.5.0.0", "Package A", None, NONE).unwrap();
    store
        .register_dependent("ProviderA", "ProviderB", Some("2.0.0.0"), None, min_inclusive)
        .unwrap();

    let failed = check_all(&store, &["ProviderA"], Some("2.0.0.0"), min_inclusive);
    assert!(failed.is_empty());

    let mut dependents = DependencyList::new();
    store.check_dependents("ProviderA", None, &mut dependents).unwrap();
    assert_eq!(dependents.into_vec(), vec![Dependency::new("ProviderB", None)]);

    store.unregister_dependent("ProviderA", "ProviderB").unwrap();
    assert!(store.provider_exists("ProviderA").unwrap());
    store.unregister_dependency("ProviderA").unwrap();
    assert!(!store.provider_exists("ProviderA").unwrap());
}

#[test]
fn test_library_context_over_file_hive() {
    let test_hive = TestHive::new();
    let context = LibraryContext::new(FileHive::new(test_hive.path()));

    assert!(context.store(RegistryRoot::LocalMachine).is_err());
    context.initialize();
    context
        .store(RegistryRoot::LocalMachine)
        .unwrap()
        .register_dependency("P", "1.0", "P", None, NONE)
        .unwrap();
    context.uninitialize();

    let provider = format!(r"{}\P", dutil::constants::DEPENDENCY_REGISTRY_ROOT);
    assert!(test_hive.hive.key_exists(RegistryRoot::LocalMachine, &provider).unwrap());
}
