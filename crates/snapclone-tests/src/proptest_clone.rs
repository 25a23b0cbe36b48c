//! Property-based tests for the clone orchestrator over in-memory devices.

use std::collections::BTreeSet;

use proptest::prelude::*;
use snapclone_core::{CloneOptions, Cloner, DryRunProvider, DryRunRestorer, InMemoryDevices};

use crate::harness::{devices, snapshot_numbered, SOURCE_ID};
use crate::proptest_resolver::{expected, snapshot_numbers};

fn build(source: &BTreeSet<u32>, target: &BTreeSet<u32>) -> InMemoryDevices {
    devices(
        source.iter().copied().map(snapshot_numbered).collect(),
        vec![("t", target.iter().copied().map(snapshot_numbered).collect())],
    )
}

fn ids_newest_first(numbers: &BTreeSet<u32>) -> Vec<String> {
    numbers
        .iter()
        .rev()
        .map(|&n| snapshot_numbered(n).id)
        .collect()
}

proptest! {
    /// Test: a dry run succeeds exactly when the real clone does and changes nothing.
    #[test]
    fn test_dry_run_mirrors_real_clone(
        source in snapshot_numbers(10),
        target in snapshot_numbers(10),
        prune in any::<bool>(),
    ) {
        let dry_devices = build(&source, &target);
        let dry = Cloner::new(
            DryRunProvider::new(&dry_devices),
            DryRunRestorer::new(),
            CloneOptions::incremental(prune),
        );
        let dry_ok = dry.clone_volume(SOURCE_ID, "t").is_ok();
        prop_assert_eq!(dry_devices.snapshot_ids("t"), ids_newest_first(&target));
        prop_assert_eq!(dry_devices.volume("t").unwrap().name, "Offsite-t");
        prop_assert!(dry_devices.restores().is_empty());

        let real_devices = build(&source, &target);
        let real = Cloner::new(&real_devices, &real_devices, CloneOptions::incremental(prune));
        prop_assert_eq!(real.clone_volume(SOURCE_ID, "t").is_ok(), dry_ok);
    }

    /// Test: a successful incremental clone leaves target with source's newest
    /// snapshot on top, and prune removes exactly the common snapshot.
    #[test]
    fn test_clone_outcome(
        source in snapshot_numbers(10),
        target in snapshot_numbers(10),
        prune in any::<bool>(),
    ) {
        let d = build(&source, &target);
        let cloner = Cloner::new(&d, &d, CloneOptions::incremental(prune));
        let result = cloner.clone_volume(SOURCE_ID, "t");
        match expected(&source, &target) {
            Ok(common) => {
                prop_assert!(result.is_ok());
                let mut after = target.clone();
                if let Some(&newest) = source.iter().max() {
                    after.insert(newest);
                }
                if prune {
                    after.remove(&common);
                }
                prop_assert_eq!(d.snapshot_ids("t"), ids_newest_first(&after));
                prop_assert_eq!(d.volume("t").unwrap().name, "Offsite-t");
            }
            Err(_) => {
                prop_assert!(result.is_err());
                prop_assert!(d.restores().is_empty());
                prop_assert_eq!(d.snapshot_ids("t"), ids_newest_first(&target));
            }
        }
    }

    /// Test: checking cloneability twice without changes gives the same answer.
    #[test]
    fn test_cloneable_idempotent(
        source in snapshot_numbers(10),
        target in snapshot_numbers(10),
    ) {
        let d = build(&source, &target);
        let cloner = Cloner::new(&d, &d, CloneOptions::default());
        let targets = vec!["t".to_string()];
        let first = cloner.cloneable(SOURCE_ID, &targets).map_err(|e| e.to_string());
        let second = cloner.cloneable(SOURCE_ID, &targets).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
        prop_assert!(d.restores().is_empty());
    }
}
