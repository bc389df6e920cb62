use std::{sync::Arc, time::Duration};

use crate::{
    AccessController, AccessControllerOptions, ExpectedConcurrency, Ipv4KeyEncoder, ManualClock,
    SweepInterval, VisitLimit, WindowDuration,
};

fn controller(limit: usize, expected: usize) -> (AccessController, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let controller = AccessController::with_parts(
        AccessControllerOptions {
            window: WindowDuration::try_from(Duration::from_secs(30)).unwrap(),
            sweep_interval: SweepInterval::try_from(Duration::from_secs(1)).unwrap(),
            limit: VisitLimit::try_from(limit).unwrap(),
            expected_concurrency: ExpectedConcurrency::try_from(expected).unwrap(),
        },
        clock.clone(),
        Arc::new(Ipv4KeyEncoder),
    )
    .unwrap();
    controller.stop_sweeper();

    (controller, clock)
}

#[test]
fn pool_below_twice_expected_is_never_compacted() {
    let (controller, clock) = controller(1, 4);

    for key in 1..=7 {
        assert!(controller.try_admit(key));
    }
    clock.advance(Duration::from_secs(31));
    assert_eq!(controller.drop_expired_once(), 7);

    assert_eq!(controller.pool_len(), 7);
    assert!(!controller.needs_compaction());
    assert!(!controller.compact());
    assert_eq!(controller.pool_len(), 7);
}

#[test]
fn small_skew_does_not_trigger_compaction() {
    let (controller, clock) = controller(1, 2);

    // 4 keys drain, 2 stay: active * 2 == free.
    for key in 1..=4 {
        assert!(controller.try_admit(key));
    }
    clock.advance(Duration::from_secs(20));
    assert!(controller.try_admit(5));
    assert!(controller.try_admit(6));
    clock.advance(Duration::from_secs(11));

    assert_eq!(controller.drop_expired_once(), 4);
    assert_eq!(controller.free_slot_count(), 4);
    assert!(!controller.needs_compaction());
    assert!(!controller.compact());
}

#[test]
fn compaction_packs_active_windows_and_keeps_their_history() {
    let (controller, clock) = controller(2, 2);

    for key in 1..=8 {
        assert!(controller.try_admit(key));
    }
    clock.advance(Duration::from_secs(20));
    for key in [9, 10] {
        assert!(controller.try_admit(key));
        assert!(controller.try_admit(key));
    }
    assert_eq!(controller.pool_len(), 10);

    clock.advance(Duration::from_secs(11));
    assert_eq!(controller.drop_expired_once(), 8);
    assert!(controller.needs_compaction());
    assert!(controller.compact());

    // max(expected, 2 × active) = max(2, 4)
    assert_eq!(controller.pool_len(), 4);
    assert_eq!(controller.free_slot_count(), 2);
    assert_eq!(controller.active_keys(), 2);
    assert!(controller.state().partition_holds());

    let mut slots = [9, 10].map(|key| controller.state().slot_of(key).unwrap());
    slots.sort_unstable();
    assert_eq!(slots, [0, 1]);

    for key in [9, 10] {
        assert_eq!(controller.used_size(key), Some(2));
        assert!(!controller.try_admit(key));
    }

    // New keys land in the recycled tail.
    assert!(controller.try_admit(11));
    assert!(controller.try_admit(12));
    assert_eq!(controller.pool_len(), 4);
    assert!(controller.state().partition_holds());
}

#[test]
fn compaction_with_no_active_keys_shrinks_to_expected() {
    let (controller, clock) = controller(1, 3);

    for key in 1..=30 {
        assert!(controller.try_admit(key));
    }
    clock.advance(Duration::from_secs(31));

    let report = controller.sweep().unwrap();
    assert_eq!(report.reclaimed_keys, 30);
    assert!(report.compacted);
    assert_eq!(report.pool_len, 3);
    assert_eq!(report.active_keys, 0);
    assert_eq!(controller.free_slot_count(), 3);
    assert!(controller.state().partition_holds());
}

#[test]
fn pool_converges_to_expected_size_under_one_shot_key_churn() {
    let (controller, clock) = controller(5, 100);

    for round in 0..5_u64 {
        for i in 0..2_000_u64 {
            assert!(controller.try_admit(1 + round * 2_000 + i));
        }
        clock.advance(Duration::from_secs(10));
        controller.sweep().unwrap();
    }

    // 10,000 distinct keys have been seen; let the last ones age out.
    clock.advance(Duration::from_secs(31));
    controller.sweep().unwrap();

    assert_eq!(controller.active_keys(), 0);
    assert_eq!(controller.pool_len(), 100);
    assert!(controller.state().partition_holds());
}
