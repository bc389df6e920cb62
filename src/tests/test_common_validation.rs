use std::time::Duration;

use crate::{
    AccessControllerOptions, ExpectedConcurrency, MAX_DURATION, SweepInterval, VisitGateError,
    VisitLimit, WindowDuration,
};

#[test]
fn window_duration_try_from_validates_nonzero() {
    let w = WindowDuration::try_from(Duration::from_secs(30)).unwrap();
    assert_eq!(*w, Duration::from_secs(30));

    let err = WindowDuration::try_from(Duration::ZERO).unwrap_err();
    assert!(matches!(err, VisitGateError::InvalidWindowDuration(_)));
    assert_eq!(
        err.to_string(),
        "invalid window duration: Window duration must be greater than 0"
    );
}

#[test]
fn sweep_interval_try_from_validates_nonzero() {
    let s = SweepInterval::try_from(Duration::from_millis(1)).unwrap();
    assert_eq!(*s, Duration::from_millis(1));

    assert!(matches!(
        SweepInterval::try_from(Duration::ZERO).unwrap_err(),
        VisitGateError::InvalidSweepInterval(_)
    ));
}

#[test]
fn durations_beyond_max_are_rejected() {
    assert_eq!(*WindowDuration::try_from(MAX_DURATION).unwrap(), MAX_DURATION);
    assert_eq!(*SweepInterval::try_from(MAX_DURATION).unwrap(), MAX_DURATION);

    let just_over = MAX_DURATION + Duration::from_nanos(1);
    for value in [just_over, Duration::MAX] {
        assert!(matches!(
            WindowDuration::try_from(value).unwrap_err(),
            VisitGateError::InvalidWindowDuration(_)
        ));
        assert!(matches!(
            SweepInterval::try_from(value).unwrap_err(),
            VisitGateError::InvalidSweepInterval(_)
        ));
    }
}

#[test]
fn visit_limit_try_from_validates_min_1() {
    assert_eq!(*VisitLimit::try_from(1).unwrap(), 1);

    assert!(matches!(
        VisitLimit::try_from(0).unwrap_err(),
        VisitGateError::InvalidVisitLimit(_)
    ));
}

#[test]
fn expected_concurrency_default_and_try_from_validate_min_1() {
    assert_eq!(*ExpectedConcurrency::default(), 1000);
    assert_eq!(*ExpectedConcurrency::try_from(5).unwrap(), 5);

    assert!(matches!(
        ExpectedConcurrency::try_from(0).unwrap_err(),
        VisitGateError::InvalidExpectedConcurrency(_)
    ));
}

#[test]
fn options_validate_rejects_sweep_longer_than_window() {
    let mut options = AccessControllerOptions {
        window: WindowDuration::try_from(Duration::from_secs(10)).unwrap(),
        sweep_interval: SweepInterval::try_from(Duration::from_secs(10)).unwrap(),
        limit: VisitLimit::try_from(3).unwrap(),
        expected_concurrency: ExpectedConcurrency::default(),
    };
    assert!(options.validate().is_ok());

    options.sweep_interval = SweepInterval::try_from(Duration::from_millis(10_001)).unwrap();
    assert!(matches!(
        options.validate().unwrap_err(),
        VisitGateError::InvalidSweepInterval(_)
    ));
}
