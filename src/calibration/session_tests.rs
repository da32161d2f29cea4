use super::*;
use crate::calibration::state::{MaterialThreshold, ShapeThresholds};

fn reading(mean: f64) -> StableReading {
    StableReading {
        mean,
        local_sigma: 0.0,
        valid_samples: 10,
    }
}

/// Feed `means` into the current class after confirming it
fn collect_class(
    session: &mut CalibrationSession,
    means: &[f64],
) -> Result<SessionPhase, CalibrationError> {
    session.begin_collection()?;
    let mut phase = session.phase();
    for &mean in means {
        phase = session.record_reading(&reading(mean))?;
    }
    Ok(phase)
}

#[test]
fn test_new_session_awaits_first_class() {
    let session = CalibrationSession::new(CalibrationKind::Shape, 50);
    assert_eq!(
        session.phase(),
        SessionPhase::AwaitingUser {
            class: ReferenceClass::Flat
        }
    );
    assert_eq!(session.readings_per_class(), 50);
    assert!(matches!(session.outcome(), Err(CalibrationError::NotComplete)));
}

#[test]
fn test_collecting_counts_readings() {
    let mut session = CalibrationSession::new(CalibrationKind::Material, 4);
    session.begin_collection().unwrap();

    let phase = session.record_reading(&reading(20.0)).unwrap();
    assert_eq!(
        phase,
        SessionPhase::Collecting {
            class: ReferenceClass::Reflective,
            collected: 1,
            needed: 4
        }
    );
    assert_eq!(session.progress().percentage(), 25);
}

#[test]
fn test_failed_readings_count_but_add_no_mean() {
    let mut session = CalibrationSession::new(CalibrationKind::Material, 3);
    session.begin_collection().unwrap();
    session.record_reading(&StableReading::NO_READING).unwrap();
    session.record_reading(&reading(20.0)).unwrap();
    let phase = session.record_reading(&reading(20.2)).unwrap();

    assert_eq!(
        phase,
        SessionPhase::AwaitingUser {
            class: ReferenceClass::Absorbent
        }
    );
    // stdev of [20.0, 20.2] = 0.1414.. -> 0.141
    assert_eq!(session.class_sigmas()[0].sigma, 0.141);
}

#[test]
fn test_material_session_computes_midpoint() {
    let mut session = CalibrationSession::new(CalibrationKind::Material, 3);
    collect_class(&mut session, &[20.0, 20.1, 20.2]).unwrap();
    let phase = collect_class(&mut session, &[20.0, 20.3, 20.6]).unwrap();

    assert_eq!(phase, SessionPhase::Computed);
    let outcome = session.outcome().unwrap();
    // reflective 0.1, absorbent 0.3
    assert_eq!(
        outcome.thresholds,
        DerivedThresholds::Material(MaterialThreshold { tm: 0.2 })
    );
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.class_sigmas.len(), 2);
}

#[test]
fn test_zero_sigma_halts_session() {
    let mut session = CalibrationSession::new(CalibrationKind::Shape, 3);
    let err = collect_class(&mut session, &[25.0, 25.0, 25.0]).unwrap_err();

    assert_eq!(
        err,
        CalibrationError::DegenerateCalibrationData {
            class: ReferenceClass::Flat
        }
    );
    assert_eq!(
        session.phase(),
        SessionPhase::Halted {
            class: ReferenceClass::Flat
        }
    );
    assert!(matches!(
        session.begin_collection(),
        Err(CalibrationError::InvalidPhase { .. })
    ));
}

#[test]
fn test_insufficient_readings_halts_session() {
    let mut session = CalibrationSession::new(CalibrationKind::Material, 3);
    session.begin_collection().unwrap();
    session.record_reading(&StableReading::NO_READING).unwrap();
    session.record_reading(&StableReading::NO_READING).unwrap();
    let err = session.record_reading(&reading(20.0)).unwrap_err();

    assert_eq!(
        err,
        CalibrationError::InsufficientReadings {
            class: ReferenceClass::Reflective,
            collected: 1
        }
    );
    assert_eq!(session.phase().kind(), SessionPhaseKind::Halted);
}

#[test]
fn test_record_before_begin_is_invalid() {
    let mut session = CalibrationSession::new(CalibrationKind::Shape, 3);
    let err = session.record_reading(&reading(20.0)).unwrap_err();
    assert_eq!(
        err,
        CalibrationError::InvalidPhase {
            expected: SessionPhaseKind::Collecting,
            actual: SessionPhaseKind::AwaitingUser
        }
    );
}

#[test]
fn test_begin_twice_is_invalid() {
    let mut session = CalibrationSession::new(CalibrationKind::Shape, 3);
    session.begin_collection().unwrap();
    assert!(matches!(
        session.begin_collection(),
        Err(CalibrationError::InvalidPhase {
            expected: SessionPhaseKind::AwaitingUser,
            actual: SessionPhaseKind::Collecting
        })
    ));
}

#[test]
fn test_reset_discards_progress() {
    let mut session = CalibrationSession::new(CalibrationKind::Material, 2);
    collect_class(&mut session, &[20.0, 20.2]).unwrap();
    session.reset();

    assert!(session.class_sigmas().is_empty());
    assert_eq!(
        session.phase(),
        SessionPhase::AwaitingUser {
            class: ReferenceClass::Reflective
        }
    );
}

#[test]
fn test_run_session_reference_values() {
    let sigmas = [0.10, 0.20, 0.30];
    let mut calls = Vec::new();
    let outcome = run_calibration_session(CalibrationKind::Shape, |class| {
        calls.push(class);
        Ok(sigmas[calls.len() - 1])
    })
    .unwrap();

    assert_eq!(
        calls,
        vec![
            ReferenceClass::Flat,
            ReferenceClass::SlightlyCurved,
            ReferenceClass::CurvedIrregular
        ]
    );
    assert_eq!(
        outcome.thresholds,
        DerivedThresholds::Shape(ShapeThresholds { t1: 0.15, t2: 0.25 })
    );
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_run_session_degenerate_halts() {
    let result = run_calibration_session(CalibrationKind::Shape, |class| {
        Ok(if class == ReferenceClass::SlightlyCurved {
            0.0
        } else {
            0.1
        })
    });
    assert_eq!(
        result.unwrap_err(),
        CalibrationError::DegenerateCalibrationData {
            class: ReferenceClass::SlightlyCurved
        }
    );
}

#[test]
fn test_run_session_ordering_anomaly_not_fatal() {
    let mut sigmas = vec![0.30, 0.20, 0.40].into_iter();
    let outcome =
        run_calibration_session(CalibrationKind::Shape, |_| Ok(sigmas.next().unwrap())).unwrap();

    assert_eq!(outcome.warnings.len(), 1);
    assert!(matches!(
        outcome.warnings[0],
        CalibrationWarning::OrderingAnomaly {
            lower: ReferenceClass::Flat,
            upper: ReferenceClass::SlightlyCurved,
            ..
        }
    ));
    assert_eq!(
        outcome.thresholds,
        DerivedThresholds::Shape(ShapeThresholds { t1: 0.25, t2: 0.3 })
    );
}

#[test]
fn test_run_session_scan_failure_maps_to_class() {
    let result = run_calibration_session(CalibrationKind::Material, |class| {
        if class == ReferenceClass::Absorbent {
            Err(MeasurementError::InsufficientReadings {
                required: 2,
                collected: 0,
            })
        } else {
            Ok(0.05)
        }
    });
    assert_eq!(
        result.unwrap_err(),
        CalibrationError::InsufficientReadings {
            class: ReferenceClass::Absorbent,
            collected: 0
        }
    );
}
