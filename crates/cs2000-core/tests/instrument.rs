mod common;

use common::MockDevice;
use cs2000_core::config::InitConfig;
use cs2000_core::instrument::{Cs2000, FailurePolicy, InitStep, SyncMode};
use cs2000_core::protocol::ProtocolError;
use cs2000_core::simulator::SimulatedCs2000;
use pretty_assertions::assert_eq;

fn healthy_meter() -> MockDevice {
    MockDevice::new()
        .on("RMTS,1", &["OK00\n"])
        .on("MSWE,0", &["OK00\n"])
        .on("SCMS,1,6000", &["OK00\n"])
        .on("SCMR", &["OK00,1,6000\n"])
        .on("MEAS,1", &["OK00,1.5\n", "OK00\n"])
        .on("MEDR,2,0,101", &["OK00,123.45\n"])
        .on("MEDR,2,0,2", &["OK00,0.3127,0.3290,123.45\n"])
}

#[test]
fn test_get_luminance_end_to_end() {
    let mock = healthy_meter();
    let mut meter = Cs2000::new(mock.connect());

    let lv = meter.get_luminance().unwrap();
    assert_eq!(lv.lv, "123.45");
    assert_eq!(mock.sent(), "MEAS,1\nMEDR,2,0,101\n");
}

#[test]
fn test_get_chromaticity_and_luminance_end_to_end() {
    let mock = healthy_meter();
    let mut meter = Cs2000::new(mock.connect());

    let reading = meter.get_chromaticity_and_luminance().unwrap();
    assert_eq!(reading.x, "0.3127");
    assert_eq!(reading.y, "0.3290");
    assert_eq!(reading.lv, "123.45");
    assert_eq!(reading.values(), Some((0.3127, 0.3290, 123.45)));
}

#[test]
fn test_read_luminance_non_ok_status() {
    let mock = MockDevice::new().on("MEDR,2,0,101", &["ER00\n"]);
    let mut meter = Cs2000::new(mock.connect());

    let err = meter.read_luminance().unwrap_err();
    assert_eq!(err.device_code(), Some("ER00"));
}

#[test]
fn test_read_luminance_short_payload() {
    let mock = MockDevice::new().on("MEDR,2,0,101", &["OK00\n"]);
    let mut meter = Cs2000::new(mock.connect());

    let err = meter.read_luminance().unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidResponse { .. }));
}

#[test]
fn test_read_sync_mode_error_status() {
    let mock = MockDevice::new().on("SCMR", &["NG01\n"]);
    let mut meter = Cs2000::new(mock.connect());

    let err = meter.read_sync_mode().unwrap_err();
    assert_eq!(err.device_code(), Some("NG01"));
}

#[test]
fn test_read_sync_mode_variants() {
    for (reply, mode, hz) in [
        ("OK00,1,6000\n", SyncMode::Internal, Some("60")),
        ("OK00,0\n", SyncMode::NoSync, None),
        ("OK00,2\n", SyncMode::External, None),
    ] {
        let mock = MockDevice::new().on("SCMR", &[reply]);
        let mut meter = Cs2000::new(mock.connect());
        let reading = meter.read_sync_mode().unwrap();
        assert_eq!(reading.mode, mode);
        assert_eq!(reading.frequency_hz(), hz);
    }
}

#[test]
fn test_initialize_sends_sequence_in_order() {
    let mock = healthy_meter();
    let mut meter = Cs2000::new(mock.connect());

    let report = meter.initialize(&InitConfig::default()).unwrap();
    assert!(report.is_success());
    assert_eq!(
        mock.sent_lines(),
        vec!["RMTS,1", "MSWE,0", "SCMS,1,6000", "SCMR"]
    );
    assert_eq!(report.sync.unwrap().mode, SyncMode::Internal);
}

#[test]
fn test_initialize_uses_configured_frequency() {
    let mock = healthy_meter().on("SCMS,1,5000", &["OK00\n"]);
    let mut meter = Cs2000::new(mock.connect());

    let init = InitConfig {
        sync_frequency_hz: 50,
        ..InitConfig::default()
    };
    meter.initialize(&init).unwrap();
    assert!(mock.sent_lines().contains(&"SCMS,1,5000".to_string()));
}

#[test]
fn test_initialize_continues_after_failure() {
    let mock = healthy_meter().on("RMTS,1", &["ER00\n"]).on("SCMR", &["NG01\n"]);
    let mut meter = Cs2000::new(mock.connect());

    let report = meter.initialize(&InitConfig::default()).unwrap();
    assert_eq!(mock.sent_lines().len(), 4);
    assert!(!report.is_success());
    let failed: Vec<InitStep> = report.failures().map(|s| s.step).collect();
    assert_eq!(failed, vec![InitStep::SetRemoteMode, InitStep::ReadSyncMode]);
    assert!(report.sync.is_none());
}

#[test]
fn test_initialize_aborts_on_first_failure() {
    let mock = healthy_meter().on("MSWE,0", &["ER00\n"]);
    let mut meter = Cs2000::new(mock.connect());

    let init = InitConfig {
        failure_policy: FailurePolicy::Abort,
        ..InitConfig::default()
    };
    let err = meter.initialize(&init).unwrap_err();
    assert_eq!(err.device_code(), Some("ER00"));
    assert_eq!(mock.sent_lines(), vec!["RMTS,1", "MSWE,0"]);
}

#[test]
fn test_measure_reads_both_replies_on_failure() {
    let mock = healthy_meter()
        .on("MEAS,1", &["ER00\n", "OK00\n"])
        .on("SCMR", &["OK00,0\n"]);
    let mut meter = Cs2000::new(mock.connect());

    assert!(meter.measure().is_err());
    // Completion reply was consumed, so the next exchange stays in step
    assert_eq!(meter.read_sync_mode().unwrap().mode, SyncMode::NoSync);
}

#[test]
fn test_read_follows_failed_trigger_by_default() {
    let mock = healthy_meter().on("MEAS,1", &["OK00,1.5\n", "ER00\n"]);
    let mut meter = Cs2000::new(mock.connect());

    let lv = meter.get_luminance().unwrap();
    assert_eq!(lv.lv, "123.45");
    assert_eq!(mock.sent_lines(), vec!["MEAS,1", "MEDR,2,0,101"]);
}

#[test]
fn test_abort_policy_skips_read_after_failed_trigger() {
    let mock = healthy_meter().on("MEAS,1", &["ER00\n", "OK00\n"]);
    let mut meter = Cs2000::new(mock.connect()).with_policy(FailurePolicy::Abort);

    assert!(meter.get_luminance().is_err());
    assert_eq!(mock.sent_lines(), vec!["MEAS,1"]);
}

#[test]
fn test_initialize_sets_read_policy() {
    let mock = healthy_meter().on("MEAS,1", &["ER00\n", "OK00\n"]);
    let mut meter = Cs2000::new(mock.connect());
    assert_eq!(meter.policy(), FailurePolicy::Continue);

    let init = InitConfig {
        failure_policy: FailurePolicy::Abort,
        ..InitConfig::default()
    };
    meter.initialize(&init).unwrap();
    assert_eq!(meter.policy(), FailurePolicy::Abort);

    assert!(meter.get_luminance().is_err());
    assert_eq!(mock.sent_lines().last().map(String::as_str), Some("MEAS,1"));
}

#[test]
fn test_simulator_session() {
    let sim = SimulatedCs2000::with_seed(42).with_target(0.31, 0.33, 80.0);
    let mut meter = Cs2000::new(sim.connect());

    let report = meter.initialize(&InitConfig::default()).unwrap();
    assert!(report.is_success());

    let lv = meter.get_luminance().unwrap().value().unwrap();
    assert!((79.0..=81.0).contains(&lv));

    let (x, y, _) = meter
        .get_chromaticity_and_luminance()
        .unwrap()
        .values()
        .unwrap();
    assert!((x - 0.31).abs() < 0.001);
    assert!((y - 0.33).abs() < 0.001);

    meter.close().unwrap();
    assert!(meter.close().is_err());
}

#[test]
fn test_simulator_without_remote_mode_fails_reads() {
    let mut meter = Cs2000::new(SimulatedCs2000::with_seed(1).connect());
    assert!(meter.get_luminance().is_err());
}
