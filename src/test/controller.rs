use crate::proto::{ControllerState, Protocol, DUP_ACK_THRESHOLD};

#[test]
fn reno_slow_start_grows_one_per_ack() {
    let mut ctrl = ControllerState::default();
    assert_eq!(ctrl.cwnd, 1);
    assert!(ctrl.slow_start);

    for expected in 2..=8 {
        ctrl.on_new_ack(Protocol::Reno);
        assert_eq!(ctrl.cwnd, expected);
        assert!(ctrl.slow_start, "ssthresh is unset, must stay in slow start");
    }
}

#[test]
fn reno_crosses_into_congestion_avoidance_at_ssthresh() {
    let mut ctrl = ControllerState {
        cwnd: 4,
        ssthresh: 4,
        ..ControllerState::default()
    };

    ctrl.on_new_ack(Protocol::Reno);
    assert_eq!(ctrl.cwnd, 5);
    assert!(!ctrl.slow_start, "cwnd exceeded ssthresh");
}

#[test]
fn reno_congestion_avoidance_accumulates_partial_window() {
    let mut ctrl = ControllerState {
        cwnd: 4,
        ssthresh: 2,
        slow_start: false,
        ..ControllerState::default()
    };

    // 1/cwnd per ACK: four ACKs add exactly one packet to the window
    for _ in 0..3 {
        ctrl.on_new_ack(Protocol::Reno);
        assert_eq!(ctrl.cwnd, 4);
    }
    ctrl.on_new_ack(Protocol::Reno);
    assert_eq!(ctrl.cwnd, 5);
    assert_eq!(ctrl.partial_cwnd, 0);
}

#[test]
fn fast_recovery_halves_window_and_inflates_by_dup_count() {
    let mut ctrl = ControllerState {
        cwnd: 9,
        dup_ack_count: DUP_ACK_THRESHOLD,
        ..ControllerState::default()
    };

    ctrl.enter_fast_recovery();
    assert_eq!(ctrl.ssthresh, 4);
    assert_eq!(ctrl.cwnd, 4 + DUP_ACK_THRESHOLD as u64);
    assert!(!ctrl.slow_start);
    assert!(ctrl.awaiting_retransmit);

    ctrl.deflate_if_awaiting();
    assert_eq!(ctrl.cwnd, 4);
    assert!(!ctrl.awaiting_retransmit);

    // second deflation is a no-op
    ctrl.cwnd = 7;
    ctrl.deflate_if_awaiting();
    assert_eq!(ctrl.cwnd, 7);
}

#[test]
fn fast_recovery_ssthresh_floor_is_two() {
    let mut ctrl = ControllerState {
        cwnd: 1,
        dup_ack_count: DUP_ACK_THRESHOLD,
        ..ControllerState::default()
    };

    ctrl.enter_fast_recovery();
    assert_eq!(ctrl.ssthresh, 2);
    assert_eq!(ctrl.cwnd, 5);
}

#[test]
fn rtt_ewma_tracks_min_avg_and_deviation() {
    let mut ctrl = ControllerState::default();

    ctrl.on_rtt_sample(100, Protocol::Reno);
    assert_eq!(ctrl.rtt_min, Some(100));
    assert_eq!(ctrl.rtt_avg, Some(100.0));
    assert_eq!(ctrl.rtt_stddev, Some(100.0));

    ctrl.on_rtt_sample(200, Protocol::Reno);
    assert_eq!(ctrl.rtt_min, Some(100));
    let avg = ctrl.rtt_avg.expect("avg set");
    assert!((avg - 110.0).abs() < 1e-9);
    // deviation uses the freshly updated average
    let sd = ctrl.rtt_stddev.expect("stddev set");
    assert!((sd - 99.0).abs() < 1e-9);

    ctrl.on_rtt_sample(50, Protocol::Reno);
    assert_eq!(ctrl.rtt_min, Some(50));
}

#[test]
fn reno_ignores_rtt_samples_for_window_sizing() {
    let mut ctrl = ControllerState::default();
    ctrl.on_rtt_sample(100, Protocol::Reno);
    ctrl.on_rtt_sample(10, Protocol::Reno);
    assert_eq!(ctrl.cwnd, 1);
}

#[test]
fn fast_window_update_runs_on_rtt_samples() {
    let mut ctrl = ControllerState {
        cwnd: 10,
        ..ControllerState::default()
    };

    // base == avg: cwnd <- min(2*10, 0.5*10 + 0.5*(10 + 10)) = 15
    ctrl.on_rtt_sample(100, Protocol::Fast);
    // first sample: min=avg=100
    assert_eq!(ctrl.cwnd, 15);
}

#[test]
fn fast_window_update_is_capped_at_doubling() {
    let mut ctrl = ControllerState::default();

    // cwnd = 1, equal RTTs: target (0.5 + 0.5*(1 + 10)) = 6 caps at 2*1
    ctrl.on_rtt_sample(100, Protocol::Fast);
    assert_eq!(ctrl.cwnd, 2);
    ctrl.on_rtt_sample(100, Protocol::Fast);
    assert_eq!(ctrl.cwnd, 4);
}

#[test]
fn fast_window_backs_off_when_rtt_inflates() {
    let mut ctrl = ControllerState {
        cwnd: 40,
        ..ControllerState::default()
    };
    ctrl.rtt_min = Some(100);
    ctrl.rtt_avg = Some(100.0);

    // queueing pushes the average far above base RTT: window must shrink
    for _ in 0..50 {
        ctrl.on_rtt_sample(1000, Protocol::Fast);
    }
    assert!(ctrl.cwnd < 40, "cwnd should contract, got {}", ctrl.cwnd);
    assert!(ctrl.cwnd >= 1);
}
