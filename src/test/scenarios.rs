use crate::net::{Direction, Flow, LinkId, Network, NodeId, Packet, DATA_PACKET_BITS};
use crate::proto::Protocol;
use crate::sim::{Runner, SimTime, Updatable};
use crate::topo::{chain, point_to_point, PointToPointOpts};

const DT: SimTime = SimTime(10);

fn p2p_with_flow(opts: PointToPointOpts, data_bits: u64, protocol: Protocol) -> (Network, NodeId, NodeId) {
    let mut net = Network::default();
    let (h0, h1) = point_to_point(&mut net, &opts).expect("topology");
    net.add_flow(Flow::new(0, h0, h1, data_bits, SimTime::ZERO, protocol))
        .expect("flow");
    net.validate().expect("valid topology");
    (net, h0, h1)
}

fn check_invariants(net: &Network, link: LinkId) {
    let l = net.link(link);
    for dir in [Direction::LeftToRight, Direction::RightToLeft] {
        let free = l.free_bits(dir);
        assert!(free <= l.buffer_bits());
        assert_eq!(free + l.queued_bits(dir), l.buffer_bits());
    }
}

#[test]
fn single_reno_flow_completes_losslessly_through_slow_start() {
    // 10 data packets over an 80 bits/ms link, 65536-bit buffers
    let (mut net, h0, h1) = p2p_with_flow(PointToPointOpts::default(), 81_920, Protocol::Reno);

    let mut now = SimTime::ZERO;
    while !net.all_flows_complete() && now.0 < 600_000 {
        net.update(DT, now);
        check_invariants(&net, LinkId(0));
        if let Some(ctrl) = net.host(h0).expect("host").controller(0) {
            assert!(ctrl.cwnd >= 1);
            assert!(ctrl.window_occupied <= ctrl.cwnd);
        }
        now = now.saturating_add(DT);
    }

    assert!(net.all_flows_complete(), "flow must finish within the budget");
    assert_eq!(net.link(LinkId(0)).drops(), 0);

    let sender = net.host(h0).expect("host");
    assert_eq!(sender.completed_flows().len(), 1);
    let done = &sender.completed_flows()[0];
    assert_eq!(done.flow_id, 0);
    // SETUP takes id 0, data ids run 1..=10
    assert_eq!(sender.total_packets_generated(), 11);

    // lossless slow start: the window never shrinks
    let windows = &done.series.window_pkts;
    assert!(!windows.is_empty());
    assert!(
        windows.windows(2).all(|w| w[0].value <= w[1].value),
        "cwnd must be nondecreasing without loss"
    );

    // the download finished and was discarded; the source entry remains
    let receiver = net.host(h1).expect("host");
    assert_eq!(receiver.downloads_from(h0), Some(&[][..]));
}

#[test]
fn triple_duplicate_ack_triggers_exactly_one_fast_retransmit() {
    // 8 data packets registered, only the first is in flight (cwnd = 1)
    let (mut net, h0, h1) = p2p_with_flow(PointToPointOpts::default(), 65_536, Protocol::Reno);
    net.update(DT, SimTime::ZERO);

    let ctrl = net.host(h0).expect("host").controller(0).expect("active");
    assert_eq!(ctrl.cwnd, 1);
    assert_eq!(ctrl.send_times.get(&1), Some(&SimTime::ZERO));

    let dup = |net: &mut Network, at: u64| {
        net.with_host_and_link(h0, LinkId(0), |h, l| {
            h.receive_packet(Packet::ack(1, h1, h0), l, SimTime(at));
        });
    };

    // two duplicates arm the counter, the third fires the retransmit
    dup(&mut net, 40);
    dup(&mut net, 50);
    let before = net.host(h0).expect("host").controller(0).expect("active").clone();
    assert_eq!(before.dup_ack_count, 2);
    assert!(before.most_recent_retransmitted.is_none());

    dup(&mut net, 60);
    let ctrl = net.host(h0).expect("host").controller(0).expect("active").clone();
    assert_eq!(ctrl.most_recent_retransmitted, Some(1));
    assert_eq!(ctrl.send_times.get(&1), Some(&SimTime(60)));
    assert_eq!(ctrl.window_occupied, 1);
    assert_eq!(ctrl.dup_ack_count, 0);
    // FR/FR entry: ssthresh = max(cwnd/2, 2), inflated by the dup count
    assert_eq!(ctrl.ssthresh, 2);
    assert_eq!(ctrl.cwnd, 5);
    assert!(!ctrl.slow_start);
    assert!(ctrl.awaiting_retransmit);

    // further duplicates of the same id must not retransmit again
    dup(&mut net, 70);
    dup(&mut net, 80);
    dup(&mut net, 90);
    let ctrl = net.host(h0).expect("host").controller(0).expect("active").clone();
    assert_eq!(ctrl.send_times.get(&1), Some(&SimTime(60)), "no second retransmit");

    // the next new cumulative ACK deflates the window on the next send
    net.with_host_and_link(h0, LinkId(0), |h, l| {
        h.receive_packet(Packet::ack(2, h1, h0), l, SimTime(100));
    });
    net.update(DT, SimTime(110));
    let ctrl = net.host(h0).expect("host").controller(0).expect("active").clone();
    assert_eq!(ctrl.cwnd, 2, "deflated to ssthresh");
    assert!(!ctrl.awaiting_retransmit);
    assert_eq!(ctrl.window_occupied, 2);
}

#[test]
fn expired_timer_retransmits_the_oldest_outstanding_packet() {
    // buffer below one DATA packet: every data transmission is dropped,
    // no ACK ever returns, recovery must come from the timer
    let opts = PointToPointOpts {
        buffer_bits: 4_096,
        ..PointToPointOpts::default()
    };
    let (mut net, h0, h1) = p2p_with_flow(opts, 16_384, Protocol::Reno);

    let mut now = SimTime::ZERO;
    while now.0 <= 3_010 {
        net.update(DT, now);
        now = now.saturating_add(DT);
    }

    let ctrl = net.host(h0).expect("host").controller(0).expect("still active");
    // initial send at t=0 was dropped; the 3000ms timer fired at t=3010
    assert_eq!(ctrl.send_times.get(&1), Some(&SimTime(3_010)));
    assert_eq!(ctrl.window_occupied, 1);
    assert_eq!(net.link(LinkId(0)).drops(), 2);
    assert!(!net.all_flows_complete());

    // the SETUP still fit, so the receiver is waiting on the first packet
    let downloads = net.host(h1).expect("host").downloads_from(h0).expect("setup arrived");
    assert_eq!(downloads[0].next_expected_id, 1);
}

#[test]
fn bidirectional_flows_share_the_transmission_slot() {
    let mut net = Network::default();
    let (h0, h1) = point_to_point(&mut net, &PointToPointOpts::default()).expect("topology");
    net.add_flow(Flow::new(0, h0, h1, 3 * DATA_PACKET_BITS, SimTime::ZERO, Protocol::Reno))
        .expect("flow");
    net.add_flow(Flow::new(1, h1, h0, 3 * DATA_PACKET_BITS, SimTime::ZERO, Protocol::Reno))
        .expect("flow");
    net.validate().expect("valid topology");

    let mut now = SimTime::ZERO;
    while !net.all_flows_complete() && now.0 < 600_000 {
        net.update(DT, now);
        check_invariants(&net, LinkId(0));
        now = now.saturating_add(DT);
    }

    assert!(net.all_flows_complete());
    assert_eq!(net.link(LinkId(0)).drops(), 0);
    assert_eq!(net.host(h0).expect("host").completed_flows().len(), 1);
    assert_eq!(net.host(h1).expect("host").completed_flows().len(), 1);

    // long-run throughput per direction stays below the line rate
    let elapsed_ms = now.0 as f64;
    let delivered_bits = (2 * (3 * DATA_PACKET_BITS)) as f64;
    assert!(delivered_bits / elapsed_ms <= 80.0);
}

#[test]
fn fast_flow_completes_without_entering_fast_recovery() {
    let (mut net, h0, _h1) = p2p_with_flow(PointToPointOpts::default(), 81_920, Protocol::Fast);

    let mut max_cwnd = 0;
    let mut now = SimTime::ZERO;
    while !net.all_flows_complete() && now.0 < 600_000 {
        net.update(DT, now);
        if let Some(ctrl) = net.host(h0).expect("host").controller(0) {
            assert!(!ctrl.awaiting_retransmit, "FAST never runs FR/FR");
            assert_eq!(ctrl.ssthresh, u64::MAX, "FAST leaves ssthresh untouched");
            max_cwnd = max_cwnd.max(ctrl.cwnd);
        }
        now = now.saturating_add(DT);
    }

    assert!(net.all_flows_complete());
    assert!(
        max_cwnd > 1,
        "the equilibrium rule must have grown the window, got {max_cwnd}"
    );
    assert_eq!(net.link(LinkId(0)).drops(), 0);
}

#[test]
fn flow_crosses_a_passthrough_router() {
    let mut net = Network::default();
    let (h0, h1) = chain(&mut net, &PointToPointOpts::default()).expect("topology");
    net.add_flow(Flow::new(0, h0, h1, 2 * DATA_PACKET_BITS, SimTime::ZERO, Protocol::Reno))
        .expect("flow");
    net.validate().expect("valid topology");

    let runner = Runner::new(DT, SimTime(600_000));
    runner.run(&mut net, Network::all_flows_complete);

    assert!(net.all_flows_complete());
    assert_eq!(net.link(LinkId(0)).drops(), 0);
    assert_eq!(net.link(LinkId(1)).drops(), 0);
    assert_eq!(net.host(h0).expect("host").completed_flows().len(), 1);
}

#[test]
fn report_collects_flow_and_link_series() {
    let (mut net, _h0, _h1) = p2p_with_flow(PointToPointOpts::default(), 8_192, Protocol::Reno);

    let runner = Runner::new(DT, SimTime(600_000));
    runner.run(&mut net, Network::all_flows_complete);

    let report = net.report();
    assert_eq!(report.flows.len(), 1);
    assert!(report.flows[0].completed_at_ms.is_some());
    assert!(!report.flows[0].series.window_pkts.is_empty());
    assert_eq!(report.links.len(), 1);
    assert!(!report.links[0].series.throughput_mbps.is_empty());
    // drops series is cumulative and ends at zero for a lossless run
    assert_eq!(report.links[0].series.drops.last().expect("samples").value, 0.0);
}
