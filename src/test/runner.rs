use crate::sim::{Runner, SimTime, Updatable};

#[derive(Default)]
struct CountingWorld {
    ticks: u64,
    last_now: Option<SimTime>,
}

impl Updatable for CountingWorld {
    fn update(&mut self, _dt: SimTime, now: SimTime) {
        if let Some(prev) = self.last_now {
            assert!(now > prev, "driver time must be strictly monotonic");
        }
        self.last_now = Some(now);
        self.ticks += 1;
    }
}

#[test]
fn runner_stops_when_done_reports_completion() {
    let runner = Runner::new(SimTime(10), SimTime(1_000));
    let mut world = CountingWorld::default();

    let stopped = runner.run(&mut world, |w| w.ticks >= 5);
    assert_eq!(world.ticks, 5);
    assert_eq!(stopped, SimTime(50));
}

#[test]
fn runner_exhausts_the_time_budget_when_never_done() {
    let runner = Runner::new(SimTime(10), SimTime(200));
    let mut world = CountingWorld::default();

    let stopped = runner.run(&mut world, |_| false);
    assert_eq!(stopped, SimTime(200));
    assert_eq!(world.ticks, 20);
    assert_eq!(world.last_now, Some(SimTime(190)));
}

#[test]
fn runner_with_immediate_completion_never_ticks() {
    let runner = Runner::new(SimTime(10), SimTime(200));
    let mut world = CountingWorld::default();

    let stopped = runner.run(&mut world, |_| true);
    assert_eq!(stopped, SimTime::ZERO);
    assert_eq!(world.ticks, 0);
}
