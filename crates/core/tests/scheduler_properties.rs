//! Scheduling properties exercised end to end against a mock clock.

use flightloop_core::scheduler::{
    period_hz, Priority, Scheduler, SchedulerConfig, SchedulerError, StepOutcome, TaskContext,
    TaskDescriptor, TaskId,
};
use flightloop_core::traits::{MockTime, TimeSource};

const CAPACITY: usize = 8;

/// Shared state handed to every task: the clock and a run log.
struct World<'a> {
    clock: &'a MockTime,
    step: u32,
    runs: Vec<Run>,
    costs: Vec<(&'static str, u64)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Run {
    name: &'static str,
    step: u32,
    at_us: u32,
}

impl<'a> World<'a> {
    fn new(clock: &'a MockTime) -> Self {
        Self {
            clock,
            step: 0,
            runs: Vec::new(),
            costs: Vec::new(),
        }
    }

    fn with_cost(mut self, name: &'static str, cost_us: u64) -> Self {
        self.costs.push((name, cost_us));
        self
    }

    fn record(&mut self, name: &'static str, ctx: &TaskContext) {
        self.runs.push(Run {
            name,
            step: self.step,
            at_us: ctx.now_us(),
        });
        if let Some((_, cost)) = self.costs.iter().find(|(n, _)| *n == name) {
            self.clock.advance(*cost);
        }
    }

    fn count(&self, name: &str) -> usize {
        self.runs.iter().filter(|run| run.name == name).count()
    }

    fn times(&self, name: &str) -> Vec<u32> {
        self.runs
            .iter()
            .filter(|run| run.name == name)
            .map(|run| run.at_us)
            .collect()
    }
}

macro_rules! recording_task {
    ($fn_name:ident, $label:expr) => {
        fn $fn_name(world: &mut World<'_>, ctx: &mut TaskContext) {
            world.record($label, ctx);
        }
    };
}

recording_task!(realtime_task, "REALTIME");
recording_task!(serial_task, "SERIAL");
recording_task!(battery_task, "BATTERY");
recording_task!(task_a, "A");
recording_task!(task_b, "B");
recording_task!(task_c, "C");
recording_task!(slow_task, "SLOW");
recording_task!(quick_task, "QUICK");

type TestScheduler<'a> = Scheduler<World<'a>, &'a MockTime, CAPACITY>;

fn new_scheduler(clock: &MockTime, config: SchedulerConfig) -> TestScheduler<'_> {
    Scheduler::new(clock, config)
}

fn add<'a>(scheduler: &mut TestScheduler<'a>, descriptor: TaskDescriptor<World<'a>>) -> TaskId {
    let id = scheduler.register(descriptor).expect("registration");
    scheduler.set_task_enabled(id, true);
    id
}

fn step<'a>(scheduler: &mut TestScheduler<'a>, world: &mut World<'a>) -> StepOutcome {
    world.step += 1;
    scheduler.run_step(world)
}

#[test]
fn test_flight_loop_example() {
    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    add(
        &mut scheduler,
        TaskDescriptor::new("REALTIME", realtime_task, 1_000, Priority::Realtime),
    );
    add(
        &mut scheduler,
        TaskDescriptor::new("SERIAL", serial_task, 10_000, Priority::Low),
    );
    add(
        &mut scheduler,
        TaskDescriptor::new("BATTERY", battery_task, 200_000, Priority::Medium),
    );

    let mut world = World::new(&clock);
    for _ in 0..250 {
        clock.advance(1_000);
        step(&mut scheduler, &mut world);
    }

    assert_eq!(world.count("REALTIME"), 250);
    let serial_runs = world.count("SERIAL");
    assert!((24..=26).contains(&serial_runs), "serial ran {} times", serial_runs);
    assert_eq!(world.count("BATTERY"), 1);

    for step_index in 1..=250 {
        let in_step: Vec<_> = world.runs.iter().filter(|run| run.step == step_index).collect();
        assert_eq!(in_step[0].name, "REALTIME", "step {}", step_index);
        assert!(in_step.len() <= 2);
    }
}

#[test]
fn test_periodic_spacing_and_one_run_per_step() {
    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    add(&mut scheduler, TaskDescriptor::new("A", task_a, 3_000, Priority::Low));
    add(&mut scheduler, TaskDescriptor::new("B", task_b, 5_000, Priority::Medium));
    add(&mut scheduler, TaskDescriptor::new("C", task_c, 7_000, Priority::High));

    let mut world = World::new(&clock);
    for _ in 0..400 {
        clock.advance(500);
        step(&mut scheduler, &mut world);
    }

    for (name, period) in [("A", 3_000), ("B", 5_000), ("C", 7_000)] {
        let times = world.times(name);
        assert!(times.len() > 10, "{} barely ran", name);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= period, "{} ran early: {:?}", name, pair);
        }
    }

    for step_index in 1..=400 {
        assert!(world.runs.iter().filter(|run| run.step == step_index).count() <= 1);
    }
}

#[test]
fn test_realtime_preempts_every_candidate() {
    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    add(&mut scheduler, TaskDescriptor::new("A", task_a, 1_000, Priority::High));
    add(
        &mut scheduler,
        TaskDescriptor::new("REALTIME", realtime_task, 2_000, Priority::Realtime),
    );
    add(&mut scheduler, TaskDescriptor::new("B", task_b, 1_000, Priority::High));

    let mut world = World::new(&clock);
    for _ in 0..100 {
        clock.advance(1_000);
        let outcome = step(&mut scheduler, &mut world);
        if outcome.realtime_ran {
            let first = world.runs.iter().find(|run| run.step == world.step).unwrap();
            assert_eq!(first.name, "REALTIME");
        }
    }
    assert_eq!(world.count("REALTIME"), 50);
}

#[test]
fn test_guard_rejects_then_admits_least_risky() {
    let clock = MockTime::new();
    let config = SchedulerConfig::default().with_guard_margin(100);
    let mut scheduler = new_scheduler(&clock, config);
    add(
        &mut scheduler,
        TaskDescriptor::new("REALTIME", realtime_task, 1_000, Priority::Realtime),
    );
    let slow = add(&mut scheduler, TaskDescriptor::new("SLOW", slow_task, 500, Priority::Low));
    let quick = add(&mut scheduler, TaskDescriptor::new("QUICK", quick_task, 500, Priority::Low));
    let mut world = World::new(&clock).with_cost("SLOW", 600).with_cost("QUICK", 100);

    // t=1000: realtime, then SLOW wins the tie on registration order
    clock.set(1_000);
    let outcome = step(&mut scheduler, &mut world);
    assert!(outcome.realtime_ran);
    assert_eq!(outcome.selected, Some(slow));
    assert_eq!(clock.now_us(), 1_600);

    // t=1600: 400us left, SLOW (600us worst case) is refused, QUICK fits
    let outcome = step(&mut scheduler, &mut world);
    assert!(!outcome.realtime_ran);
    assert_eq!(outcome.selected, Some(quick));
    assert!(!outcome.forced);
    assert_eq!(scheduler.task_info(slow).guard_rejections, 1);

    // t=1700: only SLOW is ready and it does not fit; it is admitted anyway
    let outcome = step(&mut scheduler, &mut world);
    assert_eq!(outcome.selected, Some(slow));
    assert!(outcome.forced);
    assert_eq!(scheduler.forced_admissions(), 1);
    assert_eq!(scheduler.task_info(slow).forced_admissions, 1);
}

#[test]
fn test_guard_without_fallback_stays_idle() {
    let clock = MockTime::new();
    let config = SchedulerConfig::default()
        .with_guard_margin(100)
        .with_starvation_fallback(false);
    let mut scheduler = new_scheduler(&clock, config);
    add(
        &mut scheduler,
        TaskDescriptor::new("REALTIME", realtime_task, 1_000, Priority::Realtime),
    );
    let slow = add(&mut scheduler, TaskDescriptor::new("SLOW", slow_task, 500, Priority::Low));
    let mut world = World::new(&clock).with_cost("SLOW", 600);

    clock.set(1_000);
    assert_eq!(step(&mut scheduler, &mut world).selected, Some(slow));

    clock.set(1_700);
    let outcome = step(&mut scheduler, &mut world);
    assert!(outcome.is_idle());
    assert_eq!(scheduler.forced_admissions(), 0);
}

#[test]
fn test_overrunning_realtime_blocks_everyone() {
    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    let realtime = add(
        &mut scheduler,
        TaskDescriptor::new("REALTIME", realtime_task, 1_000, Priority::Realtime),
    );
    add(&mut scheduler, TaskDescriptor::new("A", task_a, 1_000, Priority::Low));
    let mut world = World::new(&clock).with_cost("REALTIME", 1_200);

    clock.set(1_000);
    let outcome = step(&mut scheduler, &mut world);
    assert!(outcome.realtime_ran);
    assert!(outcome.is_idle());
    assert!(!outcome.forced);
    assert_eq!(world.count("A"), 0);
    assert_eq!(scheduler.task_info(realtime).overruns, 1);
}

#[test]
fn test_disable_and_reenable() {
    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    let a = add(&mut scheduler, TaskDescriptor::new("A", task_a, 1_000, Priority::Low));
    let mut world = World::new(&clock);

    for _ in 0..5 {
        clock.advance(1_000);
        step(&mut scheduler, &mut world);
    }
    assert_eq!(world.count("A"), 5);

    scheduler.set_task_enabled(a, false);
    for _ in 0..15 {
        clock.advance(1_000);
        step(&mut scheduler, &mut world);
    }
    assert_eq!(world.count("A"), 5);

    // Re-enabled at t=20000: not treated as 15 periods overdue
    scheduler.set_task_enabled(a, true);
    clock.advance(999);
    assert!(step(&mut scheduler, &mut world).is_idle());

    clock.advance(1);
    assert_eq!(step(&mut scheduler, &mut world).selected, Some(a));
    assert_eq!(world.times("A").last(), Some(&21_000));
}

#[test]
fn test_overdue_low_priority_outranks_fresh_high() {
    // B (HIGH, 10ms) became ready at t=10000. A (LOW, 1ms) has waited two periods.
    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    let b = add(&mut scheduler, TaskDescriptor::new("B", task_b, 10_000, Priority::High));
    clock.set(8_000);
    let a = add(&mut scheduler, TaskDescriptor::new("A", task_a, 1_000, Priority::Low));
    let mut world = World::new(&clock);

    clock.set(10_000);
    assert_eq!(step(&mut scheduler, &mut world).selected, Some(b));

    // Same race, but A has now missed four periods
    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    add(&mut scheduler, TaskDescriptor::new("B", task_b, 10_000, Priority::High));
    clock.set(6_000);
    let a_late = add(&mut scheduler, TaskDescriptor::new("A", task_a, 1_000, Priority::Low));
    let mut world = World::new(&clock);

    clock.set(10_000);
    assert_eq!(step(&mut scheduler, &mut world).selected, Some(a_late));
    assert_eq!(a, a_late);
}

#[test]
fn test_low_priority_is_not_starved() {
    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    add(&mut scheduler, TaskDescriptor::new("A", task_a, 1_000, Priority::Low));
    add(&mut scheduler, TaskDescriptor::new("B", task_b, 1_000, Priority::High));
    let mut world = World::new(&clock);

    for _ in 0..30 {
        clock.advance(1_000);
        step(&mut scheduler, &mut world);
    }
    assert!(world.count("A") >= 5, "A ran {} times", world.count("A"));
    assert!(world.count("B") > world.count("A"));
}

#[test]
fn test_load_accounting() {
    let clock = MockTime::new();
    let config = SchedulerConfig::default().with_load_window(100_000);
    let mut scheduler = new_scheduler(&clock, config);
    let a = add(&mut scheduler, TaskDescriptor::new("A", task_a, 1_000, Priority::Low));
    let mut world = World::new(&clock).with_cost("A", 100);

    for k in 1..=100u64 {
        clock.set(k * 1_000);
        step(&mut scheduler, &mut world);
    }

    // 99 runs of 100us closed out in a 100ms window: 9.9 %
    assert_eq!(scheduler.task_load_permille(a), 99);
    assert_eq!(scheduler.cpu_load_permille(), 99);
    assert_eq!(scheduler.average_execution_us(a), 100);
    assert_eq!(scheduler.max_execution_us(a), 100);
    assert_eq!(scheduler.system_load_percent(), 100);
}

#[test]
fn test_event_task_with_fallback_period() {
    fn rx_ready(world: &mut World<'_>, now: u32, last: u32) -> bool {
        world.step % 4 == 0 || now.wrapping_sub(last) >= period_hz(33)
    }
    recording_task!(rx_task, "RX");

    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    let rx = add(
        &mut scheduler,
        TaskDescriptor::new("RX", rx_task, period_hz(33), Priority::High).with_check(rx_ready),
    );
    let mut world = World::new(&clock);

    for _ in 0..12 {
        clock.advance(1_000);
        step(&mut scheduler, &mut world);
    }
    assert_eq!(world.count("RX"), 3);
    assert_eq!(scheduler.task_info(rx).check_max_us, 0);
}

#[test]
fn test_scheduling_across_clock_wrap() {
    let start = u32::MAX as u64 - 5_000;
    let clock = MockTime::with_initial(start);
    let config = SchedulerConfig::default().with_load_window(10_000);
    let mut scheduler = new_scheduler(&clock, config);
    add(
        &mut scheduler,
        TaskDescriptor::new("REALTIME", realtime_task, 1_000, Priority::Realtime),
    );
    let a = add(&mut scheduler, TaskDescriptor::new("A", task_a, 3_000, Priority::Low));
    let mut world = World::new(&clock).with_cost("A", 100);

    for _ in 0..40 {
        clock.advance(1_000);
        step(&mut scheduler, &mut world);
    }

    let realtime = world.times("REALTIME");
    assert_eq!(realtime.len(), 40);
    assert!(realtime.iter().any(|&t| t > u32::MAX - 5_000));
    assert!(realtime.iter().any(|&t| t < 40_000));
    for pair in realtime.windows(2) {
        assert!(pair[1].wrapping_sub(pair[0]) >= 1_000, "realtime ran early: {:?}", pair);
    }

    let times = world.times("A");
    assert!((12..=13).contains(&times.len()), "A ran {} times", times.len());
    for pair in times.windows(2) {
        assert!(pair[1].wrapping_sub(pair[0]) >= 3_000, "A ran early: {:?}", pair);
    }
    assert_eq!(scheduler.task_info(a).guard_rejections, 0);

    // Three or four 100us runs per ~10ms window
    let load = scheduler.task_load_permille(a);
    assert!((20..=40).contains(&load), "A load {} permille", load);
    assert_eq!(scheduler.cpu_load_permille(), load);
}

#[test]
fn test_realtime_task_without_period_is_rejected() {
    fn always(_: &mut World<'_>, _: u32, _: u32) -> bool {
        true
    }

    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    let descriptor =
        TaskDescriptor::new("REALTIME", realtime_task, 0, Priority::Realtime).with_check(always);
    assert_eq!(
        scheduler.register(descriptor),
        Err(SchedulerError::RealtimeWithoutPeriod { name: "REALTIME" })
    );
    assert_eq!(scheduler.realtime_task(), None);

    // The rest of the task set keeps running
    add(&mut scheduler, TaskDescriptor::new("A", task_a, 1_000, Priority::Low));
    let mut world = World::new(&clock);
    for _ in 0..100 {
        clock.advance(1_000);
        step(&mut scheduler, &mut world);
    }
    assert_eq!(world.count("A"), 100);
}

#[test]
#[should_panic(expected = "realtime task cannot be rescheduled to a zero period")]
fn test_realtime_task_cannot_lose_its_period() {
    let clock = MockTime::new();
    let mut scheduler = new_scheduler(&clock, SchedulerConfig::default());
    let realtime = add(
        &mut scheduler,
        TaskDescriptor::new("REALTIME", realtime_task, 1_000, Priority::Realtime),
    );
    scheduler.reschedule_task(realtime, 0);
}

#[test]
fn test_task_ids_stay_distinct_beyond_256_tasks() {
    fn idle(_: &mut u32, _: &mut TaskContext) {}

    let clock = MockTime::new();
    let mut scheduler: Scheduler<u32, &MockTime, 300> =
        Scheduler::new(&clock, SchedulerConfig::default());

    let ids: Vec<TaskId> = (0..257)
        .map(|index| {
            let name: &'static str = Box::leak(format!("T{}", index).into_boxed_str());
            scheduler
                .register(TaskDescriptor::new(name, idle, 1_000, Priority::Low))
                .expect("registration")
        })
        .collect();

    assert_ne!(ids[0], ids[256]);
    assert_eq!(ids[256].index(), 256);
    assert_eq!(scheduler.task_info(ids[256]).name, "T256");
    assert_eq!(scheduler.task_info(ids[0]).name, "T0");
    assert_eq!(scheduler.find_task("T256", None), Some(ids[256]));
}
