use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use drsim_core::cast;
use drsim_core::{Event, EventHandler, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Tick {
    seq: u32,
}

struct Recorder {
    #[allow(dead_code)]
    ctx: SimulationContext,
    delivered: Vec<(f64, u32)>,
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        let time = event.time;
        cast!(match event.data {
            Tick { seq } => {
                self.delivered.push((time, seq));
            }
        })
    }
}

fn make_recorder(sim: &mut Simulation, name: &str) -> (Rc<RefCell<Recorder>>, u32) {
    let recorder = Rc::new(RefCell::new(Recorder {
        ctx: sim.create_context(name),
        delivered: Vec::new(),
    }));
    let id = sim.add_handler(name, recorder.clone());
    (recorder, id)
}

#[test]
fn test_time_advances_to_event_time() {
    let mut sim = Simulation::new(123);
    let (recorder, id) = make_recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("src");

    ctx.emit(Tick { seq: 0 }, id, 1.5);
    ctx.emit(Tick { seq: 1 }, id, 4.0);

    assert_eq!(sim.time(), 0.0);
    assert!(sim.step());
    assert_eq!(sim.time(), 1.5);
    assert!(sim.step());
    assert_eq!(sim.time(), 4.0);
    assert!(!sim.step());
    assert_eq!(recorder.borrow().delivered, vec![(1.5, 0), (4.0, 1)]);
}

#[test]
fn test_equal_time_events_are_fifo() {
    let mut sim = Simulation::new(123);
    let (recorder, id) = make_recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("src");

    // All at t=2.0, scheduled in order 0..10.
    for seq in 0..10 {
        ctx.emit(Tick { seq }, id, 2.0);
    }
    sim.step_until_no_events();

    let seqs: Vec<u32> = recorder.borrow().delivered.iter().map(|&(_, s)| s).collect();
    assert_eq!(seqs, (0..10).collect::<Vec<u32>>());
}

#[test]
fn test_zero_delay_event_dispatched_at_current_time() {
    let mut sim = Simulation::new(123);
    let (recorder, id) = make_recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("src");

    ctx.emit(Tick { seq: 0 }, id, 3.0);
    sim.step();
    ctx.emit_now(Tick { seq: 1 }, id);
    ctx.emit(Tick { seq: 2 }, id, 1.0);
    sim.step_until_no_events();

    assert_eq!(recorder.borrow().delivered, vec![(3.0, 0), (3.0, 1), (4.0, 2)]);
}

#[test]
fn test_cancelled_event_is_not_delivered() {
    let mut sim = Simulation::new(123);
    let (recorder, id) = make_recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("src");

    let to_cancel = ctx.emit(Tick { seq: 0 }, id, 1.0);
    ctx.emit(Tick { seq: 1 }, id, 2.0);
    ctx.cancel_event(to_cancel);
    sim.step_until_no_events();

    assert_eq!(sim.time(), 2.0);
    assert_eq!(recorder.borrow().delivered, vec![(2.0, 1)]);
}

#[test]
fn test_step_for_duration() {
    let mut sim = Simulation::new(123);
    let (_, id) = make_recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("src");

    ctx.emit(Tick { seq: 0 }, id, 1.0);
    ctx.emit(Tick { seq: 1 }, id, 2.0);
    ctx.emit(Tick { seq: 2 }, id, 3.5);

    assert!(sim.step_for_duration(2.5));
    assert_eq!(sim.time(), 2.0);
    assert!(!sim.step_for_duration(10.0));
    assert_eq!(sim.time(), 3.5);
}

#[test]
fn test_seeded_rand_is_reproducible() {
    let mut sim1 = Simulation::new(42);
    let mut sim2 = Simulation::new(42);
    for _ in 0..100 {
        assert_eq!(sim1.rand(), sim2.rand());
    }
}

#[test]
#[should_panic]
fn test_negative_delay_panics() {
    let mut sim = Simulation::new(123);
    let (_, id) = make_recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("src");
    ctx.emit(Tick { seq: 0 }, id, -1.0);
}
