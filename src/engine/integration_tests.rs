// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::engine::{
    Address, Context, ContextBuilder, Delivery, Disposition, Fallback, InstanceId, ManualClock,
    Message, Observer, ProcessDescriptor, Scope, Site, StateDef, Transition,
};
use crate::errors::EngineError;

#[derive(Debug, Clone, PartialEq)]
enum Msg {
    Start,
    Stop,
    Done,
    Item(u32),
    Poke,
    Ask,
    Reply(u32),
    Tick(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Start,
    Stop,
    Done,
    Item,
    Poke,
    Ask,
    Reply,
    Tick,
}

impl Message for Msg {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        match self {
            Msg::Start => Kind::Start,
            Msg::Stop => Kind::Stop,
            Msg::Done => Kind::Done,
            Msg::Item(_) => Kind::Item,
            Msg::Poke => Kind::Poke,
            Msg::Ask => Kind::Ask,
            Msg::Reply(_) => Kind::Reply,
            Msg::Tick(_) => Kind::Tick,
        }
    }
}

// Worker: Idle handles Start -> Busy and Stop -> Terminated, Busy saves
// everything except Done, which returns it to Idle.

const IDLE: usize = 0;
const BUSY: usize = 1;
const TERMINATED: usize = 2;

#[derive(Debug, Default)]
struct Worker {
    handled: Vec<String>,
}

fn start(scope: &mut Scope<'_, Msg>, worker: &mut Worker, _event: Delivery<Msg>) {
    worker.handled.push("start".to_string());
    scope.next_state(BUSY);
}

fn stop(scope: &mut Scope<'_, Msg>, worker: &mut Worker, _event: Delivery<Msg>) {
    worker.handled.push("stop".to_string());
    scope.next_state(TERMINATED);
}

fn done(scope: &mut Scope<'_, Msg>, worker: &mut Worker, _event: Delivery<Msg>) {
    worker.handled.push("done".to_string());
    scope.next_state(IDLE);
}

fn item(_scope: &mut Scope<'_, Msg>, worker: &mut Worker, event: Delivery<Msg>) {
    if let Msg::Item(n) = event.message() {
        worker.handled.push(format!("item{}", n));
    }
}

fn tick(_scope: &mut Scope<'_, Msg>, worker: &mut Worker, event: Delivery<Msg>) {
    if let Msg::Tick(n) = event.message() {
        worker.handled.push(format!("tick{}", n));
    }
}

fn reject_reply(scope: &mut Scope<'_, Msg>, _worker: &mut Worker, event: Delivery<Msg>) {
    scope.error(event, "reply without a request");
}

fn worker_idle(kind: Kind) -> Option<Transition<Worker, Msg>> {
    match kind {
        Kind::Start => Some(Transition::new("start", start)),
        Kind::Stop => Some(Transition::new("stop", stop)),
        Kind::Item => Some(Transition::new("item", item)),
        Kind::Tick => Some(Transition::new("tick", tick)),
        Kind::Reply => Some(Transition::new("reject_reply", reject_reply)),
        Kind::Done | Kind::Poke | Kind::Ask => None,
    }
}

fn worker_busy(kind: Kind) -> Option<Transition<Worker, Msg>> {
    match kind {
        Kind::Done => Some(Transition::new("done", done)),
        _ => None,
    }
}

fn worker_terminated(_kind: Kind) -> Option<Transition<Worker, Msg>> {
    None
}

fn poke_fallback(scope: &mut Scope<'_, Msg>, _event: Delivery<Msg>) {
    scope.send_to_environment(Msg::Reply(99));
}

fn worker_unhandled(kind: Kind) -> Option<Fallback<Msg>> {
    match kind {
        Kind::Poke => Some(Fallback::new("poke_fallback", poke_fallback)),
        _ => None,
    }
}

fn worker_reset(_scope: &mut Scope<'_, Msg>, worker: &mut Worker) {
    worker.handled.push("reset".to_string());
}

fn worker_trace(worker: &Worker) -> String {
    worker.handled.join(",")
}

static WORKER: ProcessDescriptor<Worker, Msg> = ProcessDescriptor {
    name: "worker",
    states: &[
        StateDef {
            name: "idle",
            save_unmatched: false,
            route: worker_idle,
        },
        StateDef {
            name: "busy",
            save_unmatched: true,
            route: worker_busy,
        },
        StateDef {
            name: "terminated",
            save_unmatched: false,
            route: worker_terminated,
        },
    ],
    initial_state: IDLE,
    entry: None,
    reset: Some(worker_reset),
    unhandled: Some(worker_unhandled),
    trace: Some(worker_trace),
};

// Parent spawns a child on Ask; the child completes on the parent's behalf
// when poked and times itself out otherwise.

const PARENT_WAITING: usize = 0;
const PARENT_DONE: usize = 1;

fn spawn_child(scope: &mut Scope<'_, Msg>, children: &mut u32, _event: Delivery<Msg>) {
    if scope.add_sub_instance(&CHILD, ()).is_ok() {
        *children += 1;
    }
}

fn parent_waiting(kind: Kind) -> Option<Transition<u32, Msg>> {
    match kind {
        Kind::Ask => Some(Transition::new("spawn_child", spawn_child)),
        _ => None,
    }
}

fn parent_done(_kind: Kind) -> Option<Transition<u32, Msg>> {
    None
}

static PARENT: ProcessDescriptor<u32, Msg> = ProcessDescriptor {
    name: "parent",
    states: &[
        StateDef {
            name: "waiting",
            save_unmatched: false,
            route: parent_waiting,
        },
        StateDef {
            name: "done",
            save_unmatched: false,
            route: parent_done,
        },
    ],
    initial_state: PARENT_WAITING,
    entry: None,
    reset: None,
    unhandled: None,
    trace: None,
};

fn child_entry(scope: &mut Scope<'_, Msg>, _data: &mut ()) {
    scope.set_timer(1_000, 0, Msg::Tick(0));
}

fn child_complete(scope: &mut Scope<'_, Msg>, _data: &mut (), _event: Delivery<Msg>) {
    let before = scope.id();
    let acted = scope.call_as_parent(|parent| {
        parent.next_state(PARENT_DONE);
        parent.send_to_environment(Msg::Reply(1));
    });
    let code = match (acted.is_some(), scope.id() == before) {
        (true, true) => 2,
        (false, true) => 0,
        _ => 999,
    };
    scope.send_to_environment(Msg::Reply(code));
    if acted.is_some() {
        scope.terminate_self();
    }
}

fn child_timeout(scope: &mut Scope<'_, Msg>, _data: &mut (), _event: Delivery<Msg>) {
    scope.terminate_self();
}

/// Reports to the owner, bailing out with the guard still held when there
/// is no value to forward.
fn forward_to_parent(scope: &mut Scope<'_, Msg>, value: Option<u32>) -> Option<()> {
    let mut parent = scope.as_parent()?;
    parent.send_to_environment(Msg::Reply(10));
    let value = value?;
    parent.send_to_environment(Msg::Reply(value));
    Some(())
}

fn child_forward(scope: &mut Scope<'_, Msg>, _data: &mut (), event: Delivery<Msg>) {
    let before = scope.id();
    let value = match event.message() {
        Msg::Item(n) if *n > 0 => Some(*n),
        _ => None,
    };
    forward_to_parent(scope, value);
    let after_forward = scope.id();

    let guard = scope.as_parent();
    drop(guard);

    let code = if after_forward == before && scope.id() == before {
        2
    } else {
        999
    };
    scope.send_to_environment(Msg::Reply(code));
}

fn child_active(kind: Kind) -> Option<Transition<(), Msg>> {
    match kind {
        Kind::Poke => Some(Transition::new("complete", child_complete)),
        Kind::Item => Some(Transition::new("forward", child_forward)),
        Kind::Tick => Some(Transition::new("timeout", child_timeout)),
        _ => None,
    }
}

static CHILD: ProcessDescriptor<(), Msg> = ProcessDescriptor {
    name: "child",
    states: &[StateDef {
        name: "active",
        save_unmatched: false,
        route: child_active,
    }],
    initial_state: 0,
    entry: Some(child_entry),
    reset: None,
    unhandled: None,
    trace: None,
};

// Gate: `closed` saves items until Start latches it without replay;
// `latched` handles items directly but only sees the saved ones once Done
// opens the gate.

const GATE_CLOSED: usize = 0;
const GATE_LATCHED: usize = 1;
const GATE_OPEN: usize = 2;

fn gate_latch(scope: &mut Scope<'_, Msg>, _seen: &mut Vec<String>, _event: Delivery<Msg>) {
    scope.set_state(GATE_LATCHED);
}

fn gate_open(scope: &mut Scope<'_, Msg>, _seen: &mut Vec<String>, _event: Delivery<Msg>) {
    scope.next_state(GATE_OPEN);
}

fn gate_latched_item(_scope: &mut Scope<'_, Msg>, seen: &mut Vec<String>, event: Delivery<Msg>) {
    if let Msg::Item(n) = event.message() {
        seen.push(format!("latched{}", n));
    }
}

fn gate_open_item(_scope: &mut Scope<'_, Msg>, seen: &mut Vec<String>, event: Delivery<Msg>) {
    if let Msg::Item(n) = event.message() {
        seen.push(format!("item{}", n));
    }
}

fn gate_closed(kind: Kind) -> Option<Transition<Vec<String>, Msg>> {
    match kind {
        Kind::Start => Some(Transition::new("latch", gate_latch)),
        _ => None,
    }
}

fn gate_latched(kind: Kind) -> Option<Transition<Vec<String>, Msg>> {
    match kind {
        Kind::Item => Some(Transition::new("latched_item", gate_latched_item)),
        Kind::Done => Some(Transition::new("open", gate_open)),
        _ => None,
    }
}

fn gate_opened(kind: Kind) -> Option<Transition<Vec<String>, Msg>> {
    match kind {
        Kind::Item => Some(Transition::new("item", gate_open_item)),
        _ => None,
    }
}

fn gate_trace(seen: &Vec<String>) -> String {
    seen.join(",")
}

static GATE: ProcessDescriptor<Vec<String>, Msg> = ProcessDescriptor {
    name: "gate",
    states: &[
        StateDef {
            name: "closed",
            save_unmatched: true,
            route: gate_closed,
        },
        StateDef {
            name: "latched",
            save_unmatched: true,
            route: gate_latched,
        },
        StateDef {
            name: "open",
            save_unmatched: false,
            route: gate_opened,
        },
    ],
    initial_state: GATE_CLOSED,
    entry: None,
    reset: None,
    unhandled: None,
    trace: Some(gate_trace),
};

/// Observer that records every notification as a line of text.
#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<String>>>);

impl Recorder {
    fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    fn push(&self, line: String) {
        self.0.borrow_mut().push(line);
    }
}

impl Observer<Kind> for Recorder {
    fn instance_created(&mut self, site: Site, _owner: Option<InstanceId>) {
        self.push(format!("created {}", site.process));
    }

    fn instance_terminated(&mut self, site: Site) {
        self.push(format!("terminated {}", site.process));
    }

    fn transition(&mut self, site: Site, kind: Kind, transition: &'static str) {
        self.push(format!("transition {} {:?} {}", site.state_name, kind, transition));
    }

    fn state_changed(&mut self, site: Site, _from: usize, from_name: &'static str) {
        self.push(format!("state {} -> {}", from_name, site.state_name));
    }

    fn ignored(&mut self, _site: Site, kind: Kind) {
        self.push(format!("ignored {:?}", kind));
    }

    fn saved(&mut self, _site: Site, kind: Kind) {
        self.push(format!("saved {:?}", kind));
    }

    fn fallback(&mut self, _site: Site, kind: Kind, fallback: &'static str) {
        self.push(format!("fallback {:?} {}", kind, fallback));
    }

    fn invalid(&mut self, site: Site, kind: Kind) {
        self.push(format!("invalid {:?} in {}", kind, site.state_name));
    }

    fn error(&mut self, _site: Site, kind: Kind, reason: &str) {
        self.push(format!("error {:?}: {}", kind, reason));
    }

    fn unknown_destination(&mut self, destination: Address, kind: Kind) {
        self.push(format!("unknown {} {:?}", destination, kind));
    }
}

fn context(capacity: usize) -> (Context<Msg>, ManualClock, Recorder) {
    let clock = ManualClock::new(0);
    let recorder = Recorder::default();
    let ctx = ContextBuilder::new(capacity)
        .clock(clock.clone())
        .observer(recorder.clone())
        .build()
        .expect("context");
    (ctx, clock, recorder)
}

fn trace(ctx: &Context<Msg>, id: InstanceId) -> String {
    ctx.dump(id)
        .and_then(|dump| dump.trace)
        .unwrap_or_default()
}

fn replies(ctx: &mut Context<Msg>) -> Vec<(Address, Msg)> {
    ctx.take_environment_events()
        .into_iter()
        .map(|delivery| (delivery.sender(), delivery.into_message()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_ids_are_unique_across_add_and_terminate() {
        let (mut ctx, _clock, _recorder) = context(3);
        let mut live: Vec<InstanceId> = Vec::new();
        let mut retired: Vec<InstanceId> = Vec::new();

        for round in 0..30 {
            if !live.is_empty() && (live.len() == 3 || round % 3 == 2) {
                let id = live.remove(0);
                ctx.terminate_instance(id).unwrap();
                retired.push(id);
            } else {
                live.push(ctx.add_instance(&WORKER, Worker::default(), false).unwrap());
            }

            let unique: HashSet<InstanceId> = live.iter().copied().collect();
            assert_eq!(unique.len(), live.len());
            assert_eq!(ctx.live_count(), live.len());
            for id in &retired {
                assert!(!ctx.is_live(*id));
                assert!(!live.contains(id));
            }
        }
    }

    #[test]
    fn test_matched_transition_runs_exactly_once_in_its_pass() {
        let (mut ctx, _clock, recorder) = context(2);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();

        ctx.send(id, Msg::Start);
        assert_eq!(trace(&ctx, id), "");

        ctx.run_until_idle();
        assert_eq!(trace(&ctx, id), "start");
        assert_eq!(recorder.count("transition idle Start start"), 1);
        assert_eq!(ctx.state_of(id), Some((BUSY, "busy")));

        ctx.run_until_idle();
        assert_eq!(trace(&ctx, id), "start");
    }

    #[test]
    fn test_saved_events_replay_in_arrival_order() {
        let (mut ctx, _clock, _recorder) = context(2);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();

        ctx.send(id, Msg::Start);
        ctx.run_until_idle();

        ctx.send(id, Msg::Item(1));
        ctx.send(id, Msg::Item(2));
        ctx.send(id, Msg::Item(3));
        ctx.run_until_idle();
        assert_eq!(ctx.dump(id).unwrap().saved_events, 3);

        ctx.send(id, Msg::Done);
        ctx.run_until_idle();

        assert_eq!(trace(&ctx, id), "start,done,item1,item2,item3");
        assert_eq!(ctx.dump(id).unwrap().saved_events, 0);
    }

    #[test]
    fn test_idle_busy_scenario_records_one_save_and_one_replay() {
        let (mut ctx, _clock, recorder) = context(2);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();

        ctx.send(id, Msg::Start);
        ctx.run_until_idle();
        ctx.send(id, Msg::Stop);
        ctx.run_until_idle();
        assert_eq!(ctx.state_of(id), Some((BUSY, "busy")));

        ctx.send(id, Msg::Done);
        ctx.run_until_idle();

        assert_eq!(ctx.state_of(id), Some((TERMINATED, "terminated")));
        assert_eq!(trace(&ctx, id), "start,done,stop");

        let history: Vec<_> = ctx.history(id).unwrap().iter().copied().collect();
        let saves = history
            .iter()
            .filter(|entry| entry.disposition == Disposition::Saved)
            .count();
        let replays: Vec<_> = history.iter().filter(|entry| entry.replayed).collect();
        assert_eq!(saves, 1);
        assert_eq!(replays.len(), 1);
        assert_eq!(replays[0].kind, Kind::Stop);
        assert_eq!(replays[0].from_state, IDLE);
        assert_eq!(replays[0].to_state, TERMINATED);
        assert_eq!(replays[0].disposition, Disposition::Transition("stop"));

        assert_eq!(recorder.count("saved Stop"), 1);
        assert!(recorder.lines().contains(&"state busy -> idle".to_string()));
    }

    #[test]
    fn test_capacity_plus_one_returns_sentinel() {
        let (mut ctx, _clock, _recorder) = context(4);
        for _ in 0..4 {
            ctx.add_instance(&WORKER, Worker::default(), false).unwrap();
        }

        let overflow = ctx.add_instance(&WORKER, Worker::default(), false);
        assert!(matches!(overflow, Err(EngineError::Capacity { .. })));
        assert_eq!(ctx.live_count(), 4);
        assert_eq!(ctx.capacity(), 4);
    }

    #[test]
    fn test_timer_removal_is_idempotent_and_independent() {
        let (mut ctx, clock, _recorder) = context(2);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();

        let first = ctx.set_timer(id, 100, 0, Msg::Tick(1));
        let second = ctx.set_timer(id, 100, 0, Msg::Tick(2));
        assert_ne!(first, second);

        assert!(ctx.remove_timer(&first));
        assert!(!ctx.remove_timer(&first));
        assert_eq!(ctx.pending_timers().count(), 1);

        assert_eq!(ctx.run_until_idle(), Some(100));
        assert_eq!(trace(&ctx, id), "");

        clock.set(100);
        assert_eq!(ctx.run_until_idle(), None);
        assert_eq!(trace(&ctx, id), "tick2");

        assert!(!ctx.remove_timer(&second));
        clock.advance(1_000);
        ctx.run_until_idle();
        assert_eq!(trace(&ctx, id), "tick2");
    }

    #[test]
    fn test_timers_fire_in_deadline_order_with_jitter_window() {
        let (mut ctx, clock, _recorder) = context(1);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();

        ctx.set_timer(id, 300, 0, Msg::Tick(3));
        ctx.set_timer(id, 100, 50, Msg::Tick(1));
        ctx.set_timer(id, 120, 0, Msg::Tick(2));

        assert_eq!(ctx.next_deadline(), Some(120));

        clock.set(120);
        assert_eq!(ctx.run_until_idle(), Some(300));
        assert_eq!(trace(&ctx, id), "tick1,tick2");

        clock.set(300);
        ctx.run_until_idle();
        assert_eq!(trace(&ctx, id), "tick1,tick2,tick3");
    }

    #[test]
    fn test_call_as_parent_restores_current_instance() {
        let (mut ctx, _clock, _recorder) = context(4);
        let parent = ctx.add_instance(&PARENT, 0, false).unwrap();

        ctx.send(parent, Msg::Ask);
        ctx.run_until_idle();
        let children = ctx.children_of(parent);
        assert_eq!(children.len(), 1);
        let child = children[0];
        assert_eq!(ctx.owner_of(child), Some(parent));

        ctx.send(child, Msg::Poke);
        ctx.run_until_idle();

        assert_eq!(
            replies(&mut ctx),
            vec![
                (Address::Instance(parent), Msg::Reply(1)),
                (Address::Instance(child), Msg::Reply(2)),
            ]
        );
        assert_eq!(ctx.state_of(parent), Some((PARENT_DONE, "done")));
        assert!(!ctx.is_live(child));
        assert!(ctx.children_of(parent).is_empty());
        assert_eq!(ctx.pending_timers().count(), 0);
    }

    #[test]
    fn test_call_as_parent_without_owner_does_nothing() {
        let (mut ctx, _clock, _recorder) = context(2);
        let orphan = ctx.add_instance(&CHILD, (), true).unwrap();
        assert_eq!(ctx.pending_timers().count(), 1);

        ctx.send(orphan, Msg::Poke);
        ctx.run_until_idle();

        assert_eq!(
            replies(&mut ctx),
            vec![(Address::Instance(orphan), Msg::Reply(0))]
        );
        assert!(ctx.is_live(orphan));
    }

    #[test]
    fn test_sub_instance_terminates_with_parent() {
        let (mut ctx, _clock, recorder) = context(4);
        let parent = ctx.add_instance(&PARENT, 0, false).unwrap();
        ctx.send(parent, Msg::Ask);
        ctx.run_until_idle();
        let child = ctx.children_of(parent)[0];
        assert_eq!(ctx.pending_timers().count(), 1);

        ctx.terminate_instance(parent).unwrap();

        assert!(!ctx.is_live(parent));
        assert!(!ctx.is_live(child));
        assert_eq!(ctx.live_count(), 0);
        assert_eq!(ctx.pending_timers().count(), 0);
        assert_eq!(recorder.count("terminated"), 2);
    }

    #[test]
    fn test_sub_instance_timeout_terminates_only_the_child() {
        let (mut ctx, clock, _recorder) = context(4);
        let parent = ctx.add_instance(&PARENT, 0, false).unwrap();
        ctx.send(parent, Msg::Ask);
        assert_eq!(ctx.run_until_idle(), Some(1_000));
        let child = ctx.children_of(parent)[0];

        clock.set(1_000);
        assert_eq!(ctx.run_until_idle(), None);

        assert!(!ctx.is_live(child));
        assert!(ctx.is_live(parent));
        assert_eq!(ctx.state_of(parent), Some((PARENT_WAITING, "waiting")));
    }

    #[test]
    fn test_events_for_terminated_instance_are_dropped() {
        let (mut ctx, _clock, recorder) = context(1);
        let stale = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();
        ctx.terminate_instance(stale).unwrap();

        let fresh = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();
        assert_eq!(fresh.index(), stale.index());
        assert_ne!(fresh, stale);

        ctx.send(stale, Msg::Start);
        ctx.run_until_idle();

        assert_eq!(recorder.count("unknown"), 1);
        assert_eq!(ctx.state_of(fresh), Some((IDLE, "idle")));
        assert!(matches!(
            ctx.terminate_instance(stale),
            Err(EngineError::UnknownDestination { .. })
        ));
    }

    #[test]
    fn test_fallback_handles_unmatched_kind() {
        let (mut ctx, _clock, recorder) = context(1);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();

        ctx.send(id, Msg::Poke);
        ctx.run_until_idle();

        assert_eq!(
            replies(&mut ctx),
            vec![(Address::Instance(id), Msg::Reply(99))]
        );
        assert_eq!(recorder.count("fallback Poke poke_fallback"), 1);
        let last = ctx.history(id).unwrap().iter().last().copied().unwrap();
        assert_eq!(last.disposition, Disposition::Fallback("poke_fallback"));
    }

    #[test]
    fn test_unmatched_without_fallback_is_invalid_and_not_fatal() {
        let (mut ctx, _clock, recorder) = context(1);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();

        ctx.send(id, Msg::Ask);
        ctx.send(id, Msg::Start);
        ctx.run_until_idle();

        assert_eq!(recorder.count("invalid Ask in idle"), 1);
        assert_eq!(ctx.state_of(id), Some((BUSY, "busy")));
    }

    #[test]
    fn test_ignore_list_takes_precedence_over_save() {
        let (mut ctx, _clock, recorder) = context(1);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();
        ctx.ignore(id, Kind::Ask).unwrap();

        ctx.send(id, Msg::Ask);
        ctx.send(id, Msg::Start);
        ctx.send(id, Msg::Ask);
        ctx.run_until_idle();

        assert_eq!(recorder.count("ignored Ask"), 2);
        assert_eq!(recorder.count("invalid"), 0);
        assert_eq!(ctx.dump(id).unwrap().saved_events, 0);
        assert_eq!(ctx.dump(id).unwrap().ignored_kinds, vec!["Ask".to_string()]);
    }

    #[test]
    fn test_explicit_error_keeps_instance_alive() {
        let (mut ctx, _clock, recorder) = context(1);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();

        ctx.send(id, Msg::Reply(5));
        ctx.run_until_idle();

        assert_eq!(recorder.count("error Reply: reply without a request"), 1);
        assert!(ctx.is_live(id));
        let last = ctx.history(id).unwrap().iter().last().copied().unwrap();
        assert_eq!(last.disposition, Disposition::Error);
    }

    #[test]
    fn test_reset_returns_to_initial_state_and_discards_saved() {
        let (mut ctx, _clock, _recorder) = context(1);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();
        ctx.ignore(id, Kind::Ask).unwrap();
        ctx.send(id, Msg::Start);
        ctx.send(id, Msg::Item(1));
        ctx.run_until_idle();
        assert_eq!(ctx.dump(id).unwrap().saved_events, 1);

        ctx.reset_instance(id).unwrap();

        let dump = ctx.dump(id).unwrap();
        assert_eq!(dump.state_name, "idle");
        assert_eq!(dump.saved_events, 0);
        assert!(dump.ignored_kinds.is_empty());
        assert_eq!(dump.trace.as_deref(), Some("start,reset"));
    }

    #[test]
    fn test_external_sender_wakes_host_and_delivers() {
        let (mut ctx, _clock, _recorder) = context(1);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();
        let wakeups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakeups);
        ctx.set_wakeup(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let sender = ctx.external_sender();
        std::thread::spawn(move || sender.send(id, Msg::Item(7)))
            .join()
            .unwrap();

        assert_eq!(wakeups.load(Ordering::SeqCst), 1);
        assert!(ctx.has_pending_events());
        ctx.run_until_idle();
        assert_eq!(trace(&ctx, id), "item7");
    }

    #[test]
    fn test_environment_handler_receives_deliveries() {
        let (mut ctx, _clock, _recorder) = context(1);
        let id = ctx.add_instance(&WORKER, Worker::default(), false).unwrap();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        ctx.set_environment_handler(move |delivery| sink.borrow_mut().push(delivery.into_message()));

        ctx.send(id, Msg::Poke);
        ctx.run_until_idle();

        assert_eq!(*received.borrow(), vec![Msg::Reply(99)]);
        assert!(ctx.take_environment_events().is_empty());
    }

    #[test]
    fn test_dump_all_serialises_every_instance() {
        let (mut ctx, _clock, _recorder) = context(4);
        let parent = ctx.add_instance(&PARENT, 0, false).unwrap();
        ctx.send(parent, Msg::Ask);
        ctx.run_until_idle();

        let dumps = ctx.dump_all();
        assert_eq!(dumps.len(), 2);

        let json = serde_json::to_value(&dumps).unwrap();
        assert_eq!(json[0]["process"], "parent");
        assert_eq!(json[0]["history"][0]["disposition"], "transition:spawn_child");
        assert_eq!(json[1]["process"], "child");
        assert_eq!(json[1]["owner"]["index"], 0);
    }

    #[test]
    fn test_parent_guard_restores_child_on_early_exit() {
        let (mut ctx, _clock, _recorder) = context(4);
        let parent = ctx.add_instance(&PARENT, 0, false).unwrap();
        ctx.send(parent, Msg::Ask);
        ctx.run_until_idle();
        let child = ctx.children_of(parent)[0];

        ctx.send(child, Msg::Item(0));
        ctx.run_until_idle();
        assert_eq!(
            replies(&mut ctx),
            vec![
                (Address::Instance(parent), Msg::Reply(10)),
                (Address::Instance(child), Msg::Reply(2)),
            ]
        );

        ctx.send(child, Msg::Item(5));
        ctx.run_until_idle();
        assert_eq!(
            replies(&mut ctx),
            vec![
                (Address::Instance(parent), Msg::Reply(10)),
                (Address::Instance(parent), Msg::Reply(5)),
                (Address::Instance(child), Msg::Reply(2)),
            ]
        );
        assert!(ctx.is_live(child));
    }

    #[test]
    fn test_set_state_keeps_saved_events_until_next_state() {
        let (mut ctx, _clock, _recorder) = context(1);
        let gate = ctx.add_instance(&GATE, Vec::new(), false).unwrap();

        ctx.send(gate, Msg::Item(1));
        ctx.send(gate, Msg::Item(2));
        ctx.send(gate, Msg::Start);
        ctx.run_until_idle();

        assert_eq!(ctx.state_of(gate), Some((GATE_LATCHED, "latched")));
        assert_eq!(ctx.dump(gate).unwrap().saved_events, 2);
        assert_eq!(trace(&ctx, gate), "");

        ctx.send(gate, Msg::Item(3));
        ctx.send(gate, Msg::Done);
        ctx.run_until_idle();

        assert_eq!(ctx.state_of(gate), Some((GATE_OPEN, "open")));
        assert_eq!(ctx.dump(gate).unwrap().saved_events, 0);
        assert_eq!(trace(&ctx, gate), "latched3,item1,item2");
    }
}
