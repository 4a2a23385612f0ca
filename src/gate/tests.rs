//! Tests for the gate protocol.

use super::*;
use crate::error::AloneError;
use crate::key::ResourceIdentity;
use crate::lock::{FileLockService, MemoryLockService};
use crate::state::{FileStateSource, StateSnapshot};
use crate::trigger::CommentTrigger;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Read(String),
    Acquire(String),
    Release(String),
    Delegate,
}

type Journal = Arc<Mutex<Vec<Call>>>;

fn calls(journal: &Journal) -> Vec<Call> {
    journal.lock().unwrap().clone()
}

/// Lock service spy with a scripted acquire answer.
struct SpyLocks {
    journal: Journal,
    acquire_result: bool,
    fail_release: bool,
    fail_acquire: bool,
}

impl SpyLocks {
    fn new(journal: &Journal, acquire_result: bool) -> Self {
        Self {
            journal: journal.clone(),
            acquire_result,
            fail_release: false,
            fail_acquire: false,
        }
    }
}

impl LockService for SpyLocks {
    fn acquire(&self, key: &LockKey, _holder: &str) -> Result<bool> {
        self.journal
            .lock()
            .unwrap()
            .push(Call::Acquire(key.to_string()));
        if self.fail_acquire {
            return Err(AloneError::LockService("connection refused".to_string()));
        }
        Ok(self.acquire_result)
    }

    fn release(&self, key: &LockKey, _holder: &str) -> Result<()> {
        self.journal
            .lock()
            .unwrap()
            .push(Call::Release(key.to_string()));
        if self.fail_release {
            return Err(AloneError::LockService("connection refused".to_string()));
        }
        Ok(())
    }
}

/// State source returning a fixed activity flag, named after the work item.
struct FixedState {
    journal: Journal,
    active: bool,
    fail: bool,
}

impl FixedState {
    fn new(journal: &Journal, active: bool) -> Self {
        Self {
            journal: journal.clone(),
            active,
            fail: false,
        }
    }
}

impl StateSource for FixedState {
    fn read(&self, work_item: &str) -> Result<StateSnapshot> {
        self.journal
            .lock()
            .unwrap()
            .push(Call::Read(work_item.to_string()));
        if self.fail {
            return Err(AloneError::StateRead("talk store offline".to_string()));
        }
        Ok(StateSnapshot {
            name: work_item.to_string(),
            has_active_or_pending_work: self.active,
        })
    }
}

enum Script {
    Proceed(&'static str),
    Empty,
    Fail,
}

struct SpyDelegate {
    journal: Journal,
    script: Script,
}

impl SpyDelegate {
    fn new(journal: &Journal, script: Script) -> Self {
        Self {
            journal: journal.clone(),
            script,
        }
    }
}

impl Delegate<CommentTrigger> for SpyDelegate {
    type Payload = String;

    fn invoke(&self, _trigger: &CommentTrigger) -> Result<Decision<String>> {
        self.journal.lock().unwrap().push(Call::Delegate);
        match self.script {
            Script::Proceed(p) => Ok(Decision::Proceed(p.to_string())),
            Script::Empty => Ok(Decision::Empty),
            Script::Fail => Err(AloneError::Delegate("build script crashed".to_string())),
        }
    }
}

/// Delegate that only counts invocations; safe to share across threads.
#[derive(Default)]
struct CountingDelegate {
    calls: AtomicUsize,
}

impl Delegate<CommentTrigger> for CountingDelegate {
    type Payload = String;

    fn invoke(&self, trigger: &CommentTrigger) -> Result<Decision<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Decision::Proceed(format!("build-{}", trigger.talk)))
    }
}

fn trigger(repo: &str, talk: &str) -> CommentTrigger {
    CommentTrigger {
        repo: repo.parse().unwrap(),
        talk: talk.to_string(),
        body: "@bot deploy".to_string(),
        author: "octocat".to_string(),
    }
}

const KEY_A: &str = "rt-alone-repo-A";

#[test]
fn test_idle_state_self_heals_then_proceeds() {
    let journal = Journal::default();
    let gate = Gate::new(
        SpyLocks::new(&journal, true),
        FixedState::new(&journal, false),
        SpyDelegate::new(&journal, Script::Proceed("build-1")),
    );

    let outcome = gate.process(&trigger("repo/A", "t1")).unwrap();

    assert_eq!(outcome, Outcome::Proceed("build-1".to_string()));
    assert_eq!(
        calls(&journal),
        vec![
            Call::Read("t1".to_string()),
            Call::Release(KEY_A.to_string()),
            Call::Acquire(KEY_A.to_string()),
            Call::Delegate,
        ]
    );
}

#[test]
fn test_busy_resource_defers_without_delegate() {
    let journal = Journal::default();
    let gate = Gate::new(
        SpyLocks::new(&journal, false),
        FixedState::new(&journal, true),
        SpyDelegate::new(&journal, Script::Proceed("never")),
    );

    let outcome = gate.process(&trigger("repo/A", "t1")).unwrap();

    assert_eq!(outcome, Outcome::Later);
    assert_eq!(
        calls(&journal),
        vec![
            Call::Read("t1".to_string()),
            Call::Acquire(KEY_A.to_string()),
        ]
    );
}

#[test]
fn test_contention_after_self_heal_still_defers() {
    let journal = Journal::default();
    let gate = Gate::new(
        SpyLocks::new(&journal, false),
        FixedState::new(&journal, false),
        SpyDelegate::new(&journal, Script::Proceed("never")),
    );

    let mut trace = Trace::default();
    let outcome = gate.process_traced(&trigger("repo/A", "t1"), &mut trace).unwrap();

    assert_eq!(outcome, Outcome::Later);
    assert!(trace.self_healed);
    assert!(trace.deferred);
    assert!(!trace.acquired);
    assert!(!trace.released);
    assert!(!calls(&journal).contains(&Call::Delegate));
}

#[test]
fn test_empty_decision_releases_after_delegate() {
    let journal = Journal::default();
    let gate = Gate::new(
        SpyLocks::new(&journal, true),
        FixedState::new(&journal, true),
        SpyDelegate::new(&journal, Script::Empty),
    );

    let mut trace = Trace::default();
    let outcome = gate.process_traced(&trigger("repo/A", "t1"), &mut trace).unwrap();

    assert_eq!(outcome, Outcome::Empty);
    assert!(trace.acquired);
    assert!(trace.released);
    assert!(!trace.self_healed);
    assert_eq!(
        calls(&journal),
        vec![
            Call::Read("t1".to_string()),
            Call::Acquire(KEY_A.to_string()),
            Call::Delegate,
            Call::Release(KEY_A.to_string()),
        ]
    );
}

#[test]
fn test_proceed_keeps_lock_held() {
    let journal = Journal::default();
    let gate = Gate::new(
        SpyLocks::new(&journal, true),
        FixedState::new(&journal, true),
        SpyDelegate::new(&journal, Script::Proceed("build-7")),
    );

    let outcome = gate.process(&trigger("repo/A", "t1")).unwrap();

    assert_eq!(outcome, Outcome::Proceed("build-7".to_string()));
    let releases = calls(&journal)
        .into_iter()
        .filter(|c| matches!(c, Call::Release(_)))
        .count();
    assert_eq!(releases, 0);
}

#[test]
fn test_state_read_failure_touches_no_lock() {
    let journal = Journal::default();
    let mut states = FixedState::new(&journal, false);
    states.fail = true;
    let gate = Gate::new(
        SpyLocks::new(&journal, true),
        states,
        SpyDelegate::new(&journal, Script::Empty),
    );

    let err = gate.process(&trigger("repo/A", "t1")).unwrap_err();

    assert!(matches!(err, AloneError::StateRead(_)));
    assert_eq!(calls(&journal), vec![Call::Read("t1".to_string())]);
}

#[test]
fn test_self_heal_failure_skips_acquire() {
    let journal = Journal::default();
    let mut locks = SpyLocks::new(&journal, true);
    locks.fail_release = true;
    let gate = Gate::new(
        locks,
        FixedState::new(&journal, false),
        SpyDelegate::new(&journal, Script::Empty),
    );

    let err = gate.process(&trigger("repo/A", "t1")).unwrap_err();

    assert!(matches!(err, AloneError::LockService(_)));
    assert_eq!(
        calls(&journal),
        vec![
            Call::Read("t1".to_string()),
            Call::Release(KEY_A.to_string()),
        ]
    );
}

#[test]
fn test_acquire_failure_is_an_error_not_later() {
    let journal = Journal::default();
    let mut locks = SpyLocks::new(&journal, true);
    locks.fail_acquire = true;
    let gate = Gate::new(
        locks,
        FixedState::new(&journal, true),
        SpyDelegate::new(&journal, Script::Empty),
    );

    let err = gate.process(&trigger("repo/A", "t1")).unwrap_err();

    assert!(matches!(err, AloneError::LockService(_)));
    assert!(!calls(&journal).contains(&Call::Delegate));
}

#[test]
fn test_release_failure_after_empty_propagates() {
    let journal = Journal::default();
    let mut locks = SpyLocks::new(&journal, true);
    locks.fail_release = true;
    let gate = Gate::new(
        locks,
        FixedState::new(&journal, true),
        SpyDelegate::new(&journal, Script::Empty),
    );

    let err = gate.process(&trigger("repo/A", "t1")).unwrap_err();
    assert!(matches!(err, AloneError::LockService(_)));
}

#[test]
fn test_delegate_failure_propagates_and_keeps_lock() {
    let journal = Journal::default();
    let locks = MemoryLockService::new();
    let gate = Gate::new(
        &locks,
        FixedState::new(&journal, true),
        SpyDelegate::new(&journal, Script::Fail),
    );
    let t = trigger("repo/A", "t1");

    let err = gate.process(&t).unwrap_err();

    assert_eq!(err.to_string(), "Delegate failed: build script crashed");
    assert_eq!(locks.holder(&gate.key_for(&t)).as_deref(), Some("t1"));
}

#[test]
fn test_trace_survives_delegate_failure() {
    let journal = Journal::default();
    let gate = Gate::new(
        SpyLocks::new(&journal, true),
        FixedState::new(&journal, false),
        SpyDelegate::new(&journal, Script::Fail),
    );

    let mut trace = Trace::default();
    gate.process_traced(&trigger("repo/A", "t1"), &mut trace).unwrap_err();

    assert_eq!(trace.key.as_ref().map(LockKey::as_str), Some(KEY_A));
    assert_eq!(trace.holder.as_deref(), Some("t1"));
    assert!(trace.self_healed);
    assert!(trace.acquired);
    assert!(!trace.released);
}

#[test]
fn test_trace_on_state_failure_has_key_only() {
    let journal = Journal::default();
    let mut states = FixedState::new(&journal, false);
    states.fail = true;
    let gate = Gate::new(
        SpyLocks::new(&journal, true),
        states,
        SpyDelegate::new(&journal, Script::Empty),
    );

    let mut trace = Trace::default();
    gate.process_traced(&trigger("repo/A", "t1"), &mut trace).unwrap_err();

    assert_eq!(trace.key.as_ref().map(LockKey::as_str), Some(KEY_A));
    assert!(trace.holder.is_none());
    assert!(!trace.self_healed);
    assert!(!trace.acquired);
}

#[test]
fn test_self_heal_recovers_lock_from_crashed_run() {
    let journal = Journal::default();
    let locks = MemoryLockService::new();
    let key = derive_key(DEFAULT_KEY_PREFIX, &"repo/A".parse::<ResourceIdentity>().unwrap());
    // A previous run for t1 died while holding the lock.
    locks.acquire(&key, "t1").unwrap();

    let gate = Gate::new(
        &locks,
        FixedState::new(&journal, false),
        SpyDelegate::new(&journal, Script::Proceed("build-2")),
    );

    let outcome = gate.process(&trigger("repo/A", "t1")).unwrap();
    assert_eq!(outcome, Outcome::Proceed("build-2".to_string()));
}

#[test]
fn test_self_heal_never_steals_another_work_items_lock() {
    let journal = Journal::default();
    let locks = MemoryLockService::new();
    let key = derive_key(DEFAULT_KEY_PREFIX, &"repo/A".parse::<ResourceIdentity>().unwrap());
    locks.acquire(&key, "t1").unwrap();

    let gate = Gate::new(
        &locks,
        FixedState::new(&journal, false),
        SpyDelegate::new(&journal, Script::Proceed("never")),
    );

    let outcome = gate.process(&trigger("repo/A", "t2")).unwrap();

    assert_eq!(outcome, Outcome::Later);
    assert_eq!(locks.holder(&key).as_deref(), Some("t1"));
}

#[test]
fn test_active_work_defers_repeat_triggers_until_idle() {
    let journal = Journal::default();
    let locks = MemoryLockService::new();
    let t = trigger("repo/A", "t1");

    let idle = Gate::new(
        &locks,
        FixedState::new(&journal, false),
        SpyDelegate::new(&journal, Script::Proceed("build-1")),
    );
    assert_eq!(idle.process(&t).unwrap(), Outcome::Proceed("build-1".to_string()));

    // The request is now recorded; further comments are deferred.
    let busy = Gate::new(
        &locks,
        FixedState::new(&journal, true),
        SpyDelegate::new(&journal, Script::Proceed("build-2")),
    );
    assert_eq!(busy.process(&t).unwrap(), Outcome::Later);
    assert_eq!(busy.process(&t).unwrap(), Outcome::Later);

    // Work finished: the next trigger self-heals and proceeds.
    assert_eq!(idle.process(&t).unwrap(), Outcome::Proceed("build-1".to_string()));
}

#[test]
fn test_different_resources_do_not_contend() {
    let journal = Journal::default();
    let locks = MemoryLockService::new();
    let gate = Gate::new(
        &locks,
        FixedState::new(&journal, true),
        SpyDelegate::new(&journal, Script::Proceed("go")),
    );

    assert!(!gate.process(&trigger("repo/A", "t1")).unwrap().is_later());
    assert!(!gate.process(&trigger("repo/B", "t2")).unwrap().is_later());
}

#[test]
fn test_custom_prefix_is_used_for_keys() {
    let journal = Journal::default();
    let gate = Gate::with_prefix(
        SpyLocks::new(&journal, true),
        FixedState::new(&journal, true),
        SpyDelegate::new(&journal, Script::Empty),
        "ci",
    );

    let mut trace = Trace::default();
    gate.process_traced(&trigger("acme/web.site", "t1"), &mut trace).unwrap();
    assert_eq!(trace.key.unwrap().as_str(), "ci-acme-web-site");
    assert_eq!(trace.holder.as_deref(), Some("t1"));
}

#[test]
fn test_concurrent_callers_on_same_key_exactly_one_wins() {
    const CALLERS: usize = 8;

    let journal = Journal::default();
    let locks = MemoryLockService::new();
    let states = FixedState::new(&journal, false);
    let delegate = CountingDelegate::default();
    let gate = Gate::new(&locks, &states, &delegate);
    let barrier = Barrier::new(CALLERS);

    let outcomes: Vec<Outcome<String>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|i| {
                let gate = &gate;
                let barrier = &barrier;
                s.spawn(move || {
                    let t = trigger("repo/A", &format!("t{}", i));
                    barrier.wait();
                    gate.process(&t).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners = outcomes.iter().filter(|o| !o.is_later()).count();
    assert_eq!(winners, 1);
    assert_eq!(delegate.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_gate_with_file_collaborators() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let locks = FileLockService::new(temp_dir.path().join("locks"));
    let states = FileStateSource::new(temp_dir.path().join("talks"));
    std::fs::create_dir_all(temp_dir.path().join("talks")).unwrap();
    std::fs::write(states.talk_path("t1"), "name: t1\n").unwrap();
    std::fs::write(states.talk_path("t2"), "name: t2\nrequest: {id: r1}\n").unwrap();

    let journal = Journal::default();
    let gate = Gate::new(
        &locks,
        &states,
        SpyDelegate::new(&journal, Script::Proceed("build-1")),
    );

    let t1 = trigger("acme/widgets", "t1");
    let first = gate.process(&t1).unwrap();
    assert_eq!(first, Outcome::Proceed("build-1".to_string()));
    assert!(locks.lock_path(&gate.key_for(&t1)).exists());

    let second = gate.process(&trigger("acme/widgets", "t2")).unwrap();
    assert_eq!(second, Outcome::Later);
}

#[test]
fn test_concurrent_idle_callers_with_file_collaborators_exactly_one_wins() {
    const CALLERS: usize = 8;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let locks = FileLockService::new(temp_dir.path().join("locks"));
    let states = FileStateSource::new(temp_dir.path().join("talks"));
    std::fs::create_dir_all(temp_dir.path().join("talks")).unwrap();
    for i in 0..CALLERS {
        std::fs::write(states.talk_path(&format!("t{}", i)), format!("name: t{}\n", i)).unwrap();
    }

    let delegate = CountingDelegate::default();
    let gate = Gate::new(&locks, &states, &delegate);
    let barrier = Barrier::new(CALLERS);

    // Every talk is idle, so each caller's self-heal release races the
    // other callers' acquires.
    let results: Vec<Result<Outcome<String>>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|i| {
                let gate = &gate;
                let barrier = &barrier;
                s.spawn(move || {
                    let t = trigger("acme/widgets", &format!("t{}", i));
                    barrier.wait();
                    gate.process(&t)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let outcomes: Vec<Outcome<String>> = results.into_iter().map(|r| r.unwrap()).collect();
    let winners = outcomes.iter().filter(|o| !o.is_later()).count();
    assert_eq!(winners, 1);
    assert_eq!(delegate.calls.load(Ordering::SeqCst), 1);
    assert_eq!(locks.list(120).unwrap().len(), 1);
}
