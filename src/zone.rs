//! Safe zone — the held gate and every operation that needs it
//!
//! A [`SafeZone`] is the only handle to the scheduling metadata. Operations
//! that end a critical section consume it: [`SafeZone::login_request`]
//! returns a [`Ticket`] only after the gate is released, and the ticket is
//! the only way to wait on a wake signal. Waiting while holding the zone
//! that produced the ticket does not type-check.
//!
//! State machine per task:
//!
//! ```text
//! Idle ──login (slot free)──▶ Active
//! Idle ──login (slot taken)─▶ Waiting
//! Waiting ──wake──▶ Active        (previous leader: Active ──▶ Waiting)
//! Active ──leave_slot──▶ Idle
//! ```
//!
//! Author: Moroya Sakamoto

use core::mem::ManuallyDrop;

use crate::scheduler::{Scheduler, SchedulerState, SchedulerStats, Snapshot};
use crate::signal::WakeSignal;
use crate::sync::MutexGuard;
use crate::task::{TaskId, TaskState};

/// Held scheduler gate
///
/// Dropping the zone releases the gate.
pub struct SafeZone<'a, const N: usize> {
    sched: &'a Scheduler<N>,
    state: MutexGuard<'a, SchedulerState<N>>,
}

impl<'a, const N: usize> SafeZone<'a, N> {
    pub(crate) fn new(sched: &'a Scheduler<N>, state: MutexGuard<'a, SchedulerState<N>>) -> Self {
        Self { sched, state }
    }

    /// Release the gate
    pub fn leave_safe_zone(self) {}

    /// True iff nobody holds leadership
    pub fn is_slot_available(&self) -> bool {
        self.state.leader.is_none()
    }

    /// Current leader
    pub fn leader(&self) -> Option<TaskId<N>> {
        self.state.leader
    }

    /// Next round-robin candidate
    pub fn cursor(&self) -> TaskId<N> {
        self.state.cursor
    }

    /// State of one slot
    pub fn state(&self, id: TaskId<N>) -> TaskState {
        self.state.slots[id.index()].state
    }

    /// Counters so far
    pub fn stats(&self) -> SchedulerStats {
        self.state.stats
    }

    /// Copy of the metadata
    pub fn snapshot(&self) -> Snapshot<N> {
        Snapshot::capture(&self.state)
    }

    /// Hand leadership to a waiting task.
    ///
    /// Returns false and changes nothing if `target` is not waiting. On
    /// success the previous leader, if any, is demoted to waiting, `target`
    /// becomes the leader and its wake signal is raised once.
    pub fn wake(&mut self, target: TaskId<N>) -> bool {
        let st = &mut *self.state;
        if !st.slots[target.index()].state.is_blocked() {
            return false;
        }

        if let Some(prev) = st.leader {
            st.slots[prev.index()].state = TaskState::Waiting;
            st.stats.preemptions = st.stats.preemptions.wrapping_add(1);
        }

        let slot = &mut st.slots[target.index()];
        slot.state = TaskState::Active;
        slot.activations = slot.activations.wrapping_add(1);
        st.leader = Some(target);
        st.stats.handoffs = st.stats.handoffs.wrapping_add(1);

        if !self.sched.signal(target).give() {
            log::debug!("wake: {target} already had a wake pending");
        }
        log::trace!("wake: {target} leads");
        true
    }

    /// Drop leadership without naming a successor
    pub fn leave_slot(&mut self) {
        let st = &mut *self.state;
        if let Some(prev) = st.leader.take() {
            st.slots[prev.index()].state = TaskState::Idle;
            log::trace!("leave_slot: {prev} released, no leader");
        }
    }

    /// Ask for leadership and release the gate.
    ///
    /// If the slot is free, or `id` already leads, `id` becomes the leader
    /// and its own signal is raised so the following
    /// [`Ticket::check_login`] returns at once. Otherwise `id` is marked
    /// waiting and the ticket blocks until some leader wakes it.
    pub fn login_request(mut self, id: TaskId<N>) -> Ticket<'a, N> {
        let granted = self.try_login(id);
        let sched = self.sched;
        drop(self);
        Ticket {
            signal: sched.signal(id),
            id,
            granted,
        }
    }

    fn try_login(&mut self, id: TaskId<N>) -> bool {
        let st = &mut *self.state;
        let slot_free = st.leader.is_none();

        if slot_free || st.leader == Some(id) {
            let slot = &mut st.slots[id.index()];
            if slot_free {
                slot.activations = slot.activations.wrapping_add(1);
            }
            slot.state = TaskState::Active;
            st.leader = Some(id);
            st.stats.logins_granted = st.stats.logins_granted.wrapping_add(1);
            if !self.sched.signal(id).give() {
                log::debug!("login: {id} already had a wake pending");
            }
            log::debug!("login: {id} granted");
            true
        } else {
            st.slots[id.index()].state = TaskState::Waiting;
            st.stats.logins_deferred = st.stats.logins_deferred.wrapping_add(1);
            log::debug!("login: {id} waits behind {:?}", st.leader);
            false
        }
    }

    /// Fairness handoff.
    ///
    /// Moves the cursor to `preference` if given, then tries to wake up to N
    /// candidates in increasing id order from the cursor, wrapping. Stops at
    /// the first success with the cursor one past the winner. Returns false
    /// after one full pass with nobody waiting; the caller should then
    /// [`leave_slot`](Self::leave_slot).
    ///
    /// The caller's own id is scanned like any other: while it leads it is
    /// not waiting, so the wake fails on its own.
    pub fn round_robin(&mut self, caller: TaskId<N>, preference: Option<TaskId<N>>) -> bool {
        if let Some(p) = preference {
            self.state.cursor = p;
        }
        self.state.stats.scans = self.state.stats.scans.wrapping_add(1);

        for _ in 0..N {
            let candidate = self.state.cursor;
            self.state.cursor = candidate.next();
            if self.wake(candidate) {
                log::trace!("round_robin: {caller} -> {candidate}");
                return true;
            }
        }

        self.state.stats.empty_scans = self.state.stats.empty_scans.wrapping_add(1);
        log::trace!("round_robin: {caller} found nobody waiting");
        false
    }

    /// End a turn: round-robin, or give up the slot if nobody waits.
    ///
    /// On `Passed` the caller has been demoted to waiting and must wait on
    /// the returned ticket before acting again. A caller that does not lead
    /// gets `Released` and nothing changes.
    pub fn hand_off(mut self, caller: TaskId<N>, preference: Option<TaskId<N>>) -> Handoff<'a, N> {
        if self.state.leader != Some(caller) {
            log::warn!("hand_off: {caller} does not lead ({:?})", self.state.leader);
            return Handoff::Released;
        }
        if self.round_robin(caller, preference) {
            let granted = self.state(caller) == TaskState::Active;
            let sched = self.sched;
            drop(self);
            Handoff::Passed(Ticket {
                signal: sched.signal(caller),
                id: caller,
                granted,
            })
        } else {
            self.leave_slot();
            Handoff::Released
        }
    }

    /// Give up leadership for good and pass it to a waiter, if any.
    ///
    /// `caller` ends idle, never waiting, so it can stop taking turns.
    /// Returns whether a successor was woken. A caller that does not lead
    /// gets false and nothing changes.
    pub fn resign(mut self, caller: TaskId<N>) -> bool {
        if self.state.leader != Some(caller) {
            log::warn!("resign: {caller} does not lead ({:?})", self.state.leader);
            return false;
        }
        self.leave_slot();
        self.round_robin(caller, None)
    }
}

/// Outcome of [`SafeZone::login_request`] or a successful hand-off
///
/// The gate is already released when a ticket exists. Dropping a granted
/// ticket without [`check_login`](Self::check_login) consumes the pending
/// self-wake, so it cannot release a later wait early.
#[must_use = "a deferred login has to be waited on with check_login"]
#[derive(Debug)]
pub struct Ticket<'a, const N: usize> {
    signal: &'a WakeSignal,
    id: TaskId<N>,
    granted: bool,
}

impl<'a, const N: usize> Ticket<'a, N> {
    /// Task this ticket belongs to
    pub fn id(&self) -> TaskId<N> {
        self.id
    }

    /// Was leadership granted immediately?
    pub fn is_granted(&self) -> bool {
        self.granted
    }

    /// Block until this task is the leader.
    ///
    /// Returns at once on a granted ticket. No timeout: a waiting task
    /// stays parked until a leader wakes it.
    pub fn check_login(self) {
        let ticket = ManuallyDrop::new(self);
        ticket.signal.take();
        log::trace!("check_login: {} running", ticket.id);
    }
}

impl<const N: usize> Drop for Ticket<'_, N> {
    fn drop(&mut self) {
        if self.granted && self.signal.try_take() {
            log::debug!("ticket: {} dropped unwaited, self-wake cleared", self.id);
        }
    }
}

/// Outcome of [`SafeZone::hand_off`]
#[must_use]
#[derive(Debug)]
pub enum Handoff<'a, const N: usize> {
    /// Leadership moved on; wait on the ticket before the next turn
    Passed(Ticket<'a, N>),
    /// Nobody was waiting; the slot is free and the caller idle
    Released,
}


#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::atomic::{AtomicUsize, Ordering};
    use loom::sync::Arc;
    use loom::thread;

    /// Marks the critical section; fails if two tasks are ever inside.
    fn exclusive(inside: &AtomicUsize) {
        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
        inside.fetch_sub(1, Ordering::SeqCst);
    }

    /// Each task takes one turn and resigns. Every interleaving must end
    /// with both threads done and the slot free.
    #[test]
    fn loom_login_resign_exclusive() {
        loom::model(|| {
            let sched = Arc::new(Scheduler::<2>::new());
            let inside = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..2)
                .map(|raw| {
                    let sched = sched.clone();
                    let inside = inside.clone();
                    thread::spawn(move || {
                        let id = TaskId::<2>::must(raw);
                        sched.enter_safe_zone().login_request(id).check_login();
                        exclusive(&inside);
                        sched.enter_safe_zone().resign(id);
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }

            let snap = sched.snapshot();
            assert_eq!(snap.leader, None);
            assert_eq!(snap.active_count(), 0);
        });
    }

    /// Task 0 hands off to task 1 if it is waiting and waits to be woken
    /// back; task 1 resigns. No interleaving may strand task 0.
    #[test]
    fn loom_hand_off_and_back() {
        loom::model(|| {
            let sched = Arc::new(Scheduler::<2>::new());
            let inside = Arc::new(AtomicUsize::new(0));
            let a = TaskId::<2>::must(0);
            let b = TaskId::<2>::must(1);

            let first = {
                let sched = sched.clone();
                let inside = inside.clone();
                thread::spawn(move || {
                    sched.enter_safe_zone().login_request(a).check_login();
                    exclusive(&inside);
                    match sched.enter_safe_zone().hand_off(a, Some(b)) {
                        Handoff::Passed(ticket) => {
                            ticket.check_login();
                            exclusive(&inside);
                            sched.enter_safe_zone().resign(a);
                        }
                        Handoff::Released => {}
                    }
                })
            };

            let second = {
                let sched = sched.clone();
                let inside = inside.clone();
                thread::spawn(move || {
                    sched.enter_safe_zone().login_request(b).check_login();
                    exclusive(&inside);
                    sched.enter_safe_zone().resign(b);
                })
            };

            first.join().unwrap();
            second.join().unwrap();
            assert_eq!(sched.snapshot().leader, None);
        });
    }
}
