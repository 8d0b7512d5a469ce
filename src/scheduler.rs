//! C5 + C6: the scheduling API and the Advance driver.
//!
//! Grounded on `src/c64_emu/event.rs`'s `EventContext` for the overall
//! shape (one struct owning clock + queue, `schedule`/`clock_tick`
//! methods) and on `CoreTiming.cpp`'s `ScheduleEvent`/`Advance`/
//! `ForceExceptionCheck`/`Idle` for exact semantics — `EventContext` is
//! single-threaded and half-cycle grained, so the CPU-vs-non-CPU thread
//! split and the re-entrant `virtual_now()` adjustment are new relative
//! to it, carried over from the original instead.

use crate::clock::{ClockState, MAX_SLICE_LENGTH};
use crate::collaborators::{CpuHandle, CurrentThread, PanicNotifier, VideoFifo};
use crate::config::TimingConfig;
use crate::diagnostics;
use crate::event_types::{Callback, EventTypeRegistry, TypeId};
use crate::ingress::IngressQueue;
use crate::queue::{Event, EventQueue};
use crate::state::{ClockSnapshot, PersistedEvent};

/// Which thread a `schedule_event` call originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromThread {
    /// Ask the `CurrentThread` collaborator.
    Any,
    /// Caller asserts this is the CPU thread; checked against the
    /// collaborator's answer.
    Cpu,
    /// Caller asserts this is *not* the CPU thread; checked likewise.
    NonCpu,
}

/// Owns C2 (primary queue), C3 (ingress), C4 (clock state), and a
/// reference to C1 (registry) needed to dispatch callbacks and resolve
/// save-state type names. One instance per emulated machine.
pub struct Scheduler {
    clock: ClockState,
    queue: EventQueue,
    ingress: IngressQueue,
    registry: EventTypeRegistry,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            clock: ClockState::new(),
            queue: EventQueue::new(),
            ingress: IngressQueue::new(),
            registry: EventTypeRegistry::new(),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Latches the overclock factor from `config`, zeroes the clock, and
    /// opens the first maximal slice on `cpu`.
    pub fn init(&mut self, config: &TimingConfig, cpu: &mut dyn CpuHandle) {
        self.clock.relatch_overclock(config.effective_oc_factor());
        self.clock.global_timer = 0;
        self.clock.slice_length = MAX_SLICE_LENGTH;
        self.clock.idled_cycles = 0;
        self.clock.global_timer_sane = true;
        cpu.set_downcount(self.clock.cycles_to_downcount(MAX_SLICE_LENGTH));
    }

    /// Drains ingress, discards all pending events, then unregisters
    /// every type. Unlike a bare `unregister_all`, this never hits the
    /// "queue non-empty" assertion because the queue is cleared first.
    pub fn shutdown(&mut self) {
        self.ingress.with_locked(|pending| {
            for event in pending.drain(..) {
                self.queue.push(event);
            }
        });
        self.clear_pending_events();
        self.unregister_all();
    }

    pub fn clear_pending_events(&mut self) {
        self.queue.clear();
    }

    // ── C1 façade ──────────────────────────────────────────────────

    pub fn register_event(&mut self, name: &str, callback: Callback) -> TypeId {
        self.registry.register(name, callback)
    }

    /// Fatal assertion if the primary queue is non-empty (spec §4.2,
    /// §7): callers that actually want to tear down with events pending
    /// should go through [`Scheduler::shutdown`] instead.
    pub fn unregister_all(&mut self) {
        assert!(
            self.queue.is_empty(),
            "Cannot unregister events with events pending"
        );
        self.registry.clear();
    }

    pub fn lost_event_id(&self) -> TypeId {
        self.registry.lost_event_id()
    }

    // ── C5: scheduling API ────────────────────────────────────────

    /// `get_ticks()` / `virtual_now()`. May only be called from the CPU
    /// thread.
    pub fn get_ticks(&self, cpu: &dyn CpuHandle) -> u64 {
        self.clock.virtual_now(cpu.downcount()) as u64
    }

    pub fn get_idle_ticks(&self) -> u64 {
        self.clock.get_idle_ticks() as u64
    }

    #[allow(clippy::too_many_arguments)]
    pub fn schedule_event(
        &mut self,
        cycles_into_future: i64,
        type_id: TypeId,
        userdata: u64,
        from: FromThread,
        thread: &dyn CurrentThread,
        determinism_required: bool,
        cpu: &mut dyn CpuHandle,
    ) {
        let from_cpu_thread = match from {
            FromThread::Any => thread.is_cpu_thread(),
            FromThread::Cpu => {
                assert!(
                    thread.is_cpu_thread(),
                    "ScheduleEvent from wrong thread (expected CPU)"
                );
                true
            }
            FromThread::NonCpu => {
                assert!(
                    !thread.is_cpu_thread(),
                    "ScheduleEvent from wrong thread (expected non-CPU)"
                );
                false
            }
        };

        if from_cpu_thread {
            let deadline = self.get_ticks(cpu) as i64 + cycles_into_future;

            // Re-entrant scheduling from inside a dispatched callback:
            // force the CPU to surrender at the new deadline so it
            // doesn't overshoot it for the rest of the current slice.
            if !self.clock.global_timer_sane {
                self.force_exception_check(cycles_into_future, cpu);
            }

            self.queue.push(Event {
                deadline,
                userdata,
                type_id,
            });
        } else {
            if determinism_required {
                let name = self.registry.name(type_id).unwrap_or("<unknown>");
                log::error!(
                    "core-timing: off-thread schedule of \"{name}\" while netplay or movie \
                     play/record is active; likely to cause a desync"
                );
            }
            let deadline = self.clock.global_timer + cycles_into_future;
            self.ingress.push(Event {
                deadline,
                userdata,
                type_id,
            });
        }
    }

    pub fn remove_event(&mut self, type_id: TypeId) {
        self.queue.remove_by_type(type_id);
    }

    /// Drains ingress first so a racing off-thread schedule of this type
    /// can't land after the purge.
    pub fn remove_all_events(&mut self, type_id: TypeId) {
        self.move_events();
        self.remove_event(type_id);
    }

    pub fn force_exception_check(&mut self, cycles: i64, cpu: &mut dyn CpuHandle) {
        let executed_in_slice = self.clock.downcount_to_cycles(cpu.downcount()) as i64;
        if executed_in_slice > cycles {
            self.clock.slice_length -= (executed_in_slice - cycles) as i32;
            cpu.set_downcount(self.clock.cycles_to_downcount(cycles as i32));
        }
    }

    pub fn idle(&mut self, sync_gpu_on_idle_skip: bool, video: &mut dyn VideoFifo, cpu: &mut dyn CpuHandle) {
        if sync_gpu_on_idle_skip {
            // Don't advance while the FIFO is still processing data, or
            // VI timing would desync; only the events the FIFO itself
            // needs get to run until it drains.
            video.flush_gpu();
        }
        self.clock.idled_cycles += self.clock.downcount_to_cycles(cpu.downcount()) as i64;
        cpu.set_downcount(0);
    }

    fn move_events(&mut self) {
        for event in self.ingress.drain_all() {
            self.queue.push(event);
        }
    }

    // ── C6: Advance driver ────────────────────────────────────────

    pub fn advance(&mut self, config: &TimingConfig, cpu: &mut dyn CpuHandle) {
        self.move_events();

        let executed = self.clock.slice_length - self.clock.downcount_to_cycles(cpu.downcount());
        self.clock.global_timer += executed as i64;

        self.clock.relatch_overclock(config.effective_oc_factor());
        self.clock.slice_length = MAX_SLICE_LENGTH;
        self.clock.global_timer_sane = true;

        while let Some(head) = self.queue.peek() {
            if head.deadline > self.clock.global_timer {
                break;
            }
            let event = self.queue.pop_min().expect("just peeked a head");
            let cycles_late = self.clock.global_timer - event.deadline;
            self.registry.dispatch(event.type_id, event.userdata, cycles_late);
        }

        self.clock.global_timer_sane = false;

        if let Some(head) = self.queue.peek() {
            let to_next = head.deadline - self.clock.global_timer;
            self.clock.slice_length = to_next.min(MAX_SLICE_LENGTH as i64) as i32;
        }

        cpu.set_downcount(self.clock.cycles_to_downcount(self.clock.slice_length));

        // Deliberately after dispatch: some boot sequences need
        // exceptions raised by event callbacks delivered within this
        // same re-entry rather than deferred another full slice.
        cpu.check_external_exceptions();
    }

    // ── Decrementer / timebase shadow registers ──────────────────

    pub fn fake_dec_start_value(&self) -> u32 {
        self.clock.fake_dec_start_value
    }
    pub fn set_fake_dec_start_value(&mut self, value: u32) {
        self.clock.fake_dec_start_value = value;
    }
    pub fn fake_dec_start_ticks(&self) -> u64 {
        self.clock.fake_dec_start_ticks
    }
    pub fn set_fake_dec_start_ticks(&mut self, value: u64) {
        self.clock.fake_dec_start_ticks = value;
    }
    pub fn fake_tb_start_value(&self) -> u64 {
        self.clock.fake_tb_start_value
    }
    pub fn set_fake_tb_start_value(&mut self, value: u64) {
        self.clock.fake_tb_start_value = value;
    }
    pub fn fake_tb_start_ticks(&self) -> u64 {
        self.clock.fake_tb_start_ticks
    }
    pub fn set_fake_tb_start_ticks(&mut self, value: u64) {
        self.clock.fake_tb_start_ticks = value;
    }

    // ── C8: diagnostics ────────────────────────────────────────────

    pub fn log_pending_events(&self) {
        diagnostics::log_pending_events(&self.queue, &self.registry, self.clock.global_timer);
    }

    pub fn scheduled_events_summary(&self, panic: &mut dyn PanicNotifier) -> String {
        diagnostics::scheduled_events_summary(&self.queue, &self.registry, panic)
    }

    // ── C7: serialization ──────────────────────────────────────────

    /// `do_state(p)`, save direction. Holds the ingress lock for the
    /// whole operation (spec §4.7 step 1), drains it into the primary
    /// queue (step 3), then snapshots both.
    pub fn save_state(&mut self) -> (ClockSnapshot, Vec<PersistedEvent>) {
        let queue = &mut self.queue;
        let registry = &self.registry;
        let clock = &self.clock;

        self.ingress.with_locked(|pending| {
            for event in pending.drain(..) {
                queue.push(event);
            }

            let snapshot = ClockSnapshot {
                slice_length: clock.slice_length,
                global_timer: clock.global_timer,
                idled_cycles: clock.idled_cycles,
                fake_dec_start_value: clock.fake_dec_start_value,
                fake_dec_start_ticks: clock.fake_dec_start_ticks,
                fake_tb_start_value: clock.fake_tb_start_value,
                fake_tb_start_ticks: clock.fake_tb_start_ticks,
                oc_factor: clock.oc_factor(),
            };

            let events = queue
                .iter()
                .map(|e| PersistedEvent {
                    deadline: e.deadline,
                    userdata: e.userdata,
                    type_name: registry
                        .name(e.type_id)
                        .unwrap_or("_lost_event")
                        .to_string(),
                })
                .collect();

            (snapshot, events)
        })
    }

    /// `do_state(p)`, load direction. Events whose type name is not
    /// currently registered are retagged to `_lost_event` and warned
    /// about, per spec §4.7 step 4. The restored vector is not a valid
    /// heap (on-disk order is implementation-defined), so the heap
    /// invariant is rebuilt from scratch afterward (step 5).
    pub fn load_state(&mut self, clock: ClockSnapshot, events: Vec<PersistedEvent>) {
        self.ingress.with_locked(|pending| pending.clear());

        self.clock.global_timer = clock.global_timer;
        self.clock.slice_length = clock.slice_length;
        self.clock.idled_cycles = clock.idled_cycles;
        self.clock.fake_dec_start_value = clock.fake_dec_start_value;
        self.clock.fake_dec_start_ticks = clock.fake_dec_start_ticks;
        self.clock.fake_tb_start_value = clock.fake_tb_start_value;
        self.clock.fake_tb_start_ticks = clock.fake_tb_start_ticks;
        self.clock.relatch_overclock(clock.oc_factor);

        let registry = &self.registry;
        let restored: Vec<Event> = events
            .into_iter()
            .map(|pe| {
                let type_id = registry.id_of(&pe.type_name).unwrap_or_else(|| {
                    log::warn!(
                        "core-timing: lost event from savestate because its type, \"{}\", has \
                         not been registered",
                        pe.type_name
                    );
                    registry.lost_event_id()
                });
                Event {
                    deadline: pe.deadline,
                    userdata: pe.userdata,
                    type_id,
                }
            })
            .collect();

        self.queue.replace_unordered(restored);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
