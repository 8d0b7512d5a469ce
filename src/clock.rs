//! C4: clock & slice state, including the overclock (IPC-scaling)
//! transform between scheduler cycles and CPU downcount units.
//!
//! Grounded on `CoreTiming.cpp`'s `s_last_OC_factor` /
//! `g_last_OC_factor_inverted` / `CyclesToDowncount` / `DowncountToCycles`.
//!
//! `downcount` itself is *not* stored here: spec §1 treats the CPU
//! interpreter, downcount register included, as an external collaborator
//! (see [`crate::collaborators::CpuHandle`]). This struct owns everything
//! else the clock needs: the global timer, the current slice length, the
//! latched overclock factor pair, the idle accumulator, and the
//! decrementer/timebase shadow registers.

/// The CPU's cycle budget for one slice; also the maximum a slice can
/// ever be, per spec §3.
pub const MAX_SLICE_LENGTH: i32 = 20000;

#[derive(Debug, Clone)]
pub struct ClockState {
    pub global_timer: i64,
    pub slice_length: i32,
    oc_factor: f32,
    oc_factor_inv: f32,
    pub idled_cycles: i64,

    // Decrementer/timebase shadow registers: opaque to the scheduler,
    // only read/written by the getters/setters in `Scheduler`.
    pub fake_dec_start_value: u32,
    pub fake_dec_start_ticks: u64,
    pub fake_tb_start_value: u64,
    pub fake_tb_start_ticks: u64,

    /// True exactly while a callback dispatched by Advance is executing.
    pub global_timer_sane: bool,
}

impl ClockState {
    /// `oc_factor` starts latched to 1.0; `Init()` relatches it from
    /// config via [`ClockState::relatch_overclock`].
    pub fn new() -> Self {
        Self {
            global_timer: 0,
            slice_length: MAX_SLICE_LENGTH,
            oc_factor: 1.0,
            oc_factor_inv: 1.0,
            idled_cycles: 0,
            fake_dec_start_value: 0,
            fake_dec_start_ticks: 0,
            fake_tb_start_value: 0,
            fake_tb_start_ticks: 0,
            global_timer_sane: true,
        }
    }

    /// Latch `oc_factor`/`oc_factor_inv` from a resolved factor (already
    /// accounting for whether overclocking is enabled). Must be used
    /// instead of re-reading config mid-slice, so a slice stays
    /// internally consistent (spec §4.1).
    pub fn relatch_overclock(&mut self, factor: f32) {
        self.oc_factor = factor;
        self.oc_factor_inv = 1.0 / factor;
    }

    pub fn oc_factor(&self) -> f32 {
        self.oc_factor
    }

    pub fn oc_factor_inv(&self) -> f32 {
        self.oc_factor_inv
    }

    pub fn cycles_to_downcount(&self, cycles: i32) -> i32 {
        (cycles as f32 * self.oc_factor) as i32
    }

    pub fn downcount_to_cycles(&self, downcount: i32) -> i32 {
        (downcount as f32 * self.oc_factor_inv) as i32
    }

    /// `virtual_now()` / public `get_ticks()`: the best available
    /// estimate of "now" from outside Advance, accounting for the
    /// portion of the open slice already executed. `downcount` is read
    /// from the CPU collaborator by the caller.
    pub fn virtual_now(&self, downcount: i32) -> i64 {
        if self.global_timer_sane {
            self.global_timer
        } else {
            let executed = self.slice_length - self.downcount_to_cycles(downcount);
            self.global_timer + executed as i64
        }
    }

    pub fn get_idle_ticks(&self) -> i64 {
        self.idled_cycles
    }
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_truncation_bound() {
        let mut c = ClockState::new();
        c.relatch_overclock(1.5);
        for cycles in [0, 1, 7, 100, 19999] {
            let dc = c.cycles_to_downcount(cycles);
            let back = c.downcount_to_cycles(dc);
            let bound = c.oc_factor().ceil() as i32;
            assert!(
                (back - cycles).abs() <= bound,
                "cycles={cycles} back={back} bound={bound}"
            );
        }
    }

    #[test]
    fn identity_factor_round_trips_exactly() {
        let c = ClockState::new();
        assert_eq!(c.oc_factor(), 1.0);
        for cycles in [0, 1, 12345, 19999] {
            assert_eq!(c.downcount_to_cycles(c.cycles_to_downcount(cycles)), cycles);
        }
    }

    #[test]
    fn virtual_now_adjusts_only_outside_advance() {
        let mut c = ClockState::new();
        c.global_timer = 1000;
        c.slice_length = 5000;
        let downcount = c.cycles_to_downcount(5000);
        c.global_timer_sane = true;
        assert_eq!(c.virtual_now(downcount), 1000);

        c.global_timer_sane = false;
        let downcount = c.cycles_to_downcount(3000); // 2000 cycles executed
        assert_eq!(c.virtual_now(downcount), 3000);
    }
}
