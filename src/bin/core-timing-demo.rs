// Standalone driver for the scheduler core: registers a couple of
// periodic events on a mock CPU and runs enough slices to show them
// firing, drifting late, and the idle path kicking in. No real machine
// core behind it — `NullCpu`/`NullVideoFifo` stand in for one.

use core_timing::{
    AlwaysCpuThread, CpuHandle, FromThread, NullCpu, NullVideoFifo, Scheduler, TimingConfig,
};

fn main() {
    env_logger::init();

    let config = TimingConfig::load();
    let mut sched = Scheduler::new();
    let mut cpu = NullCpu::default();
    let mut video = NullVideoFifo::default();

    sched.init(&config, &mut cpu);

    let vblank = sched.register_event(
        "VBlank",
        Box::new(|_userdata, cycles_late| {
            log::info!("VBlank fired ({cycles_late} cycles late)");
        }),
    );
    let timer = sched.register_event(
        "PeriodicTimer",
        Box::new(|userdata, cycles_late| {
            log::info!("PeriodicTimer fired, tick {userdata} ({cycles_late} cycles late)");
        }),
    );

    sched.schedule_event(16700, vblank, 0, FromThread::Cpu, &AlwaysCpuThread, false, &mut cpu);
    sched.schedule_event(1000, timer, 0, FromThread::Cpu, &AlwaysCpuThread, false, &mut cpu);

    for slice in 0..8 {
        // A real CPU core would run until its downcount reaches zero or
        // goes negative; here we just pretend the whole slice ran.
        cpu.set_downcount(0);
        sched.advance(&config, &mut cpu);

        // Rearm the periodic timer. A real machine core usually does this
        // from the callback's owning subsystem rather than the driver
        // loop, but the callback itself has no handle back to `sched`.
        sched.schedule_event(1000, timer, slice + 1, FromThread::Cpu, &AlwaysCpuThread, false, &mut cpu);

        if slice == 4 {
            sched.idle(config.sync_gpu_on_idle_skip, &mut video, &mut cpu);
        }
    }

    log::info!(
        "ran 8 slices, global ticks={}, idle ticks={}",
        sched.get_ticks(&cpu),
        sched.get_idle_ticks()
    );

    config.save();
}
