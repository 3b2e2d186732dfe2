use loadcell_core::prelude::DelegatedShutdownListener;
use sysinfo::{Pid, ProcessRefreshKind, System};

/// CPU usage above which the harness itself is suspected of distorting measurements.
const SELF_USAGE_WARN_PERCENT: f32 = 10.0;

/// Monitor the resource usage of the harness process and report high usage.
///
/// This never stops a run. It only warns the operator that latency numbers may be skewed by the
/// load generator itself rather than the platform under test.
pub(crate) fn start_monitor(mut shutdown_listener: DelegatedShutdownListener) {
    let spawned = std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let this_process_pid = Pid::from_u32(std::process::id());
            let mut sys = System::new();

            sys.refresh_cpu();
            let cpu_count = sys.cpus().len().max(1);

            loop {
                if shutdown_listener.should_shutdown() {
                    break;
                }

                sys.refresh_process_specifics(
                    this_process_pid,
                    ProcessRefreshKind::new().with_cpu(),
                );

                if let Some(process) = sys.process(this_process_pid) {
                    let usage = process.cpu_usage() / cpu_count as f32;
                    if usage > SELF_USAGE_WARN_PERCENT {
                        log::warn!(
                            "High CPU usage detected. The harness is using {:.2}% of the CPU with {} available cores, measured latencies may be inflated",
                            usage,
                            cpu_count
                        );
                    }
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        });

    if let Err(e) = spawned {
        log::warn!("Failed to start resource monitor thread: {e:?}");
    }
}
