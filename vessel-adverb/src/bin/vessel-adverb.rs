//! Standalone entry point for the in-container supervisor.
//!
//! This binary is intentionally thin: option parsing and Wrap-side
//! argument construction live where the caller assembles them (the
//! Wrap supervisor is what invokes this binary), so what's left here
//! is wiring [`vessel_adverb::setup_and_spawn`] to a real wait loop.

use std::{collections::BTreeMap, time::Duration};

use vessel_adverb::{
    setup_and_spawn, supervisor::Supervisor, AdverbOptions, EXEC_FAILED, EX_UNAVAILABLE,
};
use vessel_env::EnvOverlay;

fn main()
{
    env_logger::init();

    let options = AdverbOptions::default();
    let mut env = EnvOverlay::new();
    let base_env: BTreeMap<String, String> = std::env::vars().collect();

    let (primary_pid, _lock_fds) = match setup_and_spawn(&options, &mut env, &base_env) {
        Ok(result) => result,
        Err(err) => {
            log::error!("adverb setup failed: {err}");
            std::process::exit(EX_UNAVAILABLE);
        },
    };

    let mut supervisor = Supervisor::new(primary_pid, options.idle_timeout, options.terminate_timeout);

    loop {
        match os_ext::waitpid(None, 0) {
            Ok(Some((pid, status))) => {
                if supervisor.record_exit(pid, status) && pid == primary_pid {
                    vessel_adverb::signals::clear_primary_child();
                }
            },
            Ok(None) => {
                if supervisor.primary_outcome().is_some() && !supervisor.has_descendants() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(50));
            },
            Err(err) => {
                log::error!("wait loop failed: {err}");
                break;
            },
        }

        if let Err(err) = supervisor.tick() {
            log::warn!("terminate cascade signal failed: {err}");
        }

        if supervisor.primary_outcome().is_some() && !supervisor.has_descendants() {
            break;
        }
    }

    let status = supervisor.primary_outcome()
        .map(|outcome| outcome.adverb_exit_status())
        .unwrap_or(EXEC_FAILED);

    std::process::exit(status);
}
