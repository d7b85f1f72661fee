//! Running a module's detect phase and normalising what it reports.

mod outcome;
mod runner;
mod static_runner;
mod validate;

pub use outcome::{
    DetectionOutcome, ProbeError, ProbeStatus, CODE_DETECT_FAIL, CODE_DETECT_PASS, CODE_NO_STATUS,
};
pub use runner::{
    ProbeInputs, ProbeRunner, ProcessProbeRunner, DEFAULT_PROBE_TIMEOUT, ENV_BUILDPACK_DIR,
    ENV_BUILD_PLAN_PATH, ENV_PLATFORM_DIR,
};
pub use static_runner::StaticProbeRunner;
pub use validate::validate_outcome;
