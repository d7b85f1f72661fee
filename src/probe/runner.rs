use super::validate::validate_outcome;
use super::{DetectionOutcome, ProbeError, CODE_DETECT_PASS, CODE_NO_STATUS};
use crate::api::ApiVersion;
use crate::env::BuildEnv;
use crate::order::Kind;
use crate::plan::DetectPlan;
use crate::store::Descriptor;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub const ENV_BUILDPACK_DIR: &str = "CNB_BUILDPACK_DIR";
pub const ENV_PLATFORM_DIR: &str = "CNB_PLATFORM_DIR";
pub const ENV_BUILD_PLAN_PATH: &str = "CNB_BUILD_PLAN_PATH";

/// First buildpack API that receives the platform dir and plan path as env vars.
const PATH_ENV_API: ApiVersion = ApiVersion::new(0, 8);

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Inputs shared by every probe of one detect call.
#[derive(Debug, Clone)]
pub struct ProbeInputs {
    pub app_dir: PathBuf,
    pub platform_dir: PathBuf,
    pub env: BuildEnv,
}

impl ProbeInputs {
    pub fn new(app_dir: impl Into<PathBuf>, platform_dir: impl Into<PathBuf>, env: BuildEnv) -> Self {
        Self {
            app_dir: app_dir.into(),
            platform_dir: platform_dir.into(),
            env,
        }
    }
}

/// Runs the detect phase of a single buildpack or extension.
///
/// Implementations never return an error: every failure mode is folded into
/// the [`DetectionOutcome`] so the evaluator can decide what it means for the
/// group.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    async fn run(
        &self,
        cancel: &CancellationToken,
        descriptor: &Descriptor,
        inputs: &ProbeInputs,
    ) -> DetectionOutcome;
}

/// Executes `bin/detect` as a child process.
#[derive(Debug, Clone)]
pub struct ProcessProbeRunner {
    timeout: Duration,
}

impl Default for ProcessProbeRunner {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl ProcessProbeRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn detect(
        &self,
        cancel: &CancellationToken,
        descriptor: &Descriptor,
        inputs: &ProbeInputs,
    ) -> DetectionOutcome {
        if descriptor.kind == Kind::Extension && !descriptor.detect_path().exists() {
            return read_prepopulated_plan(descriptor);
        }

        let (app_dir, platform_dir) = match (absolute(&inputs.app_dir), absolute(&inputs.platform_dir)) {
            (Ok(a), Ok(p)) => (a, p),
            (Err(e), _) | (_, Err(e)) => {
                return DetectionOutcome::fatal(CODE_NO_STATUS, ProbeError::Io(e.to_string()))
            }
        };

        // Removed when dropped, on every return path.
        let plan_dir = match tempfile::Builder::new().prefix("plan.").tempdir() {
            Ok(dir) => dir,
            Err(e) => return DetectionOutcome::fatal(CODE_NO_STATUS, ProbeError::Io(e.to_string())),
        };
        let plan_path = plan_dir.path().join("plan.toml");
        if let Err(e) = std::fs::write(&plan_path, b"") {
            return DetectionOutcome::fatal(CODE_NO_STATUS, ProbeError::Io(e.to_string()));
        }

        let env = match probe_env(descriptor, inputs, &platform_dir, &plan_path) {
            Ok(env) => env,
            Err(e) => return DetectionOutcome::fatal(CODE_NO_STATUS, e),
        };

        let detect_path = descriptor.detect_path();
        let mut cmd = Command::new(&detect_path);
        cmd.arg(&platform_dir)
            .arg(&plan_path)
            .current_dir(&app_dir)
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        trace!(path = %detect_path.display(), "Spawning detect");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return DetectionOutcome::fatal(
                    CODE_NO_STATUS,
                    ProbeError::Launch {
                        path: detect_path,
                        message: e.to_string(),
                    },
                )
            }
        };

        // Both streams share one buffer, in the order chunks arrive.
        let captured = Arc::new(Mutex::new(Vec::new()));
        let mut readers = JoinSet::new();
        if let Some(stdout) = child.stdout.take() {
            readers.spawn(capture(stdout, captured.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.spawn(capture(stderr, captured.clone()));
        }

        let waited = tokio::select! {
            _ = cancel.cancelled() => None,
            waited = tokio::time::timeout(self.timeout, child.wait()) => Some(waited),
        };

        let status = match waited {
            None => {
                let _ = child.start_kill();
                return DetectionOutcome::cancelled();
            }
            Some(Err(_)) => {
                let _ = child.start_kill();
                readers.abort_all();
                let partial = std::mem::take(&mut *captured.lock().await);
                return DetectionOutcome::fatal(CODE_NO_STATUS, ProbeError::Timeout(self.timeout))
                    .with_output(partial);
            }
            Some(Ok(Err(e))) => return DetectionOutcome::fatal(CODE_NO_STATUS, ProbeError::Io(e.to_string())),
            Some(Ok(Ok(status))) => status,
        };

        while readers.join_next().await.is_some() {}
        let combined = std::mem::take(&mut *captured.lock().await);

        let code = match status.code() {
            Some(code) => code,
            None => {
                return DetectionOutcome::fatal(CODE_NO_STATUS, ProbeError::Signal).with_output(combined)
            }
        };

        if code != CODE_DETECT_PASS {
            return DetectionOutcome {
                code,
                output: combined,
                ..DetectionOutcome::fail()
            };
        }

        match read_plan(&plan_path) {
            Ok(plan) => DetectionOutcome::pass(plan).with_output(combined),
            Err(e) => DetectionOutcome::fatal(CODE_NO_STATUS, e).with_output(combined),
        }
    }
}

#[async_trait]
impl ProbeRunner for ProcessProbeRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        descriptor: &Descriptor,
        inputs: &ProbeInputs,
    ) -> DetectionOutcome {
        if cancel.is_cancelled() {
            return DetectionOutcome::cancelled();
        }
        let outcome = self.detect(cancel, descriptor, inputs).await;
        debug!(
            id = %descriptor.info.id,
            version = %descriptor.info.version,
            code = outcome.code,
            "Probe finished"
        );
        validate_outcome(descriptor, outcome)
    }
}

fn probe_env(
    descriptor: &Descriptor,
    inputs: &ProbeInputs,
    platform_dir: &Path,
    plan_path: &Path,
) -> Result<Vec<(String, String)>, ProbeError> {
    let mut env = if descriptor.info.clear_env {
        inputs.env.list()
    } else {
        inputs
            .env
            .with_platform(platform_dir)
            .map_err(|e| ProbeError::Environment(e.to_string()))?
    };

    env.push((
        ENV_BUILDPACK_DIR.to_string(),
        descriptor.root_dir.display().to_string(),
    ));

    let with_paths = ApiVersion::parse(&descriptor.api)
        .map(|api| api.at_least(PATH_ENV_API))
        .unwrap_or(false);
    if with_paths {
        env.push((ENV_PLATFORM_DIR.to_string(), platform_dir.display().to_string()));
        env.push((ENV_BUILD_PLAN_PATH.to_string(), plan_path.display().to_string()));
    }

    Ok(env)
}

async fn capture<R>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink.lock().await.extend_from_slice(&buf[..n]),
        }
    }
}

fn read_plan(path: &Path) -> Result<DetectPlan, ProbeError> {
    let decode_error = |message: String| ProbeError::PlanDecode {
        path: path.to_path_buf(),
        message,
    };
    let contents = std::fs::read_to_string(path).map_err(|e| decode_error(e.to_string()))?;
    toml::from_str(&contents).map_err(|e| decode_error(e.to_string()))
}

/// Extensions without a detect executable ship their plan in `detect/plan.toml`.
fn read_prepopulated_plan(descriptor: &Descriptor) -> DetectionOutcome {
    let path = descriptor.prepopulated_plan_path();
    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str::<DetectPlan>(&contents) {
            Ok(plan) => DetectionOutcome::pass(plan),
            Err(e) => DetectionOutcome::fatal(
                CODE_NO_STATUS,
                ProbeError::PlanDecode {
                    path,
                    message: e.to_string(),
                },
            ),
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => DetectionOutcome::pass(DetectPlan::default()),
        Err(e) => DetectionOutcome::fatal(
            CODE_NO_STATUS,
            ProbeError::PlanDecode {
                path,
                message: e.to_string(),
            },
        ),
    }
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
