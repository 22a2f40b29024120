use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};

/// Environment variable overriding the simulator executable.
pub const SIMULATOR_ENV: &str = "CKT_SIMULATOR";

/// Default timeout for a single simulation run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_PROGRAM: &str = "csim";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

fn install_hint() -> String {
    format!("Put `{DEFAULT_PROGRAM}` on your PATH, set {SIMULATOR_ENV}, or pass --simulator.")
}

fn expand_home(path: &str) -> PathBuf {
    let home = dirs::home_dir().unwrap_or_default();
    PathBuf::from(path.replace("~", home.to_str().unwrap_or_default()))
}

/// Captured output of a finished simulator process.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// External simulator backend invoked as
/// `<program> -c <netlist> -s <signal> -o <output>`.
#[derive(Debug, Clone)]
pub struct Simulator {
    program: PathBuf,
    timeout: Duration,
}

impl Simulator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Resolves the executable: `explicit` first, then `$CKT_SIMULATOR`
    /// (with `~` expanded), then `csim` on `PATH`.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        if let Ok(path) = std::env::var(SIMULATOR_ENV)
            && !path.is_empty()
        {
            return Ok(Self::new(expand_home(&path)));
        }
        let path = which::which(DEFAULT_PROGRAM)
            .map_err(|_| anyhow!("Simulator `{DEFAULT_PROGRAM}` not found.\n{}", install_hint()))?;
        Ok(Self::new(path))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the simulator on `netlist` with `signal`, writing results to
    /// `output`. The process is killed once the timeout elapses.
    pub fn run(&self, netlist: &Path, signal: &str, output: &Path) -> Result<SimulationOutput> {
        log::debug!(
            "Running {} -c {} -s {signal} -o {}",
            self.program.display(),
            netlist.display(),
            output.display()
        );

        let args: Vec<OsString> = vec![
            "-c".into(),
            netlist.as_os_str().to_owned(),
            "-s".into(),
            signal.into(),
            "-o".into(),
            output.as_os_str().to_owned(),
        ];
        let expression = duct::cmd(self.program.as_path(), args)
            .stdout_capture()
            .stderr_capture()
            .unchecked();

        let handle = expression.start().with_context(|| {
            format!(
                "Failed to execute simulator at {}\n{}",
                self.program.display(),
                install_hint()
            )
        })?;

        let started = Instant::now();
        let result = loop {
            if let Some(result) = handle.try_wait()? {
                break result;
            }
            if started.elapsed() >= self.timeout {
                handle.kill().context("Failed to stop simulator")?;
                bail!("Simulator timed out after {}s", self.timeout.as_secs_f64());
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        Ok(SimulationOutput {
            success: result.status.success(),
            stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;

    fn fake_simulator(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-sim");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_run_passes_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_simulator(
            dir.path(),
            r#"while [ $# -gt 0 ]; do
  case "$1" in
    -c) c="$2"; shift 2;;
    -s) s="$2"; shift 2;;
    -o) o="$2"; shift 2;;
    *) exit 2;;
  esac
done
echo "circuit $(basename "$c") signal $s"
echo "1 2.5" > "$o""#,
        );
        let netlist = dir.path().join("circuit.txt");
        std::fs::write(&netlist, "GROUND 0\n").unwrap();
        let output = dir.path().join("out.txt");

        let result = Simulator::new(&program)
            .run(&netlist, "sine", &output)
            .unwrap();
        assert!(result.success, "{}", result.stderr);
        assert_eq!(result.stdout.trim(), "circuit circuit.txt signal sine");
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "1 2.5\n");
    }

    #[test]
    fn test_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_simulator(dir.path(), "echo bad netlist >&2\nexit 3");
        let result = Simulator::new(&program)
            .run(&dir.path().join("c.txt"), "dc", &dir.path().join("o.txt"))
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.stderr.trim(), "bad netlist");
    }

    #[test]
    fn test_timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_simulator(dir.path(), "exec sleep 10");
        let started = Instant::now();
        let err = Simulator::new(&program)
            .with_timeout(Duration::from_millis(200))
            .run(&dir.path().join("c.txt"), "dc", &dir.path().join("o.txt"))
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let err = Simulator::new(dir.path().join("nope"))
            .run(&dir.path().join("c.txt"), "dc", &dir.path().join("o.txt"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to execute simulator"));
    }

    #[test]
    #[serial]
    fn test_locate_prefers_explicit_then_env() {
        let explicit = Path::new("/opt/sim/bin/csim");
        unsafe { std::env::set_var(SIMULATOR_ENV, "/usr/local/bin/other") };
        assert_eq!(Simulator::locate(Some(explicit)).unwrap().program(), explicit);
        assert_eq!(
            Simulator::locate(None).unwrap().program(),
            Path::new("/usr/local/bin/other")
        );
        unsafe { std::env::remove_var(SIMULATOR_ENV) };
    }

    #[test]
    #[serial]
    fn test_locate_expands_home() {
        unsafe { std::env::set_var(SIMULATOR_ENV, "~/bin/csim") };
        let located = Simulator::locate(None).unwrap();
        unsafe { std::env::remove_var(SIMULATOR_ENV) };
        let home = dirs::home_dir().unwrap_or_default();
        assert_eq!(located.program(), home.join("bin/csim"));
        assert_eq!(located.timeout(), DEFAULT_TIMEOUT);
    }
}
