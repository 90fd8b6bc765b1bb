//! Agent subprocess supervision.
//!
//! The agent is an external program that drives the playground in a browser;
//! the playground appends what it does to the shared log. While it runs, the
//! log is tailed from the offset it had at spawn time and the run is stopped
//! on timeout, on excess log growth, or when a stop rule fires.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::harness::types::{HarnessError, HarnessResult, StopRule};
use crate::runner::RunOutcome;

/// Interval between exit checks while waiting out the kill grace period
const EXIT_POLL: Duration = Duration::from_millis(20);

/// Reads complete lines appended to a file after a remembered offset
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    offset: u64,
    partial: Vec<u8>,
}

impl LogTail {
    /// Start tailing at the current end of `path`
    pub fn at_end(path: &Path) -> io::Result<Self> {
        let offset = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => 0,
            Err(err) => return Err(err),
        };
        Ok(Self {
            path: path.to_path_buf(),
            offset,
            partial: Vec::new(),
        })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Complete lines appended since the last call; a trailing fragment
    /// without a newline is held back until it is finished
    pub fn read_new_lines(&mut self) -> io::Result<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        if file.metadata()?.len() < self.offset {
            // Truncated underneath us
            self.offset = 0;
            self.partial.clear();
        }
        file.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = Vec::new();
        file.read_to_end(&mut chunk)?;
        self.offset += chunk.len() as u64;
        self.partial.extend_from_slice(&chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.partial.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=end).collect();
            lines.push(String::from_utf8_lossy(&line).trim_end_matches(['\r', '\n']).to_string());
        }
        Ok(lines)
    }
}

/// One agent invocation and its limits
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Program followed by all of its arguments
    pub command: Vec<String>,
    pub log_file: PathBuf,
    pub timeout: Duration,
    pub line_limit: usize,
    pub poll_interval: Duration,
    pub kill_grace: Duration,
    pub stop: StopRule,
}

/// How a supervised run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentExit {
    pub outcome: RunOutcome,

    /// Complete lines appended to the log during the run
    pub lines_appended: usize,
}

/// Spawn the agent and supervise it until it exits or is stopped.
///
/// On unix the agent leads its own process group, so stopping it also stops
/// the browser and driver processes it started. Stragglers left in the group
/// after the agent exits are killed as well.
pub fn run_agent(run: &AgentRun) -> HarnessResult<AgentExit> {
    let (program, args) = run
        .command
        .split_first()
        .ok_or_else(|| HarnessError::Process("empty agent command".to_string()))?;

    let mut tail = LogTail::at_end(&run.log_file)?;
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let mut child = command
        .spawn()
        .map_err(|e| HarnessError::Process(format!("Failed to spawn '{}': {}", program, e)))?;
    info!(pid = child.id(), program = %program, "agent started");

    let forwarders = spawn_forwarders(&mut child);
    let result = supervise(&mut child, &mut tail, run);
    if result.is_err() {
        let _ = terminate(&mut child, run.kill_grace);
    }
    kill_leftovers(&child);
    join_forwarders(forwarders, run.kill_grace);

    let exit = result?;
    info!(outcome = %exit.outcome, lines = exit.lines_appended, "agent run finished");
    Ok(exit)
}

fn supervise(child: &mut Child, tail: &mut LogTail, run: &AgentRun) -> HarnessResult<AgentExit> {
    let start = Instant::now();
    let mut lines_appended = 0;

    loop {
        let exited = child.try_wait()?.is_some();

        let new_lines = tail.read_new_lines()?;
        lines_appended += new_lines.len();
        if exited {
            return Ok(AgentExit {
                outcome: RunOutcome::Exited,
                lines_appended,
            });
        }

        let stopped = if let Some(line) = new_lines.iter().find(|line| run.stop.fires(line)) {
            info!(line = %line, reason = run.stop.describe(), "stop rule fired");
            Some(RunOutcome::CustomBreak)
        } else if lines_appended > run.line_limit {
            warn!(lines = lines_appended, limit = run.line_limit, "agent exceeded log line limit");
            Some(RunOutcome::LineLimit)
        } else if start.elapsed() >= run.timeout {
            warn!(timeout_secs = run.timeout.as_secs_f64(), "agent timed out");
            Some(RunOutcome::TimedOut)
        } else {
            None
        };

        if let Some(outcome) = stopped {
            terminate(child, run.kill_grace)?;
            lines_appended += tail.read_new_lines()?.len();
            return Ok(AgentExit { outcome, lines_appended });
        }

        thread::sleep(run.poll_interval);
    }
}

/// Ask the agent to stop, then kill it if it is still running after `grace`
fn terminate(child: &mut Child, grace: Duration) -> io::Result<()> {
    if child.try_wait()?.is_some() {
        return Ok(());
    }
    send_terminate(child);

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if child.try_wait()?.is_some() {
            return Ok(());
        }
        thread::sleep(EXIT_POLL);
    }

    debug!(pid = child.id(), "agent ignored terminate, killing");
    kill_leftovers(child);
    // Already gone if the group kill reached it
    let _ = child.kill();
    child.wait()?;
    Ok(())
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) -> nix::Result<()> {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    killpg(Pid::from_raw(child.id() as i32), signal)
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) {
    use nix::sys::signal::Signal;

    if let Err(err) = signal_group(child, Signal::SIGTERM) {
        debug!(%err, "SIGTERM failed");
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!(%err, "kill failed");
    }
}

/// SIGKILL whatever is still in the agent's process group
#[cfg(unix)]
fn kill_leftovers(child: &Child) {
    use nix::errno::Errno;
    use nix::sys::signal::Signal;

    match signal_group(child, Signal::SIGKILL) {
        Ok(()) => debug!(pgid = child.id(), "killed agent process group"),
        Err(Errno::ESRCH) => {}
        Err(err) => debug!(%err, "SIGKILL to process group failed"),
    }
}

#[cfg(not(unix))]
fn kill_leftovers(_child: &Child) {}

/// Wait up to `grace` for the forwarders to drain; a forwarder still blocked
/// after that is left detached
fn join_forwarders(handles: Vec<JoinHandle<()>>, grace: Duration) {
    let deadline = Instant::now() + grace;
    while handles.iter().any(|h| !h.is_finished()) && Instant::now() < deadline {
        thread::sleep(EXIT_POLL);
    }
    for handle in handles {
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            debug!("agent output still open, detaching forwarder");
        }
    }
}

/// Forward the agent's stdout and stderr into tracing, one thread each
fn spawn_forwarders(child: &mut Child) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        handles.push(forward_lines(stdout, "stdout"));
    }
    if let Some(stderr) = child.stderr.take() {
        handles.push(forward_lines(stderr, "stderr"));
    }
    handles
}

fn forward_lines<R: Read + Send + 'static>(stream: R, name: &'static str) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) => debug!(target: "agent", stream = name, "{}", line),
                Err(_) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new().create(true).append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_tail_counts_only_complete_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        append(&path, "TEST BEGIN: click/button default\n");

        let mut tail = LogTail::at_end(&path).unwrap();
        assert!(tail.read_new_lines().unwrap().is_empty());

        append(&path, "click/button // Sub");
        assert!(tail.read_new_lines().unwrap().is_empty());

        append(&path, "mit\nNAVIGATE // /x\n");
        assert_eq!(tail.read_new_lines().unwrap(), vec!["click/button // Submit", "NAVIGATE // /x"]);
    }

    #[test]
    fn test_tail_of_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let mut tail = LogTail::at_end(&path).unwrap();
        assert_eq!(tail.offset(), 0);
        assert!(tail.read_new_lines().unwrap().is_empty());
        append(&path, "a\n");
        assert_eq!(tail.read_new_lines().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_empty_command_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let run = AgentRun {
            command: Vec::new(),
            log_file: dir.path().join("log.txt"),
            timeout: Duration::from_secs(1),
            line_limit: 10,
            poll_interval: Duration::from_millis(10),
            kill_grace: Duration::from_millis(100),
            stop: StopRule::Never,
        };
        assert!(matches!(run_agent(&run), Err(HarnessError::Process(_))));
    }

    #[cfg(unix)]
    fn shell_run(log: &Path, script: &str, timeout: Duration, line_limit: usize, stop: StopRule) -> AgentRun {
        AgentRun {
            command: vec!["sh".to_string(), "-c".to_string(), script.replace("$LOG", &log.display().to_string())],
            log_file: log.to_path_buf(),
            timeout,
            line_limit,
            poll_interval: Duration::from_millis(20),
            kill_grace: Duration::from_millis(500),
            stop,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_agent_exits_on_its_own() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        append(&log, "TEST BEGIN: click/button default\n");
        let run = shell_run(
            &log,
            "echo hello; echo 'click/button // Submit' >> $LOG",
            Duration::from_secs(10),
            100,
            StopRule::Never,
        );
        let exit = run_agent(&run).unwrap();
        assert_eq!(exit, AgentExit { outcome: RunOutcome::Exited, lines_appended: 1 });
    }

    #[cfg(unix)]
    #[test]
    fn test_agent_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let run = shell_run(&log, "exec sleep 30", Duration::from_millis(200), 100, StopRule::Never);
        let started = Instant::now();
        let exit = run_agent(&run).unwrap();
        assert_eq!(exit.outcome, RunOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_agent_hits_line_limit() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let run = shell_run(
            &log,
            "for i in 1 2 3 4 5; do echo 'click/button // Again' >> $LOG; done; exec sleep 30",
            Duration::from_secs(10),
            3,
            StopRule::Never,
        );
        let exit = run_agent(&run).unwrap();
        assert_eq!(exit.outcome, RunOutcome::LineLimit);
        assert_eq!(exit.lines_appended, 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_rule_breaks_run() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let run = shell_run(
            &log,
            "echo 'click/button // Buy now' >> $LOG; echo 'NAVIGATE // /playground/checkout' >> $LOG; exec sleep 30",
            Duration::from_secs(10),
            100,
            StopRule::FirstNavigate,
        );
        let exit = run_agent(&run).unwrap();
        assert_eq!(exit.outcome, RunOutcome::CustomBreak);
        assert_eq!(exit.lines_appended, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_stops_shell_children() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let run = shell_run(&log, "sleep 8; true", Duration::from_millis(200), 100, StopRule::Never);
        let started = Instant::now();
        let exit = run_agent(&run).unwrap();
        assert_eq!(exit.outcome, RunOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_rule_stops_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let run = shell_run(
            &log,
            "sleep 8 & sleep 8 & echo 'NAVIGATE // /playground/product/1' >> $LOG; wait",
            Duration::from_secs(10),
            100,
            StopRule::FirstNavigate,
        );
        let started = Instant::now();
        let exit = run_agent(&run).unwrap();
        assert_eq!(exit.outcome, RunOutcome::CustomBreak);
        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_does_not_wait_for_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let run = shell_run(
            &log,
            "(sleep 8 &); echo 'click/button // Submit' >> $LOG",
            Duration::from_secs(10),
            100,
            StopRule::Never,
        );
        let started = Instant::now();
        let exit = run_agent(&run).unwrap();
        assert_eq!(exit, AgentExit { outcome: RunOutcome::Exited, lines_appended: 1 });
        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    }
}
