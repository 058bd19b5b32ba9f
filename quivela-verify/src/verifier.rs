#![forbid(unsafe_code)]

//! Running the external verifier on one program.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use quivela_core::CheckError;
use regex::Regex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub verified: bool,
    /// Captured stdout followed by stderr.
    pub output: String,
}

/// Something that decides generated programs. Workers share one instance.
pub trait Verifier: Sync {
    fn verify(&self, worker: usize, program: &str) -> Result<Verdict, CheckError>;

    fn program_file(&self, worker: usize) -> String {
        format!("boogie{worker}.bpl")
    }
}

/// `<path> <args..> boogieN.bpl` as a subprocess.
#[derive(Clone, Debug)]
pub struct BoogieVerifier {
    pub path: PathBuf,
    pub args: Vec<String>,
    pub work_dir: PathBuf,
    summary: Regex,
}

impl BoogieVerifier {
    pub fn new(
        path: impl Into<PathBuf>,
        args: Vec<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Result<Self, CheckError> {
        let summary = Regex::new(r"Boogie program verifier finished with \d+ verified, 0 errors$")
            .map_err(|e| CheckError::internal(format!("invalid verifier pattern: {e}")))?;
        Ok(Self {
            path: path.into(),
            args,
            work_dir: work_dir.into(),
            summary,
        })
    }

    /// Whether any output line reports success.
    pub fn accepts(&self, output: &str) -> bool {
        output.lines().any(|line| self.summary.is_match(line.trim_end()))
    }
}

impl Verifier for BoogieVerifier {
    fn verify(&self, worker: usize, program: &str) -> Result<Verdict, CheckError> {
        let file = self.program_file(worker);
        fs::write(self.work_dir.join(&file), program)?;

        let mut cmd = Command::new(&self.path);
        cmd.args(&self.args)
            .arg(&file)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            CheckError::internal(format!(
                "failed to start verifier {}: {e}",
                self.path.display()
            ))
        })?;

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(std::thread::spawn(move || drain(stdout)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(std::thread::spawn(move || drain(stderr)));
        }

        loop {
            match child.try_wait()? {
                Some(_) => break,
                None => std::thread::sleep(Duration::from_millis(20)),
            }
        }

        let mut output = String::new();
        for reader in readers {
            if let Ok(text) = reader.join() {
                output.push_str(&text);
            }
        }
        Ok(Verdict {
            verified: self.accepts(&output),
            output,
        })
    }
}

fn drain(mut stream: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = stream.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_must_report_zero_errors() {
        let v = BoogieVerifier::new("boogie", Vec::new(), ".").unwrap();
        assert!(v.accepts("\nBoogie program verifier finished with 12 verified, 0 errors\n"));
        assert!(v.accepts("Boogie program verifier finished with 3 verified, 0 errors\r\n"));
        assert!(!v.accepts("Boogie program verifier finished with 2 verified, 1 error\n"));
        assert!(!v.accepts("Boogie program verifier finished with 2 verified, 0 errors, 1 time out\n"));
        assert!(!v.accepts(""));
    }

    #[test]
    fn worker_files_are_numbered() {
        let v = BoogieVerifier::new("boogie", Vec::new(), ".").unwrap();
        assert_eq!(v.program_file(0), "boogie0.bpl");
        assert_eq!(v.program_file(7), "boogie7.bpl");
    }
}
