//! An LLM judge backed by an external command.
//!
//! The command receives one JSON request on stdin:
//! `{"rubric": "...", "gold_json": "...", "pred_json": "..."}`
//! and must print one JSON response on stdout: `{"score": 0.8, "reasoning": "..."}`.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use leasex_scoring::{Judge, JudgeError, JudgeVerdict};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct JudgeRequest<'a> {
    rubric: &'a str,
    gold_json: &'a str,
    pred_json: &'a str,
}

#[derive(Deserialize)]
struct JudgeResponse {
    score: f64,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Clone)]
pub struct CommandJudge {
    program: String,
    args: Vec<String>,
}

impl CommandJudge {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command line on whitespace. No quoting; wrap anything more
    /// involved in a script.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program, words))
    }

    fn run(&self, request: &[u8]) -> Result<Vec<u8>, JudgeError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| JudgeError::Unavailable(format!("cannot run '{}': {e}", self.program)))?;

        // Feed stdin from its own thread while stdout and stderr drain.
        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(request),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.map_err(|e| JudgeError::Unavailable(e.to_string()))?;
        match written {
            Ok(Ok(())) => {}
            // The judge may answer without consuming the whole request.
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                log::debug!("judge '{}' closed stdin early", self.program);
            }
            Ok(Err(e)) => {
                return Err(JudgeError::Unavailable(format!("cannot write request: {e}")))
            }
            Err(_) => return Err(JudgeError::Unavailable("request writer panicked".into())),
        }
        if !output.status.success() {
            return Err(JudgeError::Unavailable(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Judge for CommandJudge {
    fn judge(
        &self,
        rubric: &str,
        gold_json: &str,
        pred_json: &str,
    ) -> Result<JudgeVerdict, JudgeError> {
        let request = serde_json::to_vec(&JudgeRequest {
            rubric,
            gold_json,
            pred_json,
        })
        .map_err(|e| JudgeError::InvalidResponse(e.to_string()))?;

        let stdout = self.run(&request)?;
        let response: JudgeResponse = serde_json::from_slice(&stdout)
            .map_err(|e| JudgeError::InvalidResponse(e.to_string()))?;
        log::debug!("judge '{}' returned {:.3}", self.program, response.score);
        Ok(JudgeVerdict::new(response.score, response.reasoning))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandJudge {
        CommandJudge::new("sh", ["-c", script])
    }

    #[test]
    fn reads_verdict_from_stdout() {
        let judge = sh(r#"cat > /dev/null; echo '{"score": 0.75, "reasoning": "one row short"}'"#);
        let verdict = judge.judge("rubric", "[]", "[]").unwrap();
        assert_eq!(verdict, JudgeVerdict::new(0.75, "one row short"));
    }

    #[test]
    fn request_is_passed_on_stdin() {
        let judge = sh(r#"req=$(cat); case "$req" in
            *'"pred_json":"[1]"'*) echo '{"score": 1, "reasoning": "saw pred"}' ;;
            *) echo '{"score": 0}' ;;
        esac"#);
        let verdict = judge.judge("rubric", "[0]", "[1]").unwrap();
        assert_eq!(verdict, JudgeVerdict::new(1.0, "saw pred"));
    }

    #[test]
    fn failures_are_judge_errors() {
        let err = sh("cat > /dev/null; echo nope >&2; exit 3").judge("r", "g", "p").unwrap_err();
        assert!(matches!(err, JudgeError::Unavailable(ref m) if m.contains("nope")));

        let err = sh("cat > /dev/null; echo not-json").judge("r", "g", "p").unwrap_err();
        assert!(matches!(err, JudgeError::InvalidResponse(_)));

        let err = CommandJudge::new("/nonexistent/judge", Vec::<String>::new())
            .judge("r", "g", "p")
            .unwrap_err();
        assert!(matches!(err, JudgeError::Unavailable(_)));
    }

    #[test]
    fn large_request_to_a_judge_that_answers_first() {
        // Far beyond a pipe buffer; the judge replies and exits without reading.
        let big = "x".repeat(4 << 20);
        let judge = sh(r#"echo '{"score": 0.25, "reasoning": "skimmed"}'"#);
        let verdict = judge.judge("rubric", &big, &big).unwrap();
        assert_eq!(verdict, JudgeVerdict::new(0.25, "skimmed"));

        let judge = sh(r#"echo '{"score": 1}'; head -c 10 > /dev/null; exit 2"#);
        let err = judge.judge("rubric", &big, &big).unwrap_err();
        assert!(matches!(err, JudgeError::Unavailable(ref m) if m.contains("exited")));
    }

    #[test]
    fn command_line_splitting() {
        let judge = CommandJudge::from_command_line("  judge.sh --model small ").unwrap();
        assert_eq!(judge.program, "judge.sh");
        assert_eq!(judge.args, vec!["--model", "small"]);
        assert!(CommandJudge::from_command_line("   ").is_none());
    }
}
