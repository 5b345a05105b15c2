//! Adapter for the external analysis engine subprocess (spec §4.7, §6).
//!
//! Speaks a line-oriented, UCI-subset protocol: `position fen <FEN>`, then
//! `go depth <N> searchmoves <LAN...>`, awaiting a `bestmove <LAN>` reply.
//! No teacher module talks to a subprocess, so this one is written from
//! scratch in the crate's own `tokio`/`thiserror`/`tracing` idiom rather than
//! adapted from an existing file (see DESIGN.md).

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;

use crate::config::EngineConfig;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to spawn analysis engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to write to analysis engine stdin: {0}")]
    Write(#[source] std::io::Error),
    #[error("analysis engine exited before responding")]
    Closed,
    #[error("analysis engine produced an unparseable response: {0}")]
    Protocol(String),
}

/// An owned child process plus the plumbing to exchange line-oriented
/// commands with it. Only one request may be in flight; callers serialize
/// themselves by `&mut` borrowing this adapter (spec §4.7: "the adapter must
/// serialize requests from the turn coordinator").
pub struct EngineAdapter {
    child: Child,
    stdin: ChildStdin,
    lines: mpsc::Receiver<String>,
    reader_task: tokio::task::JoinHandle<()>,
    search_depth: u32,
}

impl EngineAdapter {
    pub async fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let stdin = child.stdin.take().ok_or(EngineError::Closed)?;
        let stdout = child.stdout.take().ok_or(EngineError::Closed)?;

        let (tx, rx) = mpsc::channel(32);
        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        let mut adapter = Self {
            child,
            stdin,
            lines: rx,
            reader_task,
            search_depth: config.search_depth,
        };
        adapter.handshake().await?;
        Ok(adapter)
    }

    async fn write_line(&mut self, line: &str) -> Result<(), EngineError> {
        self.stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(EngineError::Write)
    }

    async fn next_line_matching(
        &mut self,
        predicate: impl Fn(&str) -> bool,
    ) -> Result<String, EngineError> {
        loop {
            match self.lines.recv().await {
                Some(line) if predicate(&line) => return Ok(line),
                Some(_) => continue,
                None => return Err(EngineError::Closed),
            }
        }
    }

    async fn handshake(&mut self) -> Result<(), EngineError> {
        self.write_line("uci").await?;
        self.next_line_matching(|l| l.trim() == "uciok").await?;
        self.write_line("isready").await?;
        self.next_line_matching(|l| l.trim() == "readyok").await?;
        Ok(())
    }

    /// `choose-best-move(fen, candidates)` (spec §4.7). Singleton shortcut:
    /// if every candidate LAN is identical, no engine query happens at all.
    pub async fn choose_best_move(
        &mut self,
        fen: &str,
        candidates: &[String],
    ) -> Result<String, EngineError> {
        let distinct: std::collections::HashSet<&str> =
            candidates.iter().map(String::as_str).collect();
        if distinct.len() <= 1 {
            if let Some(only) = candidates.first() {
                return Ok(only.clone());
            }
        }

        self.write_line(&format!("position fen {fen}")).await?;
        let command = format!(
            "go depth {} searchmoves {}",
            self.search_depth,
            candidates.join(" ")
        );
        self.write_line(&command).await?;

        let line = self
            .next_line_matching(|l| l.starts_with("bestmove"))
            .await?;
        line.split_whitespace()
            .nth(1)
            .map(ToString::to_string)
            .ok_or_else(|| EngineError::Protocol(line.clone()))
    }

    /// `quit`: terminate the subprocess (spec §4.7, §9 "owned child of the room").
    pub async fn quit(mut self) {
        let _ = self.write_line("quit").await;
        self.reader_task.abort();
        let _ = self.child.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_shortcut_does_not_need_a_running_engine() {
        // `choose_best_move` on a single distinct candidate is exercised in
        // `room::actor` tests against a real spawned adapter; the distinct-set
        // logic itself is a pure check covered implicitly there.
        let candidates = vec!["e2e4".to_string(), "e2e4".to_string()];
        let distinct: std::collections::HashSet<&str> =
            candidates.iter().map(String::as_str).collect();
        assert_eq!(distinct.len(), 1);
    }
}
