// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Completion tokens: one per submitted command.
//!
//! A [`CompletionToken`] is created when a command is enqueued and is
//! signalled by the queue worker when the command finishes. Commands
//! declare the tokens they depend on at submission time; the worker waits
//! on those before it executes the command.
//!
//! ```text
//! Queued ──► Submitted ──► Running ──► Complete
//!                 │             │
//!                 └─────────────┴────► Failed(status)
//! ```
//!
//! Tokens are cheap to clone (`Arc` inside) and may be waited on from any
//! thread.

use crate::{PlatformError, StatusCode};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// The kind of command a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    /// Host → device transfer.
    WriteBuffer,
    /// Kernel execution over a 2D range.
    Kernel,
    /// Device → host transfer.
    ReadBuffer,
    /// No-op used by `finish()`.
    Marker,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::WriteBuffer => write!(f, "write-buffer"),
            CommandKind::Kernel => write!(f, "kernel"),
            CommandKind::ReadBuffer => write!(f, "read-buffer"),
            CommandKind::Marker => write!(f, "marker"),
        }
    }
}

/// Execution status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Queued,
    Submitted,
    Running,
    Complete,
    Failed(StatusCode),
}

impl CommandStatus {
    /// `Complete` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandStatus::Complete | CommandStatus::Failed(_))
    }
}

/// Device timestamps in nanoseconds since the owning context was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ProfilingInfo {
    pub queued: u64,
    pub submitted: u64,
    pub start: u64,
    pub end: u64,
}

impl ProfilingInfo {
    /// Time spent executing on the device.
    pub fn execution_ns(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

struct TokenState {
    status: CommandStatus,
    times: ProfilingInfo,
}

struct TokenInner {
    id: u64,
    kind: CommandKind,
    label: String,
    device_index: usize,
    dependencies: Vec<u64>,
    profiling: bool,
    state: Mutex<TokenState>,
    signal: Condvar,
}

/// Handle to the completion of one submitted command.
#[derive(Clone)]
pub struct CompletionToken {
    inner: Arc<TokenInner>,
}

impl CompletionToken {
    pub(crate) fn new(
        kind: CommandKind,
        label: impl Into<String>,
        device_index: usize,
        wait_list: &[CompletionToken],
        profiling: bool,
        queued_ns: u64,
    ) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
                kind,
                label: label.into(),
                device_index,
                dependencies: wait_list.iter().map(|t| t.id()).collect(),
                profiling,
                state: Mutex::new(TokenState {
                    status: CommandStatus::Queued,
                    times: ProfilingInfo {
                        queued: queued_ns,
                        ..Default::default()
                    },
                }),
                signal: Condvar::new(),
            }),
        }
    }

    /// Process-unique id of this token.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn kind(&self) -> CommandKind {
        self.inner.kind
    }

    /// Label given at submission (stage or kernel name).
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn device_index(&self) -> usize {
        self.inner.device_index
    }

    /// Ids of the tokens this command declared as dependencies.
    pub fn dependencies(&self) -> &[u64] {
        &self.inner.dependencies
    }

    /// Returns `true` if `other` is among this command's declared dependencies.
    pub fn depends_on(&self, other: &CompletionToken) -> bool {
        self.inner.dependencies.contains(&other.id())
    }

    pub fn status(&self) -> CommandStatus {
        self.inner.state.lock().status
    }

    /// Returns `true` once the command has completed or failed.
    pub fn is_signaled(&self) -> bool {
        self.status().is_terminal()
    }

    /// Blocks until the command completes.
    pub fn wait(&self) -> Result<(), PlatformError> {
        let mut state = self.inner.state.lock();
        while !state.status.is_terminal() {
            self.inner.signal.wait(&mut state);
        }
        match state.status {
            CommandStatus::Failed(status) => Err(PlatformError::CommandFailed {
                kind: self.inner.kind,
                label: self.inner.label.clone(),
                device_index: self.inner.device_index,
                status,
            }),
            _ => Ok(()),
        }
    }

    /// Waits on every token, then reports the first failure (if any).
    ///
    /// All tokens are observed even when an earlier one failed, so no
    /// command is still running when this returns.
    pub fn wait_all<'a, I>(tokens: I) -> Result<(), PlatformError>
    where
        I: IntoIterator<Item = &'a CompletionToken>,
    {
        let mut first_err = None;
        for token in tokens {
            if let Err(e) = token.wait() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Device timestamps for this command.
    ///
    /// Fails with `ProfilingInfoNotAvailable` if the issuing queue was
    /// created without profiling or the command has not completed.
    pub fn profiling_info(&self) -> Result<ProfilingInfo, PlatformError> {
        let state = self.inner.state.lock();
        if !self.inner.profiling || state.status != CommandStatus::Complete {
            return Err(PlatformError::rejected(
                "profiling_info",
                StatusCode::ProfilingInfoNotAvailable,
            ));
        }
        Ok(state.times)
    }

    pub(crate) fn mark_submitted(&self, now_ns: u64) {
        let mut state = self.inner.state.lock();
        state.status = CommandStatus::Submitted;
        state.times.submitted = now_ns;
    }

    pub(crate) fn mark_running(&self, now_ns: u64) {
        let mut state = self.inner.state.lock();
        state.status = CommandStatus::Running;
        state.times.start = now_ns;
    }

    pub(crate) fn complete(&self, now_ns: u64) {
        self.finish_with(CommandStatus::Complete, now_ns);
    }

    pub(crate) fn fail(&self, status: StatusCode, now_ns: u64) {
        self.finish_with(CommandStatus::Failed(status), now_ns);
    }

    fn finish_with(&self, status: CommandStatus, now_ns: u64) {
        let mut state = self.inner.state.lock();
        state.status = status;
        state.times.end = now_ns;
        if state.times.start == 0 {
            state.times.start = now_ns;
        }
        drop(state);
        self.inner.signal.notify_all();
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("device_index", &self.inner.device_index)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn token(deps: &[CompletionToken]) -> CompletionToken {
        CompletionToken::new(CommandKind::Kernel, "nlm", 0, deps, true, 10)
    }

    #[test]
    fn test_ids_unique() {
        let a = token(&[]);
        let b = token(&[]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_dependencies_recorded() {
        let a = token(&[]);
        let b = token(std::slice::from_ref(&a));
        assert!(b.depends_on(&a));
        assert!(!a.depends_on(&b));
        assert_eq!(b.dependencies(), &[a.id()]);
    }

    #[test]
    fn test_lifecycle() {
        let t = token(&[]);
        assert_eq!(t.status(), CommandStatus::Queued);
        t.mark_submitted(20);
        t.mark_running(30);
        assert!(!t.is_signaled());
        t.complete(40);
        assert!(t.is_signaled());
        t.wait().unwrap();

        let info = t.profiling_info().unwrap();
        assert_eq!(info, ProfilingInfo { queued: 10, submitted: 20, start: 30, end: 40 });
        assert_eq!(info.execution_ns(), 10);
    }

    #[test]
    fn test_failed_wait_reports_status() {
        let t = token(&[]);
        t.fail(StatusCode::OutOfResources, 5);
        let err = t.wait().unwrap_err();
        assert_eq!(err.status(), StatusCode::OutOfResources);
        assert!(t.profiling_info().is_err());
    }

    #[test]
    fn test_profiling_disabled() {
        let t = CompletionToken::new(CommandKind::ReadBuffer, "download", 1, &[], false, 0);
        t.complete(1);
        let err = t.profiling_info().unwrap_err();
        assert_eq!(err.status(), StatusCode::ProfilingInfoNotAvailable);
    }

    #[test]
    fn test_wait_blocks_until_signaled() {
        let t = token(&[]);
        let signaller = t.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaller.complete(99);
        });
        t.wait().unwrap();
        assert!(t.is_signaled());
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_all_observes_every_token() {
        let a = token(&[]);
        let b = token(&[]);
        let c = token(&[]);
        a.complete(1);
        b.fail(StatusCode::OutOfResources, 2);
        c.complete(3);
        let err = CompletionToken::wait_all([&a, &b, &c]).unwrap_err();
        assert_eq!(err.status(), StatusCode::OutOfResources);
        assert!(a.is_signaled() && b.is_signaled() && c.is_signaled());
    }

    #[test]
    fn test_wait_all_empty() {
        let none: Vec<CompletionToken> = Vec::new();
        CompletionToken::wait_all(&none).unwrap();
    }
}
