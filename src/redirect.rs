//! Standard output ownership and redirection.
//!
//! fd 1 is one process-wide resource, so it is handled with an exclusive
//! claim plus RAII guards that put things back on drop:
//!
//! - [`StdoutClaim`]: the single-flight lock. At most one exists at a time in
//!   the process; every engine command runs under one.
//! - [`StdoutRedirect`]: holds the saved duplicate of the original fd 1 and
//!   restores it on release or drop.
//! - [`PipeWriter`]: the pipe's write end, handed to whoever runs the engine
//!   command. Dropping it flushes stdio, points fd 1 back at the saved
//!   duplicate and closes the write end.
//!
//! The reader sees end-of-stream only once *every* descriptor referring to
//! the write end is closed, and fd 1 is one of them. So fd 1 has to stop
//! aliasing the pipe as soon as the command is done, on the thread that ran
//! it. The calling thread restores again afterwards and closes the duplicate.

use crate::config::BusyPolicy;
use crate::error::{HostError, Result};
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::sync::{Mutex, MutexGuard, TryLockError};

static STDOUT_OWNER: Mutex<()> = Mutex::new(());

/// Exclusive ownership of the process's standard output.
///
/// Released when dropped.
#[derive(Debug)]
pub struct StdoutClaim {
    _guard: MutexGuard<'static, ()>,
}

/// Claim standard output for one engine call.
///
/// With [`BusyPolicy::Reject`] a claim already held elsewhere fails with
/// [`HostError::Busy`]; with [`BusyPolicy::Wait`] the call queues behind it.
pub fn claim_stdout(policy: BusyPolicy) -> Result<StdoutClaim> {
    // The guards restore fd 1 during unwinding, so a poisoned lock guards nothing broken.
    let guard = match policy {
        BusyPolicy::Wait => STDOUT_OWNER
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()),
        BusyPolicy::Reject => match STDOUT_OWNER.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poison)) => poison.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(HostError::Busy),
        },
    };
    Ok(StdoutClaim { _guard: guard })
}

/// Flush everything buffered for fd 1 in this process: Rust's stdout and
/// every C stdio stream (the engine prints through `printf`).
///
/// Best effort, for cleanup paths that have nowhere to report a failure.
pub fn flush_stdout() {
    if let Err(e) = try_flush_stdout() {
        log::warn!("failed to flush standard output: {}", e);
    }
}

/// Like [`flush_stdout`], but reports the first failure.
pub fn try_flush_stdout() -> io::Result<()> {
    io::stdout().flush()?;
    // SAFETY: fflush(NULL) flushes all open output streams.
    if unsafe { libc::fflush(std::ptr::null_mut()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// fd 1 redirected into a pipe, restored when released or dropped.
#[derive(Debug)]
pub struct StdoutRedirect {
    saved: OwnedFd,
    write_end: Option<OwnedFd>,
    released: bool,
}

impl StdoutRedirect {
    /// Redirect fd 1 into a fresh pipe and return the guard plus the read end.
    ///
    /// Requires the stdout claim. If any step fails, everything created so
    /// far is closed and fd 1 is untouched. Host output that cannot be
    /// flushed first is an error too: left in the buffer, it would be
    /// written into the pipe when the capture ends.
    pub fn begin(_claim: &StdoutClaim) -> Result<(StdoutRedirect, File)> {
        try_flush_stdout().map_err(HostError::Redirect)?;

        let saved = dup_cloexec(libc::STDOUT_FILENO).map_err(HostError::Redirect)?;
        let (read_end, write_end) = pipe_cloexec().map_err(HostError::Redirect)?;

        // SAFETY: both descriptors are open and owned above.
        if unsafe { libc::dup2(write_end.as_raw_fd(), libc::STDOUT_FILENO) } < 0 {
            return Err(HostError::Redirect(io::Error::last_os_error()));
        }
        log::debug!(
            "stdout redirected into pipe (saved fd {}, read fd {})",
            saved.as_raw_fd(),
            read_end.as_raw_fd()
        );

        let redirect = StdoutRedirect {
            saved,
            write_end: Some(write_end),
            released: false,
        };
        Ok((redirect, File::from(read_end)))
    }

    /// Hand out the write end. Can be taken once; later calls return a
    /// writer that only re-detaches fd 1.
    pub fn writer(&mut self) -> PipeWriter<'_> {
        PipeWriter {
            write_end: self.write_end.take(),
            saved: self.saved.as_fd(),
        }
    }

    /// Restore fd 1 and close the saved duplicate, reporting failure.
    pub fn restore(mut self) -> Result<()> {
        self.released = true;
        self.write_end = None;
        restore_fd1(self.saved.as_raw_fd()).map_err(HostError::Restore)?;
        log::debug!("stdout restored");
        Ok(())
    }
}

impl Drop for StdoutRedirect {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = restore_fd1(self.saved.as_raw_fd())
        {
            eprintln!("Warning: failed to restore standard output: {}", e);
        }
    }
}

/// The pipe's write end, owned by the thread running the engine command.
///
/// Dropping it, including during unwinding, is what ends the capture
/// stream.
#[derive(Debug)]
pub struct PipeWriter<'a> {
    write_end: Option<OwnedFd>,
    saved: BorrowedFd<'a>,
}

impl Drop for PipeWriter<'_> {
    fn drop(&mut self) {
        flush_stdout();
        if let Err(e) = restore_fd1(self.saved.as_raw_fd()) {
            eprintln!("Warning: failed to detach standard output from pipe: {}", e);
        }
        self.write_end = None;
    }
}

fn restore_fd1(saved: RawFd) -> io::Result<()> {
    loop {
        // SAFETY: `saved` is an open descriptor owned by the redirect guard.
        if unsafe { libc::dup2(saved, libc::STDOUT_FILENO) } >= 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn dup_cloexec(fd: RawFd) -> io::Result<OwnedFd> {
    // SAFETY: F_DUPFD_CLOEXEC returns a new descriptor or -1.
    let new = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) };
    if new < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `new` was just created and nothing else owns it.
    Ok(unsafe { OwnedFd::from_raw_fd(new) })
}

fn pipe_cloexec() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: pipe(2) succeeded, so both descriptors are fresh and ours.
    let (read_end, write_end) =
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    for fd in [&read_end, &write_end] {
        // SAFETY: setting a descriptor flag on an open fd.
        if unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) } < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok((read_end, write_end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    #[test]
    #[serial]
    fn second_claim_is_rejected_while_first_is_held() {
        let first = claim_stdout(BusyPolicy::Reject).unwrap();
        let second = claim_stdout(BusyPolicy::Reject);
        assert!(matches!(second, Err(HostError::Busy)));
        drop(first);
        assert!(claim_stdout(BusyPolicy::Reject).is_ok());
    }

    #[test]
    #[serial]
    fn waiting_claim_proceeds_after_release() {
        let first = claim_stdout(BusyPolicy::Reject).unwrap();
        let waiter = std::thread::spawn(|| claim_stdout(BusyPolicy::Wait).map(|_| ()));
        std::thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        drop(first);
        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn dup_and_pipe_are_close_on_exec() {
        let (r, w) = pipe_cloexec().unwrap();
        let d = dup_cloexec(w.as_raw_fd()).unwrap();
        for fd in [&r, &w, &d] {
            let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFD) };
            assert_ne!(flags & libc::FD_CLOEXEC, 0);
        }
    }
}
