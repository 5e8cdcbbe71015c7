//! Run one call with its standard output captured.
//!
//! The call runs on a scoped worker thread while the calling thread drains
//! the pipe. A pipe holds only a bounded number of bytes (64 KiB on Linux),
//! so a reader has to be draining while the writer runs or the writer blocks
//! in `write(2)` forever.
//!
//! Sequence:
//! 1. redirect fd 1 into a pipe ([`StdoutRedirect::begin`])
//! 2. spawn the worker; it owns the [`PipeWriter`](crate::redirect::PipeWriter)
//! 3. drain the read end until end-of-stream
//! 4. join the worker
//! 5. restore fd 1

use crate::error::{HostError, Result};
use crate::redirect::{StdoutClaim, StdoutRedirect};
use std::any::Any;
use std::fs::File;
use std::io::{self, Read};
use std::thread;

/// Name given to the worker thread that runs the engine command.
pub const WORKER_THREAD_NAME: &str = "scanhost-exec";

/// Run `call` with fd 1 redirected and return the bytes it wrote there.
///
/// Every exit path restores fd 1: success, an error returned by `call`, a
/// panic inside `call`, a failed read, a failed spawn. A failure of `call`
/// is returned only after that restoration.
pub fn capture_stdout<F>(claim: &StdoutClaim, chunk_size: usize, call: F) -> Result<Vec<u8>>
where
    F: FnOnce() -> Result<()> + Send,
{
    let (mut redirect, mut reader) = StdoutRedirect::begin(claim)?;

    let outcome = thread::scope(|scope| -> Result<(Vec<u8>, Result<()>)> {
        let writer = redirect.writer();
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn_scoped(scope, move || {
                let _writer = writer;
                call()
            })
            .map_err(HostError::Redirect)?;

        let drained = drain(&mut reader, chunk_size);
        if drained.is_err() {
            // Nobody is reading any more; make further writes fail instead of block.
            drop(reader);
        }

        let joined = worker.join();
        let bytes = drained.map_err(HostError::Drain)?;
        match joined {
            Ok(result) => Ok((bytes, result)),
            Err(payload) => Err(HostError::WorkerPanicked(panic_message(payload))),
        }
    });

    let restored = redirect.restore();
    let (bytes, call_result) = match outcome {
        Ok(done) => done,
        Err(e) => {
            if let Err(restore_err) = restored {
                log::warn!("{} (while handling: {})", restore_err, e);
            }
            return Err(e);
        }
    };
    restored?;
    call_result?;

    log::debug!("captured {} bytes from standard output", bytes.len());
    Ok(bytes)
}

/// Read `reader` to end-of-stream in `chunk_size` increments.
fn drain(reader: &mut File, chunk_size: usize) -> io::Result<Vec<u8>> {
    let mut captured = Vec::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(captured),
            Ok(n) => captured.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::{FromRawFd, OwnedFd};

    fn pipe_pair() -> (File, File) {
        let mut fds = [0 as libc::c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        unsafe {
            (
                File::from(OwnedFd::from_raw_fd(fds[0])),
                File::from(OwnedFd::from_raw_fd(fds[1])),
            )
        }
    }

    #[test]
    fn drain_collects_everything_until_writer_closes() {
        let (mut r, mut w) = pipe_pair();
        let writer = thread::spawn(move || {
            for i in 0..100u8 {
                w.write_all(&[i; 1000]).unwrap();
            }
        });
        let bytes = drain(&mut r, 7).unwrap();
        writer.join().unwrap();

        assert_eq!(bytes.len(), 100_000);
        for (i, block) in bytes.chunks(1000).enumerate() {
            assert!(block.iter().all(|&b| b == i as u8));
        }
    }

    #[test]
    fn drain_returns_empty_for_immediate_eof() {
        let (mut r, w) = pipe_pair();
        drop(w);
        assert!(drain(&mut r, 4096).unwrap().is_empty());
    }

    #[test]
    fn zero_chunk_size_still_makes_progress() {
        let (mut r, mut w) = pipe_pair();
        w.write_all(b"abc").unwrap();
        drop(w);
        assert_eq!(drain(&mut r, 0).unwrap(), b"abc");
    }

    #[test]
    fn panic_message_handles_both_payload_kinds() {
        let static_payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(static_payload), "static");

        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned_payload), "owned");

        let other: Box<dyn Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(other), "unknown panic payload");
    }
}
