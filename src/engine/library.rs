//! Binding of the scanmem shared library.

use super::Engine;
use crate::error::{HostError, Result};
use libloading::Library;
use std::ffi::{CStr, c_char, c_double, c_long};
use std::path::Path;

type InitFn = unsafe extern "C" fn() -> bool;
type SetBackendFn = unsafe extern "C" fn();
type ExecCmdFn = unsafe extern "C" fn(*const c_char);
type NumMatchesFn = unsafe extern "C" fn() -> c_long;
type VersionFn = unsafe extern "C" fn() -> *const c_char;
type ScanProgressFn = unsafe extern "C" fn() -> c_double;
type SetStopFlagFn = unsafe extern "C" fn(bool);

pub const SM_INIT: &str = "sm_init";
pub const SM_SET_BACKEND: &str = "sm_set_backend";
pub const SM_BACKEND_EXEC_CMD: &str = "sm_backend_exec_cmd";
pub const SM_GET_NUM_MATCHES: &str = "sm_get_num_matches";
pub const SM_GET_VERSION: &str = "sm_get_version";
pub const SM_GET_SCAN_PROGRESS: &str = "sm_get_scan_progress";
pub const SM_SET_STOP_FLAG: &str = "sm_set_stop_flag";

/// Exported symbol names, in binding order.
pub const ENTRY_POINTS: [&str; 7] = [
    SM_INIT,
    SM_SET_BACKEND,
    SM_BACKEND_EXEC_CMD,
    SM_GET_NUM_MATCHES,
    SM_GET_VERSION,
    SM_GET_SCAN_PROGRESS,
    SM_SET_STOP_FLAG,
];

/// Resolved entry points. Only valid while the owning `Library` is loaded.
struct EntryPoints {
    init: InitFn,
    set_backend: SetBackendFn,
    exec_cmd: ExecCmdFn,
    num_matches: NumMatchesFn,
    version: VersionFn,
    scan_progress: ScanProgressFn,
    set_stop_flag: SetStopFlagFn,
}

/// Handle to a loaded scanmem library.
///
/// Construction either binds every entry point or fails; there is no
/// partially usable handle.
pub struct LibEngine {
    entry: EntryPoints,
    // Declared last so the function pointers above are never outlived by the mapping.
    _library: Library,
}

impl LibEngine {
    /// Load the library at `path` and bind all entry points.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // SAFETY: loading runs the library's initializers. The library is the
        // scanmem engine, which has no initializers with preconditions.
        let library = unsafe { Library::new(path) }.map_err(|source| HostError::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: each type alias matches the C prototype exported by libscanmem.
        let entry = unsafe {
            EntryPoints {
                init: bind(&library, SM_INIT)?,
                set_backend: bind(&library, SM_SET_BACKEND)?,
                exec_cmd: bind(&library, SM_BACKEND_EXEC_CMD)?,
                num_matches: bind(&library, SM_GET_NUM_MATCHES)?,
                version: bind(&library, SM_GET_VERSION)?,
                scan_progress: bind(&library, SM_GET_SCAN_PROGRESS)?,
                set_stop_flag: bind(&library, SM_SET_STOP_FLAG)?,
            }
        };

        log::debug!("bound {} entry points from {}", ENTRY_POINTS.len(), path.display());

        Ok(Self {
            entry,
            _library: library,
        })
    }
}

/// Resolve one symbol and copy the function pointer out of it.
///
/// # Safety
///
/// `T` must be the exact function pointer type of the exported symbol.
unsafe fn bind<T: Copy>(library: &Library, symbol: &'static str) -> Result<T> {
    // SAFETY: forwarded to the caller.
    let resolved = unsafe { library.get::<T>(symbol.as_bytes()) }
        .map_err(|source| HostError::MissingEntryPoint { symbol, source })?;
    Ok(*resolved)
}

impl Engine for LibEngine {
    fn initialize(&self) -> bool {
        unsafe { (self.entry.init)() }
    }

    fn select_backend(&self) {
        unsafe { (self.entry.set_backend)() }
    }

    fn execute_command(&self, command: &CStr) -> Result<()> {
        // SAFETY: the pointer stays valid for the whole call and the engine
        // does not retain it.
        unsafe { (self.entry.exec_cmd)(command.as_ptr()) };
        Ok(())
    }

    fn match_count(&self) -> i64 {
        unsafe { (self.entry.num_matches)() as i64 }
    }

    fn version(&self) -> Result<String> {
        let raw = unsafe { (self.entry.version)() };
        if raw.is_null() {
            return Ok(String::new());
        }
        // SAFETY: the engine returns a pointer to a static NUL-terminated string.
        let bytes = unsafe { CStr::from_ptr(raw) }.to_bytes().to_vec();
        Ok(String::from_utf8(bytes)?)
    }

    fn scan_progress(&self) -> f64 {
        unsafe { (self.entry.scan_progress)() }
    }

    fn set_stop_flag(&self, stop: bool) {
        unsafe { (self.entry.set_stop_flag)(stop) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn entry_point_names_are_unique() {
        for (i, a) in ENTRY_POINTS.iter().enumerate() {
            for b in &ENTRY_POINTS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn every_bound_symbol_is_listed_once() {
        let bound = [
            SM_INIT,
            SM_SET_BACKEND,
            SM_BACKEND_EXEC_CMD,
            SM_GET_NUM_MATCHES,
            SM_GET_VERSION,
            SM_GET_SCAN_PROGRESS,
            SM_SET_STOP_FLAG,
        ];
        assert_eq!(ENTRY_POINTS, bound);
        assert!(ENTRY_POINTS.iter().all(|name| name.starts_with("sm_")));
    }

    #[test]
    fn missing_library_is_a_load_error() {
        let err = LibEngine::load("/nonexistent/libscanmem.so")
            .err()
            .expect("load must fail");
        match err {
            HostError::LibraryLoad { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/libscanmem.so"));
            }
            other => panic!("expected LibraryLoad, got {:?}", other),
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn library_without_engine_symbols_is_rejected() {
        // libc loads fine but exports none of the sm_* entry points.
        let err = LibEngine::load("libc.so.6").err().expect("bind must fail");
        match err {
            HostError::MissingEntryPoint { symbol, .. } => assert_eq!(symbol, ENTRY_POINTS[0]),
            other => panic!("expected MissingEntryPoint, got {:?}", other),
        }
    }
}
