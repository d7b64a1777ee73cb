//! Owning guard for native vault handles.

use std::fmt;

use tracing::trace;

use crate::sdk::{RawHandle, VaultRuntime};

/// What a handle was produced for. All roles share one native
/// representation; the role only records which operation created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleRole {
    Request,
    Response,
    ErrorContext,
}

/// A native handle owned by the current scope.
///
/// The handle is released exactly once: either by an explicit
/// [`release`](Handle::release) or when the guard is dropped, whichever
/// comes first. A null handle is inert and releasing it does nothing.
pub struct Handle<'rt, R: VaultRuntime + ?Sized> {
    runtime: &'rt R,
    raw: RawHandle,
    role: HandleRole,
}

impl<'rt, R: VaultRuntime + ?Sized> Handle<'rt, R> {
    /// Take ownership of a raw handle issued by `runtime`.
    ///
    /// # Safety
    /// `raw` must be null or a live handle issued by `runtime` that nothing
    /// else will release.
    pub unsafe fn from_raw(runtime: &'rt R, raw: RawHandle, role: HandleRole) -> Self {
        Self { runtime, raw, role }
    }

    /// An inert handle.
    pub fn null(runtime: &'rt R, role: HandleRole) -> Self {
        Self {
            runtime,
            raw: RawHandle::null(),
            role,
        }
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    pub fn role(&self) -> HandleRole {
        self.role
    }

    pub fn runtime(&self) -> &'rt R {
        self.runtime
    }

    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    /// Return the handle to the runtime. Later calls are no-ops.
    pub fn release(&mut self) {
        if self.raw.is_null() {
            return;
        }
        let mut raw = self.raw;
        self.raw = RawHandle::null();
        self.runtime.release_handle(&mut raw);
        trace!(role = ?self.role, "released vault handle");
    }

    /// Give up ownership without releasing. The caller becomes responsible
    /// for the returned handle.
    pub fn into_raw(self) -> RawHandle {
        let raw = self.raw;
        std::mem::forget(self);
        raw
    }
}

impl<R: VaultRuntime + ?Sized> Drop for Handle<'_, R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: VaultRuntime + ?Sized> fmt::Debug for Handle<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("role", &self.role)
            .field("raw", &self.raw.as_ptr())
            .finish()
    }
}
