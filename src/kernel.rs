use std::{ptr::NonNull, slice};

use crate::error::ArenaError;

/// Zero-sized handle on which the platform specific memory syscalls are
/// implemented. See [`PlatformMemory`].
pub(crate) struct Kernel;

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. As the allocator, our top level view of this, has nothing
/// to do with the concrete implementations / APIs offered by each kernel.
trait PlatformMemory {
    /// Request a zero-filled memory region of size `len`. It returns a pointer
    /// to the given location or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the kernel.
    unsafe fn return_memory(addr: NonNull<u8>, len: usize);
}

#[cfg(unix)]
mod unix {
    use super::{Kernel, PlatformMemory};

    use libc::{mmap, munmap, off_t, size_t};

    use std::{
        os::raw::{c_int, c_void},
        ptr::NonNull,
    };

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

                match addr {
                    libc::MAP_FAILED => None,
                    addr => NonNull::new(addr.cast::<u8>()),
                }
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, len: usize) {
            unsafe {
                munmap(addr.as_ptr().cast::<c_void>(), len as size_t);
            }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{os::raw::c_void, ptr::NonNull};

    use super::{Kernel, PlatformMemory};

    use windows::Win32::System::Memory;

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, _len: usize) {
            unsafe {
                let _ = Memory::VirtualFree(addr.as_ptr().cast::<c_void>(), 0, Memory::MEM_RELEASE);
            }
        }
    }
}

/// A backing buffer obtained from the kernel. It owns the mapping and gives
/// it back exactly once, on drop.
///
/// The buffer never moves for as long as the `Mapping` lives, so raw
/// addresses into it stay valid even if the `Mapping` itself is moved
/// (e.g. when the `Vec` holding the regions grows).
pub(crate) struct Mapping {
    addr: NonNull<u8>,
    len: usize,
}

// The mapping is exclusively owned, so handing it to another thread is fine.
// Sharing is not: every mutation goes through `&mut self`.
unsafe impl Send for Mapping {}

impl Mapping {
    /// Maps `len` zero-filled bytes. `len` must be non-zero.
    pub fn new(len: usize) -> Result<Self, ArenaError> {
        debug_assert!(len > 0);

        // SAFETY: `len` is non-zero and the returned memory is only ever
        // released through `Drop`.
        let addr = unsafe { Kernel::request_memory(len) }
            .ok_or(ArenaError::OutOfMemory { size: len })?;

        log::debug!("mapped {len} bytes at {addr:p}");

        Ok(Self { addr, len })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.addr
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `addr` points to `len` bytes we own, which stay mapped
        // until `self` is dropped.
        unsafe { slice::from_raw_parts(self.addr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: same as `as_slice`, and `&mut self` guarantees uniqueness.
        unsafe { slice::from_raw_parts_mut(self.addr.as_ptr(), self.len) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        log::debug!("returning {} bytes at {:p}", self.len, self.addr);

        // SAFETY: the mapping was created by `request_memory` with this exact
        // length and is released only here.
        unsafe { Kernel::return_memory(self.addr, self.len) }
    }
}
