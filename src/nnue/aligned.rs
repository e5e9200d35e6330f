//! Cache-line aligned storage for network parameters.

use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

mod sealed {
    pub trait Sealed {}
}

/// Plain integer types for which the all-zero bit pattern is a valid value.
pub trait Zeroable: sealed::Sealed + Copy + Send + Sync + 'static {}

macro_rules! zeroable {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}
            impl Zeroable for $t {}
        )*
    };
}

zeroable!(u8, i8, i16, i32);

/// An owned, zero-initialised, fixed-length buffer aligned to `ALIGN` bytes.
///
/// Allocated once when a network is created and released as a unit on drop.
pub struct AlignedBuffer<T: Zeroable, const ALIGN: usize = 64> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<T>,
}

// SAFETY: the buffer exclusively owns plain integer data.
unsafe impl<T: Zeroable, const ALIGN: usize> Send for AlignedBuffer<T, ALIGN> {}
// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Zeroable, const ALIGN: usize> Sync for AlignedBuffer<T, ALIGN> {}

impl<T: Zeroable, const ALIGN: usize> AlignedBuffer<T, ALIGN> {
    fn layout(len: usize) -> Layout {
        match Layout::array::<T>(len).and_then(|l| l.align_to(ALIGN)) {
            Ok(layout) => layout,
            Err(_) => panic!("aligned buffer of {len} elements overflows the address space"),
        }
    }

    /// Allocate `len` zeroed elements.
    ///
    /// # Panics
    /// Panics if the byte size overflows `isize`, like `Vec::with_capacity`.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        if len == 0 {
            return AlignedBuffer {
                ptr: NonNull::dangling(),
                len: 0,
                _marker: PhantomData,
            };
        }
        let layout = Self::layout(len);
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw.cast::<T>()) else {
            alloc::handle_alloc_error(layout)
        };
        AlignedBuffer {
            ptr,
            len,
            _marker: PhantomData,
        }
    }

    /// Reset every element to zero
    pub fn clear(&mut self) {
        // SAFETY: ptr is valid for len elements and zero is a valid T.
        unsafe { std::ptr::write_bytes(self.ptr.as_ptr(), 0, self.len) };
    }

    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }
}

impl<T: Zeroable, const ALIGN: usize> Deref for AlignedBuffer<T, ALIGN> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        // SAFETY: ptr is valid and initialised for len elements.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Zeroable, const ALIGN: usize> DerefMut for AlignedBuffer<T, ALIGN> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: ptr is valid, initialised and uniquely borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Zeroable, const ALIGN: usize> Clone for AlignedBuffer<T, ALIGN> {
    fn clone(&self) -> Self {
        let mut copy = Self::zeroed(self.len);
        copy.copy_from_slice(self);
        copy
    }
}

impl<T: Zeroable, const ALIGN: usize> Drop for AlignedBuffer<T, ALIGN> {
    fn drop(&mut self) {
        if self.len != 0 {
            // SAFETY: allocated in `zeroed` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), Self::layout(self.len)) };
        }
    }
}

impl<T: Zeroable + fmt::Debug, const ALIGN: usize> fmt::Debug for AlignedBuffer<T, ALIGN> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("align", &ALIGN)
            .finish()
    }
}

impl<T: Zeroable + PartialEq, const ALIGN: usize> PartialEq for AlignedBuffer<T, ALIGN> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

/// A value forced onto its own cache line; used for per-call scratch
/// buffers that live on the stack.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(64))]
pub struct CacheAligned<T>(pub T);

impl<T> Deref for CacheAligned<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for CacheAligned<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}
