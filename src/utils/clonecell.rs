use std::{
    cell::UnsafeCell,
    fmt::{Debug, Formatter},
    mem,
    rc::{Rc, Weak},
};

/// A cell for values whose `Clone` impl cannot observe the cell itself.
///
/// This allows `get` to hand out clones without a `RefCell` borrow guard, which
/// matters in callback-heavy code where the same cell is read again from inside
/// a callback.
pub struct CloneCell<T: UnsafeCellCloneSafe> {
    data: UnsafeCell<T>,
}

impl<T: UnsafeCellCloneSafe + Debug> Debug for CloneCell<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.get().fmt(f)
    }
}

impl<T: UnsafeCellCloneSafe> CloneCell<T> {
    pub const fn new(t: T) -> Self {
        Self {
            data: UnsafeCell::new(t),
        }
    }

    #[inline(always)]
    pub fn get(&self) -> T {
        // SAFETY: UnsafeCellCloneSafe guarantees that clone does not re-enter this cell.
        unsafe { (*self.data.get()).clone() }
    }

    #[inline(always)]
    pub fn set(&self, t: T) -> T {
        // SAFETY: no reference into the cell outlives any method of this type.
        unsafe { mem::replace(&mut *self.data.get(), t) }
    }

    #[inline(always)]
    pub fn take(&self) -> T
    where
        T: Default,
    {
        self.set(T::default())
    }
}

impl<T: Default + UnsafeCellCloneSafe> Default for CloneCell<T> {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

/// # Safety
///
/// `Clone::clone` must not access any `CloneCell`.
pub unsafe trait UnsafeCellCloneSafe: Clone {}

unsafe impl<T: UnsafeCellCloneSafe> UnsafeCellCloneSafe for Option<T> {}

unsafe impl<T: ?Sized> UnsafeCellCloneSafe for Rc<T> {}

unsafe impl<T: ?Sized> UnsafeCellCloneSafe for Weak<T> {}
