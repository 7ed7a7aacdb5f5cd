/*!
# CD Verify: Bounded Queue
*/

use crate::{
	CdVerifyError,
	Interrupt,
};
use std::{
	collections::VecDeque,
	ops::BitOr,
	sync::{
		Condvar,
		Mutex,
		MutexGuard,
		PoisonError,
	},
};



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Queue Flags.
///
/// These control whether a full or empty queue makes the caller wait or
/// fail immediately.
pub struct FifoFlags(u8);

impl BitOr for FifoFlags {
	type Output = Self;
	fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl FifoFlags {
	/// # Never Block.
	pub const NONE: Self = Self(0);

	/// # Block On Full.
	///
	/// Pushes wait for room rather than failing.
	pub const BLOCK_ON_FULL: Self = Self(0b0000_0001);

	/// # Block On Empty.
	///
	/// Pops wait for data rather than failing.
	pub const BLOCK_ON_EMPTY: Self = Self(0b0000_0010);

	/// # Block Both Ways.
	pub const BLOCK: Self = Self(0b0000_0011);

	#[must_use]
	/// # Contains?
	pub const fn contains(self, other: Self) -> bool { other.0 == self.0 & other.0 }
}



#[derive(Debug)]
/// # Bounded Queue.
///
/// A thread-safe FIFO connecting the ripper to its encoders. Items are cloned
/// on the way in, so the queue owns its copies outright.
///
/// `None` items are valid too; they serve as flush (end-of-stream) markers,
/// and always fit no matter how full the queue is.
///
/// Capacity works like so:
/// * Negative values mean unbounded.
/// * Zero means every push is silently discarded.
/// * Any other `N` allows up to `N + 1` queued items.
///
/// Blocking waits can be cut short by [`Interrupt::interrupt`] (usually by way
/// of the [`KillSwitch`](crate::KillSwitch)), after which anything that would
/// otherwise wait returns [`CdVerifyError::Killed`] instead. Non-waiting calls
/// keep working so whatever has already been queued can be drained.
///
/// ## Examples
///
/// ```
/// use cdverify_core::{Fifo, FifoFlags};
///
/// let fifo = Fifo::new(1, FifoFlags::NONE);
/// assert!(fifo.push(Some(&1_u8)).is_ok());
/// assert!(fifo.push(Some(&2_u8)).is_ok());
/// assert!(fifo.push(Some(&3_u8)).is_err()); // Full!
///
/// assert_eq!(fifo.pop(), Ok(Some(1)));
/// assert_eq!(fifo.pop(), Ok(Some(2)));
/// assert!(fifo.pop().is_err()); // Empty!
/// ```
pub struct Fifo<T> {
	inner: Mutex<FifoInner<T>>,
	cond_in: Condvar,
	cond_out: Condvar,
}

#[derive(Debug)]
/// # Queue State.
struct FifoInner<T> {
	queue: VecDeque<Option<T>>,
	capacity: Option<usize>,
	flags: FifoFlags,
	interrupted: bool,
}

impl<T> FifoInner<T> {
	/// # Is Full?
	fn is_full(&self) -> bool {
		self.capacity.is_some_and(|cap| cap < self.queue.len())
	}
}

impl<T: Send> Interrupt for Fifo<T> {
	fn interrupt(&self) {
		self.lock().interrupted = true;
		self.cond_in.notify_all();
		self.cond_out.notify_all();
	}
}

impl<T> Fifo<T> {
	#[must_use]
	/// # New.
	pub fn new(capacity: i32, flags: FifoFlags) -> Self {
		Self {
			inner: Mutex::new(FifoInner {
				queue: VecDeque::new(),
				capacity: usize::try_from(capacity).ok(),
				flags,
				interrupted: false,
			}),
			cond_in: Condvar::new(),
			cond_out: Condvar::new(),
		}
	}

	#[must_use]
	/// # Length.
	pub fn len(&self) -> usize { self.lock().queue.len() }

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.lock().queue.is_empty() }

	/// # Lock.
	///
	/// Nothing here can leave the state half-updated, so a poisoned lock is
	/// still perfectly usable.
	fn lock(&self) -> MutexGuard<'_, FifoInner<T>> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl<T: Clone> Fifo<T> {
	/// # Push.
	///
	/// Add a copy of the item (or a flush marker) to the end of the queue.
	///
	/// ## Errors
	///
	/// If the queue is full and not blocking, [`CdVerifyError::FifoFull`] is
	/// returned. If it is blocking but gets interrupted,
	/// [`CdVerifyError::Killed`] is returned. Allocation failures are
	/// returned as [`CdVerifyError::Alloc`].
	pub fn push(&self, item: Option<&T>) -> Result<(), CdVerifyError> {
		let mut inner = self.lock();

		// Zero-capacity queues are black holes.
		if inner.capacity == Some(0) { return Ok(()); }

		// Wait for room, unless this is a flush marker.
		if item.is_some() {
			while inner.is_full() {
				if ! inner.flags.contains(FifoFlags::BLOCK_ON_FULL) {
					return Err(CdVerifyError::FifoFull);
				}
				if inner.interrupted { return Err(CdVerifyError::Killed); }
				inner = self.cond_in.wait(inner).unwrap_or_else(PoisonError::into_inner);
			}
		}

		inner.queue.try_reserve(1).map_err(|_| CdVerifyError::Alloc)?;
		inner.queue.push_back(item.cloned());
		drop(inner);

		self.cond_out.notify_one();
		Ok(())
	}

	/// # Pop.
	///
	/// Remove and return the oldest item. A return value of `Ok(None)` is a
	/// flush marker.
	///
	/// ## Errors
	///
	/// If the queue is empty and not blocking, [`CdVerifyError::FifoEmpty`]
	/// is returned. If it is blocking but gets interrupted,
	/// [`CdVerifyError::Killed`] is returned.
	pub fn pop(&self) -> Result<Option<T>, CdVerifyError> {
		let mut inner = self.wait_for_data()?;
		let out = inner.queue.pop_front().ok_or(CdVerifyError::FifoEmpty)?;
		drop(inner);

		self.cond_in.notify_one();
		Ok(out)
	}

	/// # Peek.
	///
	/// Return a copy of the oldest item without removing it.
	///
	/// ## Errors
	///
	/// This returns the same errors as [`Fifo::pop`].
	pub fn peek(&self) -> Result<Option<T>, CdVerifyError> {
		let inner = self.wait_for_data()?;
		inner.queue.front().cloned().ok_or(CdVerifyError::FifoEmpty)
	}

	/// # Wait For Data.
	///
	/// Return the locked state once there's something in the queue.
	fn wait_for_data(&self) -> Result<MutexGuard<'_, FifoInner<T>>, CdVerifyError> {
		let mut inner = self.lock();
		while inner.queue.is_empty() {
			if ! inner.flags.contains(FifoFlags::BLOCK_ON_EMPTY) {
				return Err(CdVerifyError::FifoEmpty);
			}
			if inner.interrupted { return Err(CdVerifyError::Killed); }
			inner = self.cond_out.wait(inner).unwrap_or_else(PoisonError::into_inner);
		}
		Ok(inner)
	}
}
