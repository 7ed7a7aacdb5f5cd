/*!
# CD Verify: Kill Switch
*/

use std::{
	fmt,
	sync::{
		Arc,
		atomic::{
			AtomicBool,
			Ordering::{
				Acquire,
				Release,
			},
		},
		Mutex,
		Weak,
	},
};



/// # Interruptible.
///
/// This is implemented by anything that can park a thread indefinitely, like
/// [`Fifo`](crate::Fifo), so that the [`KillSwitch`] can wake it up.
pub trait Interrupt: Send + Sync {
	/// # Interrupt.
	///
	/// Wake up any waiting threads and make them give up.
	fn interrupt(&self);
}



#[derive(Clone, Default)]
/// # Kill Switch.
///
/// This is a short-circuit for long-running operations across multiple
/// threads. The sector loop, the offset search, and every blocking queue
/// wait all keep an eye on it.
///
/// The main program's CTRL-C intercept sets the value, allowing CD Verify to
/// tidy up before dying.
///
/// Blocking queues need to be woken up to notice the change, so they should
/// be registered with [`KillSwitch::watch`] when created.
pub struct KillSwitch(Arc<KillSwitchInner>);

#[derive(Default)]
/// # Shared State.
struct KillSwitchInner {
	/// # Dead?
	killed: AtomicBool,

	/// # Things to Wake.
	watched: Mutex<Vec<Weak<dyn Interrupt>>>,
}

impl fmt::Debug for KillSwitch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KillSwitch")
			.field("killed", &self.killed())
			.finish_non_exhaustive()
	}
}

impl KillSwitch {
	#[must_use]
	/// # Dead?
	pub fn killed(&self) -> bool { self.0.killed.load(Acquire) }

	/// # Kill!
	///
	/// Flip the switch and interrupt everything being watched. This cannot be
	/// undone.
	pub fn kill(&self) {
		self.0.killed.store(true, Release);
		if let Ok(mut watched) = self.0.watched.lock() {
			for w in watched.drain(..) {
				if let Some(w) = w.upgrade() { w.interrupt(); }
			}
		}
	}

	/// # Watch.
	///
	/// Register something to be interrupted when the switch is flipped. If
	/// that has already happened, it will be interrupted immediately.
	pub fn watch<T>(&self, src: &Arc<T>)
	where T: Interrupt + 'static {
		if self.killed() {
			src.interrupt();
			return;
		}

		let weak = Arc::downgrade(src) as Weak<dyn Interrupt>;
		if let Ok(mut watched) = self.0.watched.lock() {
			// Drop anything that has already gone away.
			watched.retain(|w| w.strong_count() != 0);
			watched.push(weak);
		}

		// Check again in case we lost a race with kill().
		if self.killed() { src.interrupt(); }
	}
}
