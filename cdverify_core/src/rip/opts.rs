/*!
# CD Verify: Rip Options
*/

use crate::{
	MAX_TRACK_NUMBER,
	PregapAction,
	ReadOffset,
};



/// # FLAG: Overread.
const FLAG_OVERREAD: u8 =    0b0000_0001;

/// # FLAG: Verbose.
const FLAG_VERBOSE: u8 =     0b0000_0010;

/// # FLAG: AccurateRip Lookups.
const FLAG_ACCURATERIP: u8 = 0b0000_0100;

/// # FLAG: Cache Responses.
const FLAG_CACHE: u8 =       0b0000_1000;

/// # FLAG: Default.
const FLAG_DEFAULT: u8 = FLAG_ACCURATERIP | FLAG_CACHE;

/// # Minimum Confidence.
const CONFIDENCE_MIN: u8 = 1;

/// # Maximum Confidence.
const CONFIDENCE_MAX: u8 = 10;

/// # Default Queue Capacity.
const FIFO_CAPACITY: i16 = 16;

/// # Pregap Slots.
///
/// One for every possible track number, plus zero.
const PREGAP_SLOTS: usize = MAX_TRACK_NUMBER as usize + 1;



#[derive(Debug, Clone, Copy)]
/// # Rip Options.
///
/// This struct holds the rip-related options like read offset, pregap
/// handling, etc.
///
/// Options are set using builder-style methods, like:
///
/// ```
/// use cdverify_core::{PregapAction, RipOptions};
///
/// let opts = RipOptions::default()
///     .with_confidence(3)
///     .with_pregap(2, PregapAction::Merge)
///     .with_verbose(true);
///
/// assert_eq!(opts.confidence(), 3);
/// assert_eq!(opts.pregap(2), PregapAction::Merge);
/// assert_eq!(opts.pregap(3), PregapAction::Default);
/// ```
pub struct RipOptions {
	offset: ReadOffset,
	confidence: u8,
	fifo_capacity: i16,
	flags: u8,
	pregaps: [PregapAction; PREGAP_SLOTS],
}

impl Default for RipOptions {
	fn default() -> Self {
		Self {
			offset: ReadOffset::default(),
			confidence: CONFIDENCE_MIN,
			fifo_capacity: FIFO_CAPACITY,
			flags: FLAG_DEFAULT,
			pregaps: [PregapAction::Default; PREGAP_SLOTS],
		}
	}
}

macro_rules! with_flag {
	($fn:ident, $flag:ident, $($doc:literal),+ $(,)?) => (
		#[must_use]
		$(
			#[doc = $doc]
		)+
		pub const fn $fn(self, v: bool) -> Self {
			let flags =
				if v { self.flags | $flag }
				else { self.flags & ! $flag };

			Self {
				flags,
				..self
			}
		}
	)
}

/// ## Setters.
impl RipOptions {
	with_flag!(
		with_accuraterip,
		FLAG_ACCURATERIP,
		"# AccurateRip Lookups.",
		"",
		"When `true`, the disc fingerprint will be looked up in the AccurateRip",
		"database so the rip can be verified.",
		"",
		"The default is `true`.",
	);

	with_flag!(
		with_cache,
		FLAG_CACHE,
		"# Cache Database Responses.",
		"",
		"When `true`, AccurateRip responses are saved to (and read back from)",
		"the local scratch directory.",
		"",
		"The default is `true`.",
	);

	#[must_use]
	/// # Confirmation Confidence.
	///
	/// A track is only considered accurate if its checksum matches an
	/// AccurateRip entry with at least this confidence.
	///
	/// Values are capped to `1..=10`, with a default of `1`.
	pub const fn with_confidence(self, mut confidence: u8) -> Self {
		if confidence < CONFIDENCE_MIN { confidence = CONFIDENCE_MIN; }
		else if CONFIDENCE_MAX < confidence { confidence = CONFIDENCE_MAX; }
		Self {
			confidence,
			..self
		}
	}

	#[must_use]
	/// # Queue Capacity.
	///
	/// Set the capacity of each encoder's queue, in packets. See [`Fifo`](crate::Fifo)
	/// for how the number is interpreted. Negative values are unbounded.
	///
	/// A zero-capacity queue discards everything pushed to it, including the
	/// end-of-stream markers, so the minimum bounded value is `1`.
	///
	/// The default is `16`.
	pub const fn with_fifo_capacity(self, mut fifo_capacity: i16) -> Self {
		if fifo_capacity < -1 { fifo_capacity = -1; }
		else if fifo_capacity == 0 { fifo_capacity = 1; }
		Self {
			fifo_capacity,
			..self
		}
	}

	#[must_use]
	/// # Read Offset.
	///
	/// Optical drives have weirdly arbitrary precision problems, causing them
	/// to read data a little earlier or later than another drive might.
	///
	/// To normalize the data obtained across different drives, it is critical
	/// to set the appropriate count-offset. See [here](http://www.accuraterip.com/driveoffsets.htm) if you're not sure
	/// what your drive's offset is, or [`find_offset`](crate::find_offset).
	pub const fn with_offset(self, offset: ReadOffset) -> Self {
		Self {
			offset,
			..self
		}
	}

	with_flag!(
		with_overread,
		FLAG_OVERREAD,
		"# Overread Lead-in/out.",
		"",
		"When `true`, offset-shifted reads falling outside the disc bounds are",
		"attempted anyway. When `false`, those sectors are treated as silence.",
		"",
		"Most drives can't actually do this.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Pregap Action.
	///
	/// Set what should happen to the signalled pregap (if any) of the given
	/// physical track number. Numbers above `99` are silently ignored.
	pub fn with_pregap(mut self, track: u8, action: PregapAction) -> Self {
		if let Some(slot) = self.pregaps.get_mut(usize::from(track)) {
			*slot = action;
		}
		self
	}

	with_flag!(
		with_verbose,
		FLAG_VERBOSE,
		"# Verbose.",
		"",
		"When `true`, read errors are collected and printed after each track.",
		"",
		"The default is `false`.",
	);
}



macro_rules! get_flag {
	($fn:ident, $flag:ident, $title:literal) => (
		#[must_use]
		#[doc = concat!("# ", $title, "?")]
		pub const fn $fn(&self) -> bool { $flag == self.flags & $flag }
	);
}

/// # Getters.
impl RipOptions {
	get_flag!(accuraterip, FLAG_ACCURATERIP, "AccurateRip Lookups");
	get_flag!(cache, FLAG_CACHE, "Cache Database Responses");
	get_flag!(overread, FLAG_OVERREAD, "Overread Lead-in/out");
	get_flag!(verbose, FLAG_VERBOSE, "Verbose");

	#[must_use]
	/// # Minimum AccurateRip Confidence.
	pub const fn confidence(&self) -> u8 { self.confidence }

	#[must_use]
	/// # Queue Capacity.
	pub const fn fifo_capacity(&self) -> i16 { self.fifo_capacity }

	#[must_use]
	/// # Read Offset.
	pub const fn offset(&self) -> ReadOffset { self.offset }

	#[must_use]
	/// # Pregap Action.
	///
	/// Return the action for the given physical track number.
	pub fn pregap(&self, track: u8) -> PregapAction {
		self.pregaps.get(usize::from(track)).copied().unwrap_or_default()
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_rip_flags() {
		// Make sure our flags are unique.
		let mut all = vec![
			FLAG_ACCURATERIP,
			FLAG_CACHE,
			FLAG_OVERREAD,
			FLAG_VERBOSE,
		];
		all.sort_unstable();
		all.dedup();
		assert_eq!(all.len(), 4);
	}

	#[test]
	fn t_rip_options_defaults() {
		let opts = RipOptions::default();
		assert!(opts.accuraterip(), "Lookups should be on by default.");
		assert!(opts.cache(), "Caching should be on by default.");
		assert!(! opts.overread(), "Overread should be off by default.");
		assert!(! opts.verbose(), "Verbose should be off by default.");
		assert_eq!(opts.confidence(), 1);
		assert_eq!(opts.fifo_capacity(), 16);
		assert_eq!(opts.offset(), ReadOffset::default());
	}

	#[test]
	fn t_rip_options_confidence() {
		for v in [1, 3, 10] {
			let opts = RipOptions::default().with_confidence(v);
			assert_eq!(opts.confidence(), v);
		}

		// Min.
		let opts = RipOptions::default().with_confidence(0);
		assert_eq!(opts.confidence(), CONFIDENCE_MIN);

		// Max.
		let opts = RipOptions::default().with_confidence(64);
		assert_eq!(opts.confidence(), CONFIDENCE_MAX);
	}

	#[test]
	fn t_rip_options_fifo() {
		for v in [-1, 1, 200] {
			let opts = RipOptions::default().with_fifo_capacity(v);
			assert_eq!(opts.fifo_capacity(), v);
		}

		let opts = RipOptions::default().with_fifo_capacity(0);
		assert_eq!(opts.fifo_capacity(), 1, "Zero capacity should bump to 1.");

		let opts = RipOptions::default().with_fifo_capacity(-50);
		assert_eq!(opts.fifo_capacity(), -1, "Negative capacities should normalize to -1.");
	}

	#[test]
	fn t_rip_options_flags() {
		macro_rules! t_flags {
			($name:literal, $set:ident, $get:ident) => (
				let mut opts = RipOptions::default();
				for v in [false, true, false, true] {
					opts = opts.$set(v);
					assert_eq!(
						opts.$get(),
						v,
						concat!("Setting ", $name, " to {} failed."),
						v
					);
				}
			);
		}

		t_flags!("accuraterip", with_accuraterip, accuraterip);
		t_flags!("cache", with_cache, cache);
		t_flags!("overread", with_overread, overread);
		t_flags!("verbose", with_verbose, verbose);
	}

	#[test]
	fn t_rip_options_offset() {
		let offset5 = ReadOffset::try_from(b"5".as_slice()).expect("Read offset 5 failed.");
		let offset667 = ReadOffset::try_from(b"-667".as_slice()).expect("Read offset -667 failed.");
		for v in [offset5, offset667] {
			let opts = RipOptions::default().with_offset(v);
			assert_eq!(opts.offset(), v);
		}
	}

	#[test]
	fn t_rip_options_pregaps() {
		let opts = RipOptions::default()
			.with_pregap(0, PregapAction::Split)
			.with_pregap(5, PregapAction::Drop)
			.with_pregap(99, PregapAction::Merge)
			.with_pregap(100, PregapAction::Merge);

		assert_eq!(opts.pregap(0), PregapAction::Split);
		assert_eq!(opts.pregap(5), PregapAction::Drop);
		assert_eq!(opts.pregap(99), PregapAction::Merge);
		assert_eq!(opts.pregap(6), PregapAction::Default);
		assert_eq!(opts.pregap(100), PregapAction::Default, "Out of range tracks have no directive.");

		// Later settings win.
		let opts = opts.with_pregap(5, PregapAction::Default);
		assert_eq!(opts.pregap(5), PregapAction::Default);
	}
}
