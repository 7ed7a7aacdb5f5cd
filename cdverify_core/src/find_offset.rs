/*!
# CD Verify: Offset Discovery

Drives read a fixed number of samples early or late. If AccurateRip knows the
sector 450 checksum of a track, the offset can be recovered by reading the
raw data around that sector and sliding a one-sector window back and forth
until the checksums line up.
*/

use crate::{
	BYTES_PER_SAMPLE,
	BYTES_PER_SECTOR,
	chk::{
		checksum_450,
		CHK450_SECTOR,
	},
	Disc,
	KillSwitch,
	NULL_SECTOR,
	read::read_or_silence,
	ReadOffset,
	SAMPLES_PER_SECTOR,
	SectorReader,
	Track,
};
use std::fmt;



/// # Starting Radius (in sectors).
const RADIUS_MIN: u16 = 2;

/// # Maximum Radius (in sectors).
///
/// This covers the full `ReadOffset` range.
const RADIUS_MAX: u16 = ReadOffset::MAX_SECTORS;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Offset Search Result.
pub enum OffsetSearch {
	/// # Found.
	///
	/// The confidence is the number of tracks that agreed on the offset.
	Found {
		/// # Offset.
		offset: ReadOffset,

		/// # Agreeing Tracks.
		confidence: u8,
	},

	/// # Not Found.
	NotFound,

	/// # Cancelled.
	Incomplete,
}

impl fmt::Display for OffsetSearch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Found { offset, confidence } => write!(
				f,
				"Read offset {offset} (confirmed by {confidence} track{}).",
				if *confidence == 1 { "" } else { "s" },
			),
			Self::NotFound => f.write_str("The read offset could not be determined."),
			Self::Incomplete => f.write_str("The offset search was aborted."),
		}
	}
}

impl OffsetSearch {
	#[must_use]
	/// # Offset.
	pub const fn offset(self) -> Option<ReadOffset> {
		if let Self::Found { offset, .. } = self { Some(offset) }
		else { None }
	}
}



/// # Find Offset.
///
/// Discover the drive's read offset by correlating raw reads around each
/// track's 450th sector with the AccurateRip checkpoint checksums, so the
/// disc must already have had its [`Disc::accuraterip`] lookup.
///
/// The first track to produce a match sets the offset; every later track
/// finding the same offset raises its confidence, while one finding a
/// different offset replaces it. If no track matches anything, the search
/// is repeated over twice the distance, up to the limit of what a
/// [`ReadOffset`] can hold.
///
/// A `prior` offset, if any, is tried first, and decides which direction to
/// search first.
///
/// If the kill switch is flipped, the search stops and reports
/// [`OffsetSearch::Incomplete`].
pub fn find_offset<R>(
	disc: &Disc,
	reader: &mut R,
	prior: Option<ReadOffset>,
	killed: &KillSwitch,
) -> OffsetSearch
where R: SectorReader + ?Sized {
	let mut radius = RADIUS_MIN;
	let mut buf = Vec::new();

	loop {
		let mut found: Option<(i16, u8)> = None;
		let mut hint = prior.map(ReadOffset::samples);

		for t in disc.tracks() {
			let Some(target) = target_checksum(t, radius) else { continue; };
			if killed.killed() { return OffsetSearch::Incomplete; }

			read_around_450(reader, t, radius, &mut buf);
			let res = match scan(&buf, radius, target, hint, killed) {
				Ok(res) => res,
				Err(()) => return OffsetSearch::Incomplete,
			};

			if let Some(offset) = res {
				found = match found {
					Some((old, conf)) if old == offset => Some((old, conf.saturating_add(1))),
					_ => Some((offset, 1)),
				};
				hint.replace(offset);
			}
		}

		if let Some((offset, confidence)) = found {
			if let Ok(offset) = ReadOffset::try_from(offset) {
				return OffsetSearch::Found { offset, confidence };
			}
		}

		if radius == RADIUS_MAX { return OffsetSearch::NotFound; }
		radius = radius.saturating_mul(2).min(RADIUS_MAX);
	}
}

/// # Target Checksum.
///
/// Return the sector 450 checksum to hunt for, if the track can be used at
/// the given radius.
fn target_checksum(track: &Track, radius: u16) -> Option<u32> {
	if
		track.is_data() ||
		track.is_synthetic() ||
		! track.ar_status().is_found() ||
		track.ar_max_confidence() == 0 ||
		track.sectors() <= CHK450_SECTOR + 1 + u32::from(radius)
	{
		return None;
	}

	track.ar_entries().first().map(|e| e.checksum_450())
}

/// # Read Around 450.
///
/// Read `radius` sectors on either side of the track's 450th, plus the
/// 450th itself. Unreadable sectors are treated as silence.
fn read_around_450<R>(reader: &mut R, track: &Track, radius: u16, buf: &mut Vec<u8>)
where R: SectorReader + ?Sized {
	let radius = i32::from(radius);
	let center = track.start_lsn_sig() + CHK450_SECTOR as i32;

	buf.clear();
	let mut sector = NULL_SECTOR;
	for lsn in center - radius..=center + radius {
		read_or_silence(reader, lsn, &mut sector);
		buf.extend_from_slice(&sector);
	}
}

/// # Scan.
///
/// Slide a one-sector window across the buffer looking for the target,
/// returning the matching shift (in samples), if any.
///
/// The hint, if any, is checked first, then the shifts are checked outward
/// from zero in the hinted direction, then the other.
///
/// Returns an error if the search was killed.
fn scan(buf: &[u8], radius: u16, target: u32, hint: Option<i16>, killed: &KillSwitch)
-> Result<Option<i16>, ()> {
	let radius = i16::try_from(radius).map_err(|_| ())?;
	let max = radius * SAMPLES_PER_SECTOR as i16;
	let center = usize::from(radius.unsigned_abs()) * usize::from(BYTES_PER_SECTOR);

	let check = |shift: i16| -> bool {
		let Some(from) = center.checked_add_signed(isize::from(shift) * BYTES_PER_SAMPLE as isize)
		else { return false; };
		buf.get(from..from + usize::from(BYTES_PER_SECTOR))
			.and_then(checksum_450)
			.is_some_and(|chk| chk == target)
	};

	// The fast path.
	if let Some(h) = hint {
		if (-max..=max).contains(&h) && check(h) { return Ok(Some(h)); }
	}

	let negative_first = hint.is_some_and(|h| h < 0);
	let halves: [(i16, i16); 2] =
		if negative_first { [(-1, max), (1, max)] }
		else { [(1, max), (-1, max)] };

	for (sign, max) in halves {
		for step in 0..=max {
			// Zero only needs checking once.
			if step == 0 && sign < 0 { continue; }
			if step % SAMPLES_PER_SECTOR as i16 == 0 && killed.killed() { return Err(()); }

			let shift = sign * step;
			if check(shift) { return Ok(Some(shift)); }
		}
	}

	Ok(None)
}
