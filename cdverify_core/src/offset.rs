/*!
# CD Verify: Read Offset
*/

use crate::{
	BYTES_PER_SAMPLE,
	BYTES_PER_SECTOR,
	CdVerifyError,
	SAMPLES_PER_SECTOR,
};
use dactyl::traits::BytesToSigned;
use std::fmt;



/// # Min Offset.
const MIN_OFFSET: i16 = -5880;

/// # Max Offset.
const MAX_OFFSET: i16 = 5880;



#[derive(Debug, Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
/// # Read Offset.
///
/// This holds a read offset in samples, but can return values in various other
/// useful formats.
///
/// Positive offsets mean the drive returns data late, so the true data for a
/// given position lives that many samples _further_ along in the raw stream.
///
/// For historical reasons, values are restricted to `-5880..=5880`.
pub struct ReadOffset(i16);

impl fmt::Display for ReadOffset {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:+}", self.0)
	}
}

impl TryFrom<i16> for ReadOffset {
	type Error = CdVerifyError;
	fn try_from(src: i16) -> Result<Self, Self::Error> {
		if (MIN_OFFSET..=MAX_OFFSET).contains(&src) { Ok(Self(src)) }
		else { Err(CdVerifyError::ReadOffset) }
	}
}

impl TryFrom<i32> for ReadOffset {
	type Error = CdVerifyError;
	fn try_from(src: i32) -> Result<Self, Self::Error> {
		i16::try_from(src)
			.map_err(|_| CdVerifyError::ReadOffset)
			.and_then(Self::try_from)
	}
}

impl TryFrom<&[u8]> for ReadOffset {
	type Error = CdVerifyError;
	fn try_from(src: &[u8]) -> Result<Self, Self::Error> {
		// Allow an explicit plus sign.
		let src = src.strip_prefix(b"+").unwrap_or(src);
		if src.is_empty() { Ok(Self(0)) }
		else {
			i16::btoi(src)
				.ok_or(CdVerifyError::ReadOffset)
				.and_then(Self::try_from)
		}
	}
}

impl TryFrom<&str> for ReadOffset {
	type Error = CdVerifyError;
	fn try_from(src: &str) -> Result<Self, Self::Error> {
		Self::try_from(src.trim().as_bytes())
	}
}

impl ReadOffset {
	/// # Maximum Sector Reach.
	///
	/// The most whole sectors an offset can touch in either direction.
	pub const MAX_SECTORS: u16 = MAX_OFFSET.unsigned_abs() / SAMPLES_PER_SECTOR;

	#[must_use]
	/// # Samples.
	pub const fn samples(self) -> i16 { self.0 }

	#[must_use]
	/// # Bytes.
	///
	/// Return the offset in bytes.
	pub const fn bytes(self) -> i32 { self.0 as i32 * BYTES_PER_SAMPLE as i32 }
}

impl ReadOffset {
	#[must_use]
	/// # Sector Shift.
	///
	/// Return the number of whole sectors the first read must be shifted by,
	/// rounding _down_ (toward negative infinity). Paired with
	/// [`ReadOffset::partial_bytes`], this splits the offset into a sector
	/// move and a non-negative intra-sector byte skip.
	pub const fn sector_shift(self) -> i32 {
		self.bytes().div_euclid(BYTES_PER_SECTOR as i32)
	}

	#[must_use]
	/// # Partial Bytes.
	///
	/// Return the number of bytes to skip at the start of the first sector
	/// read, after applying [`ReadOffset::sector_shift`]. This is always
	/// within `0..2352`.
	pub const fn partial_bytes(self) -> i32 {
		self.bytes().rem_euclid(BYTES_PER_SECTOR as i32)
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_offset_parse() {
		for (raw, expected) in [
			("0", 0_i16),
			("", 0),
			("6", 6),
			("+6", 6),
			("-667", -667),
			("5880", 5880),
			("-5880", -5880),
		] {
			let offset = ReadOffset::try_from(raw).expect("Offset failed to parse.");
			assert_eq!(offset.samples(), expected, "Offset {raw} parsed incorrectly.");
		}

		for raw in ["5881", "-5881", "abc", "1.5"] {
			assert!(ReadOffset::try_from(raw).is_err(), "Offset {raw} should have failed.");
		}
	}

	#[test]
	fn t_offset_sectors() {
		for (samples, shift, partial) in [
			(0_i16, 0_i32, 0_i32),
			(6, 0, 24),
			(588, 1, 0),
			(589, 1, 4),
			(-6, -1, 2328),
			(-588, -1, 0),
			(-667, -2, 2036),
		] {
			let offset = ReadOffset::try_from(samples).expect("Offset failed.");
			assert_eq!(offset.sector_shift(), shift, "Shift mismatch for {samples}.");
			assert_eq!(offset.partial_bytes(), partial, "Partial mismatch for {samples}.");

			// The two halves should add back up to the whole.
			assert_eq!(
				shift * i32::from(BYTES_PER_SECTOR) + partial,
				offset.bytes(),
				"Shift/partial don't add up for {samples}.",
			);
		}

		assert_eq!(ReadOffset::MAX_SECTORS, 10);
	}
}
