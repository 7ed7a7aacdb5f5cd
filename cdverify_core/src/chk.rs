/*!
# CD Verify: Checksums

AccurateRip's checksums are non-standard, but are more or less the sum of the
product of each sample pair (in `u32` form) and its one-based position within
the track. Version one simply wraps the products; version two folds the high
and low halves of each 64-bit product together before adding it in.

All data is factored, except the first `2939` samples of the first track, and
last `2940` samples of the last track.

EAC's CRC, by contrast, is just a regular old CRC32 of the track's bytes.
*/

use crate::{
	BYTES_PER_SAMPLE,
	BYTES_PER_SECTOR,
	SAMPLES_PER_SECTOR,
};
use crc32fast::Hasher as Crc;



/// # Edge Exclusion (in samples).
///
/// This is five sectors' worth of _bytes_, divided by four. It is a strange
/// number, but that's what the database was built with.
const EDGE_SAMPLES: u32 = BYTES_PER_SECTOR as u32 * 5 / BYTES_PER_SAMPLE as u32;

/// # Checkpoint Sector.
pub(crate) const CHK450_SECTOR: u32 = 450;

/// # Checkpoint Start (in samples).
///
/// This is the number of samples preceding the checkpoint sector.
const CHK450_START: u32 = CHK450_SECTOR * SAMPLES_PER_SECTOR as u32;



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Track Checksums.
///
/// These are the finished values for a single track.
pub struct Checksums {
	eac_crc: u32,
	v1: u32,
	v2: u32,
	v1_450: u32,
}

impl Checksums {
	#[must_use]
	/// # EAC CRC32.
	pub const fn eac_crc(&self) -> u32 { self.eac_crc }

	#[must_use]
	/// # AccurateRip V1.
	pub const fn accuraterip_v1(&self) -> u32 { self.v1 }

	#[must_use]
	/// # AccurateRip V2.
	pub const fn accuraterip_v2(&self) -> u32 { self.v2 }

	#[must_use]
	/// # AccurateRip V1 (Sector 450).
	///
	/// This covers only the 588 samples of the track's 450th sector, and is
	/// used to detect partial matches and read offsets.
	pub const fn accuraterip_v1_450(&self) -> u32 { self.v1_450 }

	#[cfg(test)]
	/// # From Parts.
	pub(crate) const fn from_parts(eac_crc: u32, v1: u32, v2: u32, v1_450: u32) -> Self {
		Self { eac_crc, v1, v2, v1_450 }
	}
}



#[derive(Debug, Clone)]
/// # Track Checksum (Accumulator).
///
/// This crunches the checksums for one track incrementally as its bytes are
/// fed in, in as many or as few chunks as is convenient. Chunk boundaries do
/// not need to line up with samples; leftover bytes are held until the rest
/// arrive.
///
/// ## Examples
///
/// ```
/// use cdverify_core::TrackChecksum;
///
/// // A middle track of ten sectors.
/// let mut chk = TrackChecksum::new(5880, false, false);
/// chk.update(&[0_u8; 2352 * 4]);
/// chk.update(&[]);
/// chk.update(&[0_u8; 2352 * 6]);
///
/// let chk = chk.finish();
/// assert_eq!(chk.accuraterip_v1(), 0);
/// assert_eq!(chk.accuraterip_v2(), 0);
/// ```
pub struct TrackChecksum {
	crc: Crc,
	v1: u32,
	v2: u32,
	v1_450: u32,
	mult: u32,
	start: u32,
	end: u32,
	carry: [u8; 4],
	carry_len: usize,
}

impl TrackChecksum {
	#[must_use]
	/// # New.
	///
	/// Start a new accumulator for a track with `samples` total sample pairs.
	/// The edge exclusions are applied if the track is the `first` and/or
	/// `last` audio track on the disc.
	pub fn new(samples: u64, first: bool, last: bool) -> Self {
		let total = u32::try_from(samples).unwrap_or(u32::MAX);
		let start = if first { EDGE_SAMPLES } else { 0 };
		let end = if last { total.saturating_sub(EDGE_SAMPLES) } else { total };

		Self {
			crc: Crc::new(),
			v1: 0,
			v2: 0,
			v1_450: 0,
			mult: 1,
			start,
			end,
			carry: [0; 4],
			carry_len: 0,
		}
	}

	/// # Update.
	///
	/// Feed more data into the accumulator. Empty slices are fine, if a bit
	/// pointless.
	pub fn update(&mut self, mut src: &[u8]) {
		if src.is_empty() { return; }
		self.crc.update(src);

		// Finish off a sample from last time.
		if self.carry_len != 0 {
			let need = 4 - self.carry_len;
			let take = need.min(src.len());
			self.carry[self.carry_len..self.carry_len + take].copy_from_slice(&src[..take]);
			self.carry_len += take;
			src = &src[take..];

			if self.carry_len == 4 {
				self.carry_len = 0;
				self.push_sample(u32::from_le_bytes(self.carry));
			}
			else { return; }
		}

		// Crunch the whole samples.
		let chunks = src.chunks_exact(4);
		let rem = chunks.remainder();
		for chunk in chunks {
			self.push_sample(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
		}

		// Save any leftovers for next time.
		if ! rem.is_empty() {
			self.carry[..rem.len()].copy_from_slice(rem);
			self.carry_len = rem.len();
		}
	}

	#[must_use]
	/// # Finish.
	///
	/// Return the final checksums. Any trailing partial sample is part of the
	/// CRC, but is otherwise ignored.
	pub fn finish(self) -> Checksums {
		Checksums {
			eac_crc: self.crc.finalize(),
			v1: self.v1,
			v2: self.v2,
			v1_450: self.v1_450,
		}
	}

	/// # Push Sample.
	fn push_sample(&mut self, sample: u32) {
		let mult = self.mult;
		if self.start <= mult && mult <= self.end {
			self.v1 = self.v1.wrapping_add(mult.wrapping_mul(sample));
			self.v2 = self.v2.wrapping_add(v2_product(mult, sample));
		}

		// The checkpoint has its own relative multiplier.
		if CHK450_START < mult && mult <= CHK450_START + u32::from(SAMPLES_PER_SECTOR) {
			let rel = mult - CHK450_START;
			self.v1_450 = self.v1_450.wrapping_add(rel.wrapping_mul(sample));
		}

		self.mult = self.mult.wrapping_add(1);
	}
}



#[must_use]
/// # Checkpoint Checksum.
///
/// Crunch the v1-style checksum for a single sector's worth of bytes, using
/// relative multipliers `1..=588`. This is how [`Checksums::accuraterip_v1_450`]
/// is calculated, but works on arbitrary slices so that a read offset can be
/// hunted down.
///
/// Returns `None` if the slice is not exactly one sector long.
pub(crate) fn checksum_450(src: &[u8]) -> Option<u32> {
	if src.len() != usize::from(BYTES_PER_SECTOR) { return None; }
	let mut sum = 0_u32;
	for (mult, chunk) in (1_u32..).zip(src.chunks_exact(4)) {
		let sample = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
		sum = sum.wrapping_add(mult.wrapping_mul(sample));
	}
	Some(sum)
}

#[allow(clippy::cast_possible_truncation)]
/// # V2 Product.
///
/// Multiply and fold the halves together.
const fn v2_product(mult: u32, sample: u32) -> u32 {
	let kv = mult as u64 * sample as u64;
	((kv >> 32) as u32).wrapping_add(kv as u32)
}



#[cfg(test)]
mod test {
	use super::*;

	/// # Noise.
	///
	/// Generate some predictable-but-messy bytes.
	fn noise(len: usize, mut seed: u32) -> Vec<u8> {
		let mut out = Vec::with_capacity(len);
		while out.len() < len {
			seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
			out.extend_from_slice(&seed.to_le_bytes());
		}
		out.truncate(len);
		out
	}

	/// # Reference Sums.
	///
	/// Compute v1/v2 the slow way, using big integers and a final modulo.
	fn reference(src: &[u8], start: u64, end: u64) -> (u32, u32) {
		let mut v1 = 0_u128;
		let mut v2 = 0_u128;
		for (mult, chunk) in (1_u64..).zip(src.chunks_exact(4)) {
			if start <= mult && mult <= end {
				let v = u128::from(u32::from_le_bytes(chunk.try_into().unwrap()));
				let kv = u128::from(mult) * v;
				v1 += kv;
				v2 += (kv >> 32) + (kv & 0xFFFF_FFFF);
			}
		}
		((v1 % (1 << 32)) as u32, (v2 % (1 << 32)) as u32)
	}

	#[test]
	fn t_crc() {
		// The standard check value.
		let mut chk = TrackChecksum::new(2, false, false);
		chk.update(b"1234");
		chk.update(b"56789");
		assert_eq!(chk.finish().eac_crc(), 0xCBF4_3926, "CRC32 check value mismatch.");
	}

	#[test]
	fn t_chunking() {
		// Five hundred sectors, enough to cover the checkpoint.
		let data = noise(usize::from(BYTES_PER_SECTOR) * 500, 0xDEAD_BEEF);
		let samples = (data.len() / 4) as u64;

		for (first, last) in [(false, false), (true, false), (false, true), (true, true)] {
			let mut whole = TrackChecksum::new(samples, first, last);
			whole.update(&data);
			let whole = whole.finish();

			// Feed it again in awkward, uneven pieces.
			let mut chunked = TrackChecksum::new(samples, first, last);
			let mut rest = data.as_slice();
			let mut size = 0;
			while ! rest.is_empty() {
				size = (size * 7 + 3) % 5003;
				let (a, b) = rest.split_at(size.min(rest.len()));
				chunked.update(a);
				chunked.update(&[]);
				rest = b;
			}
			let chunked = chunked.finish();

			assert_eq!(whole, chunked, "Chunking changed the checksums (first: {first}, last: {last}).");
			assert_ne!(whole.accuraterip_v1_450(), 0, "Checkpoint should have been crunched.");
		}
	}

	#[test]
	fn t_reference() {
		let data = noise(usize::from(BYTES_PER_SECTOR) * 20, 12345);
		let samples = (data.len() / 4) as u64;

		for (first, last) in [(false, false), (true, false), (false, true), (true, true)] {
			let start = if first { u64::from(EDGE_SAMPLES) } else { 0 };
			let end = if last { samples - u64::from(EDGE_SAMPLES) } else { samples };
			let (v1, v2) = reference(&data, start, end);

			let mut chk = TrackChecksum::new(samples, first, last);
			chk.update(&data);
			let chk = chk.finish();
			assert_eq!(chk.accuraterip_v1(), v1, "V1 mismatch (first: {first}, last: {last}).");
			assert_eq!(chk.accuraterip_v2(), v2, "V2 mismatch (first: {first}, last: {last}).");
		}
	}

	#[test]
	fn t_wraparound() {
		// Maxed-out samples overflow almost immediately.
		let data = vec![0xFF_u8; usize::from(BYTES_PER_SECTOR) * 8];
		let samples = (data.len() / 4) as u64;
		let (v1, v2) = reference(&data, 0, samples);

		let mut chk = TrackChecksum::new(samples, false, false);
		chk.update(&data);
		let chk = chk.finish();
		assert_eq!(chk.accuraterip_v1(), v1, "V1 did not wrap correctly.");
		assert_eq!(chk.accuraterip_v2(), v2, "V2 did not wrap correctly.");
		assert_ne!(chk.accuraterip_v1(), u32::MAX, "V1 should not saturate.");
	}

	#[test]
	fn t_edges() {
		assert_eq!(EDGE_SAMPLES, 2940);

		// Only the first 2939 samples have data.
		let mut data = vec![0_u8; usize::from(BYTES_PER_SECTOR) * 10];
		data[..2939 * 4].fill(1);
		let samples = (data.len() / 4) as u64;

		let mut chk = TrackChecksum::new(samples, true, false);
		chk.update(&data);
		assert_eq!(chk.finish().accuraterip_v1(), 0, "First-track exclusion failed.");

		let mut chk = TrackChecksum::new(samples, false, false);
		chk.update(&data);
		assert_ne!(chk.finish().accuraterip_v1(), 0, "Middle tracks should not exclude anything.");

		// Now the last 2940 samples.
		let mut data = vec![0_u8; usize::from(BYTES_PER_SECTOR) * 10];
		let len = data.len();
		data[len - 2940 * 4..].fill(1);

		let mut chk = TrackChecksum::new(samples, false, true);
		chk.update(&data);
		assert_eq!(chk.finish().accuraterip_v1(), 0, "Last-track exclusion failed.");
	}

	#[test]
	fn t_checkpoint() {
		let data = noise(usize::from(BYTES_PER_SECTOR) * 452, 999);
		let mut chk = TrackChecksum::new((data.len() / 4) as u64, true, true);
		chk.update(&data);
		let chk = chk.finish();

		let from = usize::from(BYTES_PER_SECTOR) * 450;
		let to = from + usize::from(BYTES_PER_SECTOR);
		assert_eq!(
			checksum_450(&data[from..to]),
			Some(chk.accuraterip_v1_450()),
			"Checkpoint mismatch.",
		);
		assert_eq!(checksum_450(&data[..10]), None, "Short slices should be rejected.");
	}
}
