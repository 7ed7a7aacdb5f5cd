/*!
# CD Verify: Disc Fingerprint
*/

use cdtoc::Toc;
use crate::{
	CD_LEADIN,
	Track,
};
use std::fmt;



/// # AccurateRip Base URL.
const ACCURATERIP_BASE: &str = "http://www.accuraterip.com/accuraterip";

/// # Sectors Per Second.
const SECTORS_PER_SECOND: u32 = 75;



#[derive(Debug, Clone, Eq, Hash, PartialEq)]
/// # Disc Fingerprint.
///
/// This holds the various identifiers used to look a disc up in third-party
/// databases: the two AccurateRip disc IDs, the legacy CDDB ID, and the
/// MusicBrainz ID.
///
/// All values are derived from the _physical_ layout, i.e. the track
/// boundaries as signalled by the table of contents, so pregap handling and
/// read offsets have no effect on them.
///
/// The `Display` implementation renders the AccurateRip ID, like
/// `004-0002189a-00087f33-1f02e004`.
pub struct Fingerprint {
	audio_tracks: u8,
	ar_id1: u32,
	ar_id2: u32,
	cddb_id: u32,
	musicbrainz_id: Option<String>,
}

impl fmt::Display for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{:03}-{:08x}-{:08x}-{:08x}",
			self.audio_tracks,
			self.ar_id1,
			self.ar_id2,
			self.cddb_id,
		)
	}
}

impl Fingerprint {
	#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
	/// # New.
	///
	/// Crunch the identifiers for a disc given its tracks and the sector
	/// right before the lead-out.
	///
	/// Synthetic tracks (split pregaps) are ignored.
	///
	/// Returns `None` if there are no audio tracks.
	pub(crate) fn new(tracks: &[Track], disc_end: i32) -> Option<Self> {
		let physical = || tracks.iter().filter(|t| ! t.is_synthetic());

		// AccurateRip only cares about the audio.
		let mut audio_tracks = 0_u32;
		let mut ar_id1 = 0_u32;
		let mut ar_id2 = 0_u32;
		let mut last_end = None;
		for t in physical().filter(|t| t.is_audio()) {
			let start = t.start_lsn_sig() as u32;
			audio_tracks += 1;
			ar_id1 = ar_id1.wrapping_add(start);
			ar_id2 = ar_id2.wrapping_add(
				start.max(1).wrapping_mul(u32::from(t.cd_track_number()))
			);
			last_end.replace(t.end_lsn_sig());
		}

		let last = (last_end? + 1) as u32;
		ar_id1 = ar_id1.wrapping_add(last);
		ar_id2 = ar_id2.wrapping_add(last.wrapping_mul(audio_tracks + 1));

		// CDDB counts everything.
		let mut n = 0_u32;
		let mut count = 0_u32;
		let mut first = None;
		for t in physical() {
			let lba = lsn_to_lba(t.start_lsn_sig());
			first.get_or_insert(lba);
			n += digit_sum(lba / SECTORS_PER_SECOND);
			count += 1;
		}
		let first = first?;
		let leadout = lsn_to_lba(disc_end + 1);
		let t = (leadout / SECTORS_PER_SECOND).saturating_sub(first / SECTORS_PER_SECOND);
		let cddb_id = ((n % 255) << 24) | (t << 8) | (count & 0xFF);

		Some(Self {
			audio_tracks: audio_tracks.min(255) as u8,
			ar_id1,
			ar_id2,
			cddb_id,
			musicbrainz_id: musicbrainz_id(tracks, leadout),
		})
	}

	#[must_use]
	/// # Audio Track Count.
	pub const fn audio_tracks(&self) -> u8 { self.audio_tracks }

	#[must_use]
	/// # AccurateRip Disc ID #1.
	pub const fn accuraterip_id1(&self) -> u32 { self.ar_id1 }

	#[must_use]
	/// # AccurateRip Disc ID #2.
	pub const fn accuraterip_id2(&self) -> u32 { self.ar_id2 }

	#[must_use]
	/// # CDDB ID.
	pub const fn cddb_id(&self) -> u32 { self.cddb_id }

	#[must_use]
	/// # MusicBrainz ID.
	///
	/// This is only available for layouts `cdtoc` can represent.
	pub fn musicbrainz_id(&self) -> Option<&str> { self.musicbrainz_id.as_deref() }

	#[must_use]
	/// # AccurateRip Checksum URL.
	///
	/// The directory portion is made from the last three hex digits of the
	/// first ID, in reverse order.
	pub fn accuraterip_url(&self) -> String {
		format!(
			"{ACCURATERIP_BASE}/{:x}/{:x}/{:x}/dBAR-{self}.bin",
			self.ar_id1 & 0xF,
			(self.ar_id1 >> 4) & 0xF,
			(self.ar_id1 >> 8) & 0xF,
		)
	}
}



/// # Digit Sum.
const fn digit_sum(mut n: u32) -> u32 {
	let mut out = 0;
	while n != 0 {
		out += n % 10;
		n /= 10;
	}
	out
}

#[allow(clippy::cast_sign_loss)]
/// # LSN to LBA.
const fn lsn_to_lba(lsn: i32) -> u32 {
	(lsn + CD_LEADIN as i32) as u32
}

/// # MusicBrainz ID.
///
/// Rebuild the physical table of contents and let `cdtoc` handle the rest.
fn musicbrainz_id(tracks: &[Track], leadout: u32) -> Option<String> {
	let mut audio = Vec::new();
	let mut data = None;
	for t in tracks.iter().filter(|t| ! t.is_synthetic()) {
		let lba = lsn_to_lba(t.start_lsn_sig());
		if t.is_data() { data.replace(lba); }
		else { audio.push(lba); }
	}

	let toc = Toc::from_parts(audio, data, leadout).ok()?;
	Some(toc.musicbrainz_id().to_string())
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		Disc,
		TocEntry,
	};

	const CDTOC: &str = "4+96+2D2B+6256+B327+D84A";

	#[test]
	fn t_fingerprint() {
		let toc = Toc::from_cdtoc(CDTOC).expect("Invalid CDTOC.");
		let disc = Disc::from_cdtoc(&toc, &[]).expect("Disc failed.");
		let fp = disc.fingerprint().expect("Missing fingerprint.");

		assert_eq!(fp.audio_tracks(), 4);
		assert_eq!(fp.accuraterip_id1(), 0x0002_189A);
		assert_eq!(fp.accuraterip_id2(), 0x0008_7F33);
		assert_eq!(fp.cddb_id(), 0x1F02_E004);
		assert_eq!(fp.musicbrainz_id(), Some("nljDXdC8B_pDwbdY1vZJvdrAZI4-"));
		assert_eq!(fp.to_string(), "004-0002189a-00087f33-1f02e004");
		assert_eq!(
			fp.accuraterip_url(),
			"http://www.accuraterip.com/accuraterip/a/9/8/dBAR-004-0002189a-00087f33-1f02e004.bin",
		);

		// Cross-check with cdtoc's own implementations.
		assert_eq!(fp.to_string(), toc.accuraterip_id().to_string(), "AccurateRip ID mismatch.");
		assert_eq!(format!("{:08x}", fp.cddb_id()), toc.cddb_id().to_string(), "CDDB ID mismatch.");
	}

	#[test]
	fn t_fingerprint_extra() {
		// A CD-Extra disc, compared against cdtoc.
		let toc = Toc::from_parts(vec![150, 11_563, 25_174], Some(45_863), 55_370)
			.expect("Invalid TOC.");
		let disc = Disc::from_cdtoc(&toc, &[]).expect("Disc failed.");
		let fp = disc.fingerprint().expect("Missing fingerprint.");
		assert_eq!(fp.audio_tracks(), 3);
		assert_eq!(fp.to_string(), toc.accuraterip_id().to_string(), "AccurateRip ID mismatch.");
		assert_eq!(
			fp.musicbrainz_id(),
			Some(toc.musicbrainz_id().to_string().as_str()),
			"MusicBrainz ID mismatch.",
		);
	}

	#[test]
	fn t_fingerprint_stable() {
		// Pregap handling must not change anything.
		let entries = [
			TocEntry::new(1, 0, 11_412),
			TocEntry::new(2, 11_413, 25_023).with_pregap(11_300),
			TocEntry::new(3, 25_024, 45_712).with_pregap(24_900),
			TocEntry::new(4, 45_713, 55_219),
		];
		let base = Disc::new(&entries, 0, 55_219)
			.expect("Disc failed.")
			.fingerprint()
			.expect("Missing fingerprint.");

		for action in [
			crate::PregapAction::Drop,
			crate::PregapAction::Merge,
			crate::PregapAction::Split,
		] {
			let opts = crate::RipOptions::default()
				.with_pregap(2, action)
				.with_pregap(3, action)
				.with_offset(crate::ReadOffset::try_from(667_i16).expect("Bad offset."));
			let mut disc = Disc::new(&entries, 0, 55_219).expect("Disc failed.");
			disc.resolve(&opts).expect("Resolve failed.");
			assert_eq!(
				disc.fingerprint().as_ref(),
				Some(&base),
				"Fingerprint changed with {action} pregaps.",
			);
		}
	}
}
