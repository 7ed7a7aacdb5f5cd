/*!
# CD Verify: Tracks
*/

use crate::{
	AccurateRipEntry,
	AccurateRipStatus,
	BYTES_PER_SECTOR,
	CdVerifyError,
	Checksums,
	MAX_TRACK_NUMBER,
	OutputFormat,
	SAMPLES_PER_SECTOR,
};
use std::fmt;



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Pregap Action.
///
/// This is what to do with a track's signalled pregap during layout
/// resolution.
pub enum PregapAction {
	#[default]
	/// # Leave it with the previous track.
	///
	/// The first track has no previous track, so for it this behaves like
	/// [`PregapAction::Drop`].
	Default,

	/// # Drop it entirely.
	Drop,

	/// # Merge it into the start of this track.
	Merge,

	/// # Rip it as its own track.
	Split,
}

impl fmt::Display for PregapAction {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl TryFrom<&str> for PregapAction {
	type Error = CdVerifyError;
	fn try_from(src: &str) -> Result<Self, Self::Error> {
		match src.trim().to_ascii_lowercase().as_str() {
			"default" => Ok(Self::Default),
			"drop" => Ok(Self::Drop),
			"merge" => Ok(Self::Merge),
			"split" => Ok(Self::Split),
			_ => Err(CdVerifyError::PregapAction),
		}
	}
}

impl PregapAction {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Default => "default",
			Self::Drop => "drop",
			Self::Merge => "merge",
			Self::Split => "split",
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Table of Contents Entry.
///
/// This is the raw, signalled description of one physical track, prior to
/// any layout resolution. All positions are LSNs, i.e. sector zero is the
/// first sector after the lead-in.
///
/// ```
/// use cdverify_core::TocEntry;
///
/// let entry = TocEntry::new(2, 11_413, 25_214).with_pregap(11_250);
/// assert_eq!(entry.number(), 2);
/// assert_eq!(entry.pregap(), Some(11_250));
/// assert!(! entry.is_data());
/// ```
pub struct TocEntry {
	number: u8,
	start: i32,
	end: i32,
	pregap: Option<i32>,
	data: bool,
	preemphasis: bool,
}

impl TocEntry {
	#[must_use]
	/// # New (Audio) Entry.
	///
	/// The range is inclusive.
	pub const fn new(number: u8, start: i32, end: i32) -> Self {
		Self {
			number,
			start,
			end,
			pregap: None,
			data: false,
			preemphasis: false,
		}
	}

	#[must_use]
	/// # With Data Flag.
	pub const fn with_data(self, data: bool) -> Self {
		Self { data, ..self }
	}

	#[must_use]
	/// # With Pregap.
	///
	/// Set the sector at which the drive says this track's pregap begins.
	pub const fn with_pregap(self, lsn: i32) -> Self {
		Self { pregap: Some(lsn), ..self }
	}

	#[must_use]
	/// # With Pre-emphasis Flag.
	pub const fn with_preemphasis(self, preemphasis: bool) -> Self {
		Self { preemphasis, ..self }
	}

	#[must_use]
	/// # Number.
	pub const fn number(&self) -> u8 { self.number }

	#[must_use]
	/// # Start LSN.
	pub const fn start(&self) -> i32 { self.start }

	#[must_use]
	/// # End LSN.
	pub const fn end(&self) -> i32 { self.end }

	#[must_use]
	/// # Pregap LSN.
	pub const fn pregap(&self) -> Option<i32> { self.pregap }

	#[must_use]
	/// # Is Data?
	pub const fn is_data(&self) -> bool { self.data }

	#[must_use]
	/// # Has Pre-emphasis?
	pub const fn preemphasis(&self) -> bool { self.preemphasis }

	/// # Validate.
	///
	/// Make sure the entry is sane within the given disc bounds.
	pub(crate) fn validate(&self, disc_start: i32, disc_end: i32)
	-> Result<(), CdVerifyError> {
		if self.number == 0 || MAX_TRACK_NUMBER < self.number {
			return Err(CdVerifyError::TrackNumber(self.number));
		}
		if self.end < self.start || self.start < disc_start || disc_end < self.end {
			return Err(CdVerifyError::TrackLsn(self.number));
		}
		if let Some(pregap) = self.pregap {
			if self.start <= pregap || pregap < disc_start {
				return Err(CdVerifyError::Pregap(self.number));
			}
		}
		Ok(())
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Read Window.
///
/// This describes the raw sectors that must be read to recover a track's
/// data once the drive's read offset is accounted for.
///
/// The offset rarely lines up with a sector boundary, so the window usually
/// covers one sector more than the track itself; the first
/// [`ReadWindow::partial_bytes`] bytes of the first sector and the remainder
/// of the last sector belong to the neighbors.
///
/// Reads falling before the disc start or after the disc end can't be made
/// (unless overreading is permitted), so those sectors are counted separately
/// and replaced with silence.
pub struct ReadWindow {
	pub(crate) first: i32,
	pub(crate) last: i32,
	pub(crate) partial_bytes: u16,
	pub(crate) frames_before_disc_start: u32,
	pub(crate) frames_after_disc_end: u32,
}

impl ReadWindow {
	#[must_use]
	/// # First Sector.
	pub const fn first_sector(&self) -> i32 { self.first }

	#[must_use]
	/// # Last Sector (Inclusive).
	pub const fn last_sector(&self) -> i32 { self.last }

	#[must_use]
	#[allow(clippy::cast_sign_loss)]
	/// # Total Sectors.
	pub const fn sectors(&self) -> u32 {
		if self.last < self.first { 0 }
		else { (self.last - self.first) as u32 + 1 }
	}

	#[must_use]
	/// # Partial Byte Offset.
	///
	/// The number of leading bytes in the first sector to discard.
	pub const fn partial_bytes(&self) -> u16 { self.partial_bytes }

	#[must_use]
	/// # Silent Frames Before Disc Start.
	pub const fn frames_before_disc_start(&self) -> u32 { self.frames_before_disc_start }

	#[must_use]
	/// # Silent Frames After Disc End.
	pub const fn frames_after_disc_end(&self) -> u32 { self.frames_after_disc_end }

	#[must_use]
	#[allow(clippy::cast_possible_wrap)]
	/// # Is Silent?
	///
	/// Returns `true` if the sector falls within the window but outside the
	/// readable disc area.
	pub const fn is_silent(&self, lsn: i32) -> bool {
		lsn < self.first + self.frames_before_disc_start as i32 ||
		self.last - (self.frames_after_disc_end as i32) < lsn
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Track.
///
/// A single resolved audio or data track, along with everything learned
/// about it during a rip.
///
/// Tracks are created from [`TocEntry`] records and owned by the
/// [`Disc`](crate::Disc); the layout resolver and checksum engine update them
/// in place.
pub struct Track {
	pub(crate) number: u8,
	pub(crate) cd_track_number: u8,
	pub(crate) index: usize,

	pub(crate) start_lsn: i32,
	pub(crate) end_lsn: i32,
	pub(crate) start_lsn_sig: i32,
	pub(crate) end_lsn_sig: i32,

	pub(crate) pregap_lsn: Option<i32>,
	pub(crate) dropped_pregap_start: Option<i32>,
	pub(crate) merged_pregap_end: Option<i32>,
	pub(crate) synthetic: bool,

	pub(crate) window: ReadWindow,

	pub(crate) data: bool,
	pub(crate) preemphasis: bool,

	pub(crate) checksums: Option<Checksums>,
	pub(crate) bad_sectors: u32,

	pub(crate) ar_status: AccurateRipStatus,
	pub(crate) ar_entries: Vec<AccurateRipEntry>,
	pub(crate) ar_max_confidence: u8,

	pub(crate) prev: Option<usize>,
	pub(crate) next: Option<usize>,
}

impl From<&TocEntry> for Track {
	fn from(src: &TocEntry) -> Self {
		Self {
			number: src.number,
			cd_track_number: src.number,
			index: 0,

			start_lsn: src.start,
			end_lsn: src.end,
			start_lsn_sig: src.start,
			end_lsn_sig: src.end,

			pregap_lsn: src.pregap,
			dropped_pregap_start: None,
			merged_pregap_end: None,
			synthetic: false,

			window: ReadWindow::default(),

			data: src.data,
			preemphasis: src.preemphasis,

			checksums: None,
			bad_sectors: 0,

			ar_status: AccurateRipStatus::NotQueried,
			ar_entries: Vec::new(),
			ar_max_confidence: 0,

			prev: None,
			next: None,
		}
	}
}

/// ## Identity.
impl Track {
	#[must_use]
	/// # Number.
	///
	/// This is the track number as it will be presented, which can differ
	/// from [`Track::cd_track_number`] when pregaps are split off into tracks
	/// of their own.
	pub const fn number(&self) -> u8 { self.number }

	#[must_use]
	/// # Physical Track Number.
	pub const fn cd_track_number(&self) -> u8 { self.cd_track_number }

	#[must_use]
	/// # Index.
	///
	/// The one-based position of the track within the resolved layout.
	pub const fn index(&self) -> usize { self.index }

	#[must_use]
	/// # Is Data?
	pub const fn is_data(&self) -> bool { self.data }

	#[must_use]
	/// # Is Audio?
	pub const fn is_audio(&self) -> bool { ! self.data }

	#[must_use]
	/// # Is Synthetic?
	///
	/// Returns `true` for tracks materialized from a split pregap.
	pub const fn is_synthetic(&self) -> bool { self.synthetic }

	#[must_use]
	/// # Has Pre-emphasis?
	pub const fn preemphasis(&self) -> bool { self.preemphasis }

	#[must_use]
	/// # Previous Track Position.
	///
	/// This is the zero-based position of the previous track in
	/// [`Disc::tracks`](crate::Disc::tracks), if any.
	pub const fn prev(&self) -> Option<usize> { self.prev }

	#[must_use]
	/// # Next Track Position.
	pub const fn next(&self) -> Option<usize> { self.next }

	#[must_use]
	/// # File Name.
	///
	/// Return the file name an encoded copy of the track should be saved as.
	pub fn file_name(&self, format: OutputFormat) -> String {
		let ext =
			if self.data { "bin" }
			else { format.extension() };
		format!("track-{:02}.{ext}", self.number)
	}
}

/// ## Boundaries.
impl Track {
	#[must_use]
	/// # Start LSN.
	pub const fn start_lsn(&self) -> i32 { self.start_lsn }

	#[must_use]
	/// # End LSN (Inclusive).
	pub const fn end_lsn(&self) -> i32 { self.end_lsn }

	#[must_use]
	/// # Signalled Start LSN.
	pub const fn start_lsn_sig(&self) -> i32 { self.start_lsn_sig }

	#[must_use]
	/// # Signalled End LSN.
	pub const fn end_lsn_sig(&self) -> i32 { self.end_lsn_sig }

	#[must_use]
	#[allow(clippy::cast_sign_loss)]
	/// # Total Sectors.
	pub const fn sectors(&self) -> u32 {
		if self.end_lsn < self.start_lsn { 0 }
		else { (self.end_lsn - self.start_lsn) as u32 + 1 }
	}

	#[must_use]
	/// # Total Samples.
	pub const fn samples(&self) -> u64 {
		self.sectors() as u64 * SAMPLES_PER_SECTOR as u64
	}

	#[must_use]
	/// # Total Bytes.
	pub const fn bytes(&self) -> u64 {
		self.sectors() as u64 * BYTES_PER_SECTOR as u64
	}

	#[must_use]
	/// # Read Window.
	pub const fn read_window(&self) -> ReadWindow { self.window }
}

/// ## Pregaps.
impl Track {
	#[must_use]
	/// # Pregap LSN.
	///
	/// The start of the signalled pregap, if any and still pending.
	pub const fn pregap_lsn(&self) -> Option<i32> { self.pregap_lsn }

	#[must_use]
	/// # Dropped Pregap Start.
	pub const fn dropped_pregap_start(&self) -> Option<i32> { self.dropped_pregap_start }

	#[must_use]
	/// # Merged Pregap End.
	///
	/// When a pregap is merged, this holds the track's original start, i.e.
	/// the sector right after the pregap.
	pub const fn merged_pregap_end(&self) -> Option<i32> { self.merged_pregap_end }

	#[must_use]
	/// # Pregap Left With Previous Track?
	///
	/// Returns `true` if the track has a pregap that was neither dropped nor
	/// merged, meaning the sectors live at the end of the previous track.
	pub const fn has_default_pregap(&self) -> bool {
		self.pregap_lsn.is_some() &&
		self.prev.is_some() &&
		self.dropped_pregap_start.is_none() &&
		self.merged_pregap_end.is_none()
	}
}

/// ## Rip Results.
impl Track {
	#[must_use]
	/// # Checksums.
	///
	/// This will be `None` until the track has been ripped.
	pub const fn checksums(&self) -> Option<Checksums> { self.checksums }

	#[must_use]
	/// # Bad Sectors.
	///
	/// The number of sectors that could not be read and were replaced with
	/// silence.
	pub const fn bad_sectors(&self) -> u32 { self.bad_sectors }

	#[must_use]
	/// # AccurateRip Status.
	pub const fn ar_status(&self) -> AccurateRipStatus { self.ar_status }

	#[must_use]
	/// # AccurateRip Entries.
	///
	/// These are sorted by descending confidence.
	pub fn ar_entries(&self) -> &[AccurateRipEntry] { &self.ar_entries }

	#[must_use]
	/// # Maximum AccurateRip Confidence.
	pub const fn ar_max_confidence(&self) -> u8 { self.ar_max_confidence }

	#[must_use]
	/// # AccurateRip Confidence.
	///
	/// Return the confidence of the first database entry matching the
	/// checksum, or `None` if there isn't one. When `use_450` is `true`, the
	/// value is compared against the 450 checkpoint instead of the full-track
	/// checksum.
	pub fn ar_confidence(&self, checksum: u32, use_450: bool) -> Option<u8> {
		if ! self.ar_status.is_found() { return None; }
		self.ar_entries.iter()
			.find(|e|
				if use_450 { e.checksum_450() == checksum }
				else { e.checksum() == checksum }
			)
			.map(AccurateRipEntry::confidence)
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_pregap_action() {
		for v in [
			PregapAction::Default,
			PregapAction::Drop,
			PregapAction::Merge,
			PregapAction::Split,
		] {
			assert_eq!(PregapAction::try_from(v.as_str()), Ok(v), "Pregap action {v} did not round trip.");
		}

		assert_eq!(PregapAction::try_from(" MERGE "), Ok(PregapAction::Merge));
		assert!(PregapAction::try_from("keep").is_err(), "Unknown actions should fail.");
	}

	#[test]
	fn t_toc_entry_validate() {
		assert!(TocEntry::new(1, 0, 100).validate(0, 200).is_ok());
		assert!(TocEntry::new(2, 50, 100).with_pregap(30).validate(0, 200).is_ok());

		assert_eq!(TocEntry::new(0, 0, 100).validate(0, 200), Err(CdVerifyError::TrackNumber(0)));
		assert_eq!(TocEntry::new(100, 0, 100).validate(0, 200), Err(CdVerifyError::TrackNumber(100)));
		assert_eq!(TocEntry::new(1, 100, 50).validate(0, 200), Err(CdVerifyError::TrackLsn(1)));
		assert_eq!(TocEntry::new(1, 0, 300).validate(0, 200), Err(CdVerifyError::TrackLsn(1)));
		assert_eq!(
			TocEntry::new(3, 50, 100).with_pregap(50).validate(0, 200),
			Err(CdVerifyError::Pregap(3)),
		);
	}

	#[test]
	fn t_read_window() {
		let window = ReadWindow {
			first: -2,
			last: 10,
			partial_bytes: 0,
			frames_before_disc_start: 2,
			frames_after_disc_end: 1,
		};
		assert_eq!(window.sectors(), 13);
		assert!(window.is_silent(-2));
		assert!(window.is_silent(-1));
		assert!(! window.is_silent(0));
		assert!(! window.is_silent(9));
		assert!(window.is_silent(10));
	}

	#[test]
	fn t_track_sizes() {
		let track = Track::from(&TocEntry::new(1, 0, 99));
		assert_eq!(track.sectors(), 100);
		assert_eq!(track.samples(), 58_800);
		assert_eq!(track.bytes(), 235_200);
		assert_eq!(track.file_name(OutputFormat::Wav), "track-01.wav");

		let track = Track::from(&TocEntry::new(12, 0, 99).with_data(true));
		assert_eq!(track.file_name(OutputFormat::Wav), "track-12.bin");
	}
}
