/*!
# CD Verify: Library

This library handles the algorithmic side of verifying an audio CD rip:
resolving the disc layout, crunching AccurateRip/EAC checksums as sectors
stream by, matching them against the AccurateRip database, discovering an
unknown drive read offset, and feeding the ripped data to encoder threads.

Actual disc I/O, error-correction, and codecs are left to collaborators; see
[`SectorReader`] and [`TrackEncoder`].
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod abort;
mod accuraterip;
mod cache;
mod chk;
mod cue;
mod disc;
mod error;
mod fifo;
mod find_offset;
mod fingerprint;
mod layout;
mod offset;
mod read;
mod rip;
mod track;

pub use abort::{
	Interrupt,
	KillSwitch,
};
pub use accuraterip::{
	AccurateRipEntry,
	AccurateRipStatus,
	DatabaseLookup,
	DbResponse,
	HttpLookup,
};
pub(crate) use cache::{
	cache_path,
	cache_read,
	CacheWriter,
};
pub use chk::{
	Checksums,
	TrackChecksum,
};
pub use disc::{
	Disc,
	TrackVerdict,
};
pub use error::CdVerifyError;
pub use fifo::{
	Fifo,
	FifoFlags,
};
pub use find_offset::{
	find_offset,
	OffsetSearch,
};
pub use fingerprint::Fingerprint;
pub use layout::LayoutNote;
pub use offset::ReadOffset;
pub use read::{
	ImageReader,
	SectorReader,
};
pub use rip::{
	encode::{
		OutputFormat,
		RawEncoder,
		TrackEncoder,
		WavEncoder,
	},
	opts::RipOptions,
	RipPacket,
	Ripper,
	RipSummary,
};
pub use track::{
	PregapAction,
	ReadWindow,
	TocEntry,
	Track,
};



/// # Cache Base.
///
/// The cache root is thus `CWD/CACHE_BASE`.
pub const CACHE_BASE: &str = "_cdverify";

/// # Cache Scratch.
///
/// The scratch folder for database responses, e.g. `CWD/CACHE_BASE/CACHE_SCRATCH`.
pub(crate) const CACHE_SCRATCH: &str = "scratch";

/// # Bytes Per Sample.
///
/// One sample _pair_, actually: 16-bit left, 16-bit right.
pub const BYTES_PER_SAMPLE: u16 = 4;

/// # Bytes Per Sector.
///
/// This is the number of bytes per sector of _audio_ data.
pub const BYTES_PER_SECTOR: u16 = SAMPLES_PER_SECTOR * BYTES_PER_SAMPLE;

/// # Samples per sector.
pub const SAMPLES_PER_SECTOR: u16 = 588;

/// # Number of lead-in sectors.
///
/// All discs have a 2-second region at the start before any data. LBAs
/// include it, LSNs do not.
pub const CD_LEADIN: u16 = 150;

/// # CD-Extra Session Gap.
///
/// The number of sectors separating the end of the audio session from the
/// start of a trailing data track.
pub const CD_EXTRA_GAP: u16 = 11_400;

/// # Lead-out Label.
///
/// This is used solely for the table of contents printout; e.g. 01 02 03 AA.
pub const CD_LEADOUT_LABEL: &str = "AA";

/// # Maximum Physical Track Number.
///
/// Redbook audio CDs can have at most ninety-nine tracks.
pub const MAX_TRACK_NUMBER: u8 = 99;

/// # Maximum LSN.
///
/// The last addressable sector of the longest possible disc: 99:59:74, less
/// the lead-in.
pub const MAX_LSN: i32 = 449_849;

/// # Null Sector.
///
/// Audio CD silence is typically literally nothing.
pub(crate) const NULL_SECTOR: [u8; BYTES_PER_SECTOR as usize] = [0; BYTES_PER_SECTOR as usize];

/// # Wave Spec.
pub(crate) const WAVE_SPEC: hound::WavSpec = hound::WavSpec {
	channels: 2,
	sample_rate: 44100,
	bits_per_sample: 16,
	sample_format: hound::SampleFormat::Int,
};
