/*!
# CD Verify: Errors
*/

use cdtoc::TocError;
use fyi_msg::Msg;
use std::{
	error::Error,
	fmt,
};



#[cfg(feature = "bin")]
/// # Help Text.
const HELP: &str = concat!(r#"
    _______
   /  ___  \   CD Verify v"#, env!("CARGO_PKG_VERSION"), r#"
  |  /   \  |  Layout resolution, AccurateRip
  |  \___/  |  verification, and offset discovery
   \_______/   for audio CD rips.

USAGE:
    cdverify [OPTIONS] --toc <CDTOC>

DISC SETTINGS:
        --toc <CDTOC> The disc's table of contents, formatted as a CDTOC
                      string, like: 4+96+2D2B+6256+B327+D84A
        --gap <NUM>:<LSN>
                      A drive-reported pregap for track <NUM>, starting at
                      sector <LSN>. Repeat for each track with a pregap.
        --pregap <NUM>:<ACTION>
                      What to do with track <NUM>'s pregap: default, drop,
                      merge, or split. Repeat for each track as needed.
                      [default: default]

RIP SETTINGS:
    -i, --image <PATH>
                      A raw image of the disc to rip and verify, 2352 bytes
                      per sector, starting at LSN zero.
    -o, --offset <SAMPLES>
                      The AccurateRip sample read offset of the drive that
                      produced the image. [default: 0; range: ±5880]
        --find-offset Discover the read offset by correlating the image
                      with AccurateRip data before ripping.
        --overread    Read into the lead-in/lead-out when the offset pushes
                      a track past the edge of the disc instead of padding
                      with silence.
    -d, --dir <PATH>  Save encoded tracks and a cue sheet to this directory.
                      [default: the current working directory]
        --raw         Save tracks as raw PCM.
        --wav         Save tracks as WAV. (This is the default if neither
                      format is specified.)

VERIFICATION:
        --confidence <NUM>
                      Consider a track accurately ripped if AccurateRip
                      matches it with a confidence of at least <NUM>.
                      [default: 1; range: 1..=10]
        --no-accuraterip
                      Skip the AccurateRip lookup entirely.
        --no-cache    Re-download AccurateRip data even if it has been
                      cached.

MISCELLANEOUS:
    -h, --help        Print help information to STDOUT and exit.
    -v, --verbose     Print a detailed rip log to STDOUT, so it can e.g. be
                      piped to a file for review, like:
                      cdverify -v … > rip.log
    -V, --version     Print version information to STDOUT and exit.
        --no-rip      Print the disc information to STDERR and exit (without
                      ripping anything).

EARLY EXIT:
    If you don't have time to let a rip finish naturally, press CTRL+C to stop
    it early. The partial tracks will still be saved.
"#);



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Errors.
pub enum CdVerifyError {
	/// # Allocation failure.
	Alloc,

	/// # The layout has already been resolved.
	AlreadyResolved,

	/// # Bug!
	Bug(&'static str),

	/// # Cache directory.
	Cache,

	/// # Cache Path.
	CachePath(String),

	/// # CDTOC passthrough.
	Cdtoc(TocError),

	/// # Queue is empty.
	FifoEmpty,

	/// # Queue is full.
	FifoFull,

	/// # Invalid image.
	Image(String),

	/// # User Abort.
	Killed,

	/// # Invalid disc bounds (leadout).
	Leadout,

	/// # Noop.
	Noop,

	/// # Unable to obtain the number of tracks.
	NumTracks,

	/// # Invalid pregap.
	Pregap(u8),

	/// # Invalid pregap action.
	PregapAction,

	/// # Read Offset.
	ReadOffset,

	/// # Numbers can't be converted to the necessary types.
	RipOverflow,

	/// # Invalid track LSN.
	TrackLsn(u8),

	/// # Invalid track number.
	TrackNumber(u8),

	/// # Writing to disk.
	Write(String),

	#[cfg(feature = "bin")]
	/// # Invalid CLI arg.
	CliArg(String),

	#[cfg(feature = "bin")]
	/// # CLI Parsing failure.
	CliParse(&'static str),

	#[cfg(feature = "bin")]
	/// # Print Help (Not an Error).
	PrintHelp,

	#[cfg(feature = "bin")]
	/// # Print Version (Not an Error).
	PrintVersion,
}

impl Error for CdVerifyError {}

impl From<TocError> for CdVerifyError {
	#[inline]
	fn from(err: TocError) -> Self { Self::Cdtoc(err) }
}

impl From<CdVerifyError> for Msg {
	#[inline]
	fn from(src: CdVerifyError) -> Self { Self::error(src.to_string()) }
}

impl fmt::Display for CdVerifyError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Alloc => f.write_str("Out of memory."),
			Self::AlreadyResolved => f.write_str("The disc layout has already been resolved."),
			Self::Bug(s) => write!(f, "Bug: {s}."),
			Self::Cache => f.write_str("Unable to establish a cache directory."),
			Self::CachePath(s) => write!(f, "Invalid cache path {s}."),
			Self::Cdtoc(s) => write!(f, "{s}"),
			Self::FifoEmpty => f.write_str("The queue is empty."),
			Self::FifoFull => f.write_str("No buffer space available."),
			Self::Image(s) => write!(f, "Unable to read disc image {s}."),
			Self::Killed => f.write_str("User abort."),
			Self::Leadout => f.write_str("Invalid disc bounds."),
			Self::Noop => f.write_str("There's nothing to do!"),
			Self::NumTracks => f.write_str("Invalid track total."),
			Self::Pregap(n) => write!(f, "Invalid pregap for track #{n}."),
			Self::PregapAction => f.write_str("Pregap actions must be one of default, drop, merge, or split."),
			Self::ReadOffset => f.write_str("Invalid read offset."),
			Self::RipOverflow => f.write_str("The numbers are too big for this system architecture."),
			Self::TrackLsn(n) => write!(f, "Invalid sector range for track #{n}."),
			Self::TrackNumber(n) => write!(f, "Invalid track number ({n})."),
			Self::Write(s) => write!(f, "Unable to write to {s}."),

			#[cfg(feature = "bin")]
			Self::CliArg(s) => write!(f, "Invalid CLI option: {s}"),

			#[cfg(feature = "bin")]
			Self::CliParse(s) => write!(f, "Unable to parse {s}."),

			#[cfg(feature = "bin")]
			Self::PrintHelp => f.write_str(HELP),

			#[cfg(feature = "bin")]
			Self::PrintVersion => f.write_str(concat!("CD Verify v", env!("CARGO_PKG_VERSION"))),
		}
	}
}
