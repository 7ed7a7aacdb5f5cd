/*!
# CD Verify: CLI
*/

use argyle::Argument;
use cdverify_core::{
	CdVerifyError,
	OutputFormat,
	PregapAction,
	ReadOffset,
	RipOptions,
};
use dactyl::traits::{
	BytesToSigned,
	BytesToUnsigned,
};
use std::path::PathBuf;



#[derive(Debug)]
/// # Parsed Settings.
pub(super) struct Settings {
	/// # Rip Options.
	pub(super) opts: RipOptions,

	/// # CDTOC.
	pub(super) toc: String,

	/// # Drive-Signalled Pregaps.
	pub(super) gaps: Vec<(u8, i32)>,

	/// # Disc Image.
	pub(super) image: Option<PathBuf>,

	/// # Output Directory.
	pub(super) dir: PathBuf,

	/// # Output Formats.
	pub(super) formats: Vec<OutputFormat>,

	/// # Discover Offset?
	pub(super) find_offset: bool,

	/// # Skip Rip?
	pub(super) no_rip: bool,
}



/// # Parse Options.
pub(super) fn parse() -> Result<Settings, CdVerifyError> {
	let args = argyle::args()
		.with_keywords(include!(concat!(env!("OUT_DIR"), "/argyle.rs")));

	let mut opts = RipOptions::default();
	let mut toc = None;
	let mut gaps = Vec::new();
	let mut image = None;
	let mut dir = None;
	let mut formats = Vec::new();
	let mut find_offset = false;
	let mut no_rip = false;
	for arg in args {
		match arg {
			Argument::Key("--find-offset") => { find_offset = true; },
			Argument::Key("-h" | "--help") => return Err(CdVerifyError::PrintHelp),
			Argument::Key("--no-accuraterip") => { opts = opts.with_accuraterip(false); },
			Argument::Key("--no-cache") => { opts = opts.with_cache(false); },
			Argument::Key("--no-rip") => { no_rip = true; },
			Argument::Key("--overread") => { opts = opts.with_overread(true); },
			Argument::Key("--raw") => { push_format(&mut formats, OutputFormat::Raw); },
			Argument::Key("-v" | "--verbose") => { opts = opts.with_verbose(true); },
			Argument::Key("-V" | "--version") => return Err(CdVerifyError::PrintVersion),
			Argument::Key("--wav") => { push_format(&mut formats, OutputFormat::Wav); },

			Argument::KeyWithValue("--confidence", s) => {
				let s = u8::btou(s.trim().as_bytes())
					.ok_or(CdVerifyError::CliParse("--confidence"))?;
				opts = opts.with_confidence(s);
			},
			Argument::KeyWithValue("-d" | "--dir", s) => { dir.replace(PathBuf::from(s)); },
			Argument::KeyWithValue("--gap", s) => {
				gaps.push(parse_gap(s.as_bytes())?);
			},
			Argument::KeyWithValue("-i" | "--image", s) => { image.replace(PathBuf::from(s)); },
			Argument::KeyWithValue("-o" | "--offset", s) => {
				let s = ReadOffset::try_from(s.as_str())
					.map_err(|_| CdVerifyError::CliParse("-o/--offset"))?;
				opts = opts.with_offset(s);
			},
			Argument::KeyWithValue("--pregap", s) => {
				let (track, action) = parse_pregap(&s)?;
				opts = opts.with_pregap(track, action);
			},
			Argument::KeyWithValue("--toc", s) => { toc.replace(s); },

			_ => {},
		}
	}

	let toc = toc.ok_or(CdVerifyError::CliParse("--toc"))?;
	if find_offset && image.is_none() {
		return Err(CdVerifyError::CliArg("--find-offset requires an -i/--image".to_owned()));
	}
	if formats.is_empty() { formats.push(OutputFormat::Wav); }

	Ok(Settings {
		opts,
		toc,
		gaps,
		image,
		dir: dir.unwrap_or_else(|| PathBuf::from(".")),
		formats,
		find_offset,
		no_rip,
	})
}

/// # Push Format.
///
/// Add the format to the list if it isn't already there.
fn push_format(formats: &mut Vec<OutputFormat>, format: OutputFormat) {
	if ! formats.contains(&format) { formats.push(format); }
}

/// # Parse Gap.
///
/// Gaps are specified as `<NUM>:<LSN>`.
fn parse_gap(v: &[u8]) -> Result<(u8, i32), CdVerifyError> {
	let (a, b) = split_pair(v).ok_or(CdVerifyError::CliParse("--gap"))?;
	let a = u8::btou(a).ok_or(CdVerifyError::CliParse("--gap"))?;
	let b = i32::btoi(b).ok_or(CdVerifyError::CliParse("--gap"))?;
	Ok((a, b))
}

/// # Parse Pregap Action.
///
/// Actions are specified as `<NUM>:<ACTION>`.
fn parse_pregap(v: &str) -> Result<(u8, PregapAction), CdVerifyError> {
	let (a, b) = v.split_once(':').ok_or(CdVerifyError::CliParse("--pregap"))?;
	let a = u8::btou(a.trim().as_bytes()).ok_or(CdVerifyError::CliParse("--pregap"))?;
	let b = PregapAction::try_from(b.trim())?;
	Ok((a, b))
}

/// # Split Pair.
///
/// Split a `<A>:<B>` value, trimming both sides, neither of which may be
/// empty.
fn split_pair(v: &[u8]) -> Option<(&[u8], &[u8])> {
	let pos = v.iter().position(|b| b':'.eq(b))?;
	let a = v[..pos].trim_ascii();
	let b = v[pos + 1..].trim_ascii();
	if a.is_empty() || b.is_empty() { None }
	else { Some((a, b)) }
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_parse_gap() {
		assert_eq!(parse_gap(b"2:11300"), Ok((2, 11_300)));
		assert_eq!(parse_gap(b" 12 : -3 "), Ok((12, -3)));
		for bad in [&b"2"[..], b":5", b"2:", b"x:5", b"300:5"] {
			assert!(parse_gap(bad).is_err(), "Bad gap accepted: {:?}", String::from_utf8_lossy(bad));
		}
	}

	#[test]
	fn t_parse_pregap() {
		assert_eq!(parse_pregap("3:merge"), Ok((3, PregapAction::Merge)));
		assert_eq!(parse_pregap("10: split"), Ok((10, PregapAction::Split)));
		assert!(parse_pregap("3").is_err(), "Missing action accepted.");
		assert!(parse_pregap("3:nope").is_err(), "Bad action accepted.");
	}

	#[test]
	fn t_push_format() {
		let mut formats = Vec::new();
		push_format(&mut formats, OutputFormat::Raw);
		push_format(&mut formats, OutputFormat::Wav);
		push_format(&mut formats, OutputFormat::Raw);
		assert_eq!(formats, [OutputFormat::Raw, OutputFormat::Wav]);
	}
}
