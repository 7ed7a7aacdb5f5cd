/*!
# CD Verify: Cue Sheets
*/

use crate::{
	Disc,
	OutputFormat,
	Track,
};
use std::fmt::Write;



/// # Frames Per Second.
const FRAMES_PER_SECOND: u32 = 75;



/// # Cue Sheet.
///
/// Render a cue sheet for the disc's (resolved) layout, one `FILE` per track.
///
/// Pregaps left with the previous track are written as that track's
/// `INDEX 00`; dropped pregaps become `PREGAP` entries; merged pregaps get an
/// `INDEX 00` at the start of the track's own file.
pub(crate) fn cue_sheet(disc: &Disc, format: OutputFormat) -> String {
	let mut out = String::new();
	if let Some(fp) = disc.fingerprint() {
		if let Some(mb) = fp.musicbrainz_id() {
			let _res = writeln!(out, "REM MUSICBRAINZ_ID \"{mb}\"");
		}
		let _res = writeln!(out, "REM DISCID \"{:08X}\"", fp.cddb_id());
	}

	let tracks = disc.tracks();
	for t in tracks {
		let _res = write_track(&mut out, t, tracks, format);
	}

	out
}

/// # Write Track.
fn write_track(out: &mut String, t: &Track, tracks: &[Track], format: OutputFormat)
-> std::fmt::Result {
	let kind = if t.is_data() { "MODE1/2352" } else { "AUDIO" };

	// The pregap lives at the end of the previous file.
	let prev = t.prev().and_then(|idx| tracks.get(idx));
	if let (true, Some(pregap), Some(prev)) = (t.has_default_pregap(), t.pregap_lsn(), prev) {
		writeln!(out, "  TRACK {:02} {kind}", t.number())?;
		if t.preemphasis() { out.push_str("    FLAGS PRE\n"); }
		writeln!(out, "    INDEX 00 {}", Msf(pregap.abs_diff(prev.start_lsn())))?;
		writeln!(out, "FILE \"{}\" {}", t.file_name(format), file_kind(t, format))?;
		writeln!(out, "    INDEX 01 {}", Msf(0))?;
		return Ok(());
	}

	writeln!(out, "FILE \"{}\" {}", t.file_name(format), file_kind(t, format))?;
	writeln!(out, "  TRACK {:02} {kind}", t.number())?;
	if t.preemphasis() { out.push_str("    FLAGS PRE\n"); }

	if let Some(dropped) = t.dropped_pregap_start() {
		writeln!(out, "    PREGAP {}", Msf(t.start_lsn().abs_diff(dropped)))?;
		writeln!(out, "    INDEX 01 {}", Msf(0))
	}
	else if let Some(merged) = t.merged_pregap_end() {
		writeln!(out, "    INDEX 00 {}", Msf(0))?;
		writeln!(out, "    INDEX 01 {}", Msf(merged.abs_diff(t.start_lsn())))
	}
	else {
		writeln!(out, "    INDEX 01 {}", Msf(0))
	}
}

/// # File Kind.
const fn file_kind(t: &Track, format: OutputFormat) -> &'static str {
	if t.is_data() { "BINARY" }
	else {
		match format {
			OutputFormat::Wav => "WAVE",
			OutputFormat::Raw => "BINARY",
		}
	}
}



#[derive(Debug, Clone, Copy)]
/// # Minutes, Seconds, Frames.
///
/// A sector count formatted as `mm:ss:ff`.
struct Msf(u32);

impl std::fmt::Display for Msf {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let (secs, frames) = (self.0 / FRAMES_PER_SECOND, self.0 % FRAMES_PER_SECOND);
		write!(f, "{:02}:{:02}:{frames:02}", secs / 60, secs % 60)
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		PregapAction,
		RipOptions,
		TocEntry,
	};

	const ENTRIES: [TocEntry; 3] = [
		TocEntry::new(1, 0, 9_999),
		TocEntry::new(2, 10_000, 19_999).with_pregap(9_850).with_preemphasis(true),
		TocEntry::new(3, 20_000, 29_999),
	];

	/// # Render.
	fn render(action: PregapAction) -> String {
		let mut disc = Disc::new(&ENTRIES, 0, 29_999).expect("Disc failed.");
		disc.resolve(&RipOptions::default().with_pregap(2, action)).expect("Resolve failed.");
		disc.cue_sheet(OutputFormat::Wav)
	}

	#[test]
	fn t_msf() {
		assert_eq!(Msf(0).to_string(), "00:00:00");
		assert_eq!(Msf(150).to_string(), "00:02:00");
		assert_eq!(Msf(4_500 + 76).to_string(), "01:01:01");
	}

	#[test]
	fn t_cue_default() {
		let cue = render(PregapAction::Default);
		assert!(cue.starts_with("REM MUSICBRAINZ_ID \""), "Missing MusicBrainz ID.");
		assert!(cue.contains("\nREM DISCID \""), "Missing disc ID.");
		assert!(cue.ends_with(
			"FILE \"track-01.wav\" WAVE\n  TRACK 01 AUDIO\n    INDEX 01 00:00:00\n  TRACK 02 AUDIO\n    FLAGS PRE\n    INDEX 00 02:11:25\nFILE \"track-02.wav\" WAVE\n    INDEX 01 00:00:00\nFILE \"track-03.wav\" WAVE\n  TRACK 03 AUDIO\n    INDEX 01 00:00:00\n"
		), "Unexpected cue:\n{cue}");
	}

	#[test]
	fn t_cue_drop_merge() {
		let cue = render(PregapAction::Drop);
		assert!(cue.contains(
			"FILE \"track-02.wav\" WAVE\n  TRACK 02 AUDIO\n    FLAGS PRE\n    PREGAP 00:02:00\n    INDEX 01 00:00:00\n"
		), "Unexpected cue:\n{cue}");

		let cue = render(PregapAction::Merge);
		assert!(cue.contains(
			"FILE \"track-02.wav\" WAVE\n  TRACK 02 AUDIO\n    FLAGS PRE\n    INDEX 00 00:00:00\n    INDEX 01 00:02:00\n"
		), "Unexpected cue:\n{cue}");
	}

	#[test]
	fn t_cue_split() {
		let cue = render(PregapAction::Split);
		assert!(cue.contains(
			"FILE \"track-02.wav\" WAVE\n  TRACK 02 AUDIO\n    FLAGS PRE\n    INDEX 01 00:00:00\nFILE \"track-03.wav\" WAVE\n  TRACK 03 AUDIO\n"
		), "Unexpected cue:\n{cue}");
		assert!(cue.contains("FILE \"track-04.wav\" WAVE\n  TRACK 04 AUDIO\n"), "Missing renumbered track.");
	}
}
