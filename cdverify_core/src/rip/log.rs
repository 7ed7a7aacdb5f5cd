/*!
# CD Verify: Log
*/

use crate::{
	Disc,
	Track,
};
use dactyl::NiceElapsed;
use std::{
	io::Write,
	time::Instant,
};
use utc2k::FmtUtc2k;



/// # Super Basic Log.
///
/// This holds the log-worthy details from an individual track, printing it
/// out en masse once the track is done.
///
/// Doing it this way, versus printing each line in realtime, ensures
/// consistent ordering, otherwise it's a crapshoot.
pub(super) struct RipLog {
	track: Option<(u8, Instant)>,
	err: Vec<(i32, FmtUtc2k)>,
	silent: u32,
}

impl Drop for RipLog {
	/// # Final Print Maybe.
	fn drop(&mut self) { self.flush(); }
}

impl RipLog {
	/// # New Instance.
	pub(super) const fn new() -> Self {
		Self {
			track: None,
			err: Vec::new(),
			silent: 0,
		}
	}

	/// # Header.
	///
	/// Print the program details, disc identifiers, and layout notes.
	pub(super) fn header(disc: &Disc) {
		let writer = std::io::stdout();
		let mut handle = writer.lock();
		let _res = writeln!(
			&mut handle,
			"##\n## CD Verify v{}\n## {}\n##",
			env!("CARGO_PKG_VERSION"),
			FmtUtc2k::now(),
		);

		if let Some(fp) = disc.fingerprint() {
			let _res = writeln!(&mut handle, "## AccurateRip: {fp}");
			let _res = writeln!(&mut handle, "## CDDB:        {:08x}", fp.cddb_id());
			if let Some(mb) = fp.musicbrainz_id() {
				let _res = writeln!(&mut handle, "## MusicBrainz: {mb}");
			}
			let _res = writeln!(&mut handle, "##");
		}

		if ! disc.notes().is_empty() {
			for note in disc.notes() {
				let _res = writeln!(&mut handle, "## {note}");
			}
			let _res = writeln!(&mut handle, "##");
		}

		let _res = handle.flush();
	}

	/// # New Track!
	pub(super) fn track(&mut self, track: &Track) {
		self.flush();

		// Unnecessary but unhurtful.
		self.err.truncate(0);
		self.silent = 0;

		self.track.replace((track.number(), Instant::now()));
	}

	/// # Add Read Error.
	pub(super) fn add_error(&mut self, lsn: i32) {
		self.err.push((lsn, FmtUtc2k::now()));
	}

	/// # Add Out-of-Bounds Sector.
	pub(super) fn add_silent(&mut self) { self.silent += 1; }

	/// # Flush.
	fn flush(&mut self) {
		// Header.
		let Some((track, start)) = self.track.take() else { return; };
		let writer = std::io::stdout();
		let mut handle = writer.lock();
		let _res = writeln!(
			&mut handle,
			r"## Track {track:02}: {}
## Bad Sectors: {}
## Padded Sectors: {}
##",
			NiceElapsed::from(start),
			self.err.len(),
			self.silent,
		);

		// Read errors.
		if ! self.err.is_empty() {
			for (lsn, time) in self.err.drain(..) {
				let _res = writeln!(
					&mut handle,
					"## [{time}] {lsn:06} Read error; replaced with silence.",
				);
			}
			let _res = writeln!(&mut handle, "##");
		}

		// Write it!
		let _res = handle.flush();
	}
}
