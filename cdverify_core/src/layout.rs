/*!
# CD Verify: Layout Resolution

Tables of contents describe where each track _starts_, but leave a lot of
room for interpretation beyond that. Pregaps might belong to the previous
track, the current one, their own track, or no track at all; drives may
report boundaries that don't quite touch; the first track might not start at
the start of the disc.

The resolver settles all of that once, up front, producing a gapless (or
explicitly gapped) layout and the raw read window for each track.
*/

use crate::{
	CD_EXTRA_GAP,
	PregapAction,
	RipOptions,
	Track,
};
use std::fmt;



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Layout Note.
///
/// Every structural decision made while resolving the disc layout is
/// recorded as one of these. Sector values are LSNs, and ranges are
/// inclusive.
pub enum LayoutNote {
	/// # Pregap Synthesized for Leading Gap.
	LeadingGapSynthesized {
		/// # Track Number.
		track: u8,
		/// # First Sector.
		start: i32,
		/// # Last Sector.
		end: i32,
	},

	/// # Pregap Extended to Disc Start.
	LeadingGapExtended {
		/// # Track Number.
		track: u8,
		/// # Original Pregap Start.
		from: i32,
		/// # New Pregap Start.
		to: i32,
	},

	/// # Pregap Dropped.
	PregapDropped {
		/// # Track Number.
		track: u8,
		/// # First Sector.
		start: i32,
		/// # Last Sector.
		end: i32,
	},

	/// # Pregap Merged Into Track.
	PregapMerged {
		/// # Track Number.
		track: u8,
		/// # First Sector.
		start: i32,
		/// # Last Sector.
		end: i32,
	},

	/// # Pregap Split Into Its Own Track.
	PregapSplit {
		/// # Number of the New Track.
		track: u8,
		/// # First Sector.
		start: i32,
		/// # Last Sector.
		end: i32,
	},

	/// # Directive Ignored (No Pregap).
	PregapIgnored {
		/// # Track Number.
		track: u8,
		/// # Requested Action.
		action: PregapAction,
	},

	/// # Previous Track Padded to Close a Gap.
	GapPadded {
		/// # Track Number.
		track: u8,
		/// # Original End.
		from: i32,
		/// # New End.
		to: i32,
	},

	/// # Previous Track Trimmed to Resolve an Overlap.
	OverlapTrimmed {
		/// # Track Number.
		track: u8,
		/// # Original End.
		from: i32,
		/// # New End.
		to: i32,
	},

	/// # Gap Left Unaccounted.
	///
	/// The `track` is the one _following_ the gap.
	GapIgnored {
		/// # Track Number.
		track: u8,
		/// # First Sector.
		start: i32,
		/// # Last Sector.
		end: i32,
	},

	/// # Last Track Padded to Disc End.
	TrailingGapPadded {
		/// # Track Number.
		track: u8,
		/// # Original End.
		from: i32,
		/// # New End.
		to: i32,
	},
}

impl fmt::Display for LayoutNote {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			Self::LeadingGapSynthesized { track, start, end } => write!(
				f,
				"Track #{track:02}: synthesized a pregap for the leading gap ({start}..={end}).",
			),
			Self::LeadingGapExtended { track, from, to } => write!(
				f,
				"Track #{track:02}: extended the pregap from {from} to the disc start ({to}).",
			),
			Self::PregapDropped { track, start, end } => write!(
				f,
				"Track #{track:02}: dropped the pregap ({start}..={end}).",
			),
			Self::PregapMerged { track, start, end } => write!(
				f,
				"Track #{track:02}: merged the pregap ({start}..={end}).",
			),
			Self::PregapSplit { track, start, end } => write!(
				f,
				"Track #{track:02}: split off from the following track's pregap ({start}..={end}).",
			),
			Self::PregapIgnored { track, action } => write!(
				f,
				"Track #{track:02}: has no pregap; ignoring the {action} directive.",
			),
			Self::GapPadded { track, from, to } => write!(
				f,
				"Track #{track:02}: padded the end from {from} to {to} to close a gap.",
			),
			Self::OverlapTrimmed { track, from, to } => write!(
				f,
				"Track #{track:02}: trimmed the end from {from} to {to} to resolve an overlap.",
			),
			Self::GapIgnored { track, start, end } => write!(
				f,
				"Track #{track:02}: ignored the preceding gap ({start}..={end}).",
			),
			Self::TrailingGapPadded { track, from, to } => write!(
				f,
				"Track #{track:02}: padded the end from {from} to the disc end ({to}).",
			),
		}
	}
}



/// # Resolve.
///
/// Resolve the layout in place, returning the notes. This must only be run
/// once per track list.
pub(crate) fn resolve(
	tracks: &mut Vec<Track>,
	disc_start: i32,
	disc_end: i32,
	opts: &RipOptions,
) -> Vec<LayoutNote> {
	let mut notes = Vec::new();
	if tracks.is_empty() { return notes; }

	leading_gap(tracks, disc_start, &mut notes);
	pregaps(tracks, opts, &mut notes);
	discontinuities(tracks, opts, &mut notes);
	trailing_gap(tracks, disc_end, &mut notes);
	read_windows(tracks, disc_start, disc_end, opts);
	finalize(tracks);

	notes
}

/// # Leading Gap.
///
/// Give any sectors between the disc start and the first track to the first
/// track's pregap.
fn leading_gap(tracks: &mut [Track], disc_start: i32, notes: &mut Vec<LayoutNote>) {
	let Some(t) = tracks.first_mut() else { return; };
	if t.is_data() || t.start_lsn <= disc_start { return; }

	match t.pregap_lsn {
		None => {
			t.pregap_lsn.replace(disc_start);
			notes.push(LayoutNote::LeadingGapSynthesized {
				track: t.number,
				start: disc_start,
				end: t.start_lsn - 1,
			});
		},
		Some(from) if disc_start < from => {
			t.pregap_lsn.replace(disc_start);
			notes.push(LayoutNote::LeadingGapExtended {
				track: t.number,
				from,
				to: disc_start,
			});
		},
		Some(_) => {},
	}
}

/// # Pregaps.
///
/// Apply each track's pregap directive.
fn pregaps(tracks: &mut Vec<Track>, opts: &RipOptions, notes: &mut Vec<LayoutNote>) {
	let mut idx = 0;
	while idx < tracks.len() {
		if tracks[idx].is_data() {
			idx += 1;
			continue;
		}

		let action = opts.pregap(tracks[idx].cd_track_number);
		let Some(pregap) = tracks[idx].pregap_lsn else {
			if action != PregapAction::Default {
				notes.push(LayoutNote::PregapIgnored {
					track: tracks[idx].number,
					action,
				});
			}
			idx += 1;
			continue;
		};

		// The first track has no previous track to keep the pregap.
		let action =
			if idx == 0 && action == PregapAction::Default { PregapAction::Drop }
			else { action };

		let t = &mut tracks[idx];
		let end = t.start_lsn - 1;
		match action {
			PregapAction::Default => {},
			PregapAction::Drop => {
				t.dropped_pregap_start.replace(pregap);
				notes.push(LayoutNote::PregapDropped { track: t.number, start: pregap, end });
				shrink_prev(tracks, idx, pregap);
			},
			PregapAction::Merge => {
				t.merged_pregap_end.replace(t.start_lsn);
				t.start_lsn = pregap;
				notes.push(LayoutNote::PregapMerged { track: t.number, start: pregap, end });
				shrink_prev(tracks, idx, pregap);
			},
			PregapAction::Split => {
				let mut new = t.clone();
				new.synthetic = true;
				new.pregap_lsn = None;
				new.start_lsn = pregap;
				new.end_lsn = end;
				new.start_lsn_sig = pregap;
				new.end_lsn_sig = end;

				// A split off the very first track becomes track zero;
				// otherwise it takes the current number and everything after
				// shifts up.
				t.pregap_lsn = None;
				if idx == 0 && t.number == 1 { new.number = 0; }
				else {
					for t in &mut tracks[idx..] { t.number = t.number.saturating_add(1); }
				}

				notes.push(LayoutNote::PregapSplit { track: new.number, start: pregap, end });
				tracks.insert(idx, new);
				shrink_prev(tracks, idx, pregap);
				idx += 1;
			},
		}

		idx += 1;
	}
}

/// # Shrink Previous Track.
///
/// End the track before `idx` right before `pregap`.
fn shrink_prev(tracks: &mut [Track], idx: usize, pregap: i32) {
	if let Some(prev) = idx.checked_sub(1).and_then(|i| tracks.get_mut(i)) {
		prev.end_lsn = pregap - 1;
	}
}

/// # Discontinuities.
///
/// Make sure each track ends right before the next begins, unless the gap is
/// deliberate.
fn discontinuities(tracks: &mut [Track], opts: &RipOptions, notes: &mut Vec<LayoutNote>) {
	for idx in 1..tracks.len() {
		let (a, b) = tracks.split_at_mut(idx);
		let prev = &mut a[idx - 1];
		let next = &b[0];

		let expected = prev.end_lsn + 1;
		if next.start_lsn == expected { continue; }

		let from = prev.end_lsn;
		let to = next.start_lsn - 1;
		if expected < next.start_lsn {
			let ignore =
				// Dropped pregaps are meant to disappear.
				(! next.is_synthetic() && opts.pregap(next.cd_track_number) == PregapAction::Drop) ||
				// So are the session gaps of CD-Extra discs.
				(next.is_data() && prev.is_audio() && next.start_lsn - expected == i32::from(CD_EXTRA_GAP));

			if ignore {
				notes.push(LayoutNote::GapIgnored { track: next.number, start: expected, end: to });
				continue;
			}

			prev.end_lsn = to;
			notes.push(LayoutNote::GapPadded { track: prev.number, from, to });
		}
		else {
			prev.end_lsn = to;
			notes.push(LayoutNote::OverlapTrimmed { track: prev.number, from, to });
		}
	}
}

/// # Trailing Gap.
///
/// Pad the last audio track out to the end of the disc.
fn trailing_gap(tracks: &mut [Track], disc_end: i32, notes: &mut Vec<LayoutNote>) {
	let Some(t) = tracks.last_mut() else { return; };
	if t.is_audio() && t.end_lsn < disc_end {
		notes.push(LayoutNote::TrailingGapPadded {
			track: t.number,
			from: t.end_lsn,
			to: disc_end,
		});
		t.end_lsn = disc_end;
	}
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
/// # Read Windows.
///
/// Work out which raw sectors each audio track needs, given the read offset.
fn read_windows(tracks: &mut [Track], disc_start: i32, disc_end: i32, opts: &RipOptions) {
	let offset = opts.offset();
	let shift = offset.sector_shift();
	let partial = offset.partial_bytes();

	for t in tracks {
		if t.is_data() {
			t.window.first = t.start_lsn;
			t.window.last = t.end_lsn;
			continue;
		}

		let first = t.start_lsn + shift;
		let last = t.end_lsn + shift + i32::from(partial != 0);
		t.window.first = first;
		t.window.last = last;
		t.window.partial_bytes = partial as u16;

		if opts.overread() {
			t.window.frames_before_disc_start = 0;
			t.window.frames_after_disc_end = 0;
		}
		else {
			let total = t.window.sectors();
			t.window.frames_before_disc_start = (disc_start - first).clamp(0, total as i32) as u32;
			t.window.frames_after_disc_end = (last - disc_end).clamp(0, total as i32) as u32;
		}
	}
}

/// # Finalize.
///
/// Renumber the indexes and adjacency links.
fn finalize(tracks: &mut [Track]) {
	let len = tracks.len();
	for (idx, t) in tracks.iter_mut().enumerate() {
		t.index = idx + 1;
		t.prev = idx.checked_sub(1);
		t.next = if idx + 1 < len { Some(idx + 1) } else { None };
	}
}
