/*!
# CD Verify: Disc
*/

use cdtoc::{
	Toc,
	TocKind,
};
use crate::{
	accuraterip::{
		fetch,
		parse,
	},
	AccurateRipStatus,
	CD_EXTRA_GAP,
	CD_LEADIN,
	CD_LEADOUT_LABEL,
	CdVerifyError,
	cue::cue_sheet,
	DatabaseLookup,
	DbResponse,
	Fingerprint,
	layout::resolve,
	LayoutNote,
	MAX_LSN,
	MAX_TRACK_NUMBER,
	OutputFormat,
	RipOptions,
	TocEntry,
	Track,
};
use fyi_ansi::{
	csi,
	dim,
};
use fyi_msg::Msg;
use std::fmt;



#[derive(Debug, Clone)]
/// # Disc.
///
/// This owns the full (ordered) track list along with the disc bounds, and is
/// the context through which the layout is resolved, the AccurateRip database
/// is queried, and rips are verified.
///
/// Positions are LSNs: the first addressable sector is usually zero, and
/// `end_lsn` is the last sector before the lead-out.
pub struct Disc {
	tracks: Vec<Track>,
	start_lsn: i32,
	end_lsn: i32,
	resolved: bool,
	notes: Vec<LayoutNote>,
	ar_status: AccurateRipStatus,
}

impl fmt::Display for Disc {
	/// # Summarize the Disc.
	///
	/// This prints the disc identifiers and resolved track layout in a nice
	/// little table.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		/// # Divider.
		const DIVIDER: &str = dim!("----------------------------------------------\n");

		// A few key/value pairs.
		let mut kv: Vec<(&str, &str, String)> = Vec::new();
		if let Some(fp) = self.fingerprint() {
			kv.push(("AccurateRip:", csi!(bold, blue), fp.to_string()));
			kv.push(("CDDB:", csi!(bold, blue), format!("{:08x}", fp.cddb_id())));
			if let Some(mb) = fp.musicbrainz_id() {
				kv.push(("MusicBrainz:", csi!(bold, blue), mb.to_owned()));
			}
		}
		kv.push(("Sectors:", csi!(bold, 199), format!("{}..={}", self.start_lsn, self.end_lsn)));

		let col_max: usize = kv.iter().map(|(k, _, _)| k.len()).max().unwrap_or(0);
		for (k, color, v) in kv {
			writeln!(
				f,
				concat!("{color}{k:col_max$}", csi!(), " {v}"),
				color=color,
				k=k,
				col_max=col_max,
				v=v,
			)?;
		}

		// Start the table of contents.
		write!(f, concat!(dim!("\n##   FIRST    LAST  LENGTH  PREGAP\n"), "{}"), DIVIDER)?;

		for t in &self.tracks {
			let pregap = t.pregap_lsn()
				.or_else(|| t.dropped_pregap_start())
				.map_or_else(String::new, |v| v.to_string());
			let note =
				if t.is_data() { "DATA TRACK" }
				else if t.is_synthetic() { "PREGAP" }
				else if t.merged_pregap_end().is_some() { "MERGED" }
				else if t.dropped_pregap_start().is_some() { "DROPPED" }
				else { "" };

			let line = format!(
				"{:02}  {:>6}  {:>6}  {:>6}  {pregap:>6}  {note}",
				t.number(),
				t.start_lsn(),
				t.end_lsn(),
				t.sectors(),
			);
			if t.is_audio() && ! t.is_synthetic() { writeln!(f, "{line}")?; }
			else { writeln!(f, dim!("{}"), line)?; }
		}

		// The leadout.
		writeln!(
			f,
			concat!(csi!(dim), "{}  {:>6}{:>32}", csi!()),
			CD_LEADOUT_LABEL,
			self.end_lsn + 1,
			"LEAD-OUT",
		)?;

		// Close it off!
		f.write_str(DIVIDER)
	}
}

impl Disc {
	/// # New.
	///
	/// Build a disc from raw TOC entries, one per physical track, and the disc
	/// bounds.
	///
	/// ## Errors
	///
	/// This will return an error if the disc bounds are out of range, there
	/// are no tracks or too many tracks, tracks are out of order, any track
	/// positions fall outside the disc, or a pregap reaches back into the
	/// previous track.
	pub fn new(entries: &[TocEntry], start_lsn: i32, end_lsn: i32)
	-> Result<Self, CdVerifyError> {
		if
			end_lsn < start_lsn ||
			start_lsn < -i32::from(CD_LEADIN) ||
			MAX_LSN < end_lsn
		{
			return Err(CdVerifyError::Leadout);
		}
		if entries.is_empty() || usize::from(MAX_TRACK_NUMBER) < entries.len() {
			return Err(CdVerifyError::NumTracks);
		}

		for e in entries { e.validate(start_lsn, end_lsn)?; }
		for pair in entries.windows(2) {
			if pair[1].number() <= pair[0].number() {
				return Err(CdVerifyError::TrackNumber(pair[1].number()));
			}
			if pair[1].start() <= pair[0].start() {
				return Err(CdVerifyError::TrackLsn(pair[1].number()));
			}
			if pair[1].pregap().is_some_and(|p| p <= pair[0].start()) {
				return Err(CdVerifyError::Pregap(pair[1].number()));
			}
		}

		Ok(Self {
			tracks: entries.iter().map(Track::from).collect(),
			start_lsn,
			end_lsn,
			resolved: false,
			notes: Vec::new(),
			ar_status: AccurateRipStatus::NotQueried,
		})
	}

	/// # From CDTOC.
	///
	/// Build a disc from a parsed [`Toc`], with optional drive-signalled
	/// pregaps given as `(track number, LSN)` pairs.
	///
	/// Track ends are inferred from the following track's start. For CD-Extra
	/// discs, the last audio track ends where the session gap begins.
	///
	/// ## Errors
	///
	/// This will return an error if a pregap references a track that doesn't
	/// exist, or any of the [`Disc::new`] conditions are violated.
	pub fn from_cdtoc(toc: &Toc, gaps: &[(u8, i32)]) -> Result<Self, CdVerifyError> {
		let lsn = |lba: u32| i32::try_from(lba)
			.ok()
			.and_then(|v| v.checked_sub(i32::from(CD_LEADIN)))
			.ok_or(CdVerifyError::Leadout);

		let end_lsn = lsn(toc.leadout())? - 1;
		let data = toc.data_sector().map(lsn).transpose()?;
		let audio = toc.audio_sectors()
			.iter()
			.map(|&v| lsn(v))
			.collect::<Result<Vec<i32>, CdVerifyError>>()?;

		// Collect starts and data flags in disc order.
		let mut starts: Vec<(i32, bool)> = Vec::with_capacity(audio.len() + 1);
		match (toc.kind(), data) {
			(TocKind::DataFirst, Some(d)) => {
				starts.push((d, true));
				starts.extend(audio.iter().map(|&v| (v, false)));
			},
			(TocKind::CDExtra, Some(d)) => {
				starts.extend(audio.iter().map(|&v| (v, false)));
				starts.push((d, true));
			},
			_ => { starts.extend(audio.iter().map(|&v| (v, false))); },
		}

		let mut entries = Vec::with_capacity(starts.len());
		for (idx, &(start, is_data)) in starts.iter().enumerate() {
			let number = u8::try_from(idx + 1).map_err(|_| CdVerifyError::NumTracks)?;
			let end = match starts.get(idx + 1) {
				// The audio session ends before the gap.
				Some(&(next, true)) if matches!(toc.kind(), TocKind::CDExtra) =>
					next - i32::from(CD_EXTRA_GAP) - 1,
				Some(&(next, _)) => next - 1,
				None => end_lsn,
			};
			entries.push(TocEntry::new(number, start, end).with_data(is_data));
		}

		for &(number, pregap) in gaps {
			let entry = entries.iter_mut()
				.find(|e| e.number() == number)
				.ok_or(CdVerifyError::TrackNumber(number))?;
			*entry = entry.with_pregap(pregap);
		}

		Self::new(&entries, 0, end_lsn)
	}

	/// # Resolve Layout.
	///
	/// Resolve pregaps, gaps, and read windows according to the options. The
	/// decisions made along the way are available afterward via
	/// [`Disc::notes`].
	///
	/// ## Errors
	///
	/// A disc can only be resolved once; subsequent calls will return an
	/// error and leave everything as it was.
	pub fn resolve(&mut self, opts: &RipOptions) -> Result<(), CdVerifyError> {
		if self.resolved { return Err(CdVerifyError::AlreadyResolved); }
		self.notes = resolve(&mut self.tracks, self.start_lsn, self.end_lsn, opts);
		self.resolved = true;
		Ok(())
	}
}

/// ## Getters.
impl Disc {
	#[must_use]
	/// # AccurateRip Status.
	pub const fn ar_status(&self) -> AccurateRipStatus { self.ar_status }

	#[must_use]
	/// # Duration (in sectors).
	pub const fn duration(&self) -> u32 { self.end_lsn.abs_diff(self.start_lsn) + 1 }

	#[must_use]
	/// # End LSN.
	///
	/// This is the last sector before the lead-out.
	pub const fn end_lsn(&self) -> i32 { self.end_lsn }

	#[must_use]
	/// # Fingerprint.
	///
	/// Return the disc's database identifiers, unless it has no audio.
	pub fn fingerprint(&self) -> Option<Fingerprint> {
		Fingerprint::new(&self.tracks, self.end_lsn)
	}

	#[must_use]
	/// # Is Resolved?
	pub const fn is_resolved(&self) -> bool { self.resolved }

	#[must_use]
	/// # Layout Notes.
	pub fn notes(&self) -> &[LayoutNote] { &self.notes }

	#[must_use]
	/// # Start LSN.
	pub const fn start_lsn(&self) -> i32 { self.start_lsn }

	#[must_use]
	/// # Tracks.
	pub fn tracks(&self) -> &[Track] { &self.tracks }

	/// # Tracks (Mutable).
	pub(crate) fn tracks_mut(&mut self) -> &mut [Track] { &mut self.tracks }

	#[must_use]
	/// # Cue Sheet.
	///
	/// Render a cue sheet for the resolved layout, referencing files named per
	/// [`Track::file_name`].
	pub fn cue_sheet(&self, format: OutputFormat) -> String { cue_sheet(self, format) }
}

/// ## Verification.
impl Disc {
	/// # AccurateRip Lookup.
	///
	/// Fetch and parse the AccurateRip data for the disc, attaching the
	/// candidate entries to each physical audio track.
	///
	/// Transport problems are not fatal; they are reported as a warning and
	/// leave the disc and its tracks with an [`AccurateRipStatus::Error`]
	/// status.
	pub fn accuraterip<L>(&mut self, lookup: &L, cache: bool) -> AccurateRipStatus
	where L: DatabaseLookup + ?Sized {
		let Some(fp) = self.fingerprint() else {
			self.ar_status = AccurateRipStatus::NotFound;
			return self.ar_status;
		};

		let res = fetch(&fp, lookup, cache);
		if let DbResponse::Error(e) = &res {
			Msg::warning(format!("AccurateRip lookup failed: {e}")).eprint();
		}

		let parsed = parse(&fp, &res);
		let mut entries = parsed.tracks.into_iter();
		for t in &mut self.tracks {
			if t.is_data() || t.is_synthetic() { continue; }
			t.ar_entries = entries.next().unwrap_or_default();
			t.ar_max_confidence = t.ar_entries.first().map_or(0, |e| e.confidence());
			t.ar_status = parsed.status;
		}

		self.ar_status = parsed.status;
		self.ar_status
	}

	#[must_use]
	/// # Verify.
	///
	/// Compare each track's checksums against its AccurateRip entries,
	/// returning a `(track number, verdict)` pair for every track.
	pub fn verify(&self, confidence: u8) -> Vec<(u8, TrackVerdict)> {
		self.tracks.iter()
			.map(|t| (t.number(), TrackVerdict::new(t, confidence)))
			.collect()
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Track Verdict.
///
/// The outcome of verifying a single track against AccurateRip.
pub enum TrackVerdict {
	/// # Accurate (with the matching confidence).
	Accurate(u8),

	/// # Matched, but below the required confidence.
	LowConfidence(u8),

	/// # Only the sector 450 checkpoint matched.
	///
	/// The offset is probably right, but the data is damaged somewhere.
	Partial(u8),

	/// # No Match.
	Mismatch,

	/// # Data, synthetic, or unripped tracks.
	NotVerifiable,

	/// # No Database Data.
	Unavailable,
}

impl fmt::Display for TrackVerdict {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Accurate(c) => write!(f, "accurately ripped (confidence {c})"),
			Self::LowConfidence(c) => write!(f, "matched with insufficient confidence ({c})"),
			Self::Partial(c) => write!(f, "partially matched (confidence {c})"),
			Self::Mismatch => f.write_str("not present in database"),
			Self::NotVerifiable => f.write_str("not verifiable"),
			Self::Unavailable => f.write_str("no AccurateRip data"),
		}
	}
}

impl TrackVerdict {
	/// # New.
	fn new(track: &Track, confidence: u8) -> Self {
		if track.is_data() || track.is_synthetic() { return Self::NotVerifiable; }
		if ! track.ar_status().is_found() { return Self::Unavailable; }
		let Some(chk) = track.checksums() else { return Self::NotVerifiable; };

		let full = track.ar_confidence(chk.accuraterip_v1(), false)
			.max(track.ar_confidence(chk.accuraterip_v2(), false));
		match full {
			Some(c) if confidence <= c => Self::Accurate(c),
			Some(c) => Self::LowConfidence(c),
			None => track.ar_confidence(chk.accuraterip_v1_450(), true)
				.map_or(Self::Mismatch, Self::Partial),
		}
	}

	#[must_use]
	/// # Is Accurate?
	pub const fn is_accurate(self) -> bool { matches!(self, Self::Accurate(_)) }
}
