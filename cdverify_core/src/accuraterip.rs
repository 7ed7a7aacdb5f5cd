/*!
# CD Verify: AccurateRip

AccurateRip responses are a series of fixed-size binary records, one per
pressing, each starting with a header identifying the disc, followed by one
`(confidence, checksum, checksum_450)` triple per audio track.
*/

use crate::{
	cache_path,
	cache_read,
	CACHE_SCRATCH,
	CacheWriter,
	Fingerprint,
};
use std::{
	fmt,
	io::{
		Read,
		Write,
	},
	sync::OnceLock,
	time::Duration,
};
use ureq::{
	Agent,
	AgentBuilder,
};



/// # Binary Content Type.
const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// # Header Length.
///
/// Track count (1) + disc ID #1 (4) + disc ID #2 (4) + CDDB ID (4).
const HEADER_LEN: usize = 13;

/// # Entry Length.
///
/// Confidence (1) + checksum (4) + 450 checksum (4).
const ENTRY_LEN: usize = 9;

/// # Connection Agent.
static AGENT: OnceLock<Agent> = OnceLock::new();



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # AccurateRip Status.
pub enum AccurateRipStatus {
	#[default]
	/// # Not Queried (Yet).
	NotQueried,

	/// # Found.
	Found,

	/// # Not Found.
	NotFound,

	/// # Only Mismatching Records.
	Mismatch,

	/// # Transport Error.
	Error,
}

impl fmt::Display for AccurateRipStatus {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl AccurateRipStatus {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::NotQueried => "not queried",
			Self::Found => "found",
			Self::NotFound => "not found",
			Self::Mismatch => "mismatch",
			Self::Error => "error",
		}
	}

	#[must_use]
	/// # Is Found?
	pub const fn is_found(self) -> bool { matches!(self, Self::Found) }
}



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # AccurateRip Entry.
///
/// A single candidate checksum for a track, along with the number of
/// submitters who agree with it.
pub struct AccurateRipEntry {
	confidence: u8,
	checksum: u32,
	checksum_450: u32,
}

impl AccurateRipEntry {
	#[must_use]
	/// # Confidence.
	pub const fn confidence(&self) -> u8 { self.confidence }

	#[must_use]
	/// # Checksum.
	///
	/// This may be a v1 or v2 checksum; the database doesn't say which.
	pub const fn checksum(&self) -> u32 { self.checksum }

	#[must_use]
	/// # Sector 450 Checksum.
	pub const fn checksum_450(&self) -> u32 { self.checksum_450 }

	#[cfg(test)]
	/// # New.
	pub(crate) const fn new(confidence: u8, checksum: u32, checksum_450: u32) -> Self {
		Self { confidence, checksum, checksum_450 }
	}

	/// # From Bytes.
	fn from_bytes(src: &[u8]) -> Option<Self> {
		if src.len() != ENTRY_LEN { return None; }
		Some(Self {
			confidence: src[0],
			checksum: u32::from_le_bytes(src[1..5].try_into().ok()?),
			checksum_450: u32::from_le_bytes(src[5..9].try_into().ok()?),
		})
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Database Response.
///
/// This is what a [`DatabaseLookup`] returns.
pub enum DbResponse {
	/// # A Response Body.
	Body {
		/// # Content Type.
		content_type: String,

		/// # Raw Body.
		body: Vec<u8>,
	},

	/// # No Such Entry.
	NotFound,

	/// # Some Other Failure.
	Error(String),
}

impl DbResponse {
	#[must_use]
	/// # Is Text Error?
	///
	/// AccurateRip sometimes answers missing entries with an HTML error page
	/// rather than a proper status code. If the content type isn't binary and
	/// "html" shows up in the first 64 bytes, we'll assume that's what
	/// happened.
	fn is_html(content_type: &str, body: &[u8]) -> bool {
		if content_type.eq_ignore_ascii_case(CONTENT_TYPE_BINARY) { return false; }
		let end = body.len().min(64 + 3);
		body[..end].windows(4).any(|w| w.eq_ignore_ascii_case(b"html"))
	}
}



/// # Database Lookup.
///
/// This is the transport seam for the AccurateRip database. Implementations
/// should perform a GET request against the URL and return the results,
/// mapping HTTP-level "not found"-type failures to [`DbResponse::NotFound`]
/// and everything else to [`DbResponse::Error`].
pub trait DatabaseLookup {
	/// # Fetch.
	fn fetch(&self, url: &str) -> DbResponse;
}

#[derive(Debug, Clone, Copy, Default)]
/// # HTTP Lookup.
///
/// The default [`DatabaseLookup`], powered by `ureq`.
pub struct HttpLookup;

impl DatabaseLookup for HttpLookup {
	fn fetch(&self, url: &str) -> DbResponse {
		match agent().get(url).call() {
			Ok(res) => {
				let content_type = res.content_type().to_owned();
				let mut body = Vec::new();
				match res.into_reader().read_to_end(&mut body) {
					Ok(_) => DbResponse::Body { content_type, body },
					Err(e) => DbResponse::Error(e.to_string()),
				}
			},
			Err(ureq::Error::Status(_, _)) => DbResponse::NotFound,
			Err(e) => DbResponse::Error(e.to_string()),
		}
	}
}

/// # Connection Agent.
///
/// Storing the agent statically saves a little bit of overhead on reuse. Since
/// the checksums are cached locally, this may not get called at all.
fn agent() -> &'static Agent {
	AGENT.get_or_init(||
		AgentBuilder::new()
			.timeout(Duration::from_secs(15))
			.user_agent(concat!("cdverify/", env!("CARGO_PKG_VERSION")))
			.max_idle_connections(0)
			.build()
	)
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Parsed Results.
///
/// The outcome of a lookup, with one (sorted) entry list per physical audio
/// track.
pub(crate) struct AccurateRipResults {
	pub(crate) status: AccurateRipStatus,
	pub(crate) tracks: Vec<Vec<AccurateRipEntry>>,
}

/// # Fetch.
///
/// Pull the response for the disc from the cache, or failing that, the
/// lookup, caching the latter if it looks like real data.
pub(crate) fn fetch<L>(fp: &Fingerprint, lookup: &L, cache: bool) -> DbResponse
where L: DatabaseLookup + ?Sized {
	let stub = format!("{CACHE_SCRATCH}/dBAR-{fp}.bin");
	if cache {
		if let Some(body) = cache_read(&stub) {
			return DbResponse::Body {
				content_type: CONTENT_TYPE_BINARY.to_owned(),
				body,
			};
		}
	}

	let res = lookup.fetch(&fp.accuraterip_url());
	if cache {
		if let DbResponse::Body { content_type, body } = &res {
			if ! body.is_empty() && ! DbResponse::is_html(content_type, body) {
				let _res = cache_path(&stub).ok().and_then(|dst| {
					let mut writer = CacheWriter::new(&dst).ok()?;
					writer.writer().write_all(body).ok()?;
					writer.finish().ok()
				});
			}
		}
	}

	res
}

/// # Parse.
///
/// Parse a database response for the disc, returning the overall status and
/// the candidate entries for each audio track.
///
/// Records are fixed-size, so any whose header doesn't match the fingerprint
/// are simply skipped over. If none match, the status is
/// [`AccurateRipStatus::Mismatch`]. If there aren't any records at all, it is
/// [`AccurateRipStatus::NotFound`].
pub(crate) fn parse(fp: &Fingerprint, res: &DbResponse) -> AccurateRipResults {
	let count = usize::from(fp.audio_tracks());
	let mut out = AccurateRipResults {
		status: AccurateRipStatus::NotFound,
		tracks: vec![Vec::new(); count],
	};

	let body = match res {
		DbResponse::Body { content_type, body } => {
			if DbResponse::is_html(content_type, body) { return out; }
			body
		},
		DbResponse::NotFound => return out,
		DbResponse::Error(_) => {
			out.status = AccurateRipStatus::Error;
			return out;
		},
	};

	// An empty or short response has no records at all.
	let record_len = HEADER_LEN + count * ENTRY_LEN;
	if count == 0 || body.len() < record_len { return out; }

	for record in body.chunks_exact(record_len) {
		let (header, entries) = record.split_at(HEADER_LEN);
		if ! header_matches(fp, header) {
			if ! out.status.is_found() { out.status = AccurateRipStatus::Mismatch; }
			continue;
		}

		out.status = AccurateRipStatus::Found;
		for (dst, raw) in out.tracks.iter_mut().zip(entries.chunks_exact(ENTRY_LEN)) {
			if let Some(entry) = AccurateRipEntry::from_bytes(raw) {
				dst.push(entry);
			}
		}
	}

	// Highest confidence first.
	for entries in &mut out.tracks {
		entries.sort_by(|a, b| b.confidence.cmp(&a.confidence));
	}

	out
}

/// # Header Matches?
fn header_matches(fp: &Fingerprint, header: &[u8]) -> bool {
	let le32 = |from: usize| header.get(from..from + 4)
		.and_then(|v| v.try_into().ok())
		.map(u32::from_le_bytes);

	header.len() == HEADER_LEN &&
	header[0] == fp.audio_tracks() &&
	le32(1) == Some(fp.accuraterip_id1()) &&
	le32(5) == Some(fp.accuraterip_id2()) &&
	le32(9) == Some(fp.cddb_id())
}



#[cfg(test)]
mod test {
	use super::*;
	use cdtoc::Toc;
	use crate::Disc;

	/// # Test Fingerprint.
	fn fingerprint() -> Fingerprint {
		let toc = Toc::from_cdtoc("4+96+2D2B+6256+B327+D84A").expect("Invalid CDTOC.");
		Disc::from_cdtoc(&toc, &[])
			.expect("Disc failed.")
			.fingerprint()
			.expect("Missing fingerprint.")
	}

	/// # Build a Record.
	fn record(fp: &Fingerprint, id1: u32, entries: &[(u8, u32, u32)]) -> Vec<u8> {
		let mut out = vec![fp.audio_tracks()];
		out.extend_from_slice(&id1.to_le_bytes());
		out.extend_from_slice(&fp.accuraterip_id2().to_le_bytes());
		out.extend_from_slice(&fp.cddb_id().to_le_bytes());
		for (c, a, b) in entries {
			out.push(*c);
			out.extend_from_slice(&a.to_le_bytes());
			out.extend_from_slice(&b.to_le_bytes());
		}
		out
	}

	/// # Binary Response.
	fn binary(body: Vec<u8>) -> DbResponse {
		DbResponse::Body {
			content_type: CONTENT_TYPE_BINARY.to_owned(),
			body,
		}
	}

	const ENTRIES_A: [(u8, u32, u32); 4] = [
		(3, 0x1111_1111, 0xAAAA_0001),
		(3, 0x2222_2222, 0xAAAA_0002),
		(3, 0x3333_3333, 0xAAAA_0003),
		(3, 0x4444_4444, 0xAAAA_0004),
	];

	const ENTRIES_B: [(u8, u32, u32); 4] = [
		(9, 0x5555_5555, 0xBBBB_0001),
		(1, 0x6666_6666, 0xBBBB_0002),
		(9, 0x7777_7777, 0xBBBB_0003),
		(1, 0x8888_8888, 0xBBBB_0004),
	];

	#[test]
	fn t_not_found() {
		let fp = fingerprint();
		for res in [
			DbResponse::NotFound,
			binary(Vec::new()),
			binary(vec![4, 0, 1, 2]),
			DbResponse::Body {
				content_type: "text/html".to_owned(),
				body: b"<!DOCTYPE html><html><body>404</body></html>".to_vec(),
			},
		] {
			let parsed = parse(&fp, &res);
			assert_eq!(parsed.status, AccurateRipStatus::NotFound, "Expected not found: {res:?}");
			assert!(parsed.tracks.iter().all(Vec::is_empty), "Expected no entries.");
		}

		let parsed = parse(&fp, &DbResponse::Error("timeout".to_owned()));
		assert_eq!(parsed.status, AccurateRipStatus::Error);
	}

	#[test]
	fn t_mismatch() {
		let fp = fingerprint();
		let mut body = record(&fp, 0xDEAD_BEEF, &ENTRIES_A);
		body.extend(record(&fp, 0xCAFE_F00D, &ENTRIES_B));

		let parsed = parse(&fp, &binary(body));
		assert_eq!(parsed.status, AccurateRipStatus::Mismatch);
		assert!(parsed.tracks.iter().all(Vec::is_empty), "Mismatched records should be skipped.");
	}

	#[test]
	fn t_found() {
		let fp = fingerprint();

		// One match.
		let parsed = parse(&fp, &binary(record(&fp, fp.accuraterip_id1(), &ENTRIES_A)));
		assert_eq!(parsed.status, AccurateRipStatus::Found);
		assert_eq!(parsed.tracks.len(), 4);
		for (entries, expected) in parsed.tracks.iter().zip(ENTRIES_A) {
			assert_eq!(entries.len(), 1, "Expected one entry per track.");
			assert_eq!(entries[0].confidence(), expected.0);
			assert_eq!(entries[0].checksum(), expected.1);
			assert_eq!(entries[0].checksum_450(), expected.2);
		}

		// A mismatch followed by two matches (and some trailing junk).
		let mut body = record(&fp, 1, &ENTRIES_B);
		body.extend(record(&fp, fp.accuraterip_id1(), &ENTRIES_A));
		body.extend(record(&fp, fp.accuraterip_id1(), &ENTRIES_B));
		body.extend_from_slice(&[1, 2, 3]);

		let parsed = parse(&fp, &binary(body));
		assert_eq!(parsed.status, AccurateRipStatus::Found, "Later matches should override mismatches.");
		for (idx, entries) in parsed.tracks.iter().enumerate() {
			assert_eq!(entries.len(), 2, "Expected two entries per track.");
			assert!(
				entries[0].confidence() >= entries[1].confidence(),
				"Entries should be sorted by confidence.",
			);
			let max = ENTRIES_A[idx].0.max(ENTRIES_B[idx].0);
			assert_eq!(entries[0].confidence(), max, "Wrong top entry for track {idx}.");
		}
	}

	#[test]
	fn t_is_html() {
		assert!(DbResponse::is_html("text/html", b"<html>"));
		assert!(! DbResponse::is_html(CONTENT_TYPE_BINARY, b"<html>"));
		assert!(! DbResponse::is_html("text/plain", &[0_u8; 128]));

		let mut late = vec![b' '; 100];
		late.extend_from_slice(b"html");
		assert!(! DbResponse::is_html("text/plain", &late), "Only the start should be checked.");
	}
}
