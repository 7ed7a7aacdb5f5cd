/*!
# CD Verify: Ripping

The rip runs as a single producer (reading sectors and crunching checksums on
the calling thread) feeding any number of encoder threads, each through its
own bounded queue.
*/

pub(super) mod encode;
mod log;
pub(super) mod opts;

use crate::{
	BYTES_PER_SECTOR,
	CdVerifyError,
	Disc,
	Fifo,
	FifoFlags,
	KillSwitch,
	NULL_SECTOR,
	read::read_or_silence,
	RipOptions,
	SectorReader,
	Track,
	TrackChecksum,
	TrackEncoder,
};
use dactyl::{
	NiceElapsed,
	NiceU32,
};
use fyi_msg::{
	Msg,
	Progless,
};
use log::RipLog;
use std::{
	path::PathBuf,
	sync::Arc,
	time::Instant,
};



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Rip Packet.
///
/// This is what gets sent to the encoders. Each track begins with a
/// [`RipPacket::Start`], followed by its data, and ends with a flush marker
/// (`None`). A flush marker with no open track ends the stream.
pub enum RipPacket {
	/// # Track Start.
	Start(Track),

	/// # Raw PCM Data.
	Samples(Vec<u8>),
}



#[derive(Debug)]
/// # Rip Manager.
///
/// This holds the disc and ripping options to coordinate the rip.
pub struct Ripper<'a> {
	disc: &'a mut Disc,
	opts: RipOptions,
}

impl<'a> Ripper<'a> {
	/// # New!
	///
	/// Initialize from a disc and options. If the disc layout hasn't been
	/// resolved yet, it will be resolved now.
	///
	/// ## Errors
	///
	/// This will return an error if the disc has nothing to rip or the
	/// sector total overflows.
	pub fn new(disc: &'a mut Disc, opts: &RipOptions) -> Result<Self, CdVerifyError> {
		if ! disc.is_resolved() { disc.resolve(opts)?; }
		if disc.tracks().is_empty() { return Err(CdVerifyError::Noop); }

		let out = Self { disc, opts: *opts };
		out.sectors()?;
		Ok(out)
	}

	/// # Total Sectors.
	///
	/// Return the number of sectors that will be read.
	fn sectors(&self) -> Result<u32, CdVerifyError> {
		self.disc.tracks()
			.iter()
			.try_fold(0_u32, |acc, t| acc.checked_add(t.read_window().sectors()))
			.ok_or(CdVerifyError::RipOverflow)
	}

	/// # Rip!
	///
	/// Read every track from the reader, calculate its checksums, and send
	/// the data off to each of the encoders.
	///
	/// Unreadable sectors are replaced with silence and counted. If the kill
	/// switch is flipped, the track in progress is flushed to the encoders
	/// as-is and the rip ends early; tracks that weren't finished won't have
	/// checksums.
	///
	/// ## Errors
	///
	/// Encoder errors are returned once all of the threads have finished.
	pub fn rip<R>(
		&mut self,
		reader: &mut R,
		encoders: &mut [Box<dyn TrackEncoder>],
		progress: &Progless,
		killed: &KillSwitch,
	) -> Result<RipSummary, CdVerifyError>
	where R: SectorReader + ?Sized {
		let now = Instant::now();
		let _res = progress.reset(self.sectors()?.max(1));

		// One queue per encoder.
		let capacity = i32::from(self.opts.fifo_capacity());
		let fifos: Vec<Arc<Fifo<RipPacket>>> = encoders.iter()
			.map(|_| {
				let fifo = Arc::new(Fifo::new(capacity, FifoFlags::BLOCK));
				killed.watch(&fifo);
				fifo
			})
			.collect();

		let (ripped, encoded) = std::thread::scope(|s| {
			let workers: Vec<_> = encoders.iter_mut()
				.zip(fifos.iter())
				.map(|(enc, fifo)| s.spawn(move || consume(fifo, enc.as_mut())))
				.collect();

			let ripped = self.produce(reader, &fifos, progress, killed);

			// End the stream. If the producer bailed mid-track, the first
			// marker closes that track and the second ends the stream.
			for fifo in &fifos {
				let _res = fifo.push(None);
				if ripped.is_err() { let _res = fifo.push(None); }
			}

			let encoded: Vec<Result<Vec<PathBuf>, CdVerifyError>> = workers.into_iter()
				.map(|w| w.join().unwrap_or(Err(CdVerifyError::Bug("Encoder thread panicked."))))
				.collect();

			(ripped, encoded)
		});

		progress.finish();

		let mut files = Vec::new();
		for res in encoded { files.extend(res?); }

		Ok(RipSummary {
			elapsed: now.elapsed().as_secs(),
			tracks: ripped?,
			bad_sectors: self.disc.tracks().iter().map(Track::bad_sectors).sum(),
			files,
			killed: killed.killed(),
		})
	}

	/// # Produce.
	///
	/// Read each track, updating its checksums and bad sector count, and
	/// queue the data for the encoders.
	///
	/// Returns the number of tracks read in full.
	fn produce<R>(
		&mut self,
		reader: &mut R,
		fifos: &[Arc<Fifo<RipPacket>>],
		progress: &Progless,
		killed: &KillSwitch,
	) -> Result<u8, CdVerifyError>
	where R: SectorReader + ?Sized {
		// Edge exclusions apply to the first and last physical audio tracks.
		let physical = |t: &Track| t.is_audio() && ! t.is_synthetic();
		let first = self.disc.tracks().iter().position(physical);
		let last = self.disc.tracks().iter().rposition(physical);

		let verbose = self.opts.verbose();
		if verbose { RipLog::header(self.disc); }
		let mut log = RipLog::new();

		let mut ripped = 0_u8;
		let mut sector = NULL_SECTOR;
		for (idx, track) in self.disc.tracks_mut().iter_mut().enumerate() {
			if killed.killed() { break; }

			set_progress_title(progress, track.number(), "Ripping…");
			if verbose { log.track(track); }
			send(fifos, &RipPacket::Start(track.clone()))?;

			let window = track.read_window();
			let mut chk = (! track.is_data()).then(|| TrackChecksum::new(
				track.samples(),
				Some(idx) == first,
				Some(idx) == last,
			));

			let mut skip = usize::from(window.partial_bytes());
			let mut remaining = track.bytes();
			let mut bad = 0_u32;
			for lsn in window.first_sector()..=window.last_sector() {
				if remaining == 0 || killed.killed() { break; }

				if window.is_silent(lsn) {
					sector.copy_from_slice(&NULL_SECTOR);
					if verbose { log.add_silent(); }
				}
				else if ! read_or_silence(reader, lsn, &mut sector) {
					bad += 1;
					if verbose { log.add_error(lsn); }
				}

				// Only keep the part belonging to this track.
				let mut data = &sector[skip..];
				skip = 0;
				if let Ok(max) = usize::try_from(remaining) {
					if max < data.len() { data = &data[..max]; }
				}
				remaining -= data.len() as u64;

				if let Some(chk) = chk.as_mut() { chk.update(data); }
				send(fifos, &RipPacket::Samples(data.to_vec()))?;
				progress.increment();
			}

			// Close out the track.
			for fifo in fifos { fifo.push(None)?; }

			track.bad_sectors = bad;
			if remaining == 0 {
				track.checksums = chk.map(TrackChecksum::finish);
				ripped += 1;
			}
		}

		Ok(ripped)
	}
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Rip Summary.
pub struct RipSummary {
	elapsed: u64,
	tracks: u8,
	bad_sectors: u32,
	files: Vec<PathBuf>,
	killed: bool,
}

impl RipSummary {
	#[must_use]
	/// # Bad Sectors.
	pub const fn bad_sectors(&self) -> u32 { self.bad_sectors }

	#[must_use]
	/// # Files Written.
	pub fn files(&self) -> &[PathBuf] { &self.files }

	#[must_use]
	/// # Killed?
	pub const fn killed(&self) -> bool { self.killed }

	#[must_use]
	/// # Tracks Ripped.
	pub const fn tracks(&self) -> u8 { self.tracks }

	/// # Summarize.
	///
	/// Print a few numbers for the rip as a whole.
	pub fn summarize(&self) {
		Msg::custom("Ripped", 199, &format!(
			"{} track{} in {}.",
			self.tracks,
			if self.tracks == 1 { "" } else { "s" },
			NiceElapsed::from(u32::try_from(self.elapsed).unwrap_or(u32::MAX)),
		))
			.with_newline(true)
			.eprint();

		if self.bad_sectors != 0 {
			Msg::warning(format!(
				"{} unreadable sector{} replaced with silence.",
				NiceU32::from(self.bad_sectors),
				if self.bad_sectors == 1 { " was" } else { "s were" },
			)).eprint();
		}

		if self.killed {
			Msg::warning("The rip was aborted before it finished.").eprint();
		}
	}
}



/// # Consume.
///
/// Pull packets off the queue and hand them to the encoder until the stream
/// ends, returning the paths of the files it saved.
///
/// If the encoder fails, the rest of the stream is drained anyway so the
/// producer doesn't get stuck; the first error is returned at the end.
///
/// The stream always ends with flush markers from the producer, even after an
/// interruption, so everything queued before then still makes it through.
fn consume(fifo: &Fifo<RipPacket>, enc: &mut dyn TrackEncoder)
-> Result<Vec<PathBuf>, CdVerifyError> {
	let mut out = Vec::new();
	let mut failed = None;

	loop {
		match pop(fifo) {
			Ok(Some(RipPacket::Start(track))) => {
				let mut src = TrackPackets(fifo);
				if failed.is_none() {
					match enc.encode(&track, &mut src) {
						Ok(dst) => { out.push(dst); },
						Err(e) => { failed.replace(e); },
					}
				}
				src.for_each(drop);
			},
			// Stray data; ignore it.
			Ok(Some(RipPacket::Samples(_))) => {},
			// The end.
			Ok(None) | Err(_) => break,
		}
	}

	match failed {
		Some(e) => Err(e),
		None => Ok(out),
	}
}

/// # Send.
///
/// Push a packet onto every queue.
fn send(fifos: &[Arc<Fifo<RipPacket>>], packet: &RipPacket)
-> Result<(), CdVerifyError> {
	for fifo in fifos {
		loop {
			match fifo.push(Some(packet)) {
				Ok(()) => break,
				// The queue is full and can no longer wait for room, but the
				// consumer is still draining it.
				Err(CdVerifyError::Killed) => { std::thread::yield_now(); },
				Err(e) => return Err(e),
			}
		}
	}
	Ok(())
}

/// # Pop.
///
/// Pop the next packet, retrying if an interrupted queue is momentarily
/// empty. The producer always finishes with flush markers, so this can't
/// spin forever.
fn pop(fifo: &Fifo<RipPacket>) -> Result<Option<RipPacket>, CdVerifyError> {
	loop {
		match fifo.pop() {
			Err(CdVerifyError::Killed) => { std::thread::yield_now(); },
			res => return res,
		}
	}
}

/// # Set Progress Title.
fn set_progress_title(progress: &Progless, idx: u8, msg: &str) {
	progress.set_title(Some(Msg::custom(
		format!("Track {idx:02}").as_str(),
		199,
		msg
	)));
}



/// # Track Packets.
///
/// Iterate over the data for the current track, stopping at the flush
/// marker.
struct TrackPackets<'a>(&'a Fifo<RipPacket>);

impl Iterator for TrackPackets<'_> {
	type Item = Vec<u8>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			match pop(self.0) {
				Ok(Some(RipPacket::Samples(v))) => {
					if ! v.is_empty() { return Some(v); }
				},
				Ok(Some(RipPacket::Start(_)) | None) | Err(_) => return None,
			}
		}
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		OutputFormat,
		RawEncoder,
		ReadOffset,
		TocEntry,
		WavEncoder,
	};

	/// # Noise.
	fn noise(len: usize) -> Vec<u8> {
		let mut seed = 0xDEAD_BEEF_u32;
		let mut out = Vec::with_capacity(len);
		while out.len() < len {
			seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
			out.extend_from_slice(&seed.to_le_bytes());
		}
		out.truncate(len);
		out
	}

	const ENTRIES: [TocEntry; 2] = [
		TocEntry::new(1, 0, 19),
		TocEntry::new(2, 20, 49),
	];

	#[test]
	fn t_rip() {
		let sector = usize::from(BYTES_PER_SECTOR);
		let image = noise(50 * sector);
		let dir = tempfile::tempdir().expect("Tempdir failed.");

		// Compute the expected checksums independently.
		let expected: Vec<_> = [(0_usize, 20_usize, true, false), (20, 30, false, true)]
			.into_iter()
			.map(|(start, len, first, last)| {
				let mut chk = TrackChecksum::new(len as u64 * 588, first, last);
				chk.update(&image[start * sector..(start + len) * sector]);
				chk.finish()
			})
			.collect();

		let mut disc = Disc::new(&ENTRIES, 0, 49).expect("Disc failed.");
		let opts = RipOptions::default().with_fifo_capacity(1);
		let mut encoders: Vec<Box<dyn TrackEncoder>> = vec![
			Box::new(WavEncoder::new(dir.path())),
			Box::new(RawEncoder::new(dir.path())),
		];

		let mut reader: &[u8] = &image;
		let summary = Ripper::new(&mut disc, &opts)
			.and_then(|mut r| r.rip(&mut reader, &mut encoders, &Progless::default(), &KillSwitch::default()))
			.expect("Rip failed.");

		assert_eq!(summary.tracks(), 2);
		assert_eq!(summary.bad_sectors(), 0);
		assert_eq!(summary.files().len(), 4);
		assert!(! summary.killed());

		for (t, chk) in disc.tracks().iter().zip(expected) {
			assert_eq!(t.checksums(), Some(chk), "Track {} checksum mismatch.", t.number());
		}

		// The raw copies should match the image exactly.
		let raw = std::fs::read(dir.path().join("track-02.pcm")).expect("Read failed.");
		assert_eq!(raw, &image[20 * sector..]);
		assert!(dir.path().join(disc.tracks()[0].file_name(OutputFormat::Wav)).is_file());
	}

	#[test]
	fn t_rip_offset() {
		let sector = usize::from(BYTES_PER_SECTOR);
		let truth = noise(50 * sector);
		let dir = tempfile::tempdir().expect("Tempdir failed.");

		// Simulate a drive that reads 30 samples late.
		let mut image = vec![0_u8; 120];
		image.extend_from_slice(&truth[..truth.len() - 120]);

		let mut disc = Disc::new(&ENTRIES, 0, 49).expect("Disc failed.");
		let opts = RipOptions::default()
			.with_offset(ReadOffset::try_from(30_i16).expect("Bad offset."));
		let mut encoders: Vec<Box<dyn TrackEncoder>> = vec![Box::new(RawEncoder::new(dir.path()))];

		let mut reader: &[u8] = &image;
		let summary = Ripper::new(&mut disc, &opts)
			.and_then(|mut r| r.rip(&mut reader, &mut encoders, &Progless::default(), &KillSwitch::default()))
			.expect("Rip failed.");
		assert_eq!(summary.tracks(), 2);

		// The first track comes back exactly.
		let raw = std::fs::read(dir.path().join("track-01.pcm")).expect("Read failed.");
		assert_eq!(raw, &truth[..20 * sector]);

		// The last track's tail falls off the end of the disc, so is silent.
		let raw = std::fs::read(dir.path().join("track-02.pcm")).expect("Read failed.");
		assert_eq!(raw.len(), 30 * sector);
		assert_eq!(&raw[..29 * sector], &truth[20 * sector..49 * sector]);
	}

	#[test]
	fn t_rip_bad_sectors() {
		let sector = usize::from(BYTES_PER_SECTOR);

		// The image is missing the last five sectors.
		let image = noise(45 * sector);
		let dir = tempfile::tempdir().expect("Tempdir failed.");

		let mut disc = Disc::new(&ENTRIES, 0, 49).expect("Disc failed.");
		let mut encoders: Vec<Box<dyn TrackEncoder>> = vec![Box::new(RawEncoder::new(dir.path()))];
		let mut reader: &[u8] = &image;
		let summary = Ripper::new(&mut disc, &RipOptions::default())
			.and_then(|mut r| r.rip(&mut reader, &mut encoders, &Progless::default(), &KillSwitch::default()))
			.expect("Rip failed.");

		assert_eq!(summary.bad_sectors(), 5);
		assert_eq!(disc.tracks()[0].bad_sectors(), 0);
		assert_eq!(disc.tracks()[1].bad_sectors(), 5);

		let raw = std::fs::read(dir.path().join("track-02.pcm")).expect("Read failed.");
		assert!(raw[25 * sector..].iter().all(|&b| b == 0), "Bad sectors should be silent.");
	}

	#[test]
	fn t_rip_killed() {
		let sector = usize::from(BYTES_PER_SECTOR);
		let image = noise(50 * sector);
		let dir = tempfile::tempdir().expect("Tempdir failed.");

		let killed = KillSwitch::default();
		killed.kill();

		let mut disc = Disc::new(&ENTRIES, 0, 49).expect("Disc failed.");
		let mut encoders: Vec<Box<dyn TrackEncoder>> = vec![Box::new(RawEncoder::new(dir.path()))];
		let mut reader: &[u8] = &image;
		let summary = Ripper::new(&mut disc, &RipOptions::default())
			.and_then(|mut r| r.rip(&mut reader, &mut encoders, &Progless::default(), &killed))
			.expect("Rip failed.");

		assert!(summary.killed());
		assert_eq!(summary.tracks(), 0);
		assert!(disc.tracks().iter().all(|t| t.checksums().is_none()));
	}

	/// # Sabotaged Reader.
	///
	/// This flips the kill switch while reading a particular sector.
	struct KillingReader {
		image: Vec<u8>,
		kill_at: i32,
		killed: KillSwitch,
	}

	impl SectorReader for KillingReader {
		fn read_sector(&mut self, lsn: i32, buf: &mut [u8; BYTES_PER_SECTOR as usize]) -> bool {
			if lsn == self.kill_at { self.killed.kill(); }
			let mut image: &[u8] = &self.image;
			image.read_sector(lsn, buf)
		}
	}

	#[test]
	fn t_rip_killed_mid_track() {
		let sector = usize::from(BYTES_PER_SECTOR);
		let image = noise(50 * sector);
		let dir = tempfile::tempdir().expect("Tempdir failed.");

		let killed = KillSwitch::default();
		let mut reader = KillingReader {
			image: image.clone(),
			kill_at: 9,
			killed: killed.clone(),
		};

		// Tiny queues make it likely the producer is waiting on one when the
		// switch flips.
		let mut disc = Disc::new(&ENTRIES, 0, 49).expect("Disc failed.");
		let opts = RipOptions::default().with_fifo_capacity(1);
		let mut encoders: Vec<Box<dyn TrackEncoder>> = vec![
			Box::new(RawEncoder::new(dir.path())),
			Box::new(WavEncoder::new(dir.path())),
		];
		let summary = Ripper::new(&mut disc, &opts)
			.and_then(|mut r| r.rip(&mut reader, &mut encoders, &Progless::default(), &killed))
			.expect("Rip failed.");

		assert!(summary.killed());
		assert_eq!(summary.tracks(), 0, "No track should have finished.");
		assert_eq!(summary.files().len(), 2, "Only the first track should have been saved.");
		assert!(disc.tracks().iter().all(|t| t.checksums().is_none()));

		// The partial track should have everything read up to the kill.
		let raw = std::fs::read(dir.path().join("track-01.pcm")).expect("Read failed.");
		assert_eq!(raw, &image[..10 * sector], "Partial track is incomplete.");

		let wav = hound::WavReader::open(dir.path().join("track-01.wav"))
			.expect("Unable to read WAV.");
		assert_eq!(wav.len() as usize, 10 * sector / 2, "Partial WAV is incomplete.");

		assert!(! dir.path().join("track-02.pcm").exists(), "Track two shouldn't exist.");
	}

	#[test]
	fn t_rip_zero_capacity() {
		let sector = usize::from(BYTES_PER_SECTOR);
		let image = noise(50 * sector);
		let dir = tempfile::tempdir().expect("Tempdir failed.");

		let mut disc = Disc::new(&ENTRIES, 0, 49).expect("Disc failed.");
		let opts = RipOptions::default().with_fifo_capacity(0);
		let mut encoders: Vec<Box<dyn TrackEncoder>> = vec![Box::new(RawEncoder::new(dir.path()))];
		let mut reader: &[u8] = &image;
		let summary = Ripper::new(&mut disc, &opts)
			.and_then(|mut r| r.rip(&mut reader, &mut encoders, &Progless::default(), &KillSwitch::default()))
			.expect("Rip failed.");

		assert_eq!(summary.tracks(), 2);
		let raw = std::fs::read(dir.path().join("track-01.pcm")).expect("Read failed.");
		assert_eq!(raw, &image[..20 * sector]);
	}
}
