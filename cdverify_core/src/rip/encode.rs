/*!
# CD Verify: Encoders
*/

use crate::{
	CacheWriter,
	CdVerifyError,
	Track,
	WAVE_SPEC,
};
use hound::WavWriter;
use std::{
	fmt,
	io::Write,
	path::{
		Path,
		PathBuf,
	},
};



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Output Format.
pub enum OutputFormat {
	#[default]
	/// # WAV.
	Wav,

	/// # Raw PCM.
	Raw,
}

impl fmt::Display for OutputFormat {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl OutputFormat {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Wav => "WAV",
			Self::Raw => "raw PCM",
		}
	}

	#[must_use]
	/// # File Extension.
	pub const fn extension(self) -> &'static str {
		match self {
			Self::Wav => "wav",
			Self::Raw => "pcm",
		}
	}
}



/// # Track Encoder.
///
/// Encoders receive each track's data as a stream of raw 16-bit stereo PCM
/// buffers, in order, ending when the stream does. Buffers always hold whole
/// samples.
///
/// Each encoder runs in its own thread, so all it has to be is `Send`.
pub trait TrackEncoder: Send {
	/// # Format.
	fn format(&self) -> OutputFormat;

	/// # Encode Track.
	///
	/// Encode and save the track, returning the path to the file.
	///
	/// Data tracks are written verbatim regardless of format.
	///
	/// ## Errors
	///
	/// Implementations should return an error if the file cannot be written.
	fn encode(&mut self, track: &Track, src: &mut dyn Iterator<Item=Vec<u8>>)
	-> Result<PathBuf, CdVerifyError>;
}



#[derive(Debug, Clone)]
/// # WAV Encoder.
///
/// Save tracks as 16-bit stereo 44.1 kHz WAV files.
pub struct WavEncoder {
	dir: PathBuf,
}

impl WavEncoder {
	#[must_use]
	/// # New.
	///
	/// Files will be saved to `dir`.
	pub fn new<P>(dir: P) -> Self
	where P: AsRef<Path> {
		Self { dir: dir.as_ref().to_path_buf() }
	}
}

impl TrackEncoder for WavEncoder {
	fn format(&self) -> OutputFormat { OutputFormat::Wav }

	fn encode(&mut self, track: &Track, src: &mut dyn Iterator<Item=Vec<u8>>)
	-> Result<PathBuf, CdVerifyError> {
		let dst = self.dir.join(track.file_name(self.format()));
		if track.is_data() {
			write_raw(&dst, src)?;
			return Ok(dst);
		}

		let err = || CdVerifyError::Write(dst.to_string_lossy().into_owned());
		let mut writer = CacheWriter::new(&dst)?;
		{
			let mut wav = WavWriter::new(writer.writer(), WAVE_SPEC).map_err(|_| err())?;
			for buf in src {
				// In CD contexts, a sample is one L+R pair; for hound, L and R
				// are each their own sample.
				let len = u32::try_from(buf.len() / 2).map_err(|_| err())?;
				let mut w = wav.get_i16_writer(len);
				for pair in buf.chunks_exact(2) {
					w.write_sample(i16::from_le_bytes([pair[0], pair[1]]));
				}
				w.flush().map_err(|_| err())?;
			}
			wav.finalize().map_err(|_| err())?;
		}
		writer.finish()?;

		Ok(dst)
	}
}



#[derive(Debug, Clone)]
/// # Raw PCM Encoder.
///
/// Save tracks as headerless 16-bit little-endian stereo PCM.
pub struct RawEncoder {
	dir: PathBuf,
}

impl RawEncoder {
	#[must_use]
	/// # New.
	///
	/// Files will be saved to `dir`.
	pub fn new<P>(dir: P) -> Self
	where P: AsRef<Path> {
		Self { dir: dir.as_ref().to_path_buf() }
	}
}

impl TrackEncoder for RawEncoder {
	fn format(&self) -> OutputFormat { OutputFormat::Raw }

	fn encode(&mut self, track: &Track, src: &mut dyn Iterator<Item=Vec<u8>>)
	-> Result<PathBuf, CdVerifyError> {
		let dst = self.dir.join(track.file_name(self.format()));
		write_raw(&dst, src)?;
		Ok(dst)
	}
}



/// # Write Raw.
///
/// Write the bytes to `dst` as-are.
fn write_raw(dst: &Path, src: &mut dyn Iterator<Item=Vec<u8>>)
-> Result<(), CdVerifyError> {
	let mut writer = CacheWriter::new(dst)?;
	for buf in src {
		writer.writer()
			.write_all(&buf)
			.map_err(|_| CdVerifyError::Write(dst.to_string_lossy().into_owned()))?;
	}
	writer.finish()
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::TocEntry;

	/// # Test Samples.
	fn samples() -> Vec<Vec<u8>> {
		vec![
			[1_i16, -1, 300, -300].iter().flat_map(|v| v.to_le_bytes()).collect(),
			Vec::new(),
			[i16::MAX, i16::MIN].iter().flat_map(|v| v.to_le_bytes()).collect(),
		]
	}

	#[test]
	fn t_wav() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let track = Track::from(&TocEntry::new(3, 0, 0));
		let mut enc = WavEncoder::new(dir.path());

		let dst = enc.encode(&track, &mut samples().into_iter()).expect("Encode failed.");
		assert_eq!(dst, dir.path().join("track-03.wav"));

		let mut reader = hound::WavReader::open(&dst).expect("Unable to read WAV.");
		assert_eq!(reader.spec(), WAVE_SPEC);
		let data: Vec<i16> = reader.samples::<i16>()
			.collect::<Result<_, _>>()
			.expect("Bad samples.");
		assert_eq!(data, [1, -1, 300, -300, i16::MAX, i16::MIN]);
	}

	#[test]
	fn t_raw() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let mut enc = RawEncoder::new(dir.path());

		let track = Track::from(&TocEntry::new(12, 0, 0));
		let dst = enc.encode(&track, &mut samples().into_iter()).expect("Encode failed.");
		assert_eq!(dst, dir.path().join("track-12.pcm"));
		assert_eq!(
			std::fs::read(&dst).expect("Read failed."),
			samples().concat(),
		);

		// Data tracks are always binary.
		let track = Track::from(&TocEntry::new(2, 0, 0).with_data(true));
		let dst = WavEncoder::new(dir.path())
			.encode(&track, &mut samples().into_iter())
			.expect("Encode failed.");
		assert_eq!(dst, dir.path().join("track-02.bin"));
		assert_eq!(std::fs::read(&dst).expect("Read failed."), samples().concat());
	}
}
