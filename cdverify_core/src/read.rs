/*!
# CD Verify: Sector Reading
*/

use crate::{
	BYTES_PER_SECTOR,
	CdVerifyError,
	NULL_SECTOR,
};
use std::{
	fs::File,
	io::{
		Read,
		Seek,
		SeekFrom,
	},
	path::Path,
};



/// # Sector Buffer.
pub(crate) type SectorBuf = [u8; BYTES_PER_SECTOR as usize];



/// # Sector Reader.
///
/// This is the seam between CD Verify and whatever actually reads audio
/// sectors, be it a drive or an image file.
///
/// Error correction, retries, and the like are the reader's business; all
/// CD Verify needs to know is whether or not it got the data.
pub trait SectorReader {
	/// # Read Sector.
	///
	/// Read the raw audio data for the sector at `lsn` into `buf`, returning
	/// `true` on success. On failure the buffer contents are ignored and
	/// replaced with silence.
	fn read_sector(&mut self, lsn: i32, buf: &mut [u8; BYTES_PER_SECTOR as usize]) -> bool;
}

/// # In-Memory Reader.
///
/// A byte slice works as a disc image with sector zero at the very
/// beginning.
impl SectorReader for &[u8] {
	fn read_sector(&mut self, lsn: i32, buf: &mut SectorBuf) -> bool {
		let Some(from) = sector_pos(lsn) else { return false; };
		let Ok(from) = usize::try_from(from) else { return false; };
		let Some(src) = self.get(from..from + buf.len()) else { return false; };
		buf.copy_from_slice(src);
		true
	}
}



#[derive(Debug)]
/// # Image Reader.
///
/// Read sectors from a raw (headerless) disc image file containing 2352
/// bytes of audio per sector, starting with sector zero.
pub struct ImageReader {
	file: File,
	sectors: u64,
}

impl ImageReader {
	/// # New.
	///
	/// ## Errors
	///
	/// This will return an error if the file cannot be opened or its size
	/// isn't a multiple of the sector size.
	pub fn new<P>(src: P) -> Result<Self, CdVerifyError>
	where P: AsRef<Path> {
		let src = src.as_ref();
		let err = || CdVerifyError::Image(src.to_string_lossy().into_owned());

		let file = File::open(src).map_err(|_| err())?;
		let len = file.metadata().map_err(|_| err())?.len();
		let sector = u64::from(BYTES_PER_SECTOR);
		if len == 0 || len % sector != 0 { return Err(err()); }

		Ok(Self { file, sectors: len / sector })
	}

	#[must_use]
	/// # Total Sectors.
	pub const fn sectors(&self) -> u64 { self.sectors }
}

impl SectorReader for ImageReader {
	fn read_sector(&mut self, lsn: i32, buf: &mut SectorBuf) -> bool {
		let Some(pos) = sector_pos(lsn) else { return false; };
		if self.sectors <= pos / u64::from(BYTES_PER_SECTOR) { return false; }

		self.file.seek(SeekFrom::Start(pos)).is_ok() &&
		self.file.read_exact(buf).is_ok()
	}
}



/// # Read Or Silence.
///
/// Read a sector, replacing the data with silence if that doesn't work.
///
/// Returns `true` if the read succeeded.
pub(crate) fn read_or_silence<R>(reader: &mut R, lsn: i32, buf: &mut SectorBuf) -> bool
where R: SectorReader + ?Sized {
	if reader.read_sector(lsn, buf) { true }
	else {
		buf.copy_from_slice(&NULL_SECTOR);
		false
	}
}

/// # Sector Position.
///
/// Return the byte position of a sector within an image, if it can have
/// one.
fn sector_pos(lsn: i32) -> Option<u64> {
	u64::try_from(lsn).ok()?.checked_mul(u64::from(BYTES_PER_SECTOR))
}
