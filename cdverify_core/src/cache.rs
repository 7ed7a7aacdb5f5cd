/*!
# CD Verify: Cache
*/

use crate::{
	CACHE_BASE,
	CdVerifyError,
};
use fyi_msg::Msg;
use std::{
	io::BufWriter,
	path::{
		Path,
		PathBuf,
	},
	sync::OnceLock,
};
use tempfile::NamedTempFile;



/// # Cache Root.
///
/// This will ultimately hold `CWD/CACHE_BASE`.
static CACHE_ROOT: OnceLock<Option<PathBuf>> = OnceLock::new();

/// # Cache Path.
///
/// Glue `src` onto the cache path and return it.
///
/// ## Errors
///
/// This will return an error if the cache root cannot be established.
pub(crate) fn cache_path<P>(src: P) -> Result<PathBuf, CdVerifyError>
where P: AsRef<Path> {
	cache_root().map(|root| root.join(src))
}

/// # Read From Cache.
///
/// Read a file from the cache, if it exists and isn't empty.
///
/// Note: the path should be _relative_ to the cache root.
pub(crate) fn cache_read<P>(src: P) -> Option<Vec<u8>>
where P: AsRef<Path> {
	let src = cache_path(src).ok()?;
	std::fs::read(src).ok().filter(|v| ! v.is_empty())
}

/// # Cache Root.
///
/// Return the canonical cache root for the program, creating it if it doesn't
/// already exist.
///
/// ## Errors
///
/// This will return an error if the path cannot be determined or the current
/// working directory does not exist.
fn cache_root() -> Result<&'static Path, CdVerifyError> {
	let out = CACHE_ROOT.get_or_init(|| {
		// The base must already exist.
		let dir = std::env::current_dir().ok()?;
		if ! dir.is_dir() { return None; }

		// Our root.
		let dir = dir.join(CACHE_BASE);

		// Make it if necessary.
		if ! dir.is_dir() {
			std::fs::create_dir_all(&dir).ok()?;
		}

		// Make sure it is really there.
		std::fs::canonicalize(dir).ok()
	})
		.as_deref()
		.ok_or(CdVerifyError::Cache)?;

	if out.is_dir() { Ok(out) }
	// It seems to have vanished… try to recreate it.
	else {
		Msg::warning(format!("The {CACHE_BASE} cache directory has vanished!")).eprint();
		std::fs::create_dir_all(out).map_err(|_| CdVerifyError::Cache)?;
		if out.is_dir() { Ok(out) }
		else { Err(CdVerifyError::Cache) }
	}
}



/// # Atomic File Writer.
///
/// Data is written to a temporary file in the destination's directory, then
/// moved into place when [`CacheWriter::finish`] is called. If the writer is
/// dropped early, the temporary file is simply deleted, so a partial file can
/// never be mistaken for a complete one.
pub(crate) struct CacheWriter<'a> {
	dst: &'a Path,
	tmp: BufWriter<NamedTempFile>,
}

impl<'a> CacheWriter<'a> {
	/// # New.
	///
	/// ## Errors
	///
	/// This will return an error if the parent directory cannot be created or
	/// the temporary file cannot be opened.
	pub(crate) fn new(dst: &'a Path) -> Result<Self, CdVerifyError> {
		let err = || CdVerifyError::Write(dst.to_string_lossy().into_owned());
		let parent = dst.parent().ok_or_else(err)?;
		if ! parent.is_dir() {
			std::fs::create_dir_all(parent).map_err(|_| err())?;
		}

		let tmp = NamedTempFile::new_in(parent).map_err(|_| err())?;
		Ok(Self {
			dst,
			tmp: BufWriter::new(tmp),
		})
	}

	/// # Writer.
	pub(crate) fn writer(&mut self) -> &mut BufWriter<NamedTempFile> { &mut self.tmp }

	/// # Finish.
	///
	/// Flush the buffer and move the file into place.
	///
	/// ## Errors
	///
	/// This will return an error if the data cannot be flushed or the file
	/// cannot be renamed.
	pub(crate) fn finish(self) -> Result<(), CdVerifyError> {
		let err = || CdVerifyError::Write(self.dst.to_string_lossy().into_owned());
		let file = self.tmp.into_inner().map_err(|_| err())?;
		file.persist(self.dst).map_err(|_| err())?;
		Ok(())
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use std::io::Write;

	#[test]
	fn t_cache_writer() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("sub").join("file.bin");

		// Dropping early leaves nothing behind.
		{
			let mut writer = CacheWriter::new(&dst).expect("Writer failed.");
			writer.writer().write_all(b"partial").expect("Write failed.");
		}
		assert!(! dst.exists(), "Abandoned writes should not be saved.");

		let mut writer = CacheWriter::new(&dst).expect("Writer failed.");
		writer.writer().write_all(b"Hello World").expect("Write failed.");
		writer.finish().expect("Finish failed.");

		let saved = std::fs::read(&dst).expect("Read failed.");
		assert_eq!(saved, b"Hello World");
	}
}
