/*!
# CD Verify: Build
*/

use argyle::KeyWordsBuilder;
use std::path::PathBuf;



/// # Set Up CLI Arguments.
fn main() {
	println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");

	let mut builder = KeyWordsBuilder::default();
	builder.push_keys([
		"--find-offset",
		"-h", "--help",
		"--no-accuraterip",
		"--no-cache",
		"--no-rip",
		"--overread",
		"--raw",
		"-v", "--verbose",
		"-V", "--version",
		"--wav",
	]);
	builder.push_keys_with_values([
		"--confidence",
		"-d", "--dir",
		"--gap",
		"-i", "--image",
		"-o", "--offset",
		"--pregap",
		"--toc",
	]);
	builder.save(out_path("argyle.rs"));
}

/// # Output Path.
///
/// Append the sub-path to OUT_DIR and return it.
fn out_path(stub: &str) -> PathBuf {
	std::fs::canonicalize(std::env::var("OUT_DIR").expect("Missing OUT_DIR."))
		.expect("Missing OUT_DIR.")
		.join(stub)
}
