/*!
# CD Verify
*/

#![forbid(unsafe_code)]

#![deny(
	clippy::allow_attributes_without_reason,
	clippy::correctness,
	unreachable_pub,
)]

#![warn(
	clippy::complexity,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::style,

	clippy::allow_attributes,
	clippy::clone_on_ref_ptr,
	clippy::create_dir,
	clippy::filetype_is_file,
	clippy::format_push_string,
	clippy::get_unwrap,
	clippy::impl_trait_in_params,
	clippy::lossy_float_literal,
	clippy::missing_assert_message,
	clippy::missing_docs_in_private_items,
	clippy::needless_raw_strings,
	clippy::panic_in_result_fn,
	clippy::pub_without_shorthand,
	clippy::rest_pat_in_fully_bound_structs,
	clippy::semicolon_inside_block,
	clippy::str_to_string,
	clippy::string_to_string,
	clippy::todo,
	clippy::undocumented_unsafe_blocks,
	clippy::unneeded_field_pattern,
	clippy::unseparated_literal_suffix,
	clippy::unwrap_in_result,

	macro_use_extern_crate,
	missing_copy_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![expect(clippy::redundant_pub_crate, reason = "Unresolvable.")]



mod cli;

use cdtoc::Toc;
use cdverify_core::{
	CdVerifyError,
	Disc,
	find_offset,
	HttpLookup,
	ImageReader,
	KillSwitch,
	OffsetSearch,
	OutputFormat,
	RawEncoder,
	Ripper,
	TrackEncoder,
	TrackVerdict,
	WavEncoder,
};
use cli::Settings;
use dactyl::NiceU32;
use fyi_ansi::dim;
use fyi_msg::{
	Msg,
	Progless,
};
use oxford_join::JoinFmt;
use std::{
	path::Path,
	process::ExitCode,
};



/// # Main.
///
/// This lets us bubble up startup errors so they can be pretty-printed.
fn main() -> ExitCode {
	match main__() {
		Ok(()) => ExitCode::SUCCESS,
		Err(e @ (CdVerifyError::PrintHelp | CdVerifyError::PrintVersion)) => {
			println!("{e}");
			ExitCode::SUCCESS
		},
		Err(e) => {
			Msg::from(e).eprint();
			ExitCode::FAILURE
		},
	}
}

#[inline]
/// # Actual Main.
///
/// This does all the stuff.
fn main__() -> Result<(), CdVerifyError> {
	let Settings {
		mut opts,
		toc,
		gaps,
		image,
		dir,
		formats,
		find_offset: find,
		no_rip,
	} = cli::parse()?;

	// Build the disc.
	let toc = Toc::from_cdtoc(toc.trim())?;
	let mut disc = Disc::from_cdtoc(&toc, &gaps)?;

	// CTRL+C should stop things gracefully rather than immediately.
	let killed = KillSwitch::default();
	{
		let killed = killed.clone();
		ctrlc::set_handler(move || { killed.kill(); })
			.map_err(|_| CdVerifyError::Bug("unable to intercept CTRL+C"))?;
	}

	// AccurateRip data only depends on the physical layout, so it can be
	// grabbed before the pregap directives are applied.
	if opts.accuraterip() {
		disc.accuraterip(&HttpLookup, opts.cache());
	}

	// Open the image, if any.
	let mut reader = match image {
		Some(src) if ! no_rip || find => Some(ImageReader::new(src)?),
		_ => None,
	};

	// Offset discovery.
	if find {
		if let Some(reader) = reader.as_mut() {
			let prior = Some(opts.offset()).filter(|o| o.samples() != 0);
			let res = find_offset(&disc, reader, prior, &killed);
			match res {
				OffsetSearch::Found { offset, .. } => {
					Msg::success(res.to_string()).eprint();
					opts = opts.with_offset(offset);
				},
				OffsetSearch::NotFound => {
					Msg::warning(format!(
						"{res} Using the {} default.",
						opts.offset(),
					)).eprint();
				},
				OffsetSearch::Incomplete => return Err(CdVerifyError::Killed),
			}
		}
	}

	// Resolve and summarize.
	disc.resolve(&opts)?;
	eprintln!("{disc}");
	for note in disc.notes() {
		Msg::custom("Layout", 13, &note.to_string()).with_newline(true).eprint();
	}

	// That may be all we need to do.
	let Some(mut reader) = reader.filter(|_| ! no_rip) else { return Ok(()); };
	if killed.killed() { return Err(CdVerifyError::Killed); }

	// Rip it!
	std::fs::create_dir_all(&dir)
		.map_err(|_| CdVerifyError::Write(dir.to_string_lossy().into_owned()))?;
	let mut encoders: Vec<Box<dyn TrackEncoder>> = formats.iter()
		.map(|f| match f {
			OutputFormat::Wav => Box::new(WavEncoder::new(&dir)) as Box<dyn TrackEncoder>,
			OutputFormat::Raw => Box::new(RawEncoder::new(&dir)),
		})
		.collect();
	let progress = Progless::default();
	let summary = Ripper::new(&mut disc, &opts)?
		.rip(&mut reader, &mut encoders, &progress, &killed)?;
	summary.summarize();

	// Save the cue sheets.
	for format in formats {
		save_cue(&disc, &dir, format)?;
	}

	// Report the verdicts.
	if opts.accuraterip() {
		report(&disc.verify(opts.confidence()));
	}

	if summary.killed() { Err(CdVerifyError::Killed) }
	else { Ok(()) }
}

/// # Save Cue Sheet.
///
/// Write a cue sheet for the format alongside the tracks.
fn save_cue(disc: &Disc, dir: &Path, format: OutputFormat) -> Result<(), CdVerifyError> {
	let cddb = disc.fingerprint().map_or(0, |fp| fp.cddb_id());
	let dst = dir.join(format!("{cddb:08x}-{}.cue", format.extension()));
	std::fs::write(&dst, disc.cue_sheet(format))
		.map_err(|_| CdVerifyError::Write(dst.to_string_lossy().into_owned()))?;

	Msg::custom("Saved", 199, &format!(
		concat!("{} cue sheet ", dim!("("), "{}", dim!(")")),
		format.as_str(),
		dst.display(),
	))
		.with_newline(true)
		.eprint();

	Ok(())
}

/// # Report Verdicts.
///
/// Print each track's verification verdict, followed by a one-line summary.
fn report(verdicts: &[(u8, TrackVerdict)]) {
	let mut bad = Vec::new();
	for &(num, verdict) in verdicts {
		let line = format!("Track #{num:02} {verdict}.");
		let msg = match verdict {
			TrackVerdict::Accurate(_) => Msg::success(line),
			TrackVerdict::NotVerifiable => Msg::custom("Skipped", 11, &line).with_newline(true),
			_ => {
				bad.push(num);
				Msg::warning(line)
			},
		};
		msg.eprint();
	}

	let good = verdicts.iter().filter(|(_, v)| v.is_accurate()).count();
	if bad.is_empty() {
		if good != 0 {
			Msg::success(format!(
				"{} track{} verified.",
				NiceU32::from(u32::try_from(good).unwrap_or(u32::MAX)),
				if good == 1 { "" } else { "s" },
			)).eprint();
		}
	}
	else {
		Msg::warning(format!(
			"Unable to verify track{} {}.",
			if bad.len() == 1 { "" } else { "s" },
			JoinFmt::new(bad.iter(), ", "),
		)).eprint();
	}
}
