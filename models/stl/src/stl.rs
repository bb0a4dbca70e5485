use bitflags::bitflags;
use byteorder::LE;

use meshio_core::{
	io_ext::BinCursor,
	texture::Color
};

pub const HEADER_SIZE: usize = 80;
/// Header followed by the facet count
pub const PREAMBLE_SIZE: usize = HEADER_SIZE + 4;
/// Normal, three vertices and the attribute word
pub const FACET_SIZE: usize = 4 * 3 * 4 + 2;
/// Number of leading bytes that must be 7-bit clean for a file to count as ASCII
pub const ASCII_PROBE_LEN: usize = 500;
pub const MAX_NAME_LEN: usize = 1024;

pub const DEFAULT_COLOR: Color = Color::new(0.6, 0.6, 0.6, 1.0);
pub static ASCII_NAME: &str = "<STL_ASCII>";
pub static BINARY_NAME: &str = "<STL_BINARY>";
static SOLID: &[u8] = b"solid";

bitflags! {
	pub struct ImportFlag: u32 {
		/// Take the material color from a `COLOR=` block in the binary header
		const HEADER_COLOR = 1;
		/// Decode 5-5-5 facet colors stored in the attribute word
		const ATTRIBUTE_COLORS = 2;
	}
}

impl Default for ImportFlag {
	fn default() -> Self {
		ImportFlag::HEADER_COLOR | ImportFlag::ATTRIBUTE_COLORS
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImportCfg {
	pub flags: ImportFlag,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Format {
	Ascii,
	Binary,
	Unknown,
}

/// Tells binary from ASCII STL. Binary files carry no signature, so they are recognised by their
/// size matching the facet count exactly.
pub fn classify(buf: &[u8]) -> Format {
	if is_binary(buf) {
		Format::Binary
	} else if is_ascii(buf) {
		Format::Ascii
	} else {
		Format::Unknown
	}
}

fn is_binary(buf: &[u8]) -> bool {
	let mut cur = BinCursor::new(buf);
	if cur.seek(HEADER_SIZE).is_err() {
		return false;
	}

	match cur.read_u32::<LE>() {
		Ok(nfaces) => PREAMBLE_SIZE as u64 + nfaces as u64 * FACET_SIZE as u64 == buf.len() as u64,
		Err(_) => false,
	}
}

fn is_ascii(buf: &[u8]) -> bool {
	// Vertical tab is whitespace to the text decoder as well
	let start = match buf.iter().position(|b| !b.is_ascii_whitespace() && *b != 0x0b) {
		Some(start) => start,
		None => return false,
	};

	let text = &buf[start..];
	if text.len() <= SOLID.len() || !text.starts_with(SOLID) {
		return false;
	}

	let after = text[SOLID.len()];
	if !after.is_ascii_whitespace() && after != 0x0b {
		return false;
	}

	// Plenty of binary exporters begin their header with "solid" too
	buf[..buf.len().min(ASCII_PROBE_LEN)].is_ascii()
}

#[cfg(feature = "import")]
pub mod import {
	use thiserror::Error;

	use meshio_core::io_ext::OutOfBounds;

	#[derive(Debug, Error)]
	pub enum StlImportError {
		#[error("Model has no {0}")]
		EmptyModel(&'static str),
		#[error("Vertex count is not a multiple of 3: {0}")]
		InvalidVertexCount(usize),
		#[error("Malformed number: {0:?}")]
		MalformedNumber(String),
		#[error("Normal count {normals} doesn't match vertex count {positions}")]
		NormalMismatch {
			normals: usize,
			positions: usize,
		},
		#[error("Truncated STL data: {source}")]
		Truncated {
			#[from]
			source: OutOfBounds,
		},
		#[error("Neither an ASCII nor a binary STL file")]
		UnknownFormat,
	}
}
