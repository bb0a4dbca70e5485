pub mod stl;
pub mod stl_ascii;
pub mod stl_binary;

#[cfg(feature = "import")]
use meshio_core::scene::Mesh;

#[cfg(feature = "import")]
use stl::{
	classify,
	Format,
	ImportCfg,
	import::StlImportError
};

/// Detects the STL variant and decodes it. ASCII files that aren't valid UTF-8 past the probed
/// prefix are decoded lossily.
#[cfg(feature = "import")]
pub fn read(buf: &[u8], cfg: &ImportCfg) -> Result<Mesh, StlImportError> {
	match classify(buf) {
		Format::Binary => stl_binary::import::read(buf, cfg),
		Format::Ascii => stl_ascii::import::read(&String::from_utf8_lossy(buf)),
		Format::Unknown => Err(StlImportError::UnknownFormat),
	}
}
