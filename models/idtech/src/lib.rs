pub mod anorms;
pub mod md2;

#[cfg(feature = "import")]
use meshio_core::scene::Mesh;

#[cfg(feature = "import")]
use md2::{
	import::Md2ImportError,
	ImportCfg,
	ImportFlag,
	Md2Model
};

/// Decodes an MD2 model into one mesh per animation frame, or just the first frame when
/// [`ImportFlag::FIRST_FRAME_ONLY`] is set.
#[cfg(feature = "import")]
pub fn read(buf: &[u8], cfg: &ImportCfg) -> Result<Vec<Mesh>, Md2ImportError> {
	let model = Md2Model::read(buf, cfg.layout)?;

	let nframes = if cfg.flags.contains(ImportFlag::FIRST_FRAME_ONLY) {
		1
	} else {
		model.frames.len()
	};

	Ok((0..nframes).filter_map(|i| model.frame_mesh(i, cfg.flags)).collect())
}
