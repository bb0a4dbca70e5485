use std::collections::HashMap;

use bitflags::bitflags;

use ultraviolet::vec::{
	Vec2,
	Vec3
};

use meshio_core::{
	rtag4,
	scene::{
		Face,
		Mesh,
		z_up_to_y_up
	},
	tag4
};

use crate::anorms;

/// "IDP2" as written by little endian tools
pub const MAGIC: u32 = rtag4!(b"IDP2");
/// "IDP2" with its bytes reversed, as written by big endian tools
pub const MAGIC_BE: u32 = tag4!(b"IDP2");
pub const VERSION: i32 = 15;
pub const MAX_SKINS: i32 = 32;
pub const MAX_VERTICES: i32 = 2048;
pub const MAX_TRIANGLES: i32 = 4096;
pub const MAX_FRAMES: i32 = 512;

pub const HEADER_SIZE: usize = 17 * 4;
pub const SKIN_NAME_LEN: usize = 64;
pub const FRAME_NAME_LEN: usize = 16;
/// Scale, translation and name, preceding each frame's vertices
pub const FRAME_HEADER_SIZE: usize = 3 * 4 + 3 * 4 + FRAME_NAME_LEN;

bitflags! {
	pub struct ImportFlag: u32 {
		/// Convert lookup table normals from Z-up to Y-up
		const SWAP_NORMAL_YZ = 1;
		/// Only produce a mesh for the first frame
		const FIRST_FRAME_ONLY = 2;
	}
}

impl Default for ImportFlag {
	fn default() -> Self {
		ImportFlag::SWAP_NORMAL_YZ
	}
}

/// Field widths of the per-record data
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordLayout {
	/// id Software's layout: byte vertices and normal indices, 16-bit texture coordinates and
	/// triangle indices
	Packed,
	/// Every field stored as a 32-bit integer
	Wide,
}

impl RecordLayout {
	pub const fn vertex_size(self) -> usize {
		match self {
			RecordLayout::Packed => 4,
			RecordLayout::Wide => 4 * 4,
		}
	}

	pub const fn tex_coord_size(self) -> usize {
		match self {
			RecordLayout::Packed => 2 * 2,
			RecordLayout::Wide => 2 * 4,
		}
	}

	pub const fn triangle_size(self) -> usize {
		match self {
			RecordLayout::Packed => 6 * 2,
			RecordLayout::Wide => 6 * 4,
		}
	}

	/// Size of one frame holding `num_verts` vertices
	pub const fn frame_size(self, num_verts: usize) -> usize {
		FRAME_HEADER_SIZE + num_verts * self.vertex_size()
	}
}

impl Default for RecordLayout {
	fn default() -> Self {
		RecordLayout::Packed
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImportCfg {
	pub flags: ImportFlag,
	pub layout: RecordLayout,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Header {
	pub magic: u32,
	pub version: i32,
	pub skin_width: i32,
	pub skin_height: i32,
	pub frame_size: i32,
	pub num_skins: i32,
	pub num_verts: i32,
	pub num_tex_coords: i32,
	pub num_tris: i32,
	pub num_gl_cmds: i32,
	pub num_frames: i32,
	pub ofs_skins: i32,
	pub ofs_tex_coords: i32,
	pub ofs_tris: i32,
	pub ofs_frames: i32,
	pub ofs_gl_cmds: i32,
	pub ofs_end: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Skin {
	pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexCoord {
	pub s: i32,
	pub t: i32,
}

impl TexCoord {
	/// Normalises the texel coordinates against the skin size, flipping V
	pub fn uv(&self, skin_width: i32, skin_height: i32) -> Vec2 {
		Vec2::new(
			(self.s as f32) / (skin_width.max(1) as f32),
			1.0 - (self.t as f32) / (skin_height.max(1) as f32)
		)
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
	pub vertex_indices: [i32; 3],
	pub tex_coord_indices: [i32; 3],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
	pub v: [i32; 3],
	pub normal_index: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
	pub scale: Vec3,
	pub translate: Vec3,
	pub name: String,
	pub verts: Vec<Vertex>,
}

impl Frame {
	/// Rescales a quantized vertex into model space
	pub fn position(&self, vert: &Vertex) -> Vec3 {
		Vec3::new(
			(vert.v[0] as f32) * self.scale.x + self.translate.x,
			(vert.v[1] as f32) * self.scale.y + self.translate.y,
			(vert.v[2] as f32) * self.scale.z + self.translate.z
		)
	}

	/// Returns the vertex normal in the model's own Z-up space
	pub fn normal(&self, vert: &Vertex) -> Vec3 {
		anorms::lookup(vert.normal_index)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Md2Model {
	pub header: Header,
	pub skins: Vec<Skin>,
	pub tex_coords: Vec<TexCoord>,
	pub tris: Vec<Triangle>,
	pub frames: Vec<Frame>,
}

impl Md2Model {
	/// Builds the mesh of a single frame. Triangle indices outside the frame's vertices are
	/// clamped to its last vertex.
	///
	/// With texture coordinates present, a vertex is emitted once per distinct pair of vertex and
	/// texture coordinate index, so seams get split and `uvs` runs parallel to `positions`.
	pub fn frame_mesh(&self, index: usize, flags: ImportFlag) -> Option<Mesh> {
		let frame = self.frames.get(index)?;
		let mut mesh = Mesh::new(&frame.name);
		if frame.verts.is_empty() {
			return Some(mesh);
		}

		let nverts = frame.verts.len();
		let ntex = self.tex_coords.len();
		let mut corners: HashMap<(usize, usize), usize> = HashMap::new();

		for tri in self.tris.iter() {
			let mut face: Face = [0; 3];

			for (i, out) in face.iter_mut().enumerate() {
				let vi = clamp_index(tri.vertex_indices[i], nverts);
				if ntex == 0 {
					*out = vi;
					continue;
				}

				let ti = clamp_index(tri.tex_coord_indices[i], ntex);
				*out = *corners.entry((vi, ti)).or_insert_with(|| {
					mesh.uvs.push(self.tex_coords[ti].uv(self.header.skin_width,
						self.header.skin_height));
					push_vertex(&mut mesh, frame, &frame.verts[vi], flags);
					mesh.positions.len() - 1
				});
			}

			mesh.faces.push(face);
		}

		if ntex == 0 {
			for vert in frame.verts.iter() {
				push_vertex(&mut mesh, frame, vert, flags);
			}
		}

		Some(mesh)
	}
}

fn push_vertex(mesh: &mut Mesh, frame: &Frame, vert: &Vertex, flags: ImportFlag) {
	mesh.positions.push(frame.position(vert));

	let normal = frame.normal(vert);
	mesh.normals.push(if flags.contains(ImportFlag::SWAP_NORMAL_YZ) {
		z_up_to_y_up(normal)
	} else {
		normal
	});
}

fn clamp_index(index: i32, count: usize) -> usize {
	if index < 0 || index as usize >= count {
		count.saturating_sub(1)
	} else {
		index as usize
	}
}

/// Returns true if the buffer starts with either form of the MD2 signature
pub fn is_md2(buf: &[u8]) -> bool {
	if buf.len() < 4 {
		return false;
	}

	let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
	magic == MAGIC || magic == MAGIC_BE
}

#[cfg(feature = "import")]
pub mod import {
	use byteorder::LE;
	use thiserror::Error;

	use meshio_core::io_ext::{
		BinCursor,
		OutOfBounds
	};

	use super::*;

	#[derive(Debug, Error)]
	pub enum Md2ImportError {
		#[error("Model has no {0}")]
		EmptyModel(&'static str),
		#[error("Max number of allowed {what} exceeded: {count}/{max}")]
		LimitExceeded {
			what: &'static str,
			count: i32,
			max: i32,
		},
		#[error("Not an MD2 file: {0:#010x}")]
		Magic(u32),
		#[error("Truncated MD2 data: {source}")]
		Truncated {
			#[from]
			source: OutOfBounds,
		},
		#[error("Unknown/unsupported version: {0}")]
		Version(i32),
	}

	/// Rejects negative counts and counts above `max`
	fn check_count(what: &'static str, count: i32, max: i32) -> Result<usize, Md2ImportError> {
		if count < 0 || count > max {
			return Err(Md2ImportError::LimitExceeded {
				what: what,
				count: count,
				max: max,
			});
		}

		Ok(count as usize)
	}

	/// Seeks to a section once all of its records are known to lie inside the buffer
	fn seek_section(cur: &mut BinCursor, offset: i32, count: usize, record_size: usize)
		-> Result<(), Md2ImportError>
	{
		// Negative offsets wrap far past the end of any buffer
		let offset = offset as u32 as usize;

		cur.check(offset, count.saturating_mul(record_size))?;
		cur.seek(offset)?;

		Ok(())
	}

	impl Header {
		fn read(cur: &mut BinCursor) -> Result<Header, Md2ImportError> {
			let magic = cur.read_u32::<LE>()?;
			if magic != MAGIC && magic != MAGIC_BE {
				return Err(Md2ImportError::Magic(magic));
			}

			let version = cur.read_i32::<LE>()?;
			if version != VERSION {
				return Err(Md2ImportError::Version(version));
			}

			let header = Header {
				magic: magic,
				version: version,
				skin_width: cur.read_i32::<LE>()?,
				skin_height: cur.read_i32::<LE>()?,
				frame_size: cur.read_i32::<LE>()?,
				num_skins: cur.read_i32::<LE>()?,
				num_verts: cur.read_i32::<LE>()?,
				num_tex_coords: cur.read_i32::<LE>()?,
				num_tris: cur.read_i32::<LE>()?,
				num_gl_cmds: cur.read_i32::<LE>()?,
				num_frames: cur.read_i32::<LE>()?,
				ofs_skins: cur.read_i32::<LE>()?,
				ofs_tex_coords: cur.read_i32::<LE>()?,
				ofs_tris: cur.read_i32::<LE>()?,
				ofs_frames: cur.read_i32::<LE>()?,
				ofs_gl_cmds: cur.read_i32::<LE>()?,
				ofs_end: cur.read_i32::<LE>()?,
			};

			check_count("skins", header.num_skins, MAX_SKINS)?;
			check_count("texture coordinates", header.num_tex_coords, i32::MAX)?;

			if check_count("frames", header.num_frames, MAX_FRAMES)? == 0 {
				return Err(Md2ImportError::EmptyModel("frames"));
			}

			if check_count("vertices", header.num_verts, MAX_VERTICES)? == 0 {
				return Err(Md2ImportError::EmptyModel("vertices"));
			}

			if check_count("triangles", header.num_tris, MAX_TRIANGLES)? == 0 {
				return Err(Md2ImportError::EmptyModel("triangles"));
			}

			Ok(header)
		}
	}

	impl Skin {
		fn read(cur: &mut BinCursor) -> Result<Skin, Md2ImportError> {
			Ok(Skin {
				name: cur.read_fixed_str(SKIN_NAME_LEN)?,
			})
		}
	}

	impl TexCoord {
		fn read(cur: &mut BinCursor, layout: RecordLayout) -> Result<TexCoord, Md2ImportError> {
			Ok(match layout {
				RecordLayout::Packed => TexCoord {
					s: cur.read_i16::<LE>()? as i32,
					t: cur.read_i16::<LE>()? as i32,
				},
				RecordLayout::Wide => TexCoord {
					s: cur.read_i32::<LE>()?,
					t: cur.read_i32::<LE>()?,
				},
			})
		}
	}

	impl Triangle {
		fn read(cur: &mut BinCursor, layout: RecordLayout) -> Result<Triangle, Md2ImportError> {
			let mut indices = [0; 6];

			for i in indices.iter_mut() {
				*i = match layout {
					RecordLayout::Packed => cur.read_u16::<LE>()? as i32,
					RecordLayout::Wide => cur.read_i32::<LE>()?,
				};
			}

			Ok(Triangle {
				vertex_indices: [indices[0], indices[1], indices[2]],
				tex_coord_indices: [indices[3], indices[4], indices[5]],
			})
		}
	}

	impl Vertex {
		fn read(cur: &mut BinCursor, layout: RecordLayout) -> Result<Vertex, Md2ImportError> {
			Ok(match layout {
				RecordLayout::Packed => {
					let b = cur.take(4)?;

					Vertex {
						v: [b[0] as i32, b[1] as i32, b[2] as i32],
						normal_index: b[3] as i32,
					}
				},
				RecordLayout::Wide => Vertex {
					v: [cur.read_i32::<LE>()?, cur.read_i32::<LE>()?, cur.read_i32::<LE>()?],
					normal_index: cur.read_i32::<LE>()?,
				},
			})
		}
	}

	impl Frame {
		fn read(cur: &mut BinCursor, num_verts: usize, layout: RecordLayout)
			-> Result<Frame, Md2ImportError>
		{
			let scale = cur.read_vec3::<LE>()?;
			let translate = cur.read_vec3::<LE>()?;
			let name = cur.read_fixed_str(FRAME_NAME_LEN)?;

			let mut verts = Vec::with_capacity(num_verts);
			for _ in 0..num_verts {
				verts.push(Vertex::read(cur, layout)?);
			}

			Ok(Frame {
				scale: scale,
				translate: translate,
				name: name,
				verts: verts,
			})
		}
	}

	impl Md2Model {
		pub fn read(buf: &[u8], layout: RecordLayout) -> Result<Md2Model, Md2ImportError> {
			let mut cur = BinCursor::new(buf);
			let header = Header::read(&mut cur)?;

			let nverts = header.num_verts as usize;
			let frame_size = layout.frame_size(nverts);
			if header.frame_size as i64 != frame_size as i64 {
				tracing::warn!("MD2 header frame size {} differs from the computed {} bytes",
					header.frame_size, frame_size);
			}

			seek_section(&mut cur, header.ofs_frames, header.num_frames as usize, frame_size)?;
			let mut frames = Vec::with_capacity(header.num_frames as usize);
			for _ in 0..header.num_frames {
				frames.push(Frame::read(&mut cur, nverts, layout)?);
			}

			seek_section(&mut cur, header.ofs_tris, header.num_tris as usize, layout.triangle_size())?;
			let mut tris = Vec::with_capacity(header.num_tris as usize);
			for _ in 0..header.num_tris {
				tris.push(Triangle::read(&mut cur, layout)?);
			}

			let bad_indices = tris.iter()
				.flat_map(|tri| tri.vertex_indices.iter())
				.filter(|i| **i < 0 || **i as usize >= nverts)
				.count();
			if bad_indices > 0 {
				tracing::warn!("{} triangle vertex indices fall outside the {} vertices, clamping",
					bad_indices, nverts);
			}

			let mut skins = vec![];
			if header.num_skins > 0 {
				seek_section(&mut cur, header.ofs_skins, header.num_skins as usize, SKIN_NAME_LEN)?;
				for _ in 0..header.num_skins {
					skins.push(Skin::read(&mut cur)?);
				}
			}

			let mut tex_coords = vec![];
			if header.num_tex_coords > 0 {
				let ntex = header.num_tex_coords as usize;
				seek_section(&mut cur, header.ofs_tex_coords, ntex, layout.tex_coord_size())?;
				tex_coords.reserve(ntex);
				for _ in 0..ntex {
					tex_coords.push(TexCoord::read(&mut cur, layout)?);
				}
			}

			tracing::debug!("MD2: {} frames of {} vertices, {} triangles, {} skins", frames.len(),
				nverts, tris.len(), skins.len());

			Ok(Md2Model {
				header: header,
				skins: skins,
				tex_coords: tex_coords,
				tris: tris,
				frames: frames,
			})
		}
	}

}
