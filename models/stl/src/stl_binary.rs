use crate::stl::HEADER_SIZE;

/// Marks a material color in the header, as written by Materialise Magics
pub static COLOR_MARKER: &[u8] = b"COLOR=";
/// Bit of the attribute word flagging a 5-5-5 facet color in the remaining bits
pub const ATTR_HAS_COLOR: u16 = 0x8000;

#[cfg(feature = "import")]
pub mod import {
	use byteorder::LE;

	use meshio_core::{
		io_ext::BinCursor,
		scene::Mesh,
		texture::Color
	};

	use crate::stl::{
		BINARY_NAME,
		DEFAULT_COLOR,
		FACET_SIZE,
		ImportCfg,
		ImportFlag,
		import::StlImportError,
		PREAMBLE_SIZE
	};

	use super::*;

	/// Converts a color channel from the header's 0-255 float range
	#[inline]
	fn from_byte_range(channel: f32) -> f32 {
		channel * (1.0 / 255.0)
	}

	/// Searches the header for a `COLOR=` marker and reads the four floats following it
	pub fn header_color(header: &[u8]) -> Option<Color> {
		let pos = header.windows(COLOR_MARKER.len()).position(|w| w == COLOR_MARKER)?;

		let mut cur = BinCursor::new(header);
		let rgba = cur.seek(pos + COLOR_MARKER.len())
			.and_then(|_| Ok([cur.read_f32::<LE>()?, cur.read_f32::<LE>()?, cur.read_f32::<LE>()?,
				cur.read_f32::<LE>()?]));

		match rgba {
			Ok([r, g, b, a]) => Some(Color::new(from_byte_range(r), from_byte_range(g),
				from_byte_range(b), from_byte_range(a))),
			Err(e) => {
				tracing::warn!("STL: ignoring COLOR= block cut off by the end of the header: {}", e);
				None
			},
		}
	}

	pub fn read(buf: &[u8], cfg: &ImportCfg) -> Result<Mesh, StlImportError> {
		let mut cur = BinCursor::new(buf);
		cur.check(0, PREAMBLE_SIZE)?;

		let color = if cfg.flags.contains(ImportFlag::HEADER_COLOR) {
			header_color(&buf[..HEADER_SIZE])
		} else {
			None
		};

		cur.seek(HEADER_SIZE)?;
		let nfaces = cur.read_u32::<LE>()? as usize;
		cur.check(PREAMBLE_SIZE, nfaces.saturating_mul(FACET_SIZE))?;

		if nfaces == 0 {
			return Err(StlImportError::EmptyModel("facets"));
		}

		let mut mesh = Mesh::new(BINARY_NAME);
		mesh.positions.reserve(nfaces * 3);
		mesh.normals.reserve(nfaces * 3);

		let default_color = color.unwrap_or(DEFAULT_COLOR);
		let mut colors = vec![];

		for i in 0..nfaces {
			// Zero normals are left for a later normal generation step
			let normal = cur.read_vec3::<LE>()?;

			for _ in 0..3 {
				mesh.positions.push(cur.read_vec3::<LE>()?);
				mesh.normals.push(normal);
			}

			let attr = cur.read_u16::<LE>()?;
			if cfg.flags.contains(ImportFlag::ATTRIBUTE_COLORS) && attr & ATTR_HAS_COLOR != 0 {
				if colors.is_empty() {
					tracing::debug!("STL: facet {} starts per-facet colors", i);
					colors.resize(i * 3, default_color);
				}

				// Materialise files store red in the low bits, everyone else blue
				let facet_color = if color.is_some() {
					Color::from_rgb555(attr)
				} else {
					Color::from_bgr555(attr)
				};
				colors.extend_from_slice(&[facet_color; 3]);
			} else if !colors.is_empty() {
				colors.extend_from_slice(&[default_color; 3]);
			}
		}

		mesh.faces = Mesh::sequential_faces(mesh.positions.len());
		mesh.colors = colors;
		mesh.color = color;

		Ok(mesh)
	}

}

#[cfg(feature = "export")]
pub mod export {
	use byteorder::{
		LE,
		WriteBytesExt
	};

	use std::io::{
		self,
		Write
	};
	use thiserror::Error;

	use ultraviolet::vec::Vec3;

	use meshio_core::scene::Mesh;

	use super::*;

	static HEADER_TEXT: &[u8] = b"meshio binary STL ";

	#[derive(Debug, Error)]
	pub enum StlExportError {
		#[error("I/O error")]
		IO {
			#[from]
			source: io::Error,
		},
		#[error("Too many faces for a binary STL: {0}")]
		TooManyFaces(usize),
		#[error("Face {face} references missing vertex {index}")]
		VertexIndex {
			face: usize,
			index: usize,
		},
	}

	fn vec3<W>(v: Vec3, buf: &mut W) -> io::Result<()>
	where
		W: WriteBytesExt,
	{
		buf.write_f32::<LE>(v.x)?;
		buf.write_f32::<LE>(v.y)?;
		buf.write_f32::<LE>(v.z)
	}

	/// Writes a binary STL. Each facet takes the normal of its first vertex, and the mesh color
	/// goes into a `COLOR=` header block.
	pub fn write<W>(mesh: &Mesh, buf: &mut W) -> Result<(), StlExportError>
	where
		W: WriteBytesExt,
	{
		let nfaces = u32::try_from(mesh.faces.len())
			.map_err(|_| StlExportError::TooManyFaces(mesh.faces.len()))?;

		let mut header = HEADER_TEXT.to_vec();
		if let Some(c) = mesh.color {
			header.extend_from_slice(COLOR_MARKER);
			for channel in [c.red, c.green, c.blue, c.alpha] {
				header.write_f32::<LE>(channel * 255.0)?;
			}
		}
		header.resize(HEADER_SIZE, b' ');

		buf.write_all(&header)?;
		buf.write_u32::<LE>(nfaces)?;

		for (i, face) in mesh.faces.iter().enumerate() {
			if let Some(index) = face.iter().find(|v| **v >= mesh.positions.len()) {
				return Err(StlExportError::VertexIndex {
					face: i,
					index: *index,
				});
			}

			vec3(mesh.normals.get(face[0]).copied().unwrap_or_else(Vec3::zero), buf)?;
			for v in face.iter() {
				vec3(mesh.positions[*v], buf)?;
			}
			buf.write_u16::<LE>(0)?;
		}

		Ok(())
	}

	#[cfg(all(test, feature = "import"))]
	mod tests {
		use ultraviolet::vec::Vec3;

		use meshio_core::{
			scene::Mesh,
			texture::Color
		};

		use crate::stl::{
			classify,
			Format,
			ImportCfg,
			PREAMBLE_SIZE,
			FACET_SIZE
		};

		use super::*;

		fn sample() -> Mesh {
			let mut mesh = Mesh::new("part");
			mesh.positions = vec![
				Vec3::new(0.1, -3.5e-7, 1.0 / 3.0),
				Vec3::new(f32::MAX, f32::MIN_POSITIVE, -0.0),
				Vec3::new(12345.678, -9.87654, 2.0e30),
				Vec3::new(1.0, 2.0, 3.0),
				Vec3::new(4.0, 5.0, 6.0),
				Vec3::new(7.0, 8.0, 9.0),
			];
			let n0 = Vec3::new(0.267261, 0.534522, 0.801784);
			let n1 = Vec3::new(-1.0 / 3.0, 2.0 / 3.0, -2.0 / 3.0);
			mesh.normals = vec![n0, n0, n0, n1, n1, n1];
			mesh.faces = Mesh::sequential_faces(6);
			mesh
		}

		fn bits(v: &[Vec3]) -> Vec<[u32; 3]> {
			v.iter().map(|v| [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]).collect()
		}

		#[test]
		fn test_round_trip() {
			let mesh = sample();
			let mut buf = vec![];
			write(&mesh, &mut buf).unwrap();

			assert_eq!(buf.len(), PREAMBLE_SIZE + 2 * FACET_SIZE);
			assert_eq!(classify(&buf), Format::Binary);

			let decoded = crate::stl_binary::import::read(&buf, &ImportCfg::default()).unwrap();
			assert_eq!(bits(&decoded.positions), bits(&mesh.positions));
			assert_eq!(bits(&decoded.normals), bits(&mesh.normals));
			assert_eq!(decoded.faces, mesh.faces);
			assert_eq!(decoded.color, None);
		}

		#[test]
		fn test_color_round_trip() {
			let mut mesh = sample();
			mesh.color = Some(Color::new(1.0, 0.0, 0.0, 1.0));

			let mut buf = vec![];
			write(&mesh, &mut buf).unwrap();

			let decoded = crate::stl_binary::import::read(&buf, &ImportCfg::default()).unwrap();
			assert_eq!(decoded.color, mesh.color);
		}

		#[test]
		fn test_bad_index() {
			let mut mesh = sample();
			mesh.faces.push([0, 1, 6]);

			assert!(matches!(write(&mesh, &mut Vec::<u8>::new()),
				Err(StlExportError::VertexIndex { face: 2, index: 6 })));
		}
	}
}
