#[cfg(feature = "import")]
pub mod import {
	use nom::{
		bytes::complete::tag,
		error::Error,
		IResult,
		sequence::preceded
	};

	use ultraviolet::vec::Vec3;

	use meshio_core::{
		io_ext::OutOfBounds,
		nom_ext::{
			float_token,
			inline_token,
			token,
			ws
		},
		scene::Mesh
	};

	use crate::stl::{
		ASCII_NAME,
		import::StlImportError,
		MAX_NAME_LEN
	};

	/// Whitespace-delimited tokens of the text following the `solid` line
	struct Tokens<'a> {
		rest: &'a str,
		text_len: usize,
	}

	impl<'a> Tokens<'a> {
		fn peek(&self) -> Option<&'a str> {
			token::<Error<&str>>(self.rest).ok().map(|(_, tok)| tok)
		}

		/// Error for running out of tokens
		fn exhausted(&self) -> StlImportError {
			StlImportError::from(OutOfBounds {
				offset: self.text_len,
				wanted: 1,
				len: self.text_len,
			})
		}

		fn vec3(&mut self) -> Result<Vec3, StlImportError> {
			let mut xyz = [0.0; 3];

			for c in xyz.iter_mut() {
				let tok = self.next().ok_or_else(|| self.exhausted())?;
				*c = float_token(tok).ok_or_else(|| StlImportError::MalformedNumber(tok.to_string()))?;
			}

			Ok(Vec3::new(xyz[0], xyz[1], xyz[2]))
		}
	}

	impl<'a> Iterator for Tokens<'a> {
		type Item = &'a str;

		fn next(&mut self) -> Option<&'a str> {
			let (rest, tok) = token::<Error<&str>>(self.rest).ok()?;
			self.rest = rest;
			Some(tok)
		}
	}

	/// Scan state. Only `facet`, `vertex` and `endsolid` drive it, so `outer loop`, `endloop` and
	/// `endfacet` may be missing or unbalanced.
	#[derive(Debug, Default)]
	struct FacetState {
		facet_vertex_count: usize,
		positions: Vec<Vec3>,
		normals: Vec<Vec3>,
	}

	impl FacetState {
		fn begin_facet(&mut self, tokens: &mut Tokens) -> Result<(), StlImportError> {
			if self.facet_vertex_count != 0 && self.facet_vertex_count != 3 {
				tracing::warn!("STL: facet with {} vertices, expected 3", self.facet_vertex_count);
			}
			self.facet_vertex_count = 0;

			if tokens.peek() == Some("normal") {
				tokens.next();
			} else {
				tracing::warn!("STL: normal keyword missing after facet");
			}

			let normal = tokens.vec3()?;
			self.normals.extend_from_slice(&[normal; 3]);

			Ok(())
		}

		fn add_vertex(&mut self, tokens: &mut Tokens) -> Result<(), StlImportError> {
			if self.facet_vertex_count >= 3 {
				// The coordinates are skipped over as unknown tokens
				tracing::warn!("STL: facet with more than 3 vertices, ignoring the extra vertex");
				return Ok(());
			}

			self.positions.push(tokens.vec3()?);
			self.facet_vertex_count += 1;

			Ok(())
		}

		fn finish(self, name: &str) -> Result<Mesh, StlImportError> {
			if self.positions.is_empty() {
				return Err(StlImportError::EmptyModel("vertices"));
			}

			if self.positions.len() % 3 != 0 {
				return Err(StlImportError::InvalidVertexCount(self.positions.len()));
			}

			if self.normals.len() != self.positions.len() {
				return Err(StlImportError::NormalMismatch {
					normals: self.normals.len(),
					positions: self.positions.len(),
				});
			}

			let mut mesh = Mesh::new(name);
			mesh.faces = Mesh::sequential_faces(self.positions.len());
			mesh.positions = self.positions;
			mesh.normals = self.normals;

			Ok(mesh)
		}
	}

	/// Keywords that can't be a solid's name, for files written on a single line
	static KEYWORDS: &[&str] = &["facet", "endsolid"];

	pub fn read(text: &str) -> Result<Mesh, StlImportError> {
		let solid: IResult<&str, &str, Error<&str>> = preceded(ws, tag("solid"))(text);
		let (body, _) = solid.map_err(|_| StlImportError::UnknownFormat)?;
		if !body.chars().next().map_or(true, char::is_whitespace) {
			return Err(StlImportError::UnknownFormat);
		}

		let (body, name) = match inline_token::<Error<&str>>(body) {
			Ok((rest, Some(name))) if !KEYWORDS.contains(&name) => (rest, Some(name)),
			_ => (body, None),
		};
		let name = name.filter(|n| n.len() < MAX_NAME_LEN).unwrap_or(ASCII_NAME);

		let mut tokens = Tokens {
			rest: body,
			text_len: text.len(),
		};
		let mut state = FacetState::default();

		loop {
			match tokens.next() {
				Some("facet") => state.begin_facet(&mut tokens)?,
				Some("vertex") => state.add_vertex(&mut tokens)?,
				Some("endsolid") => break,
				Some(_) => {},
				None => return Err(tokens.exhausted()),
			}
		}

		state.finish(name)
	}

	#[cfg(test)]
	mod tests {
		use std::fs;

		use ultraviolet::vec::Vec3;

		use super::*;

		static CUBE: &str = "solid cube\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\n\
			vertex 0 1 0\nendloop\nendfacet\nendsolid cube\n";

		#[test]
		fn test_read() {
			let mesh = read(CUBE).unwrap();

			assert_eq!(mesh.name.as_deref(), Some("cube"));
			assert_eq!(mesh.positions, vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0),
				Vec3::new(0.0, 1.0, 0.0)]);
			assert_eq!(mesh.normals, vec![Vec3::new(0.0, 0.0, 1.0); 3]);
			assert_eq!(mesh.faces, vec![[0, 1, 2]]);
			assert_eq!(mesh.color, None);
		}

		#[test]
		fn test_read_file() {
			let data = fs::read("test_data/tetrahedron.stl").unwrap();
			let mesh = read(&String::from_utf8_lossy(&data)).unwrap();

			assert_eq!(mesh.name.as_deref(), Some("tetrahedron"));
			assert_eq!(mesh.positions.len(), 12);
			assert_eq!(mesh.faces.len(), 4);
			assert_eq!(mesh.normals[11], Vec3::new(0.577350, 0.577350, 0.577350));
			assert_eq!(mesh.positions[11], Vec3::new(0.0, 0.0, 1.0));
		}

		#[test]
		fn test_missing_endsolid() {
			let text = CUBE.replace("endsolid cube\n", "");
			assert!(matches!(read(&text), Err(StlImportError::Truncated { .. })));

			let text = "solid cube\nfacet normal 0 0 1\nouter loop\nvertex 0 0";
			assert!(matches!(read(text), Err(StlImportError::Truncated { .. })));
		}

		#[test]
		fn test_malformed_number() {
			let text = CUBE.replace("vertex 1 0 0", "vertex 1 zero 0");
			assert!(matches!(read(&text), Err(StlImportError::MalformedNumber(s)) if s == "zero"));

			// Without the normal keyword the next tokens must still be numbers
			let text = CUBE.replace("facet normal 0 0 1", "facet outer");
			assert!(matches!(read(&text), Err(StlImportError::MalformedNumber(_))));
		}

		#[test]
		fn test_missing_normal_keyword() {
			let text = CUBE.replace("facet normal 0 0 1", "facet 0 0 -1");
			let mesh = read(&text).unwrap();
			assert_eq!(mesh.normals, vec![Vec3::new(0.0, 0.0, -1.0); 3]);
		}

		#[test]
		fn test_extra_vertex() {
			let text = CUBE.replace("endloop", "vertex 5 5 5\nendloop");
			let mesh = read(&text).unwrap();
			assert_eq!(mesh.positions.len(), 3);
			assert_eq!(mesh.positions[2], Vec3::new(0.0, 1.0, 0.0));
		}

		#[test]
		fn test_missing_loop_keywords() {
			let text = "solid s\nfacet normal 1 0 0 vertex 0 0 0 vertex 0 1 0 vertex 0 0 1\nendsolid";
			assert_eq!(read(text).unwrap().positions.len(), 3);
		}

		#[test]
		fn test_invalid_vertex_count() {
			let text = "solid s\n\
				facet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\n\
				facet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendloop\nendfacet\n\
				endsolid s\n";
			assert!(matches!(read(text), Err(StlImportError::InvalidVertexCount(5))));
		}

		#[test]
		fn test_normal_mismatch() {
			let text = "solid s\n\
				facet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\n\
				facet normal 0 0 1\nouter loop\nvertex 0 1 0\nendloop\nendfacet\n\
				endsolid s\n";
			assert!(matches!(read(text), Err(StlImportError::NormalMismatch {
				normals: 6,
				positions: 3,
			})));
		}

		#[test]
		fn test_empty() {
			assert!(matches!(read("solid empty\nendsolid empty\n"),
				Err(StlImportError::EmptyModel(_))));
			assert!(matches!(read("hello"), Err(StlImportError::UnknownFormat)));
		}

		#[test]
		fn test_single_line() {
			let text = "solid cube facet normal 0 0 1 outer loop vertex 0 0 0 vertex 1 0 0 vertex 0 1 0 \
				endloop endfacet endsolid cube";
			let mesh = read(text).unwrap();

			assert_eq!(mesh.name.as_deref(), Some("cube"));
			assert_eq!(mesh.positions.len(), 3);
			assert_eq!(mesh.positions[1], Vec3::new(1.0, 0.0, 0.0));
			assert_eq!(mesh.normals, vec![Vec3::new(0.0, 0.0, 1.0); 3]);
		}

		#[test]
		fn test_unusual_separators() {
			let text = "\x0csolid cube\nfacet normal 0 0 1\x0cvertex 0 0 0\x0bvertex 1 0 0\u{a0}\
				vertex\u{85}0 1 0 endsolid";
			let mesh = read(text).unwrap();

			assert_eq!(mesh.positions.len(), 3);
			assert_eq!(mesh.positions[2], Vec3::new(0.0, 1.0, 0.0));
		}

		#[test]
		fn test_solid_prefix() {
			assert!(matches!(read("solidified part\nendsolid\n"), Err(StlImportError::UnknownFormat)));
			assert!(matches!(read("solid"), Err(StlImportError::Truncated { .. })));
		}

		#[test]
		fn test_names() {
			let text = CUBE.replace("solid cube\n", "solid\n");
			assert_eq!(read(&text).unwrap().name.as_deref(), Some(ASCII_NAME));

			let text = CUBE.replace("solid cube\n", "  solid   part 7 \r\n");
			assert_eq!(read(&text).unwrap().name.as_deref(), Some("part"));

			let text = CUBE.replace("solid cube\n", "solid ");
			let mesh = read(&text).unwrap();
			assert_eq!(mesh.name.as_deref(), Some(ASCII_NAME));
			assert_eq!(mesh.positions.len(), 3);

			let long = format!("solid {}\n", "x".repeat(MAX_NAME_LEN));
			let text = CUBE.replace("solid cube\n", &long);
			assert_eq!(read(&text).unwrap().name.as_deref(), Some(ASCII_NAME));
		}
	}
}
