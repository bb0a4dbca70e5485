use ultraviolet::vec::{
	Vec2,
	Vec3
};

use crate::texture::Color;

/// Vertex indices of a triangle
pub type Face = [usize; 3];

/// Decoded geometry handed to the scene assembler.
///
/// `normals` runs parallel to `positions`, as do `uvs` and `colors` when they aren't empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
	pub name: Option<String>,
	pub positions: Vec<Vec3>,
	pub normals: Vec<Vec3>,
	pub uvs: Vec<Vec2>,
	pub colors: Vec<Color>,
	pub faces: Vec<Face>,
	/// Material color supplied by the file, if any
	pub color: Option<Color>,
}

impl Mesh {
	pub fn new(name: &str) -> Mesh {
		Mesh {
			name: Some(name.to_string()),
			..Mesh::default()
		}
	}

	/// Builds faces over unshared vertices, one triangle per consecutive vertex triple
	pub fn sequential_faces(num_verts: usize) -> Vec<Face> {
		(0..num_verts / 3).map(|i| [i * 3, i * 3 + 1, i * 3 + 2]).collect()
	}

	/// Returns the file supplied color, or `default` when there is none
	pub fn color_or(&self, default: Color) -> Color {
		self.color.unwrap_or(default)
	}
}

/// Converts a Z-up vector to the Y-up right-handed convention by swapping Y and Z
#[inline]
pub fn z_up_to_y_up(v: Vec3) -> Vec3 {
	Vec3::new(v.x, v.z, v.y)
}
