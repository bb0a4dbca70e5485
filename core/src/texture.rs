#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub red: f32,
	pub green: f32,
	pub blue: f32,
	pub alpha: f32,
}

impl Color {
	pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Color {
		Color {
			red: red,
			green: green,
			blue: blue,
			alpha: alpha,
		}
	}

	/// Decodes an opaque 5-5-5 color with red in the low bits. The top bit is ignored.
	pub fn from_rgb555(color: u16) -> Color {
		Color {
			red: unorm5(color),
			green: unorm5(color >> 5),
			blue: unorm5(color >> 10),
			alpha: 1.0,
		}
	}

	/// Decodes an opaque 5-5-5 color with blue in the low bits. The top bit is ignored.
	pub fn from_bgr555(color: u16) -> Color {
		let rgb = Color::from_rgb555(color);

		Color {
			red: rgb.blue,
			blue: rgb.red,
			..rgb
		}
	}
}

/// Maps the low 5 bits onto 0.0-1.0
#[inline]
fn unorm5(bits: u16) -> f32 {
	((bits & 31) as f32) / 31.0
}

#[cfg(test)]
mod tests {
	use super::Color;

	#[test]
	fn test_555() {
		let c = Color::from_rgb555(0x801f);
		assert_eq!(c, Color::new(1.0, 0.0, 0.0, 1.0));

		let c = Color::from_bgr555(0x801f);
		assert_eq!(c, Color::new(0.0, 0.0, 1.0, 1.0));

		let c = Color::from_rgb555(31 << 5);
		assert_eq!(c.green, 1.0);

		let c = Color::from_bgr555(16 | 8 << 10);
		assert_eq!(c.blue, 16.0 / 31.0);
		assert_eq!(c.red, 8.0 / 31.0);
		assert!((c.blue - 0.5161).abs() < 1e-4);
	}
}
