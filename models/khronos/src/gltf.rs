use std::fmt::{
	Display,
	Formatter,
	self
};

/// Storage type of a single accessor component, keyed by its glTF enum value
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ComponentType {
	Int8 = 5120,
	UInt8,
	Int16,
	UInt16,
	UInt32 = 5125,
	Float,
}

impl ComponentType {
	pub fn from_code(code: u32) -> Option<ComponentType> {
		match code {
			5120 => Some(ComponentType::Int8),
			5121 => Some(ComponentType::UInt8),
			5122 => Some(ComponentType::Int16),
			5123 => Some(ComponentType::UInt16),
			5125 => Some(ComponentType::UInt32),
			5126 => Some(ComponentType::Float),
			_ => None,
		}
	}

	/// Size of one component in bytes
	pub fn size(self) -> usize {
		match self {
			ComponentType::Int8 | ComponentType::UInt8 => 1,
			ComponentType::Int16 | ComponentType::UInt16 => 2,
			ComponentType::UInt32 | ComponentType::Float => 4,
		}
	}
}

/// Element shape of an accessor (the `type` property)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessorType {
	Scalar,
	Vec2,
	Vec3,
	Vec4,
	Mat2,
	Mat3,
	Mat4,
}

impl AccessorType {
	pub fn from_name(name: &str) -> Option<AccessorType> {
		match name {
			"SCALAR" => Some(AccessorType::Scalar),
			"VEC2" => Some(AccessorType::Vec2),
			"VEC3" => Some(AccessorType::Vec3),
			"VEC4" => Some(AccessorType::Vec4),
			"MAT2" => Some(AccessorType::Mat2),
			"MAT3" => Some(AccessorType::Mat3),
			"MAT4" => Some(AccessorType::Mat4),
			_ => None,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			AccessorType::Scalar => "SCALAR",
			AccessorType::Vec2 => "VEC2",
			AccessorType::Vec3 => "VEC3",
			AccessorType::Vec4 => "VEC4",
			AccessorType::Mat2 => "MAT2",
			AccessorType::Mat3 => "MAT3",
			AccessorType::Mat4 => "MAT4",
		}
	}

	pub fn components(self) -> usize {
		match self {
			AccessorType::Scalar => 1,
			AccessorType::Vec2 => 2,
			AccessorType::Vec3 => 3,
			AccessorType::Vec4 | AccessorType::Mat2 => 4,
			AccessorType::Mat3 => 9,
			AccessorType::Mat4 => 16,
		}
	}

	/// Size in bytes of one element stored with `component`.
	/// Matrix columns start on 4-byte boundaries, so narrow MAT2/MAT3 columns carry padding.
	pub fn element_size(self, component: ComponentType) -> usize {
		let columns = match self {
			AccessorType::Mat2 => 2,
			AccessorType::Mat3 => 3,
			AccessorType::Mat4 => 4,
			_ => return self.components() * component.size(),
		};

		let column = columns * component.size();
		columns * ((column + 3) & !3)
	}
}

impl Display for AccessorType {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_component_codes() {
		assert_eq!(Some(ComponentType::Float), ComponentType::from_code(5126));
		assert_eq!(Some(ComponentType::UInt32), ComponentType::from_code(5125));
		assert_eq!(None, ComponentType::from_code(5124));
		assert_eq!(5123, ComponentType::UInt16 as u32);
	}

	#[test]
	fn test_element_size() {
		assert_eq!(12, AccessorType::Vec3.element_size(ComponentType::Float));
		assert_eq!(2, AccessorType::Scalar.element_size(ComponentType::UInt16));
		assert_eq!(64, AccessorType::Mat4.element_size(ComponentType::Float));
		// padded columns
		assert_eq!(8, AccessorType::Mat2.element_size(ComponentType::UInt8));
		assert_eq!(12, AccessorType::Mat3.element_size(ComponentType::Int8));
		assert_eq!(24, AccessorType::Mat3.element_size(ComponentType::Int16));
		assert_eq!(8, AccessorType::Mat2.element_size(ComponentType::Int16));
	}

	#[test]
	fn test_type_names() {
		assert_eq!(Some(AccessorType::Vec3), AccessorType::from_name("VEC3"));
		assert_eq!(None, AccessorType::from_name("vec3"));
		assert_eq!("MAT4", AccessorType::Mat4.to_string());
	}
}
