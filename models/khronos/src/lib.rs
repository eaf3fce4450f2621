#[cfg(feature = "import")]
pub mod buffer;

pub mod glb;
pub mod gltf;
pub mod gltf2;

#[cfg(feature = "import")]
pub mod report;

#[cfg(feature = "import")]
pub use glb::import::{
	parse,
	parse_with,
	read_binary_chunk
};

pub use gltf2::{
	list_accessors,
	list_meshes
};
