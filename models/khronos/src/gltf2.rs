use json::JsonValue;

use crate::gltf::{
	AccessorType,
	ComponentType
};

/// The decoded JSON chunk of a binary glTF file.
///
/// Only `meshes`, `accessors`, `bufferViews`, `buffers` and `asset` are ever
/// looked at; every other top-level property is carried through untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
	root: JsonValue,
	text: String,
}

impl Document {
	/// Parses JSON chunk text. Trailing NUL padding written by some exporters is tolerated.
	pub fn parse(text: String) -> json::Result<Document> {
		let root = json::parse(text.trim_end_matches('\0'))?;

		Ok(Document {
			root: root,
			text: text,
		})
	}

	pub fn root(&self) -> &JsonValue {
		&self.root
	}

	/// Returns a top-level property, or `Null` if it is absent
	pub fn get(&self, key: &str) -> &JsonValue {
		&self.root[key]
	}

	/// The chunk text exactly as stored, padding included
	pub fn as_str(&self) -> &str {
		&self.text
	}

	pub fn asset_version(&self) -> Option<&str> {
		self.root["asset"]["version"].as_str()
	}

	pub fn generator(&self) -> Option<&str> {
		self.root["asset"]["generator"].as_str()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshSummary {
	pub index: usize,
	pub name: Option<String>,
	pub primitive_count: usize,
	/// The `attributes` object of each primitive, in order (`Null` where a primitive has none)
	pub attributes: Vec<JsonValue>,
}

impl MeshSummary {
	/// If present, returns the accessor index bound to `semantic` in primitive `prim`
	pub fn attribute(&self, prim: usize, semantic: &str) -> Option<usize> {
		self.attributes.get(prim)?[semantic].as_usize()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct AccessorEntry {
	pub index: usize,
	pub accessor: JsonValue,
}

impl AccessorEntry {
	pub fn component_type(&self) -> Option<ComponentType> {
		self.accessor["componentType"].as_u32().and_then(ComponentType::from_code)
	}

	pub fn count(&self) -> Option<usize> {
		self.accessor["count"].as_usize()
	}

	pub fn kind(&self) -> Option<AccessorType> {
		self.accessor["type"].as_str().and_then(AccessorType::from_name)
	}

	pub fn buffer_view(&self) -> Option<usize> {
		self.accessor["bufferView"].as_usize()
	}

	pub fn byte_offset(&self) -> usize {
		self.accessor["byteOffset"].as_usize().unwrap_or(0)
	}
}

pub fn list_meshes(doc: &Document) -> Vec<MeshSummary> {
	doc.get("meshes").members().enumerate().map(|(i, mesh)| {
		let prims = &mesh["primitives"];

		MeshSummary {
			index: i,
			name: mesh["name"].as_str().map(str::to_string),
			primitive_count: prims.members().len(),
			attributes: prims.members().map(|p| p["attributes"].clone()).collect(),
		}
	}).collect()
}

pub fn list_accessors(doc: &Document) -> Vec<AccessorEntry> {
	doc.get("accessors").members().enumerate().map(|(i, acc)| {
		AccessorEntry {
			index: i,
			accessor: acc.clone(),
		}
	}).collect()
}

/// Returns the accessor at `index`, if the document has one
pub fn accessor(doc: &Document, index: usize) -> Option<AccessorEntry> {
	let acc = &doc.get("accessors")[index];
	if acc.is_null() {
		return None;
	}

	Some(AccessorEntry {
		index: index,
		accessor: acc.clone(),
	})
}
