use mime::Mime;

use std::{
	fs::File,
	io::{
		Read,
		Seek,
		SeekFrom,
		self
	},
	path::{
		Path,
		PathBuf
	}
};

use thiserror::Error;

use glbkit_core::io_ext::{
	ReadBinExt,
	SeekBinExt
};

use crate::{
	glb::{
		Glb,
		import::{
			GlbImportError,
			read_range
		}
	},
	gltf::{
		AccessorType,
		ComponentType
	},
	gltf2::{
		accessor,
		Document
	}
};

/// Where the bytes of a glTF buffer live
#[derive(Clone, Debug, PartialEq)]
pub enum BufferSource {
	/// The container's binary chunk
	Bin,
	DataUri {
		mime: Mime,
		data: Vec<u8>,
	},
	/// A relative or absolute URI outside the container
	External(String),
}

/// A byte range within one buffer
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ByteRange {
	pub buffer: usize,
	pub offset: u64,
	pub length: u64,
}

#[derive(Debug, Error)]
pub enum BufferError {
	#[error("No buffer {0}")]
	MissingBuffer(usize),
	#[error("No buffer view {0}")]
	MissingBufferView(usize),
	#[error("No accessor {0}")]
	MissingAccessor(usize),
	#[error("Accessor {0} has no buffer view")]
	Unbacked(usize),
	#[error("Accessor {index} has an invalid or missing \"{field}\"")]
	InvalidAccessor {
		index: usize,
		field: &'static str,
	},
	#[error("Buffer view {0} has no valid \"buffer\" or \"byteLength\"")]
	InvalidBufferView(usize),
	#[error("Accessor {0} covers a byte range past the addressable limit")]
	Overflow(usize),
	#[error("Accessor {index} needs {length} bytes at {offset}, but buffer view {view} holds {available}")]
	OutOfView {
		index: usize,
		view: usize,
		offset: u64,
		length: u64,
		available: u64,
	},
	#[error("{length} bytes at offset {offset} lie outside buffer {buffer} of {available} bytes")]
	OutOfBuffer {
		buffer: usize,
		offset: u64,
		length: u64,
		available: u64,
	},
	#[error("Unsupported data URI: {0}")]
	UnsupportedUri(String),
	#[error("Invalid media type in data URI")]
	Mime {
		#[from]
		source: mime::FromStrError,
	},
	#[error("Invalid base64 payload in data URI")]
	Base64 {
		#[from]
		source: base64::DecodeError,
	},
	#[error("Buffer {0} is external: {1}")]
	External(usize, String),
	#[error("Buffer {0} refers to the binary chunk, but the container has none")]
	NoBinaryChunk(usize),
	#[error(transparent)]
	Import(#[from] GlbImportError),
	#[error("I/O error reading {path:?}: {source}")]
	IO {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

fn data_uri(uri: &str) -> Result<BufferSource, BufferError> {
	let rest = &uri["data:".len()..];
	let (meta, payload) = rest.split_once(',')
		.ok_or_else(|| BufferError::UnsupportedUri(uri.to_string()))?;

	let media = match meta.strip_suffix(";base64") {
		Some(m) => m,
		None => return Err(BufferError::UnsupportedUri(uri.to_string())),
	};

	let mime = if media.is_empty() {
		mime::APPLICATION_OCTET_STREAM
	} else {
		media.parse::<Mime>()?
	};

	Ok(BufferSource::DataUri {
		mime: mime,
		data: base64::decode(payload)?,
	})
}

/// Resolves buffer `index` to its storage
pub fn buffer_source(doc: &Document, index: usize) -> Result<BufferSource, BufferError> {
	let buffer = &doc.get("buffers")[index];
	if buffer.is_null() {
		return Err(BufferError::MissingBuffer(index));
	}

	match buffer["uri"].as_str() {
		None => Ok(BufferSource::Bin),
		Some(uri) if uri.starts_with("data:") => data_uri(uri),
		Some(uri) => Ok(BufferSource::External(uri.to_string())),
	}
}

/// Resolves accessor `index` through its buffer view to the bytes it covers.
/// Strided views are measured from the first byte of the first element to the last byte of the last.
pub fn accessor_range(doc: &Document, index: usize) -> Result<ByteRange, BufferError> {
	let acc = accessor(doc, index).ok_or(BufferError::MissingAccessor(index))?;
	let view_index = acc.buffer_view().ok_or(BufferError::Unbacked(index))?;

	let component = acc.component_type().ok_or(BufferError::InvalidAccessor {
		index: index,
		field: "componentType",
	})?;
	let kind = acc.kind().ok_or(BufferError::InvalidAccessor {
		index: index,
		field: "type",
	})?;
	let count = acc.count().ok_or(BufferError::InvalidAccessor {
		index: index,
		field: "count",
	})? as u64;

	let view = &doc.get("bufferViews")[view_index];
	if view.is_null() {
		return Err(BufferError::MissingBufferView(view_index));
	}

	let buffer = view["buffer"].as_usize().ok_or(BufferError::InvalidBufferView(view_index))?;
	let view_length = view["byteLength"].as_u64().ok_or(BufferError::InvalidBufferView(view_index))?;
	let view_offset = view["byteOffset"].as_u64().unwrap_or(0);
	let stride = view["byteStride"].as_u64().unwrap_or(0);

	let element = kind.element_size(component) as u64;
	let length = match count {
		0 => Some(0),
		n if stride > element => stride.checked_mul(n - 1).and_then(|l| l.checked_add(element)),
		n => element.checked_mul(n),
	}.ok_or(BufferError::Overflow(index))?;

	let offset = acc.byte_offset() as u64;
	let end = offset.checked_add(length).ok_or(BufferError::Overflow(index))?;
	if end > view_length {
		return Err(BufferError::OutOfView {
			index: index,
			view: view_index,
			offset: offset,
			length: length,
			available: view_length,
		});
	}

	Ok(ByteRange {
		buffer: buffer,
		offset: view_offset.checked_add(offset).ok_or(BufferError::Overflow(index))?,
		length: length,
	})
}

/// Size of one element of accessor `index`, if its type is recognised
pub fn element_size(doc: &Document, index: usize) -> Option<usize> {
	let acc = accessor(doc, index)?;
	let kind: AccessorType = acc.kind()?;
	let component: ComponentType = acc.component_type()?;

	Some(kind.element_size(component))
}

/// Resolves an external buffer `uri` against the directory `base`.
/// Only plain relative or absolute paths are accepted; schemes and percent-escapes are refused.
pub fn external_path(base: &Path, uri: &str) -> Result<PathBuf, BufferError> {
	if uri.contains("://") || uri.contains('%') || uri.starts_with("file:") {
		return Err(BufferError::UnsupportedUri(uri.to_string()));
	}

	Ok(base.join(uri))
}

fn read_external(path: PathBuf, buffer: usize, range: &ByteRange) -> Result<Vec<u8>, BufferError> {
	let io_err = |path: &Path, e: io::Error| BufferError::IO {
		path: path.to_path_buf(),
		source: e,
	};

	let mut file = File::open(&path).map_err(|e| io_err(&path, e))?;
	let available = file.byte_len().map_err(|e| io_err(&path, e))?;
	if range.offset.checked_add(range.length).map_or(true, |end| end > available) {
		return Err(BufferError::OutOfBuffer {
			buffer: buffer,
			offset: range.offset,
			length: range.length,
			available: available,
		});
	}

	file.seek(SeekFrom::Start(range.offset)).map_err(|e| io_err(&path, e))?;
	file.read_vec(range.length as usize).map_err(|e| io_err(&path, e))
}

fn read_accessor<R>(glb: &Glb, index: usize, buf: &mut R, base: Option<&Path>) -> Result<Vec<u8>, BufferError>
where
	R: Read + Seek,
{
	let range = accessor_range(&glb.document, index)?;
	let out_of_buffer = |available: u64| BufferError::OutOfBuffer {
		buffer: range.buffer,
		offset: range.offset,
		length: range.length,
		available: available,
	};

	match buffer_source(&glb.document, range.buffer)? {
		BufferSource::Bin => {
			let bin = glb.binary_chunk().ok_or(BufferError::NoBinaryChunk(range.buffer))?;
			let available = bin.length as u64;
			if range.offset.checked_add(range.length).map_or(true, |end| end > available) {
				return Err(out_of_buffer(available));
			}

			Ok(read_range(bin.index, bin.offset + range.offset, range.length, buf)?)
		},
		BufferSource::DataUri { data, .. } => {
			let available = data.len() as u64;
			match range.offset.checked_add(range.length) {
				Some(end) if end <= available => Ok(data[range.offset as usize..end as usize].to_vec()),
				_ => Err(out_of_buffer(available)),
			}
		},
		BufferSource::External(uri) => match base {
			Some(dir) => read_external(external_path(dir, &uri)?, range.buffer, &range),
			None => Err(BufferError::External(range.buffer, uri)),
		},
	}
}

/// Reads the raw bytes behind accessor `index`.
/// Bytes in the binary chunk are read from `buf` on demand; nothing else in the chunk is loaded.
/// Buffers stored in external files are refused with [`BufferError::External`].
pub fn read_accessor_bytes<R>(glb: &Glb, index: usize, buf: &mut R) -> Result<Vec<u8>, BufferError>
where
	R: Read + Seek,
{
	read_accessor(glb, index, buf, None)
}

/// Like [`read_accessor_bytes`], but external buffer files are loaded relative to `base`,
/// normally the directory holding the .glb file
pub fn read_accessor_bytes_in<R>(glb: &Glb, index: usize, buf: &mut R, base: &Path) -> Result<Vec<u8>, BufferError>
where
	R: Read + Seek,
{
	read_accessor(glb, index, buf, Some(base))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn doc(text: &str) -> Document {
		Document::parse(text.to_string()).unwrap()
	}

	const MESH: &str = r#"{
		"buffers": [{"byteLength": 72}, {"byteLength": 4, "uri": "data:application/octet-stream;base64,AQIDBA=="}, {"byteLength": 8, "uri": "mesh.bin"}],
		"bufferViews": [
			{"buffer": 0, "byteOffset": 0, "byteLength": 48, "byteStride": 24},
			{"buffer": 0, "byteOffset": 48, "byteLength": 24},
			{"buffer": 1, "byteLength": 4},
			{"buffer": 2, "byteLength": 8}
		],
		"accessors": [
			{"bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC3"},
			{"bufferView": 0, "byteOffset": 12, "componentType": 5126, "count": 2, "type": "VEC3"},
			{"bufferView": 1, "componentType": 5123, "count": 12, "type": "SCALAR"},
			{"bufferView": 2, "componentType": 5121, "count": 4, "type": "SCALAR"},
			{"bufferView": 3, "componentType": 5121, "count": 8, "type": "SCALAR"},
			{"componentType": 5126, "count": 3, "type": "VEC3"},
			{"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3"},
			{"bufferView": 1, "componentType": 5124, "count": 1, "type": "SCALAR"}
		]
	}"#;

	#[test]
	fn test_buffer_source() {
		let d = doc(MESH);

		assert_eq!(BufferSource::Bin, buffer_source(&d, 0).unwrap());
		assert_eq!(BufferSource::DataUri {
			mime: mime::APPLICATION_OCTET_STREAM,
			data: vec![1, 2, 3, 4],
		}, buffer_source(&d, 1).unwrap());
		assert_eq!(BufferSource::External("mesh.bin".to_string()), buffer_source(&d, 2).unwrap());
		assert!(matches!(buffer_source(&d, 3), Err(BufferError::MissingBuffer(3))));
	}

	#[test]
	fn test_bad_data_uris() {
		let d = doc(r#"{"buffers": [{"uri": "data:,plain"}, {"uri": "data:application/octet-stream;base64,@@@"}]}"#);

		assert!(matches!(buffer_source(&d, 0), Err(BufferError::UnsupportedUri(_))));
		assert!(matches!(buffer_source(&d, 1), Err(BufferError::Base64 { .. })));
	}

	#[test]
	fn test_accessor_range() {
		let d = doc(MESH);

		// interleaved: stride 24, two VEC3 floats
		assert_eq!(ByteRange { buffer: 0, offset: 0, length: 36 }, accessor_range(&d, 0).unwrap());
		assert_eq!(ByteRange { buffer: 0, offset: 12, length: 36 }, accessor_range(&d, 1).unwrap());
		assert_eq!(ByteRange { buffer: 0, offset: 48, length: 24 }, accessor_range(&d, 2).unwrap());
		assert_eq!(ByteRange { buffer: 1, offset: 0, length: 4 }, accessor_range(&d, 3).unwrap());
	}

	#[test]
	fn test_accessor_range_errors() {
		let d = doc(MESH);

		assert!(matches!(accessor_range(&d, 5), Err(BufferError::Unbacked(5))));
		assert!(matches!(accessor_range(&d, 6), Err(BufferError::OutOfView { index: 6, view: 1, length: 36, available: 24, .. })));
		assert!(matches!(accessor_range(&d, 7), Err(BufferError::InvalidAccessor { index: 7, field: "componentType" })));
		assert!(matches!(accessor_range(&d, 8), Err(BufferError::MissingAccessor(8))));
	}

	#[test]
	fn test_accessor_range_overflow() {
		let d = doc(r#"{
			"bufferViews": [
				{"buffer": 0, "byteLength": 48, "byteStride": 24},
				{"buffer": 0, "byteOffset": 18446744073709551615, "byteLength": 48}
			],
			"accessors": [
				{"bufferView": 0, "componentType": 5126, "count": 1000000000000000000, "type": "VEC3"},
				{"bufferView": 0, "byteOffset": 18446744073709551615, "componentType": 5126, "count": 1, "type": "VEC3"},
				{"bufferView": 1, "byteOffset": 4, "componentType": 5126, "count": 1, "type": "VEC3"},
				{"bufferView": 1, "componentType": 5121, "count": 1000000000000000000, "type": "MAT4"}
			]
		}"#);

		assert!(matches!(accessor_range(&d, 0), Err(BufferError::Overflow(0))));
		assert!(matches!(accessor_range(&d, 1), Err(BufferError::Overflow(1))));
		assert!(matches!(accessor_range(&d, 2), Err(BufferError::Overflow(2))));
		assert!(matches!(accessor_range(&d, 3), Err(BufferError::OutOfView { index: 3, .. })));
	}

	#[test]
	fn test_external_path() {
		let base = Path::new("assets/models");

		assert_eq!(base.join("ant.bin"), external_path(base, "ant.bin").unwrap());
		assert_eq!(base.join("bin/ant.bin"), external_path(base, "bin/ant.bin").unwrap());
		assert!(matches!(external_path(base, "https://example.com/ant.bin"), Err(BufferError::UnsupportedUri(_))));
		assert!(matches!(external_path(base, "file:ant.bin"), Err(BufferError::UnsupportedUri(_))));
		assert!(matches!(external_path(base, "ant%20legs.bin"), Err(BufferError::UnsupportedUri(_))));
	}

	#[test]
	fn test_element_size() {
		let d = doc(MESH);

		assert_eq!(Some(12), element_size(&d, 0));
		assert_eq!(Some(2), element_size(&d, 2));
		assert_eq!(None, element_size(&d, 7));
	}

	#[cfg(feature = "export")]
	mod stream {
		use std::io::Cursor;

		use crate::glb::export::write;

		use super::*;

		#[test]
		fn test_read_accessor_bytes() {
			let bin: Vec<u8> = (0..72).collect();
			let mut out = vec![];
			write(MESH, Some(bin.as_slice()), &mut out).unwrap();

			let mut stream = Cursor::new(&out);
			let glb = Glb::read(&mut stream).unwrap();

			assert_eq!(&bin[0..36], &read_accessor_bytes(&glb, 0, &mut stream).unwrap()[..]);
			assert_eq!(&bin[12..48], &read_accessor_bytes(&glb, 1, &mut stream).unwrap()[..]);
			assert_eq!(&bin[48..72], &read_accessor_bytes(&glb, 2, &mut stream).unwrap()[..]);
			assert_eq!(vec![1, 2, 3, 4], read_accessor_bytes(&glb, 3, &mut stream).unwrap());
			assert!(matches!(read_accessor_bytes(&glb, 4, &mut stream), Err(BufferError::External(2, _))));
		}

		#[test]
		fn test_read_external_buffer() {
			let dir = tempfile::tempdir().unwrap();
			std::fs::write(dir.path().join("mesh.bin"), [10u8, 11, 12, 13, 14, 15, 16, 17]).unwrap();

			let mut out = vec![];
			write(MESH, Some(&[0u8; 72][..]), &mut out).unwrap();

			let mut stream = Cursor::new(&out);
			let glb = Glb::read(&mut stream).unwrap();

			assert_eq!(vec![10, 11, 12, 13, 14, 15, 16, 17], read_accessor_bytes_in(&glb, 4, &mut stream, dir.path()).unwrap());
			// buffers in the container resolve the same way with or without a base
			assert_eq!(vec![1, 2, 3, 4], read_accessor_bytes_in(&glb, 3, &mut stream, dir.path()).unwrap());
		}

		#[test]
		fn test_external_buffer_errors() {
			let dir = tempfile::tempdir().unwrap();

			let mut out = vec![];
			write(MESH, Some(&[0u8; 72][..]), &mut out).unwrap();

			let mut stream = Cursor::new(&out);
			let glb = Glb::read(&mut stream).unwrap();

			assert!(matches!(read_accessor_bytes_in(&glb, 4, &mut stream, dir.path()), Err(BufferError::IO { .. })));

			std::fs::write(dir.path().join("mesh.bin"), [1u8, 2, 3]).unwrap();
			assert!(matches!(read_accessor_bytes_in(&glb, 4, &mut stream, dir.path()),
				Err(BufferError::OutOfBuffer { buffer: 2, length: 8, available: 3, .. })));
		}

		#[test]
		fn test_range_past_addressable_limit() {
			let json = r#"{
				"buffers": [{"byteLength": 16}],
				"bufferViews": [{"buffer": 0, "byteOffset": 18446744073709551610, "byteLength": 16}],
				"accessors": [{"bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC3"}]
			}"#;
			let mut out = vec![];
			write(json, Some(&[0u8; 16][..]), &mut out).unwrap();

			let mut stream = Cursor::new(&out);
			let glb = Glb::read(&mut stream).unwrap();

			assert!(matches!(read_accessor_bytes(&glb, 0, &mut stream), Err(BufferError::OutOfBuffer { buffer: 0, available: 16, .. })));
		}

		#[test]
		fn test_missing_binary_chunk() {
			let mut out = vec![];
			write(MESH, None, &mut out).unwrap();

			let mut stream = Cursor::new(&out);
			let glb = Glb::read(&mut stream).unwrap();

			assert!(matches!(read_accessor_bytes(&glb, 0, &mut stream), Err(BufferError::NoBinaryChunk(0))));
		}

		#[test]
		fn test_binary_chunk_too_short() {
			let mut out = vec![];
			write(MESH, Some(&[0u8; 40][..]), &mut out).unwrap();

			let mut stream = Cursor::new(&out);
			let glb = Glb::read(&mut stream).unwrap();

			assert!(read_accessor_bytes(&glb, 0, &mut stream).is_ok());
			assert!(matches!(read_accessor_bytes(&glb, 2, &mut stream), Err(BufferError::OutOfBuffer { buffer: 0, available: 40, .. })));
		}
	}
}
