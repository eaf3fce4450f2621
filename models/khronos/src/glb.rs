use std::fmt::{
	Display,
	Formatter,
	self
};

use glbkit_core::{
	fourcc,
	rtag4
};

use crate::gltf2::Document;

pub const MAGIC: u32 = rtag4!(b"glTF");
pub const HEADER_SIZE: u64 = 12;
pub const CHUNK_HEADER_SIZE: u64 = 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
	pub magic: u32,
	pub version: u32,
	/// Declared length of the whole container, header included
	pub length: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChunkKind {
	Json,
	Binary,
	Unknown(u32),
}

impl ChunkKind {
	pub const JSON: u32 = rtag4!(b"JSON");
	pub const BINARY: u32 = rtag4!(b"BIN\x00");

	pub fn from_tag(tag: u32) -> ChunkKind {
		match tag {
			ChunkKind::JSON => ChunkKind::Json,
			ChunkKind::BINARY => ChunkKind::Binary,
			_ => ChunkKind::Unknown(tag),
		}
	}

	pub fn tag(self) -> u32 {
		match self {
			ChunkKind::Json => ChunkKind::JSON,
			ChunkKind::Binary => ChunkKind::BINARY,
			ChunkKind::Unknown(tag) => tag,
		}
	}
}

impl Display for ChunkKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(fourcc(self.tag()).as_str())
	}
}

/// Location of one chunk inside the container
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChunkMeta {
	pub index: usize,
	pub kind: ChunkKind,
	/// Payload length, excluding the 8-byte chunk header
	pub length: u32,
	/// Absolute offset of the payload from the start of the container
	pub offset: u64,
}

impl ChunkMeta {
	pub fn end(&self) -> u64 {
		self.offset + self.length as u64
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadCfg {
	/// Reject chunk lengths that are not a multiple of 4 instead of warning
	pub strict_padding: bool,
	/// Require the declared container length to equal the stream length
	pub verify_total_length: bool,
}

impl Default for ReadCfg {
	fn default() -> Self {
		Self {
			strict_padding: false,
			verify_total_length: true,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Glb {
	pub header: Header,
	pub document: Document,
	pub chunks: Vec<ChunkMeta>,
}

impl Glb {
	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<Glb, import::GlbImportError>
	where
		R: std::io::Read + std::io::Seek,
	{
		import::parse(buf)
	}

	#[cfg(feature = "import")]
	pub fn from_slice(data: &[u8]) -> Result<Glb, import::GlbImportError> {
		import::parse(&mut std::io::Cursor::new(data))
	}

	/// The authoritative (first) JSON chunk
	pub fn json_chunk(&self) -> Option<&ChunkMeta> {
		self.chunks.iter().find(|c| c.kind == ChunkKind::Json)
	}

	/// The first binary chunk, which backs the buffer without a `uri`
	pub fn binary_chunk(&self) -> Option<&ChunkMeta> {
		self.chunks.iter().find(|c| c.kind == ChunkKind::Binary)
	}
}

#[cfg(feature = "import")]
pub mod import {
	use byteorder::{
		LE,
		ReadBytesExt
	};

	use glbkit_core::{
		fourcc,
		io_ext::{
			ReadBinExt,
			SeekBinExt
		}
	};

	use log::{
		debug,
		warn
	};

	use std::{
		io::{
			Read,
			Seek,
			SeekFrom,
			self
		},
		str::Utf8Error
	};

	use thiserror::Error;

	use super::*;

	/// Broad failure classes, for callers that only need to know what went wrong
	#[derive(Clone, Copy, Debug, Eq, PartialEq)]
	pub enum ErrorKind {
		Io,
		Format,
		TruncatedChunk,
		InvalidJson,
		MissingJsonChunk,
	}

	impl Display for ErrorKind {
		fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
			f.write_str(match self {
				ErrorKind::Io => "io",
				ErrorKind::Format => "format",
				ErrorKind::TruncatedChunk => "truncated chunk",
				ErrorKind::InvalidJson => "invalid json",
				ErrorKind::MissingJsonChunk => "missing json chunk",
			})
		}
	}

	#[derive(Debug, Error)]
	pub enum GlbImportError {
		#[error("I/O error: {source}")]
		IO {
			#[from]
			source: io::Error,
		},
		#[error("Not a binary glTF file: magic is \"{}\"", fourcc(*.0))]
		Magic(u32),
		#[error("Header is {0} bytes long, expected 12")]
		ShortHeader(u64),
		#[error("Declared length {declared} does not match stream length {actual}")]
		LengthMismatch {
			declared: u64,
			actual: u64,
		},
		#[error("Chunk {index} at offset {offset} ends at {end}, past the declared length {total}")]
		Overrun {
			index: usize,
			offset: u64,
			end: u64,
			total: u64,
		},
		#[error("Chunk {index} at offset {offset} has length {length}, which is not a multiple of 4")]
		Misaligned {
			index: usize,
			offset: u64,
			length: u32,
		},
		#[error("Chunk {index} at offset {offset} is truncated: {expected} bytes declared, {available} available")]
		Truncated {
			index: usize,
			offset: u64,
			expected: u64,
			available: u64,
		},
		#[error("JSON chunk {index} at offset {offset} is not valid UTF-8")]
		Utf8 {
			index: usize,
			offset: u64,
			#[source]
			source: Utf8Error,
		},
		#[error("JSON chunk {index} at offset {offset} is malformed: {error}")]
		Json {
			index: usize,
			offset: u64,
			error: json::Error,
		},
		#[error("No JSON chunk present")]
		MissingJson,
		#[error("Chunk {index} at offset {offset} is \"{kind}\", not a binary chunk")]
		NotBinary {
			index: usize,
			offset: u64,
			kind: ChunkKind,
		},
	}

	impl GlbImportError {
		pub fn kind(&self) -> ErrorKind {
			match self {
				GlbImportError::IO { .. } => ErrorKind::Io,
				GlbImportError::Magic(_) |
				GlbImportError::ShortHeader(_) |
				GlbImportError::LengthMismatch { .. } |
				GlbImportError::Overrun { .. } |
				GlbImportError::Misaligned { .. } |
				GlbImportError::NotBinary { .. } => ErrorKind::Format,
				GlbImportError::Truncated { .. } => ErrorKind::TruncatedChunk,
				GlbImportError::Utf8 { .. } | GlbImportError::Json { .. } => ErrorKind::InvalidJson,
				GlbImportError::MissingJson => ErrorKind::MissingJsonChunk,
			}
		}

		/// Byte offset the error refers to, where one applies
		pub fn offset(&self) -> Option<u64> {
			match *self {
				GlbImportError::Magic(_) | GlbImportError::ShortHeader(_) => Some(0),
				GlbImportError::LengthMismatch { .. } => Some(8),
				GlbImportError::Overrun { offset, .. } |
				GlbImportError::Misaligned { offset, .. } |
				GlbImportError::Truncated { offset, .. } |
				GlbImportError::Utf8 { offset, .. } |
				GlbImportError::Json { offset, .. } |
				GlbImportError::NotBinary { offset, .. } => Some(offset),
				GlbImportError::IO { .. } | GlbImportError::MissingJson => None,
			}
		}

		/// Index of the chunk the error refers to, where one applies
		pub fn chunk(&self) -> Option<usize> {
			match *self {
				GlbImportError::Overrun { index, .. } |
				GlbImportError::Misaligned { index, .. } |
				GlbImportError::Truncated { index, .. } |
				GlbImportError::Utf8 { index, .. } |
				GlbImportError::Json { index, .. } |
				GlbImportError::NotBinary { index, .. } => Some(index),
				_ => None,
			}
		}
	}

	fn header<R>(buf: &mut R) -> Result<Header, GlbImportError>
	where
		R: Read,
	{
		let mut raw = [0; HEADER_SIZE as usize];
		let filled = buf.read_fill(&mut raw)?;
		if filled < raw.len() {
			return Err(GlbImportError::ShortHeader(filled as u64));
		}

		let hdr = &mut &raw[..];
		let magic = hdr.read_u32::<LE>()?;
		if magic != MAGIC {
			return Err(GlbImportError::Magic(magic));
		}

		Ok(Header {
			magic: magic,
			version: hdr.read_u32::<LE>()?,
			length: hdr.read_u32::<LE>()?,
		})
	}

	fn json_document(data: Vec<u8>, index: usize, offset: u64) -> Result<Document, GlbImportError> {
		let text = String::from_utf8(data).map_err(|e| GlbImportError::Utf8 {
			index: index,
			offset: offset,
			source: e.utf8_error(),
		})?;

		Document::parse(text).map_err(|e| GlbImportError::Json {
			index: index,
			offset: offset,
			error: e,
		})
	}

	/// Parses a binary glTF container with the default [`ReadCfg`]
	pub fn parse<R>(buf: &mut R) -> Result<Glb, GlbImportError>
	where
		R: Read + Seek,
	{
		parse_with(buf, &ReadCfg::default())
	}

	/// Parses a binary glTF container starting at offset 0 of `buf`.
	///
	/// Only the JSON chunk is read into memory. Binary and unknown chunks are
	/// skipped over and recorded in [`Glb::chunks`]; use [`read_binary_chunk`]
	/// to fetch a binary payload later.
	pub fn parse_with<R>(buf: &mut R, cfg: &ReadCfg) -> Result<Glb, GlbImportError>
	where
		R: Read + Seek,
	{
		let stream_len = buf.byte_len()?;
		buf.seek(SeekFrom::Start(0))?;

		let hdr = header(buf)?;
		let total = hdr.length as u64;
		if total < HEADER_SIZE {
			return Err(GlbImportError::LengthMismatch {
				declared: total,
				actual: stream_len,
			});
		}

		let mut chunks: Vec<ChunkMeta> = vec![];
		let mut document = None;
		let mut cursor = HEADER_SIZE;

		while cursor < total {
			let index = chunks.len();

			let available = stream_len.saturating_sub(cursor);
			if available < CHUNK_HEADER_SIZE {
				return Err(GlbImportError::Truncated {
					index: index,
					offset: cursor,
					expected: CHUNK_HEADER_SIZE,
					available: available,
				});
			}

			if cursor + CHUNK_HEADER_SIZE > total {
				return Err(GlbImportError::Overrun {
					index: index,
					offset: cursor,
					end: cursor + CHUNK_HEADER_SIZE,
					total: total,
				});
			}

			let length = buf.read_u32::<LE>()?;
			let kind = ChunkKind::from_tag(buf.read_u32::<LE>()?);
			let offset = cursor + CHUNK_HEADER_SIZE;
			let end = offset + length as u64;

			if end > stream_len {
				return Err(GlbImportError::Truncated {
					index: index,
					offset: offset,
					expected: length as u64,
					available: stream_len - offset,
				});
			}

			if end > total {
				return Err(GlbImportError::Overrun {
					index: index,
					offset: offset,
					end: end,
					total: total,
				});
			}

			if length % 4 != 0 {
				if cfg.strict_padding {
					return Err(GlbImportError::Misaligned {
						index: index,
						offset: offset,
						length: length,
					});
				}
				warn!("chunk {} at offset {} has unpadded length {}", index, offset, length);
			}

			debug!("chunk {}: \"{}\" at offset {}, {} bytes", index, kind, offset, length);

			match kind {
				ChunkKind::Json if document.is_none() => {
					let data = buf.read_vec(length as usize)?;
					document = Some(json_document(data, index, offset)?);
				},
				ChunkKind::Json => {
					warn!("ignoring extra JSON chunk {} at offset {}", index, offset);
					buf.seek(SeekFrom::Start(end))?;
				},
				ChunkKind::Binary => {
					buf.seek(SeekFrom::Start(end))?;
				},
				ChunkKind::Unknown(_) => {
					debug!("skipping unknown chunk type \"{}\"", kind);
					buf.seek(SeekFrom::Start(end))?;
				},
			}

			chunks.push(ChunkMeta {
				index: index,
				kind: kind,
				length: length,
				offset: offset,
			});
			cursor = end;
		}

		if cfg.verify_total_length && total != stream_len {
			return Err(GlbImportError::LengthMismatch {
				declared: total,
				actual: stream_len,
			});
		}

		match document {
			Some(doc) => Ok(Glb {
				header: hdr,
				document: doc,
				chunks: chunks,
			}),
			None => Err(GlbImportError::MissingJson),
		}
	}

	/// Reads the payload of a previously scanned binary chunk
	pub fn read_binary_chunk<R>(meta: &ChunkMeta, buf: &mut R) -> Result<Vec<u8>, GlbImportError>
	where
		R: Read + Seek,
	{
		if meta.kind != ChunkKind::Binary {
			return Err(GlbImportError::NotBinary {
				index: meta.index,
				offset: meta.offset,
				kind: meta.kind,
			});
		}

		read_range(meta.index, meta.offset, meta.length as u64, buf)
	}

	/// Reads `length` bytes at absolute `offset`, attributing a short read to chunk `index`
	pub(crate) fn read_range<R>(index: usize, offset: u64, length: u64, buf: &mut R) -> Result<Vec<u8>, GlbImportError>
	where
		R: Read + Seek,
	{
		let truncated = |available: u64| GlbImportError::Truncated {
			index: index,
			offset: offset,
			expected: length,
			available: available,
		};

		// checked before allocating
		let available = buf.byte_len()?.saturating_sub(offset);
		if available < length {
			return Err(truncated(available));
		}

		buf.seek(SeekFrom::Start(offset))?;

		let mut data = vec![0; length as usize];
		let filled = buf.read_fill(&mut data)?;
		if filled < data.len() {
			return Err(truncated(filled as u64));
		}

		Ok(data)
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

	use super::*;

	pub const VERSION: u32 = 2;

	#[derive(Debug, Error)]
	pub enum GlbExportError {
		#[error("I/O error: {source}")]
		IO {
			#[from]
			source: io::Error,
		},
		#[error("Container of {0} bytes does not fit a 32-bit length")]
		TooLarge(u64),
	}

	fn padded(len: usize) -> u64 {
		((len as u64) + 3) & !3
	}

	/// Writes a container holding `chunks` in order.
	/// JSON payloads are padded with spaces and all others with zeros. Returns the bytes written.
	pub fn write_chunks<W>(chunks: &[(ChunkKind, &[u8])], buf: &mut W) -> Result<u64, GlbExportError>
	where
		W: Write,
	{
		let total = chunks.iter().fold(HEADER_SIZE, |acc, (_, data)| acc + CHUNK_HEADER_SIZE + padded(data.len()));
		if total > u32::MAX as u64 {
			return Err(GlbExportError::TooLarge(total));
		}

		buf.write_u32::<LE>(MAGIC)?;
		buf.write_u32::<LE>(VERSION)?;
		buf.write_u32::<LE>(total as u32)?;

		for (kind, data) in chunks {
			let len = padded(data.len());
			let fill = match kind {
				ChunkKind::Json => b' ',
				_ => 0,
			};

			buf.write_u32::<LE>(len as u32)?;
			buf.write_u32::<LE>(kind.tag())?;
			buf.write_all(data)?;
			for _ in (data.len() as u64)..len {
				buf.write_u8(fill)?;
			}
		}

		Ok(total)
	}

	/// Writes a JSON chunk followed by an optional binary chunk
	pub fn write<W>(json: &str, bin: Option<&[u8]>, buf: &mut W) -> Result<u64, GlbExportError>
	where
		W: Write,
	{
		let mut chunks = vec![(ChunkKind::Json, json.as_bytes())];
		if let Some(b) = bin {
			chunks.push((ChunkKind::Binary, b));
		}

		write_chunks(&chunks, buf)
	}

}
