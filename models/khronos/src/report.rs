use std::io::{
	Result,
	Write
};

use crate::{
	glb::{
		Glb,
		import::GlbImportError
	},
	gltf2::{
		list_accessors,
		list_meshes
	}
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReportCfg {
	/// Include the container header and chunk table
	pub chunks: bool,
}

fn write_chunks<W>(glb: &Glb, out: &mut W) -> Result<()>
where
	W: Write,
{
	writeln!(out, "Container: version {}, {} bytes", glb.header.version, glb.header.length)?;
	writeln!(out, "Chunks:")?;
	for chunk in glb.chunks.iter() {
		writeln!(out, "  {}: {} at offset {}, {} bytes", chunk.index, chunk.kind, chunk.offset, chunk.length)?;
	}
	writeln!(out)
}

/// Writes the mesh and accessor listing for a parsed container
pub fn write_report<W>(glb: &Glb, cfg: &ReportCfg, out: &mut W) -> Result<()>
where
	W: Write,
{
	if cfg.chunks {
		write_chunks(glb, out)?;
	}

	let doc = &glb.document;
	if let Some(version) = doc.asset_version() {
		match doc.generator() {
			Some(gen) => writeln!(out, "glTF {} ({})", version, gen)?,
			None => writeln!(out, "glTF {}", version)?,
		}
		writeln!(out)?;
	}

	writeln!(out, "Meshes:")?;
	for mesh in list_meshes(doc) {
		writeln!(out, "  - {}", mesh.name.as_deref().unwrap_or("(unnamed)"))?;
		for attrs in mesh.attributes.iter() {
			writeln!(out, "    Prim: {}", attrs.dump())?;
		}
	}

	writeln!(out)?;
	writeln!(out, "Accessors:")?;
	for entry in list_accessors(doc) {
		writeln!(out, "  {}: {}", entry.index, entry.accessor.dump())?;
	}

	Ok(())
}

/// Writes the one-line diagnostic for a failed parse: `error[kind] at offset N: message`,
/// or `error[kind]: message` when the error has no offset
pub fn write_error<W>(err: &GlbImportError, out: &mut W) -> Result<()>
where
	W: Write,
{
	match err.offset() {
		Some(offset) => writeln!(out, "error[{}] at offset {}: {}", err.kind(), offset, err),
		None => writeln!(out, "error[{}]: {}", err.kind(), err),
	}
}
