use std::io::{
	ErrorKind,
	Read,
	Result,
	Seek,
	SeekFrom
};

pub trait ReadBinExt: Read {
	/// Reads exactly `len` bytes into a new buffer
	#[inline]
	fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
		let mut buf = vec![0; len];
		self.read_exact(&mut buf)?;

		Ok(buf)
	}

	/// Fills as much of `buf` as the stream allows, stopping early only at end of stream.
	/// Returns the number of bytes read.
	fn read_fill(&mut self, buf: &mut [u8]) -> Result<usize> {
		let mut filled = 0;

		while filled < buf.len() {
			match self.read(&mut buf[filled..]) {
				Ok(0) => break,
				Ok(n) => filled += n,
				Err(e) if e.kind() == ErrorKind::Interrupted => continue,
				Err(e) => return Err(e),
			}
		}

		Ok(filled)
	}
}

impl<R> ReadBinExt for R
where
	R: Read + ?Sized,
{
}

pub trait SeekBinExt: Seek {
	/// Returns the length of the stream in bytes, leaving the cursor where it was
	fn byte_len(&mut self) -> Result<u64> {
		let pos = self.stream_position()?;
		let len = self.seek(SeekFrom::End(0))?;

		if pos != len {
			self.seek(SeekFrom::Start(pos))?;
		}

		Ok(len)
	}
}

impl<S> SeekBinExt for S
where
	S: Seek + ?Sized,
{
}
