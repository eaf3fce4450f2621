#[cfg(feature = "io_ext")]
pub mod io_ext;

/// Converts a 4-byte string into a 32-bit little endian integer.
/// Byte strings longer than 4 bytes are truncated.
#[macro_export]
macro_rules! rtag4 {
	($b4: literal) => {
		u32::from_le_bytes([$b4[0], $b4[1], $b4[2], $b4[3]])
	}
}

/// Renders a little endian tag as text, escaping bytes outside printable ASCII
pub fn fourcc(tag: u32) -> String {
	let mut s = String::new();

	for b in tag.to_le_bytes() {
		if b.is_ascii_graphic() || b == b' ' {
			s.push(b as char);
		} else {
			s.push_str(format!("\\x{:02X}", b).as_str());
		}
	}

	s
}
