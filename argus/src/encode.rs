use argus_common::{
	arg_type_at, SysContext, SyscallArgs, AF_INET, AF_INET6, AF_UNIX, CONTEXT_SIZE, EXEC_FLAGS_T,
	INT_T, MAX_ARGS, MAX_BUFFER_SIZE, MAX_STRING_SIZE, MAX_STR_ARR_ELEM, NONE_T, OPEN_FLAGS_T,
	SOCKADDR_IN6_SIZE, SOCKADDR_IN_SIZE, SOCKADDR_T, SOCKADDR_UN_SIZE, SOCK_DOM_T, SOCK_TYPE_T,
	STR_ARR_T, STR_T,
};
use zerocopy::IntoBytes;

use crate::buffer::EventBuf;
use crate::mem::MemReader;

// Largest fixed-size element a single write can append (a unix-domain
// sockaddr); the cursor is checked against it before any bytes move.
const MAX_ELEMENT_SIZE: usize = SOCKADDR_UN_SIZE;

/// Append-only, bounds-checked writer of tagged fields into an event
/// buffer. Fields that cannot be read or no longer fit are skipped
/// without advancing the cursor; a partial event stays valid.
pub struct Encoder<'a, M: MemReader> {
	buf: &'a mut EventBuf,
	off: &'a mut u32,
	mem: &'a M,
}

impl<'a, M: MemReader> Encoder<'a, M> {
	pub fn new(buf: &'a mut EventBuf, off: &'a mut u32, mem: &'a M) -> Self {
		Self { buf, off, mem }
	}

	/// Resets the cursor past the header slot at offset 0.
	pub fn begin(&mut self) {
		*self.off = CONTEXT_SIZE as u32;
	}

	pub fn bytes_used(&self) -> usize {
		*self.off as usize
	}

	pub fn write_context(&mut self, cx: &SysContext) -> usize {
		self.buf.bytes[..CONTEXT_SIZE].copy_from_slice(cx.as_bytes());
		CONTEXT_SIZE
	}

	fn write_tag(&mut self, tag: u8) -> bool {
		let off = *self.off as usize;
		if off + 1 + MAX_ELEMENT_SIZE > MAX_BUFFER_SIZE {
			return false;
		}
		self.buf.bytes[off] = tag;
		*self.off = (off + 1) as u32;
		true
	}

	/// Tag plus fixed 4-byte payload. Returns bytes appended, 0 when a
	/// worst-case element no longer fits.
	pub fn write_scalar(&mut self, v: u32, tag: u8) -> usize {
		if tag == NONE_T {
			return 0;
		}
		let off = *self.off as usize;
		if off + 1 + MAX_ELEMENT_SIZE > MAX_BUFFER_SIZE {
			return 0;
		}
		self.buf.bytes[off] = tag;
		self.buf.bytes[off + 1..off + 5].copy_from_slice(&v.to_ne_bytes());
		*self.off = (off + 5) as u32;
		5
	}

	/// Bounded, NUL-clamped string copied from the traced address
	/// space: tag, 4-byte length (NUL included), bytes. A failed read
	/// commits nothing.
	pub fn write_str(&mut self, addr: u64) -> usize {
		let off = *self.off as usize;
		if off + 1 + 4 + MAX_STRING_SIZE > MAX_BUFFER_SIZE {
			return 0;
		}
		let dst = &mut self.buf.bytes[off + 5..off + 5 + MAX_STRING_SIZE];
		let len = match self.mem.read_str(addr, dst) {
			Ok(len) => len,
			Err(_) => return 0,
		};
		self.buf.bytes[off] = STR_T;
		self.buf.bytes[off + 1..off + 5].copy_from_slice(&(len as u32).to_ne_bytes());
		*self.off = (off + 5 + len) as u32;
		5 + len
	}

	/// Same layout as [`write_str`](Self::write_str) for a string we
	/// already hold, e.g. the array-truncation marker.
	pub fn write_str_bytes(&mut self, s: &[u8]) -> usize {
		let off = *self.off as usize;
		if off + 1 + 4 + MAX_STRING_SIZE > MAX_BUFFER_SIZE {
			return 0;
		}
		let n = core::cmp::min(s.len(), MAX_STRING_SIZE - 1);
		self.buf.bytes[off] = STR_T;
		self.buf.bytes[off + 1..off + 5].copy_from_slice(&((n + 1) as u32).to_ne_bytes());
		self.buf.bytes[off + 5..off + 5 + n].copy_from_slice(&s[..n]);
		self.buf.bytes[off + 5 + n] = 0;
		*self.off = (off + 5 + n + 1) as u32;
		6 + n
	}

	/// Raw sockaddr copy sized by the embedded address family; an
	/// unrecognized family records only its 2-byte tag, so decoders
	/// must branch on the family rather than the field tag.
	pub fn write_sockaddr(&mut self, addr: u64) -> usize {
		if addr == 0 {
			return 0;
		}
		let mut fam = [0u8; 2];
		if self.mem.read_bytes(addr, &mut fam).is_err() {
			return 0;
		}
		let off = *self.off as usize;
		if off + 1 + MAX_ELEMENT_SIZE > MAX_BUFFER_SIZE {
			return 0;
		}
		let size = match u16::from_ne_bytes(fam) {
			AF_UNIX => SOCKADDR_UN_SIZE,
			AF_INET => SOCKADDR_IN_SIZE,
			AF_INET6 => SOCKADDR_IN6_SIZE,
			_ => {
				self.buf.bytes[off] = SOCKADDR_T;
				self.buf.bytes[off + 1..off + 3].copy_from_slice(&fam);
				*self.off = (off + 3) as u32;
				return 3;
			}
		};
		if self.mem.read_bytes(addr, &mut self.buf.bytes[off + 1..off + 1 + size]).is_err() {
			return 0;
		}
		self.buf.bytes[off] = SOCKADDR_T;
		*self.off = (off + 1 + size) as u32;
		1 + size
	}

	/// Start sentinel, up to [`MAX_STR_ARR_ELEM`] pointer-array
	/// elements (a NULL element or failed read ends the walk), a
	/// literal `"..."` iff the element limit was hit, end sentinel.
	pub fn write_str_array(&mut self, addr: u64) -> usize {
		let start = *self.off as usize;
		if !self.write_tag(STR_ARR_T) {
			return 0;
		}
		let mut truncated = true;
		for i in 0..MAX_STR_ARR_ELEM {
			let elem = match self.mem.read_word(addr + (i as u64) * 8) {
				Ok(p) if p != 0 => p,
				_ => {
					truncated = false;
					break;
				}
			};
			if self.write_str(elem) == 0 {
				truncated = false;
				break;
			}
		}
		if truncated {
			self.write_str_bytes(b"...");
		}
		self.write_tag(STR_ARR_T);
		*self.off as usize - start
	}

	/// Drives the writers above from a packed per-syscall signature,
	/// one stashed argument word per slot.
	pub fn write_args(&mut self, types: u64, args: &SyscallArgs) {
		if types == 0 {
			return;
		}
		for slot in 0..MAX_ARGS {
			let raw = args.args[slot];
			match arg_type_at(slot, types) {
				NONE_T => {}
				tag @ (INT_T | OPEN_FLAGS_T | EXEC_FLAGS_T | SOCK_DOM_T | SOCK_TYPE_T) => {
					self.write_scalar(raw as u32, tag);
				}
				STR_T => {
					self.write_str(raw);
				}
				STR_ARR_T => {
					self.write_str_array(raw);
				}
				SOCKADDR_T => {
					self.write_sockaddr(raw);
				}
				_ => {}
			}
		}
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use argus_common::decode::{decode_event, Field, SockAddr};

	use crate::support::{fixture_context, FakeMem, TestLane};

	use super::*;

	const STR_ADDR: u64 = 0x1000;
	const ARR_ADDR: u64 = 0x2000;
	const SA_ADDR: u64 = 0x3000;

	#[test]
	fn scalar_fields_are_tag_plus_four_bytes() {
		// -- Setup & Fixtures
		let mem = FakeMem::default();
		let mut lane = TestLane::new();
		let mut off = 0u32;
		let mut enc = Encoder::new(&mut lane.event, &mut off, &mem);

		// -- Exec
		enc.begin();
		let n = enc.write_scalar(0x1234_5678, INT_T);

		// -- Check
		assert_eq!(n, 5);
		assert_eq!(lane.event.bytes[CONTEXT_SIZE], INT_T);
		assert_eq!(
			lane.event.bytes[CONTEXT_SIZE + 1..CONTEXT_SIZE + 5],
			0x1234_5678u32.to_ne_bytes()
		);
		assert_eq!(off as usize, CONTEXT_SIZE + 5);
	}

	#[test]
	fn long_strings_truncate_to_the_bound() -> Result<()> {
		// -- Setup & Fixtures
		let mem = FakeMem::default();
		let long = "x".repeat(MAX_STRING_SIZE + 900);
		mem.map_str(STR_ADDR, &long);
		let mut lane = TestLane::new();
		let mut off = 0u32;

		// -- Exec
		let mut enc = Encoder::new(&mut lane.event, &mut off, &mem);
		enc.begin();
		enc.write_context(&fixture_context(argus_common::SYS_OPEN, 1, 0));
		let n = enc.write_str(STR_ADDR);

		// -- Check
		assert_eq!(n, 5 + MAX_STRING_SIZE);
		let evt = decode_event(&lane.event.bytes[..off as usize])?;
		match &evt.fields[0] {
			Field::Str(s) => {
				assert_eq!(s.len(), MAX_STRING_SIZE - 1);
				assert!(long.starts_with(s.as_str()));
			}
			other => panic!("expected a string field, got {other:?}"),
		}

		Ok(())
	}

	#[test]
	fn failed_reads_commit_nothing() {
		// -- Setup & Fixtures
		let mem = FakeMem::default();
		let mut lane = TestLane::new();
		let mut off = 0u32;
		let mut enc = Encoder::new(&mut lane.event, &mut off, &mem);
		enc.begin();

		// -- Exec
		let n_str = enc.write_str(0xDEAD_0000);
		let n_sa = enc.write_sockaddr(0xDEAD_0000);

		// -- Check
		assert_eq!(n_str, 0);
		assert_eq!(n_sa, 0);
		assert_eq!(off as usize, CONTEXT_SIZE);
	}

	#[test]
	fn exhausted_buffers_stop_accepting_fields() {
		// -- Setup & Fixtures
		let mem = FakeMem::default();
		mem.map_str(STR_ADDR, &"y".repeat(MAX_STRING_SIZE));
		let mut lane = TestLane::new();
		let mut off = 0u32;
		let mut enc = Encoder::new(&mut lane.event, &mut off, &mem);
		enc.begin();

		// -- Exec: each maximal string takes MAX_STRING_SIZE + 5 bytes.
		let mut writes = 0;
		while enc.write_str(STR_ADDR) != 0 {
			writes += 1;
		}

		// -- Check
		assert_eq!(writes, (MAX_BUFFER_SIZE - CONTEXT_SIZE) / (MAX_STRING_SIZE + 5));
		assert!(enc.bytes_used() <= MAX_BUFFER_SIZE);

		// Small fixed-size fields may still fit in the tail, then stop.
		while enc.write_scalar(1, INT_T) != 0 {}
		assert!(enc.bytes_used() + 1 + MAX_ELEMENT_SIZE > MAX_BUFFER_SIZE);
		assert!(enc.bytes_used() <= MAX_BUFFER_SIZE);
	}

	#[test]
	fn sockaddr_sizes_follow_the_family() {
		// -- Setup & Fixtures
		let mem = FakeMem::default();
		let mut lane = TestLane::new();
		let mut off = 0u32;

		let mut v4 = vec![0u8; SOCKADDR_IN_SIZE];
		v4[..2].copy_from_slice(&AF_INET.to_ne_bytes());
		v4[2..4].copy_from_slice(&443u16.to_be_bytes());
		v4[4..8].copy_from_slice(&[10, 0, 0, 7]);
		mem.map(SA_ADDR, &v4);

		let mut v6 = vec![0u8; SOCKADDR_IN6_SIZE];
		v6[..2].copy_from_slice(&AF_INET6.to_ne_bytes());
		mem.map(SA_ADDR + 0x100, &v6);

		let mut un = vec![0u8; SOCKADDR_UN_SIZE];
		un[..2].copy_from_slice(&AF_UNIX.to_ne_bytes());
		un[2..12].copy_from_slice(b"/tmp/x.sck");
		mem.map(SA_ADDR + 0x200, &un);

		// Unknown family: only the 2-byte tag is copied, so the source
		// may be exactly 2 bytes long.
		mem.map(SA_ADDR + 0x300, &77u16.to_ne_bytes());

		let mut enc = Encoder::new(&mut lane.event, &mut off, &mem);
		enc.begin();

		// -- Exec & Check
		assert_eq!(enc.write_sockaddr(SA_ADDR), 1 + SOCKADDR_IN_SIZE);
		assert_eq!(enc.write_sockaddr(SA_ADDR + 0x100), 1 + SOCKADDR_IN6_SIZE);
		assert_eq!(enc.write_sockaddr(SA_ADDR + 0x200), 1 + SOCKADDR_UN_SIZE);
		assert_eq!(enc.write_sockaddr(SA_ADDR + 0x300), 3);
	}

	#[test]
	fn string_arrays_stop_at_null_and_mark_overflow() -> Result<()> {
		// -- Setup & Fixtures
		let mem = FakeMem::default();
		let mut strings = Vec::new();
		for i in 0..MAX_STR_ARR_ELEM + 4 {
			let addr = STR_ADDR + (i as u64) * 0x100;
			mem.map_str(addr, &format!("arg{i}"));
			strings.push(addr);
		}

		// Short argv: two elements then NULL.
		let mut short = strings[..2].to_vec();
		short.push(0);
		mem.map_words(ARR_ADDR, &short);

		// Oversized argv: more pointers than the element limit.
		mem.map_words(ARR_ADDR + 0x1000, &strings);

		let mut lane = TestLane::new();
		let mut off = 0u32;
		let mut enc = Encoder::new(&mut lane.event, &mut off, &mem);
		enc.begin();
		enc.write_context(&fixture_context(argus_common::SYS_EXECVE, 2, 0));

		// -- Exec
		enc.write_str_array(ARR_ADDR);
		enc.write_str_array(ARR_ADDR + 0x1000);

		// -- Check
		let evt = decode_event(&lane.event.bytes[..off as usize])?;
		assert_eq!(
			evt.fields[0],
			Field::StrArr(vec!["arg0".into(), "arg1".into()])
		);
		match &evt.fields[1] {
			Field::StrArr(elems) => {
				assert_eq!(elems.len(), MAX_STR_ARR_ELEM + 1);
				assert_eq!(elems.last().map(String::as_str), Some("..."));
			}
			other => panic!("expected a string array, got {other:?}"),
		}

		Ok(())
	}

	#[test]
	fn write_args_follows_the_signature() -> Result<()> {
		// -- Setup & Fixtures
		let mem = FakeMem::default();
		mem.map_str(STR_ADDR, "/etc/hosts");
		let mut args = SyscallArgs::default();
		args.args[0] = (-100i64) as u64; // AT_FDCWD
		args.args[1] = STR_ADDR;
		args.args[2] = libc::O_CLOEXEC as u64;

		let mut lane = TestLane::new();
		let mut off = 0u32;
		let mut enc = Encoder::new(&mut lane.event, &mut off, &mem);
		enc.begin();
		enc.write_context(&fixture_context(argus_common::SYS_OPENAT, 3, 3));

		// -- Exec
		enc.write_args(argus_common::signature(argus_common::SYS_OPENAT), &args);

		// -- Check
		let evt = decode_event(&lane.event.bytes[..off as usize])?;
		assert_eq!(
			evt.fields,
			vec![
				Field::Int(-100),
				Field::Str("/etc/hosts".into()),
				Field::OpenFlags(libc::O_CLOEXEC),
			]
		);

		Ok(())
	}

	#[test]
	fn unknown_sockaddr_family_decodes_as_other() -> Result<()> {
		// -- Setup & Fixtures
		let mem = FakeMem::default();
		mem.map(SA_ADDR, &77u16.to_ne_bytes());
		let mut lane = TestLane::new();
		let mut off = 0u32;
		let mut enc = Encoder::new(&mut lane.event, &mut off, &mem);
		enc.begin();
		enc.write_context(&fixture_context(argus_common::SYS_CONNECT, 1, 0));

		// -- Exec
		enc.write_sockaddr(SA_ADDR);

		// -- Check
		let evt = decode_event(&lane.event.bytes[..off as usize])?;
		assert_eq!(evt.fields, vec![Field::SockAddr(SockAddr::Other { family: 77 })]);

		Ok(())
	}
}

// endregion: --- Tests
