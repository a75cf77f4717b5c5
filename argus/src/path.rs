use argus_common::{MAX_BUFFER_SIZE, MAX_STRING_SIZE};

use crate::buffer::EventBuf;
use crate::error::ReadFault;

/// Upper bound on upward steps through the dentry/mount chain. The
/// execution environment forbids unbounded walks, and the bound also
/// contains corrupt or cyclic chains; running into it keeps the
/// deepest resolvable suffix.
pub const MAX_PATH_DEPTH: usize = 5;

/// Path strings grow right-to-left from the midpoint of the staging
/// buffer; the lower half doubles as the bare-name fallback area.
pub const PATH_STAGE_MID: usize = MAX_BUFFER_SIZE / 2;

/// Upward traversal over directory entries and their owning mounts.
/// The BPF implementation probe-reads kernel structs; tests walk a
/// fixture tree.
pub trait VfsView {
	type Dentry: Copy + PartialEq;
	type Mount: Copy + PartialEq;

	fn dentry_parent(&self, d: Self::Dentry) -> Result<Self::Dentry, ReadFault>;
	fn dentry_name_len(&self, d: Self::Dentry) -> Result<u32, ReadFault>;
	/// Copies exactly `dst.len()` name bytes.
	fn dentry_name(&self, d: Self::Dentry, dst: &mut [u8]) -> Result<(), ReadFault>;

	fn mount_root(&self, m: Self::Mount) -> Result<Self::Dentry, ReadFault>;
	fn mount_parent(&self, m: Self::Mount) -> Result<Self::Mount, ReadFault>;
	fn mount_mountpoint(&self, m: Self::Mount) -> Result<Self::Dentry, ReadFault>;
}

/// Rebuilds the absolute path of `dentry` into the staging buffer,
/// NUL-terminated and with a leading separator, and records the start
/// offset in the lane's staging cursor slot.
///
/// Entries with no filesystem path (anonymous files) yield their bare
/// name from offset 0 instead.
pub fn resolve_path<V: VfsView>(
	vfs: &V,
	stage: &mut EventBuf,
	stage_off: &mut u32,
	mnt: V::Mount,
	dentry: V::Dentry,
) -> u32 {
	let mut d = dentry;
	let mut m = mnt;
	let mut off = PATH_STAGE_MID;

	for _ in 0..MAX_PATH_DEPTH {
		let (root, parent) = match (vfs.mount_root(m), vfs.dentry_parent(d)) {
			(Ok(r), Ok(p)) => (r, p),
			_ => break,
		};

		if d == root || d == parent {
			if d != root {
				// A self-parented entry that is not the mount root has
				// escaped its mount; keep what we have.
				break;
			}
			let mnt_parent = match vfs.mount_parent(m) {
				Ok(p) => p,
				Err(_) => break,
			};
			if m != mnt_parent {
				// Crossing a mount boundary adds no name component:
				// continue from where the child mount is attached.
				d = match vfs.mount_mountpoint(m) {
					Ok(p) => p,
					Err(_) => break,
				};
				m = mnt_parent;
				continue;
			}
			// Global root: fully resolved.
			break;
		}

		let len = match vfs.dentry_name_len(d) {
			Ok(l) => l as usize & (MAX_STRING_SIZE - 1),
			Err(_) => break,
		};
		if len == 0 || len + 1 > off {
			break;
		}
		let noff = off - (len + 1);
		if vfs.dentry_name(d, &mut stage.bytes[noff..noff + len]).is_err() {
			break;
		}
		stage.bytes[noff + len] = b'/';
		off = noff;
		d = parent;
	}

	if off == PATH_STAGE_MID {
		// Nothing was written: the entry has no path in the filesystem
		// (memfd and friends). Its bare name is the whole result.
		off = 0;
		let len = vfs.dentry_name_len(d).map(|l| l as usize).unwrap_or(0);
		let len = core::cmp::min(len, MAX_STRING_SIZE - 1);
		if len > 0 && vfs.dentry_name(d, &mut stage.bytes[..len]).is_ok() {
			stage.bytes[len] = 0;
		} else {
			stage.bytes[0] = 0;
		}
	} else {
		off -= 1;
		stage.bytes[off] = b'/';
		// The deepest component's separator slot becomes the NUL.
		stage.bytes[PATH_STAGE_MID - 1] = 0;
	}

	*stage_off = off as u32;
	off as u32
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	use crate::support::{FakeVfs, TestLane};

	use super::*;

	fn staged(stage: &EventBuf, off: u32) -> &str {
		let tail = &stage.bytes[off as usize..];
		let end = tail.iter().position(|&b| b == 0).expect("resolver output is NUL-terminated");
		core::str::from_utf8(&tail[..end]).expect("resolver output is utf8 here")
	}

	#[test]
	fn resolves_an_absolute_path() {
		// -- Setup & Fixtures
		let mut vfs = FakeVfs::new();
		let etc = vfs.add_dentry("etc", FakeVfs::ROOT_DENTRY);
		let passwd = vfs.add_dentry("passwd", etc);
		let mut lane = TestLane::new();

		// -- Exec
		let off = resolve_path(&vfs, &mut lane.stage, &mut lane.stage_off, FakeVfs::ROOT_MOUNT, passwd);

		// -- Check
		assert_eq!(staged(&lane.stage, off), "/etc/passwd");
		assert_eq!(lane.stage.bytes[PATH_STAGE_MID - 1], 0);
		assert_eq!(lane.stage_off, off);
	}

	#[test]
	fn depth_overflow_keeps_the_deepest_suffix() {
		// -- Setup & Fixtures
		let mut vfs = FakeVfs::new();
		let mut parent = FakeVfs::ROOT_DENTRY;
		for name in ["a", "b", "c", "d", "e", "f", "g"] {
			parent = vfs.add_dentry(name, parent);
		}
		let mut lane = TestLane::new();

		// -- Exec
		let off = resolve_path(&vfs, &mut lane.stage, &mut lane.stage_off, FakeVfs::ROOT_MOUNT, parent);

		// -- Check: the walk stops after five components, deepest first.
		assert_eq!(staged(&lane.stage, off), "/c/d/e/f/g");
	}

	#[test]
	fn crosses_mount_boundaries_at_the_mountpoint() {
		// -- Setup & Fixtures
		let mut vfs = FakeVfs::new();
		let mnt_dir = vfs.add_dentry("mnt", FakeVfs::ROOT_DENTRY);
		let (volume, volume_root) = vfs.add_mount(FakeVfs::ROOT_MOUNT, mnt_dir);
		let data = vfs.add_dentry("data", volume_root);
		let mut lane = TestLane::new();

		// -- Exec
		let off = resolve_path(&vfs, &mut lane.stage, &mut lane.stage_off, volume, data);

		// -- Check
		assert_eq!(staged(&lane.stage, off), "/mnt/data");
	}

	#[test]
	fn anonymous_entries_fall_back_to_their_bare_name() {
		// -- Setup & Fixtures
		let mut vfs = FakeVfs::new();
		let memfd = vfs.add_detached_dentry("memfd:shm");
		let mut lane = TestLane::new();

		// -- Exec
		let off = resolve_path(&vfs, &mut lane.stage, &mut lane.stage_off, FakeVfs::ROOT_MOUNT, memfd);

		// -- Check
		assert_eq!(off, 0);
		assert_eq!(staged(&lane.stage, 0), "memfd:shm");
	}
}

// endregion: --- Tests
