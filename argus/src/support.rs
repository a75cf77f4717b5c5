//! Test doubles for the injected collaborators: fixture task views,
//! mutexed tables, a synthetic traced address space, a fixture VFS
//! tree and a bounded channel sink.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use argus_common::{SysContext, SyscallArgs, PID_NS_INIT_INO, TASK_COMM_LEN};

use crate::admission::ScopeTable;
use crate::buffer::{EventBuf, Lane};
use crate::correlate::ArgStore;
use crate::error::{ChannelFull, ReadFault, StoreFull};
use crate::mem::MemReader;
use crate::path::VfsView;
use crate::pipeline::EventChannel;
use crate::task::TaskView;

pub fn comm_bytes(name: &str) -> [u8; TASK_COMM_LEN] {
	let mut comm = [0u8; TASK_COMM_LEN];
	let n = name.len().min(TASK_COMM_LEN - 1);
	comm[..n].copy_from_slice(&name.as_bytes()[..n]);
	comm
}

pub fn fixture_context(event_id: u32, argnum: u32, retval: i64) -> SysContext {
	SysContext {
		ts: 1_000,
		pid_id: 0,
		mnt_id: 0,
		host_ppid: 1,
		host_pid: 100,
		host_tgid: 100,
		ppid: 1,
		pid: 100,
		tgid: 100,
		uid: 0,
		event_id,
		argnum,
		retval,
		comm: comm_bytes("fixture"),
	}
}

// region:    --- Task fixture

#[derive(Clone)]
pub struct TaskFixture {
	pub ts: u64,
	pub host_pid: u32,
	pub host_tgid: u32,
	pub host_ppid: u32,
	pub ns_pid: u32,
	pub ns_tgid: u32,
	pub ns_ppid: u32,
	pub pid_ns: u32,
	pub mnt_ns: u32,
	pub uid: u32,
	pub comm: [u8; TASK_COMM_LEN],
}

impl TaskFixture {
	/// A task in the init namespace; host- and ns-scoped ids coincide.
	pub fn host(pid: u32) -> Self {
		Self {
			ts: 1_000,
			host_pid: pid,
			host_tgid: pid,
			host_ppid: 1,
			ns_pid: pid,
			ns_tgid: pid,
			ns_ppid: 1,
			pid_ns: PID_NS_INIT_INO,
			mnt_ns: PID_NS_INIT_INO - 2,
			uid: 0,
			comm: comm_bytes("fixture"),
		}
	}

	/// A namespaced task with its own pid numbering.
	pub fn container(host_pid: u32, ns_pid: u32, pid_ns: u32) -> Self {
		Self {
			ts: 1_000,
			host_pid,
			host_tgid: host_pid,
			host_ppid: host_pid.saturating_sub(1),
			ns_pid,
			ns_tgid: ns_pid,
			ns_ppid: 0,
			pid_ns,
			mnt_ns: pid_ns.wrapping_add(1),
			uid: 0,
			comm: comm_bytes("fixture"),
		}
	}
}

impl TaskView for TaskFixture {
	fn timestamp_ns(&self) -> u64 {
		self.ts
	}
	fn host_pid(&self) -> u32 {
		self.host_pid
	}
	fn host_tgid(&self) -> u32 {
		self.host_tgid
	}
	fn host_ppid(&self) -> u32 {
		self.host_ppid
	}
	fn ns_pid(&self) -> u32 {
		self.ns_pid
	}
	fn ns_tgid(&self) -> u32 {
		self.ns_tgid
	}
	fn ns_ppid(&self) -> u32 {
		self.ns_ppid
	}
	fn pid_ns(&self) -> u32 {
		self.pid_ns
	}
	fn mnt_ns(&self) -> u32 {
		self.mnt_ns
	}
	fn uid(&self) -> u32 {
		self.uid
	}
	fn comm(&self) -> [u8; TASK_COMM_LEN] {
		self.comm
	}
}

// endregion: --- Task fixture

// region:    --- Tables

#[derive(Default)]
pub struct ScopeSet(Mutex<HashSet<u32>>);

impl ScopeTable for ScopeSet {
	fn contains(&self, key: u32) -> bool {
		self.0.lock().unwrap().contains(&key)
	}
	fn insert(&self, key: u32) -> bool {
		self.0.lock().unwrap().insert(key);
		true
	}
	fn remove(&self, key: u32) {
		self.0.lock().unwrap().remove(&key);
	}
}

#[derive(Default)]
pub struct ArgMap(Mutex<HashMap<u64, SyscallArgs>>);

impl ArgMap {
	pub fn is_empty(&self) -> bool {
		self.0.lock().unwrap().is_empty()
	}
}

impl ArgStore for ArgMap {
	fn insert(&self, key: u64, args: &SyscallArgs) -> Result<(), StoreFull> {
		self.0.lock().unwrap().insert(key, *args);
		Ok(())
	}
	fn remove(&self, key: u64) -> Option<SyscallArgs> {
		self.0.lock().unwrap().remove(&key)
	}
}

// endregion: --- Tables

// region:    --- Fake address space

/// Synthetic traced address space: reads resolve against explicitly
/// mapped regions and fault everywhere else. Later mappings shadow
/// earlier ones.
#[derive(Default)]
pub struct FakeMem {
	regions: Mutex<Vec<(u64, Vec<u8>)>>,
}

impl FakeMem {
	pub fn map(&self, addr: u64, bytes: &[u8]) {
		self.regions.lock().unwrap().push((addr, bytes.to_vec()));
	}

	pub fn map_str(&self, addr: u64, s: &str) {
		let mut bytes = s.as_bytes().to_vec();
		bytes.push(0);
		self.map(addr, &bytes);
	}

	pub fn map_words(&self, addr: u64, words: &[u64]) {
		let mut bytes = Vec::with_capacity(words.len() * 8);
		for w in words {
			bytes.extend_from_slice(&w.to_ne_bytes());
		}
		self.map(addr, &bytes);
	}

	fn with_region<R>(
		&self,
		addr: u64,
		f: impl FnOnce(&[u8]) -> Result<R, ReadFault>,
	) -> Result<R, ReadFault> {
		let regions = self.regions.lock().unwrap();
		for (base, bytes) in regions.iter().rev() {
			if addr >= *base && addr < *base + bytes.len() as u64 {
				return f(&bytes[(addr - *base) as usize..]);
			}
		}
		Err(ReadFault)
	}
}

impl MemReader for FakeMem {
	fn read_bytes(&self, addr: u64, dst: &mut [u8]) -> Result<(), ReadFault> {
		self.with_region(addr, |avail| {
			if avail.len() < dst.len() {
				return Err(ReadFault);
			}
			dst.copy_from_slice(&avail[..dst.len()]);
			Ok(())
		})
	}

	fn read_str(&self, addr: u64, dst: &mut [u8]) -> Result<usize, ReadFault> {
		self.with_region(addr, |avail| {
			if dst.is_empty() {
				return Err(ReadFault);
			}
			for i in 0..dst.len() {
				let b = *avail.get(i).ok_or(ReadFault)?;
				dst[i] = b;
				if b == 0 {
					return Ok(i + 1);
				}
			}
			dst[dst.len() - 1] = 0;
			Ok(dst.len())
		})
	}
}

// endregion: --- Fake address space

// region:    --- Fake VFS

struct MountNode {
	root: usize,
	parent: usize,
	mountpoint: usize,
}

/// Fixture dentry/mount forest. Index 0 is the global root dentry and
/// the root mount (both self-parented, like the kernel's).
pub struct FakeVfs {
	names: Vec<String>,
	parents: Vec<usize>,
	mounts: Vec<MountNode>,
}

impl FakeVfs {
	pub const ROOT_DENTRY: usize = 0;
	pub const ROOT_MOUNT: usize = 0;

	pub fn new() -> Self {
		Self {
			names: vec!["/".into()],
			parents: vec![Self::ROOT_DENTRY],
			mounts: vec![MountNode {
				root: Self::ROOT_DENTRY,
				parent: Self::ROOT_MOUNT,
				mountpoint: Self::ROOT_DENTRY,
			}],
		}
	}

	pub fn add_dentry(&mut self, name: &str, parent: usize) -> usize {
		self.names.push(name.into());
		self.parents.push(parent);
		self.names.len() - 1
	}

	/// A self-parented entry outside any directory tree (memfd-like).
	pub fn add_detached_dentry(&mut self, name: &str) -> usize {
		let id = self.names.len();
		self.names.push(name.into());
		self.parents.push(id);
		id
	}

	/// Mounts a fresh filesystem at `mountpoint`; returns the mount and
	/// the mounted filesystem's root dentry.
	pub fn add_mount(&mut self, parent: usize, mountpoint: usize) -> (usize, usize) {
		let root = self.add_detached_dentry("/");
		self.mounts.push(MountNode { root, parent, mountpoint });
		(self.mounts.len() - 1, root)
	}
}

impl VfsView for FakeVfs {
	type Dentry = usize;
	type Mount = usize;

	fn dentry_parent(&self, d: usize) -> Result<usize, ReadFault> {
		self.parents.get(d).copied().ok_or(ReadFault)
	}

	fn dentry_name_len(&self, d: usize) -> Result<u32, ReadFault> {
		self.names.get(d).map(|n| n.len() as u32).ok_or(ReadFault)
	}

	fn dentry_name(&self, d: usize, dst: &mut [u8]) -> Result<(), ReadFault> {
		let name = self.names.get(d).ok_or(ReadFault)?;
		if dst.len() > name.len() {
			return Err(ReadFault);
		}
		dst.copy_from_slice(&name.as_bytes()[..dst.len()]);
		Ok(())
	}

	fn mount_root(&self, m: usize) -> Result<usize, ReadFault> {
		self.mounts.get(m).map(|n| n.root).ok_or(ReadFault)
	}

	fn mount_parent(&self, m: usize) -> Result<usize, ReadFault> {
		self.mounts.get(m).map(|n| n.parent).ok_or(ReadFault)
	}

	fn mount_mountpoint(&self, m: usize) -> Result<usize, ReadFault> {
		self.mounts.get(m).map(|n| n.mountpoint).ok_or(ReadFault)
	}
}

// endregion: --- Fake VFS

// region:    --- Lane & channel

/// Owns the scratch state a probe would get from its per-CPU slots.
pub struct TestLane {
	pub event: Box<EventBuf>,
	pub stage: Box<EventBuf>,
	pub event_off: u32,
	pub stage_off: u32,
}

impl TestLane {
	pub fn new() -> Self {
		Self {
			event: Box::new(EventBuf::zeroed()),
			stage: Box::new(EventBuf::zeroed()),
			event_off: 0,
			stage_off: 0,
		}
	}

	pub fn lane(&mut self, stage_base: u64) -> Lane<'_> {
		Lane {
			event: &mut *self.event,
			stage: &mut *self.stage,
			event_off: &mut self.event_off,
			stage_off: &mut self.stage_off,
			stage_base,
		}
	}
}

pub struct ChannelSink {
	tx: flume::Sender<Vec<u8>>,
}

impl EventChannel for ChannelSink {
	fn submit(&self, payload: &[u8]) -> Result<(), ChannelFull> {
		self.tx.try_send(payload.to_vec()).map_err(|_| ChannelFull)
	}
}

pub fn channel_sink(cap: usize) -> (ChannelSink, flume::Receiver<Vec<u8>>) {
	let (tx, rx) = flume::bounded(cap);
	(ChannelSink { tx }, rx)
}

// endregion: --- Lane & channel
