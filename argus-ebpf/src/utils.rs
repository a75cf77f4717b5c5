use argus::admission::{AdmissionFilter, MonitorMode, ScopeTable};
use argus::buffer::{Lane, EVENT_BUF, STAGE_BUF};
use argus::correlate::{ArgStore, CorrelationStore};
use argus::error::{ChannelFull, ReadFault, StoreFull};
use argus::mem::MemReader;
use argus::path::VfsView;
use argus::pipeline::{EventChannel, Pipeline};
use argus::task::TaskView;
use argus_common::SyscallArgs;
use aya_ebpf::helpers::{
	bpf_get_current_comm, bpf_get_current_pid_tgid, bpf_get_current_uid_gid, bpf_ktime_get_ns,
	bpf_probe_read, bpf_probe_read_buf, bpf_probe_read_str, r#gen::bpf_get_current_task,
};

use crate::vmlinux::{dentry, mount, nsproxy, pid, pid_namespace, task_struct, upid, vfsmount};
use crate::{ARGS_MAP, BUFS, BUFS_OFFSET, EVT_MAP, PID_NS_MAP};

macro_rules! try_read {
	($ctx:expr, $offset:expr) => {
		match $ctx.read_at($offset) {
			Ok(val) => val,
			Err(_) => return Err(1),
		}
	};
}
pub(crate) use try_read;

/// Mode is fixed at build time, like the kernel object itself.
pub const MONITOR_MODE: MonitorMode = if cfg!(feature = "monitor-host") {
	MonitorMode::Host
} else if cfg!(feature = "monitor-host-and-container") {
	MonitorMode::HostAndContainer
} else {
	MonitorMode::Container
};

static SCOPES: BpfScopes = BpfScopes;
static ARGS: BpfArgs = BpfArgs;
static MEM: BpfMem = BpfMem;
static VFS: BpfVfs = BpfVfs;
static CHANNEL: BpfChannel = BpfChannel;

pub fn pipeline() -> Pipeline<'static, BpfScopes, BpfArgs, BpfMem, BpfVfs, BpfChannel> {
	Pipeline {
		admission: AdmissionFilter::new(MONITOR_MODE, &SCOPES),
		correlate: CorrelationStore::new(&ARGS),
		mem: &MEM,
		vfs: &VFS,
		channel: &CHANNEL,
	}
}

/// Assembles this CPU's scratch lane from the per-cpu slots.
pub fn lane() -> Option<Lane<'static>> {
	let stage_ptr = BUFS.get_ptr_mut(STAGE_BUF)?;
	Some(Lane {
		event: unsafe { &mut *BUFS.get_ptr_mut(EVENT_BUF)? },
		stage: unsafe { &mut *stage_ptr },
		event_off: unsafe { &mut *BUFS_OFFSET.get_ptr_mut(EVENT_BUF)? },
		stage_off: unsafe { &mut *BUFS_OFFSET.get_ptr_mut(STAGE_BUF)? },
		stage_base: stage_ptr as u64,
	})
}

// region:    --- Current task

pub struct CurrentTask {
	task: *const task_struct,
}

impl CurrentTask {
	pub fn get() -> Self {
		Self {
			task: unsafe { bpf_get_current_task() } as *const task_struct,
		}
	}
}

unsafe fn task_pid_ns(task: *const task_struct) -> *const pid_namespace {
	if task.is_null() {
		return core::ptr::null();
	}
	let nsproxy: *const nsproxy = match bpf_probe_read(&(*task).nsproxy) {
		Ok(p) => p,
		Err(_) => return core::ptr::null(),
	};
	if nsproxy.is_null() {
		return core::ptr::null();
	}
	match bpf_probe_read(&(*nsproxy).pid_ns_for_children) {
		Ok(p) => p,
		Err(_) => core::ptr::null(),
	}
}

unsafe fn pid_ns_inum(task: *const task_struct) -> u32 {
	let pid_ns = task_pid_ns(task);
	if pid_ns.is_null() {
		return 0;
	}
	match bpf_probe_read(&(*pid_ns).ns.inum) {
		Ok(inum) => inum,
		Err(_) => 0,
	}
}

unsafe fn mnt_ns_inum(task: *const task_struct) -> u32 {
	if task.is_null() {
		return 0;
	}
	let nsproxy: *const nsproxy = match bpf_probe_read(&(*task).nsproxy) {
		Ok(p) => p,
		Err(_) => return 0,
	};
	if nsproxy.is_null() {
		return 0;
	}
	let mnt_ns = match bpf_probe_read(&(*nsproxy).mnt_ns) {
		Ok(p) => p,
		Err(_) => return 0,
	};
	if mnt_ns.is_null() {
		return 0;
	}
	match bpf_probe_read(&(*mnt_ns).ns.inum) {
		Ok(inum) => inum,
		Err(_) => 0,
	}
}

/// The task's pid number at its own namespace level
/// (thread_pid->numbers[level].nr).
unsafe fn ns_pid_nr(task: *const task_struct) -> u32 {
	let pid_ns = task_pid_ns(task);
	if pid_ns.is_null() {
		return 0;
	}
	let level: u32 = match bpf_probe_read(&(*pid_ns).level) {
		Ok(l) => l,
		Err(_) => return 0,
	};
	let thread_pid: *const pid = match bpf_probe_read(&(*task).thread_pid) {
		Ok(p) => p,
		Err(_) => return 0,
	};
	if thread_pid.is_null() {
		return 0;
	}
	let upid = (thread_pid as *const u8)
		.add(core::mem::offset_of!(pid, numbers) + level as usize * core::mem::size_of::<upid>())
		as *const upid;
	match bpf_probe_read(&(*upid).nr) {
		Ok(nr) => nr as u32,
		Err(_) => 0,
	}
}

unsafe fn task_parent(task: *const task_struct) -> *const task_struct {
	if task.is_null() {
		return core::ptr::null();
	}
	match bpf_probe_read(&(*task).real_parent) {
		Ok(p) => p,
		Err(_) => core::ptr::null(),
	}
}

unsafe fn task_group_leader(task: *const task_struct) -> *const task_struct {
	if task.is_null() {
		return core::ptr::null();
	}
	match bpf_probe_read(&(*task).group_leader) {
		Ok(p) => p,
		Err(_) => core::ptr::null(),
	}
}

impl TaskView for CurrentTask {
	fn timestamp_ns(&self) -> u64 {
		unsafe { bpf_ktime_get_ns() }
	}

	fn host_pid(&self) -> u32 {
		bpf_get_current_pid_tgid() as u32
	}

	fn host_tgid(&self) -> u32 {
		(bpf_get_current_pid_tgid() >> 32) as u32
	}

	fn host_ppid(&self) -> u32 {
		unsafe {
			let parent = task_parent(self.task);
			if parent.is_null() {
				return 0;
			}
			match bpf_probe_read(&(*parent).tgid) {
				Ok(tgid) => tgid as u32,
				Err(_) => 0,
			}
		}
	}

	fn ns_pid(&self) -> u32 {
		unsafe { ns_pid_nr(self.task) }
	}

	fn ns_tgid(&self) -> u32 {
		unsafe { ns_pid_nr(task_group_leader(self.task)) }
	}

	fn ns_ppid(&self) -> u32 {
		unsafe { ns_pid_nr(task_parent(self.task)) }
	}

	fn pid_ns(&self) -> u32 {
		unsafe { pid_ns_inum(self.task) }
	}

	fn mnt_ns(&self) -> u32 {
		unsafe { mnt_ns_inum(self.task) }
	}

	fn uid(&self) -> u32 {
		bpf_get_current_uid_gid() as u32
	}

	fn comm(&self) -> [u8; 16] {
		bpf_get_current_comm().unwrap_or([0u8; 16])
	}
}

// endregion: --- Current task

// region:    --- Collaborator impls

pub struct BpfScopes;

impl ScopeTable for BpfScopes {
	fn contains(&self, key: u32) -> bool {
		unsafe { PID_NS_MAP.get(&key).is_some() }
	}

	fn insert(&self, key: u32) -> bool {
		PID_NS_MAP.insert(&key, &1u32, 0).is_ok()
	}

	fn remove(&self, key: u32) {
		let _ = PID_NS_MAP.remove(&key);
	}
}

pub struct BpfArgs;

impl ArgStore for BpfArgs {
	fn insert(&self, key: u64, args: &SyscallArgs) -> Result<(), StoreFull> {
		ARGS_MAP.insert(&key, args, 0).map_err(|_| StoreFull)
	}

	fn remove(&self, key: u64) -> Option<SyscallArgs> {
		let args = unsafe { ARGS_MAP.get(&key).copied() }?;
		let _ = ARGS_MAP.remove(&key);
		Some(args)
	}
}

pub struct BpfMem;

// The legacy probe_read flavor is kept deliberately: syscall arguments
// point into user memory, while a re-stashed resolved path points into
// a per-cpu kernel buffer, and both flow through the same reads.
impl MemReader for BpfMem {
	fn read_bytes(&self, addr: u64, dst: &mut [u8]) -> Result<(), ReadFault> {
		unsafe { bpf_probe_read_buf(addr as *const u8, dst).map_err(|_| ReadFault) }
	}

	fn read_str(&self, addr: u64, dst: &mut [u8]) -> Result<usize, ReadFault> {
		unsafe { bpf_probe_read_str(addr as *const u8, dst).map_err(|_| ReadFault) }
	}
}

pub struct BpfVfs;

impl VfsView for BpfVfs {
	type Dentry = *const dentry;
	type Mount = *const mount;

	fn dentry_parent(&self, d: Self::Dentry) -> Result<Self::Dentry, ReadFault> {
		unsafe { bpf_probe_read(&(*d).d_parent).map(|p| p as *const dentry).map_err(|_| ReadFault) }
	}

	fn dentry_name_len(&self, d: Self::Dentry) -> Result<u32, ReadFault> {
		unsafe { bpf_probe_read(&(*d).d_name.len).map_err(|_| ReadFault) }
	}

	fn dentry_name(&self, d: Self::Dentry, dst: &mut [u8]) -> Result<(), ReadFault> {
		let name = unsafe { bpf_probe_read(&(*d).d_name.name).map_err(|_| ReadFault)? };
		unsafe { bpf_probe_read_buf(name, dst).map_err(|_| ReadFault) }
	}

	fn mount_root(&self, m: Self::Mount) -> Result<Self::Dentry, ReadFault> {
		unsafe {
			bpf_probe_read(&(*m).mnt.mnt_root)
				.map(|p| p as *const dentry)
				.map_err(|_| ReadFault)
		}
	}

	fn mount_parent(&self, m: Self::Mount) -> Result<Self::Mount, ReadFault> {
		unsafe { bpf_probe_read(&(*m).mnt_parent).map(|p| p as *const mount).map_err(|_| ReadFault) }
	}

	fn mount_mountpoint(&self, m: Self::Mount) -> Result<Self::Dentry, ReadFault> {
		unsafe {
			bpf_probe_read(&(*m).mnt_mountpoint)
				.map(|p| p as *const dentry)
				.map_err(|_| ReadFault)
		}
	}
}

/// container_of: the mount embedding this vfsmount.
pub fn real_mount(vfsmnt: *const vfsmount) -> *const mount {
	unsafe { (vfsmnt as *const u8).sub(core::mem::offset_of!(mount, mnt)) as *const mount }
}

pub struct BpfChannel;

impl EventChannel for BpfChannel {
	fn submit(&self, payload: &[u8]) -> Result<(), ChannelFull> {
		EVT_MAP.output(payload, 0).map_err(|_| ChannelFull)
	}
}

// endregion: --- Collaborator impls
