use argus_common::{
	arg_count, signature, SysContext, SyscallArgs, DO_EXIT, ENOENT_RET, MAX_BUFFER_SIZE,
	SYS_EXECVE, SYS_EXECVEAT, SYS_OPEN, SYS_OPENAT,
};

use crate::admission::{AdmissionFilter, ScopeTable};
use crate::buffer::Lane;
use crate::correlate::{ArgStore, CorrelationStore};
use crate::encode::Encoder;
use crate::error::ChannelFull;
use crate::mem::MemReader;
use crate::path::{resolve_path, VfsView};
use crate::task::TaskView;

/// Submission endpoint for finished events. A full or unavailable
/// channel drops the event; there is no retry, no blocking and no
/// buffering beyond the lane's scratch region.
pub trait EventChannel {
	fn submit(&self, payload: &[u8]) -> Result<(), ChannelFull>;
}

/// Per-syscall probe logic over injected collaborators: admission
/// check, entry-side argument stash, file-open path augmentation,
/// exit-side generic encode, emission.
pub struct Pipeline<'a, S, A, M, V, C>
where
	S: ScopeTable,
	A: ArgStore,
	M: MemReader,
	V: VfsView,
	C: EventChannel,
{
	pub admission: AdmissionFilter<'a, S>,
	pub correlate: CorrelationStore<'a, A>,
	pub mem: &'a M,
	pub vfs: &'a V,
	pub channel: &'a C,
}

impl<'a, S, A, M, V, C> Pipeline<'a, S, A, M, V, C>
where
	S: ScopeTable,
	A: ArgStore,
	M: MemReader,
	V: VfsView,
	C: EventChannel,
{
	fn build_context(
		&self,
		task: &impl TaskView,
		event_id: u32,
		argnum: u32,
		retval: i64,
	) -> SysContext {
		let host = self.admission.is_host_scoped(task);
		SysContext {
			ts: task.timestamp_ns(),
			pid_id: if host { 0 } else { task.pid_ns() },
			mnt_id: if host { 0 } else { task.mnt_ns() },
			host_ppid: task.host_ppid(),
			host_pid: task.host_pid(),
			host_tgid: task.host_tgid(),
			ppid: if host { task.host_ppid() } else { task.ns_ppid() },
			pid: if host { task.host_pid() } else { task.ns_pid() },
			tgid: if host { task.host_tgid() } else { task.ns_tgid() },
			uid: task.uid(),
			event_id,
			argnum,
			retval,
			comm: task.comm(),
		}
	}

	fn submit(&self, lane: &Lane<'_>) -> bool {
		let size = (*lane.event_off as usize) & (MAX_BUFFER_SIZE - 1);
		self.channel.submit(&lane.event.bytes[..size]).is_ok()
	}

	/// Execute-with-path: fully known at entry, encoded eagerly at a
	/// single probe point. Also the admission site: the first exec seen
	/// in a scope (a namespace's init, a tracked host root) brings that
	/// scope into the table.
	pub fn trace_exec_entry(
		&self,
		task: &impl TaskView,
		lane: &mut Lane<'_>,
		filename: u64,
		argv: u64,
	) -> bool {
		if self.admission.admit(task).is_none() {
			return false;
		}
		let types = signature(SYS_EXECVE);
		let cx = self.build_context(task, SYS_EXECVE, arg_count(types), 0);
		{
			let mut enc = Encoder::new(&mut *lane.event, &mut *lane.event_off, self.mem);
			enc.begin();
			enc.write_context(&cx);
			enc.write_str(filename);
			enc.write_str_array(argv);
		}
		self.submit(lane)
	}

	/// Execute-at-directory-fd variant, same single-point shape.
	pub fn trace_execat_entry(
		&self,
		task: &impl TaskView,
		lane: &mut Lane<'_>,
		dirfd: u64,
		pathname: u64,
		argv: u64,
		flags: u64,
	) -> bool {
		if self.admission.admit(task).is_none() {
			return false;
		}
		let types = signature(SYS_EXECVEAT);
		let cx = self.build_context(task, SYS_EXECVEAT, arg_count(types), 0);
		{
			let mut enc = Encoder::new(&mut *lane.event, &mut *lane.event_off, self.mem);
			enc.begin();
			enc.write_context(&cx);
			enc.write_scalar(dirfd as u32, argus_common::INT_T);
			enc.write_str(pathname);
			enc.write_str_array(argv);
			enc.write_scalar(flags as u32, argus_common::EXEC_FLAGS_T);
		}
		self.submit(lane)
	}

	/// Process exit: header-only event carrying the exit code, then the
	/// scope release.
	pub fn trace_exit(&self, task: &impl TaskView, lane: &mut Lane<'_>, code: i64) -> bool {
		if !self.admission.is_admitted(task) {
			return false;
		}
		let cx = self.build_context(task, DO_EXIT, 0, code);
		self.admission.release(task);
		{
			let mut enc = Encoder::new(&mut *lane.event, &mut *lane.event_off, self.mem);
			enc.begin();
			enc.write_context(&cx);
		}
		self.submit(lane)
	}

	/// Generic file/network entry: admission check, then stash the raw
	/// argument words for the matching exit.
	pub fn trace_entry(&self, task: &impl TaskView, event_id: u32, args: &SyscallArgs) -> bool {
		if !self.admission.is_admitted(task) {
			return false;
		}
		self.correlate.stash(event_id, task.host_tgid(), args).is_ok()
	}

	/// File-open augmentation, between entry and exit: resolve the
	/// opened file's absolute path into the staging buffer and swap the
	/// stashed path argument for a pointer to it, so the exit encoder
	/// sees an ordinary string.
	pub fn augment_file_open(
		&self,
		task: &impl TaskView,
		lane: &mut Lane<'_>,
		mnt: V::Mount,
		dentry: V::Dentry,
	) -> bool {
		let tgid = task.host_tgid();
		// The open flavors stage their path in different slots.
		let (event_id, slot, mut args) = match self.correlate.take(SYS_OPENAT, tgid) {
			Some(args) => (SYS_OPENAT, 1, args),
			None => match self.correlate.take(SYS_OPEN, tgid) {
				Some(args) => (SYS_OPEN, 0, args),
				None => return false,
			},
		};
		let off = resolve_path(self.vfs, &mut *lane.stage, &mut *lane.stage_off, mnt, dentry);
		args.args[slot] = lane.stage_base + off as u64;
		self.correlate.stash(event_id, tgid, &args).is_ok()
	}

	/// Generic exit: consume the stashed entry (none means the call was
	/// never tracked — emit nothing), re-check admission, suppress
	/// -ENOENT returns, then encode header and arguments per the
	/// syscall's signature and hand the buffer to the channel.
	pub fn trace_ret_generic(
		&self,
		task: &impl TaskView,
		lane: &mut Lane<'_>,
		event_id: u32,
		retval: i64,
	) -> bool {
		// Take first: a suppressed or unadmitted exit still retires its
		// correlation entry.
		let Some(args) = self.correlate.take(event_id, task.host_tgid()) else {
			return false;
		};
		if !self.admission.is_admitted(task) {
			return false;
		}
		if retval == ENOENT_RET {
			return false;
		}
		let types = signature(event_id);
		let cx = self.build_context(task, event_id, arg_count(types), retval);
		{
			let mut enc = Encoder::new(&mut *lane.event, &mut *lane.event_off, self.mem);
			enc.begin();
			enc.write_context(&cx);
			enc.write_args(types, &args);
		}
		self.submit(lane)
	}
}

// region:    --- Tests


// endregion: --- Tests
