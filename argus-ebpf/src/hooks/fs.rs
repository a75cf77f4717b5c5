use argus_common::{SyscallArgs, SYS_CLOSE, SYS_OPEN, SYS_OPENAT};
use aya_ebpf::helpers::bpf_probe_read;
use aya_ebpf::programs::{ProbeContext, TracePointContext};
use aya_log_ebpf::error;

use crate::utils::{lane, pipeline, real_mount, try_read, CurrentTask};
use crate::vmlinux::{dentry, file, path};

// Per-syscall tracepoints store arguments as 64-bit fields from
// offset 16; sys_exit tracepoints store the return value there.
pub(crate) const TP_ARG0: usize = 16;
pub(crate) const TP_RET: usize = 16;

pub(crate) fn exit_probe(ctx: &TracePointContext, event_id: u32) -> Result<u32, u32> {
	let retval: i64 = unsafe { try_read!(ctx, TP_RET) };

	let task = CurrentTask::get();
	let Some(mut lane) = lane() else {
		error!(ctx, "scratch buffers unavailable");
		return Err(1);
	};

	pipeline().trace_ret_generic(&task, &mut lane, event_id, retval);
	Ok(0)
}

pub fn try_sys_enter_open(ctx: TracePointContext) -> Result<u32, u32> {
	let mut args = SyscallArgs::default();
	args.args[0] = unsafe { try_read!(ctx, TP_ARG0) }; // filename
	args.args[1] = unsafe { try_read!(ctx, TP_ARG0 + 8) }; // flags
	args.args[2] = unsafe { try_read!(ctx, TP_ARG0 + 16) }; // mode

	pipeline().trace_entry(&CurrentTask::get(), SYS_OPEN, &args);
	Ok(0)
}

pub fn try_sys_exit_open(ctx: TracePointContext) -> Result<u32, u32> {
	exit_probe(&ctx, SYS_OPEN)
}

pub fn try_sys_enter_openat(ctx: TracePointContext) -> Result<u32, u32> {
	let mut args = SyscallArgs::default();
	args.args[0] = unsafe { try_read!(ctx, TP_ARG0) }; // dfd
	args.args[1] = unsafe { try_read!(ctx, TP_ARG0 + 8) }; // filename
	args.args[2] = unsafe { try_read!(ctx, TP_ARG0 + 16) }; // flags
	args.args[3] = unsafe { try_read!(ctx, TP_ARG0 + 24) }; // mode

	pipeline().trace_entry(&CurrentTask::get(), SYS_OPENAT, &args);
	Ok(0)
}

pub fn try_sys_exit_openat(ctx: TracePointContext) -> Result<u32, u32> {
	exit_probe(&ctx, SYS_OPENAT)
}

pub fn try_sys_enter_close(ctx: TracePointContext) -> Result<u32, u32> {
	let mut args = SyscallArgs::default();
	args.args[0] = unsafe { try_read!(ctx, TP_ARG0) }; // fd

	pipeline().trace_entry(&CurrentTask::get(), SYS_CLOSE, &args);
	Ok(0)
}

pub fn try_sys_exit_close(ctx: TracePointContext) -> Result<u32, u32> {
	exit_probe(&ctx, SYS_CLOSE)
}

// Interposes between an open entry and its exit: swaps the stashed
// path argument for the file's resolved absolute path.
pub fn try_security_file_open(ctx: ProbeContext) -> Result<u32, u32> {
	let f: *const file = ctx.arg(0).ok_or(1u32)?;
	if f.is_null() {
		return Ok(0);
	}

	let f_path: path = unsafe { bpf_probe_read(&(*f).f_path).map_err(|_| 1u32)? };
	if f_path.mnt.is_null() || f_path.dentry.is_null() {
		return Ok(0);
	}

	let task = CurrentTask::get();
	let Some(mut lane) = lane() else {
		error!(&ctx, "scratch buffers unavailable");
		return Err(1);
	};

	pipeline().augment_file_open(
		&task,
		&mut lane,
		real_mount(f_path.mnt),
		f_path.dentry as *const dentry,
	);
	Ok(0)
}
