use aya_ebpf::programs::TracePointContext;
use aya_log_ebpf::error;

use crate::utils::{lane, pipeline, try_read, CurrentTask};

// syscalls:sys_enter_execve lays the arguments out as 64-bit fields:
// filename@16, argv@24, envp@32.
pub fn try_sys_enter_execve(ctx: TracePointContext) -> Result<u32, u32> {
	let filename: u64 = unsafe { try_read!(ctx, 16) };
	let argv: u64 = unsafe { try_read!(ctx, 24) };

	let task = CurrentTask::get();
	let Some(mut lane) = lane() else {
		error!(&ctx, "scratch buffers unavailable");
		return Err(1);
	};

	pipeline().trace_exec_entry(&task, &mut lane, filename, argv);
	Ok(0)
}

// syscalls:sys_enter_execveat: fd@16, filename@24, argv@32, envp@40,
// flags@48.
pub fn try_sys_enter_execveat(ctx: TracePointContext) -> Result<u32, u32> {
	let dirfd: u64 = unsafe { try_read!(ctx, 16) };
	let pathname: u64 = unsafe { try_read!(ctx, 24) };
	let argv: u64 = unsafe { try_read!(ctx, 32) };
	let flags: u64 = unsafe { try_read!(ctx, 48) };

	let task = CurrentTask::get();
	let Some(mut lane) = lane() else {
		error!(&ctx, "scratch buffers unavailable");
		return Err(1);
	};

	pipeline().trace_execat_entry(&task, &mut lane, dirfd, pathname, argv, flags);
	Ok(0)
}
