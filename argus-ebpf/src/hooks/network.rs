use argus_common::{SyscallArgs, SYS_ACCEPT, SYS_BIND, SYS_CONNECT, SYS_LISTEN, SYS_SOCKET};
use aya_ebpf::programs::TracePointContext;

use crate::hooks::fs::{exit_probe, TP_ARG0};
use crate::utils::{pipeline, try_read, CurrentTask};

fn stash_three(ctx: &TracePointContext, event_id: u32) -> Result<u32, u32> {
	let mut args = SyscallArgs::default();
	args.args[0] = unsafe { try_read!(ctx, TP_ARG0) };
	args.args[1] = unsafe { try_read!(ctx, TP_ARG0 + 8) };
	args.args[2] = unsafe { try_read!(ctx, TP_ARG0 + 16) };

	pipeline().trace_entry(&CurrentTask::get(), event_id, &args);
	Ok(0)
}

pub fn try_sys_enter_socket(ctx: TracePointContext) -> Result<u32, u32> {
	stash_three(&ctx, SYS_SOCKET) // family, type, protocol
}

pub fn try_sys_exit_socket(ctx: TracePointContext) -> Result<u32, u32> {
	exit_probe(&ctx, SYS_SOCKET)
}

pub fn try_sys_enter_connect(ctx: TracePointContext) -> Result<u32, u32> {
	stash_three(&ctx, SYS_CONNECT) // fd, uservaddr, addrlen
}

pub fn try_sys_exit_connect(ctx: TracePointContext) -> Result<u32, u32> {
	exit_probe(&ctx, SYS_CONNECT)
}

pub fn try_sys_enter_accept(ctx: TracePointContext) -> Result<u32, u32> {
	stash_three(&ctx, SYS_ACCEPT) // fd, upeer_sockaddr, upeer_addrlen
}

pub fn try_sys_exit_accept(ctx: TracePointContext) -> Result<u32, u32> {
	exit_probe(&ctx, SYS_ACCEPT)
}

pub fn try_sys_enter_bind(ctx: TracePointContext) -> Result<u32, u32> {
	stash_three(&ctx, SYS_BIND) // fd, umyaddr, addrlen
}

pub fn try_sys_exit_bind(ctx: TracePointContext) -> Result<u32, u32> {
	exit_probe(&ctx, SYS_BIND)
}

pub fn try_sys_enter_listen(ctx: TracePointContext) -> Result<u32, u32> {
	let mut args = SyscallArgs::default();
	args.args[0] = unsafe { try_read!(ctx, TP_ARG0) }; // fd
	args.args[1] = unsafe { try_read!(ctx, TP_ARG0 + 8) }; // backlog

	pipeline().trace_entry(&CurrentTask::get(), SYS_LISTEN, &args);
	Ok(0)
}

pub fn try_sys_exit_listen(ctx: TracePointContext) -> Result<u32, u32> {
	exit_probe(&ctx, SYS_LISTEN)
}
