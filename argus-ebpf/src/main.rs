#![no_std]
#![no_main]

use argus::buffer::EventBuf;
use argus_common::SyscallArgs;
use aya_ebpf::{
	macros::{kprobe, map, tracepoint},
	maps::{HashMap, PerCpuArray, RingBuf},
	programs::{ProbeContext, TracePointContext},
};

mod hooks;
mod utils;
mod vmlinux;

#[map]
static EVT_MAP: RingBuf = RingBuf::with_byte_size(256 * 1024, 0);

// Admitted scopes: host tgid or pid-ns inum, depending on the mode.
#[map]
static PID_NS_MAP: HashMap<u32, u32> = HashMap::with_max_entries(10240, 0);

// Entry-side argument words, keyed by (event id, thread-group id).
#[map]
static ARGS_MAP: HashMap<u64, SyscallArgs> = HashMap::with_max_entries(10240, 0);

// Slot 0: event under construction. Slot 1: path staging.
#[map]
static BUFS: PerCpuArray<EventBuf> = PerCpuArray::with_max_entries(2, 0);

#[map]
static BUFS_OFFSET: PerCpuArray<u32> = PerCpuArray::with_max_entries(2, 0);

#[tracepoint]
pub fn sys_enter_execve(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_execve(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_enter_execveat(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_execveat(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[kprobe]
pub fn do_exit(ctx: ProbeContext) -> u32 {
	match hooks::try_do_exit(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[kprobe]
pub fn security_file_open(ctx: ProbeContext) -> u32 {
	match hooks::try_security_file_open(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_enter_open(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_open(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_exit_open(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_exit_open(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_enter_openat(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_openat(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_exit_openat(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_exit_openat(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_enter_close(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_close(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_exit_close(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_exit_close(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_enter_socket(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_socket(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_exit_socket(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_exit_socket(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_enter_connect(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_connect(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_exit_connect(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_exit_connect(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_enter_accept(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_accept(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_exit_accept(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_exit_accept(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_enter_bind(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_bind(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_exit_bind(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_exit_bind(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_enter_listen(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_enter_listen(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sys_exit_listen(ctx: TracePointContext) -> u32 {
	match hooks::try_sys_exit_listen(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
	loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
