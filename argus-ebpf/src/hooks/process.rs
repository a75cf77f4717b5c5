use aya_ebpf::programs::ProbeContext;
use aya_log_ebpf::error;

use crate::utils::{lane, pipeline, CurrentTask};

pub fn try_do_exit(ctx: ProbeContext) -> Result<u32, u32> {
	let code: i64 = ctx.arg(0).ok_or(1u32)?;

	let task = CurrentTask::get();
	let Some(mut lane) = lane() else {
		error!(&ctx, "scratch buffers unavailable");
		return Err(1);
	};

	pipeline().trace_exit(&task, &mut lane, code);
	Ok(0)
}
