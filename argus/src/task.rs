use argus_common::TASK_COMM_LEN;

/// Identity of the task executing a probe: host- and namespace-scoped
/// ids, namespace inums, credentials. The BPF implementation walks the
/// current task's nsproxy and pid structures; tests use a fixture.
pub trait TaskView {
	fn timestamp_ns(&self) -> u64;

	fn host_pid(&self) -> u32;
	fn host_tgid(&self) -> u32;
	fn host_ppid(&self) -> u32;

	fn ns_pid(&self) -> u32;
	fn ns_tgid(&self) -> u32;
	fn ns_ppid(&self) -> u32;

	/// Inum of the pid namespace the task lives in.
	fn pid_ns(&self) -> u32;
	/// Inum of the task's mount namespace.
	fn mnt_ns(&self) -> u32;

	fn uid(&self) -> u32;
	fn comm(&self) -> [u8; TASK_COMM_LEN];
}
