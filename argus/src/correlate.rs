use argus_common::SyscallArgs;

use crate::error::StoreFull;

/// Concurrent raw-argument storage bridging a syscall's entry probe to
/// its exit probe. One atomic slot per key; keys already disambiguate
/// concurrent callers, so no wider transaction exists.
pub trait ArgStore {
	fn insert(&self, key: u64, args: &SyscallArgs) -> Result<(), StoreFull>;
	fn remove(&self, key: u64) -> Option<SyscallArgs>;
}

/// Key discipline over an [`ArgStore`]: entries are addressed by
/// (event id, calling thread-group id).
pub struct CorrelationStore<'a, A: ArgStore> {
	table: &'a A,
}

impl<'a, A: ArgStore> CorrelationStore<'a, A> {
	pub fn new(table: &'a A) -> Self {
		Self { table }
	}

	fn key(event_id: u32, tgid: u32) -> u64 {
		((event_id as u64) << 32) | tgid as u64
	}

	/// Overwrites any live entry for the key. Nested use of one
	/// syscall by one thread group is not supported.
	pub fn stash(&self, event_id: u32, tgid: u32, args: &SyscallArgs) -> Result<(), StoreFull> {
		self.table.insert(Self::key(event_id, tgid), args)
	}

	/// Destructive load: a second take for the same key finds nothing,
	/// so one entry/exit pair can never emit twice.
	pub fn take(&self, event_id: u32, tgid: u32) -> Option<SyscallArgs> {
		self.table.remove(Self::key(event_id, tgid))
	}
}

// region:    --- Tests


// endregion: --- Tests
