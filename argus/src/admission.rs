use argus_common::PID_NS_INIT_INO;

use crate::task::TaskView;

/// Which execution contexts the tracer admits. Fixed at build/load
/// time by the program embedding the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorMode {
	Host,
	Container,
	HostAndContainer,
}

/// Concurrent presence table behind the admission filter. Lookup,
/// insert and delete must each be atomic per key; no global lock and
/// no multi-key transaction is ever required. Key-space disjointness
/// across modes is the caller's business, not the table's.
pub trait ScopeTable {
	fn contains(&self, key: u32) -> bool;
	/// False when the table cannot take another key.
	fn insert(&self, key: u32) -> bool;
	fn remove(&self, key: u32);
}

/// Decides whether the calling context is currently within the
/// monitored scope. Scopes are keyed by host tgid (host branch) or by
/// pid-namespace inum (container branch).
pub struct AdmissionFilter<'a, S: ScopeTable> {
	mode: MonitorMode,
	table: &'a S,
}

impl<'a, S: ScopeTable> AdmissionFilter<'a, S> {
	pub fn new(mode: MonitorMode, table: &'a S) -> Self {
		Self { mode, table }
	}

	pub fn mode(&self) -> MonitorMode {
		self.mode
	}

	/// Host/container classification for the current mode. In the
	/// combined mode a task is host iff its host-scoped tgid equals its
	/// namespace-scoped tgid.
	pub fn is_host_scoped(&self, task: &impl TaskView) -> bool {
		match self.mode {
			MonitorMode::Host => true,
			MonitorMode::Container => false,
			MonitorMode::HostAndContainer => task.host_tgid() == task.ns_tgid(),
		}
	}

	fn admit_key(&self, key: u32) -> Option<u32> {
		if self.table.contains(key) || self.table.insert(key) {
			Some(key)
		} else {
			None
		}
	}

	/// Registers the calling context's scope and returns its key.
	/// Idempotent: re-admitting a present key returns it unchanged.
	pub fn admit(&self, task: &impl TaskView) -> Option<u32> {
		match self.mode {
			MonitorMode::Host => {
				if task.pid_ns() != PID_NS_INIT_INO {
					return None;
				}
				self.admit_key(task.host_tgid())
			}
			MonitorMode::Container => {
				if task.pid_ns() == PID_NS_INIT_INO {
					return None;
				}
				self.admit_key(task.pid_ns())
			}
			MonitorMode::HostAndContainer => {
				if self.is_host_scoped(task) {
					self.admit_key(task.host_tgid())
				} else {
					self.admit_key(task.pid_ns())
				}
			}
		}
	}

	/// Drops the scope an exiting context represents. A host scope is
	/// owned by its process; a namespace scope only by the namespace's
	/// representative (ns-scoped pid 1). Absent keys are a no-op.
	pub fn release(&self, task: &impl TaskView) {
		match self.mode {
			MonitorMode::Host => {
				if task.pid_ns() == PID_NS_INIT_INO {
					self.table.remove(task.host_tgid());
				}
			}
			MonitorMode::Container => {
				if task.pid_ns() != PID_NS_INIT_INO && task.ns_pid() == 1 {
					self.table.remove(task.pid_ns());
				}
			}
			MonitorMode::HostAndContainer => {
				if self.is_host_scoped(task) {
					self.table.remove(task.host_tgid());
				} else if task.ns_pid() == 1 {
					self.table.remove(task.pid_ns());
				}
			}
		}
	}

	pub fn is_admitted(&self, task: &impl TaskView) -> bool {
		match self.mode {
			MonitorMode::Host => {
				task.pid_ns() == PID_NS_INIT_INO && self.table.contains(task.host_tgid())
			}
			// The init namespace is never inserted, so a plain lookup
			// rejects host callers here.
			MonitorMode::Container => self.table.contains(task.pid_ns()),
			MonitorMode::HostAndContainer => {
				if self.is_host_scoped(task) {
					self.table.contains(task.host_tgid())
				} else {
					self.table.contains(task.pid_ns())
				}
			}
		}
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	use crate::support::{ScopeSet, TaskFixture};

	use super::*;

	#[test]
	fn host_mode_admits_only_the_init_namespace() {
		// -- Setup & Fixtures
		let table = ScopeSet::default();
		let filter = AdmissionFilter::new(MonitorMode::Host, &table);
		let host = TaskFixture::host(100);
		let container = TaskFixture::container(200, 1, 0xF000_0001);

		// -- Exec & Check
		assert_eq!(filter.admit(&host), Some(100));
		assert!(filter.is_admitted(&host));
		assert_eq!(filter.admit(&container), None);
		assert!(!filter.is_admitted(&container));
	}

	#[test]
	fn admit_is_idempotent() {
		// -- Setup & Fixtures
		let table = ScopeSet::default();
		let filter = AdmissionFilter::new(MonitorMode::Container, &table);
		let init = TaskFixture::container(200, 1, 0xF000_0001);

		// -- Exec & Check
		assert_eq!(filter.admit(&init), Some(0xF000_0001));
		assert_eq!(filter.admit(&init), Some(0xF000_0001));
	}

	#[test]
	fn container_scope_is_released_by_its_representative_only() {
		// -- Setup & Fixtures
		let table = ScopeSet::default();
		let filter = AdmissionFilter::new(MonitorMode::Container, &table);
		let init = TaskFixture::container(200, 1, 0xF000_0001);
		let worker = TaskFixture::container(201, 7, 0xF000_0001);

		filter.admit(&init).unwrap();
		assert!(filter.is_admitted(&worker));

		// -- Exec
		filter.release(&worker);
		assert!(filter.is_admitted(&init), "non-representative exit must not release");
		filter.release(&init);

		// -- Check
		assert!(!filter.is_admitted(&init));
		assert!(!filter.is_admitted(&worker));
	}

	#[test]
	fn combined_mode_classifies_by_tgid_comparison() {
		// -- Setup & Fixtures
		let table = ScopeSet::default();
		let filter = AdmissionFilter::new(MonitorMode::HostAndContainer, &table);
		// Equal host/ns tgids => host; key is the host tgid.
		let host = TaskFixture::host(300);
		// Differing tgids => namespace member; key is the pid-ns inum.
		let container = TaskFixture::container(400, 1, 0xF000_0002);

		// -- Exec & Check
		assert!(filter.is_host_scoped(&host));
		assert_eq!(filter.admit(&host), Some(300));
		assert!(!filter.is_host_scoped(&container));
		assert_eq!(filter.admit(&container), Some(0xF000_0002));
		assert!(filter.is_admitted(&host));
		assert!(filter.is_admitted(&container));
	}

	#[test]
	fn release_of_an_absent_key_is_a_noop() {
		// -- Setup & Fixtures
		let table = ScopeSet::default();
		let filter = AdmissionFilter::new(MonitorMode::Host, &table);
		let host = TaskFixture::host(100);

		// -- Exec
		filter.release(&host);

		// -- Check
		assert!(!filter.is_admitted(&host));
	}
}

// endregion: --- Tests
