use argus_common::MAX_BUFFER_SIZE;

/// One fixed-capacity staging region. Two exist per execution lane:
/// slot 0 holds the event under construction, slot 1 stages resolved
/// path strings.
#[repr(C)]
pub struct EventBuf {
	pub bytes: [u8; MAX_BUFFER_SIZE],
}

impl EventBuf {
	pub const fn zeroed() -> Self {
		Self { bytes: [0; MAX_BUFFER_SIZE] }
	}
}

pub const EVENT_BUF: u32 = 0;
pub const STAGE_BUF: u32 = 1;

/// Borrowed per-lane scratch state handed to a probe invocation. Lanes
/// are per execution context (per CPU on the BPF side), so nothing
/// here needs locking. `stage_base` is the address at which `stage`
/// is readable back through the lane's memory reader, letting a
/// resolved path be re-stashed as an ordinary string pointer.
pub struct Lane<'a> {
	pub event: &'a mut EventBuf,
	pub stage: &'a mut EventBuf,
	pub event_off: &'a mut u32,
	pub stage_off: &'a mut u32,
	pub stage_base: u64,
}
