use derive_more::Display;

/// A safe-copy from a traced address space failed. The caller skips
/// the field or sub-operation; nothing ever faults.
#[derive(Debug, Display)]
#[display("invalid memory read")]
pub struct ReadFault;

#[derive(Debug, Display)]
#[display("correlation table full")]
pub struct StoreFull;

#[derive(Debug, Display)]
#[display("output channel rejected the event")]
pub struct ChannelFull;
