/// Resolving puzzle records from chat channels.
pub mod channel_lookup;
/// Periodic nexus dashboard synchronization.
pub mod nexus_sync;
/// Cancellable fixed-period background tasks.
pub mod scheduler;
