//! Progress events emitted during scanning (used by the CLI spinner)

/// Real-time progress updates during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    /// The running count of entries seen crossed a reporting boundary.
    Progress { seen: u64 },
}
