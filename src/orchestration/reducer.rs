use crate::models::{RemoteTaskStatus, ResourceStatus};

/// What a poll loop does after one status observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    ContinuePolling,
    /// Deregister the job, stop the loop and notify
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reduction {
    pub display: ResourceStatus,
    pub action: LoopAction,
}

/// Map a remote status to the displayed resource status and loop action
///
/// Unknown statuses keep polling as if still running.
pub fn reduce(status: &RemoteTaskStatus) -> Reduction {
    match status {
        RemoteTaskStatus::Success => Reduction {
            display: ResourceStatus::Success,
            action: LoopAction::Complete,
        },
        RemoteTaskStatus::Failed => Reduction {
            display: ResourceStatus::Failed,
            action: LoopAction::Complete,
        },
        RemoteTaskStatus::Pending | RemoteTaskStatus::Unrecognized(_) => Reduction {
            display: ResourceStatus::Processing,
            action: LoopAction::ContinuePolling,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reducer_table() {
        let cases = [
            (RemoteTaskStatus::Pending, ResourceStatus::Processing, LoopAction::ContinuePolling),
            (RemoteTaskStatus::Success, ResourceStatus::Success, LoopAction::Complete),
            (RemoteTaskStatus::Failed, ResourceStatus::Failed, LoopAction::Complete),
            (
                RemoteTaskStatus::Unrecognized("REVOKED".into()),
                ResourceStatus::Processing,
                LoopAction::ContinuePolling,
            ),
        ];

        for (remote, display, action) in cases {
            let reduction = reduce(&remote);
            assert_eq!(reduction.display, display, "display for {remote}");
            assert_eq!(reduction.action, action, "action for {remote}");
        }
    }
}
