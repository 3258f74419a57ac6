/*!
# Task State Machine

One reducer per task. Timer firings and server responses are both events, so whichever
arrives first decides the outcome and the other becomes a no-op.

```text
 todo ──Started──▶ under_review ──ServerStatus(s)──▶ s
  ▲                    │
  └──ServerStatus(todo)┘        VerifyTimerFired ──▶ RequestVerification
```
*/

use crate::task::TaskStatus;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskState {
    pub status: TaskStatus,

    /// A verification timer is scheduled for this task
    pub timer_pending: bool,
}

impl TaskState {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            timer_pending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Backend record exists and the intent was opened
    Started { verify_after: Duration },

    /// The one-shot verification timer fired
    VerifyTimerFired,

    /// Authoritative status from a verification response
    ServerStatus(TaskStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEffect {
    ScheduleVerify(Duration),
    CancelTimer,
    RequestVerification,

    /// Status changed by the server; worth telling the user
    AnnounceStatus(TaskStatus),
}

pub fn reduce(state: TaskState, event: TaskEvent) -> (TaskState, Vec<TaskEffect>) {
    match event {
        TaskEvent::Started { verify_after } => match state.status {
            TaskStatus::Completed | TaskStatus::UnderReview => (state, vec![]),
            TaskStatus::Todo | TaskStatus::Rejected | TaskStatus::MissingAta => {
                let mut effects = vec![];
                if state.timer_pending {
                    effects.push(TaskEffect::CancelTimer);
                }
                effects.push(TaskEffect::ScheduleVerify(verify_after));
                (
                    TaskState {
                        status: TaskStatus::UnderReview,
                        timer_pending: true,
                    },
                    effects,
                )
            }
        },

        TaskEvent::VerifyTimerFired => {
            if !state.timer_pending {
                // Cancelled or already reconciled
                return (state, vec![]);
            }
            let next = TaskState {
                timer_pending: false,
                ..state
            };
            if state.status == TaskStatus::UnderReview {
                (next, vec![TaskEffect::RequestVerification])
            } else {
                (next, vec![])
            }
        }

        TaskEvent::ServerStatus(status) => {
            let mut effects = vec![];
            if state.timer_pending && status != TaskStatus::UnderReview {
                effects.push(TaskEffect::CancelTimer);
            }
            if status != state.status {
                effects.push(TaskEffect::AnnounceStatus(status));
            }
            let timer_pending = state.timer_pending && status == TaskStatus::UnderReview;
            (
                TaskState {
                    status,
                    timer_pending,
                },
                effects,
            )
        }
    }
}
