mod agent_types;
mod events;
mod messaging;
mod task_types;

pub use agent_types::{AgentRecord, AgentStatus};
pub use events::{kind, Event, EventFilter, DEFAULT_PIPELINE_STATE, PIPELINE_STATE_TAG};
pub use messaging::{Message, RecvOutcome};
pub use task_types::{NewTask, Task, TaskPriority, TaskStatus};
