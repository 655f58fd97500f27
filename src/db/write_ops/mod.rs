mod agent_ops;
mod event_ops;
mod message_ops;
mod task_ops;
