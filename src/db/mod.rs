mod core;
mod mappers;
mod read_ops;
mod schema;
mod write_ops;

pub use self::core::CoordDb;

#[cfg(test)]
mod event_log_behaviors;
#[cfg(test)]
mod mailbox_behaviors;
#[cfg(test)]
mod registry_behaviors;
