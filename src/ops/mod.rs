pub mod import;
pub mod resolve;
pub mod task_ops;
