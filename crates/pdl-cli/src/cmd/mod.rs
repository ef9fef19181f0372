pub mod cycle;
pub mod milestone;
pub mod phase;
pub mod project;
pub mod serve;
pub mod sprint;
pub mod stage;
pub mod storage;
pub mod task;
