pub mod dispatcher;
pub mod queue;
pub mod ranking;
pub mod runner;
