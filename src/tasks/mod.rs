pub mod connectivity;
pub mod queue;
pub mod sync;
