pub mod classify;
pub mod completion;
pub mod mode;
pub mod rules;
pub mod serve;
pub mod spec;
pub mod version;
