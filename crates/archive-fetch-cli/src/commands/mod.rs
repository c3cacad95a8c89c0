pub mod format;
pub mod run;
pub mod sources;
