pub mod completions;
pub mod run;
pub mod validate;
