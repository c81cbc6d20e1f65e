// Entry points for each CLI mode

pub mod plan;
pub mod run;
