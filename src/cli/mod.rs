mod args;

pub use args::{Cli, Mode, PresetArgs, RunArgs, Target};
