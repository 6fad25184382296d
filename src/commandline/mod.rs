use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(about = "Code generator for type-checked Crux programs")]
pub struct Options {
    #[clap(subcommand)]
    pub operation: Operation,
    /// Increase logging verbosity, may be repeated
    #[clap(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Silence all logging
    #[clap(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Operation {
    /// Generate assembly for a type-checked program
    Compile {
        /// The type-checked program, as JSON
        file: String,
        #[clap(short, long, default_value = "a.s")]
        output: String,
    },
    /// Print the intermediate representation of a type-checked program
    Ir {
        /// The type-checked program, as JSON
        file: String,
    },
}

impl Options {
    /// The stderrlog verbosity level. Warnings are shown by default.
    pub fn log_level(&self) -> usize {
        1 + self.verbose as usize
    }
}
