//! CLI command implementations

pub mod authenticate;
pub mod check_config;
pub mod preview;
pub mod sync;

use colored::Colorize;
use dirbridge_core::types::ReconciledUser;
use dirbridge_core::DirectoryConfig;
use dirbridge_directory::DirectoryService;

use crate::OutputFormat;

/// Context passed to all commands
pub struct CommandContext {
    pub config: DirectoryConfig,
    pub service: DirectoryService,
    pub output_format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print verbose message if verbose mode
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            eprintln!("[DEBUG] {}", msg);
        }
    }

    /// Print error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg);
    }
}

/// One line per user: email, name and flags
pub(crate) fn print_users(users: &[ReconciledUser]) {
    for user in users {
        let mut flags = vec!["active"];
        if user.editor {
            flags.push("editor");
        }

        println!(
            "  {:<3} {:<40} {} {} [{}]",
            user.initials.cyan(),
            user.email,
            user.first_name,
            user.last_name,
            flags.join(",")
        );
    }
}
