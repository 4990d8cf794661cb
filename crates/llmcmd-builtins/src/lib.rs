//! The built-in command registry: a closed map from command name to a
//! pure text filter `(args, reader, writer) -> Result<(), EngineError>`.
//!
//! Filters never touch the host filesystem and never retain state beyond
//! one call. When a command's `args` name an input file (e.g.
//! `cat hello.txt`), resolving that name through the virtual filesystem and
//! wiring its bytes as the task's stdin is the orchestrator's job, not the
//! filter's -- by the time a filter runs, `reader` already carries whatever
//! bytes it is meant to transform, regardless of whether they came from a
//! pipe or a VFS-opened file.

mod cat;
mod cut;
mod diff;
mod echo;
mod grep;
mod head_tail;
mod nl;
mod patch;
mod rev;
mod sed;
mod sort;
mod subagent;
mod text;
mod tr;
mod uniq;
mod wc;

use llmcmd_core::{BuiltinCommand, EngineError};
use std::io::{BufRead, Write};

/// A built-in filter body. `args` are the command's options (never file
/// paths -- see the module doc). Filters read `reader` to completion (or as
/// far as their semantics require) and write their result to `writer`.
pub type Filter = fn(&[String], &mut dyn BufRead, &mut dyn Write) -> Result<(), EngineError>;

/// Resolve a [`BuiltinCommand`] to its filter body.
pub fn resolve(cmd: BuiltinCommand) -> Filter {
    match cmd {
        BuiltinCommand::Cat => cat::run,
        BuiltinCommand::Grep => grep::run,
        BuiltinCommand::Sed => sed::run,
        BuiltinCommand::Head => head_tail::run_head,
        BuiltinCommand::Tail => head_tail::run_tail,
        BuiltinCommand::Sort => sort::run,
        BuiltinCommand::Wc => wc::run,
        BuiltinCommand::Tr => tr::run,
        BuiltinCommand::Cut => cut::run,
        BuiltinCommand::Uniq => uniq::run,
        BuiltinCommand::Nl => nl::run,
        BuiltinCommand::Tee => cat::run, // passthrough; no FS access to fan out to a file
        BuiltinCommand::Rev => rev::run,
        BuiltinCommand::Diff => diff::run,
        BuiltinCommand::Patch => patch::run,
        BuiltinCommand::Echo => echo::run,
        BuiltinCommand::Llmcmd => subagent::run_llmcmd,
        BuiltinCommand::Llmsh => subagent::run_llmsh,
    }
}
