use serde::{Deserialize, Serialize};

/// Direction of a file descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FdDirection {
    In,
    Out,
    InOut,
}

impl FdDirection {
    pub fn is_readable(self) -> bool {
        matches!(self, FdDirection::In | FdDirection::InOut)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, FdDirection::Out | FdDirection::InOut)
    }
}

/// Closed enum of built-in commands the LLM may `spawn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinCommand {
    Cat,
    Grep,
    Sed,
    Head,
    Tail,
    Sort,
    Wc,
    Tr,
    Cut,
    Uniq,
    Nl,
    Tee,
    Rev,
    Diff,
    Patch,
    Echo,
    Llmcmd,
    Llmsh,
}

impl BuiltinCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cat => "cat",
            Self::Grep => "grep",
            Self::Sed => "sed",
            Self::Head => "head",
            Self::Tail => "tail",
            Self::Sort => "sort",
            Self::Wc => "wc",
            Self::Tr => "tr",
            Self::Cut => "cut",
            Self::Uniq => "uniq",
            Self::Nl => "nl",
            Self::Tee => "tee",
            Self::Rev => "rev",
            Self::Diff => "diff",
            Self::Patch => "patch",
            Self::Echo => "echo",
            Self::Llmcmd => "llmcmd",
            Self::Llmsh => "llmsh",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "cat" => Self::Cat,
            "grep" => Self::Grep,
            "sed" => Self::Sed,
            "head" => Self::Head,
            "tail" => Self::Tail,
            "sort" => Self::Sort,
            "wc" => Self::Wc,
            "tr" => Self::Tr,
            "cut" => Self::Cut,
            "uniq" => Self::Uniq,
            "nl" => Self::Nl,
            "tee" => Self::Tee,
            "rev" => Self::Rev,
            "diff" => Self::Diff,
            "patch" => Self::Patch,
            "echo" => Self::Echo,
            "llmcmd" => Self::Llmcmd,
            "llmsh" => Self::Llmsh,
            _ => return None,
        })
    }
}

impl std::fmt::Display for BuiltinCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Literal separator tokens used by `diff`/`patch` to carry two logical
/// inputs through one stdin stream.
pub const DIFF_SEPARATOR: &str = "---LLMCMD_DIFF_SEPARATOR---";
pub const PATCH_SEPARATOR: &str = "---LLMCMD_PATCH_SEPARATOR---";

/// Per-model quota weights resolved by the pricing resolver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub input: f64,
    pub cached: f64,
    pub output: f64,
}

impl ModelWeights {
    /// Conservative fallback weights used when a model is entirely unknown
    /// to the catalog and no default model is configured.
    pub const CONSERVATIVE_FALLBACK: ModelWeights = ModelWeights {
        input: 1.0,
        cached: 0.25,
        output: 4.0,
    };

    /// Weighted cost of one usage report, per the glossary's "weighted unit".
    pub fn weigh(&self, prompt_in: u64, prompt_cached: u64, completion: u64) -> f64 {
        prompt_in as f64 * self.input
            + prompt_cached as f64 * self.cached
            + completion as f64 * self.output
    }
}

/// Where a model's weights came from, for observability/debugging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingSource {
    /// Direct hit in the local catalog.
    Config,
    /// Catalog's configured default model.
    Default,
    /// Conservative built-in fallback; no catalog was usable.
    Fallback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fd_direction_readable_writable() {
        assert!(FdDirection::In.is_readable());
        assert!(!FdDirection::In.is_writable());
        assert!(FdDirection::Out.is_writable());
        assert!(!FdDirection::Out.is_readable());
        assert!(FdDirection::InOut.is_readable());
        assert!(FdDirection::InOut.is_writable());
    }

    #[test]
    fn builtin_command_roundtrip() {
        for cmd in [
            BuiltinCommand::Cat,
            BuiltinCommand::Grep,
            BuiltinCommand::Sed,
            BuiltinCommand::Head,
            BuiltinCommand::Tail,
            BuiltinCommand::Sort,
            BuiltinCommand::Wc,
            BuiltinCommand::Tr,
            BuiltinCommand::Cut,
            BuiltinCommand::Uniq,
            BuiltinCommand::Nl,
            BuiltinCommand::Tee,
            BuiltinCommand::Rev,
            BuiltinCommand::Diff,
            BuiltinCommand::Patch,
            BuiltinCommand::Echo,
            BuiltinCommand::Llmcmd,
            BuiltinCommand::Llmsh,
        ] {
            assert_eq!(BuiltinCommand::parse(cmd.as_str()), Some(cmd));
        }
    }

    #[test]
    fn builtin_command_rejects_unknown() {
        assert_eq!(BuiltinCommand::parse("bash"), None);
        assert_eq!(BuiltinCommand::parse(""), None);
    }

    #[test]
    fn model_weights_weigh() {
        let w = ModelWeights {
            input: 1.0,
            cached: 0.25,
            output: 4.0,
        };
        assert_eq!(w.weigh(10, 0, 0), 10.0);
        assert_eq!(w.weigh(0, 0, 10), 40.0);
        assert_eq!(w.weigh(8, 4, 0), 9.0);
    }
}
