//! Built-in preset table (`--preset <key>`, `--list-presets`).
//!
//! Presets give a canned prompt template and a default set of input files
//! so common tasks don't need a hand-written prompt. They never touch the
//! network or filesystem beyond what the caller already passed in `-i`.

pub struct PresetDef {
    pub key: &'static str,
    pub description: &'static str,
    pub prompt_template: &'static str,
    pub default_inputs: &'static [&'static str],
}

const PRESETS: &[PresetDef] = &[
    PresetDef {
        key: "summarize",
        description: "Summarize the given input file(s) into a short paragraph.",
        prompt_template: "Summarize the content of the provided input file(s) in a short paragraph. \
            Use the read/write/spawn tools to inspect the files before answering; \
            do not guess at content you have not read.",
        default_inputs: &[],
    },
    PresetDef {
        key: "extract-errors",
        description: "Extract error and warning lines from a log file.",
        prompt_template: "Extract every line that looks like an error or warning from the provided \
            input file(s) and print only those lines, one per line, in their original order. \
            Prefer grep over reading the whole file into the conversation.",
        default_inputs: &[],
    },
];

pub fn resolve_preset(key: &str) -> Option<&'static PresetDef> {
    PRESETS.iter().find(|p| p.key == key)
}

/// Enumerate presets for `--list-presets`, without starting a session.
pub fn list_presets() -> Vec<(&'static str, &'static str)> {
    PRESETS.iter().map(|p| (p.key, p.description)).collect()
}
