//! Line-oriented script assembly: classify, expand, build, order-check.

use std::collections::HashMap;

use crate::script::command::{builder_for, Command};
use crate::script::error::ParseError;
use crate::script::expand::Vars;
use crate::script::{is_preamble, Script, ScriptDefaults, CMD_RUN};

/// Assembly phase. There is no path back from Action to Preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Preamble,
    Action,
}

/// Turns script source into a validated [`Script`].
///
/// Preamble directives register at most once and must all precede the first
/// action; ENV pairs become visible to the expander from the next line on.
pub struct ScriptAssembler {
    defaults: ScriptDefaults,
}

impl ScriptAssembler {
    pub fn new(defaults: ScriptDefaults) -> Self {
        Self { defaults }
    }

    pub fn assemble(&self, source: &str) -> Result<Script, ParseError> {
        let mut phase = Phase::Preamble;
        let mut vars = Vars::from_env();
        let mut preambles: HashMap<&'static str, Command> = HashMap::new();
        let mut actions: Vec<Command> = Vec::new();

        for (offset, raw_line) in source.lines().enumerate() {
            let line_no = offset + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (keyword, rest) = match line.split_once(char::is_whitespace) {
                Some((kw, rest)) => (kw, rest.trim()),
                None => (line, ""),
            };

            let builder = builder_for(keyword).ok_or_else(|| ParseError::UnknownKeyword {
                line: line_no,
                keyword: keyword.to_string(),
            })?;

            // Expansion happens before tokenization and validation.
            let expanded = vars.expand(rest);
            let args = if keyword == CMD_RUN {
                // RUN keeps the remainder of the line verbatim.
                vec![expanded]
            } else {
                shell_words::split(&expanded)
                    .map_err(|_| ParseError::UnbalancedQuote { line: line_no })?
            };

            let command = builder(line_no, args, &self.defaults)?;

            if is_preamble(keyword) {
                let keyword = command.name();
                if phase == Phase::Action {
                    return Err(ParseError::PreambleAfterAction {
                        line: line_no,
                        keyword,
                    });
                }
                if preambles.contains_key(keyword) {
                    return Err(ParseError::DuplicatePreamble {
                        line: line_no,
                        keyword,
                    });
                }
                if let Command::Env(env) = &command {
                    for (key, value) in env.vars() {
                        vars.set(key.clone(), value.clone());
                    }
                }
                preambles.insert(keyword, command);
            } else {
                phase = Phase::Action;
                actions.push(command);
            }
        }

        tracing::debug!(
            preambles = preambles.len(),
            actions = actions.len(),
            "script assembled"
        );

        // A script with zero actions is valid; it just performs no work.
        Ok(Script::new(preambles, actions, self.defaults.clone()))
    }
}

impl Default for ScriptAssembler {
    fn default() -> Self {
        Self::new(ScriptDefaults::default())
    }
}
