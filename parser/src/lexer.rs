//! Token classification.
//!
//! Classification is a pure function of the graph, the configuration, the
//! current command context and one token. Matching and completion both
//! classify through [`Lexer`], so they always agree on what a token is.
//!
//! Priority, first hit wins:
//!
//! 1. end-of-options delimiter
//! 2. subcommand name or alias (unique prefix when abbreviations are on)
//! 3. exact option name, own or inherited
//! 4. `name=value` where `name` is an exact option name
//! 5. exact negated form of a negatable option
//! 6. clustered short options (`-abc`)
//! 7. abbreviated option name (when enabled)
//! 8. any other `-`-prefixed token that is not a negative number: unknown
//! 9. positional value

use argbind_core::{ArgId, CommandGraph, CommandId, ParseError, ParserConfig};

/// One option inside a cluster such as `-vfx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClusterPart {
    pub arg: ArgId,
    pub name: String,
    /// Remainder of the token taken as this option's value.
    pub attached: Option<String>,
}

/// What a token is in a given command context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Delimiter,
    Subcommand(CommandId),
    Option {
        arg: ArgId,
        name: String,
        attached: Option<String>,
    },
    Negated {
        arg: ArgId,
        name: String,
    },
    Cluster(Vec<ClusterPart>),
    Unknown,
    Positional,
}

impl Token {
    /// Whether the token ends a run of option values.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Token::Unknown | Token::Positional)
    }
}

pub(crate) struct Lexer<'a> {
    graph: &'a CommandGraph,
    config: &'a ParserConfig,
}

impl<'a> Lexer<'a> {
    pub fn new(graph: &'a CommandGraph, config: &'a ParserConfig) -> Self {
        Self { graph, config }
    }

    pub fn classify(&self, cmd: CommandId, token: &str) -> Result<Token, ParseError> {
        if token == self.config.end_of_options_delimiter {
            return Ok(Token::Delimiter);
        }
        if let Some(sub) = self.subcommand(cmd, token)? {
            return Ok(Token::Subcommand(sub));
        }
        if let Some(arg) = self.graph.find_option(cmd, token) {
            return Ok(Token::Option {
                arg: arg.id,
                name: token.to_string(),
                attached: None,
            });
        }
        if let Some((name, value)) = self.split_attached(token) {
            if let Some(arg) = self.graph.find_option(cmd, name) {
                return Ok(Token::Option {
                    arg: arg.id,
                    name: name.to_string(),
                    attached: Some(value.to_string()),
                });
            }
        }
        if let Some(arg) = self.graph.find_negated(cmd, token) {
            return Ok(Token::Negated {
                arg: arg.id,
                name: token.to_string(),
            });
        }
        if let Some(parts) = self.cluster(cmd, token) {
            return Ok(Token::Cluster(parts));
        }
        if self.config.abbreviated_options {
            if let Some(found) = self.abbreviation(cmd, token)? {
                return Ok(found);
            }
        }
        if is_option_like(token) {
            Ok(Token::Unknown)
        } else {
            Ok(Token::Positional)
        }
    }

    /// Whether `token` would stop the collection of option values.
    ///
    /// Ambiguous abbreviations count as recognized so they surface as errors
    /// on their own instead of being swallowed as values.
    pub fn stops_values(&self, cmd: CommandId, token: &str) -> bool {
        self.classify(cmd, token)
            .map(|t| t.is_recognized())
            .unwrap_or(true)
    }

    fn split_attached<'t>(&self, token: &'t str) -> Option<(&'t str, &'t str)> {
        let separator = self.config.separator.as_str();
        if separator.is_empty() || !token.starts_with('-') {
            return None;
        }
        token.split_once(separator)
    }

    fn subcommand(&self, cmd: CommandId, token: &str) -> Result<Option<CommandId>, ParseError> {
        if let Some(sub) = self.graph.find_subcommand(cmd, token) {
            return Ok(Some(sub));
        }
        if !self.config.abbreviated_subcommands || token.is_empty() || token.starts_with('-') {
            return Ok(None);
        }

        let hits: Vec<_> = self
            .graph
            .subcommands(cmd)
            .filter(|sub| {
                std::iter::once(&sub.name)
                    .chain(&sub.aliases)
                    .any(|name| abbreviates(token, name))
            })
            .collect();
        match hits.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(only.id)),
            many => Err(ParseError::AmbiguousSubcommand {
                token: token.to_string(),
                candidates: many.iter().map(|c| c.name.clone()).collect(),
            }),
        }
    }

    fn cluster(&self, cmd: CommandId, token: &str) -> Option<Vec<ClusterPart>> {
        if !self.config.posix_clustered_short_options {
            return None;
        }
        let body = token.strip_prefix('-')?;
        if body.starts_with('-') || body.chars().count() < 2 {
            return None;
        }

        let mut parts = Vec::new();
        let mut rest = body;
        while let Some(c) = rest.chars().next() {
            let name = format!("-{c}");
            let arg = self.graph.find_option(cmd, &name)?;
            rest = &rest[c.len_utf8()..];
            if arg.takes_no_value() {
                parts.push(ClusterPart {
                    arg: arg.id,
                    name,
                    attached: None,
                });
                continue;
            }

            let separator = self.config.separator.as_str();
            let value = if separator.is_empty() {
                rest
            } else {
                rest.strip_prefix(separator).unwrap_or(rest)
            };
            parts.push(ClusterPart {
                arg: arg.id,
                name,
                attached: (!value.is_empty()).then(|| value.to_string()),
            });
            break;
        }
        Some(parts)
    }

    fn abbreviation(&self, cmd: CommandId, token: &str) -> Result<Option<Token>, ParseError> {
        if !is_option_like(token) {
            return Ok(None);
        }
        let (name, attached) = match self.split_attached(token) {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (token, None),
        };

        let mut hits: Vec<(ArgId, &str)> = Vec::new();
        for arg in self.graph.visible_options(cmd) {
            if let Some(full) = arg.names().iter().find(|n| abbreviates(name, n)) {
                hits.push((arg.id, full));
            }
        }
        match hits.as_slice() {
            [] => Ok(None),
            [(arg, full)] => Ok(Some(Token::Option {
                arg: *arg,
                name: full.to_string(),
                attached,
            })),
            many => Err(ParseError::AmbiguousOption {
                token: name.to_string(),
                candidates: many.iter().map(|(_, full)| full.to_string()).collect(),
            }),
        }
    }
}

/// Whether `token` looks like an option: a dash prefix that is not a lone
/// dash and not a negative number.
pub(crate) fn is_option_like(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token[1..].parse::<f64>().is_err()
}

/// Hyphen-part-wise prefix match: `--fo-ba` abbreviates `--foo-bar`.
fn abbreviates(abbrev: &str, name: &str) -> bool {
    let dashes = |s: &str| s.len() - s.trim_start_matches('-').len();
    if dashes(abbrev) != dashes(name) || abbrev == name {
        return abbrev == name;
    }
    let wanted: Vec<&str> = abbrev.trim_start_matches('-').split('-').collect();
    let parts: Vec<&str> = name.trim_start_matches('-').split('-').collect();
    wanted.len() <= parts.len()
        && wanted.iter().all(|p| !p.is_empty())
        && wanted.iter().zip(&parts).all(|(w, p)| p.starts_with(w))
}
