//! Source parsing with the module → script grammar fallback.
//!
//! Callers don't declare whether a file is a module, so parsing is an ordered
//! list of attempts: module grammar first (top-level `import`/`export`
//! allowed), then plain script. Each failure is recorded as a typed
//! [`ParseAttempt`] so diagnostics can say which grammars were tried.
//! TypeScript syntax is always enabled — it is a superset of JavaScript for
//! the template shapes this transform inspects.

use source_map::LineIndex;
use std::fmt;
use swc_common::{sync::Lrc, FileName, SourceMap as SwcSourceMap, Spanned};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax, TsSyntax};
use thiserror::Error;

/// Parser behavior options.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Suppress early errors (strict-mode and TypeScript early checks).
    /// Genuine syntax errors always fail the attempt so malformed files fall
    /// back whole.
    pub tolerant: bool,
    /// Allow decorator syntax.
    pub decorators: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            tolerant: true,
            decorators: true,
        }
    }
}

/// The grammar a parse attempt used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseGoal {
    /// Top-level `import`/`export` allowed.
    Module,
    /// Plain script.
    Script,
}

impl fmt::Display for ParseGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseGoal::Module => write!(f, "module"),
            ParseGoal::Script => write!(f, "script"),
        }
    }
}

/// One failed parse attempt.
#[derive(Debug, Clone)]
pub struct ParseAttempt {
    /// The grammar that was tried.
    pub goal: ParseGoal,
    /// The parser's error message.
    pub message: String,
    /// 1-indexed line of the error.
    pub line: u32,
    /// 0-indexed column of the error.
    pub col: u32,
}

/// Source could not be parsed under any grammar.
#[derive(Debug, Clone, Error)]
#[error("{}", describe_attempts(.attempts))]
pub struct ParseError {
    /// Every attempt made, in order.
    pub attempts: Vec<ParseAttempt>,
}

fn describe_attempts(attempts: &[ParseAttempt]) -> String {
    match attempts.first() {
        Some(first) => {
            let goals = attempts
                .iter()
                .map(|a| a.goal.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "could not parse source as {goals}: {} at {}:{}",
                first.message, first.line, first.col
            )
        }
        None => "could not parse source".to_string(),
    }
}

/// A successfully parsed program with the offset base needed to rebase swc
/// spans onto the original text.
#[derive(Debug)]
pub struct ParsedProgram {
    /// The parsed syntax tree.
    pub program: Program,
    base: u32,
}

impl ParsedProgram {
    /// The byte offset swc assigned to the start of the file; subtract it
    /// from node positions to get text-relative offsets.
    pub(crate) fn base(&self) -> u32 {
        self.base
    }
}

/// Parses source text, attempting the module grammar and then the script
/// grammar. Both failures are reported if neither succeeds.
pub fn parse(text: &str, options: &ParserOptions) -> Result<ParsedProgram, ParseError> {
    let cm: Lrc<SwcSourceMap> = Default::default();
    let fm = cm.new_source_file(Lrc::new(FileName::Anon), text.to_string());
    let base = fm.start_pos.0;
    let index = LineIndex::new(text);

    let syntax = Syntax::Typescript(TsSyntax {
        tsx: false,
        decorators: options.decorators,
        dts: false,
        no_early_errors: options.tolerant,
        disallow_ambiguous_jsx_like: false,
    });

    let mut attempts = Vec::new();
    for goal in [ParseGoal::Module, ParseGoal::Script] {
        let lexer = Lexer::new(syntax, EsVersion::Es2022, StringInput::from(&*fm), None);
        let mut parser = Parser::new_from(lexer);

        let result = match goal {
            ParseGoal::Module => parser.parse_module().map(Program::Module),
            ParseGoal::Script => parser.parse_script().map(Program::Script),
        };

        // swc recovers from some syntax errors (an unterminated string still
        // yields a tree); a recovered error is still a failed attempt, or the
        // fallback contract for malformed input would never trigger.
        let error = match result {
            Ok(program) => match parser.take_errors().into_iter().next() {
                Some(err) => err,
                None => return Ok(ParsedProgram { program, base }),
            },
            Err(err) => err,
        };

        let offset = error.span().lo.0.saturating_sub(base);
        let position = index.line_col(offset.into()).unwrap_or_default();
        attempts.push(ParseAttempt {
            goal,
            message: error.kind().msg().to_string(),
            line: position.line + 1,
            col: position.col,
        });
    }

    Err(ParseError { attempts })
}
