pub mod default;

use thiserror::Error;

use crate::ast::ParseOutcome;
use crate::config::Limits;
use crate::lexer::Lexer;

pub use default::PipelineBuilder;

pub trait Parser {
    fn parse(&mut self) -> Result<ParseOutcome, BuildError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("input too long ({len} bytes, at most {max})")]
    InputTooLong { len: usize, max: usize },
    #[error("empty command before '{operator}'")]
    EmptyCommand { operator: String },
    #[error("too many {what} (at most {max})")]
    CapacityExceeded { what: &'static str, max: usize },
    #[error("unexpected '{found}' after '{pending}': only one redirection or a chain of pipes is allowed")]
    MultipleOperators { pending: String, found: String },
    #[error("redirection '{operator}' needs exactly one target, got {words} words")]
    InvalidRedirectTarget { operator: String, words: usize },
}

/// Tokenizes and builds one line.
pub fn parse(line: &str, limits: &Limits) -> Result<ParseOutcome, BuildError> {
    let lexer = Lexer::new(line, limits.max_line)?;
    PipelineBuilder::new(lexer, limits).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Command, Pipeline, RedirectKind, RedirectMode, Redirection};
    use std::path::PathBuf;

    fn lex_and_parse(src: &str) -> Result<ParseOutcome, BuildError> {
        parse(src, &Limits::default())
    }

    fn cmd(argv: &[&str]) -> Command {
        Command {
            argv: argv.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn run(commands: Vec<Command>, redirection: Option<Redirection>, background: bool) -> ParseOutcome {
        ParseOutcome::Run(Pipeline {
            commands,
            redirection,
            background,
        })
    }

    fn redirect(kind: RedirectKind, mode: RedirectMode, target: &str) -> Option<Redirection> {
        Some(Redirection {
            kind,
            target: PathBuf::from(target),
            mode,
        })
    }

    #[test]
    fn test_simple_command() {
        assert_eq!(
            lex_and_parse("echo hello\n"),
            Ok(run(vec![cmd(&["echo", "hello"])], None, false))
        );
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(lex_and_parse("\n"), Ok(ParseOutcome::Empty));
        assert_eq!(lex_and_parse(" \t "), Ok(ParseOutcome::Empty));
    }

    #[test]
    fn test_background() {
        assert_eq!(
            lex_and_parse("sleep 5 &"),
            Ok(run(vec![cmd(&["sleep", "5"])], None, true))
        );
        // '&' never becomes an argument, wherever it appears.
        assert_eq!(
            lex_and_parse("sleep & 5"),
            Ok(run(vec![cmd(&["sleep", "5"])], None, true))
        );
    }

    #[test]
    fn test_pipeline() {
        assert_eq!(
            lex_and_parse("ls | wc"),
            Ok(run(vec![cmd(&["ls"]), cmd(&["wc"])], None, false))
        );
    }

    #[test]
    fn test_multistage_pipeline() {
        assert_eq!(
            lex_and_parse("ls -l | grep foo | wc -l &"),
            Ok(run(
                vec![cmd(&["ls", "-l"]), cmd(&["grep", "foo"]), cmd(&["wc", "-l"])],
                None,
                true
            ))
        );
    }

    #[test]
    fn test_redirection_table() {
        let cases = [
            (">", RedirectKind::Out, RedirectMode::Truncate),
            ("1>", RedirectKind::Out, RedirectMode::Truncate),
            ("2>", RedirectKind::ErrOut, RedirectMode::Truncate),
            (">>", RedirectKind::Out, RedirectMode::Append),
            ("2>>", RedirectKind::ErrOut, RedirectMode::Append),
            ("&>", RedirectKind::Both, RedirectMode::Truncate),
            ("<", RedirectKind::In, RedirectMode::Truncate),
        ];
        for (op, kind, mode) in cases {
            let line = format!("cat -n {} out.txt", op);
            assert_eq!(
                lex_and_parse(&line),
                Ok(run(vec![cmd(&["cat", "-n"])], redirect(kind, mode, "out.txt"), false)),
                "operator {}",
                op
            );
        }
    }

    #[test]
    fn test_exit_requested() {
        assert_eq!(lex_and_parse("exit\n"), Ok(ParseOutcome::ExitRequested));
        assert_eq!(lex_and_parse("  exit 3"), Ok(ParseOutcome::ExitRequested));
        // With an operator, "exit" is just a program name.
        assert_eq!(
            lex_and_parse("exit | cat"),
            Ok(run(vec![cmd(&["exit"]), cmd(&["cat"])], None, false))
        );
    }

    #[test]
    fn test_empty_command_errors() {
        assert_eq!(
            lex_and_parse("| wc"),
            Err(BuildError::EmptyCommand { operator: "|".to_string() })
        );
        assert_eq!(
            lex_and_parse("ls |"),
            Err(BuildError::EmptyCommand { operator: "|".to_string() })
        );
        assert_eq!(
            lex_and_parse("ls >"),
            Err(BuildError::EmptyCommand { operator: ">".to_string() })
        );
        assert_eq!(
            lex_and_parse("ls | | wc"),
            Err(BuildError::EmptyCommand { operator: "|".to_string() })
        );
    }

    #[test]
    fn test_multiple_operators() {
        for (line, pending, found) in [
            ("ls | wc > out", "|", ">"),
            ("ls > out | wc", ">", "|"),
            ("cat < in > out", "<", ">"),
            ("ls > a > b", ">", ">"),
        ] {
            assert_eq!(
                lex_and_parse(line),
                Err(BuildError::MultipleOperators {
                    pending: pending.to_string(),
                    found: found.to_string(),
                }),
                "line {:?}",
                line
            );
        }
    }

    #[test]
    fn test_redirect_target_must_be_one_word() {
        assert_eq!(
            lex_and_parse("echo hi > a b"),
            Err(BuildError::InvalidRedirectTarget { operator: ">".to_string(), words: 2 })
        );
    }

    #[test]
    fn test_capacity_args() {
        let line = std::iter::repeat("a").take(33).collect::<Vec<_>>().join(" ");
        assert_eq!(
            lex_and_parse(&line),
            Err(BuildError::CapacityExceeded { what: "arguments", max: 32 })
        );
        let line = std::iter::repeat("a").take(32).collect::<Vec<_>>().join(" ");
        assert!(matches!(lex_and_parse(&line), Ok(ParseOutcome::Run(_))));
    }

    #[test]
    fn test_capacity_commands() {
        let line = std::iter::repeat("a").take(17).collect::<Vec<_>>().join(" | ");
        assert_eq!(
            lex_and_parse(&line),
            Err(BuildError::CapacityExceeded { what: "commands", max: 16 })
        );
        let line = std::iter::repeat("a").take(16).collect::<Vec<_>>().join(" | ");
        match lex_and_parse(&line) {
            Ok(ParseOutcome::Run(p)) => assert_eq!(p.len(), 16),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_custom_limits() {
        let limits = Limits { max_line: 10, max_cmds: 2, max_args: 2 };
        assert_eq!(
            parse("a | b | c", &limits),
            Err(BuildError::CapacityExceeded { what: "commands", max: 2 })
        );
        assert_eq!(
            parse("echo a b", &limits),
            Err(BuildError::CapacityExceeded { what: "arguments", max: 2 })
        );
        assert_eq!(
            parse("echo abcdefgh", &limits),
            Err(BuildError::InputTooLong { len: 13, max: 10 })
        );
    }

    #[test]
    fn test_build_is_repeatable() {
        let line = "grep -v x | sort | uniq -c &";
        assert_eq!(lex_and_parse(line), lex_and_parse(line));
    }
}
