use std::path::PathBuf;

use crate::ast::{Command, ParseOutcome, Pipeline, RedirectKind, RedirectMode, Redirection};
use crate::config::Limits;
use crate::lexer::Token;
use crate::parser::{BuildError, Parser};

/// Single-pass builder: words accumulate into the current command, operators
/// close it.
pub struct PipelineBuilder<'l, I> {
    tokens: I,
    limits: &'l Limits,
    commands: Vec<Vec<String>>,
    current: Vec<String>,
    pending: Option<Token>,
    background: bool,
}

impl<'l, I> PipelineBuilder<'l, I>
where
    I: Iterator<Item = Token>,
{
    pub fn new<T>(tokens: T, limits: &'l Limits) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        PipelineBuilder {
            tokens: tokens.into_iter(),
            limits,
            commands: Vec::new(),
            current: Vec::new(),
            pending: None,
            background: false,
        }
    }

    fn push_word(&mut self, word: String) -> Result<(), BuildError> {
        if self.current.len() == self.limits.max_args {
            return Err(BuildError::CapacityExceeded {
                what: "arguments",
                max: self.limits.max_args,
            });
        }
        self.current.push(word);
        Ok(())
    }

    fn finish_command(&mut self, operator: &Token) -> Result<(), BuildError> {
        if self.current.is_empty() {
            return Err(BuildError::EmptyCommand {
                operator: operator.lexeme().to_string(),
            });
        }
        if self.commands.len() == self.limits.max_cmds {
            return Err(BuildError::CapacityExceeded {
                what: "commands",
                max: self.limits.max_cmds,
            });
        }
        self.commands.push(std::mem::take(&mut self.current));
        Ok(())
    }

    fn push_operator(&mut self, operator: Token) -> Result<(), BuildError> {
        self.finish_command(&operator)?;
        match self.pending.as_ref() {
            None => {}
            Some(Token::Pipe) if operator == Token::Pipe => return Ok(()),
            Some(pending) => {
                return Err(BuildError::MultipleOperators {
                    pending: pending.lexeme().to_string(),
                    found: operator.lexeme().to_string(),
                });
            }
        }
        self.pending = Some(operator);
        Ok(())
    }

    fn finish(&mut self) -> Result<ParseOutcome, BuildError> {
        let current = std::mem::take(&mut self.current);
        let operator = match self.pending.take() {
            None if current.is_empty() => return Ok(ParseOutcome::Empty),
            None => {
                if current[0] == "exit" {
                    return Ok(ParseOutcome::ExitRequested);
                }
                return Ok(ParseOutcome::Run(Pipeline {
                    commands: vec![Command { argv: current }],
                    redirection: None,
                    background: self.background,
                }));
            }
            Some(operator) => operator,
        };
        self.current = current;
        self.finish_command(&operator)?;
        let mut commands = std::mem::take(&mut self.commands);

        let redirection = match redirection_for(&operator) {
            None => None,
            Some((kind, mode)) => {
                // `cmd OP path`: the second command is the target.
                let mut target = commands.pop().unwrap_or_default();
                if target.len() != 1 {
                    return Err(BuildError::InvalidRedirectTarget {
                        operator: operator.lexeme().to_string(),
                        words: target.len(),
                    });
                }
                Some(Redirection {
                    kind,
                    target: PathBuf::from(target.remove(0)),
                    mode,
                })
            }
        };

        Ok(ParseOutcome::Run(Pipeline {
            commands: commands.into_iter().map(|argv| Command { argv }).collect(),
            redirection,
            background: self.background,
        }))
    }
}

impl<I> Parser for PipelineBuilder<'_, I>
where
    I: Iterator<Item = Token>,
{
    fn parse(&mut self) -> Result<ParseOutcome, BuildError> {
        while let Some(token) = self.tokens.next() {
            match token {
                Token::Word(word) => self.push_word(word)?,
                Token::Background => self.background = true,
                operator => self.push_operator(operator)?,
            }
        }
        self.finish()
    }
}

fn redirection_for(operator: &Token) -> Option<(RedirectKind, RedirectMode)> {
    match operator {
        Token::RedirectOut | Token::RedirectOutFd1 => Some((RedirectKind::Out, RedirectMode::Truncate)),
        Token::RedirectErr => Some((RedirectKind::ErrOut, RedirectMode::Truncate)),
        Token::AppendOut => Some((RedirectKind::Out, RedirectMode::Append)),
        Token::AppendErr => Some((RedirectKind::ErrOut, RedirectMode::Append)),
        Token::RedirectBoth => Some((RedirectKind::Both, RedirectMode::Truncate)),
        Token::RedirectIn => Some((RedirectKind::In, RedirectMode::Truncate)),
        _ => None,
    }
}
