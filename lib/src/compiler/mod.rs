/*! Compiles patterns into [`Program`]s.

Compilation happens in two steps. First the [`parser`] builds an [`Ast`]
for the pattern, then the compiler lowers the tree into the node arena of a
[`Program`]. Nodes are emitted from right to left: when a node is created,
its continuation already exists and its id is known. The only exception are
loops, where the body needs the id of the loop's tail and the head needs the
id of the body. In that case the head is created with a placeholder body that
is patched once the body has been compiled.
*/

use log::*;
use rustc_hash::FxHashMap;

use crate::chars::CharMatcher;
use crate::errors::CompileError;
use crate::program::{Node, NodeId, Program, RepeatMode};
use crate::Flags;

pub(crate) mod ast;
pub(crate) mod parser;


use ast::{Ast, GroupRef, Hints};
use parser::{ParsedPattern, Parser};

/// Output of the compiler.
#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    pub program: Program,
    pub hints: Hints,
    /// Number of capture groups, not including group 0.
    pub group_count: usize,
    pub names: Vec<Option<String>>,
    pub name_index: FxHashMap<String, usize>,
}

/// Pattern compiler.
pub(crate) struct Compiler {}

impl Compiler {
    pub fn new() -> Self {
        Self {}
    }

    pub fn compile(
        &self,
        pattern: &str,
        flags: Flags,
    ) -> Result<CompiledPattern, CompileError> {
        let parsed = Parser::new().parse(pattern, flags)?;

        let mut ctx = CompileContext { program: Program::new(), parsed: &parsed };
        let start = ctx.emit(&parsed.ast, NodeId::END)?;
        let mut program = ctx.program;
        program.set_start(start);

        let hints = parsed.ast.hints();

        debug!(
            "compiled /{}/{}: {} nodes, {} groups, {} loop slots, min length {}, first char {:?}, first set: {}, prefix length {}",
            pattern,
            flags,
            program.len(),
            parsed.group_count,
            program.loop_slots(),
            hints.min_length,
            hints.first_char,
            hints.first_set.is_some(),
            hints.prefix.len(),
        );

        Ok(CompiledPattern {
            program,
            hints,
            group_count: parsed.group_count,
            names: parsed.names,
            name_index: parsed.name_index,
        })
    }
}

struct CompileContext<'a> {
    program: Program,
    parsed: &'a ParsedPattern,
}

impl<'a> CompileContext<'a> {
    fn resolve(&self, target: &GroupRef, offset: usize) -> Result<usize, CompileError> {
        match target {
            GroupRef::Index(group) if *group <= self.parsed.group_count => Ok(*group),
            GroupRef::Index(group) => {
                Err(CompileError::InvalidBackReference { offset, group: *group })
            }
            GroupRef::Name(name) => {
                self.parsed.name_index.get(name).copied().ok_or_else(|| {
                    CompileError::UnknownGroupName { offset, name: name.clone() }
                })
            }
        }
    }

    /// Emits the nodes for `ast`, followed by `next`. Returns the id of the
    /// first node.
    fn emit(&mut self, ast: &Ast, next: NodeId) -> Result<NodeId, CompileError> {
        let id = match ast {
            Ast::Empty => next,
            Ast::Char(matcher) => {
                self.program.push(Node::Char { matcher: matcher.clone(), next })
            }
            Ast::Assert(assertion) => {
                self.program.push(Node::Assert { assertion: *assertion, next })
            }
            Ast::Group { index, body } => {
                let end = self.program.push(Node::GroupEnd { group: *index, next });
                let body = self.emit(body, end)?;
                self.program.push(Node::GroupStart { group: *index, next: body })
            }
            Ast::Concat(items) => self.emit_concat(items, next)?,
            Ast::Alternation(alternatives) => {
                let alternatives = alternatives
                    .iter()
                    .map(|alt| self.emit(alt, next))
                    .collect::<Result<Vec<_>, _>>()?;
                self.program.push(Node::Alternation {
                    alternatives: alternatives.into_boxed_slice(),
                })
            }
            Ast::Repeat { body, min, max, mode } => {
                self.emit_repeat(body, *min, *max, *mode, next)?
            }
            Ast::LookAround { body, ahead: true, negated, .. } => {
                let body = self.emit(body, NodeId::END)?;
                self.program.push(Node::LookAhead { body, negated: *negated, next })
            }
            Ast::LookAround { body, ahead: false, negated, offset } => {
                let alternatives = match body.as_ref() {
                    Ast::Alternation(alternatives) => alternatives.iter().collect(),
                    body => vec![body],
                };
                let mut branches = Vec::with_capacity(alternatives.len());
                for alt in alternatives {
                    let width = alt.fixed_width().ok_or(
                        CompileError::LookBehindNotFixedLength { offset: *offset },
                    )?;
                    branches.push((width, self.emit(alt, NodeId::END)?));
                }
                self.program.push(Node::LookBehind {
                    branches: branches.into_boxed_slice(),
                    negated: *negated,
                    next,
                })
            }
            Ast::Atomic(body) => {
                let body = self.emit(body, NodeId::END)?;
                self.program.push(Node::Atomic { body, next })
            }
            Ast::BackRef { target, case_insensitive, offset } => {
                let group = self.resolve(target, *offset)?;
                self.program.push(Node::BackRef {
                    group,
                    case_insensitive: *case_insensitive,
                    next,
                })
            }
            Ast::Conditional { target, yes, no, offset } => {
                let group = self.resolve(target, *offset)?;
                let yes = self.emit(yes, next)?;
                let no = match no {
                    Some(no) => self.emit(no, next)?,
                    None => next,
                };
                self.program.push(Node::Conditional { group, yes, no })
            }
        };
        Ok(id)
    }

    // Consecutive literal characters with the same case sensitivity are
    // merged into a single `Literal` node.
    fn emit_concat(&mut self, items: &[Ast], next: NodeId) -> Result<NodeId, CompileError> {
        let mut next = next;
        // Characters of the literal being built, in reverse order.
        let mut run: Vec<(char, bool)> = Vec::new();

        for item in items.iter().rev() {
            let (c, case_insensitive) = match item {
                Ast::Char(CharMatcher::Char(c)) => (*c, false),
                Ast::Char(CharMatcher::CharNoCase(c)) => (*c, true),
                item => {
                    next = self.flush_literal(&mut run, next);
                    next = self.emit(item, next)?;
                    continue;
                }
            };
            if matches!(run.last(), Some((_, ci)) if *ci != case_insensitive) {
                next = self.flush_literal(&mut run, next);
            }
            run.push((c, case_insensitive));
        }

        Ok(self.flush_literal(&mut run, next))
    }

    fn flush_literal(&mut self, run: &mut Vec<(char, bool)>, next: NodeId) -> NodeId {
        let id = match run.as_slice() {
            [] => next,
            [(c, case_insensitive)] => self.program.push(Node::Char {
                matcher: if *case_insensitive {
                    CharMatcher::CharNoCase(*c)
                } else {
                    CharMatcher::Char(*c)
                },
                next,
            }),
            _ => self.program.push(Node::Literal {
                chars: run.iter().rev().map(|(c, _)| *c).collect(),
                case_insensitive: run[0].1,
                next,
            }),
        };
        run.clear();
        id
    }

    fn emit_repeat(
        &mut self,
        body: &Ast,
        min: u32,
        max: Option<u32>,
        mode: RepeatMode,
        next: NodeId,
    ) -> Result<NodeId, CompileError> {
        if max == Some(0) {
            return Ok(next);
        }

        if let Ast::Char(matcher) = body {
            return Ok(self.program.push(Node::CharRepeat {
                matcher: matcher.clone(),
                min,
                max,
                mode,
                next,
            }));
        }

        let greedy = match mode {
            RepeatMode::Possessive => {
                let body = self.emit(body, NodeId::END)?;
                return Ok(self.program.push(Node::Possessive { body, min, max, next }));
            }
            RepeatMode::Greedy => true,
            RepeatMode::Lazy => false,
        };

        match (min, max) {
            (1, Some(1)) => self.emit(body, next),
            (0, Some(1)) => {
                let body = self.emit(body, next)?;
                let alternatives = if greedy { [body, next] } else { [next, body] };
                Ok(self.program.push(Node::Alternation {
                    alternatives: Box::new(alternatives),
                }))
            }
            _ => {
                let slot = self.program.new_loop_slot();
                let head = self.program.push(Node::LoopHead {
                    slot,
                    min,
                    max,
                    greedy,
                    body: NodeId::NONE,
                    next,
                });
                let tail = self.program.push(Node::LoopTail { head });
                let body_id = self.emit(body, tail)?;
                if let Node::LoopHead { body, .. } = self.program.node_mut(head) {
                    *body = body_id;
                }
                Ok(head)
            }
        }
    }
}
