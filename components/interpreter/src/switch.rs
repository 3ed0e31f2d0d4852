//! Switch dispatch over a jump table.

use crate::context::RealmContext;
use crate::frame::FrameRef;
use crate::node::{ExecError, JsNode, JumpTargetId};
use core_types::Value;

/// A switch statement.
///
/// `jumptable[i]` is the index of the first statement executed when case
/// `i` matches; the last entry is the default case's start. Fallthrough is
/// implicit: execution continues to the end of the statement list unless a
/// break for this switch's target is raised.
///
/// The execution strategy is fixed at construction. When the jump table is
/// monotonically non-decreasing the ordered strategy runs the statement
/// ranges inline while scanning cases; otherwise the unordered strategy
/// first identifies the matching case, then executes from its start. Both
/// observably agree for well-formed tables.
#[derive(Debug)]
pub struct SwitchNode {
    case_expressions: Vec<JsNode>,
    statements: Vec<JsNode>,
    jumptable: Vec<usize>,
    ordered: bool,
    break_target: JumpTargetId,
}

impl SwitchNode {
    /// Creates a switch node.
    ///
    /// The jump table must have one entry per case plus the default start,
    /// and every entry must stay within the statement list.
    pub fn new(
        case_expressions: Vec<JsNode>,
        jumptable: Vec<usize>,
        statements: Vec<JsNode>,
        break_target: JumpTargetId,
    ) -> Self {
        assert_eq!(
            case_expressions.len() + 1,
            jumptable.len(),
            "jump table needs one entry per case plus the default start"
        );
        assert!(
            jumptable.iter().all(|&start| start <= statements.len()),
            "jump table entry past the end of the statement list"
        );
        let ordered = jumptable.windows(2).all(|pair| pair[0] <= pair[1]);
        Self {
            case_expressions,
            statements,
            jumptable,
            ordered,
            break_target,
        }
    }

    /// Whether this switch uses the ordered (straight-line) strategy.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Executes the switch, yielding the last executed statement's value.
    ///
    /// A break naming this switch's target exits with `undefined`; breaks
    /// for outer targets propagate.
    pub fn execute(&self, cx: &RealmContext, frame: &FrameRef) -> Result<Value, ExecError> {
        let result = if self.ordered {
            self.execute_ordered(cx, frame)
        } else {
            self.execute_unordered(cx, frame)
        };
        match result {
            Err(ExecError::Break(target)) if target == self.break_target => Ok(Value::Undefined),
            other => other,
        }
    }

    fn execute_ordered(&self, cx: &RealmContext, frame: &FrameRef) -> Result<Value, ExecError> {
        let mut case_found = false;
        let mut result = Value::Undefined;

        for (index, case) in self.case_expressions.iter().enumerate() {
            if !case_found {
                case_found = self.condition_as_boolean(case, cx, frame)?;
            }
            if case_found {
                for statement in &self.statements[self.jumptable[index]..self.jumptable[index + 1]]
                {
                    result = statement.execute(cx, frame)?;
                }
            }
        }

        // the default tail also covers fallthrough out of the last case
        let default_start = self.jumptable[self.case_expressions.len()];
        for statement in &self.statements[default_start..] {
            result = statement.execute(cx, frame)?;
        }
        Ok(result)
    }

    fn execute_unordered(&self, cx: &RealmContext, frame: &FrameRef) -> Result<Value, ExecError> {
        let start = self.identify_target_case(cx, frame)?;
        let mut result = Value::Undefined;
        for statement in &self.statements[start..] {
            result = statement.execute(cx, frame)?;
        }
        Ok(result)
    }

    fn identify_target_case(
        &self,
        cx: &RealmContext,
        frame: &FrameRef,
    ) -> Result<usize, ExecError> {
        for (index, case) in self.case_expressions.iter().enumerate() {
            if self.condition_as_boolean(case, cx, frame)? {
                return Ok(self.jumptable[index]);
            }
        }
        Ok(self.jumptable[self.case_expressions.len()])
    }

    fn condition_as_boolean(
        &self,
        condition: &JsNode,
        cx: &RealmContext,
        frame: &FrameRef,
    ) -> Result<bool, ExecError> {
        match condition.execute_boolean(cx, frame) {
            Ok(matched) => Ok(matched),
            Err(ExecError::UnexpectedResult(value)) => Ok(value.is_truthy()),
            Err(other) => Err(other),
        }
    }
}
