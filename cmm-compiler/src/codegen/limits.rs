//! `.limit stack` / `.limit locals` computation.
//!
//! A single forward pass abstractly interprets the operand-stack depth of a
//! method body. Depths are carried to labels along branch edges; after an
//! unconditional transfer the next label resumes at the depth recorded for
//! it. Generated code only branches forward to join points or backward to
//! loop heads with an empty statement stack, so one pass is enough.

use super::instruction::AsmItem;
use std::collections::HashMap;

/// How method limits are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitStrategy {
    /// Derive both limits from the generated body.
    #[default]
    Computed,
    /// Use the same fixed bound for both limits.
    Fixed(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodLimits {
    pub stack: u32,
    pub locals: u32,
}

/// Result of abstractly interpreting an instruction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackProfile {
    /// Highest depth reached, relative to the starting depth.
    pub peak: i32,
    /// Lowest depth reached; negative means the sequence consumed values
    /// it did not push.
    pub min: i32,
    /// Depth at the end of the sequence, or `None` if control cannot reach
    /// the end (it ended in a `goto` or `return`).
    pub final_depth: Option<i32>,
}

pub fn stack_profile(items: &[AsmItem]) -> StackProfile {
    let mut depth = 0i32;
    let mut peak = 0i32;
    let mut min = 0i32;
    let mut reachable = true;
    let mut at_label: HashMap<&str, i32> = HashMap::new();

    for item in items {
        match item {
            AsmItem::Label(label) => {
                match at_label.get(label.as_str()) {
                    Some(&recorded) if !reachable => depth = recorded,
                    Some(&recorded) if recorded != depth => {
                        log::warn!(
                            "stack depth mismatch at {label}: {recorded} vs {depth}"
                        );
                        depth = depth.max(recorded);
                    }
                    Some(_) => {}
                    None => {
                        at_label.insert(label.as_str(), depth);
                    }
                }
                reachable = true;
            }
            AsmItem::Instr(instr) => {
                depth += instr.stack_effect();
                peak = peak.max(depth);
                min = min.min(depth);
                if let Some(target) = instr.branch_target() {
                    at_label.entry(target).or_insert(depth);
                }
                if instr.ends_flow() {
                    reachable = false;
                }
            }
            AsmItem::Directive(_) | AsmItem::Raw(_) | AsmItem::Blank => {}
        }
    }

    StackProfile {
        peak,
        min,
        final_depth: reachable.then_some(depth),
    }
}

/// Highest local slot touched by any load or store.
pub fn max_local(items: &[AsmItem]) -> Option<u16> {
    items
        .iter()
        .filter_map(|item| item.as_instr().and_then(|i| i.local_index()))
        .max()
}

/// Limits for a method body under the given strategy.
///
/// `declared_slots` is the number of slots the scope table handed out
/// while lowering the method, parameters included.
pub fn method_limits(strategy: LimitStrategy, body: &[AsmItem], declared_slots: u32) -> MethodLimits {
    match strategy {
        LimitStrategy::Fixed(n) => MethodLimits {
            stack: n,
            locals: n,
        },
        LimitStrategy::Computed => {
            let profile = stack_profile(body);
            let touched = max_local(body).map(|i| i as u32 + 1).unwrap_or(0);
            MethodLimits {
                stack: profile.peak.max(1) as u32,
                locals: declared_slots.max(touched),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::instruction::{ArithOp, JvmInstr};
    use crate::codegen::types::{Constant, ValueType};

    fn i(instr: JvmInstr) -> AsmItem {
        AsmItem::Instr(instr)
    }

    #[test]
    fn straight_line_peak_and_balance() {
        let body = vec![
            i(JvmInstr::Ldc(Constant::Float(1.0))),
            i(JvmInstr::Ldc(Constant::Float(2.0))),
            i(JvmInstr::Arith(ArithOp::Add)),
            i(JvmInstr::store(ValueType::Number, 0, "x")),
        ];
        let p = stack_profile(&body);
        assert_eq!(p.peak, 2);
        assert_eq!(p.min, 0);
        assert_eq!(p.final_depth, Some(0));
    }

    #[test]
    fn push_zero_or_one_counts_once() {
        // fcmpl; iflt T; ldc 0; goto D; T: ldc 1; D:
        let body = vec![
            i(JvmInstr::Ldc(Constant::Float(1.0))),
            i(JvmInstr::Ldc(Constant::Float(2.0))),
            i(JvmInstr::Fcmpl),
            i(JvmInstr::If {
                cond: crate::codegen::instruction::Cond::Lt,
                label: "T".into(),
            }),
            i(JvmInstr::Ldc(Constant::Int(0))),
            i(JvmInstr::Goto("D".into())),
            AsmItem::Label("T".into()),
            i(JvmInstr::Ldc(Constant::Int(1))),
            AsmItem::Label("D".into()),
        ];
        let p = stack_profile(&body);
        assert_eq!(p.final_depth, Some(1));
        assert_eq!(p.peak, 2);
    }

    #[test]
    fn return_ends_flow() {
        let body = vec![
            i(JvmInstr::Ldc(Constant::Float(1.0))),
            i(JvmInstr::Return(ValueType::Number)),
        ];
        assert_eq!(stack_profile(&body).final_depth, None);
    }

    #[test]
    fn computed_and_fixed_limits() {
        let body = vec![
            i(JvmInstr::load(ValueType::Number, 4, "p")),
            i(JvmInstr::Return(ValueType::Number)),
        ];
        assert_eq!(
            method_limits(LimitStrategy::Computed, &body, 2),
            MethodLimits { stack: 1, locals: 5 }
        );
        assert_eq!(
            method_limits(LimitStrategy::Fixed(50), &body, 2),
            MethodLimits { stack: 50, locals: 50 }
        );
    }
}
