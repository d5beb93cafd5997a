//! Inclusion resolution.
//!
//! Turns `{include_rule, requirement graph}` into a final `included`
//! flag per description. Mark and sweep: first decide per description
//! whether it *could* be included (its rule allows it and every
//! requirement could be too), then walk the requirement closure of
//! every `Always` description that can, marking it included.
//!
//! The graph may contain cycles (mutually referencing structs are
//! legal), so both walks run on explicit stacks with the per-node
//! memo fields as visited state.

use tracing::debug;

use bindweave_decls::{Declarations, DescriptionId, IncludeRule};

/// Recompute `can_include` and `included` for every description.
/// Idempotent: rerunning without rule changes reproduces the same
/// answer.
pub fn calculate_final_inclusion(decls: &mut Declarations) {
    let ids: Vec<DescriptionId> = decls.iter().map(|(id, _)| id).collect();
    for id in &ids {
        decls[*id].can_include = None;
        decls[*id].included = false;
    }
    for id in &ids {
        if decls[*id].include_rule == IncludeRule::Always && can_include(decls, *id) {
            mark_included(decls, *id);
        }
    }
    debug!(
        "Included {} of {} descriptions",
        decls.iter().filter(|(_, d)| d.included).count(),
        decls.len()
    );
}

/// Decide whether `root` could be included, memoized in `can_include`.
///
/// A node is tentatively recorded includable before its requirements
/// are examined, so a cycle reaching back to it reads true instead of
/// recursing forever; the verdict flips to false if any requirement
/// settles unincludable.
fn can_include(decls: &mut Declarations, root: DescriptionId) -> bool {
    enum Step {
        Enter(DescriptionId),
        Settle(DescriptionId),
    }

    let mut stack = vec![Step::Enter(root)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(id) => {
                if decls[id].can_include.is_some() {
                    continue;
                }
                if decls[id].include_rule == IncludeRule::Never {
                    decls[id].can_include = Some(false);
                    continue;
                }
                decls[id].can_include = Some(true);
                stack.push(Step::Settle(id));
                for req in decls[id].requirements.iter().copied() {
                    stack.push(Step::Enter(req));
                }
            }
            Step::Settle(id) => {
                let blocked = decls[id]
                    .requirements
                    .iter()
                    .any(|req| decls[*req].can_include == Some(false));
                if blocked {
                    decls[id].can_include = Some(false);
                }
            }
        }
    }
    decls[root].can_include == Some(true)
}

/// Mark `root` and its transitive requirements included.
fn mark_included(decls: &mut Declarations, root: DescriptionId) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if decls[id].included {
            continue;
        }
        decls[id].included = true;
        stack.extend(decls[id].requirements.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindweave_decls::{DescKind, Description};
    use bindweave_model::Expr;

    fn constant(name: &str, rule: IncludeRule) -> Description {
        let mut d = Description::new(
            DescKind::Constant {
                name: name.into(),
                value: Expr::int(0),
            },
            None,
        );
        d.include_rule = rule;
        d
    }

    #[test]
    fn never_rule_is_never_included() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A", IncludeRule::Never));
        calculate_final_inclusion(&mut decls);
        assert!(!decls[a].included);
        assert_eq!(decls[a].can_include, Some(false));
    }

    #[test]
    fn always_pulls_its_requirement_closure() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A", IncludeRule::Always));
        let b = decls.push(constant("B", IncludeRule::IfNeeded));
        let c = decls.push(constant("C", IncludeRule::IfNeeded));
        decls.add_requirement(a, b);
        decls.add_requirement(b, c);

        calculate_final_inclusion(&mut decls);
        assert!(decls[a].included);
        assert!(decls[b].included);
        assert!(decls[c].included);
    }

    #[test]
    fn if_needed_is_never_a_root() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A", IncludeRule::IfNeeded));
        calculate_final_inclusion(&mut decls);
        assert!(!decls[a].included);
        // still includable, just not reachable
        assert_eq!(decls[a].can_include, Some(true));
    }

    #[test]
    fn unincludable_requirement_blocks_the_root() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A", IncludeRule::Always));
        let b = decls.push(constant("B", IncludeRule::Never));
        decls.add_requirement(a, b);

        calculate_final_inclusion(&mut decls);
        assert!(!decls[a].included);
        assert!(!decls[b].included);
        assert_eq!(decls[a].can_include, Some(false));
    }

    #[test]
    fn blocked_roots_do_not_block_other_roots() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A", IncludeRule::Always));
        let bad = decls.push(constant("BAD", IncludeRule::Never));
        let ok = decls.push(constant("OK", IncludeRule::Always));
        decls.add_requirement(a, bad);

        calculate_final_inclusion(&mut decls);
        assert!(!decls[a].included);
        assert!(decls[ok].included);
    }

    #[test]
    fn mutual_requirements_terminate_and_include_both() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A", IncludeRule::Always));
        let b = decls.push(constant("B", IncludeRule::IfNeeded));
        decls.add_requirement(a, b);
        decls.add_requirement(b, a);

        calculate_final_inclusion(&mut decls);
        assert!(decls[a].included);
        assert!(decls[b].included);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A", IncludeRule::Always));
        let b = decls.push(constant("B", IncludeRule::IfNeeded));
        let c = decls.push(constant("C", IncludeRule::Never));
        decls.add_requirement(a, b);

        calculate_final_inclusion(&mut decls);
        let first: Vec<bool> = decls.iter().map(|(_, d)| d.included).collect();
        calculate_final_inclusion(&mut decls);
        let second: Vec<bool> = decls.iter().map(|(_, d)| d.included).collect();
        assert_eq!(first, second);
        assert!(!decls[c].included);
    }

    #[test]
    fn recomputation_reflects_rule_demotions() {
        let mut decls = Declarations::new();
        let a = decls.push(constant("A", IncludeRule::Always));
        calculate_final_inclusion(&mut decls);
        assert!(decls[a].included);

        decls[a].include_rule = IncludeRule::Never;
        calculate_final_inclusion(&mut decls);
        assert!(!decls[a].included);
    }
}
