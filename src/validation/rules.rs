//! Rule consistency checks and co-run cycle detection.
//!
//! # Cycle Detection
//! Co-run rules are turned into a directed graph and searched for cycles
//! with a DFS that tracks the active recursion path; an edge back onto the
//! path closes a cycle.
//!
//! Edges are inserted symmetrically: a co-run over {A, B} yields A→B and
//! B→A. Under that construction every co-run naming two or more distinct
//! tasks forms a cycle. The construction lives in [`co_run_graph`] alone so
//! that a different edge model only touches that function.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.3 (DFS edge
//! classification)

use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::config::ValidationConfig;
use crate::models::{Client, FindingKind, Rule, RuleKind, Task, ValidationError, Worker};

/// A directed graph over task IDs with deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Nodes in first-seen order.
    nodes: Vec<String>,
    /// Successors per node, in insertion order, without repeats.
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node if not already present.
    pub fn add_node(&mut self, node: &str) {
        if !self.edges.contains_key(node) {
            self.nodes.push(node.to_string());
            self.edges.insert(node.to_string(), Vec::new());
        }
    }

    /// Adds a directed edge, creating both endpoints. Self-loops are ignored.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.add_node(from);
        self.add_node(to);
        if let Some(succ) = self.edges.get_mut(from) {
            if !succ.iter().any(|s| s == to) {
                succ.push(to.to_string());
            }
        }
    }

    /// Successors of a node.
    pub fn successors(&self, node: &str) -> &[String] {
        self.edges.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Finds one cycle per DFS tree.
    ///
    /// Roots are taken in first-seen order, skipping nodes already visited.
    /// Each returned path starts and ends at the node where the cycle closed,
    /// e.g. `["T1", "T2", "T1"]`.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut cycles = Vec::new();

        for root in &self.nodes {
            if visited.contains(root.as_str()) {
                continue;
            }
            let mut path = Vec::new();
            let mut on_path = HashSet::new();
            if let Some(cycle) = self.cycle_dfs(root, &mut visited, &mut path, &mut on_path) {
                cycles.push(cycle.into_iter().map(str::to_string).collect());
            }
        }

        cycles
    }

    fn cycle_dfs<'a>(
        &'a self,
        node: &'a str,
        visited: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
        on_path: &mut HashSet<&'a str>,
    ) -> Option<Vec<&'a str>> {
        visited.insert(node);
        on_path.insert(node);
        path.push(node);

        for next in self.successors(node) {
            let next = next.as_str();
            if on_path.contains(next) {
                // Back edge → cycle
                let start = path.iter().position(|n| *n == next).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            if !visited.contains(next) {
                if let Some(cycle) = self.cycle_dfs(next, visited, path, on_path) {
                    return Some(cycle);
                }
            }
        }

        on_path.remove(node);
        path.pop();
        None
    }
}

/// Builds the co-run dependency graph.
///
/// Every ordered pair of distinct tasks within one co-run rule becomes an
/// edge, so mutual co-running shows up as a two-node cycle.
pub fn co_run_graph(rules: &[Rule]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for rule in rules {
        let RuleKind::CoRun { tasks } = &rule.kind else {
            continue;
        };
        for from in tasks {
            graph.add_node(from);
            for to in tasks {
                graph.add_edge(from, to);
            }
        }
    }
    graph
}

/// Reports one `circular_dependency` finding per cycle in the co-run graph.
pub fn detect_circular_dependencies(rules: &[Rule]) -> Vec<ValidationError> {
    co_run_graph(rules)
        .find_cycles()
        .into_iter()
        .map(|cycle| {
            let at = cycle.first().cloned().unwrap_or_default();
            ValidationError::error(
                FindingKind::CircularDependency,
                format!(
                    "Circular dependency detected involving task: {at} ({})",
                    cycle.join(" -> ")
                ),
            )
            .with_suggestion("Review co-run rules to eliminate circular dependencies")
        })
        .collect()
}

/// Structural and pairwise rule checks.
///
/// Emitted in this order: duplicate rule IDs, then per-rule checks in rule
/// order, then pairwise phase-window disagreements. Task-vs-window and
/// load-limit capacity checks belong to the cross-entity pass.
pub fn validate_rule_conflicts(
    rules: &[Rule],
    clients: &[Client],
    workers: &[Worker],
    tasks: &[Task],
    config: &ValidationConfig,
) -> Vec<ValidationError> {
    let task_ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let rule_ids: HashSet<&str> = rules.iter().map(|r| r.id.as_str()).collect();

    let mut errors = duplicate_rule_ids(rules);

    for rule in rules {
        if rule.priority < 1 {
            errors.push(
                ValidationError::error(
                    FindingKind::OutOfRange,
                    format!(
                        "Rule {} priority must be at least 1, got: {}",
                        rule.id, rule.priority
                    ),
                )
                .with_suggestion("Use 1 for the highest priority"),
            );
        }

        match &rule.kind {
            RuleKind::CoRun { tasks: members } => {
                let distinct: HashSet<&str> = members.iter().map(String::as_str).collect();
                if distinct.len() < 2 {
                    errors.push(
                        ValidationError::warning(
                            FindingKind::RuleConflict,
                            format!("Co-run rule {} names fewer than two distinct tasks", rule.id),
                        )
                        .with_suggestion("Add at least two different tasks or remove the rule"),
                    );
                }
                for task_id in members {
                    if !task_ids.contains(task_id.as_str()) {
                        errors.push(unknown_task(rule, task_id));
                    }
                }
            }
            RuleKind::PhaseWindow { task, phases } => {
                if !task_ids.contains(task.as_str()) {
                    errors.push(unknown_task(rule, task));
                }
                errors.extend(window_phases(rule, phases, config));
            }
            RuleKind::SlotRestriction {
                group,
                min_common_slots,
            } => errors.extend(slot_restriction(rule, group, *min_common_slots, workers)),
            RuleKind::LoadLimit { .. } => {}
            RuleKind::PatternMatch {
                regex, template, ..
            } => errors.extend(pattern_match(rule, regex, template, clients, workers, tasks)),
            RuleKind::PrecedenceOverride { target, .. } => {
                if target == &rule.id {
                    errors.push(
                        ValidationError::error(
                            FindingKind::RuleConflict,
                            format!("Precedence override {} targets itself", rule.id),
                        )
                        .with_suggestion("Point the override at a different rule"),
                    );
                } else if !rule_ids.contains(target.as_str()) {
                    errors.push(
                        ValidationError::error(
                            FindingKind::UnknownReference,
                            format!(
                                "Precedence override {} references unknown rule: {target}",
                                rule.id
                            ),
                        )
                        .with_suggestion(format!("Remove the override or add rule {target}")),
                    );
                }
            }
        }
    }

    errors.extend(window_disagreements(rules));
    errors
}

fn duplicate_rule_ids(rules: &[Rule]) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    rules
        .iter()
        .filter(|r| !r.id.is_empty() && !seen.insert(r.id.as_str()))
        .map(|r| {
            ValidationError::error(FindingKind::DuplicateId, format!("Duplicate rule id: {}", r.id))
                .with_suggestion("Give every rule a unique id")
        })
        .collect()
}

fn unknown_task(rule: &Rule, task_id: &str) -> ValidationError {
    ValidationError::error(
        FindingKind::UnknownReference,
        format!(
            "Rule {} ({}) references unknown task: {task_id}",
            rule.id,
            rule.type_name()
        ),
    )
    .with_suggestion(format!("Remove {task_id} from the rule or add the task"))
}

fn window_phases(rule: &Rule, phases: &[i64], config: &ValidationConfig) -> Vec<ValidationError> {
    let valid = config.phases();
    if phases.is_empty() {
        return vec![ValidationError::warning(
            FindingKind::RuleConflict,
            format!("Phase window rule {} allows no phases", rule.id),
        )
        .with_suggestion("List at least one phase")];
    }
    let invalid: Vec<String> = phases
        .iter()
        .filter(|p| !valid.contains(p))
        .map(i64::to_string)
        .collect();
    if invalid.is_empty() {
        return Vec::new();
    }
    vec![ValidationError::error(
        FindingKind::InvalidPhase,
        format!(
            "Phase window rule {} lists invalid phases: {}",
            rule.id,
            invalid.join(", ")
        ),
    )
    .with_suggestion(format!(
        "Phases must be numbers between {} and {}",
        valid.start(),
        valid.end()
    ))]
}

fn slot_restriction(
    rule: &Rule,
    group: &str,
    min_common_slots: i64,
    workers: &[Worker],
) -> Vec<ValidationError> {
    let members: Vec<&Worker> = workers.iter().filter(|w| w.group == group).collect();
    let Some((first, rest)) = members.split_first() else {
        return vec![ValidationError::warning(
            FindingKind::UnknownReference,
            format!("Slot restriction {} names group {group} with no workers", rule.id),
        )
        .with_suggestion(format!("Assign workers to {group} or remove the rule"))];
    };

    let mut common: HashSet<i64> = first.available_slots.iter().copied().collect();
    for worker in rest {
        let slots: HashSet<i64> = worker.available_slots.iter().copied().collect();
        common.retain(|p| slots.contains(p));
    }

    if (common.len() as i64) < min_common_slots {
        vec![ValidationError::warning(
            FindingKind::RuleCapacityMismatch,
            format!(
                "Slot restriction {} requires {min_common_slots} common slots but group {group} shares {}",
                rule.id,
                common.len()
            ),
        )
        .with_suggestion(format!(
            "Lower minCommonSlots to {} or align AvailableSlots within {group}",
            common.len()
        ))]
    } else {
        Vec::new()
    }
}

fn pattern_match(
    rule: &Rule,
    pattern: &str,
    template: &str,
    clients: &[Client],
    workers: &[Worker],
    tasks: &[Task],
) -> Vec<ValidationError> {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            return vec![ValidationError::error(
                FindingKind::RuleConflict,
                format!("Pattern rule {} has an invalid regular expression: {e}", rule.id),
            )
            .with_suggestion("Fix the regular expression syntax")];
        }
    };

    let mut errors = Vec::new();
    if !RuleKind::TYPE_NAMES.contains(&template) {
        errors.push(
            ValidationError::warning(
                FindingKind::RuleConflict,
                format!("Pattern rule {} expands to unknown template: {template}", rule.id),
            )
            .with_suggestion(format!(
                "Use one of: {}",
                RuleKind::TYPE_NAMES.join(", ")
            )),
        );
    }

    let matches_any = tasks.iter().any(|t| re.is_match(&t.id))
        || workers.iter().any(|w| re.is_match(&w.id))
        || clients.iter().any(|c| re.is_match(&c.id));
    if !matches_any {
        errors.push(ValidationError::info(
            FindingKind::RuleConflict,
            format!("Pattern rule {} matches no task, worker, or client", rule.id),
        ));
    }

    errors
}

fn window_disagreements(rules: &[Rule]) -> Vec<ValidationError> {
    let windows: Vec<(usize, &Rule, &str, &[i64])> = rules
        .iter()
        .enumerate()
        .filter_map(|(i, r)| match &r.kind {
            RuleKind::PhaseWindow { task, phases } => Some((i, r, task.as_str(), phases.as_slice())),
            _ => None,
        })
        .collect();
    let mut errors = Vec::new();

    for (a, &(ia, ra, task_a, phases_a)) in windows.iter().enumerate() {
        for &(ib, rb, task_b, phases_b) in &windows[a + 1..] {
            if task_a != task_b || phases_a.iter().any(|p| phases_b.contains(p)) {
                continue;
            }
            let (winner, loser) = if ra.outranks(ia, rb, ib) {
                (ra, rb)
            } else {
                (rb, ra)
            };
            errors.push(
                ValidationError::warning(
                    FindingKind::RuleConflict,
                    format!(
                        "Phase window rules {} and {} give task {task_a} disjoint phases",
                        ra.id, rb.id
                    ),
                )
                .with_suggestion(format!(
                    "Rule {} (priority {}) takes precedence over {}; align or remove one",
                    winner.id, winner.priority, loser.id
                )),
            );
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::new("T1").with_phases(vec![1, 2]),
            Task::new("T2").with_phases(vec![2, 3]),
            Task::new("T3").with_phases(vec![4]),
        ]
    }

    #[test]
    fn test_co_run_graph_is_symmetric() {
        let graph = co_run_graph(&[Rule::co_run("R1", ids(&["T1", "T2"]))]);
        assert_eq!(graph.successors("T1"), &["T2".to_string()]);
        assert_eq!(graph.successors("T2"), &["T1".to_string()]);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_pair_co_run_reports_cycle() {
        let errors = detect_circular_dependencies(&[Rule::co_run("R1", ids(&["T1", "T2"]))]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, FindingKind::CircularDependency);
        assert_eq!(
            errors[0].message,
            "Circular dependency detected involving task: T1 (T1 -> T2 -> T1)"
        );
    }

    #[test]
    fn test_single_task_co_run_no_cycle() {
        let rules = vec![
            Rule::co_run("R1", ids(&["T1"])),
            Rule::co_run("R2", ids(&["T2", "T2"])),
        ];
        assert!(detect_circular_dependencies(&rules).is_empty());
    }

    #[test]
    fn test_disjoint_co_runs_one_cycle_each() {
        let rules = vec![
            Rule::co_run("R1", ids(&["T1", "T2"])),
            Rule::co_run("R2", ids(&["T3", "T4", "T5"])),
        ];
        let errors = detect_circular_dependencies(&rules);
        assert_eq!(errors.len(), 2);
        assert!(errors[1].message.contains("involving task: T3"));
    }

    #[test]
    fn test_directed_graph_without_cycle() {
        let mut g = DependencyGraph::new();
        g.add_edge("A", "B");
        g.add_edge("B", "C");
        g.add_edge("A", "C");
        assert!(g.find_cycles().is_empty());

        g.add_edge("C", "A");
        assert_eq!(g.find_cycles(), vec![ids(&["A", "B", "C", "A"])]);
    }

    #[test]
    fn test_rule_conflicts_clean() {
        let rules = vec![
            Rule::co_run("R1", ids(&["T1", "T2"])),
            Rule::phase_window("R2", "T1", vec![1, 2]),
            Rule::precedence_override("R3", "R1", true),
        ];
        let cfg = ValidationConfig::default();
        assert!(validate_rule_conflicts(&rules, &[], &[], &sample_tasks(), &cfg).is_empty());
    }

    #[test]
    fn test_rule_conflicts_structural() {
        let rules = vec![
            Rule::co_run("R1", ids(&["T1", "T9"])),
            Rule::co_run("R1", ids(&["T2"])).with_priority(0),
            Rule::phase_window("R3", "T3", vec![4, 12]),
            Rule::precedence_override("R4", "R99", false),
            Rule::precedence_override("R5", "R5", false),
        ];
        let cfg = ValidationConfig::default();
        let errors = validate_rule_conflicts(&rules, &[], &[], &sample_tasks(), &cfg);
        let kinds: Vec<FindingKind> = errors.iter().map(|e| e.kind).collect();

        assert_eq!(
            kinds,
            vec![
                FindingKind::DuplicateId,
                FindingKind::UnknownReference,
                FindingKind::OutOfRange,
                FindingKind::RuleConflict,
                FindingKind::InvalidPhase,
                FindingKind::UnknownReference,
                FindingKind::RuleConflict,
            ]
        );
        assert!(errors[1].message.contains("T9"));
        assert!(errors[5].message.contains("R99"));
    }

    #[test]
    fn test_window_disagreement_names_winner() {
        let rules = vec![
            Rule::phase_window("RA", "T1", vec![1]).with_priority(3),
            Rule::phase_window("RB", "T1", vec![2]).with_priority(1),
            Rule::phase_window("RC", "T1", vec![1, 2]),
        ];
        let cfg = ValidationConfig::default();
        let errors = validate_rule_conflicts(&rules, &[], &[], &sample_tasks(), &cfg);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, Severity::Warning);
        assert_eq!(
            errors[0].suggestion.as_deref(),
            Some("Rule RB (priority 1) takes precedence over RA; align or remove one")
        );
    }

    #[test]
    fn test_slot_restriction() {
        let workers = vec![
            Worker::new("W1").with_slots(vec![1, 2, 3]).with_group("A"),
            Worker::new("W2").with_slots(vec![2, 3, 4]).with_group("A"),
        ];
        let cfg = ValidationConfig::default();
        let ok = vec![Rule::slot_restriction("S1", "A", 2)];
        assert!(validate_rule_conflicts(&ok, &[], &workers, &[], &cfg).is_empty());

        let rules = vec![
            Rule::slot_restriction("S2", "A", 3),
            Rule::slot_restriction("S3", "Nobody", 1),
        ];
        let errors = validate_rule_conflicts(&rules, &[], &workers, &[], &cfg);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, FindingKind::RuleCapacityMismatch);
        assert_eq!(errors[1].kind, FindingKind::UnknownReference);
        assert_eq!(errors[1].severity, Severity::Warning);
    }

    #[test]
    fn test_pattern_match() {
        let cfg = ValidationConfig::default();
        let tasks = sample_tasks();

        let good = vec![Rule::pattern_match("P1", "^T[0-9]+$", "phaseWindow")];
        assert!(validate_rule_conflicts(&good, &[], &[], &tasks, &cfg).is_empty());

        let bad = vec![
            Rule::pattern_match("P2", "T(", "coRun"),
            Rule::pattern_match("P3", "^Z", "teleport"),
        ];
        let errors = validate_rule_conflicts(&bad, &[], &[], &tasks, &cfg);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].is_error());
        assert_eq!(errors[1].severity, Severity::Warning);
        assert_eq!(errors[2].severity, Severity::Info);
    }
}
