//! Cross-entity reference and capacity validators.
//!
//! These checks look across two or three collections: clients against the
//! tasks they request, tasks against the skills and slots workers provide,
//! and rules against the records they name.
//!
//! # Capacity Model
//! - Capacity of a phase = Σ MaxLoadPerPhase over workers available in it.
//! - Demand of a phase = Σ Duration over tasks preferring it.
//!
//! Both are coarse upper bounds; a phase flagged here is likely, not
//! certainly, infeasible. Sums saturate at the `i64` limits.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Client, FindingKind, Rule, RuleKind, Task, ValidationError, Worker};

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reports requested task IDs that resolve to no task.
///
/// One finding per unresolved entry, located at the client's
/// RequestedTaskIDs cell.
pub fn validate_unknown_refs(clients: &[Client], tasks: &[Task]) -> Vec<ValidationError> {
    let task_ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let mut errors = Vec::new();

    for (index, client) in clients.iter().enumerate() {
        for task_id in &client.requested_task_ids {
            if !task_ids.contains(task_id.as_str()) {
                errors.push(
                    ValidationError::error(
                        FindingKind::UnknownReference,
                        format!("Client references unknown task: {task_id}"),
                    )
                    .at(index, "RequestedTaskIDs")
                    .with_suggestion(format!(
                        "Remove {task_id} or ensure task exists in tasks data"
                    )),
                );
            }
        }
    }

    errors
}

/// Reports required skills that no worker holds.
///
/// One finding per task, listing every uncovered skill.
pub fn validate_skill_coverage(tasks: &[Task], workers: &[Worker]) -> Vec<ValidationError> {
    let available: HashSet<&str> = workers
        .iter()
        .flat_map(|w| w.skills.iter().map(String::as_str))
        .collect();
    let mut errors = Vec::new();

    for (index, task) in tasks.iter().enumerate() {
        let uncovered: Vec<&str> = task
            .required_skills
            .iter()
            .map(String::as_str)
            .filter(|s| !available.contains(s))
            .collect();
        if uncovered.is_empty() {
            continue;
        }
        errors.push(
            ValidationError::error(
                FindingKind::SkillCoverage,
                format!(
                    "Task {} requires skills not available: {}",
                    task.id,
                    join(&uncovered)
                ),
            )
            .at(index, "RequiredSkills")
            .with_suggestion(format!(
                "Add workers with skills: {} or modify required skills",
                join(&uncovered)
            )),
        );
    }

    errors
}

/// Reports tasks whose MaxConcurrent exceeds the number of qualified workers.
///
/// Tasks with MaxConcurrent ≤ 0 declare no concurrency and are skipped.
pub fn validate_max_concurrency(tasks: &[Task], workers: &[Worker]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (index, task) in tasks.iter().enumerate() {
        if task.max_concurrent <= 0 {
            continue;
        }
        let qualified = workers.iter().filter(|w| w.qualifies_for(task)).count();
        if (qualified as i64) < task.max_concurrent {
            errors.push(
                ValidationError::warning(
                    FindingKind::MaxConcurrency,
                    format!(
                        "Task {} MaxConcurrent ({}) exceeds qualified workers ({qualified})",
                        task.id, task.max_concurrent
                    ),
                )
                .at(index, "MaxConcurrent")
                .with_suggestion(format!(
                    "Reduce MaxConcurrent to {qualified} or add more qualified workers"
                )),
            );
        }
    }

    errors
}

/// Per-phase capacity: Σ MaxLoadPerPhase of workers available in the phase.
pub fn phase_capacity(workers: &[Worker]) -> BTreeMap<i64, i64> {
    let mut capacity = BTreeMap::new();
    for worker in workers {
        for &phase in &worker.available_slots {
            let total = capacity.entry(phase).or_insert(0i64);
            *total = total.saturating_add(worker.max_load_per_phase);
        }
    }
    capacity
}

/// Per-phase demand: Σ Duration of tasks preferring the phase.
pub fn phase_demand(tasks: &[Task]) -> BTreeMap<i64, i64> {
    let mut demand = BTreeMap::new();
    for task in tasks {
        for &phase in &task.preferred_phases {
            let total = demand.entry(phase).or_insert(0i64);
            *total = total.saturating_add(task.duration);
        }
    }
    demand
}

/// Reports phases whose demand exceeds capacity, in ascending phase order.
pub fn validate_phase_slot_saturation(tasks: &[Task], workers: &[Worker]) -> Vec<ValidationError> {
    let capacity = phase_capacity(workers);

    phase_demand(tasks)
        .into_iter()
        .filter_map(|(phase, demand)| {
            let cap = capacity.get(&phase).copied().unwrap_or(0);
            (demand > cap).then(|| {
                ValidationError::warning(
                    FindingKind::PhaseSaturation,
                    format!("Phase {phase} is oversaturated: demand {demand}, capacity {cap}"),
                )
                .with_suggestion(format!(
                    "Add more workers for phase {phase} or reduce task durations"
                ))
            })
        })
        .collect()
}

/// Composite cross-entity check.
///
/// Runs, in order:
/// 1. client requests for tasks no worker qualifies for (`skill_coverage_gap`)
/// 2. preferred phases with fewer available workers than MaxConcurrent
///    (`phase_availability_mismatch`)
/// 3. phase-window rules disjoint from their task's preferred phases
///    (`rule_conflict`)
/// 4. load-limit rules above their group's summed MaxLoadPerPhase
///    (`rule_capacity_mismatch`)
pub fn validate_cross_entity_relationships(
    clients: &[Client],
    workers: &[Worker],
    tasks: &[Task],
    rules: &[Rule],
) -> Vec<ValidationError> {
    let mut errors = skill_gaps(clients, workers, tasks);
    errors.extend(phase_availability(workers, tasks));
    errors.extend(phase_window_conflicts(tasks, rules));
    errors.extend(load_limit_capacity(workers, rules));
    errors
}

fn skill_gaps(clients: &[Client], workers: &[Worker], tasks: &[Task]) -> Vec<ValidationError> {
    // First occurrence wins when task IDs repeat.
    let mut by_id: HashMap<&str, &Task> = HashMap::new();
    for task in tasks {
        by_id.entry(task.id.as_str()).or_insert(task);
    }
    let mut errors = Vec::new();

    for (index, client) in clients.iter().enumerate() {
        for task_id in &client.requested_task_ids {
            let Some(task) = by_id.get(task_id.as_str()) else {
                continue;
            };
            if workers.iter().any(|w| w.qualifies_for(task)) {
                continue;
            }
            let skills = task.required_skills.join(", ");
            errors.push(
                ValidationError::error(
                    FindingKind::SkillCoverageGap,
                    format!(
                        "Client {} requests task {task_id} but no workers have required skills: {skills}",
                        client.id
                    ),
                )
                .at(index, "RequestedTaskIDs")
                .with_suggestion(format!(
                    "Add workers with skills: {skills} or modify task requirements"
                )),
            );
        }
    }

    errors
}

fn phase_availability(workers: &[Worker], tasks: &[Task]) -> Vec<ValidationError> {
    let mut available: HashMap<i64, i64> = HashMap::new();
    for worker in workers {
        for &phase in &worker.available_slots {
            *available.entry(phase).or_insert(0) += 1;
        }
    }
    let mut errors = Vec::new();

    for (index, task) in tasks.iter().enumerate() {
        let short: Vec<i64> = task
            .preferred_phases
            .iter()
            .copied()
            .filter(|p| available.get(p).copied().unwrap_or(0) < task.max_concurrent)
            .collect();
        if short.is_empty() {
            continue;
        }
        errors.push(
            ValidationError::warning(
                FindingKind::PhaseAvailabilityMismatch,
                format!(
                    "Task {} prefers phases {} but insufficient workers available",
                    task.id,
                    join(&short)
                ),
            )
            .at(index, "PreferredPhases")
            .with_suggestion(format!(
                "Adjust preferred phases or add more workers for phases: {}",
                join(&short)
            )),
        );
    }

    errors
}

fn phase_window_conflicts(tasks: &[Task], rules: &[Rule]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for rule in rules {
        let RuleKind::PhaseWindow { task: task_id, phases } = &rule.kind else {
            continue;
        };
        let Some(task) = tasks.iter().find(|t| &t.id == task_id) else {
            continue;
        };
        if task.preferred_phases.iter().any(|p| phases.contains(p)) {
            continue;
        }
        errors.push(
            ValidationError::warning(
                FindingKind::RuleConflict,
                format!(
                    "Phase window rule {} conflicts with task {task_id} preferred phases",
                    rule.id
                ),
            )
            .with_suggestion(
                "Adjust phase window rule or task preferred phases to resolve conflict",
            ),
        );
    }

    errors
}

fn load_limit_capacity(workers: &[Worker], rules: &[Rule]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for rule in rules {
        let RuleKind::LoadLimit {
            worker_group,
            max_slots_per_phase,
        } = &rule.kind
        else {
            continue;
        };
        if worker_group.is_empty() || *max_slots_per_phase <= 0 {
            continue;
        }
        let group_capacity = workers
            .iter()
            .filter(|w| &w.group == worker_group)
            .fold(0i64, |sum, w| sum.saturating_add(w.max_load_per_phase));
        if group_capacity < *max_slots_per_phase {
            errors.push(
                ValidationError::warning(
                    FindingKind::RuleCapacityMismatch,
                    format!(
                        "Load limit rule {} for group {worker_group} exceeds actual worker capacity",
                        rule.id
                    ),
                )
                .with_suggestion(format!(
                    "Reduce maxSlotsPerPhase to {group_capacity} or add more workers to group"
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

    fn sample_workers() -> Vec<Worker> {
        vec![
            Worker::new("W1")
                .with_skill("coding")
                .with_skill("testing")
                .with_slots(vec![1, 2, 3])
                .with_max_load(2)
                .with_group("GroupA"),
            Worker::new("W2")
                .with_skill("design")
                .with_slots(vec![2, 3, 4])
                .with_max_load(1)
                .with_group("GroupB"),
        ]
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::new("T1")
                .with_skill("coding")
                .with_phases(vec![1, 2])
                .with_duration(1),
            Task::new("T2")
                .with_skill("design")
                .with_phases(vec![3])
                .with_duration(2),
        ]
    }

    #[test]
    fn test_unknown_refs() {
        let clients = vec![Client::new("C1").with_request("T9")];
        let errors = validate_unknown_refs(&clients, &[]);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(0, "RequestedTaskIDs"));
        assert!(errors[0].message.contains("T9"));
    }

    #[test]
    fn test_unknown_refs_resolved() {
        let clients = vec![Client::new("C1").with_request("T1").with_request("T2")];
        assert!(validate_unknown_refs(&clients, &sample_tasks()).is_empty());
    }

    #[test]
    fn test_skill_coverage() {
        let workers = vec![Worker::new("W1").with_skill("X")];
        let tasks = vec![Task::new("T1").with_skill("Y")];
        let errors = validate_skill_coverage(&tasks, &workers);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(0, "RequiredSkills"));
        assert_eq!(errors[0].message, "Task T1 requires skills not available: Y");
        assert!(errors[0].is_error());
    }

    #[test]
    fn test_max_concurrency() {
        let workers = sample_workers();
        let tasks = vec![
            Task::new("T1").with_skill("coding").with_max_concurrent(1),
            Task::new("T2").with_skill("coding").with_max_concurrent(3),
            Task::new("T3").with_skill("coding").with_max_concurrent(0),
        ];
        let errors = validate_max_concurrency(&tasks, &workers);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(1, "MaxConcurrent"));
        assert_eq!(errors[0].severity, Severity::Warning);
        assert_eq!(
            errors[0].suggestion.as_deref(),
            Some("Reduce MaxConcurrent to 1 or add more qualified workers")
        );
    }

    #[test]
    fn test_phase_capacity_and_demand() {
        let capacity = phase_capacity(&sample_workers());
        assert_eq!(capacity.get(&1), Some(&2));
        assert_eq!(capacity.get(&2), Some(&3));
        assert_eq!(capacity.get(&4), Some(&1));

        let demand = phase_demand(&sample_tasks());
        assert_eq!(demand.get(&1), Some(&1));
        assert_eq!(demand.get(&3), Some(&2));
    }

    #[test]
    fn test_phase_slot_saturation() {
        let workers = sample_workers();
        let tasks = vec![
            Task::new("T1").with_phases(vec![4, 5]).with_duration(2),
            Task::new("T2").with_phases(vec![1]).with_duration(1),
        ];
        let errors = validate_phase_slot_saturation(&tasks, &workers);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Phase 4 is oversaturated: demand 2, capacity 1");
        assert_eq!(errors[1].message, "Phase 5 is oversaturated: demand 2, capacity 0");
        assert!(errors.iter().all(|e| e.row_index.is_none()));
    }

    #[test]
    fn test_cross_entity_skill_gap() {
        let workers = vec![Worker::new("W1").with_skill("coding").with_slots(vec![1])];
        let tasks = vec![Task::new("T1").with_skill("welding").with_phases(vec![1])];
        let clients = vec![
            Client::new("C1").with_request("T1"),
            Client::new("C2").with_request("T404"),
        ];
        let errors = validate_cross_entity_relationships(&clients, &workers, &tasks, &[]);

        let gaps: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == FindingKind::SkillCoverageGap)
            .collect();
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0].is_at(0, "RequestedTaskIDs"));
    }

    #[test]
    fn test_cross_entity_phase_availability() {
        let workers = sample_workers();
        let tasks = vec![
            Task::new("T1").with_phases(vec![2, 3]).with_max_concurrent(2),
            Task::new("T2").with_phases(vec![1, 4, 7]).with_max_concurrent(1),
        ];
        let errors = validate_cross_entity_relationships(&[], &workers, &tasks, &[]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, FindingKind::PhaseAvailabilityMismatch);
        assert!(errors[0].is_at(1, "PreferredPhases"));
        assert_eq!(
            errors[0].message,
            "Task T2 prefers phases 7 but insufficient workers available"
        );
    }

    #[test]
    fn test_cross_entity_rule_checks() {
        let workers = sample_workers();
        let tasks = sample_tasks();
        let rules = vec![
            Rule::phase_window("R1", "T1", vec![5, 6]),
            Rule::phase_window("R2", "T1", vec![2, 9]),
            Rule::phase_window("R3", "T404", vec![1]),
            Rule::load_limit("R4", "GroupA", 3),
            Rule::load_limit("R5", "GroupA", 2),
        ];
        let errors = validate_cross_entity_relationships(&[], &workers, &tasks, &rules);

        let conflicts: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == FindingKind::RuleConflict)
            .collect();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].message.contains("R1"));

        let capacity: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == FindingKind::RuleCapacityMismatch)
            .collect();
        assert_eq!(capacity.len(), 1);
        assert_eq!(
            capacity[0].suggestion.as_deref(),
            Some("Reduce maxSlotsPerPhase to 2 or add more workers to group")
        );
    }

    #[test]
    fn test_task_without_skills_has_no_qualified_workers() {
        let workers = vec![
            Worker::new("W1").with_skill("x").with_slots(vec![1, 2]),
            Worker::new("W2").with_skill("y").with_slots(vec![1, 2]),
        ];
        let tasks = vec![Task::new("T1").with_phases(vec![1]).with_max_concurrent(2)];
        let clients = vec![Client::new("C1").with_request("T1")];

        let concurrency = validate_max_concurrency(&tasks, &workers);
        assert_eq!(concurrency.len(), 1);
        assert_eq!(
            concurrency[0].message,
            "Task T1 MaxConcurrent (2) exceeds qualified workers (0)"
        );

        let errors = validate_cross_entity_relationships(&clients, &workers, &tasks, &[]);
        let gaps: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == FindingKind::SkillCoverageGap)
            .collect();
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0].is_at(0, "RequestedTaskIDs"));
    }

    #[test]
    fn test_capacity_sums_saturate() {
        let tasks = vec![
            Task::new("T1").with_phases(vec![1]).with_duration(i64::MAX),
            Task::new("T2").with_phases(vec![1]).with_duration(1),
        ];
        assert_eq!(phase_demand(&tasks).get(&1), Some(&i64::MAX));

        let workers = vec![
            Worker::new("W1").with_slots(vec![1]).with_max_load(i64::MAX).with_group("A"),
            Worker::new("W2").with_slots(vec![1]).with_max_load(1).with_group("A"),
        ];
        assert_eq!(phase_capacity(&workers).get(&1), Some(&i64::MAX));
        assert!(validate_phase_slot_saturation(&tasks, &workers).is_empty());

        let rules = vec![Rule::load_limit("R1", "A", 5)];
        assert!(load_limit_capacity(&workers, &rules).is_empty());
    }
}
