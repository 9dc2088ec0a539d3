// schedule.rs — Task and event-mask scheduling
//
// Assigns each distinct (task, trigger) pair one event-mask id, starting at
// 1 within each task and incrementing monotonically. Timer triggers also
// bump a per-task counter that sizes the alarm-configuration table.
// Runnables of one task sharing an identical trigger set are merged into a
// single dispatch branch, so several runnables on one trigger never emit
// duplicate mask tests.
//
// Preconditions: events and runnables are fully resolved.
// Postconditions: per-task mask ids are dense from 1 (P6); branch order is
//                 first-occurrence order over runnables.
// Failure modes: a task whose trigger count exceeds the mask width.
// Side effects: none.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::component::{Event, Runnable};
use crate::config::GenConfig;
use crate::error::ResolveError;
use crate::id::RunnableId;

// ── Public types ────────────────────────────────────────────────────────────

/// One assigned event-mask bit.
#[derive(Debug, Clone)]
pub struct EventMaskEntry {
    pub symbol: String,
    pub trigger: String,
    /// Dense id within the task, starting at 1.
    pub id: u32,
    /// Bit value `1 << (id - 1)`.
    pub value: u32,
    pub timer: bool,
}

/// One row of the alarm-configuration table.
#[derive(Debug, Clone)]
pub struct AlarmEntry {
    pub mask_symbol: String,
    pub period_ms: u32,
}

/// One `if (eventMask & ...)` dispatch block.
#[derive(Debug, Clone)]
pub struct DispatchBranch {
    /// Mask symbols of the trigger set, sorted for set comparison.
    pub triggers: Vec<String>,
    /// Runnables dispatched sequentially, in declaration order.
    pub calls: Vec<RunnableId>,
}

/// Scheduling result for one OS task.
#[derive(Debug)]
pub struct OsTask {
    pub name: String,
    pub masks: Vec<EventMaskEntry>,
    /// Number of distinct timer triggers; sizes the alarm table.
    pub timer_count: u32,
    pub alarms: Vec<AlarmEntry>,
    pub quit_symbol: String,
    pub quit_value: u32,
    pub branches: Vec<DispatchBranch>,
}

impl OsTask {
    /// OR of every assigned mask including quit; the generated body waits
    /// on this.
    pub fn wait_mask(&self) -> u32 {
        self.masks.iter().fold(self.quit_value, |acc, m| acc | m.value)
    }
}

/// Mask symbol for one (task, trigger) pair.
pub fn mask_symbol(task: &str, trigger: &str) -> String {
    format!("EVENT_MASK_{task}_{trigger}")
}

// ── Event-to-task assignment ────────────────────────────────────────────────

/// Determine the task list and map every event onto a task. Events not
/// named by any configured task fall to the first (default) task; with no
/// configured tasks a single `<Partition>_Task` is synthesized.
pub fn assign_tasks(
    cfg: &GenConfig,
    partition: &str,
    events: &[Event],
) -> (Vec<String>, Vec<usize>) {
    let task_names: Vec<String> = if cfg.os_tasks.is_empty() {
        vec![format!("{partition}_Task")]
    } else {
        cfg.os_tasks.iter().map(|t| t.name.clone()).collect()
    };

    let mut by_event: HashMap<&str, usize> = HashMap::new();
    for (index, task) in cfg.os_tasks.iter().enumerate() {
        for event in &task.events {
            by_event.entry(event.as_str()).or_insert(index);
        }
    }

    let assignment = events
        .iter()
        .map(|e| by_event.get(e.name()).copied().unwrap_or(0))
        .collect();
    (task_names, assignment)
}

/// Whether an event is dispatched through the task event-mask protocol.
/// Operation-invoked events bind server calls directly instead.
fn is_scheduled(event: &Event) -> bool {
    matches!(event, Event::Timer { .. } | Event::ModeSwitch { .. })
}

// ── Schedule derivation ─────────────────────────────────────────────────────

/// Build the per-task mask assignment, alarm table, and merged dispatch
/// branches.
pub fn build_tasks(
    task_names: &[String],
    event_tasks: &[usize],
    events: &[Event],
    runnables: &[Runnable],
) -> Result<Vec<OsTask>, ResolveError> {
    let mut tasks = Vec::with_capacity(task_names.len());

    for (task_index, task_name) in task_names.iter().enumerate() {
        let mut masks: Vec<EventMaskEntry> = Vec::new();
        let mut assigned: HashSet<String> = HashSet::new();
        let mut alarms: Vec<AlarmEntry> = Vec::new();
        let mut timer_count = 0u32;

        for (event_index, event) in events.iter().enumerate() {
            if event_tasks[event_index] != task_index || !is_scheduled(event) {
                continue;
            }
            let trigger = event.name();
            if assigned.contains(trigger) {
                continue;
            }
            let id = masks.len() as u32 + 1;
            if id > 31 {
                return Err(ResolveError::UnsupportedConstruct {
                    kind: "event mask width",
                    construct: format!("more than 31 triggers in task '{task_name}'"),
                });
            }
            let entry = EventMaskEntry {
                symbol: mask_symbol(task_name, trigger),
                trigger: trigger.to_string(),
                id,
                value: 1 << (id - 1),
                timer: matches!(event, Event::Timer { .. }),
            };
            if let Event::Timer { period_ms, .. } = event {
                timer_count += 1;
                alarms.push(AlarmEntry {
                    mask_symbol: entry.symbol.clone(),
                    period_ms: *period_ms,
                });
            }
            assigned.insert(trigger.to_string());
            masks.push(entry);
        }

        // Trigger sets per runnable, in runnable declaration order.
        let mut branches: Vec<DispatchBranch> = Vec::new();
        for runnable in runnables {
            let mut set: BTreeSet<String> = BTreeSet::new();
            for (event_index, event) in events.iter().enumerate() {
                if event_tasks[event_index] == task_index
                    && is_scheduled(event)
                    && event.runnable() == runnable.id
                {
                    set.insert(mask_symbol(task_name, event.name()));
                }
            }
            if set.is_empty() {
                continue;
            }
            let triggers: Vec<String> = set.into_iter().collect();
            match branches.iter_mut().find(|b| b.triggers == triggers) {
                Some(branch) => branch.calls.push(runnable.id),
                None => branches.push(DispatchBranch {
                    triggers,
                    calls: vec![runnable.id],
                }),
            }
        }

        let quit_id = masks.len() as u32 + 1;
        tasks.push(OsTask {
            name: task_name.clone(),
            masks,
            timer_count,
            alarms,
            quit_symbol: mask_symbol(task_name, "Quit"),
            quit_value: 1 << (quit_id - 1),
            branches,
        });
    }

    Ok(tasks)
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OsTaskConfig;
    use crate::id::{ComponentId, EventId};

    fn runnable(id: u32, name: &str) -> Runnable {
        Runnable {
            id: RunnableId(id),
            component: ComponentId(0),
            name: name.to_string(),
            symbol: format!("{name}_func"),
            data_receive_points: Vec::new(),
            data_send_points: Vec::new(),
            server_call_points: Vec::new(),
            parameter_access_points: Vec::new(),
        }
    }

    fn timer(id: u32, name: &str, period_ms: u32, runnable: u32) -> Event {
        Event::Timer {
            id: EventId(id),
            component: ComponentId(0),
            name: name.to_string(),
            period_ms,
            runnable: RunnableId(runnable),
        }
    }

    #[test]
    fn mask_ids_dense_from_one() {
        let runnables = vec![runnable(0, "A"), runnable(1, "B"), runnable(2, "C")];
        let events = vec![
            timer(0, "T10", 10, 0),
            timer(1, "T20", 20, 1),
            timer(2, "T50", 50, 2),
        ];
        let cfg = GenConfig::default();
        let (names, assignment) = assign_tasks(&cfg, "App", &events);
        let tasks = build_tasks(&names, &assignment, &events, &runnables).unwrap();

        assert_eq!(tasks.len(), 1);
        let ids: Vec<u32> = tasks[0].masks.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let values: Vec<u32> = tasks[0].masks.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![1, 2, 4]);
        assert_eq!(tasks[0].quit_value, 8);
        assert_eq!(tasks[0].timer_count, 3);
        assert_eq!(tasks[0].alarms.len(), 3);
    }

    #[test]
    fn shared_trigger_merges_into_one_branch() {
        // Two runnables both triggered solely by "T10": one mask, one
        // branch with two sequential calls.
        let runnables = vec![runnable(0, "StepA"), runnable(1, "StepB")];
        let events = vec![timer(0, "T10", 10, 0), timer(1, "T10", 10, 1)];
        let cfg = GenConfig::default();
        let (names, assignment) = assign_tasks(&cfg, "App", &events);
        let tasks = build_tasks(&names, &assignment, &events, &runnables).unwrap();

        let task = &tasks[0];
        assert_eq!(task.masks.len(), 1);
        assert_eq!(task.masks[0].symbol, "EVENT_MASK_App_Task_T10");
        assert_eq!(task.branches.len(), 1);
        assert_eq!(
            task.branches[0].calls,
            vec![RunnableId(0), RunnableId(1)]
        );
        assert_eq!(task.timer_count, 1);
    }

    #[test]
    fn distinct_trigger_sets_stay_separate() {
        let runnables = vec![runnable(0, "A"), runnable(1, "B")];
        let events = vec![
            timer(0, "T10", 10, 0),
            timer(1, "T10", 10, 1),
            timer(2, "T100", 100, 1),
        ];
        let cfg = GenConfig::default();
        let (names, assignment) = assign_tasks(&cfg, "App", &events);
        let tasks = build_tasks(&names, &assignment, &events, &runnables).unwrap();

        // A: {T10}; B: {T10, T100} — different sets, two branches.
        assert_eq!(tasks[0].branches.len(), 2);
        assert_eq!(tasks[0].masks.len(), 2);
    }

    #[test]
    fn events_split_across_configured_tasks() {
        let runnables = vec![runnable(0, "A"), runnable(1, "B")];
        let events = vec![timer(0, "Fast", 1, 0), timer(1, "Slow", 100, 1)];
        let cfg = GenConfig {
            os_tasks: vec![
                OsTaskConfig {
                    name: "FastTask".to_string(),
                    events: vec!["Fast".to_string()],
                },
                OsTaskConfig {
                    name: "SlowTask".to_string(),
                    events: vec!["Slow".to_string()],
                },
            ],
            ..GenConfig::default()
        };
        let (names, assignment) = assign_tasks(&cfg, "App", &events);
        assert_eq!(names, vec!["FastTask", "SlowTask"]);
        assert_eq!(assignment, vec![0, 1]);

        let tasks = build_tasks(&names, &assignment, &events, &runnables).unwrap();
        assert_eq!(tasks[0].masks.len(), 1);
        assert_eq!(tasks[1].masks.len(), 1);
        assert_eq!(tasks[0].masks[0].id, 1);
        assert_eq!(tasks[1].masks[0].id, 1);
    }

    #[test]
    fn unmapped_events_fall_to_default_task() {
        let runnables = vec![runnable(0, "A")];
        let events = vec![timer(0, "Orphan", 5, 0)];
        let cfg = GenConfig {
            os_tasks: vec![OsTaskConfig {
                name: "Main".to_string(),
                events: Vec::new(),
            }],
            ..GenConfig::default()
        };
        let (names, assignment) = assign_tasks(&cfg, "App", &events);
        assert_eq!(names, vec!["Main"]);
        assert_eq!(assignment, vec![0]);
    }

    #[test]
    fn too_many_triggers_rejected() {
        let runnables = vec![runnable(0, "A")];
        let events: Vec<Event> = (0..32)
            .map(|i| timer(i, &format!("T{i}"), 10, 0))
            .collect();
        let cfg = GenConfig::default();
        let (names, assignment) = assign_tasks(&cfg, "App", &events);
        let err = build_tasks(&names, &assignment, &events, &runnables).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn wait_mask_covers_all_bits() {
        let runnables = vec![runnable(0, "A")];
        let events = vec![timer(0, "T10", 10, 0), timer(1, "T20", 20, 0)];
        let cfg = GenConfig::default();
        let (names, assignment) = assign_tasks(&cfg, "App", &events);
        let tasks = build_tasks(&names, &assignment, &events, &runnables).unwrap();
        assert_eq!(tasks[0].wait_mask(), 0b111);
    }
}
