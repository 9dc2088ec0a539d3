// mode.rs — Mode-switch aggregation
//
// Merges mode-switch events from multiple components and runnables that
// trigger on the same mode transition into one generated dispatch function.
// The first mode seen creates the function and its previous-mode shadow
// cell; events are then grouped by derived callback name, so the same
// (task, activation, mode, declaration) combination always folds into one
// branch no matter how many runnables fan in (P5).
//
// Preconditions: events are resolved; the event-to-task assignment exists.
// Postconditions: one function per distinct mode; one branch per distinct
//                 callback name; branch call lists in event declaration
//                 order.
// Side effects: inserts shadow cells into the storage arena.

use std::collections::HashMap;

use crate::component::{Event, ModeActivation};
use crate::id::RunnableId;
use crate::port::Port;
use crate::schedule::mask_symbol;
use crate::storage::{CellKind, StorageArena, StorageCell};

// ── Public types ────────────────────────────────────────────────────────────

/// One runnable-invocation trigger in a branch call list: a SetEvent of the
/// runnable's mask in its task.
#[derive(Debug, Clone)]
pub struct ModeCall {
    pub task: String,
    pub mask_symbol: String,
    pub runnable: RunnableId,
}

/// One `if`/`else if` branch comparing previous vs. new mode value.
#[derive(Debug, Clone)]
pub struct ModeBranch {
    pub callback: String,
    pub activation: ModeActivation,
    pub declaration: String,
    pub mode: String,
    pub calls: Vec<ModeCall>,
}

/// One generated dispatch function, owning one previous-mode shadow cell.
#[derive(Debug)]
pub struct ModeSwitchFunction {
    pub mode: String,
    pub name: String,
    pub shadow_symbol: String,
    pub branches: Vec<ModeBranch>,
}

/// Callback name grouping fanned-in events.
pub fn callback_name(task: &str, activation: ModeActivation, mode: &str, declaration: &str) -> String {
    format!("{}_{}_{}_{}", task, activation.token(), mode, declaration)
}

// ── Aggregation pass ────────────────────────────────────────────────────────

/// Fold all mode-switch events into per-mode dispatch functions.
pub fn aggregate(
    events: &[Event],
    ports: &[Port],
    task_names: &[String],
    event_tasks: &[usize],
    prefix: &str,
    storage: &mut StorageArena,
) -> Vec<ModeSwitchFunction> {
    let mut functions: Vec<ModeSwitchFunction> = Vec::new();
    let mut by_mode: HashMap<String, usize> = HashMap::new();

    for (event_index, event) in events.iter().enumerate() {
        let (name, activation, port, mode, runnable) = match event {
            Event::ModeSwitch {
                name,
                activation,
                port,
                mode,
                runnable,
                ..
            } => (name, *activation, *port, mode, *runnable),
            _ => continue,
        };
        let declaration = ports[port.index()]
            .mode_group
            .as_ref()
            .expect("internal: mode event on port without mode group")
            .name
            .clone();
        let task = &task_names[event_tasks[event_index]];

        let function_index = match by_mode.get(mode) {
            Some(&i) => i,
            None => {
                let shadow_symbol = format!("{prefix}_PrevMode_{mode}");
                storage.insert(StorageCell {
                    symbol: shadow_symbol.clone(),
                    type_name: format!("{prefix}_ModeType"),
                    complex: false,
                    init: Some("255".to_string()),
                    kind: CellKind::ModeShadow,
                });
                functions.push(ModeSwitchFunction {
                    mode: mode.clone(),
                    name: format!("{prefix}_ModeSwitch_{mode}"),
                    shadow_symbol,
                    branches: Vec::new(),
                });
                by_mode.insert(mode.clone(), functions.len() - 1);
                functions.len() - 1
            }
        };

        let callback = callback_name(task, activation, mode, &declaration);
        let call = ModeCall {
            task: task.clone(),
            mask_symbol: mask_symbol(task, name),
            runnable,
        };
        let function = &mut functions[function_index];
        match function.branches.iter_mut().find(|b| b.callback == callback) {
            Some(branch) => branch.calls.push(call),
            None => function.branches.push(ModeBranch {
                callback,
                activation,
                declaration,
                mode: mode.clone(),
                calls: vec![call],
            }),
        }
    }

    functions
}

// ── Tests ───────────────────────────────────────────────────────────────────
