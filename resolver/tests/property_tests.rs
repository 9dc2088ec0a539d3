// Property-based tests for resolver invariants.
//
// Two categories:
// 1. Registry order independence: any insertion order yields the same
//    sorted listing after finalize
// 2. Scheduler invariants: arbitrary timer event sets produce dense unique
//    mask ids and set-merged dispatch branches
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use proptest::prelude::*;

use rtec::api::{long_name, short_name, AccessTarget, ApiKind, ClientApiRegistry, PortFunction};
use rtec::cdecl::{CType, FnSignature};
use rtec::component::{Event, Runnable};
use rtec::config::GenConfig;
use rtec::id::{ComponentId, EventId, RunnableId};
use rtec::schedule::{assign_tasks, build_tasks};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn descriptor(port: &str, element: &str) -> PortFunction {
    let kind = ApiKind::Read;
    PortFunction {
        kind,
        short_name: short_name("Rte", kind, port, element),
        component: "Comp".to_string(),
        port_name: port.to_string(),
        item: element.to_string(),
        data_type: Some("uint16".to_string()),
        complex: false,
        sig: FnSignature {
            name: long_name("Rte", kind, "Comp", port, element),
            ret: CType::named("Rte_StatusType"),
            params: Vec::new(),
        },
        target: AccessTarget::Cell {
            symbol: format!("Comp_{port}_{element}"),
        },
    }
}

fn timer(id: u32, name: &str, runnable: u32) -> Event {
    Event::Timer {
        id: EventId(id),
        component: ComponentId(0),
        name: name.to_string(),
        period_ms: 10,
        runnable: RunnableId(runnable),
    }
}

fn runnable(id: u32) -> Runnable {
    Runnable {
        id: RunnableId(id),
        component: ComponentId(0),
        name: format!("R{id}"),
        symbol: format!("R{id}_func"),
        data_receive_points: Vec::new(),
        data_send_points: Vec::new(),
        server_call_points: Vec::new(),
        parameter_access_points: Vec::new(),
    }
}

// ── Registry order independence ─────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn listing_independent_of_insertion_order(
        names in prop::collection::btree_set("[A-Z][a-z]{2,6}", 1..12)
    ) {
        let names: Vec<String> = names.into_iter().collect();

        let mut forward = ClientApiRegistry::new();
        for name in &names {
            forward.register(descriptor(name, "Value")).unwrap();
        }
        forward.finalize();

        let mut backward = ClientApiRegistry::new();
        for name in names.iter().rev() {
            backward.register(descriptor(name, "Value")).unwrap();
        }
        backward.finalize();

        let a: Vec<&str> = forward.all_functions().map(|f| f.short_name.as_str()).collect();
        let b: Vec<&str> = backward.all_functions().map(|f| f.short_name.as_str()).collect();
        prop_assert_eq!(a.clone(), b);

        let mut sorted = a.clone();
        sorted.sort();
        prop_assert_eq!(a, sorted);

        let count = forward.all_functions().count();
        prop_assert_eq!(count, names.len());
    }
}

// ── Scheduler invariants ────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn mask_ids_dense_and_branches_merged(
        // (trigger index, runnable index) pairs; duplicates exercise the
        // shared-trigger merge path.
        pairs in prop::collection::vec((0u32..8, 0u32..6), 1..24)
    ) {
        let runnables: Vec<Runnable> = (0..6).map(runnable).collect();
        let events: Vec<Event> = pairs
            .iter()
            .enumerate()
            .map(|(i, &(trigger, target))| {
                timer(i as u32, &format!("T{trigger}"), target)
            })
            .collect();

        let cfg = GenConfig::default();
        let (names, assignment) = assign_tasks(&cfg, "App", &events);
        let tasks = build_tasks(&names, &assignment, &events, &runnables).unwrap();
        prop_assert_eq!(tasks.len(), 1);
        let task = &tasks[0];

        // Dense ids starting at 1, one per distinct trigger.
        let ids: Vec<u32> = task.masks.iter().map(|m| m.id).collect();
        let expected: Vec<u32> = (1..=ids.len() as u32).collect();
        prop_assert_eq!(ids, expected);

        let distinct_triggers: std::collections::BTreeSet<&str> =
            pairs.iter().map(|(t, _)| {
                // trigger names are T0..T7
                match t { 0 => "T0", 1 => "T1", 2 => "T2", 3 => "T3",
                          4 => "T4", 5 => "T5", 6 => "T6", _ => "T7" }
            }).collect();
        prop_assert_eq!(task.masks.len(), distinct_triggers.len());

        // No two branches share a trigger set, and every runnable appears
        // in exactly one branch.
        for (i, a) in task.branches.iter().enumerate() {
            for b in task.branches.iter().skip(i + 1) {
                prop_assert_ne!(&a.triggers, &b.triggers);
            }
        }
        let mut seen = std::collections::BTreeSet::new();
        for branch in &task.branches {
            for call in &branch.calls {
                prop_assert!(seen.insert(*call), "runnable dispatched twice");
            }
        }

        // Quit mask sits directly above the last trigger id.
        prop_assert_eq!(task.quit_value, 1u32 << task.masks.len());
    }
}
