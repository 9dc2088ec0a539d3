use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rtec::config::GenConfig;
use rtec::model::{
    AccessPoint, BehaviorDecl, ComponentDecl, DataTypeDecl, ElementDecl, EventDecl, InterfaceDecl,
    Model, PortDecl, PortDirectionDecl, RunnableDecl, TypeKind,
};
use rtec::partition::Partition;

// Scaling scenarios: one producer fan-out to N consumers, plus a per-pair
// signal chain. All scenarios resolve without errors.

fn model(signals: usize) -> Model {
    let interfaces = (0..signals)
        .map(|i| InterfaceDecl::SenderReceiver {
            name: format!("Sig{i}_I"),
            elements: vec![ElementDecl {
                name: "Value".to_string(),
                type_ref: "uint16".to_string(),
                queued: false,
                init: Some("0".to_string()),
            }],
        })
        .collect();
    Model {
        data_types: vec![DataTypeDecl {
            name: "uint16".to_string(),
            kind: TypeKind::Primitive {
                native: "unsigned short".to_string(),
            },
        }],
        interfaces,
    }
}

fn producer(signal: usize) -> ComponentDecl {
    ComponentDecl {
        name: format!("Producer{signal}"),
        ports: vec![PortDecl {
            name: format!("Sig{signal}"),
            direction: PortDirectionDecl::Provide,
            interface: format!("Sig{signal}_I"),
        }],
        behavior: BehaviorDecl {
            runnables: vec![RunnableDecl {
                name: "Publish".to_string(),
                symbol: format!("Producer{signal}_Publish"),
                data_receive_points: Vec::new(),
                data_send_points: vec![AccessPoint {
                    port: format!("Sig{signal}"),
                    element: "Value".to_string(),
                }],
                server_call_points: Vec::new(),
                parameter_access_points: Vec::new(),
            }],
            events: vec![EventDecl::Timer {
                name: format!("T{signal}"),
                period_ms: 10,
                runnable: "Publish".to_string(),
            }],
        },
    }
}

fn consumer(signal: usize, index: usize) -> ComponentDecl {
    ComponentDecl {
        name: format!("Consumer{signal}_{index}"),
        ports: vec![PortDecl {
            name: format!("Sig{signal}"),
            direction: PortDirectionDecl::Require,
            interface: format!("Sig{signal}_I"),
        }],
        behavior: BehaviorDecl {
            runnables: vec![RunnableDecl {
                name: "Observe".to_string(),
                symbol: format!("Consumer{signal}_{index}_Observe"),
                data_receive_points: vec![AccessPoint {
                    port: format!("Sig{signal}"),
                    element: "Value".to_string(),
                }],
                data_send_points: Vec::new(),
                server_call_points: Vec::new(),
                parameter_access_points: Vec::new(),
            }],
            events: vec![EventDecl::Timer {
                name: format!("C{signal}_{index}"),
                period_ms: 20,
                runnable: "Observe".to_string(),
            }],
        },
    }
}

fn resolve(signals: usize, consumers: usize) -> Partition {
    let mut p = Partition::new("Bench", model(signals), GenConfig::default());
    for s in 0..signals {
        p.add_component(&producer(s)).unwrap();
        for c in 0..consumers {
            p.add_component(&consumer(s, c)).unwrap();
        }
    }
    p.auto_connect();
    p.finalize().unwrap();
    p
}

fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");
    for &(signals, consumers) in &[(4usize, 2usize), (16, 4), (64, 4)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{signals}x{consumers}")),
            &(signals, consumers),
            |b, &(signals, consumers)| {
                b.iter(|| black_box(resolve(signals, consumers)));
            },
        );
    }
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let partition = resolve(16, 4);
    c.bench_function("generate_16x4", |b| {
        b.iter(|| black_box(partition.generate()));
    });
}

criterion_group!(benches, bench_finalize, bench_generate);
criterion_main!(benches);
