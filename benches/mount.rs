use criterion::{criterion_group, criterion_main, Criterion};
use overlaykv::{Node, Storage};

fn build_volume(depth: usize, fanout: usize) -> std::sync::Arc<Node> {
    let root = Node::create();
    fn fill(node: &std::sync::Arc<Node>, depth: usize, fanout: usize) {
        if depth == 0 {
            return;
        }
        for i in 0..fanout {
            let child = Node::create_child(node, &format!("n{}", i)).unwrap();
            fill(&child, depth - 1, fanout);
        }
    }
    fill(&root, depth, fanout);
    root
}

fn mount_unmount(c: &mut Criterion) {
    c.bench_function("mount_then_unmount_small_tree", |b| {
        let volume = build_volume(3, 4);
        b.iter(|| {
            let storage = Storage::new();
            storage.mount("/bench", &volume);
            storage.unmount("/bench", &volume);
        });
    });
}

fn lookup(c: &mut Criterion) {
    let storage = Storage::new();
    let volume = build_volume(3, 4);
    storage.mount("/bench", &volume);
    c.bench_function("get_node_lookup", |b| {
        b.iter(|| storage.get_node("/bench/n0/n1/n2"));
    });
}

criterion_group!(benches, mount_unmount, lookup);
criterion_main!(benches);
