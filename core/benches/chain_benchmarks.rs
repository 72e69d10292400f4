// benches/chain_benchmarks.rs

use catena::{ChainControl, ChainFactory, ThreadHost};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn bench_sequential_chain(c: &mut Criterion) {
  let host = Arc::new(ThreadHost::new());
  let factory = ChainFactory::new(host.clone());

  c.bench_function("chain_of_10_current_steps", |b| {
    b.iter(|| {
      let (tx, rx) = crossbeam_channel::bounded::<bool>(1);
      let mut chain = factory
        .create()
        .unwrap()
        .on_current(|_: ()| Ok(ChainControl::Continue(0i64)))
        .unwrap();
      for _ in 0..10 {
        chain = chain
          .on_current(|n: i64| Ok(ChainControl::Continue(n + 1)))
          .unwrap();
      }
      chain
        .on_done(move |ok| {
          let _ = tx.send(ok);
        })
        .unwrap()
        .execute()
        .unwrap();
      rx.recv().unwrap();
    })
  });
}

criterion_group!(benches, bench_sequential_chain);
criterion_main!(benches);
